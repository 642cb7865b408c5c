//! Entry screen for signed-out users.

use std::sync::Arc;

use crate::navigation::{Navigator, PhoneMode, Route};

pub struct Landing {
    navigator: Arc<dyn Navigator>,
}

impl Landing {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    pub fn open_signup(&self) {
        self.navigator.push(Route::Signup);
    }

    pub fn open_login(&self) {
        self.navigator.push(Route::Login);
    }

    pub fn open_phone(&self, mode: PhoneMode) {
        self.navigator.push(Route::PhoneVerify { mode });
    }
}
