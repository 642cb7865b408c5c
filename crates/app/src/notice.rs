//! Transient user notifications (toasts) and blocking prompts (alerts).

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub detail: Option<String>,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(kind: NoticeKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            detail: None,
            raised_at: Utc::now(),
        }
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, title)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Modal message the user has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub title: String,
    pub message: String,
}

impl Prompt {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Notification surface. Implemented by the UI.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    fn prompt(&self, prompt: Prompt);
}

#[derive(Debug, Default)]
struct LogState {
    notices: Vec<Notice>,
    prompts: Vec<Prompt>,
}

/// Notifier that records everything it is given.
///
/// - No IO
/// - Cloning shares the same log
#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
    state: Arc<Mutex<LogState>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.state
            .lock()
            .map(|s| s.notices.clone())
            .unwrap_or_default()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.state
            .lock()
            .map(|s| s.prompts.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Notice> {
        self.state.lock().ok()?.notices.last().cloned()
    }

    /// Titles of all notices, oldest first.
    pub fn titles(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.title).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.notices.clear();
            state.prompts.clear();
        }
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        tracing::debug!(kind = ?notice.kind, title = %notice.title, "notice raised");
        if let Ok(mut state) = self.state.lock() {
            state.notices.push(notice);
        }
    }

    fn prompt(&self, prompt: Prompt) {
        tracing::debug!(title = %prompt.title, "prompt raised");
        if let Ok(mut state) = self.state.lock() {
            state.prompts.push(prompt);
        }
    }
}
