//! Infrastructure layer: document store access, typed profile repository and
//! the multi-step account deletion saga.

pub mod profiles;
pub mod saga;
pub mod store;

pub use profiles::{DecodedCollection, ProfileRepository, decode_collection};
pub use saga::account_deletion::{
    AccountDeletionSaga, DeletionEvent, DeletionPolicy, DeletionReport, DeletionState, RecordedEvent,
};
pub use store::{DocumentStore, InMemoryDocumentStore, StoreError, StoreOp, StorePath};
