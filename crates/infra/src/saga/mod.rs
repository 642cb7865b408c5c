//! Sagas: multi-step external mutations with explicit compensation.
//!
//! - Explicit state machine per saga
//! - State advanced only by applying saga events
//! - Compensating actions chosen by policy, never implied

pub mod account_deletion;
