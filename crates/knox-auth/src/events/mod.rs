//! Token lifecycle events.
//!
//! Deletions in the token store are published on a broadcast channel so
//! that components holding derived state, above all the token cache, can
//! react without the store knowing about them.
//!
//! # Module Structure
//!
//! - [`types`]: event definitions ([`TokenEvent`], [`ExpirySource`])
//! - [`broadcaster`]: the broadcast bus

pub mod broadcaster;
pub mod types;

pub use broadcaster::EventBroadcaster;
pub use types::{ExpirySource, TokenEvent};
