//! Authoritative storage traits.
//!
//! The token store and user store are the source of truth behind the
//! cache. Hosts provide the implementations; this crate defines the
//! interfaces plus a decorator that broadcasts deletions.
//!
//! # Module Structure
//!
//! - [`token`]: the [`TokenStorage`] trait
//! - [`user`]: the [`User`] type and [`UserStorage`] trait
//! - [`evented`]: deletion-broadcasting [`EventedTokenStorage`] wrapper

pub mod evented;
pub mod token;
pub mod user;

pub use evented::EventedTokenStorage;
pub use token::TokenStorage;
pub use user::{User, UserStorage};
