//! Domain models for Warden.
//!
//! These are the types shared between the storage adapters and the
//! authentication layer.

pub mod grant;
pub mod session;
pub mod tenant;
pub mod user;
