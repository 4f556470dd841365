//! Warden Core: domain models, storage ports and the shared error type
//! for the multi-tenant authentication subsystem.

pub mod clock;
pub mod error;
pub mod models;
pub mod repository;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use error::{WardenError, WardenResult};
