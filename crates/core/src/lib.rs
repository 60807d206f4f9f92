//! `keystone-core`: identity building blocks shared by every tenant-aware crate.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;
pub mod party;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{PartyId, UserId};
pub use party::{PartyScope, PartyType};
