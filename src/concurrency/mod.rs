//! Per-element concurrency control
//!
//! Every mutable graph element embeds a [`ConcurrencyGuard`] through [`Guarded`].
//! Acquisition busy-waits (spin, then yield) instead of parking the thread.

pub mod guard;
pub mod guarded;

pub use guard::{ConcurrencyGuard, ConcurrencyViolation, DEFAULT_RETRY_BUDGET};
pub use guarded::{Guarded, ReadGuard, WriteGuard};
