//! Poll-until-valid sessions.
//!
//! This module drives one logical poll session at a time:
//!
//! - **Policy**: [`PollPolicy`] is pure data, the attempt budget plus a fixed
//!   interval.
//! - **Session**: [`PollSession`] is the observable lifecycle state, changed
//!   only by the engine's reducer.
//! - **Engine**: [`Poller`] dispatches attempts, runs the validator, enforces
//!   the budget, and handles cancellation.
//!
//! # Quick Start
//!
//! ```rust
//! use pollwater::{Poller, PollPolicy, ValidationStatus};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let poller = Poller::new(
//!     || async { Ok::<_, String>(vec![1, 2, 3]) },
//!     PollPolicy::new().with_max_attempts(2).with_interval(Duration::from_millis(1)),
//!     |items: &Vec<i32>| items.len() > 5,
//! )
//! .unwrap();
//!
//! poller.start();
//! assert_eq!(poller.finished().await, Some(ValidationStatus::MaxAttemptsReached));
//! assert_eq!(poller.progress().attempts, 2);
//! # });
//! ```
//!
//! # Cancellation
//!
//! [`Poller::stop`] cancels a scheduled attempt outright. An attempt whose
//! action is already running is not aborted; when it resolves, its result is
//! dropped without touching the session.

mod engine;
mod error;
mod policy;
mod session;

pub use engine::{AttemptEvent, Poller, PollerBuilder};
pub use error::PollError;
pub use policy::{PollPolicy, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};
pub use session::{LastResult, PollProgress, PollSession, ValidationStatus};

#[cfg(test)]
mod tests;
