//! # Pollwater
//!
//! > *"Keep drawing until the water runs clear"*
//!
//! A Rust library for polling a fallible async source until its result is
//! good enough.
//!
//! ## Philosophy
//!
//! **Pollwater** keeps the decision and the loop apart:
//! - **Validators** are pure predicates over a payload ("more than 101
//!   posts", "every comment has a body").
//! - **Policies** are pure data: how many attempts, how far apart.
//! - **The engine** owns everything that moves: scheduling, lifecycle state,
//!   cancellation.
//!
//! ## Quick Example
//!
//! ```rust
//! use pollwater::{Poller, PollPolicy, ValidationStatus};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let poller = Poller::builder()
//!     .action(|| async { Ok::<_, String>(vec!["post"; 3]) })
//!     .validator(|posts: &Vec<&str>| posts.len() > 2)
//!     .policy(PollPolicy::new().with_interval(Duration::from_millis(10)))
//!     .build()
//!     .unwrap();
//!
//! poller.start();
//! match poller.finished().await {
//!     Some(ValidationStatus::Success) => {
//!         println!("ready after {} attempts", poller.progress().attempts);
//!     }
//!     Some(ValidationStatus::MaxAttemptsReached) => println!("gave up"),
//!     None => println!("stopped"),
//! }
//! # });
//! ```
//!
//! For JSON sources, see [`adapter::ItemPoller`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod adapter;
pub mod poll;
pub mod testing;
pub mod validator;

// Re-exports
pub use adapter::ItemPoller;
pub use poll::{
    AttemptEvent, LastResult, PollError, PollPolicy, PollProgress, PollSession, Poller,
    PollerBuilder, ValidationStatus,
};
pub use validator::{Validator, ValidatorExt};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::ItemPoller;
    pub use crate::poll::{
        LastResult, PollError, PollPolicy, PollProgress, PollSession, Poller, ValidationStatus,
    };
    pub use crate::validator::{field_not_blank, more_than, Validator, ValidatorExt};
}
