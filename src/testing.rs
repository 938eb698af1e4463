//! Testing utilities for code that polls.
//!
//! This module provides a scripted action for driving a [`Poller`](crate::Poller)
//! through known results, assertion macros for session outcomes, and (behind
//! the `proptest` feature) an `Arbitrary` implementation for
//! [`PollPolicy`](crate::PollPolicy).
//!
//! # Example
//!
//! ```rust
//! use pollwater::testing::ScriptedSource;
//! use pollwater::{assert_poll_success, Poller, PollPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let source = ScriptedSource::new([Err("not yet"), Ok(3), Ok(12)]);
//! let policy = PollPolicy::new().with_interval(Duration::from_millis(1));
//! let poller = Poller::new(source.action(), policy, |n: &u32| *n > 10).unwrap();
//!
//! poller.start();
//! poller.finished().await;
//! assert_poll_success!(poller.snapshot());
//! assert_eq!(source.calls(), 3);
//! # });
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::{ready, Ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// An action that replays a fixed script of results.
///
/// Each call pops the next result. Once the script runs out, the last result
/// is repeated forever. Clones share the same script and call counter.
pub struct ScriptedSource<T, E> {
    script: Arc<Mutex<VecDeque<Result<T, E>>>>,
    calls: Arc<AtomicU32>,
}

impl<T, E> ScriptedSource<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a source from the results to replay, in order.
    ///
    /// # Panics
    ///
    /// Panics if `results` is empty.
    pub fn new(results: impl IntoIterator<Item = Result<T, E>>) -> Self {
        let script: VecDeque<_> = results.into_iter().collect();
        assert!(!script.is_empty(), "ScriptedSource needs at least one result");
        Self {
            script: Arc::new(Mutex::new(script)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of times the action has been invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The action to hand to a poller.
    pub fn action(&self) -> impl Fn() -> Ready<Result<T, E>> + Send + Sync + 'static {
        let source = self.clone();
        move || ready(source.next())
    }

    fn next(&self) -> Result<T, E> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        if script.len() > 1 {
            if let Some(result) = script.pop_front() {
                return result;
            }
        }
        script[0].clone()
    }
}

impl<T, E> Clone for ScriptedSource<T, E> {
    fn clone(&self) -> Self {
        Self {
            script: Arc::clone(&self.script),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T, E> fmt::Debug for ScriptedSource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedSource")
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Assert that a session ended with [`ValidationStatus::Success`](crate::ValidationStatus).
///
/// ```rust
/// use pollwater::{assert_poll_success, PollSession};
///
/// let idle = PollSession::<u32, String>::new();
/// assert!(std::panic::catch_unwind(|| assert_poll_success!(idle)).is_err());
/// ```
#[macro_export]
macro_rules! assert_poll_success {
    ($session:expr) => {
        match $session.validation_status() {
            Some($crate::ValidationStatus::Success) => {}
            other => {
                panic!("Expected poll success, got {:?}", other);
            }
        }
    };
}

/// Assert that a session ran out of attempts.
#[macro_export]
macro_rules! assert_poll_exhausted {
    ($session:expr) => {
        match $session.validation_status() {
            Some($crate::ValidationStatus::MaxAttemptsReached) => {}
            other => {
                panic!("Expected poll exhaustion, got {:?}", other);
            }
        }
    };
    ($session:expr, $attempts:expr) => {
        $crate::assert_poll_exhausted!($session);
        assert_eq!($session.attempt_count(), $attempts);
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl Arbitrary for crate::PollPolicy {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (1u32..=20, 0u64..=10_000)
            .prop_map(|(attempts, interval_ms)| {
                crate::PollPolicy::new()
                    .with_max_attempts(attempts)
                    .with_interval(std::time::Duration::from_millis(interval_ms))
            })
            .boxed()
    }
}
