//! Poll policy types and configuration.

use std::time::Duration;

use super::error::PollError;

/// Attempts made by [`PollPolicy::default`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Interval used by [`PollPolicy::default`].
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

/// A poll policy describing how many attempts to make and how long to wait
/// between them.
///
/// Policies are pure data: they describe the polling budget but never run
/// anything. The interval is fixed; there is no backoff.
///
/// # Bounds
///
/// `max_attempts` counts every attempt, including the first one, and must be
/// at least 1. A policy with zero attempts is rejected by
/// [`validate`](PollPolicy::validate) and by every constructor that accepts a
/// policy ([`PollerBuilder::build`](crate::PollerBuilder::build),
/// [`Poller::set_policy`](crate::Poller::set_policy)).
///
/// # Examples
///
/// ```rust
/// use pollwater::PollPolicy;
/// use std::time::Duration;
///
/// let policy = PollPolicy::new()
///     .with_max_attempts(10)
///     .with_interval(Duration::from_millis(250));
///
/// assert_eq!(policy.max_attempts(), 10);
/// assert_eq!(policy.interval(), Duration::from_millis(250));
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl PollPolicy {
    /// Create a policy with the default budget: 5 attempts, 3 seconds apart.
    pub const fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Set the maximum number of attempts, the first one included.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pollwater::PollPolicy;
    ///
    /// let policy = PollPolicy::new().with_max_attempts(3);
    /// assert_eq!(policy.max_attempts(), 3);
    /// ```
    pub const fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the delay between the end of one attempt and the dispatch of the
    /// next. `Duration::ZERO` is allowed.
    ///
    /// The scheduler honours the exact duration. The serialized form has
    /// millisecond resolution and rounds a sub-millisecond remainder up.
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Get the maximum number of attempts.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Get the interval between attempts.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether `attempts` completed attempts use up the whole budget.
    ///
    /// The attempt that brings the count to `max_attempts` is the last one.
    ///
    /// ```rust
    /// use pollwater::PollPolicy;
    ///
    /// let policy = PollPolicy::new().with_max_attempts(3);
    /// assert!(!policy.is_exhausted(2));
    /// assert!(policy.is_exhausted(3));
    /// ```
    pub const fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    /// Delay to wait after `attempts` completed attempts, or `None` when the
    /// budget is used up and no further attempt may be dispatched.
    ///
    /// ```rust
    /// use pollwater::PollPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = PollPolicy::new()
    ///     .with_max_attempts(2)
    ///     .with_interval(Duration::from_millis(100));
    ///
    /// assert_eq!(policy.delay_after(1), Some(Duration::from_millis(100)));
    /// assert_eq!(policy.delay_after(2), None);
    /// ```
    pub const fn delay_after(&self, attempts: u32) -> Option<Duration> {
        if self.is_exhausted(attempts) {
            None
        } else {
            Some(self.interval)
        }
    }

    /// Validate that the policy allows at least one attempt.
    pub fn validate(&self) -> Result<(), PollError> {
        if self.max_attempts == 0 {
            Err(PollError::ZeroMaxAttempts)
        } else {
            Ok(())
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    use super::{PollPolicy, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};

    #[derive(Serialize, Deserialize)]
    struct RawPolicy {
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
    }

    fn default_max_attempts() -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }

    fn default_interval_ms() -> u64 {
        interval_ms(DEFAULT_INTERVAL)
    }

    /// Whole milliseconds, rounded up, saturating at `u64::MAX`.
    fn interval_ms(interval: Duration) -> u64 {
        let mut ms = interval.as_millis();
        if interval.subsec_nanos() % 1_000_000 != 0 {
            ms += 1;
        }
        u64::try_from(ms).unwrap_or(u64::MAX)
    }

    impl Serialize for PollPolicy {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            RawPolicy {
                max_attempts: self.max_attempts,
                interval_ms: interval_ms(self.interval),
            }
            .serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for PollPolicy {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let raw = RawPolicy::deserialize(deserializer)?;
            let policy = PollPolicy::new()
                .with_max_attempts(raw.max_attempts)
                .with_interval(Duration::from_millis(raw.interval_ms));
            policy.validate().map_err(serde::de::Error::custom)?;
            Ok(policy)
        }
    }
}
