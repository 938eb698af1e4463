//! Error types for poll configuration.

/// Error returned when a poller cannot be built or reconfigured.
///
/// Fetch failures are never reported through this type: a rejected attempt
/// is recorded in the session as [`LastResult::Error`](crate::LastResult) and
/// counted against the budget.
///
/// # Examples
///
/// ```rust
/// use pollwater::{PollError, PollPolicy};
///
/// let err = PollPolicy::new().with_max_attempts(0).validate().unwrap_err();
/// assert_eq!(err, PollError::ZeroMaxAttempts);
/// assert!(err.to_string().contains("at least one attempt"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollError {
    /// The policy allows zero attempts.
    ZeroMaxAttempts,
    /// The builder was given no action to poll.
    MissingAction,
    /// The builder was given no validator.
    MissingValidator,
    /// The poller was built outside of a tokio runtime.
    NoRuntime,
}

impl std::fmt::Display for PollError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroMaxAttempts => write!(f, "poll policy must allow at least one attempt"),
            Self::MissingAction => write!(f, "poller requires an action to poll"),
            Self::MissingValidator => write!(f, "poller requires a validator"),
            Self::NoRuntime => write!(f, "poller must be built inside a tokio runtime"),
        }
    }
}

impl std::error::Error for PollError {}
