//! Session state and its transition function.
//!
//! A [`PollSession`] is the single piece of mutable state owned by a
//! [`Poller`](crate::Poller). It only changes through
//! [`PollSession::apply`], a closed reducer over [`SessionEvent`]. Events that
//! make no sense for the current state are engine bugs and panic.

/// Terminal outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValidationStatus {
    /// The validator accepted a payload.
    Success,
    /// The attempt budget ran out before the validator accepted anything.
    MaxAttemptsReached,
}

/// Outcome of the most recent attempt.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LastResult<T, E> {
    /// The action resolved with this payload.
    Payload(T),
    /// The action rejected with this error.
    Error(E),
}

impl<T, E> LastResult<T, E> {
    /// The payload, if the attempt resolved.
    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Payload(p) => Some(p),
            Self::Error(_) => None,
        }
    }

    /// The error, if the attempt rejected.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Payload(_) => None,
            Self::Error(e) => Some(e),
        }
    }

    /// Returns true if the attempt rejected.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl<T, E> From<Result<T, E>> for LastResult<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(p) => Self::Payload(p),
            Err(e) => Self::Error(e),
        }
    }
}

/// Events accepted by [`PollSession::apply`].
#[derive(Debug)]
pub(crate) enum SessionEvent<T, E> {
    Start,
    Stop,
    AttemptBegin,
    AttemptResult(LastResult<T, E>),
    ValidationSuccess,
    MaxAttemptsReached,
}

/// The lifecycle state of one poll session.
///
/// Readers get this through [`Poller::snapshot`](crate::Poller::snapshot) or
/// [`Poller::with_session`](crate::Poller::with_session); it cannot be
/// mutated from outside the engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PollSession<T, E> {
    is_polling_job_active: bool,
    is_polling: bool,
    attempt_count: u32,
    last_result: Option<LastResult<T, E>>,
    validation_status: Option<ValidationStatus>,
}

impl<T, E> PollSession<T, E> {
    /// A session that has never been started.
    pub fn new() -> Self {
        Self {
            is_polling_job_active: false,
            is_polling: false,
            attempt_count: 0,
            last_result: None,
            validation_status: None,
        }
    }

    /// True from `start()` until a terminal outcome or `stop()`.
    pub fn is_polling_job_active(&self) -> bool {
        self.is_polling_job_active
    }

    /// True only while an attempt's action is in flight.
    pub fn is_polling(&self) -> bool {
        self.is_polling
    }

    /// Number of attempts that resolved or rejected in this session.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Outcome of the most recent attempt.
    pub fn last_result(&self) -> Option<&LastResult<T, E>> {
        self.last_result.as_ref()
    }

    /// Terminal outcome, or `None` while running or before the first start.
    pub fn validation_status(&self) -> Option<ValidationStatus> {
        self.validation_status
    }

    /// Payload of the most recent attempt, if it resolved.
    pub fn payload(&self) -> Option<&T> {
        self.last_result.as_ref().and_then(LastResult::payload)
    }

    /// Error of the most recent attempt, if it rejected.
    pub fn error(&self) -> Option<&E> {
        self.last_result.as_ref().and_then(LastResult::error)
    }

    /// Copyable progress view of this session.
    pub fn progress(&self) -> PollProgress {
        PollProgress {
            active: self.is_polling_job_active,
            polling: self.is_polling,
            attempts: self.attempt_count,
            status: self.validation_status,
        }
    }

    /// Apply one transition.
    ///
    /// # Panics
    ///
    /// Panics when the event is not legal for the current state.
    pub(crate) fn apply(&mut self, event: SessionEvent<T, E>) {
        match event {
            SessionEvent::Start => {
                *self = Self::new();
                self.is_polling_job_active = true;
            }
            SessionEvent::Stop => {
                self.is_polling_job_active = false;
                self.is_polling = false;
            }
            SessionEvent::AttemptBegin => {
                assert!(
                    self.is_polling_job_active && !self.is_polling,
                    "attempt began on a session that is {}",
                    self.describe()
                );
                self.is_polling = true;
            }
            SessionEvent::AttemptResult(result) => {
                assert!(
                    self.is_polling_job_active && self.is_polling,
                    "attempt result arrived on a session that is {}",
                    self.describe()
                );
                self.last_result = Some(result);
                self.attempt_count += 1;
                self.is_polling = false;
            }
            SessionEvent::ValidationSuccess => {
                self.finish(ValidationStatus::Success);
            }
            SessionEvent::MaxAttemptsReached => {
                self.finish(ValidationStatus::MaxAttemptsReached);
            }
        }
    }

    fn finish(&mut self, status: ValidationStatus) {
        assert!(
            self.is_polling_job_active && !self.is_polling && self.validation_status.is_none(),
            "{:?} reported on a session that is {}",
            status,
            self.describe()
        );
        self.validation_status = Some(status);
        self.is_polling_job_active = false;
    }

    fn describe(&self) -> String {
        format!(
            "active={} polling={} attempts={} status={:?}",
            self.is_polling_job_active,
            self.is_polling,
            self.attempt_count,
            self.validation_status
        )
    }
}

impl<T, E> Default for PollSession<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// The `{active, polling, attempts, status}` view of a session.
///
/// Published on every transition through
/// [`Poller::subscribe`](crate::Poller::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PollProgress {
    /// Session is running.
    pub active: bool,
    /// An attempt is in flight.
    pub polling: bool,
    /// Completed attempts.
    pub attempts: u32,
    /// Terminal outcome, once reached.
    pub status: Option<ValidationStatus>,
}
