//! The poll-until-valid engine.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;

use super::error::PollError;
use super::policy::PollPolicy;
use super::session::{LastResult, PollProgress, PollSession, SessionEvent, ValidationStatus};
use crate::validator::Validator;

type Action<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type SharedValidator<T> = Arc<dyn Validator<T>>;
type Hook<T, E> = Arc<dyn Fn(&AttemptEvent<'_, T, E>) + Send + Sync>;

/// Information about a finished attempt, passed to the
/// [`on_attempt`](PollerBuilder::on_attempt) hook.
#[derive(Debug)]
pub struct AttemptEvent<'a, T, E> {
    /// Which attempt just finished (1-indexed).
    pub attempt: u32,
    /// What the action produced.
    pub result: &'a LastResult<T, E>,
    /// Whether the validator accepted the payload.
    pub accepted: bool,
    /// Delay before the next attempt, or `None` if the session just ended.
    pub next_delay: Option<Duration>,
    /// Time since the session started.
    pub elapsed: Duration,
}

/// The mutable configuration cell. Read at the start of every attempt, so
/// updates apply from the next dispatch without restarting the session.
struct PollConfig<T, E> {
    action: Action<T, E>,
    validator: SharedValidator<T>,
    policy: PollPolicy,
    on_attempt: Option<Hook<T, E>>,
}

struct Inner<T, E> {
    session: PollSession<T, E>,
    config: PollConfig<T, E>,
    generation: u64,
    driver: Option<JoinHandle<()>>,
    fault: Option<Box<dyn Any + Send>>,
}

impl<T, E> Inner<T, E> {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.session.is_polling_job_active()
    }
}

struct Shared<T, E> {
    inner: Mutex<Inner<T, E>>,
    progress: watch::Sender<PollProgress>,
    runtime: Handle,
}

impl<T, E> Shared<T, E> {
    fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, inner: &mut Inner<T, E>, event: SessionEvent<T, E>) {
        inner.session.apply(event);
        self.progress.send_replace(inner.session.progress());
    }

    /// Invalidate the running session and cancel its pending attempt. An
    /// attempt already in flight is left alone; its result fails the
    /// generation check.
    fn cancel(&self, inner: &mut Inner<T, E>) {
        inner.generation += 1;
        if let Some(driver) = inner.driver.take() {
            if !inner.session.is_polling() {
                driver.abort();
            }
        }
        self.transition(inner, SessionEvent::Stop);
    }
}

impl<T, E> Shared<T, E>
where
    T: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    async fn drive(self: Arc<Self>, generation: u64) {
        let run = AssertUnwindSafe(self.run_session(generation)).catch_unwind();
        if let Err(panic) = run.await {
            tracing::error!("poll session {} aborted by a panic", generation);
            let mut inner = self.lock();
            if inner.generation == generation {
                inner.fault = Some(panic);
                self.transition(&mut inner, SessionEvent::Stop);
            }
        }
    }

    async fn run_session(&self, generation: u64) {
        let started = Instant::now();

        loop {
            let (action, validator, hook) = {
                let mut inner = self.lock();
                if !inner.is_current(generation) {
                    tracing::debug!("session no longer active, attempt skipped");
                    return;
                }
                self.transition(&mut inner, SessionEvent::AttemptBegin);
                let config = &inner.config;
                (
                    Arc::clone(&config.action),
                    Arc::clone(&config.validator),
                    config.on_attempt.clone(),
                )
            };

            tracing::debug!("dispatching attempt");
            let result = action().await;

            let next_delay = {
                let mut inner = self.lock();
                if !inner.is_current(generation) {
                    tracing::debug!("discarding result of a cancelled attempt");
                    return;
                }

                if let Err(error) = &result {
                    tracing::warn!(
                        attempt = inner.session.attempt_count() + 1,
                        ?error,
                        "attempt failed"
                    );
                }
                self.transition(&mut inner, SessionEvent::AttemptResult(result.into()));

                // Recorded first: a panicking validator leaves the attempt counted.
                let accepted = inner
                    .session
                    .payload()
                    .is_some_and(|payload| validator.check(payload));

                let attempts = inner.session.attempt_count();
                let policy = inner.config.policy;
                let next_delay = if accepted {
                    self.transition(&mut inner, SessionEvent::ValidationSuccess);
                    tracing::info!(attempts, "validator accepted payload");
                    None
                } else if let Some(delay) = policy.delay_after(attempts) {
                    Some(delay)
                } else {
                    self.transition(&mut inner, SessionEvent::MaxAttemptsReached);
                    tracing::info!(attempts, "attempt budget exhausted");
                    None
                };

                if let (Some(hook), Some(result)) = (&hook, inner.session.last_result()) {
                    hook(&AttemptEvent {
                        attempt: attempts,
                        result,
                        accepted,
                        next_delay,
                        elapsed: started.elapsed(),
                    });
                }

                next_delay
            };

            match next_delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return,
            }
        }
    }
}

/// Polls an async action until a validator accepts its payload or the
/// attempt budget runs out.
///
/// A `Poller` owns exactly one [`PollSession`]. [`start`](Poller::start)
/// resets it and schedules the first attempt; [`stop`](Poller::stop) cancels
/// it. Dropping the poller stops it.
///
/// Attempts run on the tokio runtime the poller was built in. They are
/// strictly sequential: attempt N+1 is dispatched only after attempt N has
/// been recorded and the interval has elapsed. A rejected action counts
/// against the budget exactly like a payload the validator refused.
///
/// # Example
///
/// ```rust
/// use pollwater::{Poller, PollPolicy, ValidationStatus};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let calls = Arc::new(AtomicU32::new(0));
/// let counter = Arc::clone(&calls);
///
/// let poller = Poller::builder()
///     .action(move || {
///         let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
///         async move { Ok::<_, String>(n) }
///     })
///     .validator(|n: &u32| *n >= 3)
///     .policy(PollPolicy::new().with_interval(Duration::from_millis(1)))
///     .build()
///     .unwrap();
///
/// poller.start();
/// assert_eq!(poller.finished().await, Some(ValidationStatus::Success));
/// assert_eq!(poller.snapshot().attempt_count(), 3);
/// # });
/// ```
pub struct Poller<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Poller<T, E>
where
    T: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    /// Start building a poller.
    pub fn builder() -> PollerBuilder<T, E> {
        PollerBuilder::new()
    }

    /// Build a poller from an action, a policy and a validator.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new<F, Fut, V>(action: F, policy: PollPolicy, validator: V) -> Result<Self, PollError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        V: Validator<T> + 'static,
    {
        PollerBuilder::new()
            .action(action)
            .validator(validator)
            .policy(policy)
            .build()
    }

    /// Reset the session and schedule its first attempt.
    ///
    /// The attempt is spawned, never run inline, so the session is observably
    /// active before it begins. Calling `start` on a running session restarts
    /// it: the previous session is cancelled as if by [`stop`](Poller::stop)
    /// and the latest call wins.
    pub fn start(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();
        shared.cancel(&mut inner);
        inner.fault = None;

        let generation = inner.generation;
        shared.transition(&mut inner, SessionEvent::Start);

        let span = tracing::info_span!("poll_session", session = generation);
        let driver = shared
            .runtime
            .spawn(Arc::clone(shared).drive(generation).instrument(span));
        inner.driver = Some(driver);
        tracing::debug!(session = generation, "poll session started");
    }

    /// Cancel the session.
    ///
    /// A scheduled attempt that has not been dispatched yet never fires. An
    /// attempt already in flight is not aborted, but its result is discarded.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        if inner.session.is_polling_job_active() {
            tracing::debug!(session = inner.generation, "poll session stopped");
        }
        self.shared.cancel(&mut inner);
    }

    /// Replace the policy. Takes effect at the next budget check.
    pub fn set_policy(&self, policy: PollPolicy) -> Result<(), PollError> {
        policy.validate()?;
        self.shared.lock().config.policy = policy;
        Ok(())
    }

    /// Replace the action. Takes effect at the next dispatch.
    pub fn set_action<F, Fut>(&self, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.shared.lock().config.action = boxed_action(action);
    }

    /// Replace the validator. Takes effect for the next dispatched attempt.
    pub fn set_validator<V>(&self, validator: V)
    where
        V: Validator<T> + 'static,
    {
        self.shared.lock().config.validator = Arc::new(validator);
    }
}

impl<T, E> Poller<T, E> {
    /// The policy currently in effect.
    pub fn policy(&self) -> PollPolicy {
        self.shared.lock().config.policy
    }

    /// Read the session without cloning it.
    ///
    /// The session is locked while `f` runs; `f` must not call back into
    /// the poller.
    pub fn with_session<R>(&self, f: impl FnOnce(&PollSession<T, E>) -> R) -> R {
        f(&self.shared.lock().session)
    }

    /// The `{active, polling, attempts, status}` view of the session.
    pub fn progress(&self) -> PollProgress {
        *self.shared.progress.borrow()
    }

    /// Subscribe to progress updates. A new value is published on every
    /// session transition.
    pub fn subscribe(&self) -> watch::Receiver<PollProgress> {
        self.shared.progress.subscribe()
    }

    /// Wait until the current session is no longer active and return its
    /// outcome.
    ///
    /// Returns immediately if no session is running. Returns `None` if the
    /// session was stopped before reaching an outcome.
    ///
    /// # Panics
    ///
    /// If the validator or the action panicked during the session, the
    /// panic is resumed here.
    pub async fn finished(&self) -> Option<ValidationStatus> {
        let mut progress = self.shared.progress.subscribe();
        let status = progress
            .wait_for(|p| !p.active)
            .await
            .ok()
            .and_then(|p| p.status);

        let fault = self.shared.lock().fault.take();
        if let Some(panic) = fault {
            std::panic::resume_unwind(panic);
        }
        status
    }
}

impl<T: Clone, E: Clone> Poller<T, E> {
    /// Clone the current session state.
    pub fn snapshot(&self) -> PollSession<T, E> {
        self.shared.lock().session.clone()
    }
}

impl<T, E> Drop for Poller<T, E> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        self.shared.cancel(&mut inner);
    }
}

impl<T, E> fmt::Debug for Poller<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("Poller")
            .field("progress", &inner.session.progress())
            .field("policy", &inner.config.policy)
            .field("generation", &inner.generation)
            .finish_non_exhaustive()
    }
}

fn boxed_action<T, E, F, Fut>(action: F) -> Action<T, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Arc::new(move || action().boxed())
}

/// Builder for [`Poller`].
///
/// # Example
///
/// ```rust
/// use pollwater::{PollError, Poller};
///
/// # tokio_test::block_on(async {
/// let missing = Poller::<u32, String>::builder()
///     .validator(|n: &u32| *n > 0)
///     .build();
/// assert_eq!(missing.unwrap_err(), PollError::MissingAction);
/// # });
/// ```
pub struct PollerBuilder<T, E> {
    action: Option<Action<T, E>>,
    validator: Option<SharedValidator<T>>,
    policy: PollPolicy,
    on_attempt: Option<Hook<T, E>>,
}

impl<T, E> PollerBuilder<T, E>
where
    T: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    /// A builder with the default policy and no action or validator.
    pub fn new() -> Self {
        Self {
            action: None,
            validator: None,
            policy: PollPolicy::default(),
            on_attempt: None,
        }
    }

    /// The async action to poll.
    pub fn action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.action = Some(boxed_action(action));
        self
    }

    /// The validator that ends the session successfully.
    ///
    /// It runs under the session lock, after the attempt has been recorded,
    /// so it must not call back into the poller.
    pub fn validator<V>(mut self, validator: V) -> Self
    where
        V: Validator<T> + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Replace the whole policy.
    pub fn policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the attempt budget.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.policy = self.policy.with_max_attempts(n);
        self
    }

    /// Set the interval between attempts.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.policy = self.policy.with_interval(interval);
        self
    }

    /// Call `hook` after every recorded attempt.
    ///
    /// The hook runs while the session is locked. It should be quick and
    /// must not call back into the poller; use it for logging and metrics.
    pub fn on_attempt<H>(mut self, hook: H) -> Self
    where
        H: Fn(&AttemptEvent<'_, T, E>) + Send + Sync + 'static,
    {
        self.on_attempt = Some(Arc::new(hook));
        self
    }

    /// Build the poller. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Poller<T, E>, PollError> {
        self.policy.validate()?;
        let action = self.action.ok_or(PollError::MissingAction)?;
        let validator = self.validator.ok_or(PollError::MissingValidator)?;
        let runtime = Handle::try_current().map_err(|_| PollError::NoRuntime)?;

        let session = PollSession::new();
        let (progress, _) = watch::channel(session.progress());

        Ok(Poller {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    session,
                    config: PollConfig {
                        action,
                        validator,
                        policy: self.policy,
                        on_attempt: self.on_attempt,
                    },
                    generation: 0,
                    driver: None,
                    fault: None,
                }),
                progress,
                runtime,
            }),
        })
    }
}

impl<T, E> Default for PollerBuilder<T, E>
where
    T: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for PollerBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollerBuilder")
            .field("has_action", &self.action.is_some())
            .field("has_validator", &self.validator.is_some())
            .field("policy", &self.policy)
            .field("has_hook", &self.on_attempt.is_some())
            .finish()
    }
}
