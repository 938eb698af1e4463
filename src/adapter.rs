//! Domain adapters over JSON payloads.
//!
//! An [`ItemPoller`] binds a [`Poller`] to a fetch collaborator returning
//! `serde_json::Value` and to one of the crate's domain validators:
//!
//! - [`ItemPoller::until_more_than`] fetches a collection until it holds
//!   more than `threshold` items.
//! - [`ItemPoller::until_field_filled`] fetches the records of one resource,
//!   by identifier, until every record has a non-blank text field.
//!
//! Both start with the default policy (5 attempts, 3 seconds apart), which
//! [`ItemPoller::with_policy`] replaces.
//!
//! # Example
//!
//! ```rust
//! use pollwater::adapter::ItemPoller;
//! use pollwater::{PollPolicy, ValidationStatus};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let posts = ItemPoller::until_more_than(
//!     || async { Ok::<_, String>(json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }])) },
//!     2,
//! )
//! .unwrap()
//! .with_policy(PollPolicy::new().with_interval(Duration::from_millis(1)))
//! .unwrap();
//!
//! assert_eq!(posts.item_count(), 0);
//! posts.start();
//! assert_eq!(posts.finished().await, Some(ValidationStatus::Success));
//! assert_eq!(posts.item_count(), 3);
//! # });
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;

use serde_json::Value;
use tokio::sync::watch;

use crate::poll::{PollError, PollPolicy, PollProgress, PollSession, Poller, ValidationStatus};
use crate::validator::{field_not_blank, more_than, Validator};

/// Number of items in a JSON payload: the array length, or 0 for anything
/// that is not an array.
pub fn count_items(payload: &Value) -> usize {
    payload.as_array().map_or(0, Vec::len)
}

/// A [`Poller`] over JSON collections with a derived item count.
pub struct ItemPoller<E> {
    poller: Poller<Value, E>,
}

impl<E> ItemPoller<E>
where
    E: fmt::Debug + Send + 'static,
{
    /// Poll `fetch` until it returns an array with more than `threshold`
    /// items.
    ///
    /// [`DEFAULT_MIN_ITEMS`](crate::validator::DEFAULT_MIN_ITEMS) is the
    /// reference threshold.
    pub fn until_more_than<F, Fut>(fetch: F, threshold: usize) -> Result<Self, PollError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
    {
        tracing::debug!(threshold, "configuring collection-size poll");
        Self::with_validator(fetch, more_than(threshold))
    }

    /// Poll `fetch_by_id(id)` until every record it returns has a non-blank
    /// string under `field`.
    pub fn until_field_filled<Id, F, Fut>(
        id: Id,
        fetch_by_id: F,
        field: impl Into<Cow<'static, str>>,
    ) -> Result<Self, PollError>
    where
        Id: Clone + fmt::Debug + Send + Sync + 'static,
        F: Fn(Id) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
    {
        let validator = field_not_blank(field);
        tracing::debug!(?id, field = validator.field(), "configuring field-completeness poll");
        Self::with_validator(move || fetch_by_id(id.clone()), validator)
    }

    /// Poll `fetch` with any JSON validator.
    pub fn with_validator<F, Fut, V>(fetch: F, validator: V) -> Result<Self, PollError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        V: Validator<Value> + 'static,
    {
        let poller = Poller::new(fetch, PollPolicy::default(), validator)?;
        Ok(Self { poller })
    }

    /// Replace the default policy.
    pub fn with_policy(self, policy: PollPolicy) -> Result<Self, PollError> {
        self.poller.set_policy(policy)?;
        Ok(self)
    }

    /// Start (or restart) polling.
    pub fn start(&self) {
        self.poller.start();
    }

    /// Stop polling.
    pub fn stop(&self) {
        self.poller.stop();
    }
}

impl<E> ItemPoller<E> {
    /// Items in the last resolved payload, or 0 if there is none, the last
    /// attempt failed, or the payload is not an array. Recomputed on every
    /// call.
    pub fn item_count(&self) -> usize {
        self.poller
            .with_session(|session| session.payload().map_or(0, count_items))
    }

    /// Progress of the current session.
    pub fn progress(&self) -> PollProgress {
        self.poller.progress()
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> watch::Receiver<PollProgress> {
        self.poller.subscribe()
    }

    /// Wait for the current session to end. See [`Poller::finished`].
    pub async fn finished(&self) -> Option<ValidationStatus> {
        self.poller.finished().await
    }

    /// The underlying poller.
    pub fn poller(&self) -> &Poller<Value, E> {
        &self.poller
    }
}

impl<E: Clone> ItemPoller<E> {
    /// Clone the current session state.
    pub fn snapshot(&self) -> PollSession<Value, E> {
        self.poller.snapshot()
    }
}

impl<E> fmt::Debug for ItemPoller<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemPoller")
            .field("poller", &self.poller)
            .field("item_count", &self.item_count())
            .finish()
    }
}
