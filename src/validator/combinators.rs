//! Core validator trait and logical combinators.

/// A pure predicate over a resolved payload.
///
/// Unlike a general-purpose predicate, a validator only ever sees payloads
/// the action resolved with: a rejected action is never shown to it. The
/// poller calls it once per recorded attempt, while holding the session
/// lock, and never for a result discarded by
/// [`Poller::stop`](crate::Poller::stop). Returning `false`
/// costs an attempt from the budget.
///
/// Validators must not panic. A validator that does is treated as a bug in
/// the caller: the session ends and the panic is re-raised from
/// [`Poller::finished`](crate::Poller::finished).
///
/// # Example
///
/// ```rust
/// use pollwater::validator::Validator;
///
/// let even = |n: &u32| n % 2 == 0;
/// assert!(even.check(&4));
/// assert!(!even.check(&3));
/// ```
pub trait Validator<T: ?Sized>: Send + Sync {
    /// Returns true if polling can stop successfully on this payload.
    fn check(&self, value: &T) -> bool;
}

impl<T: ?Sized, F> Validator<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    #[inline]
    fn check(&self, value: &T) -> bool {
        self(value)
    }
}

/// Extension trait for combining validators.
///
/// # Example
///
/// ```rust
/// use pollwater::validator::*;
///
/// let in_range = (|n: &u32| *n > 2).and(|n: &u32| *n < 8);
/// assert!(in_range.check(&5));
/// assert!(!in_range.check(&9));
/// assert!(in_range.not().check(&1));
/// ```
pub trait ValidatorExt<T: ?Sized>: Validator<T> + Sized {
    /// Accept only when both validators accept.
    fn and<V: Validator<T>>(self, other: V) -> And<Self, V> {
        And(self, other)
    }

    /// Accept when either validator accepts.
    fn or<V: Validator<T>>(self, other: V) -> Or<Self, V> {
        Or(self, other)
    }

    /// Invert this validator.
    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: ?Sized, V: Validator<T>> ValidatorExt<T> for V {}

/// Both validators must accept.
#[derive(Clone, Copy, Debug)]
pub struct And<A, B>(pub(crate) A, pub(crate) B);

impl<T: ?Sized, A: Validator<T>, B: Validator<T>> Validator<T> for And<A, B> {
    #[inline]
    fn check(&self, value: &T) -> bool {
        self.0.check(value) && self.1.check(value)
    }
}

/// Either validator must accept.
#[derive(Clone, Copy, Debug)]
pub struct Or<A, B>(pub(crate) A, pub(crate) B);

impl<T: ?Sized, A: Validator<T>, B: Validator<T>> Validator<T> for Or<A, B> {
    #[inline]
    fn check(&self, value: &T) -> bool {
        self.0.check(value) || self.1.check(value)
    }
}

/// Inverted validator.
#[derive(Clone, Copy, Debug)]
pub struct Not<A>(pub(crate) A);

impl<T: ?Sized, A: Validator<T>> Validator<T> for Not<A> {
    #[inline]
    fn check(&self, value: &T) -> bool {
        !self.0.check(value)
    }
}
