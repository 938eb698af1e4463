//! Collection-size validator.

use serde_json::Value;

use super::combinators::Validator;

/// Threshold used by the reference collection poll: accept once more than
/// 101 items come back.
pub const DEFAULT_MIN_ITEMS: usize = 101;

/// Accepts a collection whose length exceeds a threshold.
///
/// For JSON payloads anything that is not an array (including `null`) is
/// rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoreThan {
    threshold: usize,
}

impl MoreThan {
    /// The exclusive lower bound on the collection length.
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Validator<Value> for MoreThan {
    #[inline]
    fn check(&self, value: &Value) -> bool {
        value
            .as_array()
            .is_some_and(|items| items.len() > self.threshold)
    }
}

impl<T> Validator<Vec<T>> for MoreThan {
    #[inline]
    fn check(&self, value: &Vec<T>) -> bool {
        value.len() > self.threshold
    }
}

impl<T> Validator<[T]> for MoreThan {
    #[inline]
    fn check(&self, value: &[T]) -> bool {
        value.len() > self.threshold
    }
}

/// Create a validator that accepts collections longer than `threshold`.
///
/// # Example
///
/// ```rust
/// use pollwater::validator::*;
/// use serde_json::json;
///
/// assert!(more_than(2).check(&vec![1, 2, 3]));
/// assert!(!more_than(3).check(&vec![1, 2, 3]));
/// assert!(!more_than(0).check(&json!(null)));
/// ```
pub fn more_than(threshold: usize) -> MoreThan {
    MoreThan { threshold }
}
