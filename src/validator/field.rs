//! Field-completeness validators.

use std::borrow::Cow;

use serde_json::Value;

use super::combinators::Validator;

/// Returns true if `s` is empty after trimming whitespace.
///
/// ```rust
/// use pollwater::validator::is_blank;
///
/// assert!(is_blank(""));
/// assert!(is_blank(" \t\n"));
/// assert!(!is_blank(" x "));
/// ```
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Accepts a JSON array in which every element has a non-blank string
/// under `field`.
///
/// An empty array is accepted. `null` elements, missing or `null` fields and
/// non-string field values all count as blank. A payload that is not an
/// array is rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldNotBlank {
    field: Cow<'static, str>,
}

impl FieldNotBlank {
    /// Name of the inspected field.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Validator<Value> for FieldNotBlank {
    fn check(&self, value: &Value) -> bool {
        let Some(items) = value.as_array() else {
            return false;
        };
        items.iter().all(|item| {
            item.get(&*self.field)
                .and_then(Value::as_str)
                .is_some_and(|text| !is_blank(text))
        })
    }
}

/// Create a validator that requires every record's `field` to be non-blank.
///
/// # Example
///
/// ```rust
/// use pollwater::validator::*;
/// use serde_json::json;
///
/// let v = field_not_blank("body");
/// assert!(v.check(&json!([{ "body": "x" }, { "body": "y" }])));
/// assert!(!v.check(&json!([{ "body": "x" }, { "body": "" }])));
/// assert!(v.check(&json!([])));
/// ```
pub fn field_not_blank(field: impl Into<Cow<'static, str>>) -> FieldNotBlank {
    FieldNotBlank {
        field: field.into(),
    }
}

/// Typed counterpart of [`FieldNotBlank`]: every element's text, as
/// returned by the accessor, must be present and non-blank.
#[derive(Clone, Copy, Debug)]
pub struct EveryNotBlank<F> {
    accessor: F,
}

impl<T, F> Validator<[T]> for EveryNotBlank<F>
where
    F: Fn(&T) -> Option<&str> + Send + Sync,
{
    fn check(&self, value: &[T]) -> bool {
        value
            .iter()
            .all(|item| (self.accessor)(item).is_some_and(|text| !is_blank(text)))
    }
}

impl<T, F> Validator<Vec<T>> for EveryNotBlank<F>
where
    F: Fn(&T) -> Option<&str> + Send + Sync,
{
    fn check(&self, value: &Vec<T>) -> bool {
        Validator::<[T]>::check(self, value.as_slice())
    }
}

/// Create a typed field-completeness validator from a text accessor.
///
/// # Example
///
/// ```rust
/// use pollwater::validator::*;
///
/// struct Comment {
///     body: Option<String>,
/// }
///
/// let v = every_not_blank(|c: &Comment| c.body.as_deref());
/// assert!(v.check(&vec![Comment { body: Some("hi".into()) }]));
/// assert!(!v.check(&vec![Comment { body: None }]));
/// ```
pub fn every_not_blank<T, F>(accessor: F) -> EveryNotBlank<F>
where
    F: Fn(&T) -> Option<&str> + Send + Sync,
{
    EveryNotBlank { accessor }
}
