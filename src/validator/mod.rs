//! Validators decide when polling can stop.
//!
//! A [`Validator`] is a pure predicate over a resolved payload. Any
//! `Fn(&T) -> bool` closure is a validator, and validators can be combined
//! with [`ValidatorExt::and`], [`ValidatorExt::or`] and [`ValidatorExt::not`].
//!
//! Two domain validators ship with the crate:
//!
//! - [`more_than`]: the payload is a collection with more than `n` items.
//! - [`field_not_blank`] / [`every_not_blank`]: every record in the payload
//!   carries a non-blank text field.
//!
//! Both work on `serde_json::Value` payloads; the typed variants work on
//! `Vec<T>` and `[T]`.
//!
//! # Example
//!
//! ```rust
//! use pollwater::validator::*;
//! use serde_json::json;
//!
//! let comments = json!([{ "body": "first" }, { "body": "   " }]);
//!
//! assert!(more_than(1).check(&comments));
//! assert!(!field_not_blank("body").check(&comments));
//! ```

mod collection;
mod combinators;
mod field;

pub use collection::{more_than, MoreThan, DEFAULT_MIN_ITEMS};
pub use combinators::{And, Not, Or, Validator, ValidatorExt};
pub use field::{every_not_blank, field_not_blank, is_blank, EveryNotBlank, FieldNotBlank};
