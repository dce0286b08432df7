//! Request validation with field-level error accumulation.
//!
//! Validation never stops at the first problem: every violated field is
//! collected into a [`ValidationErrors`] map so API clients can render the
//! complete list in one round trip.

mod error;

pub use error::{FieldError, ValidationErrorKind, ValidationErrors, ValidationResult};
