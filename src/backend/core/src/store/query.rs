//! Store-level query description: equality filters, ordering, pagination.
//!
//! Mirrors the primitives a managed document store exposes natively. There is
//! deliberately no substring or full-text matching here; free-text search is
//! applied by the query engine on top of the returned page.

use serde_json::Value;

use crate::pagination::SortDirection;

/// An equality filter on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

/// Ordering on a single top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Resume position for an ordered scan: the (order value, id) pair of the
/// last document of the previous page. Comparison-based, so the scan resumes
/// correctly even if that document was deleted in the meantime.
#[derive(Debug, Clone, PartialEq)]
pub struct StartAfter {
    pub value: Value,
    pub id: String,
}

/// A store-native query: conjunction of equality filters, one order-by field
/// (document id as tiebreak), optional limit and resume position.
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub start_after: Option<StartAfter>,
}

impl StoreQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Set the order-by field and direction.
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Cap the number of returned documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after the given (order value, id) position.
    pub fn start_after(mut self, value: Value, id: impl Into<String>) -> Self {
        self.start_after = Some(StartAfter {
            value,
            id: id.into(),
        });
        self
    }
}

/// Total order over JSON values used for ordered scans.
///
/// Null < Bool < Number < String < Array < Object; numbers compare as f64.
/// Strings that both parse as RFC 3339 timestamps compare chronologically
/// (serialized timestamps carry variable subsecond precision, so a plain
/// lexicographic comparison would misorder them); other strings compare
/// lexicographically.
pub(crate) fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use chrono::DateTime;
    use std::cmp::Ordering;

    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
