//! Store-agnostic query filters.
//!
//! A [`QueryFilter`] is a conjunction of [`Predicate`]s over dotted field
//! paths. Paths traverse arrays element-wise, so a predicate on
//! `matches.line_qualities.branch` holds when any match satisfies it.

use std::cmp::Ordering;
use vellum_core::{Record, Value};

/// One condition on a field path.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Some value at `field` equals `value`.
    Eq {
        /// Dotted field path.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// Some value at `field` is one of `values`.
    In {
        /// Dotted field path.
        field: String,
        /// Admitted values. Empty admits nothing.
        values: Vec<Value>,
    },
    /// Some value at `field` lies within the inclusive bounds.
    Range {
        /// Dotted field path.
        field: String,
        /// Inclusive lower bound.
        gte: Option<Value>,
        /// Inclusive upper bound.
        lte: Option<Value>,
    },
    /// The array at `field` is empty.
    IsEmpty {
        /// Dotted field path.
        field: String,
    },
    /// The array at `field` has at least one element.
    NotEmpty {
        /// Dotted field path.
        field: String,
    },
}

impl Predicate {
    /// `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `field ∈ values`.
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `gte <= field <= lte`.
    pub fn between(field: impl Into<String>, gte: impl Into<Value>, lte: impl Into<Value>) -> Self {
        Self::Range {
            field: field.into(),
            gte: Some(gte.into()),
            lte: Some(lte.into()),
        }
    }

    /// Returns the field path the predicate constrains.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. }
            | Self::In { field, .. }
            | Self::Range { field, .. }
            | Self::IsEmpty { field }
            | Self::NotEmpty { field } => field,
        }
    }

    /// Evaluates the predicate against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let found = record.lookup_path(self.field());
        match self {
            Self::Eq { value, .. } => found.iter().any(|v| any_element(v, |e| loosely_equal(e, value))),
            Self::In { values, .. } => found
                .iter()
                .any(|v| any_element(v, |e| values.iter().any(|x| loosely_equal(e, x)))),
            Self::Range { gte, lte, .. } => found.iter().any(|v| {
                any_element(v, |e| {
                    let above = gte
                        .as_ref()
                        .map_or(true, |lo| compare(e, lo).is_some_and(Ordering::is_ge));
                    let below = lte
                        .as_ref()
                        .map_or(true, |hi| compare(e, hi).is_some_and(Ordering::is_le));
                    above && below
                })
            }),
            Self::IsEmpty { .. } => found
                .iter()
                .any(|v| matches!(v, Value::Array(items) if items.is_empty())),
            Self::NotEmpty { .. } => found
                .iter()
                .any(|v| matches!(v, Value::Array(items) if !items.is_empty())),
        }
    }
}

fn any_element(value: &Value, test: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => test(value) || items.iter().any(&test),
        other => test(other),
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Double(y)) | (Value::Double(y), Value::Int(x)) => (*x as f64) == *y,
        _ => a == b,
    }
}

/// Orders two values of comparable kinds. Mixed kinds are unordered, except
/// that integers and floats compare numerically.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Double(y)) => (*x as f64).partial_cmp(y),
        (Value::Double(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::ObjectId(x), Value::ObjectId(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// A conjunction of predicates. The empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    predicates: Vec<Predicate>,
}

impl QueryFilter {
    /// The filter that matches everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds a predicate.
    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Adds a predicate in place.
    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Returns the predicates in insertion order.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Returns the predicates constraining `field`.
    pub fn on<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Predicate> + 'a {
        self.predicates.iter().filter(move |p| p.field() == field)
    }

    /// Returns `true` if the filter has no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Evaluates every predicate against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

impl FromIterator<Predicate> for QueryFilter {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self {
            predicates: iter.into_iter().collect(),
        }
    }
}
