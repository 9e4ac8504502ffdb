//! Combines an access scope with request parameters into a [`QueryFilter`].
//!
//! The builder is pure: identical inputs always produce an identical filter,
//! and building never touches the store.

use crate::error::FilterError;
use crate::filter::{Predicate, QueryFilter};
use chrono::{DateTime, TimeZone, Utc};
use vellum_core::{ObjectId, ScopeToken, Value};

/// Tri-state predicate on the match collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPresence {
    /// No predicate.
    #[default]
    Unspecified,
    /// The match collection is non-empty.
    Matched,
    /// The match collection is empty.
    Unmatched,
}

impl From<Option<bool>> for MatchPresence {
    fn from(with_matches: Option<bool>) -> Self {
        match with_matches {
            None => Self::Unspecified,
            Some(true) => Self::Matched,
            Some(false) => Self::Unmatched,
        }
    }
}

/// Inclusive creation-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range, rejecting one that ends before it starts.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, FilterError> {
        if end < start {
            return Err(FilterError::InvertedRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Fills missing bounds with the Unix epoch and the current instant.
    pub fn or_default(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, FilterError> {
        let start = start.unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap_or_default());
        let end = end.unwrap_or_else(Utc::now);
        Self::new(start, end)
    }

    /// Range start.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Range end.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Request-supplied constraints.
///
/// # Example
///
/// ```
/// use vellum_store::{FilterParams, MatchPresence};
///
/// let params = FilterParams::new()
///     .with_ids(["d-1", "d-2"])
///     .with_matches(MatchPresence::Matched);
/// assert_eq!(params.ids().map(<[String]>::len), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParams {
    id: Option<String>,
    ids: Option<Vec<String>>,
    created: Option<DateRange>,
    matches: MatchPresence,
    extra: Vec<Predicate>,
}

impl FilterParams {
    /// No constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a single identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Restricts to a set of identifiers.
    #[must_use]
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts the creation time.
    #[must_use]
    pub fn created_within(mut self, range: DateRange) -> Self {
        self.created = Some(range);
        self
    }

    /// Sets the match-presence predicate.
    #[must_use]
    pub fn with_matches(mut self, presence: MatchPresence) -> Self {
        self.matches = presence;
        self
    }

    /// Adds an arbitrary extra predicate.
    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.extra.push(predicate);
        self
    }

    /// Returns the multi-get identifiers.
    #[must_use]
    pub fn ids(&self) -> Option<&[String]> {
        self.ids.as_deref()
    }
}

/// Field names the builder targets for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFields {
    /// Field holding the owning identity.
    pub owner: String,
    /// Field addressed by `getOne` / `getMany`.
    pub id: String,
    /// Whether `id` holds store-native object identifiers.
    pub id_is_object_id: bool,
    /// Creation timestamp field.
    pub created_at: String,
    /// Match collection field.
    pub matches: String,
}

impl Default for FilterFields {
    fn default() -> Self {
        Self {
            owner: "user_id".to_string(),
            id: "uuid".to_string(),
            id_is_object_id: false,
            created_at: "created_at".to_string(),
            matches: "matches".to_string(),
        }
    }
}

/// Builds query filters for one entity.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    fields: FilterFields,
}

impl FilterBuilder {
    /// Creates a builder over the given field names.
    #[must_use]
    pub fn new(fields: FilterFields) -> Self {
        Self { fields }
    }

    /// Returns the field names.
    #[must_use]
    pub fn fields(&self) -> &FilterFields {
        &self.fields
    }

    /// Builds the filter: scope first, then identifiers, creation window,
    /// match presence and extras, all conjoined.
    ///
    /// # Example
    ///
    /// ```
    /// use vellum_core::ScopeToken;
    /// use vellum_store::{FilterBuilder, FilterParams, Predicate};
    ///
    /// let filter = FilterBuilder::default()
    ///     .build(&ScopeToken::restricted(["a", "b"]), &FilterParams::new().with_ids(["b", "c"]))
    ///     .unwrap();
    /// assert_eq!(
    ///     filter.predicates(),
    ///     &[Predicate::is_in("user_id", ["a", "b"]), Predicate::is_in("uuid", ["b", "c"])]
    /// );
    /// ```
    pub fn build(&self, scope: &ScopeToken, params: &FilterParams) -> Result<QueryFilter, FilterError> {
        let mut filter = QueryFilter::all();

        if let ScopeToken::RestrictedTo(owners) = scope {
            filter.push(Predicate::is_in(self.fields.owner.clone(), owners.iter().cloned()));
        }

        if let Some(id) = &params.id {
            filter.push(Predicate::Eq {
                field: self.fields.id.clone(),
                value: self.id_value(id)?,
            });
        }

        if let Some(ids) = &params.ids {
            let values = ids
                .iter()
                .map(|id| self.id_value(id))
                .collect::<Result<Vec<_>, _>>()?;
            filter.push(Predicate::In {
                field: self.fields.id.clone(),
                values,
            });
        }

        if let Some(range) = &params.created {
            filter.push(Predicate::between(
                self.fields.created_at.clone(),
                range.start,
                range.end,
            ));
        }

        match params.matches {
            MatchPresence::Unspecified => {}
            MatchPresence::Matched => filter.push(Predicate::NotEmpty {
                field: self.fields.matches.clone(),
            }),
            MatchPresence::Unmatched => filter.push(Predicate::IsEmpty {
                field: self.fields.matches.clone(),
            }),
        }

        for predicate in &params.extra {
            filter.push(predicate.clone());
        }

        Ok(filter)
    }

    fn id_value(&self, raw: &str) -> Result<Value, FilterError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FilterError::EmptyIdentifier);
        }
        if self.fields.id_is_object_id {
            ObjectId::parse_str(raw)
                .map(Value::ObjectId)
                .map_err(|_| FilterError::InvalidIdentifier(raw.to_string()))
        } else {
            Ok(Value::from(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::Record;

    fn record(owner: &str, id: &str) -> Record {
        Record::new().with("user_id", owner).with("uuid", id)
    }

    #[test]
    fn test_unrestricted_adds_no_owner_predicate() {
        let filter = FilterBuilder::default()
            .build(&ScopeToken::Unrestricted, &FilterParams::new())
            .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_scope_and_ids_intersect() {
        let filter = FilterBuilder::default()
            .build(
                &ScopeToken::restricted(["a", "b"]),
                &FilterParams::new().with_ids(["b", "c"]),
            )
            .unwrap();

        let visible: Vec<_> = [("a", "a"), ("b", "b"), ("c", "c"), ("a", "b"), ("a", "c")]
            .iter()
            .filter(|(owner, id)| filter.matches(&record(owner, id)))
            .copied()
            .collect();
        assert_eq!(visible, vec![("b", "b"), ("a", "b")]);
    }

    #[test]
    fn test_nobody_scope_matches_nothing() {
        let filter = FilterBuilder::default()
            .build(&ScopeToken::nobody(), &FilterParams::new())
            .unwrap();
        assert!(!filter.matches(&record("a", "x")));
        assert!(!filter.matches(&record("", "x")));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = FilterBuilder::default();
        let scope = ScopeToken::restricted(["z", "a", "m"]);
        let params = FilterParams::new()
            .with_ids(["1", "2"])
            .with_matches(MatchPresence::Matched);
        assert_eq!(builder.build(&scope, &params), builder.build(&scope, &params));
    }

    #[test]
    fn test_match_presence_tri_state() {
        let builder = FilterBuilder::default();
        let scope = ScopeToken::Unrestricted;
        let unspecified = builder.build(&scope, &FilterParams::new()).unwrap();
        let matched = builder
            .build(&scope, &FilterParams::new().with_matches(MatchPresence::from(Some(true))))
            .unwrap();
        let unmatched = builder
            .build(&scope, &FilterParams::new().with_matches(MatchPresence::from(Some(false))))
            .unwrap();
        assert!(unspecified.is_empty());
        assert_eq!(matched.predicates(), &[Predicate::NotEmpty { field: "matches".into() }]);
        assert_eq!(unmatched.predicates(), &[Predicate::IsEmpty { field: "matches".into() }]);
    }

    #[test]
    fn test_object_id_fields_parse_identifiers() {
        let builder = FilterBuilder::new(FilterFields {
            id: "_id".into(),
            id_is_object_id: true,
            ..FilterFields::default()
        });
        let ok = builder.build(
            &ScopeToken::Unrestricted,
            &FilterParams::new().with_id("65a1f0c2e4b0a1b2c3d4e5f6"),
        );
        assert!(matches!(
            ok.unwrap().predicates(),
            [Predicate::Eq { value: Value::ObjectId(_), .. }]
        ));

        let bad = builder.build(&ScopeToken::Unrestricted, &FilterParams::new().with_ids(["nope"]));
        assert_eq!(bad, Err(FilterError::InvalidIdentifier("nope".into())));
    }

    #[test]
    fn test_blank_identifier_is_rejected() {
        let result = FilterBuilder::default().build(
            &ScopeToken::Unrestricted,
            &FilterParams::new().with_ids(["a", " "]),
        );
        assert_eq!(result, Err(FilterError::EmptyIdentifier));
    }

    #[test]
    fn test_date_range_defaults_and_validation() {
        let range = DateRange::or_default(None, None).unwrap();
        assert_eq!(range.start().timestamp(), 0);
        assert!(range.end() <= Utc::now());

        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(DateRange::new(start, end), Err(FilterError::InvertedRange { .. })));
    }
}
