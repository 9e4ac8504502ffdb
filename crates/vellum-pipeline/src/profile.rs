//! Entity profiles.
//!
//! A profile tells the generic pipeline where an entity lives and how it is
//! filtered, listed and reported on. Adding an entity is adding a profile.

use vellum_core::{Record, Value};
use vellum_schema::catalog;
use vellum_store::{fixtures, FilterFields, Predicate, SortKey};

/// Grades that count as a good line match.
pub const GOOD_GRADES: [&str; 2] = ["A", "B"];

/// Criteria for `matched_all_fields` in metrics: every listed quality field
/// must carry one of the accepted grades.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityRule {
    /// Dotted prefix of the quality map, e.g. `matches.line_qualities`.
    pub prefix: String,
    /// Graded fields under the prefix.
    pub fields: Vec<String>,
    /// Accepted grades.
    pub grades: Vec<String>,
}

impl QualityRule {
    /// One membership predicate per graded field.
    pub fn predicates(&self) -> Vec<Predicate> {
        self.fields
            .iter()
            .map(|field| {
                Predicate::is_in(
                    format!("{}.{field}", self.prefix),
                    self.grades.iter().map(String::as_str),
                )
            })
            .collect()
    }
}

/// Static description of one business entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityProfile {
    /// Service label used in logs and metrics.
    pub service: String,
    /// Store collection.
    pub collection: String,
    /// Wire message type.
    pub message: String,
    /// Field names used by the filter builder.
    pub filter_fields: FilterFields,
    /// Whether calls are restricted by the caller's scope.
    pub scoped: bool,
    /// Predicates applied to every query.
    pub constraints: Vec<Predicate>,
    /// Field that must be a non-empty list for a record to be streamed.
    pub populated_field: Option<String>,
    /// Listing page size when the request gives none.
    pub default_limit: u64,
    /// Listing order. `None` keeps store order.
    pub sort: Option<SortKey>,
    /// Projection for listings when the request gives none.
    pub list_fields: Vec<String>,
    /// Projection for multi-get when the request gives none.
    pub detail_fields: Vec<String>,
    /// `matched_all_fields` criteria. Without one the figure equals `matched`.
    pub quality: Option<QualityRule>,
}

fn strings(fields: &[&str]) -> Vec<String> {
    fields.iter().map(ToString::to_string).collect()
}

impl EntityProfile {
    fn base(service: &str, collection: &str, message: &str) -> Self {
        Self {
            service: service.to_string(),
            collection: collection.to_string(),
            message: message.to_string(),
            filter_fields: FilterFields::default(),
            scoped: true,
            constraints: Vec::new(),
            populated_field: None,
            default_limit: 100,
            sort: Some(SortKey::ascending("created_at")),
            list_fields: Vec::new(),
            detail_fields: Vec::new(),
            quality: None,
        }
    }

    fn directory(collection: &str, message: &str) -> Self {
        Self {
            scoped: false,
            constraints: vec![Predicate::eq("visible", true)],
            sort: None,
            ..Self::base("identity", collection, message)
        }
    }

    /// OCR documents. Documents without pages are not yet processed and are
    /// left out of streams.
    pub fn documents() -> Self {
        Self {
            populated_field: Some("pages".to_string()),
            ..Self::base("dataset", fixtures::DOCUMENTS, catalog::DOCUMENT)
        }
    }

    /// Document metadata and candidate matches.
    pub fn document_info() -> Self {
        Self::base("dataset", fixtures::DOCUMENT_INFO, catalog::DOCUMENT_INFO)
    }

    /// Transactions, keyed by store-native object id.
    pub fn transactions() -> Self {
        Self {
            filter_fields: FilterFields {
                id: "_id".to_string(),
                id_is_object_id: true,
                ..FilterFields::default()
            },
            default_limit: 50,
            sort: None,
            list_fields: strings(catalog::TRANSACTION_SUMMARY_FIELDS),
            detail_fields: strings(catalog::TRANSACTION_DETAIL_FIELDS),
            quality: Some(QualityRule {
                prefix: "matches.line_qualities".to_string(),
                fields: strings(&["branch", "date", "invoice_total", "client_number"]),
                grades: strings(&GOOD_GRADES),
            }),
            ..Self::base("transactions", fixtures::TRANSACTIONS, catalog::TRANSACTION)
        }
    }

    /// Visible users.
    pub fn users() -> Self {
        Self::directory(fixtures::USERS, catalog::USER)
    }

    /// Visible branch offices.
    pub fn branch_offices() -> Self {
        Self::directory(fixtures::BRANCH_OFFICES, catalog::BRANCH_OFFICE)
    }

    /// Visible organizations.
    pub fn organizations() -> Self {
        Self::directory(fixtures::ORGANIZATIONS, catalog::ORGANIZATION)
    }

    /// Overrides the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Overrides the default listing limit.
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    /// Returns `false` for records whose populated field is missing or an
    /// empty list.
    pub fn is_populated(&self, record: &Record) -> bool {
        let Some(field) = &self.populated_field else {
            return true;
        };
        match record.get(field) {
            Some(Value::Array(items)) => !items.is_empty(),
            _ => false,
        }
    }
}
