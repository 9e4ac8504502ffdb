//! Request and response bodies of the RPC surface.
//!
//! Every body is a JSON object. Missing fields take their defaults; unknown
//! fields are rejected so that typos surface as `InvalidRequest`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vellum_core::{VellumError, VellumResult, WireMessage, WireValue};
use vellum_schema::{catalog, json, SchemaRegistry};
use vellum_store::{DateRange, MatchPresence};

/// `getOne`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GetOneRequest {
    /// Record identifier.
    pub id: String,
}

/// `getMany`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GetManyRequest {
    /// Record identifiers. Unknown or invisible ids are left out of the
    /// stream.
    pub ids: Vec<String>,
    /// Top-level fields to return. Empty means the profile default.
    pub fields: Vec<String>,
}

/// `listAll`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListRequest {
    /// Records to skip.
    pub skip: u64,
    /// Page size. Missing or zero means the profile default.
    pub limit: Option<u64>,
    /// Creation window start, the Unix epoch when missing.
    pub start_date: Option<DateTime<Utc>>,
    /// Creation window end, now when missing.
    pub end_date: Option<DateTime<Utc>>,
    /// `true` for matched only, `false` for unmatched only.
    pub with_matches: Option<bool>,
    /// Top-level fields to return. Empty means the profile default.
    pub fields: Vec<String>,
}

impl ListRequest {
    /// Resolves the creation window.
    pub fn date_range(&self) -> VellumResult<DateRange> {
        Ok(DateRange::or_default(self.start_date, self.end_date)?)
    }

    /// Resolves the match predicate.
    pub fn match_presence(&self) -> MatchPresence {
        self.with_matches.into()
    }

    /// Resolves the page size.
    pub fn limit_or(&self, default: u64) -> u64 {
        self.limit.filter(|l| *l > 0).unwrap_or(default)
    }
}

/// `getMetrics`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsRequest {
    /// Window start.
    pub start_date: Option<DateTime<Utc>>,
    /// Window end.
    pub end_date: Option<DateTime<Utc>>,
}

impl MetricsRequest {
    /// Resolves the creation window.
    pub fn date_range(&self) -> VellumResult<DateRange> {
        Ok(DateRange::or_default(self.start_date, self.end_date)?)
    }
}

/// Counts over a creation window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Records in the window.
    pub total: u64,
    /// Records with at least one match.
    pub matched: u64,
    /// Records whose match grades are all good.
    pub matched_all_fields: u64,
}

impl MetricsReport {
    /// As a `Metrics` wire message.
    pub fn to_wire(&self) -> WireMessage {
        let int = |n: u64| WireValue::Int(i64::try_from(n).unwrap_or(i64::MAX));
        WireMessage::new(catalog::METRICS)
            .with("total", int(self.total))
            .with("matched", int(self.matched))
            .with("matched_all_fields", int(self.matched_all_fields))
    }
}

/// `updateDocumentLines`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateLinesRequest {
    /// Document uuid.
    pub document_id: String,
    /// `LineEdit` objects.
    pub lines: Vec<serde_json::Value>,
}

impl UpdateLinesRequest {
    /// Reads the edits as `LineEdit` messages.
    pub fn edits(&self, registry: &SchemaRegistry) -> VellumResult<Vec<WireMessage>> {
        self.lines
            .iter()
            .map(|line| json::from_json(registry, catalog::LINE_EDIT, line).map_err(VellumError::from))
            .collect()
    }
}

/// `updateDocumentLines` result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLinesResponse {
    /// Lines rewritten.
    pub count: u64,
}

/// `listBranchOffices`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BranchOfficesRequest {
    /// Organization domain, e.g. `acme.io`.
    pub organization_domain: String,
}

/// `listAssociates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssociatesRequest {
    /// Identity whose branch colleagues are listed.
    pub caller: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_request_defaults() {
        let request: ListRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.skip, 0);
        assert_eq!(request.limit_or(100), 100);
        assert_eq!(request.match_presence(), MatchPresence::Unspecified);
        let range = request.date_range().unwrap();
        assert_eq!(range.start().timestamp(), 0);
    }

    #[test]
    fn test_zero_limit_means_default() {
        let request = ListRequest {
            limit: Some(0),
            ..ListRequest::default()
        };
        assert_eq!(request.limit_or(50), 50);
    }

    #[test]
    fn test_inverted_window_is_invalid() {
        let request: ListRequest = serde_json::from_value(json!({
            "start_date": "2024-02-01T00:00:00Z",
            "end_date": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let err = request.date_range().unwrap_err();
        assert_eq!(err.category(), vellum_core::ErrorCategory::InvalidRequest);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(serde_json::from_value::<GetOneRequest>(json!({"uuid": "x"})).is_err());
    }

    #[test]
    fn test_line_edits_are_schema_checked() {
        let registry = catalog::standard();
        let ok = UpdateLinesRequest {
            document_id: "doc-1".into(),
            lines: vec![json!({"uuid": "l-1", "text": "TOTAL"})],
        };
        assert_eq!(ok.edits(&registry).unwrap()[0].get_str("text"), Some("TOTAL"));

        let bad = UpdateLinesRequest {
            document_id: "doc-1".into(),
            lines: vec![json!({"uuid": "l-1", "text": ["x"]})],
        };
        assert!(bad.edits(&registry).is_err());
    }

    #[test]
    fn test_metrics_wire_shape() {
        let report = MetricsReport {
            total: 4,
            matched: 3,
            matched_all_fields: 2,
        };
        let wire = report.to_wire();
        assert_eq!(wire.get("matched"), Some(&WireValue::Int(3)));
    }
}
