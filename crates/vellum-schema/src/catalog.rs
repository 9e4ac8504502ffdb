//! Built-in message schemas for the dataset, transactions and identity
//! services.

use crate::registry::{MessageSchema, PlainType, SchemaRegistry};

/// OCR document root.
pub const DOCUMENT: &str = "Document";
/// Document page.
pub const PAGE: &str = "Page";
/// Layout area within a page.
pub const AREA: &str = "Area";
/// Paragraph within an area.
pub const PARAGRAPH: &str = "Paragraph";
/// Text line.
pub const LINE: &str = "Line";
/// Word within a line.
pub const WORD: &str = "Word";
/// Rectangle given by two corners.
pub const BOUNDING_BOX: &str = "BoundingBox";
/// 2D point.
pub const POINT: &str = "Point";
/// Document metadata with verification and match state.
pub const DOCUMENT_INFO: &str = "DocumentInfo";
/// A candidate transaction match.
pub const MATCH: &str = "Match";
/// A commercial transaction.
pub const TRANSACTION: &str = "Transaction";
/// Directory user.
pub const USER: &str = "User";
/// Branch office.
pub const BRANCH_OFFICE: &str = "BranchOffice";
/// Organization.
pub const ORGANIZATION: &str = "Organization";
/// Associate entry returned by the identity lookup.
pub const ASSOCIATE: &str = "Associate";
/// Single line edit sent to `updateDocumentLines`.
pub const LINE_EDIT: &str = "LineEdit";
/// Aggregate counts returned by `getMetrics`.
pub const METRICS: &str = "Metrics";

/// Fields returned by transaction listings when no projection is requested.
pub const TRANSACTION_SUMMARY_FIELDS: &[&str] = &[
    "commerce_name",
    "invoice_number",
    "date",
    "total_sale",
    "expiration_date",
    "matches",
];

/// Fields returned by transaction multi-get when no projection is requested.
pub const TRANSACTION_DETAIL_FIELDS: &[&str] = &[
    "commerce_name",
    "invoice_number",
    "date",
    "total_sale",
    "expiration_date",
    "matches",
    "client_number",
    "branch",
    "invoice_amount",
    "promotional_discount",
    "physical_change",
    "invoice_value",
    "agreed_discount",
    "invoice_clean_amount",
    "ieps_tax",
    "iva_tax",
    "invoice_total",
];

/// Builds the registry with every built-in message type.
///
/// # Panics
///
/// Never in practice: the catalogue is closed over its own references, which
/// `catalog_is_self_contained` asserts.
#[must_use]
pub fn standard() -> SchemaRegistry {
    match builder().build() {
        Ok(registry) => registry,
        Err(err) => unreachable!("built-in catalogue is inconsistent: {err}"),
    }
}

/// The registry builder pre-loaded with the built-in types, for callers that
/// want to register more.
#[must_use]
pub fn builder() -> crate::registry::SchemaRegistryBuilder {
    SchemaRegistry::builder()
        .message(
            MessageSchema::builder(POINT)
                .plain("x", PlainType::Double)
                .plain("y", PlainType::Double)
                .build(),
        )
        .message(
            MessageSchema::builder(BOUNDING_BOX)
                .object("top_left", POINT)
                .object("bottom_right", POINT)
                .build(),
        )
        .message(
            MessageSchema::builder(WORD)
                .string("uuid")
                .string("text")
                .plain("confidence", PlainType::Double)
                .object("bbox", BOUNDING_BOX)
                .build(),
        )
        .message(
            MessageSchema::builder(LINE)
                .string("uuid")
                .string("text")
                .plain("confidence", PlainType::Double)
                .object("bbox", BOUNDING_BOX)
                .list("words", WORD)
                .build(),
        )
        .message(
            MessageSchema::builder(PARAGRAPH)
                .object("bbox", BOUNDING_BOX)
                .list("lines", LINE)
                .build(),
        )
        .message(
            MessageSchema::builder(AREA)
                .object("bbox", BOUNDING_BOX)
                .list("paragraphs", PARAGRAPH)
                .build(),
        )
        .message(
            MessageSchema::builder(PAGE)
                .plain("number", PlainType::Int)
                .plain("width", PlainType::Double)
                .plain("height", PlainType::Double)
                .object("bbox", BOUNDING_BOX)
                .list("areas", AREA)
                .build(),
        )
        .message(
            MessageSchema::builder(DOCUMENT)
                .identifier("_id")
                .string("uuid")
                .string("user_id")
                .string("filename")
                .timestamp("created_at")
                .timestamp("updated_at")
                .list("pages", PAGE)
                .build(),
        )
        .message(
            MessageSchema::builder(MATCH)
                .identifier("transaction_id")
                .plain("score", PlainType::Double)
                .map("line_qualities")
                .build(),
        )
        .message(
            MessageSchema::builder(DOCUMENT_INFO)
                .identifier("_id")
                .string("uuid")
                .string("user_id")
                .string("filename")
                .string("extension")
                .string("status")
                .timestamp("created_at")
                .timestamp("updated_at")
                .map("verified")
                .list("matches", MATCH)
                .build(),
        )
        .message(
            MessageSchema::builder(TRANSACTION)
                .identifier("_id")
                .string("user_id")
                .string("commerce_name")
                .string("invoice_number")
                .string("client_number")
                .string("branch")
                .timestamp("date")
                .timestamp("expiration_date")
                .plain("total_sale", PlainType::Double)
                .plain("invoice_amount", PlainType::Double)
                .plain("promotional_discount", PlainType::Double)
                .plain("physical_change", PlainType::Double)
                .plain("invoice_value", PlainType::Double)
                .plain("agreed_discount", PlainType::Double)
                .plain("invoice_clean_amount", PlainType::Double)
                .plain("ieps_tax", PlainType::Double)
                .plain("iva_tax", PlainType::Double)
                .plain("invoice_total", PlainType::Double)
                .timestamp("created_at")
                .list("matches", MATCH)
                .build(),
        )
        .message(
            MessageSchema::builder(USER)
                .string("uuid")
                .string("first_name")
                .string("last_name")
                .string("email")
                .string("role")
                .string("branch_office_uuid")
                .plain("visible", PlainType::Bool)
                .object("branch_office", BRANCH_OFFICE)
                .timestamp("created_at")
                .timestamp("updated_at")
                .build(),
        )
        .message(
            MessageSchema::builder(BRANCH_OFFICE)
                .string("uuid")
                .string("name")
                .string("street")
                .string("number")
                .string("city")
                .string("state")
                .string("zip_code")
                .string("organization_uuid")
                .plain("visible", PlainType::Bool)
                .list("users", USER)
                .object("organization", ORGANIZATION)
                .timestamp("created_at")
                .timestamp("updated_at")
                .build(),
        )
        .message(
            MessageSchema::builder(ORGANIZATION)
                .string("uuid")
                .string("name")
                .string("organization_domain")
                .plain("visible", PlainType::Bool)
                .list("branch_offices", BRANCH_OFFICE)
                .timestamp("created_at")
                .timestamp("updated_at")
                .build(),
        )
        .message(
            MessageSchema::builder(ASSOCIATE)
                .string("uuid")
                .string("email")
                .build(),
        )
        .message(
            MessageSchema::builder(LINE_EDIT)
                .string("uuid")
                .string("text")
                .build(),
        )
        .message(
            MessageSchema::builder(METRICS)
                .plain("total", PlainType::Int)
                .plain("matched", PlainType::Int)
                .plain("matched_all_fields", PlainType::Int)
                .build(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_self_contained() {
        assert!(builder().build().is_ok());
    }

    #[test]
    fn projection_fields_are_declared() {
        let registry = standard();
        let transaction = registry.require(TRANSACTION).unwrap();
        for field in TRANSACTION_SUMMARY_FIELDS.iter().chain(TRANSACTION_DETAIL_FIELDS) {
            assert!(transaction.field(field).is_some(), "{field} is not declared");
        }
    }
}
