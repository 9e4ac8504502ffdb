//! Record fixtures for tests and local runs.
//!
//! The sample directory has one organization (`acme.io`) with two branch
//! offices:
//!
//! | Branch | Users |
//! |---|---|
//! | `north` | `ana@acme.io`, `ben@acme.io` |
//! | `south` | `carla@acme.io`, `dan@acme.io` (hidden) |
//!
//! # Example
//!
//! ```
//! use vellum_store::fixtures;
//!
//! let store = fixtures::directory_store();
//! assert_eq!(store.len(fixtures::USERS), 4);
//! ```

use crate::memory::MemoryStore;
use chrono::{DateTime, TimeZone, Utc};
use vellum_core::Record;

/// OCR documents collection.
pub const DOCUMENTS: &str = "documents";
/// Document metadata collection.
pub const DOCUMENT_INFO: &str = "dataset";
/// Transactions collection.
pub const TRANSACTIONS: &str = "transaction";
/// Users collection.
pub const USERS: &str = "users";
/// Branch offices collection.
pub const BRANCH_OFFICES: &str = "branch_offices";
/// Organizations collection.
pub const ORGANIZATIONS: &str = "organizations";

/// Midnight UTC on the given day of January 2024.
#[must_use]
pub fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A directory user.
#[must_use]
pub fn user(uuid: &str, email: &str, branch: &str, visible: bool) -> Record {
    Record::new()
        .with("uuid", uuid)
        .with("email", email)
        .with("first_name", email.split('@').next().unwrap_or_default())
        .with("role", "associate")
        .with("branch_office_uuid", branch)
        .with("visible", visible)
        .with("created_at", jan(1))
}

/// A branch office.
#[must_use]
pub fn branch_office(uuid: &str, name: &str, organization: &str) -> Record {
    Record::new()
        .with("uuid", uuid)
        .with("name", name)
        .with("organization_uuid", organization)
        .with("visible", true)
        .with("created_at", jan(1))
}

/// An organization listing its branch offices.
#[must_use]
pub fn organization(uuid: &str, domain: &str, branches: Vec<Record>) -> Record {
    Record::new()
        .with("uuid", uuid)
        .with("name", domain.split('.').next().unwrap_or_default())
        .with("organization_domain", domain)
        .with("visible", true)
        .with("branch_offices", branches)
        .with("created_at", jan(1))
}

/// A document with `pages` pages of one line each.
#[must_use]
pub fn document(uuid: &str, owner: &str, pages: usize, created: DateTime<Utc>) -> Record {
    let pages: Vec<Record> = (0..pages)
        .map(|p| {
            let line = Record::new()
                .with("uuid", format!("{uuid}-l{p}"))
                .with("text", format!("line {p}"));
            let paragraph = Record::new().with("lines", vec![line]);
            let area = Record::new().with("paragraphs", vec![paragraph]);
            Record::new()
                .with("number", p as i64 + 1)
                .with("areas", vec![area])
        })
        .collect();
    Record::new()
        .with("uuid", uuid)
        .with("user_id", owner)
        .with("filename", format!("{uuid}.pdf"))
        .with("created_at", created)
        .with("pages", pages)
}

/// Document metadata with `matches` candidate matches.
#[must_use]
pub fn document_info(uuid: &str, owner: &str, matches: usize, created: DateTime<Utc>) -> Record {
    let matches: Vec<Record> = (0..matches)
        .map(|i| Record::new().with("score", 1.0 - i as f64 / 10.0))
        .collect();
    Record::new()
        .with("uuid", uuid)
        .with("user_id", owner)
        .with("filename", format!("{uuid}.pdf"))
        .with("created_at", created)
        .with("matches", matches)
}

/// A transaction whose single match grades every line quality with `grade`,
/// or no match when `grade` is `None`.
#[must_use]
pub fn transaction(owner: &str, invoice: &str, grade: Option<&str>, created: DateTime<Utc>) -> Record {
    let matches: Vec<Record> = grade
        .map(|g| {
            let qualities = ["branch", "date", "invoice_total", "client_number"]
                .iter()
                .fold(Record::new(), |r, field| r.with(*field, g));
            vec![Record::new().with("score", 0.9).with("line_qualities", qualities)]
        })
        .unwrap_or_default();
    Record::new()
        .with("user_id", owner)
        .with("commerce_name", "ACME Stores")
        .with("invoice_number", invoice)
        .with("branch", "north")
        .with("client_number", "C-100")
        .with("total_sale", 120.5)
        .with("invoice_total", 120.5)
        .with("date", created)
        .with("created_at", created)
        .with("matches", matches)
}

/// A store holding only the sample directory.
#[must_use]
pub fn directory_store() -> MemoryStore {
    let store = MemoryStore::new();
    seed_directory(&store);
    store
}

/// Inserts the sample directory.
pub fn seed_directory(store: &MemoryStore) {
    let north = branch_office("bo-north", "north", "org-acme");
    let south = branch_office("bo-south", "south", "org-acme");
    store.insert_many(BRANCH_OFFICES, [north.clone(), south.clone()]);
    store.insert(ORGANIZATIONS, organization("org-acme", "acme.io", vec![north, south]));
    store.insert_many(
        USERS,
        [
            user("u-ana", "ana@acme.io", "bo-north", true),
            user("u-ben", "ben@acme.io", "bo-north", true),
            user("u-carla", "carla@acme.io", "bo-south", true),
            user("u-dan", "dan@acme.io", "bo-south", false),
        ],
    );
}

/// A store holding the sample directory plus documents, metadata and
/// transactions owned by its users.
#[must_use]
pub fn sample_store() -> MemoryStore {
    let store = directory_store();
    store.insert_many(
        DOCUMENTS,
        [
            document("doc-1", "ana@acme.io", 2, jan(2)),
            document("doc-2", "ben@acme.io", 1, jan(3)),
            document("doc-3", "carla@acme.io", 1, jan(4)),
            document("doc-4", "ana@acme.io", 0, jan(5)),
        ],
    );
    store.insert_many(
        DOCUMENT_INFO,
        [
            document_info("doc-1", "ana@acme.io", 1, jan(2)),
            document_info("doc-2", "ben@acme.io", 0, jan(3)),
            document_info("doc-3", "carla@acme.io", 2, jan(4)),
            document_info("doc-4", "ana@acme.io", 0, jan(5))
                .with("verified", Record::new().with("total", true)),
        ],
    );
    store.insert_many(
        TRANSACTIONS,
        [
            transaction("ana@acme.io", "F-1", Some("A"), jan(2)),
            transaction("ben@acme.io", "F-2", Some("C"), jan(3)),
            transaction("carla@acme.io", "F-3", None, jan(4)),
            transaction("ana@acme.io", "F-4", Some("B"), jan(20)),
        ],
    );
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::Value;

    #[test]
    fn test_sample_store_counts() {
        let store = sample_store();
        assert_eq!(store.len(DOCUMENTS), 4);
        assert_eq!(store.len(DOCUMENT_INFO), 4);
        assert_eq!(store.len(TRANSACTIONS), 4);
        assert_eq!(store.len(BRANCH_OFFICES), 2);
    }

    #[test]
    fn test_document_shape() {
        let doc = document("d", "o", 2, jan(1));
        assert_eq!(doc.lookup_path("pages.areas.paragraphs.lines.uuid").len(), 2);
        assert_eq!(document("e", "o", 0, jan(1)).get("pages"), Some(&Value::Array(vec![])));
    }
}
