//! The RPC route table.
//!
//! Every operation is `POST /{service}/{operation}`:
//!
//! | Service | Operations |
//! |---|---|
//! | `dataset` | `getOne`, `getMany`, `listAll`, `updateDocumentLines`, `getDocumentInfo`, `getManyDocumentInfo`, `listDocumentInfo`, `getMetrics` |
//! | `transactions` | `getOne`, `getMany`, `listAll`, `getMetrics` |
//! | `identity` | `getUser`, `getBranchOffice`, `getOrganization`, `listOrganizations`, `listBranchOffices`, `listAssociates` |

/// Entity behind a generic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// OCR documents.
    Documents,
    /// Document metadata.
    DocumentInfo,
    /// Transactions.
    Transactions,
    /// Users.
    Users,
    /// Branch offices.
    BranchOffices,
    /// Organizations.
    Organizations,
}

/// A routed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Single record by id.
    GetOne(Entity),
    /// Records by id, streamed.
    GetMany(Entity),
    /// A page of records, streamed.
    ListAll(Entity),
    /// Window counts.
    GetMetrics(Entity),
    /// Line text rewrite.
    UpdateDocumentLines,
    /// Branch offices of an organization domain, streamed.
    ListBranchOffices,
    /// Associates of a caller, streamed.
    ListAssociates,
}

impl Operation {
    /// Resolves `/{service}/{operation}`.
    pub fn route(service: &str, operation: &str) -> Option<Self> {
        use Entity::{
            BranchOffices, DocumentInfo, Documents, Organizations, Transactions, Users,
        };
        let op = match (service, operation) {
            ("dataset", "getOne") => Self::GetOne(Documents),
            ("dataset", "getMany") => Self::GetMany(Documents),
            ("dataset", "listAll") => Self::ListAll(Documents),
            ("dataset", "updateDocumentLines") => Self::UpdateDocumentLines,
            ("dataset", "getDocumentInfo") => Self::GetOne(DocumentInfo),
            ("dataset", "getManyDocumentInfo") => Self::GetMany(DocumentInfo),
            ("dataset", "listDocumentInfo") => Self::ListAll(DocumentInfo),
            ("dataset", "getMetrics") => Self::GetMetrics(DocumentInfo),

            ("transactions", "getOne") => Self::GetOne(Transactions),
            ("transactions", "getMany") => Self::GetMany(Transactions),
            ("transactions", "listAll") => Self::ListAll(Transactions),
            ("transactions", "getMetrics") => Self::GetMetrics(Transactions),

            ("identity", "getUser") => Self::GetOne(Users),
            ("identity", "getBranchOffice") => Self::GetOne(BranchOffices),
            ("identity", "getOrganization") => Self::GetOne(Organizations),
            ("identity", "listOrganizations") => Self::ListAll(Organizations),
            ("identity", "listBranchOffices") => Self::ListBranchOffices,
            ("identity", "listAssociates") => Self::ListAssociates,
            _ => return None,
        };
        Some(op)
    }

    /// Parses a request path.
    pub fn from_path(path: &str) -> Option<(&str, &str, Self)> {
        let mut segments = path.trim_matches('/').split('/');
        let (Some(service), Some(operation), None) =
            (segments.next(), segments.next(), segments.next())
        else {
            return None;
        };
        Self::route(service, operation).map(|op| (service, operation, op))
    }

    /// Whether the response is an NDJSON stream.
    pub const fn is_streaming(&self) -> bool {
        matches!(
            self,
            Self::GetMany(_) | Self::ListAll(_) | Self::ListBranchOffices | Self::ListAssociates
        )
    }
}
