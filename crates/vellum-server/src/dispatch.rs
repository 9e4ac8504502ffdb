//! Maps a routed operation onto the services.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use vellum_core::{CallerId, RequestContext, VellumError, VellumResult, WireMessage};
use vellum_pipeline::{
    AssociatesRequest, BranchOfficesRequest, EntityService, GetManyRequest, GetOneRequest,
    ListRequest, MetricsRequest, Services, UpdateLinesRequest, UpdateLinesResponse, WireStream,
};
use vellum_schema::{json, SchemaRegistry};

use crate::routes::{Entity, Operation};

/// What an operation answers with.
pub enum Reply {
    /// A single JSON object.
    Unary(Json),
    /// Wire messages, one JSON line each.
    Stream(WireStream),
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unary(body) => f.debug_tuple("Unary").field(body).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Decodes request bodies and invokes the matching service call.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    services: Services,
    registry: Arc<SchemaRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over `services`. `registry` reads line edits.
    pub fn new(services: Services, registry: Arc<SchemaRegistry>) -> Self {
        Self { services, registry }
    }

    /// The services behind the routes.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Runs `op` with the JSON `body`. An empty body reads as `{}`.
    pub async fn dispatch(
        &self,
        op: Operation,
        ctx: &RequestContext,
        body: &[u8],
    ) -> VellumResult<Reply> {
        match op {
            Operation::GetOne(entity) => {
                let request: GetOneRequest = parse(body)?;
                let identity = &self.services.identity;
                let message = match entity {
                    Entity::Users => identity.get_user(ctx, &request.id).await?,
                    Entity::BranchOffices => identity.get_branch_office(ctx, &request.id).await?,
                    Entity::Organizations => identity.get_organization(ctx, &request.id).await?,
                    other => self.entity(other)?.get_one(ctx, &request.id).await?,
                };
                Ok(unary(&message))
            }
            Operation::GetMany(entity) => {
                let request: GetManyRequest = parse(body)?;
                let stream = self.entity(entity)?.get_many(ctx, &request).await?;
                Ok(Reply::Stream(stream))
            }
            Operation::ListAll(Entity::Organizations) => {
                let request: ListRequest = parse(body)?;
                let stream = self.services.identity.list_organizations(ctx, &request).await?;
                Ok(Reply::Stream(stream))
            }
            Operation::ListAll(entity) => {
                let request: ListRequest = parse(body)?;
                let stream = self.entity(entity)?.list_all(ctx, &request).await?;
                Ok(Reply::Stream(stream))
            }
            Operation::GetMetrics(entity) => {
                let request: MetricsRequest = parse(body)?;
                let report = self.entity(entity)?.get_metrics(ctx, &request).await?;
                Ok(unary(&report.to_wire()))
            }
            Operation::UpdateDocumentLines => {
                let request: UpdateLinesRequest = parse(body)?;
                if request.document_id.is_empty() {
                    return Err(VellumError::invalid_field("document_id", "is required"));
                }
                let edits = request.edits(&self.registry)?;
                let count = self
                    .services
                    .documents
                    .update_document_lines(ctx, &request.document_id, &edits)
                    .await?;
                let body = serde_json::to_value(UpdateLinesResponse { count })
                    .map_err(|e| VellumError::internal(format!("cannot encode reply: {e}")))?;
                Ok(Reply::Unary(body))
            }
            Operation::ListBranchOffices => {
                let request: BranchOfficesRequest = parse(body)?;
                let stream = self
                    .services
                    .identity
                    .list_branch_offices(ctx, &request.organization_domain)
                    .await?;
                Ok(Reply::Stream(stream))
            }
            Operation::ListAssociates => {
                let request: AssociatesRequest = parse(body)?;
                let caller = if request.caller.is_empty() {
                    ctx.caller().clone()
                } else {
                    CallerId::new(request.caller)
                };
                let stream = self.services.identity.list_associates(ctx, &caller).await?;
                Ok(Reply::Stream(stream))
            }
        }
    }

    fn entity(&self, entity: Entity) -> VellumResult<&EntityService> {
        match entity {
            Entity::Documents => Ok(&self.services.documents),
            Entity::DocumentInfo => Ok(&self.services.document_info),
            Entity::Transactions => Ok(&self.services.transactions),
            Entity::Users | Entity::BranchOffices | Entity::Organizations => Err(
                VellumError::internal(format!("{entity:?} has no generic entity service")),
            ),
        }
    }
}

fn unary(message: &WireMessage) -> Reply {
    Reply::Unary(json::to_json(message))
}

fn parse<T: DeserializeOwned + Default>(body: &[u8]) -> VellumResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| VellumError::invalid_request(format!("malformed body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_default() {
        let request: ListRequest = parse(b"  \n").unwrap();
        assert_eq!(request, ListRequest::default());
    }

    #[test]
    fn test_malformed_body_is_invalid_request() {
        let err = parse::<GetOneRequest>(b"{\"id\":").unwrap_err();
        assert_eq!(err.category(), vellum_core::ErrorCategory::InvalidRequest);

        let err = parse::<GetOneRequest>(br#"{"uuid":"doc-1"}"#).unwrap_err();
        assert_eq!(err.category(), vellum_core::ErrorCategory::InvalidRequest);
    }
}
