//! The identity service: users, branch offices, organizations and the
//! associate lookup the scope resolver relies on.

use crate::pool::{CallPermit, WorkerPool};
use crate::request::ListRequest;
use crate::service::{EntityService, WireStream};
use crate::state::{CallState, CallTracker};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, instrument};
use vellum_core::{
    CallerId, Record, RequestContext, Value, VellumError, VellumResult, WireMessage,
};
use vellum_schema::catalog;
use vellum_scope::IdentityLookup;
use vellum_store::{FilterParams, Predicate, Store};

const BRANCH_OFFICE_FIELDS: [&str; 2] = ["uuid", "name"];

/// Directory reads. None of them are scoped by the caller; every read is
/// limited to visible entries.
#[derive(Clone)]
pub struct IdentityService {
    users: EntityService,
    branch_offices: EntityService,
    organizations: EntityService,
    store: Arc<dyn Store>,
    lookup: Arc<dyn IdentityLookup>,
    pool: WorkerPool,
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("users", &self.users.profile().collection)
            .field("branch_offices", &self.branch_offices.profile().collection)
            .field("organizations", &self.organizations.profile().collection)
            .finish_non_exhaustive()
    }
}

impl IdentityService {
    /// Assembles the service from its entity services.
    pub fn new(
        users: EntityService,
        branch_offices: EntityService,
        organizations: EntityService,
        store: Arc<dyn Store>,
        lookup: Arc<dyn IdentityLookup>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            users,
            branch_offices,
            organizations,
            store,
            lookup,
            pool,
        }
    }

    /// One visible user, or an empty message.
    pub async fn get_user(&self, ctx: &RequestContext, id: &str) -> VellumResult<WireMessage> {
        self.users.get_one(ctx, id).await
    }

    /// One visible branch office, or an empty message.
    pub async fn get_branch_office(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> VellumResult<WireMessage> {
        self.branch_offices.get_one(ctx, id).await
    }

    /// One visible organization, or an empty message.
    pub async fn get_organization(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> VellumResult<WireMessage> {
        self.organizations.get_one(ctx, id).await
    }

    /// Every visible organization.
    pub async fn list_organizations(
        &self,
        ctx: &RequestContext,
        request: &ListRequest,
    ) -> VellumResult<WireStream> {
        self.organizations.list_all(ctx, request).await
    }

    /// The branch offices nested in the visible organization owning
    /// `domain`, as uuid and name only. An unknown domain yields an empty
    /// stream.
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller()))]
    pub async fn list_branch_offices(
        &self,
        ctx: &RequestContext,
        domain: &str,
    ) -> VellumResult<WireStream> {
        let permit = self.pool.acquire()?;
        let mut call = CallTracker::start(ctx);
        let result = self.branch_offices_of(&mut call, ctx, domain).await;
        let messages = match result {
            Ok(messages) => messages,
            Err(err) => {
                call.fail(&err);
                return Err(err);
            }
        };
        Ok(emit(messages, call, permit))
    }

    async fn branch_offices_of(
        &self,
        call: &mut CallTracker,
        ctx: &RequestContext,
        domain: &str,
    ) -> VellumResult<Vec<WireMessage>> {
        let params = FilterParams::new().and(Predicate::eq("organization_domain", domain));
        let filter = self
            .organizations
            .scoped_filter(call, ctx, params)
            .await?;
        let collection = &self.organizations.profile().collection;
        let organization = self.store.find_one(collection, &filter).await?;
        call.advance(CallState::Queried)?;

        let Some(organization) = organization else {
            debug!(domain, "no visible organization for domain");
            return Ok(Vec::new());
        };
        let branches: Vec<&Record> = organization
            .get("branch_offices")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_document).collect())
            .unwrap_or_default();

        let marshaler = self.organizations.marshaler();
        let mut messages = Vec::with_capacity(branches.len());
        for branch in branches {
            messages.push(marshaler.encode_projected(
                branch,
                catalog::BRANCH_OFFICE,
                BRANCH_OFFICE_FIELDS.as_slice(),
            )?);
        }
        Ok(messages)
    }

    /// The associates of `caller`, as the scope resolver sees them.
    #[instrument(skip(self, ctx), fields(caller = %caller))]
    pub async fn list_associates(
        &self,
        ctx: &RequestContext,
        caller: &CallerId,
    ) -> VellumResult<WireStream> {
        let permit = self.pool.acquire()?;
        let mut call = CallTracker::start(ctx);
        let result = async {
            call.advance(CallState::ScopeResolved)?;
            call.advance(CallState::FilterBuilt)?;
            let associates = self.lookup.list_associates(caller).await?;
            call.advance(CallState::Queried)?;
            Ok::<_, VellumError>(associates)
        }
        .await;
        match result {
            Ok(associates) => Ok(emit(associates, call, permit)),
            Err(err) => {
                call.fail(&err);
                Err(err)
            }
        }
    }
}

/// Streams already materialized messages through the call state machine.
fn emit(
    messages: Vec<WireMessage>,
    call: CallTracker,
    permit: CallPermit,
) -> WireStream {
    let state = (messages.into_iter(), call, permit);
    stream::unfold(state, |(mut messages, mut call, permit)| async move {
        let Some(message) = messages.next() else {
            call.finish();
            return None;
        };
        let advanced = call
            .advance(CallState::Marshaling)
            .and_then(|()| call.advance(CallState::Emitting));
        match advanced {
            Ok(()) => Some((Ok(message), (messages, call, permit))),
            Err(err) => {
                call.fail(&err);
                Some((Err(err), (Vec::new().into_iter(), call, permit)))
            }
        }
    })
    .boxed()
}
