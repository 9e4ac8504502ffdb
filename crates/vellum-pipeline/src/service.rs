//! The generic entity service.

use crate::lines::{self, LineEdit};
use crate::pool::{CallPermit, WorkerPool};
use crate::profile::EntityProfile;
use crate::request::{GetManyRequest, ListRequest, MetricsReport, MetricsRequest};
use crate::state::{CallState, CallTracker};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, instrument};
use vellum_core::{RequestContext, ScopeToken, Value, VellumError, VellumResult, WireMessage};
use vellum_schema::Marshaler;
use vellum_scope::ScopeResolver;
use vellum_store::{
    FilterBuilder, FilterParams, FindOptions, MatchPresence, QueryFilter, RecordStream, Store,
};

/// A lazy, finite stream of wire messages. Dropping it stops the call.
pub type WireStream = BoxStream<'static, VellumResult<WireMessage>>;

/// Serves `getOne`, `getMany`, `listAll` and `getMetrics` for one entity.
///
/// Every call resolves the caller's scope afresh, builds one filter and
/// issues its store queries with it. Nothing is cached between calls.
#[derive(Clone)]
pub struct EntityService {
    profile: Arc<EntityProfile>,
    filters: FilterBuilder,
    store: Arc<dyn Store>,
    resolver: ScopeResolver,
    marshaler: Marshaler,
    pool: WorkerPool,
}

impl std::fmt::Debug for EntityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityService")
            .field("profile", &self.profile)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl EntityService {
    /// Creates a service for `profile`.
    pub fn new(
        profile: EntityProfile,
        store: Arc<dyn Store>,
        resolver: ScopeResolver,
        marshaler: Marshaler,
        pool: WorkerPool,
    ) -> Self {
        let filters = FilterBuilder::new(profile.filter_fields.clone());
        Self {
            profile: Arc::new(profile),
            filters,
            store,
            resolver,
            marshaler,
            pool,
        }
    }

    /// Returns the profile.
    pub fn profile(&self) -> &EntityProfile {
        &self.profile
    }

    /// Returns the admission pool.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub(crate) fn marshaler(&self) -> &Marshaler {
        &self.marshaler
    }

    /// Fetches one record by id.
    ///
    /// A missing or invisible record yields an empty message, never an
    /// error. Unpopulated records are returned as they are.
    #[instrument(skip(self, ctx), fields(service = %self.profile.service, caller = %ctx.caller()))]
    pub async fn get_one(&self, ctx: &RequestContext, id: &str) -> VellumResult<WireMessage> {
        let _permit = self.pool.acquire()?;
        let mut call = CallTracker::start(ctx);
        let result = self.fetch_one(&mut call, ctx, id).await;
        call.settle(&result);
        result
    }

    async fn fetch_one(
        &self,
        call: &mut CallTracker,
        ctx: &RequestContext,
        id: &str,
    ) -> VellumResult<WireMessage> {
        let filter = self
            .scoped_filter(call, ctx, FilterParams::new().with_id(id))
            .await?;
        let record = self.store.find_one(&self.profile.collection, &filter).await?;
        call.advance(CallState::Queried)?;

        call.advance(CallState::Marshaling)?;
        let message = match record {
            Some(record) => self.marshaler.encode(&record, &self.profile.message)?,
            None => {
                debug!(id, "no visible record");
                WireMessage::new(self.profile.message.as_str())
            }
        };
        call.advance(CallState::Emitting)?;
        Ok(message)
    }

    /// Streams the visible records among `request.ids`, in store order.
    #[instrument(skip(self, ctx, request), fields(service = %self.profile.service, caller = %ctx.caller(), ids = request.ids.len()))]
    pub async fn get_many(
        &self,
        ctx: &RequestContext,
        request: &GetManyRequest,
    ) -> VellumResult<WireStream> {
        let fields = if request.fields.is_empty() {
            self.profile.detail_fields.clone()
        } else {
            request.fields.clone()
        };
        self.stream(
            ctx,
            FilterParams::new().with_ids(request.ids.iter().cloned()),
            FindOptions::new(),
            fields,
        )
        .await
    }

    /// Streams one page of visible records created within the window.
    #[instrument(skip(self, ctx, request), fields(service = %self.profile.service, caller = %ctx.caller()))]
    pub async fn list_all(
        &self,
        ctx: &RequestContext,
        request: &ListRequest,
    ) -> VellumResult<WireStream> {
        let params = FilterParams::new()
            .created_within(request.date_range()?)
            .with_matches(request.match_presence());
        let mut options =
            FindOptions::new().page(request.skip, request.limit_or(self.profile.default_limit));
        if let Some(sort) = &self.profile.sort {
            options = options.sorted_by(sort.clone());
        }
        let fields = if request.fields.is_empty() {
            self.profile.list_fields.clone()
        } else {
            request.fields.clone()
        };
        self.stream(ctx, params, options, fields).await
    }

    /// Counts visible records in the window: all of them, those with a
    /// match, and those whose matches grade well on every quality field.
    #[instrument(skip(self, ctx, request), fields(service = %self.profile.service, caller = %ctx.caller()))]
    pub async fn get_metrics(
        &self,
        ctx: &RequestContext,
        request: &MetricsRequest,
    ) -> VellumResult<MetricsReport> {
        let _permit = self.pool.acquire()?;
        let mut call = CallTracker::start(ctx);
        let result = self.count_metrics(&mut call, ctx, request).await;
        call.settle(&result);
        result
    }

    async fn count_metrics(
        &self,
        call: &mut CallTracker,
        ctx: &RequestContext,
        request: &MetricsRequest,
    ) -> VellumResult<MetricsReport> {
        let window = FilterParams::new().created_within(request.date_range()?);
        let scope = self.resolve(call, ctx).await?;
        let total_filter = self.build(&scope, &window)?;
        let matched_filter =
            self.build(&scope, &window.clone().with_matches(MatchPresence::Matched))?;
        let graded_filter = match &self.profile.quality {
            Some(rule) => {
                let params = rule
                    .predicates()
                    .into_iter()
                    .fold(window, FilterParams::and);
                Some(self.build(&scope, &params)?)
            }
            None => None,
        };
        call.advance(CallState::FilterBuilt)?;

        let collection = &self.profile.collection;
        let total = self.store.count(collection, &total_filter).await?;
        let matched = self.store.count(collection, &matched_filter).await?;
        let matched_all_fields = match &graded_filter {
            Some(filter) => self.store.count(collection, filter).await?,
            None => matched,
        };
        call.advance(CallState::Queried)?;

        Ok(MetricsReport {
            total,
            matched,
            matched_all_fields,
        })
    }

    /// Rewrites the text of the given lines of one visible document.
    ///
    /// Returns the number of lines rewritten: 0 when the document is not
    /// visible to the caller, and edits naming unknown lines do not count.
    /// All rewrites land in one atomic single-record update.
    #[instrument(skip(self, ctx, edits), fields(service = %self.profile.service, caller = %ctx.caller(), edits = edits.len()))]
    pub async fn update_document_lines(
        &self,
        ctx: &RequestContext,
        document_id: &str,
        edits: &[WireMessage],
    ) -> VellumResult<u64> {
        let _permit = self.pool.acquire()?;
        let mut call = CallTracker::start(ctx);
        let result = self.rewrite_lines(&mut call, ctx, document_id, edits).await;
        call.settle(&result);
        result
    }

    async fn rewrite_lines(
        &self,
        call: &mut CallTracker,
        ctx: &RequestContext,
        document_id: &str,
        edits: &[WireMessage],
    ) -> VellumResult<u64> {
        let edits = edits
            .iter()
            .map(|edit| self.line_edit(edit))
            .collect::<VellumResult<Vec<_>>>()?;

        let filter = self
            .scoped_filter(call, ctx, FilterParams::new().with_id(document_id))
            .await?;
        let Some(document) = self.store.find_one(&self.profile.collection, &filter).await? else {
            call.advance(CallState::Queried)?;
            debug!(document_id, "document not visible, nothing updated");
            return Ok(0);
        };

        let (update, count) = lines::plan_update(&document, &edits);
        if update.is_empty() {
            call.advance(CallState::Queried)?;
            return Ok(0);
        }
        let matched = self
            .store
            .update_one(&self.profile.collection, &filter, &update)
            .await?;
        call.advance(CallState::Queried)?;
        Ok(if matched == 0 { 0 } else { count })
    }

    fn line_edit(&self, message: &WireMessage) -> VellumResult<LineEdit> {
        let record = self.marshaler.decode(message)?;
        let field = |name: &str| {
            record
                .get(name)
                .and_then(Value::as_str)
                .map(ToString::to_string)
        };
        let uuid = field("uuid")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| VellumError::invalid_field("lines", "line edit without uuid"))?;
        Ok(LineEdit {
            uuid,
            text: field("text").unwrap_or_default(),
        })
    }

    /// Resolves the scope and builds the filter for `params`.
    pub(crate) async fn scoped_filter(
        &self,
        call: &mut CallTracker,
        ctx: &RequestContext,
        params: FilterParams,
    ) -> VellumResult<QueryFilter> {
        let scope = self.resolve(call, ctx).await?;
        let filter = self.build(&scope, &params)?;
        call.advance(CallState::FilterBuilt)?;
        Ok(filter)
    }

    async fn resolve(&self, call: &mut CallTracker, ctx: &RequestContext) -> VellumResult<ScopeToken> {
        let scope = if self.profile.scoped {
            self.resolver.resolve(ctx.caller()).await?
        } else {
            ScopeToken::Unrestricted
        };
        vellum_telemetry::record_scope_resolution(scope.kind());
        call.advance(CallState::ScopeResolved)?;
        Ok(scope)
    }

    fn build(&self, scope: &ScopeToken, params: &FilterParams) -> VellumResult<QueryFilter> {
        let params = self
            .profile
            .constraints
            .iter()
            .cloned()
            .fold(params.clone(), FilterParams::and);
        Ok(self.filters.build(scope, &params)?)
    }

    /// Runs one `find_many` and streams the encoded results.
    pub(crate) async fn stream(
        &self,
        ctx: &RequestContext,
        params: FilterParams,
        options: FindOptions,
        fields: Vec<String>,
    ) -> VellumResult<WireStream> {
        let permit = self.pool.acquire()?;
        let mut call = CallTracker::start(ctx);
        let records = match self.open(&mut call, ctx, params, options).await {
            Ok(records) => records,
            Err(err) => {
                call.fail(&err);
                return Err(err);
            }
        };
        Ok(Emitter {
            records,
            call,
            _permit: permit,
            profile: Arc::clone(&self.profile),
            marshaler: self.marshaler.clone(),
            fields,
            halted: false,
        }
        .into_stream())
    }

    async fn open(
        &self,
        call: &mut CallTracker,
        ctx: &RequestContext,
        params: FilterParams,
        options: FindOptions,
    ) -> VellumResult<RecordStream> {
        let filter = self.scoped_filter(call, ctx, params).await?;
        let records = self
            .store
            .find_many(&self.profile.collection, &filter, options)
            .await?;
        call.advance(CallState::Queried)?;
        Ok(records)
    }
}

/// Pulls records one at a time, skipping unpopulated ones and aborting on
/// the first error.
struct Emitter {
    records: RecordStream,
    call: CallTracker,
    _permit: CallPermit,
    profile: Arc<EntityProfile>,
    marshaler: Marshaler,
    fields: Vec<String>,
    halted: bool,
}

impl Emitter {
    fn into_stream(self) -> WireStream {
        stream::unfold(self, |mut emitter| async move {
            let item = emitter.next_message().await?;
            Some((item, emitter))
        })
        .boxed()
    }

    async fn next_message(&mut self) -> Option<VellumResult<WireMessage>> {
        if self.halted {
            return None;
        }
        loop {
            let record = match self.records.next().await {
                None => {
                    self.call.finish();
                    return None;
                }
                Some(Err(err)) => return Some(self.abort(err.into())),
                Some(Ok(record)) => record,
            };
            if !self.profile.is_populated(&record) {
                continue;
            }
            if let Err(err) = self.call.advance(CallState::Marshaling) {
                return Some(self.abort(err));
            }
            let message = match self
                .marshaler
                .encode_projected(&record, &self.profile.message, self.fields.as_slice())
            {
                Ok(message) => message,
                Err(err) => return Some(self.abort(err.into())),
            };
            if let Err(err) = self.call.advance(CallState::Emitting) {
                return Some(self.abort(err));
            }
            return Some(Ok(message));
        }
    }

    fn abort(&mut self, err: VellumError) -> VellumResult<WireMessage> {
        self.halted = true;
        self.call.fail(&err);
        Err(err)
    }
}
