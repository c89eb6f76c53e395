use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use super::counts::CountsReporter;
use super::domain::{
    Actor, ActorRole, ClaimEvidence, ClaimId, ClaimStatus, RestaurantId, SubmissionId,
    SubmissionPatch, SubmissionPayload, SubmissionStatus, UserId,
};
use super::error::{AuthorizationError, DirectoryError};
use super::moderation::ModerationService;
use super::query::{DirectoryQueryEngine, SearchFilters};
use super::repository::{DirectoryReader, ListingStore};
use super::submissions::SubmissionService;
use crate::config::DirectoryConfig;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

const DEFAULT_ADMIN_LIST_LIMIT: usize = 50;

/// Every directory service wired to one shared store.
pub struct DirectoryServices<S> {
    pub submissions: SubmissionService<S>,
    pub moderation: ModerationService<S>,
    pub query: DirectoryQueryEngine<S>,
    pub counts: CountsReporter<S>,
}

impl<S> DirectoryServices<S>
where
    S: ListingStore + DirectoryReader + 'static,
{
    pub fn new(store: Arc<S>, config: &DirectoryConfig) -> Self {
        Self {
            submissions: SubmissionService::new(store.clone()),
            moderation: ModerationService::new(store.clone()),
            query: DirectoryQueryEngine::new(store.clone(), config),
            counts: CountsReporter::new(store, config.launch_cities.clone()),
        }
    }
}

type Services<S> = State<Arc<DirectoryServices<S>>>;

/// Router builder exposing the submission, moderation, claim and directory endpoints.
pub fn directory_router<S>(services: Arc<DirectoryServices<S>>) -> Router
where
    S: ListingStore + DirectoryReader + 'static,
{
    Router::new()
        .route(
            "/submissions",
            post(create_submission::<S>).get(list_my_submissions::<S>),
        )
        .route(
            "/submissions/:id",
            get(get_submission::<S>)
                .patch(update_submission::<S>)
                .delete(delete_submission::<S>),
        )
        .route("/submissions/:id/request-delete", post(request_deletion::<S>))
        .route("/admin/submissions", get(admin_submissions::<S>))
        .route("/admin/submissions/:id/approve", post(approve_submission::<S>))
        .route("/admin/submissions/:id/reject", post(reject_submission::<S>))
        .route("/admin/submissions/:id/remove", post(remove_submission::<S>))
        .route("/admin/claims", get(admin_claims::<S>))
        .route("/admin/claims/:id/approve", post(approve_claim::<S>))
        .route("/admin/claims/:id/deny", post(deny_claim::<S>))
        .route("/admin/claims/:id/request-info", post(request_claim_info::<S>))
        .route("/admin/reconciliation", get(reconciliation::<S>))
        .route("/claims/:id/resubmit", post(resubmit_claim::<S>))
        .route("/restaurants", get(search_restaurants::<S>))
        .route("/restaurants/:restaurant", get(restaurant_by_slug::<S>))
        .route("/restaurants/:restaurant/claims", post(file_claim::<S>))
        .route("/soup-types/counts", get(soup_type_counts::<S>))
        .route("/cities/counts", get(city_counts::<S>))
        .with_state(services)
}

#[derive(Debug, Default, Deserialize)]
struct ReasonBody {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotesBody {
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvidenceBody {
    #[serde(default)]
    evidence: ClaimEvidence,
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    status: Option<String>,
    limit: Option<usize>,
}

/// Raw `/restaurants` query string; numeric fields are parsed leniently.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantQuery {
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<String>,
    pub soup_type: Option<String>,
    pub rating: Option<String>,
    pub price_range: Option<String>,
    pub featured: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl RestaurantQuery {
    /// Converts 1-based `page` into an offset using the engine's clamped page size.
    pub fn into_filters(self, page_size: impl Fn(Option<usize>) -> usize) -> SearchFilters {
        let limit = page_size(self.limit.as_deref().and_then(parse_number));
        let page = self
            .page
            .as_deref()
            .and_then(parse_number)
            .unwrap_or(1)
            .max(1);

        SearchFilters {
            city: self.city,
            state: self.state,
            location: self.location,
            soup_types: split_list(self.soup_type.as_deref()),
            min_rating: self
                .rating
                .as_deref()
                .and_then(|raw| raw.trim().parse::<f32>().ok()),
            price_range: split_list(self.price_range.as_deref()),
            featured: self.featured.as_deref().and_then(parse_flag),
            limit: Some(limit),
            offset: (page - 1).saturating_mul(limit),
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        }
    }
}

async fn create_submission<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Json(payload): Json<SubmissionPayload>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| services.submissions.create(payload, &actor));
    match result {
        Ok(submission) => (
            StatusCode::CREATED,
            Json(json!({ "submissionId": submission.id, "submission": submission })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

async fn list_my_submissions<S>(State(services): Services<S>, headers: HeaderMap) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    match actor_from(&headers).and_then(|actor| services.submissions.list_mine(&actor)) {
        Ok(submissions) => Json(json!({ "submissions": submissions })).into_response(),
        Err(error) => error_response(error),
    }
}

async fn get_submission<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(SubmissionId)?;
        services.submissions.get(&id, &actor)
    });
    match result {
        Ok(submission) => Json(submission).into_response(),
        Err(error) => error_response(error),
    }
}

async fn update_submission<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<SubmissionPatch>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(SubmissionId)?;
        services.submissions.update(&id, patch, &actor)
    });
    match result {
        Ok(submission) => Json(submission).into_response(),
        Err(error) => error_response(error),
    }
}

async fn delete_submission<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(SubmissionId)?;
        services.submissions.delete(&id, &actor)
    });
    match result {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(error) => error_response(error),
    }
}

async fn request_deletion<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let reason = body.and_then(|Json(body)| body.reason);
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(SubmissionId)?;
        services.submissions.request_deletion(&id, &actor, reason)
    });
    match result {
        Ok(submission) => Json(submission).into_response(),
        Err(error) => error_response(error),
    }
}

async fn admin_submissions<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let status = match params.status.as_deref() {
        None => SubmissionStatus::Pending,
        Some(raw) => match SubmissionStatus::parse(raw) {
            Some(status) => status,
            None => return bad_request(format!("unknown submission status '{raw}'")),
        },
    };
    let limit = params.limit.unwrap_or(DEFAULT_ADMIN_LIST_LIMIT);
    let result = actor_from(&headers)
        .and_then(|actor| services.moderation.submissions(&actor, status, limit));
    match result {
        Ok(submissions) => Json(json!({ "submissions": submissions })).into_response(),
        Err(error) => error_response(error),
    }
}

async fn approve_submission<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(SubmissionId)?;
        services.moderation.approve(&id, &actor)
    });
    match result {
        Ok(outcome) => Json(outcome).into_response(),
        Err(error) => error_response(error),
    }
}

async fn reject_submission<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let reason = body.and_then(|Json(body)| body.reason);
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(SubmissionId)?;
        services.moderation.reject(&id, &actor, reason)
    });
    match result {
        Ok(submission) => Json(submission).into_response(),
        Err(error) => error_response(error),
    }
}

async fn remove_submission<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(SubmissionId)?;
        services.moderation.remove(&id, &actor)
    });
    match result {
        Ok(outcome) => Json(outcome).into_response(),
        Err(error) => error_response(error),
    }
}

async fn admin_claims<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let status = match params.status.as_deref() {
        None => ClaimStatus::Pending,
        Some(raw) => match ClaimStatus::parse(raw) {
            Some(status) => status,
            None => return bad_request(format!("unknown claim status '{raw}'")),
        },
    };
    let limit = params.limit.unwrap_or(DEFAULT_ADMIN_LIST_LIMIT);
    match actor_from(&headers).and_then(|actor| services.moderation.claims(&actor, status, limit))
    {
        Ok(claims) => Json(json!({ "claims": claims })).into_response(),
        Err(error) => error_response(error),
    }
}

async fn approve_claim<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(ClaimId)?;
        services.moderation.approve_claim(&id, &actor)
    });
    match result {
        Ok(approval) => Json(approval).into_response(),
        Err(error) => error_response(error),
    }
}

async fn deny_claim<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let reason = body.and_then(|Json(body)| body.reason);
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(ClaimId)?;
        services.moderation.deny_claim(&id, &actor, reason)
    });
    match result {
        Ok(claim) => Json(claim).into_response(),
        Err(error) => error_response(error),
    }
}

async fn request_claim_info<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<NotesBody>>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let notes = body.and_then(|Json(body)| body.notes);
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(ClaimId)?;
        services.moderation.request_claim_info(&id, &actor, notes)
    });
    match result {
        Ok(claim) => Json(claim).into_response(),
        Err(error) => error_response(error),
    }
}

async fn reconciliation<S>(State(services): Services<S>, headers: HeaderMap) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    match actor_from(&headers).and_then(|actor| services.moderation.reconcile(&actor)) {
        Ok(report) => Json(report).into_response(),
        Err(error) => error_response(error),
    }
}

async fn resubmit_claim<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<EvidenceBody>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&id).map(ClaimId)?;
        services.moderation.resubmit_claim(&id, &actor, body.evidence)
    });
    match result {
        Ok(claim) => Json(claim).into_response(),
        Err(error) => error_response(error),
    }
}

async fn file_claim<S>(
    State(services): Services<S>,
    headers: HeaderMap,
    Path(restaurant): Path<String>,
    Json(body): Json<EvidenceBody>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let result = actor_from(&headers).and_then(|actor| {
        let id = parse_id(&restaurant).map(RestaurantId)?;
        services.moderation.file_claim(&id, &actor, body.evidence)
    });
    match result {
        Ok(claim) => (StatusCode::CREATED, Json(claim)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn search_restaurants<S>(
    State(services): Services<S>,
    Query(query): Query<RestaurantQuery>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    let filters = query.into_filters(|requested| services.query.page_size(requested));
    match services.query.search(&filters) {
        Ok(result) => Json(json!({
            "restaurants": result.rows,
            "totalCount": result.total_count,
        }))
        .into_response(),
        Err(error) => error_response(error),
    }
}

async fn restaurant_by_slug<S>(
    State(services): Services<S>,
    Path(restaurant): Path<String>,
) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    match services.query.listing_by_slug(&restaurant) {
        Ok(Some(listing)) => Json(listing).into_response(),
        Ok(None) => error_response(DirectoryError::NotFound),
        Err(error) => error_response(error),
    }
}

async fn soup_type_counts<S>(State(services): Services<S>) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    match services.counts.soup_type_counts() {
        Ok(counts) => Json(counts).into_response(),
        Err(error) => error_response(error),
    }
}

async fn city_counts<S>(State(services): Services<S>) -> Response
where
    S: ListingStore + DirectoryReader + 'static,
{
    match services.counts.city_counts() {
        Ok(cities) => Json(json!({ "cities": cities })).into_response(),
        Err(error) => error_response(error),
    }
}

/// Identity forwarded by the upstream identity provider.
pub fn actor_from(headers: &HeaderMap) -> Result<Actor, DirectoryError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthorizationError::Unauthenticated)?;
    let role = match headers
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(role) if role.trim().eq_ignore_ascii_case("admin") => ActorRole::Admin,
        _ => ActorRole::Member,
    };

    Ok(Actor {
        user_id: UserId(user_id.to_string()),
        role,
    })
}

/// Maps a directory failure onto its HTTP status and a client-safe body.
pub fn error_response(error: DirectoryError) -> Response {
    let (status, payload) = match &error {
        DirectoryError::Validation(validation) => (
            StatusCode::BAD_REQUEST,
            json!({ "error": error.to_string(), "field": validation.field }),
        ),
        DirectoryError::InvalidState(_) => {
            (StatusCode::BAD_REQUEST, json!({ "error": error.to_string() }))
        }
        DirectoryError::Authorization(AuthorizationError::Unauthenticated) => {
            (StatusCode::UNAUTHORIZED, json!({ "error": error.to_string() }))
        }
        DirectoryError::Authorization(AuthorizationError::Forbidden) => {
            (StatusCode::FORBIDDEN, json!({ "error": error.to_string() }))
        }
        DirectoryError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "not found" })),
        DirectoryError::Infrastructure(source) => {
            error!(error = %source, "directory request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal server error" }),
            )
        }
    };

    (status, Json(payload)).into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Malformed ids are indistinguishable from unknown ones.
fn parse_id(raw: &str) -> Result<Uuid, DirectoryError> {
    Uuid::parse_str(raw.trim()).map_err(|_| DirectoryError::NotFound)
}

fn parse_number(raw: &str) -> Option<usize> {
    raw.trim().parse().ok()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
