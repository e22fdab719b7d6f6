use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, no_content_response, PaginatedResponse};
use crate::access::Capability;
use crate::auth::{AuthRouterExt, AuthUser};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::voters::{NewVoter, VoterChanges, VoterFilter};

#[derive(Debug, Deserialize, IntoParams)]
pub struct VoterListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub gender: Option<String>,
    pub vote_intent: Option<String>,
    pub occupation: Option<String>,
    pub division_id: Option<String>,
    pub district_id: Option<String>,
    pub upazila_id: Option<String>,
    pub union_id: Option<String>,
    pub village_id: Option<String>,
    pub search: Option<String>,
}

impl VoterListQuery {
    fn filter(&self) -> VoterFilter {
        VoterFilter {
            gender: self.gender.clone(),
            vote_intent: self.vote_intent.clone(),
            occupation: self.occupation.clone(),
            division_id: self.division_id.clone(),
            district_id: self.district_id.clone(),
            upazila_id: self.upazila_id.clone(),
            union_id: self.union_id.clone(),
            village_id: self.village_id.clone(),
            search: self.search.clone(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/voters",
    request_body = NewVoter,
    responses(
        (status = 201, description = "Voter created"),
        (status = 403, description = "Location outside the caller's scope"),
        (status = 400, description = "Invalid location tuple")
    ),
    security(("bearer_auth" = [])),
    tag = "voters"
)]
pub async fn create_voter(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<NewVoter>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.voters.create_voter(&user, input).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/voters",
    params(VoterListQuery),
    responses(
        (status = 200, description = "Scoped voter listing")
    ),
    security(("bearer_auth" = [])),
    tag = "voters"
)]
pub async fn list_voters(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<VoterListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(state.config.api_default_page_size as u64)
        .clamp(1, state.config.api_max_page_size as u64);

    let result = state
        .services
        .voters
        .list_voters(&user, &query.filter(), page, per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        result.voters,
        result.page,
        result.per_page,
        result.total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/voters/{id}",
    params(("id" = Uuid, Path, description = "Voter id")),
    responses(
        (status = 200, description = "The voter record"),
        (status = 403, description = "Record outside the caller's scope"),
        (status = 404, description = "No such voter")
    ),
    security(("bearer_auth" = [])),
    tag = "voters"
)]
pub async fn get_voter(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let voter = state.services.voters.get_voter(&user, id).await?;
    Ok(Json(voter))
}

#[utoipa::path(
    put,
    path = "/api/v1/voters/{id}",
    params(("id" = Uuid, Path, description = "Voter id")),
    request_body = VoterChanges,
    responses(
        (status = 200, description = "Updated voter"),
        (status = 400, description = "Invalid location tuple"),
        (status = 409, description = "Stale version")
    ),
    security(("bearer_auth" = [])),
    tag = "voters"
)]
pub async fn update_voter(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<VoterChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .services
        .voters
        .update_voter(&user, id, changes)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/voters/{id}",
    params(("id" = Uuid, Path, description = "Voter id")),
    responses(
        (status = 204, description = "Voter deleted"),
        (status = 403, description = "Role may not delete")
    ),
    security(("bearer_auth" = [])),
    tag = "voters"
)]
pub async fn delete_voter(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.voters.delete_voter(&user, id).await?;
    Ok(no_content_response())
}

pub fn voter_routes() -> Router<AppState> {
    let reads = Router::new()
        .route("/", get(list_voters))
        .route("/:id", get(get_voter))
        .with_capability(Capability::Read);
    let creates = Router::new()
        .route("/", post(create_voter))
        .with_capability(Capability::Create);
    let updates = Router::new()
        .route("/:id", put(update_voter))
        .with_capability(Capability::Update);
    let deletes = Router::new()
        .route("/:id", delete(delete_voter))
        .with_capability(Capability::Delete);

    reads.merge(creates).merge(updates).merge(deletes)
}
