use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::created_response;
use crate::access::Capability;
use crate::auth::{AuthRouterExt, AuthUser};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::sms::NewCampaign;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CampaignListQuery {
    pub limit: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/v1/sms/campaigns",
    request_body = NewCampaign,
    responses(
        (status = 201, description = "Campaign created and dispatched (or queued without a gateway)")
    ),
    security(("bearer_auth" = [])),
    tag = "sms"
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<NewCampaign>,
) -> Result<impl IntoResponse, ServiceError> {
    let campaign = state.services.sms.create_campaign(&user, input).await?;
    Ok(created_response(campaign))
}

#[utoipa::path(
    get,
    path = "/api/v1/sms/campaigns",
    params(CampaignListQuery),
    responses((status = 200, description = "The caller's campaigns, newest first")),
    security(("bearer_auth" = [])),
    tag = "sms"
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CampaignListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let campaigns = state.services.sms.list_campaigns(&user, limit).await?;
    Ok(Json(campaigns))
}

#[utoipa::path(
    get,
    path = "/api/v1/sms/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "The campaign with delivery counts"),
        (status = 403, description = "Campaign created by another administrator"),
        (status = 404, description = "No such campaign")
    ),
    security(("bearer_auth" = [])),
    tag = "sms"
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let campaign = state.services.sms.get_campaign(&user, id).await?;
    Ok(Json(campaign))
}

pub fn sms_routes() -> Router<AppState> {
    let reads = Router::new()
        .route("/campaigns", get(list_campaigns))
        .route("/campaigns/:id", get(get_campaign))
        .with_capability(Capability::Read);
    let creates = Router::new()
        .route("/campaigns", post(create_campaign))
        .with_capability(Capability::Create);

    reads.merge(creates)
}
