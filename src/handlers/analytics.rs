use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::access::Capability;
use crate::auth::{AuthRouterExt, AuthUser};
use crate::errors::ServiceError;
use crate::handlers::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/analytics/summary",
    responses(
        (status = 200, description = "Scoped voter statistics", body = crate::services::analytics::VoterSummary)
    ),
    security(("bearer_auth" = [])),
    tag = "analytics"
)]
pub async fn voter_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.analytics.voter_summary(&user).await?;
    Ok(Json(summary))
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(voter_summary))
        .with_capability(Capability::Read)
}
