use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::access::Capability;
use crate::auth::{AuthRouterExt, AuthUser};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::locations::LocationError;

#[utoipa::path(
    get,
    path = "/api/v1/locations/divisions",
    responses((status = 200, description = "All divisions")),
    security(("bearer_auth" = [])),
    tag = "locations"
)]
pub async fn list_divisions(State(state): State<AppState>, _user: AuthUser) -> impl IntoResponse {
    let divisions: Vec<_> = state.locations.divisions().into_iter().cloned().collect();
    Json(divisions)
}

#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    params(("id" = String, Path, description = "Location id")),
    responses(
        (status = 200, description = "The node with its ancestor chain"),
        (status = 404, description = "Unknown location")
    ),
    security(("bearer_auth" = [])),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let node = state
        .locations
        .node(&id)
        .cloned()
        .ok_or_else(|| ServiceError::NotFound(format!("Location '{}' not found", id)))?;
    let ancestors: Vec<_> = state
        .locations
        .ancestors(&id)
        .map_err(|e| match e {
            LocationError::UnknownNode { id } => {
                ServiceError::NotFound(format!("Location '{}' not found", id))
            }
            other => ServiceError::from(other),
        })?
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(serde_json::json!({
        "node": node,
        "ancestors": ancestors,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}/children",
    params(("id" = String, Path, description = "Parent location id")),
    responses(
        (status = 200, description = "Direct children of the node"),
        (status = 404, description = "Unknown location")
    ),
    security(("bearer_auth" = [])),
    tag = "locations"
)]
pub async fn list_children(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    if state.locations.node(&id).is_none() {
        return Err(ServiceError::NotFound(format!(
            "Location '{}' not found",
            id
        )));
    }
    let children: Vec<_> = state.locations.children(&id).into_iter().cloned().collect();
    Ok(Json(children))
}

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/divisions", get(list_divisions))
        .route("/:id", get(get_location))
        .route("/:id/children", get(list_children))
        .with_capability(Capability::Read)
}
