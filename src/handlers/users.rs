use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, PaginatedResponse};
use crate::access::{role_permissions, Capability};
use crate::auth::{AuthRouterExt, AuthUser};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::users::{RegisterUser, RoleAssignment};

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserListQuery {
    /// pending, approved or rejected
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created, pending approval"),
        (status = 409, description = "Phone already registered")
    ),
    tag = "users"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.users.register(input).await?;
    Ok(created_response(created))
}

/// The caller's own identity, role and permissions.
pub async fn me(user: AuthUser) -> impl IntoResponse {
    let permissions = role_permissions(user.role);
    Json(serde_json::json!({
        "user_id": user.user_id,
        "name": user.name,
        "role": user.role,
        "scope": user.scope,
        "permissions": permissions,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListQuery),
    responses((status = 200, description = "User listing")),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(state.config.api_default_page_size as u64)
        .clamp(1, state.config.api_max_page_size as u64);

    let result = state
        .services
        .users
        .list_users(query.status.as_deref(), page, per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        result.users,
        result.page,
        result.per_page,
        result.total,
    )))
}

pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.users.get_user(id).await?;
    Ok(Json(account))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/approve",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleAssignment,
    responses(
        (status = 200, description = "User approved with role and scope"),
        (status = 403, description = "Role not assignable by the caller"),
        (status = 422, description = "Scope inconsistent with the location tree")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn approve_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(assignment): Json<RoleAssignment>,
) -> Result<impl IntoResponse, ServiceError> {
    let approved = state
        .services
        .users
        .approve_user(&user, id, assignment)
        .await?;
    Ok(Json(approved))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/reject",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User rejected")),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn reject_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let rejected = state.services.users.reject_user(&user, id).await?;
    Ok(Json(rejected))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/scope",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleAssignment,
    responses(
        (status = 200, description = "Role and scope reassigned"),
        (status = 422, description = "Scope inconsistent with the location tree")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn reassign_scope(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(assignment): Json<RoleAssignment>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .services
        .users
        .reassign_scope(&user, id, assignment)
        .await?;
    Ok(Json(updated))
}

pub fn user_routes() -> Router<AppState> {
    let public = Router::new().route("/register", post(register));
    let authed = Router::new().route("/me", get(me)).with_auth();
    let admin = Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user))
        .route("/:id/approve", post(approve_user))
        .route("/:id/reject", post(reject_user))
        .route("/:id/scope", put(reassign_scope))
        .with_capability(Capability::AssignRoles);

    public.merge(authed).merge(admin)
}
