use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "voterbase-api",
        version = "0.3.0",
        description = r#"
# Voterbase Dashboard API

Role-based voter-management backend over the five-level administrative
hierarchy (division → district → upazila → union → village).

## Access model

Every dashboard user holds exactly one role, anchored to one node of the
location tree. All voter reads and writes are automatically restricted to
the subtree under that anchor; drill-down filters narrow the set further
but can never widen it. `super_admin` is unrestricted.

## Authentication

Log in with phone and password at `/auth/login` and pass the returned
token on every request:

```
Authorization: Bearer <your-jwt-token>
```

## Rate limiting

Requests are rate-limited per user (per IP before login). Check the
`X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`
response headers.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Login, token refresh and logout"),
        (name = "voters", description = "Scoped voter records"),
        (name = "users", description = "Dashboard-user registration and approval"),
        (name = "locations", description = "Administrative location tree"),
        (name = "sms", description = "SMS campaigns over the scoped voter set"),
        (name = "analytics", description = "Scoped voter statistics")
    ),
    paths(
        crate::auth::login_handler,
        crate::auth::refresh_token_handler,

        crate::handlers::voters::create_voter,
        crate::handlers::voters::list_voters,
        crate::handlers::voters::get_voter,
        crate::handlers::voters::update_voter,
        crate::handlers::voters::delete_voter,

        crate::handlers::users::register,
        crate::handlers::users::list_users,
        crate::handlers::users::approve_user,
        crate::handlers::users::reject_user,
        crate::handlers::users::reassign_scope,

        crate::handlers::locations::list_divisions,
        crate::handlers::locations::get_location,
        crate::handlers::locations::list_children,

        crate::handlers::sms::create_campaign,
        crate::handlers::sms::list_campaigns,
        crate::handlers::sms::get_campaign,

        crate::handlers::analytics::voter_summary,
    ),
    components(
        schemas(
            crate::access::Role,
            crate::access::PermissionSet,
            crate::access::AccessScope,
            crate::locations::LocationLevel,
            crate::locations::LocationNode,
            crate::locations::LocationPath,

            crate::auth::LoginCredentials,
            crate::auth::RefreshTokenRequest,
            crate::auth::TokenPair,

            crate::services::voters::NewVoter,
            crate::services::voters::VoterChanges,
            crate::services::voters::VoterFilter,
            crate::services::users::RegisterUser,
            crate::services::users::RoleAssignment,
            crate::services::sms::NewCampaign,
            crate::services::analytics::VoterSummary,
            crate::services::analytics::CountBucket,
            crate::services::analytics::LocationBucket,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("voterbase-api"));
        assert!(json.contains("/api/v1/voters"));
        assert!(json.contains("bearer_auth"));
    }
}
