use crate::core::error::AppError;
use crate::features::auth::AuthService;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::now_v7().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

/// CORS for the browser client; download filenames are exposed to scripts
pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_DISPOSITION,
            header::CONTENT_LENGTH,
            HeaderName::from_static("x-request-id"),
        ]);

    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// HTTP basic auth in front of the Swagger UI; `credentials` is `user:password`
pub async fn swagger_basic_auth(
    State(credentials): State<Arc<String>>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Basic "))
        .and_then(|encoded| BASE64_STANDARD.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .is_some_and(|given| given == *credentials);

    if authorized {
        return next.run(req).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Swagger UI\"")],
        Body::from("Unauthorized"),
    )
        .into_response()
}

/// Bearer token authentication for every protected route
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    // Reloads the account so deactivation and role changes apply immediately
    let user = auth.authenticate(token).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::AuthenticatedUser;
    use crate::features::auth::JwtService;
    use crate::features::users::services::CreateUser;
    use crate::features::users::UserService;
    use crate::shared::test_helpers::{test_auth_config, InMemoryUserRepository, TEST_BCRYPT_COST};
    use axum::{routing::get, Router};
    use axum_test::TestServer;

    async fn whoami(user: AuthenticatedUser) -> String {
        user.username
    }

    async fn protected_server() -> (TestServer, String, Arc<UserService>, Uuid) {
        let config = test_auth_config();
        let users = Arc::new(UserService::new(
            Arc::new(InMemoryUserRepository::default()),
            TEST_BCRYPT_COST,
        ));
        let account = users
            .create_user(CreateUser {
                username: "vessel_a".to_string(),
                password: "initial-pass".to_string(),
                is_admin: false,
                vessel_name: String::new(),
            })
            .await
            .unwrap();
        let jwt = JwtService::new(&config);
        let token = jwt.issue(&account).unwrap();
        let auth = Arc::new(AuthService::new(Arc::clone(&users), jwt));

        let app = Router::new()
            .route("/whoami", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(auth, auth_middleware));

        (TestServer::new(app).unwrap(), token, users, account.id)
    }

    #[tokio::test]
    async fn test_bearer_token_authenticates() {
        let (server, token, _, _) = protected_server().await;

        let response = server
            .get("/whoami")
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        response.assert_text("vessel_a");
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_unauthorized() {
        let (server, token, _, _) = protected_server().await;

        server
            .get("/whoami")
            .expect_failure()
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/whoami")
            .add_header(header::AUTHORIZATION, format!("Token {}", token))
            .expect_failure()
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_deactivated_account_is_rejected() {
        let (server, token, users, id) = protected_server().await;
        users.set_active(id, false).await.unwrap();

        server
            .get("/whoami")
            .authorization_bearer(&token)
            .expect_failure()
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_swagger_basic_auth() {
        let app = Router::new()
            .route("/docs", get(|| async { "docs" }))
            .layer(axum::middleware::from_fn_with_state(
                Arc::new("admin:secret".to_string()),
                swagger_basic_auth,
            ));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/docs").expect_failure().await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.maybe_header(header::WWW_AUTHENTICATE).is_some());

        let encoded = BASE64_STANDARD.encode("admin:secret");
        server
            .get("/docs")
            .add_header(header::AUTHORIZATION, format!("Basic {}", encoded))
            .await
            .assert_status_ok();
    }
}
