mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::extractor::TrustForwardedFor;
use crate::core::{database, middleware};
use crate::features::activities::{ActivityRepository, ActivityService, PgActivityRepository};
use crate::features::admin::{routes as admin_routes, AdminService};
use crate::features::auth::routes as auth_routes;
use crate::features::auth::{AuthService, JwtService};
use crate::features::dashboard::{routes as dashboard_routes, DashboardService};
use crate::features::files::{
    routes as files_routes, FileService, PgUploadSessionRepository, UploadSessionRepository,
};
use crate::features::permissions::{
    PermissionRepository, PermissionService, PgPermissionRepository,
};
use crate::features::users::{PgUserRepository, UserRepository, UserService};
use crate::modules::storage::LocalStorage;
use axum::{middleware::from_fn_with_state, Extension, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Configuration loaded: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );

    // Database
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Storage root
    let storage = Arc::new(
        LocalStorage::new(&config.storage.root)
            .map_err(|e| anyhow::anyhow!("Failed to open storage root: {}", e))?,
    );
    tracing::info!("File storage rooted at {}", config.storage.root.display());

    // Repositories
    let user_repository: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let permission_repository: Arc<dyn PermissionRepository> =
        Arc::new(PgPermissionRepository::new(pool.clone()));
    let activity_repository: Arc<dyn ActivityRepository> =
        Arc::new(PgActivityRepository::new(pool.clone()));
    let session_repository: Arc<dyn UploadSessionRepository> =
        Arc::new(PgUploadSessionRepository::new(pool.clone()));

    // Services
    let user_service = Arc::new(UserService::new(user_repository, config.auth.bcrypt_cost));
    let permission_service = Arc::new(PermissionService::new(permission_repository));
    let activity_service = Arc::new(ActivityService::new(activity_repository));

    let auth_service = Arc::new(AuthService::new(
        Arc::clone(&user_service),
        JwtService::new(&config.auth),
    ));
    tracing::info!("Auth service initialized");

    if let Some((username, password)) = config.auth.bootstrap_admin() {
        auth_service
            .bootstrap_admin(username, password)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bootstrap admin: {}", e))?;
    }

    let file_service = Arc::new(FileService::new(
        Arc::clone(&storage),
        Arc::clone(&permission_service),
        Arc::clone(&activity_service),
        session_repository,
    ));
    let dashboard_service = Arc::new(DashboardService::new(
        Arc::clone(&storage),
        Arc::clone(&permission_service),
        Arc::clone(&activity_service),
        Arc::clone(&user_service),
    ));
    let admin_service = Arc::new(AdminService::new(
        storage,
        permission_service,
        user_service,
        activity_service,
    ));
    tracing::info!("File, dashboard and admin services initialized");

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn_with_state(
                Arc::new(credentials),
                middleware::swagger_basic_auth,
            ))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require a valid bearer token for an active account)
    let protected_routes = Router::new()
        .merge(auth_routes::protected_routes(Arc::clone(&auth_service)))
        .merge(dashboard_routes(dashboard_service))
        .merge(files_routes(file_service, config.storage.max_upload_size))
        .nest("/api/admin", admin_routes::routes(admin_service))
        .route_layer(from_fn_with_state(
            Arc::clone(&auth_service),
            middleware::auth_middleware,
        ));

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let public_routes = Router::new().merge(auth_routes::public_routes(auth_service));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .merge(health_route);

    let app = if config.app.trust_forwarded_for {
        tracing::info!("Trusting X-Forwarded-For for client addresses");
        app.layer(Extension(TrustForwardedFor))
    } else {
        app
    };

    let app = app
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    // Large uploads and downloads benefit from bigger kernel buffers
    socket.set_recv_buffer_size(1024 * 1024)?;
    socket.set_send_buffer_size(1024 * 1024)?;

    let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
    socket.set_tcp_keepalive(&keepalive)?;

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    // Peer addresses feed the activity log when no X-Forwarded-For is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
