//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{completion_llm::OpenAiCompletionAdapter, db::DbAdapter},
    config::Config,
    error::ApiError,
    web::{
        ai::{completion_handler, reset_usage_handler, usage_stats_handler},
        auth::{
            delete_account_handler, login_handler, me_handler, register_handler,
            update_password_handler,
        },
        health_handler,
        history::{
            cleanup_history_handler, clear_history_handler, delete_history_handler,
            get_history_handler, history_stats_handler, list_history_handler,
            save_history_handler,
        },
        require_auth, root_handler, throttle, ApiDoc, AppState, RateLimiter, TokenService,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Completion Adapter ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.completion_api_key)
        .with_api_base(&config.completion_api_base);
    let openai_client = Client::with_config(openai_config);
    let completion_adapter = Arc::new(OpenAiCompletionAdapter::new(
        openai_client,
        config.completion_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let tokens = TokenService::new(
        config.jwt_secret.as_bytes(),
        Duration::days(config.token_ttl_days),
    );
    let app_state = Arc::new(AppState {
        db: db_adapter,
        completion: completion_adapter,
        tokens,
        config: config.clone(),
    });

    // --- 5. CORS ---
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    if config.allowed_origins.is_empty() {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect();
        cors = cors.allow_origin(AllowOrigin::list(origins)).allow_credentials(true);
    }

    // --- 6. Create the Web Router ---
    // Per-IP throttles, separate from the per-account daily quota: a brute
    // force damper on the credential endpoints and a burst damper on the
    // completion endpoint.
    let auth_limiter = Arc::new(RateLimiter::new(
        5,
        StdDuration::from_secs(15 * 60),
        "Too many login attempts, please try again later.",
    ));
    let ai_limiter = Arc::new(RateLimiter::new(
        10,
        StdDuration::from_secs(60),
        "Too many AI requests, please slow down.",
    ));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(
            Router::new()
                .route("/register", post(register_handler))
                .route("/login", post(login_handler))
                .layer(axum_middleware::from_fn_with_state(
                    auth_limiter,
                    throttle,
                )),
        );

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(me_handler))
        .route("/password", put(update_password_handler))
        .route("/account", delete(delete_account_handler))
        .route(
            "/ai/request",
            post(completion_handler).layer(axum_middleware::from_fn_with_state(
                ai_limiter,
                throttle,
            )),
        )
        .route("/ai/usage", get(usage_stats_handler))
        .route("/ai/reset", post(reset_usage_handler))
        .route(
            "/history",
            post(save_history_handler).get(list_history_handler),
        )
        .route("/history/stats", get(history_stats_handler))
        .route("/history/clear", delete(clear_history_handler))
        .route("/history/cleanup", delete(cleanup_history_handler))
        .route(
            "/history/{id}",
            get(get_history_handler).delete(delete_history_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
