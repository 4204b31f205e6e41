use anyhow::Context;
use storage::Database;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod app_state;
mod config;
mod error;
mod handlers;
mod routes;

use app_state::AppState;
use config::Config;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::history::create_snapshot,
        handlers::history::set_active_version,
        handlers::history::restore_snapshot,
        handlers::history::list_history,
        handlers::history::get_history_record,
        handlers::history::get_changes,
    ),
    components(
        schemas(
            storage::dto::rates_history::CreateSnapshotRequest,
            storage::dto::rates_history::RestoreRequest,
            storage::dto::rates_history::RestoreResponse,
            storage::dto::rates_history::HistoryRecordResponse,
            storage::dto::rates_history::HistoryDetailResponse,
            storage::dto::rates_history::ChangesResponse,
            storage::dto::rates_history::ChangedRatePlanResponse,
            storage::dto::common::PaginationMeta,
            storage::models::RatePlan,
            storage::models::RateOffer,
        )
    ),
    tags(
        (name = "rates-history", description = "Rates versioning and change detection endpoints"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("Starting rates versioning API");

    let config = Config::from_env().context("Failed to load API configuration")?;

    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed");

    let state = AppState::new(db, config.restore_policy);

    let app = routes::router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive());

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    tracing::info!("Listening on http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
