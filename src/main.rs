//! Drama Scraper API Server
//!
//! Main entry point for the drama scraper REST API service.

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use drama_scraper::config::Config;
use drama_scraper::error::AppError;
use drama_scraper::routes::{configure_routes, ApiDoc, AppState};

/// Health check endpoint
async fn health_check(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "site": data.config.site,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_state = Config::from_env()
        .map_err(AppError::from)
        .and_then(AppState::from_config)
        .map_err(|e| {
            error!("Failed to start: {}", e);
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
        })?;
    let bind_address = format!("{}:{}", app_state.config.host, app_state.config.port);
    let app_state = web::Data::new(app_state);

    info!("Starting Drama Scraper API server on {}", bind_address);

    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .route("/health", web::get().to(health_check))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
