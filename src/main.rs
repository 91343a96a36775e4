mod config;
mod domain;
mod infrastructure;
mod presentation;
mod usecase;

use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, Database};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    infrastructure::{
        catalog_repository::PostgresCatalogRepository, dpo_gateway::DpoGateway,
        payment_repository::PostgresPaymentRepository,
        registration_repository::PostgresRegistrationRepository,
    },
    presentation::handlers::{
        payment_handler::create_payment_router, registration_handler::create_registration_router,
    },
    usecase::{
        checkout_usecase::{CheckoutUsecase, EventInfo},
        register_usecase::RegisterUsecase,
        verify_payment_usecase::VerifyPaymentUsecase,
    },
};

fn event_from_env() -> EventInfo {
    let name = dotenvy::var("EVENT_NAME").unwrap_or_else(|_| "Trade Expo".to_string());
    let starts_at = dotenvy::var("EVENT_STARTS_AT")
        .ok()
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    EventInfo { name, starts_at }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    if let Err(e) = config.gateway.ensure_configured() {
        warn!(error = %e, "payment gateway is not fully configured");
    }
    info!(
        company_token = %config.gateway.masked_token(),
        test_mode = config.gateway.test_mode,
        "payment gateway settings loaded"
    );

    let mut opt = ConnectOptions::new(&config.database_url);
    opt.max_connections(10)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opt).await?;

    let registration_repository = PostgresRegistrationRepository::new(db.clone());
    let payment_repository = PostgresPaymentRepository::new(db.clone());
    let catalog_repository = PostgresCatalogRepository::new(db.clone());
    let gateway = DpoGateway::new(config.gateway.clone())?;
    let event = event_from_env();

    let register_service = RegisterUsecase::new(
        registration_repository.clone(),
        payment_repository.clone(),
        catalog_repository.clone(),
    );
    let checkout_service = CheckoutUsecase::new(
        registration_repository.clone(),
        payment_repository.clone(),
        gateway.clone(),
        event,
    );
    let verify_service = VerifyPaymentUsecase::new(
        registration_repository.clone(),
        payment_repository.clone(),
        gateway.clone(),
    );

    let app = Router::new().route("/", get(|| async { "OK" })).nest(
        "/api",
        create_registration_router(register_service)
            .merge(create_payment_router(checkout_service, verify_service)),
    );

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
