use axum::{
    routing::{get, post},
    Router,
};
use lambda_http::run;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
use config::AppConfig;
mod database;
use database::{create_db_pool, PgOrderStore};
mod error;
mod event;
mod handlers;
use handlers::{
    create_gateway_order_handler, gateway_key_handler, health_handler, record_order_handler,
};
mod notifications;
use notifications::{Mailer, SmtpMailer};
mod order_locator;
mod payment_webhook;
use payment_webhook::webhook_handler;
mod signature;
mod state;
use state::AppState;
#[cfg(test)]
mod testing;

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/gateway_key", get(gateway_key_handler))
        .route("/gateway_orders", post(create_gateway_order_handler))
        .route("/orders", post(record_order_handler))
        .route("/webhook", post(webhook_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_writer(std::io::stdout);
    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .init();

    info!("Starting order confirmation Lambda");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading configuration: {e}");
            return Err(e.into());
        }
    };

    // Initialize database connection
    let db_pool = match create_db_pool(&config.database_url) {
        Ok(pool) => {
            info!("Database connection pool created successfully");
            pool
        }
        Err(e) => {
            error!("Failed to create database connection pool: {}", e);
            return Err(e.into());
        }
    };

    if config.webhook_secret.is_none() {
        warn!("RAZORPAY_WEBHOOK_SECRET is not set, every webhook will be rejected");
    }

    let mailer: Option<Arc<dyn Mailer>> = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp, &config.store_name) {
            Ok(mailer) => Some(Arc::new(mailer)),
            Err(e) => {
                error!("SMTP mailer could not be configured, confirmations disabled: {e}");
                None
            }
        },
        None => {
            warn!("SMTP credentials are not set, confirmation emails are disabled");
            None
        }
    };

    let state = AppState::new(config, Arc::new(PgOrderStore::new(db_pool)), mailer);

    match run(router(state)).await {
        Ok(()) => info!("Lambda executed successfully"),
        Err(e) => error!("Lambda execution error: {e}"),
    }
    Ok(())
}
