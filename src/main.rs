use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use esthi_booking::config::AppConfig;
use esthi_booking::db;
use esthi_booking::handlers;
use esthi_booking::services::email::smtp::SmtpNotifier;
use esthi_booking::services::email::{LogNotifier, Notifier};
use esthi_booking::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let notifier: Box<dyn Notifier> = if config.smtp_configured() {
        tracing::info!("sending email via {}:{}", config.smtp_server, config.smtp_port);
        Box::new(SmtpNotifier::new(
            config.smtp_server.clone(),
            config.smtp_port,
            config.smtp_username.clone(),
            config.smtp_password.clone(),
            config.email_from.clone(),
            config.email_from_name.clone(),
        ))
    } else {
        tracing::warn!("SMTP_SERVER not set, confirmation emails will only be logged");
        Box::new(LogNotifier)
    };

    if config.admin_password.is_empty() {
        tracing::warn!("ADMIN_PASSWORD not set, admin login is disabled until an admin exists");
    }

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
