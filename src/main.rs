use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vapi_lead_sheets::config::Config;
use vapi_lead_sheets::handlers::{self, AppState};

/// Main entry point for the application.
///
/// Initializes logging, validates configuration, builds the Sheets client and
/// starts the Axum server. Configuration errors abort startup before the
/// listener is bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vapi_lead_sheets=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let port = config.port;
    let app_state = Arc::new(AppState::new(config)?);
    tracing::info!(
        "✓ Sheets client initialized: spreadsheet={}, range={}",
        app_state.sheets.spreadsheet_id(),
        app_state.sheets.range()
    );

    let app = handlers::router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
