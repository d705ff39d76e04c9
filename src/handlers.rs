use crate::config::Config;
use crate::dedupe::CallDeduplicator;
use crate::errors::{AppError, ResultExt};
use crate::extraction::{ExtractOptions, LeadExtractor};
use crate::rows::row_for;
use crate::sheets_client::SheetsClient;
use crate::webhook_models::WebhookAck;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Webhook bodies above this size are acknowledged with `ok: false`.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for appending rows to the spreadsheet.
    pub sheets: SheetsClient,
    /// Lead extraction strategies and normalization options.
    pub extractor: LeadExtractor,
    /// Call ids that already produced a row.
    pub seen_calls: CallDeduplicator,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let sheets = SheetsClient::from_config(&config)?;
        let extractor = LeadExtractor::new(ExtractOptions::from(&config));
        let seen_calls = CallDeduplicator::new(
            config.dedupe_max_entries,
            Duration::from_secs(config.dedupe_ttl_secs),
        );

        Ok(Self {
            config,
            sheets,
            extractor,
            seen_calls,
        })
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let webhook_routes = Router::new()
        .route("/vapi/webhook", post(vapi_webhook))
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(MAX_BODY_BYTES)));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .merge(webhook_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Plain-text liveness check.
pub async fn root() -> &'static str {
    "vapi-lead-sheets is running"
}

/// Health check endpoint.
///
/// Returns the service status along with the configured spreadsheet target.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "status": "healthy",
            "service": "vapi-lead-sheets",
            "version": env!("CARGO_PKG_VERSION"),
            "spreadsheetId": state.sheets.spreadsheet_id(),
            "range": state.sheets.range(),
        })),
    )
}

/// POST /vapi/webhook
///
/// Receives call events from Vapi, extracts the lead and appends one row to
/// the spreadsheet. The body is parsed as JSON whatever the content type, so
/// `text/plain` deliveries work too.
///
/// Always answers 200 so the platform never retries:
/// - `{"ok": true, "wrote": true}` when a row was appended
/// - `{"ok": true, "skipped": "..."}` when there was nothing to write
/// - `{"ok": false, "error": "..."}` on malformed or oversized bodies and
///   append failures
pub async fn vapi_webhook(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookAck>, AppError> {
    let body = body.map_err(|rejection| {
        AppError::BadRequest(format!("Unreadable body: {}", rejection.body_text()))
    })?;
    tracing::info!("Received Vapi webhook ({} bytes)", body.len());

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    if !payload.is_object() {
        tracing::warn!("Skipping webhook: body is not a JSON object");
        return Ok(Json(WebhookAck::skipped("payload is not a JSON object")));
    }

    let extraction = state.extractor.extract(&payload);

    // Intermediate events (status updates, speech updates) carry no lead.
    if !extraction.lead.is_meaningful() {
        tracing::info!(
            "Skipping webhook without lead fields (call_id={:?})",
            extraction.call_id
        );
        return Ok(Json(WebhookAck::skipped("no lead fields found")));
    }

    if let Some(call_id) = extraction.call_id.as_deref() {
        if !state.seen_calls.first_sighting(call_id).await {
            tracing::warn!("⏭ Duplicate call {} - row already written", call_id);
            return Ok(Json(WebhookAck::skipped("duplicate call_id")));
        }
    }

    tracing::info!(
        "Lead extracted: call_id={:?}, brokerage={}, fields={:?}",
        extraction.call_id,
        extraction.brokerage,
        extraction.lead.present_fields()
    );

    let row = row_for(&extraction, Utc::now());
    let updated_range = state
        .sheets
        .append_row(&row)
        .await
        .with_context(|| format!("Failed to append lead row (call_id={:?})", extraction.call_id))?;

    Ok(Json(WebhookAck::written(updated_range)))
}
