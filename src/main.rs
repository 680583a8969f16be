use alto_reconcile::alto::AltoSet;
use alto_reconcile::config::ReconcileConfig;
use alto_reconcile::engine::{merge_styles, update_case_alto_unified, validate_case};
use alto_reconcile::error::ReconcileError;
use alto_reconcile::logging::{log_event, LogLevel};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

struct AppState {
    config: ReconcileConfig,
}

/// ALTO pages keyed by the METS file id that references them.
type AltoSources = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    case_xml: String,
    alto: AltoSources,
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    case_xml: String,
    alto: AltoSources,
    #[serde(default)]
    strict: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PropagateRequest {
    original_xml: String,
    updated_xml: String,
    alto: AltoSources,
}

#[derive(Debug, Serialize)]
struct MergeResponse {
    case_xml: String,
}

type Reply = (StatusCode, Json<serde_json::Value>);

fn load_alto(sources: &AltoSources) -> Result<AltoSet, ReconcileError> {
    AltoSet::parse_all(sources.iter().map(|(id, xml)| (id.as_str(), xml.as_str())))
}

fn error_reply(err: ReconcileError) -> Reply {
    let status = match err {
        ReconcileError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

/// Runs a CPU-bound engine call off the async workers and shapes its result.
async fn run_blocking<T, F>(operation: &'static str, job: F) -> Reply
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<T, ReconcileError> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(Ok(value)) => match serde_json::to_value(value) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            ),
        },
        Ok(Err(err)) => {
            log_event(
                LogLevel::Warn,
                "request failed",
                Some(json!({ "operation": operation, "error": err.to_string() })),
            );
            error_reply(err)
        }
        Err(err) => {
            tracing::error!("[Reconcile] {} task panicked or was cancelled: {}", operation, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
        }
    }
}

async fn handle_validate(State(state): State<Arc<AppState>>, Json(request): Json<ValidateRequest>) -> Reply {
    let config = state.config.clone();
    run_blocking("validate", move || {
        let alto = load_alto(&request.alto)?;
        validate_case(&request.case_xml, &alto, &config)
    })
    .await
}

async fn handle_merge(State(state): State<Arc<AppState>>, Json(request): Json<MergeRequest>) -> Reply {
    let mut config = state.config.clone();
    if let Some(strict) = request.strict {
        config.strict = strict;
    }
    run_blocking("merge", move || {
        let alto = load_alto(&request.alto)?;
        let case_xml = merge_styles(&request.case_xml, &alto, &config)?;
        Ok(MergeResponse { case_xml })
    })
    .await
}

async fn handle_propagate(Json(request): Json<PropagateRequest>) -> Reply {
    run_blocking("propagate", move || {
        let alto = load_alto(&request.alto)?;
        update_case_alto_unified(&request.original_xml, &request.updated_xml, &alto)
    })
    .await
}

async fn handle_health() -> &'static str {
    "ok"
}

fn load_config() -> ReconcileConfig {
    match std::env::var("RECONCILE_CONFIG") {
        Ok(path) => match ReconcileConfig::load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("[Reconcile] {}; using defaults", err);
                ReconcileConfig::default()
            }
        },
        Err(_) => ReconcileConfig::default(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let state = Arc::new(AppState {
        config: load_config(),
    });
    tracing::info!(
        threshold = state.config.consecutive_bad_word_threshold,
        strict = state.config.strict,
        "[Reconcile] Configuration loaded"
    );

    let app = Router::new()
        .route("/validate", post(handle_validate))
        .route("/merge", post(handle_merge))
        .route("/propagate", post(handle_propagate))
        .fallback(handle_health)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("Failed to bind to port 8080");

    tracing::info!("[Reconcile] Listening on :8080");

    axum::serve(listener, app).await.expect("Server failed");
}
