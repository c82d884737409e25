use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use server_api::{
    get_cause, get_sponsorship, list_category_defaults, list_causes, list_sponsorships,
    location_catalog, moderate_sponsorship, submit_sponsorship, ApiContext,
};
use shared::{
    domain::{CauseId, SponsorshipId, SponsorshipStatus},
    error::{ApiError, ErrorCode},
    protocol::{
        CategoryDefault, CauseSummary, LocationCatalogResponse, ModerationRequest, ServerEvent,
        SponsorshipDetail, SponsorshipReceipt, SponsorshipSubmission, SponsorshipSummary,
    },
};
use storage::Storage;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

type HttpError = (StatusCode, Json<ApiError>);

#[derive(Debug, Deserialize)]
struct LocationQuery {
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SponsorshipQuery {
    status: Option<SponsorshipStatus>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext {
        storage,
        rescale_deadband: settings.rescale_deadband,
    };
    let (events, _) = broadcast::channel(256);

    let state = AppState { api, events };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, max_body_bytes = settings.max_body_bytes, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/causes", get(http_list_causes))
        .route("/causes/:cause_id", get(http_get_cause))
        .route("/categories", get(http_list_categories))
        .route("/locations", get(http_location_catalog))
        .route(
            "/sponsorships",
            post(http_submit_sponsorship).get(http_list_sponsorships),
        )
        .route("/sponsorships/:sponsorship_id", get(http_get_sponsorship))
        .route(
            "/sponsorships/:sponsorship_id/status",
            post(http_moderate_sponsorship),
        )
        .route("/ws", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

fn http_error(error: ApiError) -> HttpError {
    let status = match error.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(message = %error.message, "request failed");
    }
    (status, Json(error))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.storage.health_check().await.map_err(|e| {
        warn!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_list_causes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CauseSummary>>, HttpError> {
    let causes = list_causes(&state.api).await.map_err(http_error)?;
    Ok(Json(causes))
}

async fn http_get_cause(
    State(state): State<Arc<AppState>>,
    Path(cause_id): Path<i64>,
) -> Result<Json<CauseSummary>, HttpError> {
    let cause = get_cause(&state.api, CauseId(cause_id))
        .await
        .map_err(http_error)?;
    Ok(Json(cause))
}

async fn http_list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryDefault>>, HttpError> {
    let defaults = list_category_defaults(&state.api)
        .await
        .map_err(http_error)?;
    Ok(Json(defaults))
}

async fn http_location_catalog(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LocationQuery>,
) -> Result<Json<LocationCatalogResponse>, HttpError> {
    let catalog = location_catalog(&state.api, q.city.as_deref())
        .await
        .map_err(http_error)?;
    Ok(Json(catalog))
}

async fn http_submit_sponsorship(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<SponsorshipSubmission>,
) -> Result<(StatusCode, Json<SponsorshipReceipt>), HttpError> {
    let event = submit_sponsorship(&state.api, submission)
        .await
        .map_err(http_error)?;
    let ServerEvent::SponsorshipSubmitted { sponsorship } = &event else {
        return Err(http_error(ApiError::new(
            ErrorCode::Internal,
            "unexpected submission event",
        )));
    };
    let receipt = SponsorshipReceipt {
        sponsorship_id: sponsorship.sponsorship_id,
        status: sponsorship.status,
        created_at: sponsorship.created_at,
    };
    let _ = state.events.send(event);
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn http_list_sponsorships(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SponsorshipQuery>,
) -> Result<Json<Vec<SponsorshipSummary>>, HttpError> {
    let sponsorships = list_sponsorships(&state.api, q.status)
        .await
        .map_err(http_error)?;
    Ok(Json(sponsorships))
}

async fn http_get_sponsorship(
    State(state): State<Arc<AppState>>,
    Path(sponsorship_id): Path<i64>,
) -> Result<Json<SponsorshipDetail>, HttpError> {
    let detail = get_sponsorship(&state.api, SponsorshipId(sponsorship_id))
        .await
        .map_err(http_error)?;
    Ok(Json(detail))
}

async fn http_moderate_sponsorship(
    State(state): State<Arc<AppState>>,
    Path(sponsorship_id): Path<i64>,
    Json(req): Json<ModerationRequest>,
) -> Result<Json<ServerEvent>, HttpError> {
    let event = moderate_sponsorship(&state.api, SponsorshipId(sponsorship_id), req.status)
        .await
        .map_err(http_error)?;
    let _ = state.events.send(event.clone());
    Ok(Json(event))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: axum::extract::ws::WebSocket) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            let event = match events_rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
