use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::engine::CameraEvent;
use crate::engine::ConditionStore;
use crate::engine::TriggeredCameras;
use crate::engine::TriggersHandle;
use crate::engine::View;
use crate::engine::ViewController;
use crate::engine::ViewName;
use crate::engine::ViewParams;
use crate::host::Host;

/// How long GET /v1/updates waits for a change before answering anyway
const UPDATES_TIMEOUT: Duration = Duration::from_secs(30);

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

/// Response for the /v1/triggers endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TriggersResponse {
    pub triggered: bool,
    pub cameras: Vec<String>,
    pub most_recent: Option<String>,
}

impl From<&TriggeredCameras> for TriggersResponse {
    fn from(triggered: &TriggeredCameras) -> Self {
        Self {
            triggered: !triggered.is_empty(),
            cameras: triggered.camera_ids().into_iter().collect(),
            most_recent: triggered.most_recent().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdatesQuery {
    /// Refresh count the caller has already seen
    since: Option<u64>,
}

/// Response for the /v1/updates endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UpdatesResponse {
    /// Refresh requests so far; pass back as `since` to wait for the next one
    pub refreshes: u64,
    pub view: View,
    /// The published triggered condition
    pub condition: Option<BTreeSet<String>>,
    pub triggers: TriggersResponse,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Request body for POST /v1/view
#[derive(Debug, Deserialize)]
struct SelectView {
    view: ViewName,
    camera: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    version: &'static str,
    triggers: TriggersHandle,
    host: Host,
}

impl AppState {
    pub fn new(triggers: TriggersHandle, host: Host) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            triggers,
            host,
        }
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/triggers
#[tracing::instrument(skip(state))]
async fn triggers(State(state): State<Arc<AppState>>) -> Json<TriggersResponse> {
    Json(TriggersResponse::from(state.triggers.snapshot().as_ref()))
}

/// Handler for GET /v1/updates
///
/// With `since`, waits until a refresh past `since`, a view change or a
/// condition change, or until [`UPDATES_TIMEOUT`]. Without it, answers at once.
#[tracing::instrument(skip(state))]
async fn updates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdatesQuery>,
) -> Json<UpdatesResponse> {
    let host = &state.host;

    // Subscribe before reading so a change in between still wakes us.
    let mut refreshes = host.refresher.subscribe();
    let mut view = host.view.subscribe();
    let mut condition = host.condition.subscribe();

    let seen = *refreshes.borrow_and_update();
    if let Some(since) = query.since.filter(|since| seen <= *since) {
        let changed = async {
            tokio::select! {
                _ = refreshes.changed() => {}
                _ = view.changed() => {}
                _ = condition.changed() => {}
            }
        };
        if tokio::time::timeout(UPDATES_TIMEOUT, changed).await.is_err() {
            tracing::debug!("No updates after refresh {}", since);
        }
    }

    Json(UpdatesResponse {
        refreshes: host.refresher.count(),
        view: host.view.current(),
        condition: host.condition.triggered(),
        triggers: TriggersResponse::from(state.triggers.snapshot().as_ref()),
    })
}

/// Handler for GET /v1/view
#[tracing::instrument(skip(state))]
async fn get_view(State(state): State<Arc<AppState>>) -> Json<View> {
    Json(state.host.view.current())
}

/// Handler for POST /v1/view
///
/// Selecting a view is user navigation, so it also counts as an interaction.
#[tracing::instrument(skip(state))]
async fn select_view(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectView>,
) -> Response {
    if !state.host.config.load().cameras.contains_key(&request.camera) {
        return error(
            StatusCode::NOT_FOUND,
            format!("Unknown camera '{}'", request.camera),
        );
    }

    state.host.interactions.record();
    state
        .host
        .view
        .set_view(ViewParams::new(request.view, request.camera));
    Json(state.host.view.current()).into_response()
}

/// Handler for POST /v1/interaction
#[tracing::instrument(skip(state))]
async fn interaction(State(state): State<Arc<AppState>>) -> StatusCode {
    state.host.interactions.record();
    StatusCode::NO_CONTENT
}

/// Handler for POST /v1/events
#[tracing::instrument(skip(state))]
async fn inject_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<CameraEvent>,
) -> Response {
    match state.triggers.send_event(event).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Triggers engine is not running",
        ),
    }
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/triggers", get(triggers))
        .route("/v1/updates", get(updates))
        .route("/v1/view", get(get_view).post(select_view))
        .route("/v1/interaction", post(interaction))
        .route("/v1/events", post(inject_event))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP API server
///
/// Binds to `listen:port` and serves until `shutdown_rx` fires.
pub async fn serve(
    listen: String,
    port: u16,
    state: AppState,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port)
        .parse()
        .with_context(|| format!("Invalid API listen address {}:{}", listen, port))?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}
