//! # trace-viewer
//!
//! HTTP server around the trace normalizer.
//!
//! ## API Endpoints
//!
//! - `GET /health` - Server health check
//! - `GET /api/trace` - Raw text of the hosted trace file
//! - `GET /api/trace/parsed` - Hosted trace, normalized
//! - `POST /api/parse` - Normalize a trace sent as the request body
//! - `POST /api/load-url` - Fetch, normalize and save a trace by URL
//! - `GET|POST|DELETE /api/threads` - Saved threads
//! - `GET|DELETE /api/threads/{id}`, `POST /api/threads/{id}/rename`
//! - `GET /api/threads/{id}/view` - Events with their render targets
//! - `POST /api/share?base=<url>`, `GET /api/share?z=<payload>` - Share links
//! - `GET /api/tools` - Registered tool renderers

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trace_viewer_rs::{
    config::{self, Config, ParseOutcome},
    error::ApiError,
    loader,
    normalize,
    pairing::{pair_tools, ToolPair},
    share::{self, ShareLink},
    threads::{FileKvStore, Thread, ThreadStore, ThreadSummary},
    tools::{RenderTarget, ToolRegistry, ToolRenderer},
    TraceData, TraceEvent,
};

/// Traces can be large; the default 2MB axum limit is too small.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

struct AppState {
    start_time: Instant,
    trace_file: Option<PathBuf>,
    threads: ThreadStore,
    tools: ToolRegistry,
    http: reqwest::Client,
}

type SharedState = Arc<AppState>;

// ============================================================================
// Health Endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    version: &'static str,
    saved_threads: usize,
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
        saved_threads: state.threads.list().await.len(),
    })
}

// ============================================================================
// Trace Endpoints
// ============================================================================

fn hosted_file(state: &AppState) -> Result<&std::path::Path, ApiError> {
    state.trace_file.as_deref().ok_or(ApiError::NoHostedTrace)
}

/// Re-read on every request so edits to the file show up on reload
async fn get_trace(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let text = loader::read_trace_file(hosted_file(&state)?).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

async fn get_trace_parsed(State(state): State<SharedState>) -> Result<Json<TraceData>, ApiError> {
    let data = loader::load_from_file(hosted_file(&state)?).await?;
    Ok(Json(data))
}

async fn parse_trace(body: String) -> Result<Json<TraceData>, ApiError> {
    let data = normalize(&body);
    loader::ensure_displayable(&data)?;
    Ok(Json(data))
}

#[derive(Deserialize)]
struct LoadUrlRequest {
    url: String,
}

#[derive(Serialize)]
struct LoadUrlResponse {
    id: String,
    data: TraceData,
}

async fn load_url(
    State(state): State<SharedState>,
    Json(req): Json<LoadUrlRequest>,
) -> Result<Json<LoadUrlResponse>, ApiError> {
    if req.url.trim().is_empty() {
        return Err(ApiError::BadRequest("url is required".to_string()));
    }
    let data = loader::load_from_url(&state.http, req.url.trim()).await?;
    loader::ensure_displayable(&data)?;
    let id = state.threads.add(data.clone()).await;
    tracing::info!("Loaded {} as thread {}", req.url.trim(), id);
    Ok(Json(LoadUrlResponse { id, data }))
}

// ============================================================================
// Thread Endpoints
// ============================================================================

#[derive(Serialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Deserialize)]
struct RenameRequest {
    title: String,
}

async fn list_threads(State(state): State<SharedState>) -> Json<Vec<ThreadSummary>> {
    Json(state.threads.list().await)
}

async fn create_thread(
    State(state): State<SharedState>,
    Json(data): Json<TraceData>,
) -> (StatusCode, Json<CreatedResponse>) {
    let id = state.threads.add(data).await;
    (StatusCode::CREATED, Json(CreatedResponse { id }))
}

async fn clear_threads(State(state): State<SharedState>) -> StatusCode {
    state.threads.clear().await;
    StatusCode::NO_CONTENT
}

async fn get_thread(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Thread>, ApiError> {
    state
        .threads
        .get(&id)
        .await
        .map(Json)
        .ok_or(ApiError::ThreadNotFound(id))
}

async fn delete_thread(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.threads.delete(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ThreadNotFound(id))
    }
}

async fn rename_thread(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<StatusCode, ApiError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    if state.threads.rename(&id, title.to_string()).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ThreadNotFound(id))
    }
}

#[derive(Serialize)]
struct ViewEvent<'a> {
    event: &'a TraceEvent,
    render: RenderTarget,
}

#[derive(Serialize)]
struct ThreadView<'a> {
    id: &'a str,
    title: &'a str,
    events: Vec<ViewEvent<'a>>,
    pairs: Vec<ToolPair<'a>>,
}

async fn thread_view(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let thread = state
        .threads
        .get(&id)
        .await
        .ok_or_else(|| ApiError::ThreadNotFound(id.clone()))?;

    let events = &thread.data.events;
    let view = ThreadView {
        id: &thread.id,
        title: &thread.title,
        events: events
            .iter()
            .map(|event| ViewEvent {
                event,
                render: state.tools.resolve(event, events),
            })
            .collect(),
        pairs: pair_tools(events),
    };
    // Serialize here: the view borrows from `thread`
    Ok(Json(view).into_response())
}

// ============================================================================
// Share Endpoints
// ============================================================================

#[derive(Deserialize)]
struct ShareParams {
    base: Option<String>,
}

#[derive(Deserialize)]
struct SharePayload {
    z: Option<String>,
}

async fn create_share(
    Query(params): Query<ShareParams>,
    body: String,
) -> Result<Json<ShareLink>, ApiError> {
    let base = params
        .base
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::BadRequest("base is required".to_string()))?;
    Ok(Json(share::create_share_link(&base, &body)?))
}

async fn read_share(Query(params): Query<SharePayload>) -> Result<impl IntoResponse, ApiError> {
    let payload = params
        .z
        .ok_or_else(|| ApiError::BadRequest("z is required".to_string()))?;
    let text = share::decompress_from_hash(&format!("z={}", payload))
        .ok_or_else(|| ApiError::BadRequest("invalid share payload".to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

// ============================================================================
// Tool Registry Endpoint
// ============================================================================

#[derive(Serialize)]
struct ToolEntry {
    name: String,
    renderer: ToolRenderer,
}

async fn list_tools(State(state): State<SharedState>) -> Json<Vec<ToolEntry>> {
    let entries = state
        .tools
        .names()
        .into_iter()
        .map(|name| ToolEntry {
            name: name.to_string(),
            renderer: state.tools.get(name),
        })
        .collect();
    Json(entries)
}

// ============================================================================
// Router
// ============================================================================

fn app(state: SharedState, static_dir: &std::path::Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/trace", get(get_trace))
        .route("/api/trace/parsed", get(get_trace_parsed))
        .route("/api/parse", post(parse_trace))
        .route("/api/load-url", post(load_url))
        .route(
            "/api/threads",
            get(list_threads).post(create_thread).delete(clear_threads),
        )
        .route("/api/threads/{id}", get(get_thread).delete(delete_thread))
        .route("/api/threads/{id}/rename", post(rename_thread))
        .route("/api/threads/{id}/view", get(thread_view))
        .route("/api/share", get(read_share).post(create_share))
        .route("/api/tools", get(list_tools))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        // Static files
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trace_viewer_rs=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let config: Config = match config::parse_args() {
        Ok(ParseOutcome::Run(config)) => config,
        Ok(ParseOutcome::Help) => {
            print!("{}", config::usage());
            return Ok(());
        }
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, config::usage());
            std::process::exit(2);
        }
    };

    if let Some(path) = &config.trace_file {
        // Report problems with the hosted file up front; requests re-read it anyway
        match loader::load_from_file(path).await {
            Ok(data) => {
                if let Err(e) = loader::ensure_displayable(&data) {
                    tracing::warn!("{}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    let kv = Arc::new(FileKvStore::new(&config.data_dir));
    let state = Arc::new(AppState {
        start_time: Instant::now(),
        trace_file: config.trace_file.clone(),
        threads: ThreadStore::load(kv),
        tools: ToolRegistry::with_builtins(),
        http: loader::http_client()?,
    });

    let app = app(state, &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("trace-viewer v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
