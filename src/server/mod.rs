//! HTTP API server exposing the plan-to-graph pipeline to the rendering
//! frontend.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{net::TcpListener, task};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{fmt, EnvFilter};

use crate::engine::{EngineError, PlanSource, QueryRows, SqliteEngine};
use crate::error::PlanGraphError;
use crate::graph::Graph;
use crate::pipeline::{self, ExplainPlan};

/// File-based database replacement endpoint.
pub mod upload;

pub use upload::MAX_UPLOAD_BYTES;

/// Runtime options used to boot the HTTP server.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Path to the database file queries run against.
    pub db_path: PathBuf,
    /// Network interface to bind to.
    pub host: IpAddr,
    /// Listening port.
    pub port: u16,
    /// Directory uploaded database files are stored under.
    pub uploads_dir: PathBuf,
    /// Optional static asset directory for the rendering frontend.
    pub assets_dir: Option<PathBuf>,
    /// Whether to disable mutating endpoints (upload).
    pub read_only: bool,
    /// Allowed CORS origins for remote frontends.
    pub allow_origins: Vec<String>,
}

impl ServerOptions {
    /// Convenience accessor for `(host, port)` tuples.
    pub fn socket_parts(&self) -> (IpAddr, u16) {
        (self.host, self.port)
    }
}

/// Errors that can occur while running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the TCP listener or serving connections failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handler state.
pub type AppState = Arc<ServerState>;

/// Server state: the current database path sits behind a lock so an upload
/// can switch it atomically between requests.
pub struct ServerState {
    db_path: RwLock<PathBuf>,
    uploads_dir: PathBuf,
    read_only: bool,
    assets_dir: Option<PathBuf>,
    allow_origins: Vec<String>,
}

impl ServerState {
    /// Creates state from boot options.
    pub fn new(opts: ServerOptions) -> Self {
        Self {
            db_path: RwLock::new(opts.db_path),
            uploads_dir: opts.uploads_dir,
            read_only: opts.read_only,
            assets_dir: opts.assets_dir,
            allow_origins: opts.allow_origins,
        }
    }

    /// Opens an engine on the current database file.
    pub fn open_engine(&self) -> Result<SqliteEngine, EngineError> {
        let path = self.db_path.read().clone();
        SqliteEngine::open(path)
    }

    /// Display name of the current database (file stem).
    pub fn current_database(&self) -> String {
        self.db_path
            .read()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub(crate) fn read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn uploads_dir(&self) -> &PathBuf {
        &self.uploads_dir
    }

    pub(crate) fn set_db_path(&self, path: PathBuf) {
        *self.db_path.write() = path;
    }
}

/// Starts the server and runs until shutdown.
pub async fn serve(options: ServerOptions) -> Result<(), ServerError> {
    install_tracing_subscriber();

    let (host, port) = options.socket_parts();
    let state = Arc::new(ServerState::new(options));
    let app = build_router(state.clone());
    let addr = SocketAddr::from((host, port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        database = %state.current_database(),
        read_only = state.read_only,
        allow_origins = ?state.allow_origins,
        "plangraph server listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Builds the router over the given state. Exposed so tests can drive the
/// routes without a listener.
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.allow_origins);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/test-queries", get(test_queries_handler))
        .route("/api/database", get(current_database_handler))
        .route("/api/query", post(query_handler))
        .route("/api/explain", post(explain_handler))
        .route("/api/query-graph", post(query_graph_handler))
        .route(
            "/api/database/upload",
            post(upload::upload_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        );

    if let Some(dir) = state.assets_dir.clone() {
        let service = ServeDir::new(dir).append_index_html_on_directories(true);
        router = router.fallback_service(service);
    }

    if let Some(layer) = cors {
        router = router.layer(layer);
    }

    router.with_state(state).layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let mut allowed = Vec::new();
    for origin in origins {
        let normalized = normalize_origin(origin);
        match normalized
            .as_deref()
            .and_then(|value| HeaderValue::from_str(value).ok())
        {
            Some(value) => allowed.push(value),
            None => {
                tracing::warn!(%origin, ?normalized, "ignoring invalid CORS origin");
            }
        }
    }

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([ACCEPT, CONTENT_TYPE]),
    )
}

fn normalize_origin(origin: &str) -> Option<String> {
    let trimmed = origin.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_trailing_slash = trimmed.trim_end_matches('/');
    if without_trailing_slash.is_empty() {
        return None;
    }
    Some(without_trailing_slash.to_string())
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        read_only: state.read_only,
    })
}

async fn test_queries_handler() -> Json<Vec<SampleQuery>> {
    Json(vec![
        SampleQuery {
            name: "Simple Actor Query",
            query: "SELECT * FROM actor LIMIT 10;",
        },
        SampleQuery {
            name: "Actor Film Join",
            query: "SELECT a.first_name, f.title FROM actor a \
                    JOIN film_actor fa ON fa.actor_id = a.actor_id \
                    JOIN film f ON f.film_id = fa.film_id;",
        },
        SampleQuery {
            name: "Rentals Per Customer",
            query: "SELECT customer_id, COUNT(*) FROM rental \
                    GROUP BY customer_id ORDER BY COUNT(*) DESC;",
        },
    ])
}

async fn current_database_handler(
    State(state): State<AppState>,
) -> Json<CurrentDatabaseResponse> {
    Json(CurrentDatabaseResponse {
        success: true,
        current_database: state.current_database(),
    })
}

async fn query_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<ExecuteResponse>, AppError> {
    let query = payload.require_query()?;
    let result = task::spawn_blocking(move || -> Result<QueryRows, AppError> {
        let engine = state.open_engine()?;
        Ok(engine.run_query(&query)?)
    })
    .await??;
    Ok(Json(ExecuteResponse {
        success: true,
        result,
    }))
}

async fn explain_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<ExplainResponse>, AppError> {
    let query = payload.require_query()?;
    let plan = task::spawn_blocking(move || -> Result<ExplainPlan, AppError> {
        let engine = state.open_engine()?;
        Ok(pipeline::explain_query(&engine, &query)?)
    })
    .await??;
    Ok(Json(ExplainResponse {
        success: true,
        plan,
    }))
}

async fn query_graph_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<GraphResponse>, AppError> {
    let query = payload.require_query()?;
    let graph = task::spawn_blocking(move || -> Result<Graph, AppError> {
        let engine = state.open_engine()?;
        Ok(pipeline::query_graph(&engine, &query)?)
    })
    .await??;
    Ok(Json(GraphResponse {
        graph,
        error: false,
    }))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: String,
}

impl QueryRequest {
    fn require_query(self) -> Result<String, AppError> {
        let query = self.query.trim().to_owned();
        if query.is_empty() {
            return Err(AppError::MissingQuery);
        }
        Ok(query)
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    read_only: bool,
}

#[derive(Debug, Serialize)]
struct SampleQuery {
    name: &'static str,
    query: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentDatabaseResponse {
    success: bool,
    current_database: String,
}

#[derive(Debug, Serialize)]
struct ExecuteResponse {
    success: bool,
    #[serde(flatten)]
    result: QueryRows,
}

#[derive(Debug, Serialize)]
struct ExplainResponse {
    success: bool,
    plan: ExplainPlan,
}

#[derive(Debug, Serialize)]
struct GraphResponse {
    graph: Graph,
    error: bool,
}

/// Errors surfaced to HTTP clients as JSON payloads.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request carried no query text.
    #[error("there is no query")]
    MissingQuery,
    /// A mutating endpoint was hit while the server runs read-only.
    #[error("mutating endpoint is disabled in read-only mode")]
    ReadOnly,
    /// The uploaded file is not a supported database format.
    #[error("unsupported upload: {0}")]
    UnsupportedUpload(String),
    /// The upload form contained no file field.
    #[error("upload contained no file")]
    MissingFile,
    /// The engine failed to open, plan, or execute.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The pipeline failed downstream of the engine.
    #[error(transparent)]
    Pipeline(#[from] PlanGraphError),
    /// A blocking task panicked or was cancelled.
    #[error("internal task failure: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// Reading the multipart body failed.
    #[error("upload failed: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    /// Filesystem failure while storing an upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MissingQuery
            | AppError::UnsupportedUpload(_)
            | AppError::MissingFile
            | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::ReadOnly => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(ErrorPayload {
            success: false,
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    success: bool,
    error: String,
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}

fn install_tracing_subscriber() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
