//! `PalaverServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::{HeaderMap, Uri};
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use palaver_core::RoomName;
use palaver_settings::PalaverSettings;
use palaver_store::{Database, SqliteGateway};
use palaver_telemetry::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::{self, ApiError};
use crate::auth::credentials_from;
use crate::chat::groups::GroupLayer;
use crate::chat::session::ChatContext;
use crate::config::ServerConfig;
use crate::errors::{Result, ServerError};
use crate::health::{self, HealthResponse};
use crate::metrics::{metrics_handler, track_requests};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::socket::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Collaborators and room table for chat sessions.
    pub chat: ChatContext,
    /// Store used by the HTTP API.
    pub store: SqliteGateway,
    /// Runtime configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// One permit per open chat connection.
    pub connections: Arc<Semaphore>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Chat connections currently holding a permit.
    pub fn open_connections(&self) -> usize {
        self.config
            .max_connections
            .saturating_sub(self.connections.available_permits())
    }
}

/// The Palaver server.
pub struct PalaverServer {
    state: AppState,
}

impl PalaverServer {
    /// Server over `store`, which also authenticates and answers friendship
    /// lookups.
    pub fn new(config: ServerConfig, store: SqliteGateway, metrics: PrometheusHandle) -> Self {
        let gateway = Arc::new(store.clone());
        let chat = ChatContext {
            persistence: gateway.clone(),
            authenticator: gateway.clone(),
            friendships: gateway,
            groups: Arc::new(GroupLayer::new()),
            policy: config.admission_policy,
        };
        let state = AppState {
            chat,
            store,
            connections: Arc::new(Semaphore::new(config.max_connections)),
            config: Arc::new(config),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
        };
        Self { state }
    }

    /// Open the configured database (relative paths resolve under `base`)
    /// and build a server over it.
    pub fn open(settings: &PalaverSettings, base: &FsPath, metrics: PrometheusHandle) -> Result<Self> {
        let db = if settings.database.is_in_memory() {
            Database::in_memory()?
        } else {
            Database::open(&settings.database.resolve(base))?
        };
        Ok(Self::new(
            ServerConfig::from(settings),
            SqliteGateway::new(db),
            metrics,
        ))
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws/chat/{room_name}", get(ws_handler))
            .merge(api::routes())
            .layer(middleware::from_fn(track_requests))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve in a background task. Returns the bound address and
    /// the serve task, which finishes after [`Self::graceful_shutdown`].
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>)> {
        let addr = self.state.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let router = self.router();
        let token = self.state.shutdown.token();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "server exited with error");
            }
        });

        info!(addr = %local, "palaver server listening");
        Ok((local, handle))
    }

    /// Cancel everything and wait up to the configured timeout for `server`.
    pub async fn graceful_shutdown(&self, server: JoinHandle<()>) {
        self.state
            .shutdown
            .graceful_shutdown(vec![server], Some(self.state.config.shutdown_timeout))
            .await;
        info!("palaver server stopped");
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Room table.
    pub fn groups(&self) -> &Arc<GroupLayer> {
        &self.state.chat.groups
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Backing store.
    pub fn store(&self) -> &SqliteGateway {
        &self.state.store
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.open_connections(),
        state.chat.groups.room_count(),
    ))
}

/// GET /ws/chat/{room_name}
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_name): Path<String>,
    headers: HeaderMap,
    uri: Uri,
    State(state): State<AppState>,
) -> Response {
    if state.shutdown.is_shutting_down() {
        return ApiError::Unavailable("Server is shutting down".into()).into_response();
    }
    let Ok(permit) = Arc::clone(&state.connections).try_acquire_owned() else {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        warn!(
            max_connections = state.config.max_connections,
            "connection limit reached, rejecting upgrade"
        );
        return ApiError::Unavailable("Too many connections".into()).into_response();
    };

    let credentials = credentials_from(&headers, &uri);
    let ctx = state.chat.clone();
    let config = ServerConfig::clone(&state.config);
    let token = state.shutdown.token();

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let _permit = permit;
            run_ws_session(socket, ctx, RoomName::new(room_name), credentials, config, token).await;
        })
}
