//! IPC server: axum HTTP router over a Unix domain socket.
//!
//! The daemon binds a Unix socket and exposes a JSON API for the CLI to
//! query status, request shutdown, read the live configuration and commit
//! new reply settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use keyreply_config::{AppConfig, ReplyConfig};

use super::types::*;
use crate::daemon::{Daemon, DaemonError};

/// Shared state accessible to all IPC route handlers.
pub struct IpcState {
    pub daemon: Arc<Daemon>,
}

impl IpcState {
    pub fn new(daemon: Arc<Daemon>) -> Arc<Self> {
        Arc::new(Self { daemon })
    }
}

/// Default Unix socket path for daemon IPC.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/keyreply.sock";

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Build the axum router with all IPC routes.
pub fn router(state: Arc<IpcState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/stop", post(handle_stop))
        .route("/config", get(handle_config))
        .route("/config/reply", put(handle_commit_reply))
        .with_state(state)
}

/// Start the IPC server on the given Unix socket path.
///
/// Removes any stale socket file before binding. Runs until `shutdown` is
/// cancelled.
pub async fn serve(
    socket_path: &Path,
    state: Arc<IpcState>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let listener = UnixListener::bind(socket_path)?;
    info!(path = %socket_path.display(), "IPC server listening");

    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("IPC server shutting down");
        })
        .await?;

    std::fs::remove_file(socket_path).ok();
    Ok(())
}

/// Resolve the socket path from config or use the default.
pub fn socket_path_from_config(config: &AppConfig) -> PathBuf {
    config
        .daemon
        .socket_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::build_info::VERSION.to_string(),
        git_hash: crate::build_info::GIT_HASH.to_string(),
        build_profile: crate::build_info::BUILD_PROFILE.to_string(),
    })
}

async fn handle_status(State(state): State<Arc<IpcState>>) -> Json<StatusResponse> {
    let daemon = &state.daemon;
    let snapshot = daemon.engine().snapshot();
    let throttle = daemon.engine().throttle_state();

    Json(StatusResponse {
        running: !daemon.is_shutting_down(),
        version: crate::build_info::VERSION.to_string(),
        git_hash: crate::build_info::GIT_HASH.to_string(),
        uptime_secs: daemon.uptime().as_secs(),
        pid: std::process::id(),
        config_version: snapshot.version,
        target: snapshot.policy.target.to_string(),
        interval: snapshot.policy.interval,
        tomorrow_reset: snapshot.policy.tomorrow_reset,
        contacts: snapshot.index.contact_count(),
        keywords: snapshot.index.keyword_count(),
        reply_count: throttle.reply_count,
        last_event_time: throttle.last_event_time.to_rfc3339(),
        subscribers: daemon.engine().sink().subscriber_count(),
    })
}

async fn handle_stop(State(state): State<Arc<IpcState>>) -> (StatusCode, Json<StopResponse>) {
    info!("Stop requested via IPC");
    state.daemon.shutdown();
    (
        StatusCode::OK,
        Json(StopResponse {
            acknowledged: true,
            message: "Shutdown initiated".to_string(),
        }),
    )
}

async fn handle_config(State(state): State<Arc<IpcState>>) -> Result<Json<ConfigResponse>, ApiError> {
    match state.daemon.current_config().to_toml() {
        Ok(toml) => Ok(Json(ConfigResponse { toml })),
        Err(e) => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serialize config: {e}"),
        )),
    }
}

async fn handle_commit_reply(
    State(state): State<Arc<IpcState>>,
    Json(reply): Json<ReplyConfig>,
) -> Result<Json<CommitResponse>, ApiError> {
    match state.daemon.apply(reply).await {
        Ok(version) => {
            let snapshot = state.daemon.engine().snapshot();
            Ok(Json(CommitResponse {
                version,
                contacts: snapshot.index.contact_count(),
                keywords: snapshot.index.keyword_count(),
            }))
        }
        Err(e @ DaemonError::Commit(_)) => {
            warn!(error = %e, "Reply settings rejected via IPC");
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
        Err(e @ DaemonError::ShuttingDown) => {
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

fn api_error(status: StatusCode, error: String) -> ApiError {
    (status, Json(ErrorResponse { error }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::RecordingMessenger;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> (Arc<IpcState>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let daemon = Daemon::new(
            AppConfig::default(),
            Arc::new(RecordingMessenger::default()),
            store.clone(),
        )
        .unwrap();
        (IpcState::new(Arc::new(daemon)), store)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn put_reply(body: String) -> Request<Body> {
        Request::put("/config/reply")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _) = test_state();
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let health: HealthResponse = body_json(resp).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, crate::build_info::VERSION);
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (state, _) = test_state();
        let req = Request::get("/status").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let status: StatusResponse = body_json(resp).await;
        assert!(status.running);
        assert_eq!(status.config_version, 1);
        assert_eq!(status.target, "group");
        assert_eq!(status.interval, 1);
        assert_eq!(status.reply_count, 0);
    }

    #[tokio::test]
    async fn test_stop_endpoint() {
        let (state, _) = test_state();
        let daemon = Arc::clone(&state.daemon);

        let req = Request::post("/stop").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let stop: StopResponse = body_json(resp).await;
        assert!(stop.acknowledged);
        assert!(daemon.is_shutting_down());
    }

    #[tokio::test]
    async fn test_config_endpoint() {
        let (state, _) = test_state();
        let req = Request::get("/config").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let config: ConfigResponse = body_json(resp).await;
        assert!(config.toml.contains("[reply]"));
        assert!(config.toml.contains("reply_count"));
    }

    #[tokio::test]
    async fn test_commit_reply_endpoint() {
        let (state, store) = test_state();
        let daemon = Arc::clone(&state.daemon);
        let body = serde_json::json!({
            "contacts": ["alice", "bob", "alice"],
            "keywords": ["ping"],
            "interval": 3,
            "target": "all",
            "text": "back later"
        });

        let resp = router(state)
            .oneshot(put_reply(body.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let commit: CommitResponse = body_json(resp).await;
        assert_eq!(commit.version, 2);
        assert_eq!(commit.contacts, 2);
        assert_eq!(commit.keywords, 1);
        assert_eq!(daemon.engine().snapshot().policy.interval, 3);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_reply_rejects_negative_interval() {
        let (state, store) = test_state();
        let daemon = Arc::clone(&state.daemon);
        let body = serde_json::json!({ "interval": -1 });

        let resp = router(state)
            .oneshot(put_reply(body.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let error: ErrorResponse = body_json(resp).await;
        assert!(error.error.contains("reply.interval"));
        assert_eq!(daemon.engine().snapshot().version, 1);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_reply_after_stop_is_unavailable() {
        let (state, _) = test_state();
        state.daemon.shutdown();

        let resp = router(state)
            .oneshot(put_reply("{}".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_socket_path_from_config() {
        let mut config = AppConfig::default();
        assert_eq!(
            socket_path_from_config(&config),
            PathBuf::from(DEFAULT_SOCKET_PATH)
        );
        config.daemon.socket_path = Some("/run/keyreply/ctl.sock".to_string());
        assert_eq!(
            socket_path_from_config(&config),
            PathBuf::from("/run/keyreply/ctl.sock")
        );
    }
}
