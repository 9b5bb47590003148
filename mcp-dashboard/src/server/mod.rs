//! HTTP front end: the metrics query, a health probe, and the live feed.

pub mod viewer;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use mcp_dashboard_core::config::ViewerConfig;
use mcp_dashboard_core::ingest::Pipeline;
use mcp_dashboard_core::MetricsReport;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub viewer: Arc<ViewerConfig>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, viewer: ViewerConfig) -> Self {
        Self {
            pipeline,
            viewer: Arc::new(viewer),
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    viewers: usize,
}

/// Build the router with all dashboard routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/metrics", get(metrics))
        .route("/api/health", get(health))
        .route("/ws", get(viewer::ws_handler))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// GET /api/metrics
async fn metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    Json(state.pipeline.store().report())
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        viewers: state.pipeline.hub().session_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use mcp_dashboard_core::{Event, EventKind};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_flattens_snapshot_and_adds_summary() {
        let pipeline = Pipeline::default();
        let mut event = Event::empty(EventKind::ToolCall);
        event.server = "github".to_string();
        event.tool = "create_issue".to_string();
        event.status = "SUCCESS".to_string();
        event.branch = "main".to_string();
        pipeline.dispatch(&event).unwrap();

        let app = router(AppState::new(pipeline, ViewerConfig::default()));
        let (status, body) = get_json(app, "/api/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["toolCalls"]["create_issue"], 1);
        assert_eq!(body["successRates"]["github:create_issue"], 0.5);
        assert_eq!(body["branchActivity"]["main"], 1);
        assert_eq!(body["activityTimeline"][0]["toolCalls"], 1);
        assert_eq!(body["summary"]["totalToolCalls"], 1);
        assert_eq!(body["summary"]["mostUsedTool"], "create_issue");
        assert_eq!(body["summary"]["recentActivity"], "low");
    }

    #[tokio::test]
    async fn test_metrics_on_empty_store() {
        let app = router(AppState::new(Pipeline::default(), ViewerConfig::default()));
        let (status, body) = get_json(app, "/api/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["totalToolCalls"], 0);
        assert_eq!(body["summary"]["errorRate"], 0.0);
        assert!(body["summary"].get("mostUsedTool").is_none());
        assert_eq!(body["activityTimeline"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_health_counts_viewers() {
        let pipeline = Pipeline::default();
        let _viewer = pipeline.hub().register();

        let app = router(AppState::new(pipeline, ViewerConfig::default()));
        let (status, body) = get_json(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok", "viewers": 1}));
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let app = router(AppState::new(Pipeline::default(), ViewerConfig::default()));
        let response = app
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    // ============================================
    // Live feed over a real socket
    // ============================================

    async fn wait_for_viewers(pipeline: &Pipeline, expected: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while pipeline.hub().session_count() != expected {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {expected} viewers, have {}",
                pipeline.hub().session_count()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_viewer_receives_events_and_unregisters_on_close() {
        let pipeline = Pipeline::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::new(pipeline.clone(), ViewerConfig::default());
        tokio::spawn(serve(listener, state, std::future::pending()));

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();
        wait_for_viewers(&pipeline, 1).await;

        let mut event = Event::empty(EventKind::ToolCall);
        event.tool = "create_issue".to_string();
        assert_eq!(pipeline.dispatch(&event).unwrap(), 1);

        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let received: Event = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(received, event);

        // Nothing else is queued for this viewer
        let extra = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
        assert!(extra.is_err(), "unexpected frame: {extra:?}");

        socket.close(None).await.unwrap();
        wait_for_viewers(&pipeline, 0).await;
        assert_eq!(pipeline.dispatch(&event).unwrap(), 0);
    }
}
