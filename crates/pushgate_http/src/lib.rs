//! # Pushgate HTTP
//!
//! HTTP surface for the pushgate terminal gateway.
//!
//! Terminal-facing routes follow the protocol's fixed paths:
//!
//! - `GET /iclock/cdata`: discovery / capability handshake
//! - `POST /iclock/cdata`: ATTLOG (and other table) uploads
//! - `GET /iclock/getrequest`: command mailbox poll
//! - `POST /iclock/devicecmd`: command acknowledgement
//!
//! The small JSON admin seam (`/api/...`) is what the surrounding
//! back-office UI consumes; it is not part of the terminal protocol.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use pushgate_server::{PushServer, ServerConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use routes::{
    cdata_get, cdata_post, devicecmd, enqueue_command, events_for_badge, getrequest,
    sessions_for_badge,
};

/// Builds the full route table over a shared push server.
pub fn router(server: Arc<PushServer>) -> Router {
    Router::new()
        .route("/iclock/cdata", get(cdata_get).post(cdata_post))
        .route("/iclock/getrequest", get(getrequest))
        .route("/iclock/devicecmd", post(devicecmd))
        .route("/api/events/{badge}", get(events_for_badge))
        .route("/api/sessions/{badge}", get(sessions_for_badge))
        .route("/api/command", post(enqueue_command))
        .with_state(server)
}

/// Binds and serves until SIGINT/SIGTERM.
pub async fn start_server(config: ServerConfig) -> std::io::Result<()> {
    let bind_addr = config.bind_addr;
    let server = Arc::new(PushServer::new(config));
    let app = router(server);

    info!("binding to {bind_addr}");
    let listener = TcpListener::bind(bind_addr).await?;
    info!("pushgate listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router() -> (Router, Arc<PushServer>) {
        let server = Arc::new(PushServer::new(ServerConfig::default()));
        (router(Arc::clone(&server)), server)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn plain_discovery_poll() {
        let (app, _) = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/iclock/cdata?SN=AAML1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK\n");
    }

    #[tokio::test]
    async fn capability_poll_returns_block() {
        let (app, _) = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/iclock/cdata?SN=AAML1&pushver=2.3.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.starts_with("GET OPTION FROM: AAML1\n"));
        assert!(body.contains("PushProtVer="));
    }

    #[tokio::test]
    async fn attlog_upload_roundtrip() {
        let (app, server) = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/iclock/cdata?SN=AAML1&table=ATTLOG")
                    .body(Body::from(
                        "7\t2024-01-10 08:00:00\t0\t1\n7\t2024-01-10 17:00:00\t1\t1\n",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK\n");
        assert_eq!(server.recent_events("7", 10).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mailbox_poll_and_ack() {
        let (app, server) = test_router();
        server.enqueue_command("AAML1", "REBOOT");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/iclock/getrequest?SN=AAML1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "C:1:REBOOT\n");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/iclock/devicecmd?SN=AAML1")
                    .body(Body::from("ID=1&Return=0&CMD=REBOOT"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "OK\n");
        assert_eq!(server.recent_acks().len(), 1);
    }

    #[tokio::test]
    async fn sessions_api() {
        let (app, server) = test_router();
        server
            .handle_cdata_post(
                &pushgate_server::DeviceQuery {
                    serial: Some("AAML1".to_string()),
                    table: Some("ATTLOG".to_string()),
                    ..Default::default()
                },
                "7\t2024-01-10 08:00:00\t0\t1\n7\t2024-01-10 17:00:00\t1\t1\n",
            )
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/sessions/7?date=2024-01-10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        let sessions: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sessions.as_array().unwrap().len(), 1);
        assert_eq!(sessions[0]["state"], "closed");
        assert_eq!(sessions[0]["badge_id"], "7");
    }
}
