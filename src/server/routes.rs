//! HTTP routes
//!
//! | Method | Path                   | Purpose                                   |
//! |--------|------------------------|-------------------------------------------|
//! | GET    | `/ws/{group}`          | WebSocket upgrade, joins `group`          |
//! | POST   | `/api/patients`        | Inject a [`Patient`] into `patients`      |
//! | POST   | `/api/cases`           | Inject a [`MedicalCase`] into `cases`     |
//! | POST   | `/api/groups/{group}`  | Inject any JSON value into `group`        |
//! | GET    | `/api/stats`           | Hub counters                              |

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::websocket;
use crate::error::{ConnectError, DecodeError};
use crate::hub::BroadcastHub;
use crate::payload::{MedicalCase, Patient, CASES_GROUP, PATIENTS_GROUP};
use crate::registry::GroupName;
use crate::stats::StatsSnapshot;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    hub: Arc<BroadcastHub>,
    connection_semaphore: Option<Arc<Semaphore>>,
    max_connections: usize,
}

impl AppState {
    /// Create handler state. `max_connections == 0` means unlimited.
    pub fn new(hub: Arc<BroadcastHub>, max_connections: usize) -> Self {
        let connection_semaphore = if max_connections > 0 {
            Some(Arc::new(Semaphore::new(max_connections)))
        } else {
            None
        };

        Self {
            hub,
            connection_semaphore,
            max_connections,
        }
    }

    /// Get the hub
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Reserve a connection slot, if the server is limited
    fn admit(&self) -> Result<Option<OwnedSemaphorePermit>, ConnectError> {
        match self.connection_semaphore {
            Some(ref sem) => sem
                .clone()
                .try_acquire_owned()
                .map(Some)
                .map_err(|_| ConnectError::LimitReached(self.max_connections)),
            None => Ok(None),
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws/{group}", get(upgrade))
        .route("/api/patients", post(inject_patient))
        .route("/api/cases", post(inject_case))
        .route("/api/groups/{group}", post(inject_any))
        .route("/api/stats", get(stats))
        .with_state(state)
}

/// Body returned by a successful inject
#[derive(Debug, Serialize, Deserialize)]
pub struct InjectResponse {
    pub status: String,
    pub recipients: usize,
}

/// Body returned for rejected requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ConnectError {
    fn into_response(self) -> Response {
        let status = match self {
            ConnectError::LimitReached(_) => StatusCode::SERVICE_UNAVAILABLE,
            ConnectError::InvalidGroup(_) => StatusCode::BAD_REQUEST,
            ConnectError::UpgradeFailed(_) => StatusCode::BAD_REQUEST,
        };
        error_response(status, self)
    }
}

impl IntoResponse for DecodeError {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_REQUEST, self)
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Path(group): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ConnectError> {
    let group = GroupName::new(&group)?;
    let permit = state.admit().inspect_err(|e| {
        tracing::warn!(group = %group, error = %e, "Connection rejected");
    })?;

    let hub = Arc::clone(&state.hub);
    let response = ws
        .on_failed_upgrade(|e: axum::Error| {
            let err = ConnectError::UpgradeFailed(e.to_string());
            tracing::warn!(error = %err, "WebSocket handshake failed");
        })
        .on_upgrade(move |socket| async move {
            let _permit = permit;
            websocket::serve_socket(hub, group, socket).await;
        });

    Ok(response)
}

async fn inject_patient(State(state): State<AppState>, body: Bytes) -> Response {
    inject_typed::<Patient>(&state, PATIENTS_GROUP, body).await
}

async fn inject_case(State(state): State<AppState>, body: Bytes) -> Response {
    inject_typed::<MedicalCase>(&state, CASES_GROUP, body).await
}

async fn inject_any(
    Path(group): Path<String>,
    State(state): State<AppState>,
    body: Bytes,
) -> Response {
    inject_typed::<serde_json::Value>(&state, &group, body).await
}

async fn inject_typed<T>(state: &AppState, group: &str, body: Bytes) -> Response
where
    T: DeserializeOwned + Serialize,
{
    let group = match GroupName::new(group) {
        Ok(group) => group,
        Err(e) => return e.into_response(),
    };

    match state.hub.inject_json::<T>(&group, &body).await {
        Ok(report) => {
            tracing::info!(
                group = %group,
                recipients = report.delivered,
                "Injected message"
            );
            let body = InjectResponse {
                status: "sent".to_string(),
                recipients: report.delivered,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.hub.stats())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn app() -> (Router, Arc<BroadcastHub>) {
        let hub = Arc::new(BroadcastHub::new());
        (router(AppState::new(Arc::clone(&hub), 0)), hub)
    }

    fn post_json(uri: &str, body: &'static str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body<T: DeserializeOwned>(response: Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_inject_case_reaches_members() {
        let (app, hub) = app();
        let cases = GroupName::new(CASES_GROUP).unwrap();
        let (conn, mut link) = hub.connection();
        hub.registry().join(&cases, conn.handle().clone());

        let response = app
            .oneshot(post_json(
                "/api/cases",
                r#"{"id_expediente":1,"id_usuario":7,"temperatura":38.2,"peso":70.5,
                    "estatura":1.72,"ritmo_cardiaco":88,"fecha_registro":"2024-03-01T10:00:00Z"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: InjectResponse = json_body(response).await;
        assert_eq!(body.status, "sent");
        assert_eq!(body.recipients, 1);

        let delivered = link.try_next_outbound().unwrap();
        let case: MedicalCase = serde_json::from_slice(&delivered).unwrap();
        assert_eq!(case.id_expediente, 1);
        assert_eq!(case.temperatura, 38.2);
    }

    #[tokio::test]
    async fn test_inject_patient_without_members() {
        let (app, _hub) = app();

        let response = app
            .oneshot(post_json(
                "/api/patients",
                r#"{"id_usuario":7,"nombre":"Ana","apellido":"Lopez","edad":34,
                    "genero":"F","numero_contacto":"555-0101"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: InjectResponse = json_body(response).await;
        assert_eq!(body.recipients, 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let (app, hub) = app();
        let patients = GroupName::new(PATIENTS_GROUP).unwrap();
        let (conn, mut link) = hub.connection();
        hub.registry().join(&patients, conn.handle().clone());

        let response = app
            .oneshot(post_json("/api/patients", r#"{"id_usuario":"seven"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = json_body(response).await;
        assert!(body.error.contains("patients"));
        assert_eq!(link.try_next_outbound(), None);
        assert_eq!(hub.stats().messages_injected, 0);
    }

    #[tokio::test]
    async fn test_inject_any_group() {
        let (app, hub) = app();
        let alerts = GroupName::new("alerts").unwrap();
        let (conn, mut link) = hub.connection();
        hub.registry().join(&alerts, conn.handle().clone());

        let response = app
            .oneshot(post_json("/api/groups/alerts", r#"{"level": "high"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            link.try_next_outbound(),
            Some(Bytes::from_static(br#"{"level":"high"}"#))
        );
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (app, hub) = app();
        hub.inject(
            &GroupName::new("alerts").unwrap(),
            Bytes::from_static(b"{}"),
        )
        .await;

        let response = app
            .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(response).await;
        assert_eq!(body["messages_injected"], 1);
        assert_eq!(body["active_connections"], 0);
    }

    #[tokio::test]
    async fn test_plain_get_on_ws_route_is_rejected() {
        let (app, hub) = app();

        let response = app
            .oneshot(Request::get("/ws/cases").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(hub.stats().total_connections, 0);
    }

    #[test]
    fn test_admit_respects_limit() {
        let state = AppState::new(Arc::new(BroadcastHub::new()), 1);

        let first = state.admit().unwrap();
        assert!(first.is_some());
        assert_eq!(state.admit().unwrap_err(), ConnectError::LimitReached(1));

        drop(first);
        assert!(state.admit().is_ok());
    }

    #[test]
    fn test_unlimited_admit() {
        let state = AppState::new(Arc::new(BroadcastHub::new()), 0);
        assert!(state.admit().unwrap().is_none());
    }
}
