//! # Mock Coordinator
//!
//! In-process stand-in for the federated learning coordinator, served by axum
//! on an ephemeral port. Responses are scripted per test and every request is
//! recorded so tests can assert on what the worker actually sent.

#![allow(dead_code)]

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use dcf_worker::constants::{keys, routes, INVALID_WORKER};
use dcf_worker::{envelope, verify_signed_phrase, WorkerClient, WorkerConfig};

/// Mutable coordinator state shared with request handlers
#[derive(Debug, Default)]
pub struct CoordinatorState {
    /// Public keys allowed to register; `None` disables authentication
    pub authorized_keys: Option<Vec<String>>,
    /// Statuses served in order; the last one repeats once the queue drains
    pub statuses: VecDeque<String>,
    pub last_status: String,
    /// Answer 500 instead of repeating once the status queue is empty
    pub fail_when_statuses_exhausted: bool,
    /// Decompressed global model served to workers
    pub global_model: Vec<u8>,
    pub next_worker_id: u64,

    pub registration_requests: Vec<Value>,
    pub status_requests: Vec<Value>,
    pub model_requests: Vec<Value>,
    pub received_updates: Vec<Vec<u8>>,
}

#[derive(Clone)]
pub struct MockCoordinator {
    pub state: Arc<Mutex<CoordinatorState>>,
    pub addr: SocketAddr,
    server: Arc<JoinHandle<()>>,
}

impl MockCoordinator {
    /// Start a coordinator without authentication serving status `initial`
    pub async fn start() -> Self {
        Self::start_with(CoordinatorState {
            last_status: "initial".to_string(),
            next_worker_id: 1,
            ..Default::default()
        })
        .await
    }

    pub async fn start_with(state: CoordinatorState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route(&format!("/{}", routes::REGISTER_WORKER), post(register_worker))
            .route(
                &format!("/{}", routes::QUERY_GLOBAL_MODEL_STATUS),
                post(query_status),
            )
            .route(
                &format!("/{}", routes::RETURN_GLOBAL_MODEL),
                post(return_global_model),
            )
            .route(
                &format!("/{}", routes::RECEIVE_WORKER_UPDATE),
                post(receive_worker_update),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock coordinator");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock coordinator failed");
        });

        Self {
            state,
            addr,
            server: Arc::new(server),
        }
    }

    /// Worker configuration pointing at this coordinator
    pub fn worker_config(&self) -> WorkerConfig {
        let mut config = WorkerConfig::default();
        config.server.host = self.addr.ip().to_string();
        config.server.port = self.addr.port();
        config
    }

    /// Worker client with a short polling period
    pub fn worker(&self) -> WorkerClient {
        self.worker_with(self.worker_config())
    }

    pub fn worker_with(&self, config: WorkerConfig) -> WorkerClient {
        WorkerClient::new(&config)
            .expect("Failed to create worker client")
            .with_polling_wait_period(Duration::from_millis(10))
    }

    pub fn script_statuses(&self, statuses: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.statuses = statuses.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_global_model(&self, model: &[u8]) {
        self.state.lock().unwrap().global_model = model.to_vec();
    }

    pub fn registration_count(&self) -> usize {
        self.state.lock().unwrap().registration_requests.len()
    }

    pub fn status_request_count(&self) -> usize {
        self.state.lock().unwrap().status_requests.len()
    }
}

impl Drop for MockCoordinator {
    fn drop(&mut self) {
        if Arc::strong_count(&self.server) == 1 {
            self.server.abort();
        }
    }
}

type SharedState = Arc<Mutex<CoordinatorState>>;

async fn register_worker(State(state): State<SharedState>, Json(body): Json<Value>) -> String {
    let mut state = state.lock().unwrap();
    state.registration_requests.push(body.clone());

    if let Some(authorized) = &state.authorized_keys {
        let public_key = body[keys::PUBLIC_KEY_STR].as_str().unwrap_or_default();
        let signed_phrase = body[keys::SIGNED_PHRASE].as_str().unwrap_or_default();
        let known = authorized.iter().any(|k| k.trim() == public_key.trim());
        if !known || !verify_signed_phrase(public_key, signed_phrase) {
            return INVALID_WORKER.to_string();
        }
    }

    let worker_id = state.next_worker_id;
    state.next_worker_id += 1;
    worker_id.to_string()
}

async fn query_status(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.status_requests.push(body);

    match state.statuses.pop_front() {
        Some(status) => {
            state.last_status = status.clone();
            status.into_response()
        }
        None if state.fail_when_statuses_exhausted => {
            (StatusCode::INTERNAL_SERVER_ERROR, "coordinator shutting down").into_response()
        }
        None => state.last_status.clone().into_response(),
    }
}

async fn return_global_model(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.model_requests.push(body);
    match envelope::compress(&state.global_model) {
        Ok(compressed) => compressed.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn receive_worker_update(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some(keys::ID_AND_MODEL) {
            continue;
        }
        match field.bytes().await {
            Ok(data) => {
                state.lock().unwrap().received_updates.push(data.to_vec());
            }
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    }
    b"update received".to_vec().into_response()
}
