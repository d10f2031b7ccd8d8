//! In-process mock of the fitting backend, built on axum.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Request, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use fitting_client::services::poller::PollOptions;
use fitting_client::session::{LoginRedirect, MemorySessionStore, Session};
use fitting_client::{ApiClient, ClientConfig};

use crate::fixtures::{self, VALID_TOKEN};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    pub requests: Mutex<Vec<RecordedRequest>>,
    pub status_script: Mutex<VecDeque<Value>>,
    pub started_bodies: Mutex<Vec<Value>>,
    pub latest_history: Mutex<Option<Value>>,
}

impl MockState {
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last(&self) -> Option<RecordedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn script_statuses(&self, statuses: &[&str]) {
        *self.status_script.lock().unwrap() = statuses.iter().map(|s| fixtures::job_status(s)).collect();
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

/// Counts login redirects.
#[derive(Clone, Default)]
pub struct RedirectCounter(pub Arc<AtomicUsize>);

impl RedirectCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for RedirectCounter {
    fn redirect_to_login(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {VALID_TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(fixtures::err("UNAUTHORIZED", "token expired")),
    )
        .into_response()
}

async fn record(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization,
    });
    next.run(request).await
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret" {
        Json(fixtures::ok(json!({ "token": VALID_TOKEN, "user": fixtures::user() }))).into_response()
    } else {
        (StatusCode::BAD_REQUEST, Json(fixtures::err("INVALID_CREDENTIALS", "wrong password"))).into_response()
    }
}

async fn logout() -> Json<Value> {
    Json(fixtures::ok(Value::Null))
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(fixtures::ok(json!({ "user": fixtures::user() }))).into_response()
}

async fn closet(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(fixtures::ok(fixtures::closet_items())).into_response()
}

async fn delete_closet_item(Path(item_id): Path<i64>) -> Json<Value> {
    Json(fixtures::ok(json!({ "message": format!("deleted {item_id}"), "deletedAt": "2025-03-02T10:00:00Z" })))
}

async fn start_fitting(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.started_bodies.lock().unwrap().push(body);
    Json(fixtures::ok(json!({ "jobId": 77, "message": "queued" }))).into_response()
}

async fn fitting_status(State(state): State<Arc<MockState>>, Path(_job_id): Path<i64>) -> Json<Value> {
    let mut script = state.status_script.lock().unwrap();
    let next = if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    };
    Json(fixtures::ok(next.unwrap_or_else(|| fixtures::job_status("processing"))))
}

async fn fitting_history(State(state): State<Arc<MockState>>) -> Json<Value> {
    let history = state
        .latest_history
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| json!({ "fittings": [] }));
    Json(fixtures::ok(history))
}

async fn outfit_detail(Path(outfit_id): Path<i64>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(fixtures::err("OUTFIT_NOT_FOUND", &format!("outfit {outfit_id} does not exist"))),
    )
        .into_response()
}

async fn upload_photo(mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("photo") {
            return Json(fixtures::ok(json!({ "photoUrl": "/uploads/profile/1.png" }))).into_response();
        }
    }
    (StatusCode::BAD_REQUEST, Json(fixtures::err("NO_PHOTO", "photo field missing"))).into_response()
}

/// Start the mock backend on an ephemeral port.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::default());

    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/closet", get(closet))
        .route("/api/closet/items/{item_id}", delete(delete_closet_item))
        .route("/api/virtual-fitting", post(start_fitting).get(fitting_history))
        .route("/api/virtual-fitting/{job_id}", get(fitting_status))
        .route("/api/outfits/{outfit_id}", get(outfit_detail))
        .route("/api/users/profile-photo", post(upload_photo))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("Mock backend has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend crashed");
    });

    MockBackend {
        base_url: format!("http://{addr}"),
        state,
    }
}

pub fn config_for(backend: &MockBackend) -> ClientConfig {
    ClientConfig {
        api_base_url: backend.base_url.clone(),
        poll_interval_ms: 10,
        request_timeout_secs: 5,
        ..Default::default()
    }
}

pub fn fast_poll(max_attempts: u32) -> PollOptions {
    PollOptions {
        interval: Duration::from_millis(10),
        max_attempts,
        ..Default::default()
    }
}

/// Client with a session holding `token` and a redirect counter.
pub fn client_with_token(backend: &MockBackend, token: Option<&str>) -> (ApiClient, RedirectCounter) {
    let redirects = RedirectCounter::default();
    let session = Session::load(MemorySessionStore::default(), redirects.clone());
    if let Some(token) = token {
        session.set_token(token);
    }
    let client = ApiClient::new(&config_for(backend), session).expect("Failed to build client");
    (client, redirects)
}
