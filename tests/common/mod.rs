// tests/common/mod.rs

//! In-process stand-in for the exam backend plus helpers to spawn the console
//! against it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use exam_console::{config::Config, routes, session::SessionStore, state::AppState};
use serde_json::{Value, json};

pub const PASSWORD: &str = "secret";

/// One request seen by the stub backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub session: Option<String>,
}

#[derive(Clone, Default)]
pub struct Backend {
    pub requests: Arc<Mutex<Vec<Recorded>>>,
    pub scores: Arc<Mutex<Vec<Value>>>,
    pub ws_frames: Arc<Mutex<Vec<String>>>,
    pub ws_connects: Arc<AtomicUsize>,
}

impl Backend {
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    pub fn ws_connects(&self) -> usize {
        self.ws_connects.load(Ordering::SeqCst)
    }
}

async fn record(State(backend): State<Backend>, req: Request<Body>, next: Next) -> Response {
    let query = req
        .uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect::<HashMap<_, _>>()
        })
        .unwrap_or_default();
    let session = req
        .headers()
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    backend.requests.lock().unwrap().push(Recorded {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        query,
        session,
    });
    next.run(req).await
}

fn user_json(username: &str) -> Value {
    json!({ "id": 1, "username": username, "email": format!("{}@exam.local", username), "name": "Admin User" })
}

async fn stub_login(Json(body): Json<Value>) -> Json<Value> {
    let username = body["username"].as_str().unwrap_or_default();
    if body["password"] == PASSWORD {
        Json(json!({
            "success": true,
            "message": "Login successful",
            "user": user_json(username),
            "session_id": format!("sess-{}", username),
        }))
    } else {
        Json(json!({ "success": false, "message": "Invalid username or password" }))
    }
}

async fn me(headers: HeaderMap) -> Response {
    let Some(session) = headers.get("x-session-id").and_then(|v| v.to_str().ok()) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response();
    };
    if session == "sess-revoked" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Session expired" }))).into_response();
    }
    if session == "sess-maintenance" {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "maintenance" }))).into_response();
    }
    let username = session.trim_start_matches("sess-");
    Json(json!({
        "user": user_json(username),
        "session_data": {
            "user_id": 1,
            "username": username,
            "roles": [{ "id": 1, "name": "administrator" }, { "id": 3, "name": "scorer" }]
        }
    }))
    .into_response()
}

fn delivery_json(id: i64) -> Value {
    json!({
        "id": id,
        "exam_id": 2,
        "group_id": 3,
        "name": format!("Batch {}", id),
        "scheduled_at": "2024-05-01T08:00:00Z",
        "duration": 90,
        "last_status": "scheduled"
    })
}

async fn list_deliveries(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    Json(json!({
        "data": [delivery_json(1)],
        "total": 31,
        "page": page,
        "per_page": 15,
        "total_pages": 3
    }))
}

async fn get_delivery(Path(id): Path<i64>) -> Response {
    if id == 404 {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "record not found" }))).into_response();
    }
    Json(delivery_json(id)).into_response()
}

async fn control(Json(body): Json<Value>) -> Json<Value> {
    if body["action"] == "stop" {
        Json(json!({ "success": false, "message": "Delivery already finished" }))
    } else {
        Json(json!({ "success": true, "message": "ok" }))
    }
}

fn snapshot_json(participants: usize) -> Value {
    let rows: Vec<Value> = (1..=participants)
        .map(|i| {
            json!({
                "participant": { "id": i, "name": format!("Candidate {}", i), "identifier": format!("R-{}", i) },
                "attempt": {
                    "id": 100 + i,
                    "started_at": "2024-05-01T08:00:00Z",
                    "questions_answered": 3,
                    "total_questions": 8,
                    "status": "in_progress"
                }
            })
        })
        .collect();
    json!({
        "participants": rows,
        "delivery": { "id": 7, "name": "Batch 7", "status": "ongoing" }
    })
}

async fn participant_progress(Path(id): Path<i64>) -> Response {
    if id == 7 {
        Json(snapshot_json(2)).into_response()
    } else if id == 8 {
        tokio::time::sleep(Duration::from_secs(3)).await;
        Json(snapshot_json(2)).into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "progress unavailable" }))).into_response()
    }
}

async fn realtime(
    State(backend): State<Backend>,
    ws: WebSocketUpgrade,
) -> Response {
    backend.ws_connects.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| serve_realtime(socket, backend))
}

async fn serve_realtime(mut socket: WebSocket, backend: Backend) {
    let Some(Ok(Message::Text(auth))) = socket.recv().await else {
        return;
    };
    backend.ws_frames.lock().unwrap().push(auth.to_string());

    let reply = json!({ "type": "auth_response", "success": true, "delivery_id": 7 });
    if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
        return;
    }

    let update = json!({
        "type": "progress_update",
        "delivery_id": 7,
        "data": snapshot_json(1),
        "timestamp": "2024-05-01T08:30:00Z"
    });
    if socket.send(Message::Text(update.to_string().into())).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Close(_) = msg {
            break;
        }
    }
}

async fn attempt_details(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({
        "id": id,
        "delivery": { "id": 7, "name": "Batch 7" },
        "participant": { "id": 1, "name": "Candidate 1", "identifier": "R-1" },
        "status": "completed",
        "questions": [
            { "id": 1, "question_number": "Q1", "question_text": "First", "points": 10 },
            { "id": 2, "question_number": "Q2", "question_text": "Second", "points": 5 },
            { "id": 3, "question_number": "Q3", "question_text": "Third", "type": "essay", "points": 5 },
            { "id": 4, "question_number": "Q4", "question_text": "Fourth", "type": "essay", "points": 5 }
        ]
    }))
}

async fn attempt_answers() -> Json<Value> {
    Json(json!([
        { "question_id": 1, "answer": "A", "is_correct": true },
        { "question_id": 2, "answer": "B", "is_correct": false, "points_earned": 2 },
        { "question_id": 3, "answer": "Essay text", "is_correct": false }
    ]))
}

async fn update_score(State(backend): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    backend.scores.lock().unwrap().push(body);
    Json(json!({ "success": true }))
}

async fn list_groups() -> Json<Value> {
    Json(json!({
        "data": [{ "id": 4, "name": "Cohort A", "code": "CA" }],
        "total": 1,
        "page": 1,
        "per_page": 15,
        "total_pages": 1
    }))
}

fn backend_router(backend: Backend) -> Router {
    Router::new()
        .route("/api/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/auth/login", post(stub_login))
        .route("/api/auth/logout", post(|| async { Json(json!({ "success": true })) }))
        .route("/api/auth/me", get(me))
        .route("/api/my-deliveries", get(|| async { Json(json!([])) }))
        .route("/api/deliveries", get(list_deliveries))
        .route(
            "/api/deliveries/{id}",
            get(get_delivery).delete(|| async { Json(json!({ "success": true })) }),
        )
        .route("/api/deliveries/{id}/control", post(control))
        .route(
            "/api/deliveries/{id}/assignments",
            get(|| async { Json(json!({ "committee": [], "scorers": [] })) }),
        )
        .route("/api/deliveries/{id}/participant-progress", get(participant_progress))
        .route("/api/deliveries/{id}/ws", get(realtime))
        .route("/api/attempts/{id}/details", get(attempt_details))
        .route("/api/attempts/{id}/answers", get(attempt_answers))
        .route("/api/attempts/{id}/score", put(update_score))
        .route("/api/groups", get(list_groups))
        .layer(middleware::from_fn_with_state(backend.clone(), record))
        .with_state(backend)
}

/// Starts the stub backend; returns its state and port.
pub async fn spawn_backend() -> (Backend, u16) {
    let backend = Backend::default();
    let app = backend_router(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (backend, port)
}

pub struct TestApp {
    pub address: String,
    pub backend: Backend,
}

/// Spawns the stub backend and the console in front of it.
/// The realtime service lives on the same port as the REST backend.
pub async fn spawn_app() -> TestApp {
    let (backend, backend_port) = spawn_backend().await;

    let mut config = Config::for_backend(&format!("http://127.0.0.1:{}", backend_port));
    config.realtime_port = backend_port;
    config.reconnect_delay = Duration::from_millis(200);
    config.rust_log = "error".to_string();

    let state = AppState::new(config, SessionStore::in_memory()).expect("Failed to build state");
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, backend }
}

/// Client that keeps cookies and does not follow redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Logs in as `admin` and returns the session id.
pub async fn login(app: &TestApp, client: &reqwest::Client) -> String {
    login_as(app, client, "admin").await
}

pub async fn login_as(app: &TestApp, client: &reqwest::Client, username: &str) -> String {
    let body: Value = client
        .post(format!("{}/login", app.address))
        .json(&json!({ "username": username, "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    body["session_id"].as_str().unwrap().to_string()
}
