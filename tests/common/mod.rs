// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use exam_portal::{
    client::ApiClient,
    config::{Config, parse_base_url},
    routes,
    state::AppState,
    utils::session::decode_claims,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

pub const LEARNER_ID: &str = "learner-1";
pub const OTHER_LEARNER_ID: &str = "learner-2";
pub const ADMIN_ID: &str = "admin-1";

/// How the fake backend wraps `my-attempts`.
#[derive(Debug, Clone, Copy)]
pub enum ListShape {
    Bare,
    ExamAttempts,
    Data,
    Attempts,
    Unrecognized,
}

pub struct BackendState {
    pub exams: HashMap<String, Value>,
    /// exam id -> (question id, correct options)
    pub answer_keys: HashMap<String, Vec<(String, Vec<String>)>>,
    pub attempts: Vec<Value>,
    pub list_shape: ListShape,
    /// Answer `result/{id}` with 403 until the result is shown, instead of
    /// a redacted attempt.
    pub withhold_hidden_results: bool,
}

#[derive(Clone)]
struct Fake {
    backend: Arc<Mutex<BackendState>>,
    cdn_hits: Arc<AtomicUsize>,
}

pub struct TestBackend {
    pub address: String,
    pub state: Arc<Mutex<BackendState>>,
    pub cdn_hits: Arc<AtomicUsize>,
}

impl TestBackend {
    pub fn api_url(&self) -> String {
        format!("{}/api/", self.address)
    }

    pub fn cdn_url(&self) -> String {
        format!("{}/cdn/", self.address)
    }

    pub fn api(&self) -> ApiClient {
        let base = parse_base_url("API_BASE_URL", &self.api_url()).unwrap();
        ApiClient::new(base, Duration::from_secs(5)).unwrap()
    }

    pub fn set_list_shape(&self, shape: ListShape) {
        self.state.lock().unwrap().list_shape = shape;
    }

    pub fn withhold_hidden_results(&self) {
        self.state.lock().unwrap().withhold_hidden_results = true;
    }

    pub fn attempt(&self, id: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .find(|a| a["_id"] == id)
            .cloned()
    }

    pub fn patch_attempt(&self, id: &str, patch: impl FnOnce(&mut Value)) {
        let mut state = self.state.lock().unwrap();
        let attempt = state
            .attempts
            .iter_mut()
            .find(|a| a["_id"] == id)
            .expect("attempt exists");
        patch(attempt);
    }
}

pub fn token(role: &str, user_id: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({"id": user_id, "role": role, "exp": exp}),
        &EncodingKey::from_secret(b"backend-signing-secret"),
    )
    .unwrap()
}

fn in_an_hour() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

pub fn learner_token() -> String {
    token("user", LEARNER_ID, in_an_hour())
}

pub fn other_learner_token() -> String {
    token("user", OTHER_LEARNER_ID, in_an_hour())
}

pub fn admin_token() -> String {
    token("admin", ADMIN_ID, in_an_hour())
}

pub fn expired_token() -> String {
    token("admin", ADMIN_ID, chrono::Utc::now().timestamp() - 60)
}

fn seed() -> BackendState {
    let exams = [
        json!({"_id": "E1", "title": "Cloud Fundamentals", "timeLimit": 60, "resultMethod": "manual",
               "questionPaperSetId": "P1", "courseId": "C1", "isActive": true,
               "questions": [
                   {"_id": "q1", "question": "Question q1", "options": ["A", "B", "C", "D"], "type": "single"},
                   {"_id": "q2", "question": "Question q2", "options": ["A", "B", "C", "D"], "type": "multiple"},
                   {"_id": "q3", "question": "Question q3", "options": ["A", "B", "C", "D"], "type": "single"}
               ]}),
        json!({"_id": "E2", "title": "Security Basics", "timeLimit": 30, "resultMethod": "automatic",
               "questionPaperSetId": "P2", "courseId": "C1", "isActive": true, "questions": []}),
        json!({"_id": "E3", "title": "Retired Exam", "resultMethod": "manual", "isActive": false}),
    ];

    let key = vec![
        ("q1".to_string(), vec!["A".to_string()]),
        ("q2".to_string(), vec!["B".to_string(), "C".to_string()]),
        ("q3".to_string(), vec!["D".to_string()]),
    ];

    BackendState {
        exams: exams
            .into_iter()
            .map(|exam| (exam["_id"].as_str().unwrap().to_string(), exam))
            .collect(),
        answer_keys: [("E1".to_string(), key.clone()), ("E2".to_string(), key)]
            .into_iter()
            .collect(),
        attempts: Vec::new(),
        list_shape: ListShape::ExamAttempts,
        withhold_hidden_results: false,
    }
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"status": "fail", "message": message}))).into_response()
}

fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// (user id, is staff)
fn caller(headers: &HeaderMap) -> Result<(String, bool), Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized, no token"))?;
    let claims = decode_claims(token)
        .map_err(|_| fail(StatusCode::UNAUTHORIZED, "Not authorized, token failed"))?;
    Ok((claims.user_id.unwrap_or_default(), claims.role.is_staff()))
}

fn staff(headers: &HeaderMap) -> Result<(), Response> {
    match caller(headers)? {
        (_, true) => Ok(()),
        (_, false) => Err(fail(StatusCode::FORBIDDEN, "Admin access required")),
    }
}

async fn start(State(fake): State<Fake>, headers: HeaderMap, Path(exam_id): Path<String>) -> Response {
    let (user_id, _) = match caller(&headers) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let mut state = fake.backend.lock().unwrap();
    let Some(exam) = state.exams.get(&exam_id).cloned() else {
        return fail(StatusCode::NOT_FOUND, "Exam not found");
    };

    let attempt = json!({
        "_id": uuid::Uuid::new_v4().simple().to_string(),
        "userId": user_id,
        "examId": exam_id,
        "courseId": "C1",
        "questionPaperSetId": exam["questionPaperSetId"],
        "isCompleted": false,
        "isResultShown": false,
        "resultMethod": exam["resultMethod"],
        "answers": [],
        "startTime": chrono::Utc::now().to_rfc3339(),
        "isActive": true,
        "isDeleted": false
    });
    state.attempts.push(attempt.clone());
    ok(json!({"status": "success", "examAttempt": attempt, "exam": exam}))
}

fn owned_index(state: &BackendState, id: &str, user_id: &str) -> Result<usize, Response> {
    let index = state
        .attempts
        .iter()
        .position(|a| a["_id"] == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Exam attempt not found"))?;
    if state.attempts[index]["userId"] != user_id {
        return Err(fail(StatusCode::FORBIDDEN, "Not your attempt"));
    }
    Ok(index)
}

async fn save_progress(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let (user_id, _) = match caller(&headers) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let mut state = fake.backend.lock().unwrap();
    let index = match owned_index(&state, &id, &user_id) {
        Ok(i) => i,
        Err(r) => return r,
    };
    let attempt = &mut state.attempts[index];
    if attempt["isCompleted"] == true {
        return fail(StatusCode::BAD_REQUEST, "Exam attempt already submitted");
    }
    attempt["answers"] = body["answers"].clone();
    ok(json!({"status": "success", "examAttempt": attempt.clone()}))
}

fn selections(answer: &Value) -> Vec<String> {
    answer["selectedOptions"]
        .as_array()
        .map(|opts| opts.iter().filter_map(|o| o.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

async fn submit(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let (user_id, _) = match caller(&headers) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let mut state = fake.backend.lock().unwrap();
    let index = match owned_index(&state, &id, &user_id) {
        Ok(i) => i,
        Err(r) => return r,
    };
    if state.attempts[index]["isCompleted"] == true {
        return fail(StatusCode::BAD_REQUEST, "Exam attempt already submitted");
    }

    let exam_id = state.attempts[index]["examId"].as_str().unwrap_or_default().to_string();
    let key = state.answer_keys.get(&exam_id).cloned().unwrap_or_default();
    let submitted = body["answers"].as_array().cloned().unwrap_or_default();

    let mut graded = Vec::new();
    let mut correct = 0u32;
    for (question_id, expected) in &key {
        let selected = submitted
            .iter()
            .find(|a| a["questionId"] == question_id.as_str())
            .map(selections)
            .unwrap_or_default();
        if selected.is_empty() {
            continue;
        }
        let (mut s, mut e) = (selected.clone(), expected.clone());
        s.sort();
        e.sort();
        let is_correct = s == e;
        if is_correct {
            correct += 1;
        }
        graded.push(json!({
            "questionId": question_id,
            "question": format!("Question {}", question_id),
            "selectedOptions": selected,
            "correctAnswers": expected,
            "isCorrect": is_correct,
            "answerDescription": "<p>See chapter 2</p><script>steal()</script>"
        }));
    }

    let total = key.len() as u32;
    let percentage = if total == 0 {
        0.0
    } else {
        f64::from(correct) * 100.0 / f64::from(total)
    };

    let attempt = &mut state.attempts[index];
    let automatic = attempt["resultMethod"] == "automatic";
    attempt["answers"] = Value::Array(graded);
    attempt["isCompleted"] = json!(true);
    attempt["isResultShown"] = json!(automatic);
    attempt["totalQuestions"] = json!(total);
    attempt["correctAnswers"] = json!(correct);
    attempt["incorrectAnswers"] = json!(total - correct);
    attempt["percentage"] = json!(percentage);
    attempt["endTime"] = body["endTime"].clone();
    attempt["timeSpent"] = body["timeSpent"].clone();

    ok(json!({"status": "success", "examAttempt": attempt.clone()}))
}

async fn my_attempts(State(fake): State<Fake>, headers: HeaderMap) -> Response {
    let (user_id, _) = match caller(&headers) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let state = fake.backend.lock().unwrap();
    let mine: Vec<Value> = state
        .attempts
        .iter()
        .filter(|a| a["userId"] == user_id.as_str())
        .cloned()
        .collect();

    let body = match state.list_shape {
        ListShape::Bare => Value::Array(mine),
        ListShape::ExamAttempts => json!({"status": "success", "examAttempts": mine}),
        ListShape::Data => json!({"status": "success", "data": mine}),
        ListShape::Attempts => json!({"attempts": mine}),
        ListShape::Unrecognized => json!({"status": "success", "results": {"items": mine}}),
    };
    ok(body)
}

fn redacted(attempt: &Value) -> Value {
    let mut copy = attempt.clone();
    if let Some(map) = copy.as_object_mut() {
        for field in ["percentage", "correctAnswers", "incorrectAnswers", "totalQuestions"] {
            map.remove(field);
        }
    }
    if let Some(answers) = copy["answers"].as_array_mut() {
        for answer in answers {
            if let Some(map) = answer.as_object_mut() {
                map.remove("isCorrect");
                map.remove("correctAnswers");
            }
        }
    }
    copy
}

async fn result(State(fake): State<Fake>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let (user_id, _) = match caller(&headers) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let state = fake.backend.lock().unwrap();
    let index = match owned_index(&state, &id, &user_id) {
        Ok(i) => i,
        Err(r) => return r,
    };
    let attempt = &state.attempts[index];
    if state.withhold_hidden_results && attempt["isResultShown"] != true {
        return fail(StatusCode::FORBIDDEN, "Result not yet available");
    }
    let body = if attempt["isResultShown"] == true {
        attempt.clone()
    } else {
        redacted(attempt)
    };
    ok(json!({"status": "success", "examAttempt": body}))
}

fn with_details(attempt: &Value, exams: &HashMap<String, Value>) -> Value {
    let mut detailed = attempt.clone();
    let user_id = attempt["userId"].as_str().unwrap_or_default().to_string();
    let exam_id = attempt["examId"].as_str().unwrap_or_default().to_string();
    let full_name = match user_id.as_str() {
        LEARNER_ID => "Ada Learner",
        OTHER_LEARNER_ID => "Grace Learner",
        _ => "Unknown",
    };
    // Deleted learners and exams stay `null`.
    if !attempt["userId"].is_null() {
        detailed["userId"] = json!({"_id": user_id, "fullName": full_name, "email": format!("{}@example.com", user_id)});
    }
    if !attempt["examId"].is_null() {
        detailed["examId"] = json!({
            "_id": exam_id,
            "title": exams.get(&exam_id).map(|e| e["title"].clone()).unwrap_or(Value::Null)
        });
    }
    detailed["courseId"] = json!({"_id": "C1", "title": "Cloud Certification Track"});
    detailed
}

async fn admin_list(State(fake): State<Fake>, headers: HeaderMap) -> Response {
    if let Err(r) = staff(&headers) {
        return r;
    }
    let state = fake.backend.lock().unwrap();
    let all: Vec<Value> = state
        .attempts
        .iter()
        .map(|a| with_details(a, &state.exams))
        .collect();
    ok(json!({"status": "success", "data": all}))
}

async fn admin_get(State(fake): State<Fake>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(r) = staff(&headers) {
        return r;
    }
    let state = fake.backend.lock().unwrap();
    match state.attempts.iter().find(|a| a["_id"] == id.as_str()) {
        Some(a) => ok(json!({"status": "success", "examAttempt": with_details(a, &state.exams)})),
        None => fail(StatusCode::NOT_FOUND, "Exam attempt not found"),
    }
}

async fn admin_update(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = staff(&headers) {
        return r;
    }
    let mut state = fake.backend.lock().unwrap();
    let Some(attempt) = state.attempts.iter_mut().find(|a| a["_id"] == id.as_str()) else {
        return fail(StatusCode::NOT_FOUND, "Exam attempt not found");
    };
    if let (Some(target), Some(patch)) = (attempt.as_object_mut(), body.as_object()) {
        for (field, value) in patch {
            target.insert(field.clone(), value.clone());
        }
    }
    ok(json!({"status": "success", "examAttempt": attempt.clone()}))
}

async fn admin_delete(State(fake): State<Fake>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(r) = staff(&headers) {
        return r;
    }
    let mut state = fake.backend.lock().unwrap();
    let before = state.attempts.len();
    state.attempts.retain(|a| a["_id"] != id.as_str());
    if state.attempts.len() == before {
        return fail(StatusCode::NOT_FOUND, "Exam attempt not found");
    }
    ok(json!({"status": "success", "message": "Exam attempt deleted"}))
}

async fn show_results(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Path(exam_id): Path<String>,
) -> Response {
    if let Err(r) = staff(&headers) {
        return r;
    }
    let mut state = fake.backend.lock().unwrap();
    let mut revealed = 0;
    for attempt in state
        .attempts
        .iter_mut()
        .filter(|a| a["examId"] == exam_id.as_str() && a["isCompleted"] == true)
    {
        attempt["isResultShown"] = json!(true);
        revealed += 1;
    }
    ok(json!({"status": "success", "message": format!("Results shown for {} attempts", revealed)}))
}

async fn cdn(State(fake): State<Fake>, Path(path): Path<String>) -> Response {
    if path == "images/missing.png" {
        return (StatusCode::NOT_FOUND, "missing").into_response();
    }
    fake.cdn_hits.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G']).into_response()
}

/// Spawns the fake exam backend (and CDN) on a random port.
pub async fn spawn_backend() -> TestBackend {
    let fake = Fake {
        backend: Arc::new(Mutex::new(seed())),
        cdn_hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/api/exam-attempts/start/{exam_id}", get(start))
        .route("/api/exam-attempts/save-progress/{id}", post(save_progress))
        .route("/api/exam-attempts/submit/{id}", post(submit))
        .route("/api/exam-attempts/my-attempts", get(my_attempts))
        .route("/api/exam-attempts/result/{id}", get(result))
        .route("/api/exam-attempts/v1", get(admin_list))
        .route(
            "/api/exam-attempts/v1/{id}",
            get(admin_get).put(admin_update).delete(admin_delete),
        )
        .route(
            "/api/exam-attempts/v1/exam/{exam_id}/show-results",
            put(show_results),
        )
        .route("/cdn/{*path}", get(cdn))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestBackend {
        address,
        state: fake.backend,
        cdn_hits: fake.cdn_hits,
    }
}

/// Spawns the portal gateway in front of `backend`. Returns its base URL.
pub async fn spawn_gateway(backend: &TestBackend) -> String {
    let config = Config {
        api_base_url: parse_base_url("API_BASE_URL", &backend.api_url()).unwrap(),
        asset_cdn_url: parse_base_url("ASSET_CDN_URL", &backend.cdn_url()).unwrap(),
        static_dir: PathBuf::from("does-not-exist-static"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        rust_log: "error".to_string(),
        log_dir: std::env::temp_dir(),
        request_timeout: Duration::from_secs(5),
        asset_cache_max_bytes: 1024 * 1024,
        asset_cache_ttl: Duration::from_secs(300),
        cors_origins: vec!["http://localhost:3000".to_string()],
    };

    let state = AppState::from_config(config).unwrap();
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Client that reports redirects instead of following them.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
