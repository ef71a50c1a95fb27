#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use quizinart_live::services::auth::{AuthContext, AuthService, LoginOutcome};
use quizinart_live::HttpClient;

pub const HOST: (i32, &str, &str) = (7, "host", "hostpw");
pub const PLAYER: (i32, &str, &str) = (9, "player", "playerpw");
pub const GUEST: (i32, &str, &str) = (11, "guest", "guestpw");

const USERS: [(i32, &str, &str); 3] = [HOST, PLAYER, GUEST];

pub const QUIZ_ID: i32 = 3;
pub const EMPTY_QUIZ_ID: i32 = 4;

#[derive(Default)]
pub struct FakeState {
    next_code: u32,
    sessions: HashMap<String, Value>,
    participants: HashMap<String, Vec<(i32, Option<String>)>>,
    results: HashMap<String, Vec<Value>>,
    pub invites: Vec<(String, i32)>,
    pub participant_fetches: usize,
    /// Makes session fetches hang well past any client timeout.
    pub stall_sessions: bool,
}

/// In-memory stand-in for the quiz server API.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<FakeState>>,
}

type ApiResult = Result<Response, (StatusCode, Json<Value>)>;

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn username(id: i32) -> &'static str {
    USERS
        .iter()
        .find(|(uid, _, _)| *uid == id)
        .map(|(_, name, _)| *name)
        .unwrap_or("unknown")
}

fn current_user(headers: &HeaderMap) -> Result<i32, (StatusCode, Json<Value>)> {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').find_map(|pair| pair.trim().strip_prefix("session=tok-")))
        .and_then(|id| id.parse().ok())
        .filter(|id| USERS.iter().any(|(uid, _, _)| uid == id))
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Not authenticated"))
}

fn quiz(id: i32) -> Option<Value> {
    match id {
        QUIZ_ID => Some(json!({
            "id": QUIZ_ID,
            "name": "Rust Basics",
            "questions": [
                {
                    "type": "multiple_choice",
                    "question_text": "React is a?",
                    "options": [
                        { "text": "Library", "is_correct": true },
                        { "text": "Framework", "is_correct": false }
                    ]
                },
                {
                    "type": "text_input",
                    "text": "Capital of France?",
                    "correct_answer": "Paris",
                    "max_length": 20
                },
                {
                    "type": "slider",
                    "text": "Pick five",
                    "min": 0,
                    "max": 10,
                    "step": 1,
                    "correct_value": 5
                }
            ]
        })),
        EMPTY_QUIZ_ID => Some(json!({ "id": EMPTY_QUIZ_ID, "name": "Empty", "questions": [] })),
        _ => None,
    }
}

impl FakeServer {
    pub fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    /// Serves the API on an ephemeral local port and returns its base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/login", post(login))
            .route("/api/logout", post(logout))
            .route("/api/profile", get(profile))
            .route("/api/quizzes/{id}", get(fetch_quiz))
            .route("/api/sessions", post(create_session))
            .route("/api/sessions/{code}", get(fetch_session))
            .route("/api/sessions/{code}/participants", get(participants))
            .route("/api/sessions/{code}/join", post(join))
            .route("/api/sessions/{code}/start", post(start))
            .route("/api/sessions/{code}/submit-score", post(submit_score))
            .route("/api/sessions/{code}/results", get(results))
            .route("/api/sessions/{code}/invite", post(invite))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

/// Logs in one of the fixed users against `base`.
pub async fn login_as(base: &str, user: (i32, &str, &str)) -> AuthContext {
    let svc = AuthService::new(HttpClient::new(base).unwrap());
    match svc.login(user.1, user.2).await.unwrap() {
        LoginOutcome::Success(auth) => auth,
        _ => panic!("login failed for {}", user.1),
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(Json(form): Json<LoginForm>) -> ApiResult {
    let Some((id, _, _)) = USERS
        .iter()
        .find(|(_, name, pw)| *name == form.username && *pw == form.password)
    else {
        return Err(error(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    };
    let cookie = format!("session=tok-{id}; Path=/; HttpOnly");
    Ok(([(SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response())
}

async fn logout(headers: HeaderMap) -> ApiResult {
    current_user(&headers)?;
    Ok(StatusCode::OK.into_response())
}

async fn profile(headers: HeaderMap) -> ApiResult {
    let id = current_user(&headers)?;
    Ok(Json(json!({ "id": id, "username": username(id) })).into_response())
}

async fn fetch_quiz(headers: HeaderMap, Path(id): Path<i32>) -> ApiResult {
    current_user(&headers)?;
    quiz(id)
        .map(|q| Json(q).into_response())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Quiz not found"))
}

#[derive(Deserialize)]
struct CreateForm {
    quiz_id: i32,
    num_teams: u32,
}

async fn create_session(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Json(form): Json<CreateForm>,
) -> ApiResult {
    let host = current_user(&headers)?;
    if quiz(form.quiz_id).is_none() {
        return Err(error(StatusCode::NOT_FOUND, "Quiz not found"));
    }
    let code = server.with_state(|s| {
        s.next_code += 1;
        let code = format!("qz{:04}", s.next_code);
        s.sessions.insert(
            code.to_ascii_uppercase(),
            json!({
                "code": code.to_ascii_uppercase(),
                "host_id": host,
                "quiz_id": form.quiz_id,
                "is_team_mode": form.num_teams > 1,
                "num_teams": form.num_teams,
                "started": false,
                "quiz_name": "Rust Basics"
            }),
        );
        code
    });
    // lower-case on purpose: the client normalises codes
    Ok((StatusCode::CREATED, Json(json!({ "code": code }))).into_response())
}

fn session_snapshot(server: &FakeServer, code: &str) -> Result<Value, (StatusCode, Json<Value>)> {
    server
        .with_state(|s| s.sessions.get(code).cloned())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Session not found"))
}

async fn fetch_session(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> ApiResult {
    current_user(&headers)?;
    if server.with_state(|s| s.stall_sessions) {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    }
    Ok(Json(session_snapshot(&server, &code)?).into_response())
}

async fn participants(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> ApiResult {
    current_user(&headers)?;
    session_snapshot(&server, &code)?;
    let list = server.with_state(|s| {
        s.participant_fetches += 1;
        s.participants
            .get(&code)
            .map(|ps| {
                ps.iter()
                    .map(|(id, team)| {
                        json!({
                            "user_id": id,
                            "username": username(*id),
                            "team_number": team.as_ref().map(|t| t.parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::from(t.clone())))
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    });
    Ok(Json(Value::from(list)).into_response())
}

#[derive(Deserialize)]
struct JoinForm {
    team: Option<String>,
}

async fn join(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Json(form): Json<JoinForm>,
) -> ApiResult {
    let user = current_user(&headers)?;
    let session = session_snapshot(&server, &code)?;
    if session["started"].as_bool() == Some(true) {
        return Err(error(StatusCode::BAD_REQUEST, "Session already started"));
    }
    server.with_state(|s| {
        let list = s.participants.entry(code).or_default();
        list.retain(|(id, _)| *id != user);
        list.push((user, form.team));
    });
    Ok(StatusCode::OK.into_response())
}

async fn start(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> ApiResult {
    let user = current_user(&headers)?;
    let session = session_snapshot(&server, &code)?;
    if session["host_id"].as_i64() != Some(i64::from(user)) {
        return Err(error(StatusCode::FORBIDDEN, "Only the host can start the session"));
    }
    server.with_state(|s| {
        if let Some(session) = s.sessions.get_mut(&code) {
            session["started"] = Value::Bool(true);
        }
    });
    Ok(StatusCode::OK.into_response())
}

#[derive(Deserialize)]
struct ScoreForm {
    score: u32,
}

async fn submit_score(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Json(form): Json<ScoreForm>,
) -> ApiResult {
    let user = current_user(&headers)?;
    session_snapshot(&server, &code)?;
    server.with_state(|s| {
        let team = s
            .participants
            .get(&code)
            .and_then(|ps| ps.iter().find(|(id, _)| *id == user))
            .and_then(|(_, team)| team.clone());
        s.results.entry(code).or_default().push(json!({
            "username": username(user),
            "score": f64::from(form.score),
            "team": team
        }));
    });
    Ok(StatusCode::OK.into_response())
}

async fn results(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> ApiResult {
    current_user(&headers)?;
    session_snapshot(&server, &code)?;
    let list = server.with_state(|s| s.results.get(&code).cloned().unwrap_or_default());
    Ok(Json(Value::from(list)).into_response())
}

#[derive(Deserialize)]
struct InviteForm {
    recipient_id: i32,
}

async fn invite(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Json(form): Json<InviteForm>,
) -> ApiResult {
    current_user(&headers)?;
    session_snapshot(&server, &code)?;
    server.with_state(|s| s.invites.push((code, form.recipient_id)));
    Ok(StatusCode::OK.into_response())
}
