use std::time::Duration;

pub const LOGIN_URL: &str = "/api/login";
pub const LOGOUT_URL: &str = "/api/logout";
pub const PROFILE_URL: &str = "/api/profile";
pub const CREATE_SESSION_URL: &str = "/api/sessions";

pub const SESSION_COOKIE_NAME: &str = "session";

pub fn session_url(code: &str) -> String {
    format!("/api/sessions/{code}")
}

pub fn participants_url(code: &str) -> String {
    format!("/api/sessions/{code}/participants")
}

pub fn join_session_url(code: &str) -> String {
    format!("/api/sessions/{code}/join")
}

pub fn start_session_url(code: &str) -> String {
    format!("/api/sessions/{code}/start")
}

pub fn submit_score_url(code: &str) -> String {
    format!("/api/sessions/{code}/submit-score")
}

pub fn results_url(code: &str) -> String {
    format!("/api/sessions/{code}/results")
}

pub fn invite_url(code: &str) -> String {
    format!("/api/sessions/{code}/invite")
}

pub fn quiz_url(quiz_id: i32) -> String {
    format!("/api/quizzes/{quiz_id}")
}

// Client-side navigation
pub fn lobby_page_url(code: &str) -> String {
    format!("/session/{code}")
}

pub fn simulator_page_url(quiz_id: i32) -> String {
    format!("/quiz/{quiz_id}/simulate")
}

pub fn results_page_url(code: &str) -> String {
    format!("/session/{code}/results")
}

pub const SESSION_PARAM: &str = "session";
pub const IS_HOST_PARAM: &str = "isHost";
pub const SHOW_RESULTS_PARAM: &str = "showResults";

// Live session defaults
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_QUESTION_SECONDS: u32 = 15;
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const SESSION_CODE_LEN: usize = 6;
pub const MIN_TEAM_COUNT: u32 = 1;

pub const NO_ANSWER_GIVEN: &str = "No answer given";
