//! reqwest-backed implementation of the session and auth repositories.

use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::errors::{ClientError, ClientResult};
use crate::models::{
    CreateSessionBody, CreatedSession, ErrorBody, InviteBody, JoinBody, LoginBody, Participant,
    Quiz, ResultEntry, Session, SubmitScoreBody, UserProfile,
};
use crate::names;
use crate::services::auth::{AuthContext, AuthRepository};
use crate::services::repository::SessionRepository;

#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base: Url,
}

impl HttpClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_timeout(base_url, names::DEFAULT_REQUEST_TIMEOUT)
    }

    /// Every request gives up after `timeout`, so a stalled server cannot
    /// hold a poll or a lobby action forever.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::input(format!("invalid server url '{base_url}': {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::input(format!("invalid request path '{path}': {e}")))
    }

    fn get(&self, auth: &AuthContext, path: &str) -> ClientResult<RequestBuilder> {
        Ok(self.http.get(self.url(path)?).header(COOKIE, auth.cookie()))
    }

    fn post(&self, auth: &AuthContext, path: &str) -> ClientResult<RequestBuilder> {
        Ok(self.http.post(self.url(path)?).header(COOKIE, auth.cookie()))
    }

    async fn send(req: RequestBuilder) -> ClientResult<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthenticated);
        }

        let url = resp.url().path().to_string();
        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(ErrorBody::into_message);
        tracing::warn!("{url} answered {status}: {}", message.as_deref().unwrap_or("-"));
        Err(ClientError::Status { status, message })
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
        let path = resp.url().path().to_string();
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!("unexpected response from {path}: {e}");
            ClientError::Malformed(format!("{path}: {e}"))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, auth: &AuthContext, path: &str) -> ClientResult<T> {
        let resp = Self::send(self.get(auth, path)?).await?;
        Self::decode(resp).await
    }

    async fn post_json<B: Serialize>(
        &self,
        auth: &AuthContext,
        path: &str,
        body: &B,
    ) -> ClientResult<Response> {
        Self::send(self.post(auth, path)?.json(body)).await
    }
}

/// Picks `name=value` for the session cookie out of the `Set-Cookie` headers.
fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.split_once('=')
                .is_some_and(|(name, value)| name == names::SESSION_COOKIE_NAME && !value.is_empty())
        })
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

impl AuthRepository for HttpClient {
    async fn login(&self, username: &str, password: &str) -> ClientResult<Option<String>> {
        let req = self
            .http
            .post(self.url(names::LOGIN_URL)?)
            .json(&LoginBody { username, password });

        let resp = match Self::send(req).await {
            Ok(resp) => resp,
            Err(ClientError::Unauthenticated) => return Ok(None),
            Err(e) => return Err(e),
        };
        session_cookie(&resp)
            .map(Some)
            .ok_or_else(|| ClientError::Malformed("login response carried no session cookie".to_string()))
    }

    async fn profile(&self, cookie: &str) -> ClientResult<UserProfile> {
        let req = self
            .http
            .get(self.url(names::PROFILE_URL)?)
            .header(COOKIE, cookie);
        Self::decode(Self::send(req).await?).await
    }

    async fn logout(&self, auth: &AuthContext) -> ClientResult<()> {
        Self::send(self.post(auth, names::LOGOUT_URL)?).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

impl SessionRepository for HttpClient {
    async fn fetch_session(&self, auth: &AuthContext, code: &str) -> ClientResult<Session> {
        self.get_json(auth, &names::session_url(code)).await
    }

    async fn list_participants(
        &self,
        auth: &AuthContext,
        code: &str,
    ) -> ClientResult<Vec<Participant>> {
        self.get_json(auth, &names::participants_url(code)).await
    }

    async fn join_session(
        &self,
        auth: &AuthContext,
        code: &str,
        team: Option<String>,
    ) -> ClientResult<()> {
        let body = JoinBody {
            team: team.as_deref(),
        };
        self.post_json(auth, &names::join_session_url(code), &body)
            .await?;
        Ok(())
    }

    async fn start_session(&self, auth: &AuthContext, code: &str) -> ClientResult<()> {
        Self::send(self.post(auth, &names::start_session_url(code))?).await?;
        Ok(())
    }

    async fn submit_score(&self, auth: &AuthContext, code: &str, score: u32) -> ClientResult<()> {
        self.post_json(auth, &names::submit_score_url(code), &SubmitScoreBody { score })
            .await?;
        Ok(())
    }

    async fn fetch_results(&self, auth: &AuthContext, code: &str) -> ClientResult<Vec<ResultEntry>> {
        self.get_json(auth, &names::results_url(code)).await
    }

    async fn fetch_quiz(&self, auth: &AuthContext, quiz_id: i32) -> ClientResult<Quiz> {
        self.get_json(auth, &names::quiz_url(quiz_id)).await
    }

    async fn create_session(
        &self,
        auth: &AuthContext,
        quiz_id: i32,
        num_teams: u32,
    ) -> ClientResult<String> {
        let body = CreateSessionBody { quiz_id, num_teams };
        let resp = self.post_json(auth, names::CREATE_SESSION_URL, &body).await?;
        let created: CreatedSession = Self::decode(resp).await?;
        Ok(created.code)
    }

    async fn invite(&self, auth: &AuthContext, code: &str, recipient_id: i32) -> ClientResult<()> {
        self.post_json(auth, &names::invite_url(code), &InviteBody { recipient_id })
            .await?;
        Ok(())
    }
}
