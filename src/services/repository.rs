use crate::errors::ClientResult;
use crate::models::{Participant, Quiz, ResultEntry, Session};
use crate::services::auth::AuthContext;

// ---------------------------------------------------------------------------
// SessionRepository trait (the remote session resource, as the services see it)
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait SessionRepository: Send + Sync {
    fn fetch_session(
        &self,
        auth: &AuthContext,
        code: &str,
    ) -> impl std::future::Future<Output = ClientResult<Session>> + Send;

    fn list_participants(
        &self,
        auth: &AuthContext,
        code: &str,
    ) -> impl std::future::Future<Output = ClientResult<Vec<Participant>>> + Send;

    fn join_session(
        &self,
        auth: &AuthContext,
        code: &str,
        team: Option<String>,
    ) -> impl std::future::Future<Output = ClientResult<()>> + Send;

    fn start_session(
        &self,
        auth: &AuthContext,
        code: &str,
    ) -> impl std::future::Future<Output = ClientResult<()>> + Send;

    fn submit_score(
        &self,
        auth: &AuthContext,
        code: &str,
        score: u32,
    ) -> impl std::future::Future<Output = ClientResult<()>> + Send;

    fn fetch_results(
        &self,
        auth: &AuthContext,
        code: &str,
    ) -> impl std::future::Future<Output = ClientResult<Vec<ResultEntry>>> + Send;

    fn fetch_quiz(
        &self,
        auth: &AuthContext,
        quiz_id: i32,
    ) -> impl std::future::Future<Output = ClientResult<Quiz>> + Send;

    /// Returns the new session's code.
    fn create_session(
        &self,
        auth: &AuthContext,
        quiz_id: i32,
        num_teams: u32,
    ) -> impl std::future::Future<Output = ClientResult<String>> + Send;

    fn invite(
        &self,
        auth: &AuthContext,
        code: &str,
        recipient_id: i32,
    ) -> impl std::future::Future<Output = ClientResult<()>> + Send;
}
