use crate::errors::{ClientError, ClientResult};
use crate::models::UserProfile;

// ---------------------------------------------------------------------------
// AuthContext: the explicit credentials every repository call carries
// ---------------------------------------------------------------------------

/// Established by [`AuthService::login`], dropped on logout or when the
/// server stops accepting it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    cookie: String,
    user: UserProfile,
}

impl AuthContext {
    pub fn new(cookie: String, user: UserProfile) -> Self {
        Self { cookie, user }
    }

    /// Value for the `Cookie` request header.
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn user_id(&self) -> i32 {
        self.user.id
    }
}

// ---------------------------------------------------------------------------
// AuthRepository trait
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait AuthRepository: Send + Sync {
    /// Returns the session cookie, or `None` when the credentials are rejected.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl std::future::Future<Output = ClientResult<Option<String>>> + Send;

    fn profile(
        &self,
        cookie: &str,
    ) -> impl std::future::Future<Output = ClientResult<UserProfile>> + Send;

    fn logout(&self, auth: &AuthContext)
        -> impl std::future::Future<Output = ClientResult<()>> + Send;
}

pub enum LoginOutcome {
    /// Credentials accepted and the profile resolved.
    Success(AuthContext),
    InvalidCredentials,
    EmptyFields,
}

// ---------------------------------------------------------------------------
// AuthService
// ---------------------------------------------------------------------------

pub struct AuthService<R: AuthRepository> {
    repo: R,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginOutcome> {
        if username.trim().is_empty() || password.is_empty() {
            return Ok(LoginOutcome::EmptyFields);
        }

        let Some(cookie) = self.repo.login(username.trim(), password).await? else {
            tracing::warn!("login rejected for '{}'", username.trim());
            return Ok(LoginOutcome::InvalidCredentials);
        };

        let user = self.repo.profile(&cookie).await?;
        tracing::info!("logged in as '{}' (id={})", user.username, user.id);

        Ok(LoginOutcome::Success(AuthContext::new(cookie, user)))
    }

    /// Consumes the context; it is gone even if the server call fails.
    pub async fn logout(&self, auth: AuthContext) -> ClientResult<()> {
        match self.repo.logout(&auth).await {
            Ok(()) | Err(ClientError::Unauthenticated) => Ok(()),
            Err(e) => {
                tracing::warn!("logout for user {} failed: {e}", auth.user_id());
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
