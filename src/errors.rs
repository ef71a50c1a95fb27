use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the repository client and the session services.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{}", status_message(.status, .message.as_deref()))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// The server answered with data the client cannot use.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The auth context is missing or the server rejected it.
    #[error("not logged in")]
    Unauthenticated,

    /// Rejected locally before any call was made.
    #[error("{0}")]
    Input(String),

    #[error("only the host can {0}")]
    NotHost(&'static str),
}

fn status_message(status: &StatusCode, message: Option<&str>) -> String {
    match message {
        Some(message) => message.to_string(),
        None => format!("request failed with status {status}"),
    }
}

impl ClientError {
    pub fn input(message: impl Into<String>) -> Self {
        ClientError::Input(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// Text suitable for an inline alert next to the action that failed.
    pub fn inline_message(&self) -> String {
        match self {
            ClientError::Transport(_) => "A network error occurred.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
