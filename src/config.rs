use std::time::Duration;

use crate::names;

/// Runtime settings handed to the services.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    /// Seconds per question.
    pub question_seconds: u32,
    /// Length of one countdown unit.
    pub tick: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, every: Duration) -> Self {
        if !every.is_zero() {
            self.poll_interval = every;
        }
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.request_timeout = timeout;
        }
        self
    }

    pub fn with_question_seconds(mut self, seconds: u32) -> Self {
        if seconds > 0 {
            self.question_seconds = seconds;
        }
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:1414".to_string(),
            poll_interval: names::DEFAULT_POLL_INTERVAL,
            question_seconds: names::DEFAULT_QUESTION_SECONDS,
            tick: names::DEFAULT_TICK,
            request_timeout: names::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
