//! Query parameters that let a reloaded client resume the right session phase.

use url::form_urlencoded;

use crate::names;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhaseParams {
    pub session: Option<String>,
    pub is_host: bool,
    pub show_results: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Practice run with no session attached.
    Standalone,
    Play { code: String, is_host: bool },
    Results { code: String },
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

impl PhaseParams {
    pub fn play(code: &str, is_host: bool) -> Self {
        Self {
            session: Some(code.to_string()),
            is_host,
            show_results: false,
        }
    }

    pub fn results(code: &str) -> Self {
        Self {
            session: Some(code.to_string()),
            is_host: false,
            show_results: true,
        }
    }

    /// Unknown keys are ignored; a missing or empty `session` means standalone.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                names::SESSION_PARAM => {
                    let value = value.trim();
                    params.session = (!value.is_empty()).then(|| value.to_string());
                }
                names::IS_HOST_PARAM => params.is_host = parse_flag(&value),
                names::SHOW_RESULTS_PARAM => params.show_results = parse_flag(&value),
                _ => {}
            }
        }
        params
    }

    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(code) = &self.session {
            query.append_pair(names::SESSION_PARAM, code);
        }
        if self.is_host {
            query.append_pair(names::IS_HOST_PARAM, "true");
        }
        if self.show_results {
            query.append_pair(names::SHOW_RESULTS_PARAM, "true");
        }
        query.finish()
    }

    pub fn to_url(&self, path: &str) -> String {
        let query = self.to_query();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.session {
            None => Phase::Standalone,
            Some(code) if self.show_results => Phase::Results { code: code.clone() },
            Some(code) => Phase::Play {
                code: code.clone(),
                is_host: self.is_host,
            },
        }
    }
}
