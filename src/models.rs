use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, ClientResult};
use crate::names;

/// Team labels arrive as strings, as team numbers, or as null.
fn deserialize_team_label<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> Result<Option<String>, D::Error> {
    struct Vis;
    impl<'de> serde::de::Visitor<'de> for Vis {
        type Value = Option<String>;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("team label, team number or null")
        }
        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> { Ok(None) }
        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> { Ok(None) }
        fn visit_some<D2: serde::Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(Vis)
        }
        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> { Ok(Some(v.to_string())) }
        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> { Ok(Some(v.to_string())) }
        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let v = v.trim();
            Ok((!v.is_empty()).then(|| v.to_string()))
        }
    }
    d.deserialize_any(Vis)
}

/// Scores are stored as floats server-side; the client counts whole answers.
fn deserialize_score<'de, D: serde::Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    struct Vis;
    impl<'de> serde::de::Visitor<'de> for Vis {
        type Value = u32;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("non-negative score")
        }
        fn visit_unit<E: serde::de::Error>(self) -> Result<u32, E> { Ok(0) }
        fn visit_none<E: serde::de::Error>(self) -> Result<u32, E> { Ok(0) }
        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<u32, E> {
            u32::try_from(v).map_err(E::custom)
        }
        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<u32, E> {
            u32::try_from(v).map_err(E::custom)
        }
        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<u32, E> {
            if v.is_finite() && v >= 0.0 && v <= u32::MAX as f64 {
                Ok(v.round() as u32)
            } else {
                Err(E::custom(format!("invalid score {v}")))
            }
        }
    }
    d.deserialize_any(Vis)
}

/// Reads an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn deserialize_step<'de, D: serde::Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or_else(default_step))
}

fn default_num_teams() -> u32 {
    names::MIN_TEAM_COUNT
}

fn default_step() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSession")]
pub struct Session {
    pub code: String,
    pub host_id: i32,
    pub quiz_id: i32,
    pub team_mode: bool,
    #[serde(default)]
    pub started: bool,
    #[serde(default = "default_num_teams")]
    pub num_teams: u32,
    #[serde(default)]
    pub quiz_name: Option<String>,
}

/// Wire form of [`Session`]; older servers send `is_team_mode`, some send both keys.
#[derive(Deserialize)]
struct RawSession {
    code: String,
    host_id: i32,
    quiz_id: i32,
    #[serde(default)]
    team_mode: Option<bool>,
    #[serde(default)]
    is_team_mode: Option<bool>,
    #[serde(default)]
    started: bool,
    #[serde(default = "default_num_teams")]
    num_teams: u32,
    #[serde(default)]
    quiz_name: Option<String>,
}

impl From<RawSession> for Session {
    fn from(raw: RawSession) -> Self {
        Self {
            team_mode: raw.team_mode.unwrap_or(false) || raw.is_team_mode.unwrap_or(false),
            code: raw.code,
            host_id: raw.host_id,
            quiz_id: raw.quiz_id,
            started: raw.started,
            num_teams: raw.num_teams,
            quiz_name: raw.quiz_name,
        }
    }
}

impl Session {
    pub fn is_team_mode(&self) -> bool {
        self.team_mode || self.num_teams > 1
    }

    pub fn is_host(&self, user_id: i32) -> bool {
        self.host_id == user_id
    }

    /// Labels a participant may pick, empty when the server did not fix a team count.
    pub fn team_choices(&self) -> Vec<String> {
        if self.num_teams > 1 {
            (1..=self.num_teams).map(|n| n.to_string()).collect()
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(alias = "user_id")]
    pub id: i32,
    pub username: String,
    #[serde(default, alias = "team_number", deserialize_with = "deserialize_team_label")]
    pub team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    #[serde(default, alias = "isCorrect")]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    MultipleChoice {
        #[serde(alias = "question_text")]
        text: String,
        options: Vec<QuestionOption>,
    },
    TextInput {
        #[serde(alias = "question_text")]
        text: String,
        #[serde(default, deserialize_with = "null_as_default")]
        correct_answer: String,
        #[serde(default)]
        max_length: Option<u32>,
    },
    Slider {
        #[serde(alias = "question_text")]
        text: String,
        min: f64,
        max: f64,
        #[serde(default = "default_step", deserialize_with = "deserialize_step")]
        step: f64,
        #[serde(default, deserialize_with = "null_as_default")]
        correct_value: f64,
    },
}

impl Question {
    pub fn text(&self) -> &str {
        match self {
            Question::MultipleChoice { text, .. }
            | Question::TextInput { text, .. }
            | Question::Slider { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub username: String,
    #[serde(default, deserialize_with = "deserialize_score")]
    pub score: u32,
    #[serde(default, alias = "team_number", deserialize_with = "deserialize_team_label")]
    pub team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
}

#[derive(Serialize)]
pub struct LoginBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct JoinBody<'a> {
    pub team: Option<&'a str>,
}

#[derive(Serialize)]
pub struct SubmitScoreBody {
    pub score: u32,
}

#[derive(Serialize)]
pub struct CreateSessionBody {
    pub quiz_id: i32,
    pub num_teams: u32,
}

#[derive(Deserialize)]
pub struct CreatedSession {
    pub code: String,
}

#[derive(Serialize)]
pub struct InviteBody {
    pub recipient_id: i32,
}

/// Shape of the server's error payloads.
#[derive(Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

/// Trims and upper-cases a user-typed session code.
pub fn normalize_session_code(raw: &str) -> ClientResult<String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() != names::SESSION_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ClientError::input(format!(
            "session code must be {} letters or digits",
            names::SESSION_CODE_LEN
        )));
    }
    Ok(code)
}
