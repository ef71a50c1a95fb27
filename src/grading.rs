//! Answer grading for the three question kinds.

use std::fmt;

use crate::errors::{ClientError, ClientResult};
use crate::models::Question;
use crate::names;

/// What a player submitted for one question.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Choice(usize),
    Text(String),
    Value(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
}

impl Outcome {
    pub fn is_correct(self) -> bool {
        self == Outcome::Correct
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Correct => f.write_str("Correct"),
            Outcome::Wrong => f.write_str("Wrong"),
        }
    }
}

/// Renders numbers the way the slider shows them: `5` rather than `5.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl Question {
    /// Answer assumed when the player never touched the input.
    pub fn default_answer(&self) -> Option<Answer> {
        match self {
            Question::MultipleChoice { .. } => None,
            Question::TextInput { .. } => Some(Answer::Text(String::new())),
            Question::Slider { min, .. } => Some(Answer::Value(*min)),
        }
    }

    /// Index of the first option flagged correct.
    pub fn correct_option(&self) -> Option<usize> {
        match self {
            Question::MultipleChoice { options, .. } => options.iter().position(|o| o.is_correct),
            _ => None,
        }
    }

    pub fn grade(&self, answer: Option<&Answer>) -> Outcome {
        let correct = match (self, answer) {
            (Question::MultipleChoice { .. }, Some(Answer::Choice(idx))) => {
                self.correct_option() == Some(*idx)
            }
            (Question::TextInput { correct_answer, .. }, Some(Answer::Text(text))) => {
                let given = text.trim().to_lowercase();
                !given.is_empty() && given == correct_answer.trim().to_lowercase()
            }
            (Question::Slider { correct_value, .. }, Some(Answer::Value(value))) => {
                value == correct_value
            }
            _ => false,
        };
        if correct {
            Outcome::Correct
        } else {
            Outcome::Wrong
        }
    }

    /// Checks that `answer` fits this question before it is recorded.
    pub fn check_answer(&self, answer: &Answer) -> ClientResult<()> {
        match (self, answer) {
            (Question::MultipleChoice { options, .. }, Answer::Choice(idx)) => {
                if *idx >= options.len() {
                    return Err(ClientError::input(format!(
                        "choose an option between 1 and {}",
                        options.len()
                    )));
                }
            }
            (Question::TextInput { max_length, .. }, Answer::Text(text)) => {
                if let Some(max) = max_length {
                    if text.chars().count() > *max as usize {
                        return Err(ClientError::input(format!(
                            "answer is longer than {max} characters"
                        )));
                    }
                }
            }
            (Question::Slider { min, max, .. }, Answer::Value(value)) => {
                if !value.is_finite() || value < min || value > max {
                    return Err(ClientError::input(format!(
                        "pick a value between {} and {}",
                        format_number(*min),
                        format_number(*max)
                    )));
                }
            }
            _ => return Err(ClientError::input("answer does not match the question type")),
        }
        Ok(())
    }

    pub fn correct_display(&self) -> String {
        match self {
            Question::MultipleChoice { options, .. } => self
                .correct_option()
                .map(|idx| options[idx].text.clone())
                .unwrap_or_default(),
            Question::TextInput { correct_answer, .. } => correct_answer.clone(),
            Question::Slider { correct_value, .. } => format_number(*correct_value),
        }
    }

    /// Shows a submitted answer in the same form as [`Question::correct_display`].
    pub fn answer_display(&self, answer: Option<&Answer>) -> String {
        match (self, answer) {
            (Question::MultipleChoice { options, .. }, Some(Answer::Choice(idx))) => options
                .get(*idx)
                .map(|o| o.text.clone())
                .unwrap_or_else(|| names::NO_ANSWER_GIVEN.to_string()),
            (Question::TextInput { .. }, Some(Answer::Text(text))) if !text.trim().is_empty() => {
                text.clone()
            }
            (Question::Slider { .. }, Some(Answer::Value(value))) => format_number(*value),
            _ => names::NO_ANSWER_GIVEN.to_string(),
        }
    }
}
