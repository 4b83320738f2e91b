pub mod bank;
pub mod level;
pub mod scoring;
pub mod selector;
pub mod session;

use std::fmt;

use chrono::{DateTime, Utc};

/// Difficulty tier. Declaration order is the up/down order.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[serde(alias = "basico")]
    Basic,
    #[default]
    #[serde(alias = "intermediario")]
    Intermediate,
    #[serde(alias = "avancado")]
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Basic, Level::Intermediate, Level::Advanced];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// One tier up, or `None` at the top.
    pub fn higher(self) -> Option<Level> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// One tier down, or `None` at the bottom.
    pub fn lower(self) -> Option<Level> {
        self.ordinal().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Basic => "basic",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub id: String,
    pub level: Level,
    pub text: String,
    pub options: Vec<String>,
    /// Identifier of the correct option, i.e. its zero-based index as a string.
    pub answer: String,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        level: Level,
        text: impl Into<String>,
        options: Vec<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            level,
            text: text.into(),
            options,
            answer: answer.into(),
        }
    }

    /// Maps the text of a tapped option back to its identifier.
    pub fn option_id_for(&self, option_text: &str) -> Option<String> {
        self.options
            .iter()
            .position(|o| o == option_text)
            .map(|i| i.to_string())
    }

    pub fn correct_option(&self) -> Option<&str> {
        let index = self.answer.parse::<usize>().ok()?;
        self.options.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnsweredQuestion {
    pub question_id: String,
    pub text: String,
    #[serde(rename = "selected")]
    pub selected_option: String,
    #[serde(rename = "correct")]
    pub is_correct: bool,
    pub level: Level,
    pub options: Vec<String>,
}

/// Summary of one completed attempt, as kept in a user's history.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResultEntry {
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "total")]
    pub total_answered: usize,
    #[serde(rename = "correct")]
    pub correct_count: usize,
    #[serde(rename = "iq")]
    pub estimated_score: u32,
    pub suggestion: String,
    pub answers: Vec<AnsweredQuestion>,
}

impl ResultEntry {
    pub fn from_answers(answers: Vec<AnsweredQuestion>, timestamp: DateTime<Utc>) -> Self {
        let estimated_score = scoring::estimate(&answers);
        Self {
            timestamp,
            total_answered: answers.len(),
            correct_count: answers.iter().filter(|a| a.is_correct).count(),
            estimated_score,
            suggestion: scoring::suggestion(estimated_score).to_string(),
            answers,
        }
    }
}
