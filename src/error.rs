use std::io;

use thiserror::Error;

use crate::quiz::Level;

/// Problems found while loading the question bank.
#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse question bank: {0}")]
    Json(#[from] serde_json::Error),
    #[error("level '{level}' is listed more than once")]
    DuplicateLevel { level: Level },
    #[error("question #{position} in level '{level}' has an empty id")]
    EmptyId { level: Level, position: usize },
    #[error("question '{id}' has an empty text")]
    EmptyText { id: String },
    #[error("question '{id}' has no options")]
    NoOptions { id: String },
    #[error("question '{id}' has answer '{answer}' which is not an option index (0..{options})")]
    InvalidAnswer {
        id: String,
        answer: String,
        options: usize,
    },
    #[error("question id '{id}' appears more than once")]
    DuplicateId { id: String },
    #[error("question '{id}' declares level '{declared}' but is listed under '{group}'")]
    LevelMismatch {
        id: String,
        declared: Level,
        group: Level,
    },
}

/// Failures reading or writing the per-user history.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("history i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("history is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("history lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("`{operation}` called while session is {phase}")]
    Sequence {
        operation: &'static str,
        phase: &'static str,
    },
    #[error("`submit_answer` called with no staged question")]
    NoStagedQuestion,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("failed to prepare data files: {0}")]
    Io(#[from] io::Error),
}
