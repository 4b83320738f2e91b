use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;

use super::bank::QuestionBank;
use super::{level, selector, AnsweredQuestion, Level, Question, ResultEntry};
use crate::error::SessionError;
use crate::history::HistoryStore;

pub const DEFAULT_LENGTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    NotStarted,
    InProgress,
    Completed,
    /// Completed and handed to the history store.
    Archived,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::NotStarted => "not started",
            Phase::InProgress => "in progress",
            Phase::Completed => "completed",
            Phase::Archived => "archived",
        }
    }
}

/// One user's attempt at the quiz.
///
/// The value is plain data so whatever hosts the quiz can persist it between requests and
/// hand it back for the next call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuizSession {
    length: usize,
    phase: Phase,
    current_level: Level,
    used_question_ids: HashSet<String>,
    answers: Vec<AnsweredQuestion>,
    question_index: usize,
    streak: u32,
    current_question: Option<Question>,
}

impl QuizSession {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            phase: Phase::NotStarted,
            current_level: Level::Intermediate,
            used_question_ids: HashSet::new(),
            answers: Vec::new(),
            question_index: 0,
            streak: 0,
            current_question: None,
        }
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require(Phase::NotStarted, "start")?;
        *self = Self::new(self.length);
        self.phase = Phase::InProgress;
        Ok(())
    }

    /// Stages and returns the next question.
    ///
    /// `Ok(None)` means the session is over: either all questions were answered or the
    /// current level has nothing to ask, in which case the attempt ends early.
    pub fn next_question<R: Rng + ?Sized>(
        &mut self,
        bank: &QuestionBank,
        rng: &mut R,
    ) -> Result<Option<&Question>, SessionError> {
        self.require(Phase::InProgress, "next_question")?;

        if self.question_index >= self.length {
            self.phase = Phase::Completed;
            return Ok(None);
        }
        if self.current_question.is_some() {
            return Ok(self.current_question.as_ref());
        }

        match selector::select(bank, self.current_level, &self.used_question_ids, rng) {
            Some(question) => {
                debug!(
                    "question {}/{}: '{}' at {}",
                    self.question_index + 1,
                    self.length,
                    question.id,
                    self.current_level
                );
                self.current_question = Some(question.clone());
                Ok(self.current_question.as_ref())
            }
            None => {
                warn!(
                    "no questions configured for level {}, ending after {} answers",
                    self.current_level,
                    self.answers.len()
                );
                self.phase = Phase::Completed;
                Ok(None)
            }
        }
    }

    /// Records an answer to the staged question and moves the level.
    pub fn submit_answer(&mut self, selected_option: &str) -> Result<AnsweredQuestion, SessionError> {
        self.require(Phase::InProgress, "submit_answer")?;
        let question = self
            .current_question
            .take()
            .ok_or(SessionError::NoStagedQuestion)?;

        let is_correct = selected_option == question.answer;
        self.streak = if is_correct { self.streak + 1 } else { 0 };
        let next = level::next_level(self.current_level, is_correct, self.streak);
        debug!(
            "answer to '{}' correct={} streak={} level {} -> {}",
            question.id, is_correct, self.streak, self.current_level, next
        );

        let answered = AnsweredQuestion {
            question_id: question.id.clone(),
            text: question.text,
            selected_option: selected_option.to_string(),
            is_correct,
            level: question.level,
            options: question.options,
        };
        self.answers.push(answered.clone());
        self.used_question_ids.insert(question.id);
        self.question_index += 1;
        self.current_level = next;

        if self.question_index >= self.length {
            self.phase = Phase::Completed;
        }
        Ok(answered)
    }

    /// Scores the attempt and appends it to the user's history.
    ///
    /// Succeeds once per session. A failed append leaves the session completed so the call
    /// can be repeated.
    pub fn finish(
        &mut self,
        user_id: &str,
        store: &dyn HistoryStore,
        now: DateTime<Utc>,
    ) -> Result<ResultEntry, SessionError> {
        self.require(Phase::Completed, "finish")?;
        let entry = ResultEntry::from_answers(self.answers.clone(), now);
        store.append(user_id, &entry)?;
        self.phase = Phase::Archived;
        info!(
            "{} finished: {}/{} correct, score {}",
            user_id, entry.correct_count, entry.total_answered, entry.estimated_score
        );
        Ok(entry)
    }

    fn require(&self, phase: Phase, operation: &'static str) -> Result<(), SessionError> {
        if self.phase != phase {
            return Err(SessionError::Sequence {
                operation,
                phase: self.phase.name(),
            });
        }
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn current_level(&self) -> Level {
        self.current_level
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn answers(&self) -> &[AnsweredQuestion] {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }
}
