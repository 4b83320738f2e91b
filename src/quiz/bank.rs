use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use super::{Level, Question};
use crate::error::BankError;

/// Read-only set of questions grouped by level.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    by_level: HashMap<Level, Vec<Question>>,
}

/// Ids and answers show up both as strings and as numbers in hand-written banks.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Key {
    Text(String),
    Number(i64),
}

impl Key {
    fn normalised(&self) -> String {
        match self {
            Key::Text(s) => s.trim().to_string(),
            Key::Number(n) => n.to_string(),
        }
    }
}

#[derive(serde::Deserialize)]
struct RawQuestion {
    id: Key,
    #[serde(default)]
    level: Option<Level>,
    text: String,
    options: Vec<String>,
    answer: Key,
}

/// Level groups in file order. A plain map would let `basico` silently replace `basic`.
struct LevelGroups(Vec<(Level, Vec<RawQuestion>)>);

impl<'de> Deserialize<'de> for LevelGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = LevelGroups;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by level name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut groups = Vec::new();
                while let Some(group) = map.next_entry::<Level, Vec<RawQuestion>>()? {
                    groups.push(group);
                }
                Ok(LevelGroups(groups))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

impl QuestionBank {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parses a bank shaped as `{"basic": [...], "intermediate": [...], "advanced": [...]}`.
    pub fn from_reader(reader: impl Read) -> Result<Self, BankError> {
        let LevelGroups(groups) = serde_json::from_reader(reader)?;

        let mut seen = HashSet::new();
        let mut questions = Vec::new();
        for (level, group) in &groups {
            let level = *level;
            if !seen.insert(level) {
                return Err(BankError::DuplicateLevel { level });
            }
            for (position, record) in group.iter().enumerate() {
                questions.push(Self::validate(level, position, record)?);
            }
        }

        Self::from_questions(questions)
    }

    /// Builds a bank from already shaped questions, rejecting duplicate ids.
    pub fn from_questions(questions: Vec<Question>) -> Result<Self, BankError> {
        let mut seen = HashSet::new();
        let mut by_level: HashMap<Level, Vec<Question>> = HashMap::new();
        for question in questions {
            if !seen.insert(question.id.clone()) {
                return Err(BankError::DuplicateId { id: question.id });
            }
            by_level.entry(question.level).or_default().push(question);
        }
        Ok(Self { by_level })
    }

    fn validate(group: Level, position: usize, raw: &RawQuestion) -> Result<Question, BankError> {
        let id = raw.id.normalised();
        if id.is_empty() {
            return Err(BankError::EmptyId {
                level: group,
                position,
            });
        }
        if raw.text.trim().is_empty() {
            return Err(BankError::EmptyText { id });
        }
        if raw.options.is_empty() {
            return Err(BankError::NoOptions { id });
        }
        if let Some(declared) = raw.level {
            if declared != group {
                return Err(BankError::LevelMismatch {
                    id,
                    declared,
                    group,
                });
            }
        }

        let answer = raw.answer.normalised();
        let valid = answer
            .parse::<usize>()
            .map(|i| i < raw.options.len())
            .unwrap_or(false);
        if !valid {
            return Err(BankError::InvalidAnswer {
                id,
                answer,
                options: raw.options.len(),
            });
        }

        Ok(Question::new(
            id,
            group,
            raw.text.clone(),
            raw.options.clone(),
            answer,
        ))
    }

    pub fn questions(&self, level: Level) -> &[Question] {
        self.by_level.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_level.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
