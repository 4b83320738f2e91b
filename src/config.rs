use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::ConfigError;
use crate::quiz::session::DEFAULT_LENGTH;

const EMPTY_BANK: &str = "{\n  \"basic\": [],\n  \"intermediate\": [],\n  \"advanced\": []\n}\n";
const EMPTY_RESULTS: &str = "{}\n";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub questions_file: PathBuf,
    pub results_file: PathBuf,
    pub dialogue_db: String,
    pub quiz_length: usize,
}

impl Config {
    /// Reads `QUIZ_*` variables, falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let quiz_length = match lookup("QUIZ_LENGTH") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "QUIZ_LENGTH",
                        value,
                    })
                }
            },
            None => DEFAULT_LENGTH,
        };

        Ok(Self {
            questions_file: lookup("QUIZ_QUESTIONS_FILE")
                .unwrap_or_else(|| "data/questions.json".to_string())
                .into(),
            results_file: lookup("QUIZ_RESULTS_FILE")
                .unwrap_or_else(|| "data/results.json".to_string())
                .into(),
            dialogue_db: lookup("QUIZ_DIALOGUE_DB").unwrap_or_else(|| "db.sqlite".to_string()),
            quiz_length,
        })
    }

    /// Creates empty question and result files when they are missing.
    pub fn ensure_data_files(&self) -> Result<(), ConfigError> {
        create_if_missing(&self.questions_file, EMPTY_BANK)?;
        create_if_missing(&self.results_file, EMPTY_RESULTS)?;
        Ok(())
    }
}

fn create_if_missing(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    info!("created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::quiz::bank::QuestionBank;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.quiz_length, 10);
        assert_eq!(config.questions_file, PathBuf::from("data/questions.json"));
        assert_eq!(config.results_file, PathBuf::from("data/results.json"));
        assert_eq!(config.dialogue_db, "db.sqlite");
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("QUIZ_LENGTH", "5"),
            ("QUIZ_QUESTIONS_FILE", "/tmp/q.json"),
            ("QUIZ_DIALOGUE_DB", "state.db"),
        ]))
        .unwrap();
        assert_eq!(config.quiz_length, 5);
        assert_eq!(config.questions_file, PathBuf::from("/tmp/q.json"));
        assert_eq!(config.dialogue_db, "state.db");
    }

    #[test]
    fn rejects_bad_length() {
        for bad in ["0", "ten", "-3"] {
            let err = Config::from_lookup(lookup(&[("QUIZ_LENGTH", bad)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidNumber { .. }));
        }
    }

    #[test]
    fn bootstraps_missing_files_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            questions_file: dir.path().join("data/questions.json"),
            results_file: dir.path().join("data/results.json"),
            dialogue_db: "db.sqlite".into(),
            quiz_length: 10,
        };
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(&config.results_file, "{\"ana\": []}").unwrap();

        config.ensure_data_files().unwrap();

        assert!(QuestionBank::open(&config.questions_file).unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(&config.results_file).unwrap(),
            "{\"ana\": []}"
        );
    }
}
