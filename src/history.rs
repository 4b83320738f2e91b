use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;

use crate::error::StorageError;
use crate::quiz::ResultEntry;

/// Append-only log of finished attempts, kept per user.
pub trait HistoryStore: Send + Sync {
    fn append(&self, user_id: &str, entry: &ResultEntry) -> Result<(), StorageError>;

    /// Every entry for `user_id`, oldest first. Unknown users have an empty history.
    fn read_all(&self, user_id: &str) -> Result<Vec<ResultEntry>, StorageError>;
}

type Histories = BTreeMap<String, Vec<ResultEntry>>;

/// All users' histories in one JSON object keyed by user id.
pub struct JsonHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Histories, StorageError> {
        if !self.path.exists() {
            return Ok(Histories::new());
        }
        let file = File::open(&self.path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn save(&self, histories: &Histories) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, histories)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl HistoryStore for JsonHistoryStore {
    fn append(&self, user_id: &str, entry: &ResultEntry) -> Result<(), StorageError> {
        // Held across the whole read-modify-write so concurrent appends can't drop each other.
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;

        let mut histories = self.load()?;
        let history = histories.entry(user_id.to_string()).or_default();
        history.push(entry.clone());
        debug!("{} now has {} results", user_id, history.len());

        self.save(&histories)
    }

    fn read_all(&self, user_id: &str) -> Result<Vec<ResultEntry>, StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.load()?.remove(user_id).unwrap_or_default())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryHistoryStore {
    histories: Mutex<Histories>,
}

#[cfg(test)]
impl HistoryStore for MemoryHistoryStore {
    fn append(&self, user_id: &str, entry: &ResultEntry) -> Result<(), StorageError> {
        let mut histories = self.histories.lock().map_err(|_| StorageError::Poisoned)?;
        histories
            .entry(user_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn read_all(&self, user_id: &str) -> Result<Vec<ResultEntry>, StorageError> {
        let histories = self.histories.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(histories.get(user_id).cloned().unwrap_or_default())
    }
}

/// Rejects every write, for exercising retry paths.
#[cfg(test)]
pub struct FailingHistoryStore;

#[cfg(test)]
impl HistoryStore for FailingHistoryStore {
    fn append(&self, _user_id: &str, _entry: &ResultEntry) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk full")))
    }

    fn read_all(&self, _user_id: &str) -> Result<Vec<ResultEntry>, StorageError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn entry(score: u32) -> ResultEntry {
        ResultEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            total_answered: 10,
            correct_count: 7,
            estimated_score: score,
            suggestion: "keep going".into(),
            answers: vec![],
        }
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("results.json"));
        assert!(store.read_all("nobody").unwrap().is_empty());
    }

    #[test]
    fn append_then_read_returns_entry_last() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("data/results.json"));

        store.append("ana", &entry(100)).unwrap();
        store.append("bruno", &entry(90)).unwrap();
        store.append("ana", &entry(120)).unwrap();

        let ana = store.read_all("ana").unwrap();
        assert_eq!(ana.len(), 2);
        assert_eq!(ana.last(), Some(&entry(120)));
        assert_eq!(store.read_all("bruno").unwrap(), vec![entry(90)]);
    }

    #[test]
    fn reads_the_original_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(
            &path,
            r#"{"ana": [{"date": "2024-05-01T12:00:00Z", "total": 1, "correct": 1, "iq": 120,
                "suggestion": "s", "answers": [{"question_id": "b1", "text": "t",
                "selected": "0", "correct": true, "level": "basico", "options": ["a", "b"]}]}]}"#,
        )
        .unwrap();

        let history = JsonHistoryStore::new(&path).read_all("ana").unwrap();
        assert_eq!(history[0].estimated_score, 120);
        assert!(history[0].answers[0].is_correct);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, "not json").unwrap();
        let store = JsonHistoryStore::new(&path);
        assert!(matches!(store.read_all("ana"), Err(StorageError::Json(_))));
        assert!(store.append("ana", &entry(100)).is_err());
    }

    #[test]
    fn concurrent_appends_keep_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonHistoryStore::new(dir.path().join("results.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for n in 0..5 {
                        store.append(&format!("user{}", i), &entry(80 + n)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..8 {
            assert_eq!(store.read_all(&format!("user{}", i)).unwrap().len(), 5);
        }
    }
}
