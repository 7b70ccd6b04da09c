use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{debug, info, instrument, warn};

const FILE_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HighScoreFile {
    version: u8,
    high_score: u64,
}

/// The single high-score counter behind the score service. Optionally
/// mirrored to a JSON file so it survives restarts.
#[derive(Debug)]
pub struct HighScoreStore {
    best: Mutex<u64>,
    file: Option<Arc<ScoreFile>>,
}

/// File mirror of the high score. Writes are serialized and never replace a
/// larger persisted value with a smaller one.
#[derive(Debug)]
struct ScoreFile {
    path: PathBuf,
    persisted: Mutex<u64>,
}

impl ScoreFile {
    fn persist(&self, high_score: u64) {
        let mut persisted = self.persisted.lock().unwrap_or_else(PoisonError::into_inner);
        if high_score <= *persisted {
            return;
        }
        if save_high_score(&self.path, high_score) {
            *persisted = high_score;
        }
    }
}

impl HighScoreStore {
    pub fn in_memory() -> Self {
        Self {
            best: Mutex::new(0),
            file: None,
        }
    }

    pub fn with_file(file_path: PathBuf) -> Self {
        let best = load_high_score(&file_path);
        info!(
            "Loaded high score {} from {}",
            best,
            file_path.display()
        );
        Self {
            best: Mutex::new(best),
            file: Some(Arc::new(ScoreFile {
                path: file_path,
                persisted: Mutex::new(best),
            })),
        }
    }

    pub fn high_score(&self) -> u64 {
        *self.best.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `candidate` and returns the resulting high score, the max of
    /// the stored value and the candidate. A new high score is written to the
    /// file on the blocking pool.
    #[instrument(level = "trace", skip(self))]
    pub async fn submit(&self, candidate: u64) -> u64 {
        let high_score = {
            let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
            if candidate <= *best {
                debug!("Candidate {} does not beat high score {}", candidate, *best);
                return *best;
            }
            info!("New high score: {} (was {})", candidate, *best);
            *best = candidate;
            candidate
        };

        if let Some(file) = &self.file {
            let file = Arc::clone(file);
            if let Err(error) = task::spawn_blocking(move || file.persist(high_score)).await {
                warn!("High score write task failed: {}", error);
            }
        }
        high_score
    }
}

fn load_high_score(path: &Path) -> u64 {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => {
            if error.kind() != ErrorKind::NotFound {
                warn!("Failed to read {}: {}", path.display(), error);
            }
            return 0;
        }
    };

    match serde_json::from_str::<HighScoreFile>(&text) {
        Ok(file) if file.version == FILE_VERSION => file.high_score,
        Ok(file) => {
            warn!(
                "Unsupported high score file version {} at {}",
                file.version,
                path.display()
            );
            0
        }
        Err(error) => {
            warn!("Failed to parse {}: {}", path.display(), error);
            0
        }
    }
}

fn save_high_score(path: &Path, high_score: u64) -> bool {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(error) = fs::create_dir_all(parent)
    {
        warn!("Failed to create {}: {}", parent.display(), error);
        return false;
    }

    let payload = HighScoreFile {
        version: FILE_VERSION,
        high_score,
    };
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => match fs::write(path, text) {
            Ok(()) => true,
            Err(error) => {
                warn!("Failed to write {}: {}", path.display(), error);
                false
            }
        },
        Err(error) => {
            warn!("Failed to serialize high score: {}", error);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use uuid::Uuid;

    use super::*;

    fn temp_path() -> PathBuf {
        env::temp_dir()
            .join(format!("minefield-{}", Uuid::new_v4()))
            .join("highscore.json")
    }

    #[tokio::test]
    async fn submit_keeps_the_maximum() {
        let store = HighScoreStore::in_memory();

        assert_eq!(store.submit(12).await, 12);
        assert_eq!(store.submit(5).await, 12);
        assert_eq!(store.submit(30).await, 30);
        assert_eq!(store.high_score(), 30);
    }

    #[tokio::test]
    async fn high_score_survives_reload() {
        let path = temp_path();

        let store = HighScoreStore::with_file(path.clone());
        assert_eq!(store.high_score(), 0);
        store.submit(77).await;

        let reloaded = HighScoreStore::with_file(path.clone());
        assert_eq!(reloaded.high_score(), 77);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submits_persist_the_maximum() {
        let path = temp_path();
        let store = HighScoreStore::with_file(path.clone());

        let results = tokio::join!(
            store.submit(10),
            store.submit(40),
            store.submit(25),
            store.submit(31),
        );

        assert_eq!(results.1, 40);
        assert_eq!(store.high_score(), 40);
        assert_eq!(HighScoreStore::with_file(path.clone()).high_score(), 40);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn corrupt_file_starts_from_zero() {
        let path = temp_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(&path, "not json").unwrap();

        let store = HighScoreStore::with_file(path.clone());
        assert_eq!(store.high_score(), 0);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}
