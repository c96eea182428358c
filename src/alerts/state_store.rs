//! Last-alert persistence, one slot per ticker.

use crate::config::StateConfig;
use crate::error::AlertError;
use crate::models::alert::AlertState;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

pub trait AlertStateStore: Send + Sync {
    /// Last persisted state, `AlertState::None` when nothing was stored yet.
    fn get(&self, ticker: &str) -> Result<AlertState, AlertError>;

    fn set(&self, ticker: &str, state: AlertState) -> Result<(), AlertError>;
}

/// One flag file per ticker: `{dir}/{prefix}_{TICKER}` holding a single token.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
    prefix: String,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &StateConfig) -> Self {
        Self::new(config.dir.clone(), config.prefix.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ticker: &str) -> Result<PathBuf, AlertError> {
        validate_ticker(ticker)?;
        Ok(self.dir.join(format!("{}_{}", self.prefix, ticker)))
    }
}

fn validate_ticker(ticker: &str) -> Result<(), AlertError> {
    let invalid = ticker.is_empty()
        || ticker.contains(['/', '\\', '\0'])
        || ticker.contains("..")
        || ticker.chars().any(char::is_whitespace);
    if invalid {
        return Err(AlertError::InvalidSymbol {
            symbol: ticker.to_string(),
        });
    }
    Ok(())
}

impl AlertStateStore for FileStateStore {
    fn get(&self, ticker: &str) -> Result<AlertState, AlertError> {
        let path = self.path_for(ticker)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AlertState::None),
            Err(e) => {
                return Err(AlertError::StateStore(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        match contents.parse::<AlertState>() {
            Ok(state) => Ok(state),
            Err(reason) => {
                warn!(
                    ticker = %ticker,
                    path = %path.display(),
                    "{}; treating as none",
                    reason
                );
                Ok(AlertState::None)
            }
        }
    }

    fn set(&self, ticker: &str, state: AlertState) -> Result<(), AlertError> {
        let path = self.path_for(ticker)?;
        fs::create_dir_all(&self.dir).map_err(|e| {
            AlertError::StateStore(format!("failed to create {}: {}", self.dir.display(), e))
        })?;

        // Write-then-rename so a crash never leaves a half-written token.
        let tmp = self.dir.join(format!("{}_{}.tmp", self.prefix, ticker));
        fs::write(&tmp, state.as_token())
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| {
                AlertError::StateStore(format!("failed to write {}: {}", path.display(), e))
            })
    }
}

/// Process-local store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, AlertState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = (S, AlertState)>,
        S: Into<String>,
    {
        Self {
            states: RwLock::new(states.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl AlertStateStore for MemoryStateStore {
    fn get(&self, ticker: &str) -> Result<AlertState, AlertError> {
        let states = self
            .states
            .read()
            .map_err(|_| AlertError::StateStore("state lock poisoned".to_string()))?;
        Ok(states.get(ticker).copied().unwrap_or_default())
    }

    fn set(&self, ticker: &str, state: AlertState) -> Result<(), AlertError> {
        let mut states = self
            .states
            .write()
            .map_err(|_| AlertError::StateStore("state lock poisoned".to_string()))?;
        states.insert(ticker.to_string(), state);
        Ok(())
    }
}
