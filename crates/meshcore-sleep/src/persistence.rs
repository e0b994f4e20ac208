//! Durable storage for [`SleepState`] across agent restarts.
//!
//! Trait-based so tests and simulation can swap in an in-memory
//! implementation, the same shape the wider agent uses for its own
//! storage layer.

use std::{
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    state::{AgentState, SleepState},
};

/// Persists and restores [`SleepState`].
///
/// Implementations must be `Clone + Send + Sync` so a single persistence
/// handle can be shared across the manager's background tasks.
pub trait SleepStatePersistence: Clone + Send + Sync + 'static {
    /// Load the previously persisted state, or `None` if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<SleepState>>;

    /// Persist `state`, replacing whatever was stored previously.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn store(&self, state: &SleepState) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    state: PersistedAgentState,
    sleep_start_time: Option<chrono::DateTime<chrono::Utc>>,
    last_poll_time: Option<chrono::DateTime<chrono::Utc>>,
    command_seq: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PersistedAgentState {
    Awake,
    Sleeping,
    Polling,
}

impl From<AgentState> for PersistedAgentState {
    fn from(state: AgentState) -> Self {
        match state {
            AgentState::Awake => Self::Awake,
            AgentState::Sleeping => Self::Sleeping,
            AgentState::Polling => Self::Polling,
        }
    }
}

impl From<PersistedAgentState> for AgentState {
    fn from(state: PersistedAgentState) -> Self {
        match state {
            PersistedAgentState::Awake => Self::Awake,
            PersistedAgentState::Sleeping => Self::Sleeping,
            PersistedAgentState::Polling => Self::Polling,
        }
    }
}

fn unix_ms_to_datetime(unix_ms: u64) -> Option<chrono::DateTime<chrono::Utc>> {
    #[allow(clippy::cast_possible_wrap, reason = "unix ms fits in i64 until year 292 million")]
    chrono::DateTime::from_timestamp_millis(unix_ms as i64)
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "timestamps are always non-negative and within u64 range")]
fn datetime_to_unix_ms(dt: chrono::DateTime<chrono::Utc>) -> u64 {
    dt.timestamp_millis().max(0) as u64
}

impl From<&SleepState> for PersistedState {
    fn from(state: &SleepState) -> Self {
        Self {
            state: state.state().into(),
            sleep_start_time: state.sleep_start_time_unix_ms().and_then(unix_ms_to_datetime),
            last_poll_time: state.last_poll_time_unix_ms().and_then(unix_ms_to_datetime),
            command_seq: state.command_seq(),
        }
    }
}

impl From<PersistedState> for SleepState {
    fn from(persisted: PersistedState) -> Self {
        Self::from_parts(
            persisted.state.into(),
            persisted.sleep_start_time.map(datetime_to_unix_ms),
            persisted.last_poll_time.map(datetime_to_unix_ms),
            persisted.command_seq,
        )
    }
}

/// Persists state as JSON to a single file, writing atomically via a
/// temp-file-then-rename so a crash mid-write never leaves a truncated or
/// partially-written file behind.
#[derive(Debug, Clone)]
pub struct FileStatePersistence {
    path: PathBuf,
}

impl FileStatePersistence {
    /// Persist to `path`. The parent directory must already exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        let file_name = temp.file_name().map_or_else(|| "state".to_string(), |name| name.to_string_lossy().into_owned());
        temp.set_file_name(format!("{file_name}.tmp"));
        temp
    }
}

impl SleepStatePersistence for FileStatePersistence {
    fn load(&self) -> Result<Option<SleepState>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice::<PersistedState>(&bytes)?.into())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, state: &SleepState) -> Result<()> {
        let persisted = PersistedState::from(state);
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let temp_path = self.temp_path();
        write_restricted(&temp_path, &bytes)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn write_restricted(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = std::fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    io::Write::write_all(&mut file, bytes)
}

#[cfg(not(unix))]
fn write_restricted(path: &Path, bytes: &[u8]) -> io::Result<()> {
    std::fs::write(path, bytes)
}

/// An in-memory [`SleepStatePersistence`] for tests and simulation.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatePersistence {
    state: std::sync::Arc<std::sync::Mutex<Option<SleepState>>>,
}

impl SleepStatePersistence for MemoryStatePersistence {
    fn load(&self) -> Result<Option<SleepState>> {
        #[allow(clippy::unwrap_used, reason = "poisoned only if a prior store panicked, which it cannot")]
        Ok(*self.state.lock().unwrap())
    }

    fn store(&self, state: &SleepState) -> Result<()> {
        #[allow(clippy::unwrap_used, reason = "poisoned only if a prior store panicked, which it cannot")]
        let mut guard = self.state.lock().unwrap();
        *guard = Some(*state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_persistence_round_trips() {
        let store = MemoryStatePersistence::default();
        assert!(store.load().expect("load").is_none());
        let mut state = SleepState::default();
        state.sleep(1_000).expect("sleep");
        store.store(&state).expect("store");
        assert_eq!(store.load().expect("load").expect("present"), state);
    }

    #[test]
    fn file_persistence_round_trips_through_disk() {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("meshcore-sleep-test-{}-{unique}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("sleep_state.json");
        let store = FileStatePersistence::new(&path);

        assert!(store.load().expect("load missing").is_none());

        let mut state = SleepState::default();
        state.sleep(42).expect("sleep");
        store.store(&state).expect("store");

        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded, state);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }

        std::fs::remove_dir_all(&dir).ok();
    }
}
