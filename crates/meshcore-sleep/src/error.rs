//! Error types for the sleep/wake hibernation subsystem.

use std::io;

use thiserror::Error;

use crate::state::AgentState;

/// Errors produced by the sleep manager.
#[derive(Error, Debug)]
pub enum SleepError {
    /// A sleep was requested while the agent was already sleeping or polling.
    #[error("cannot sleep from state {0:?}")]
    AlreadySleeping(AgentState),

    /// A wake was requested while the agent was already awake.
    #[error("cannot wake from state {0:?}")]
    NotSleeping(AgentState),

    /// Sleep was requested while the feature is disabled in configuration.
    #[error("sleep is not enabled for this agent")]
    NotEnabled,

    /// Reading or writing the persisted state file failed.
    #[error("sleep state persistence failed: {0}")]
    Persistence(#[from] io::Error),

    /// The persisted state file's JSON did not parse.
    #[error("sleep state file is corrupt: {0}")]
    CorruptState(#[from] serde_json::Error),

    /// A registered callback (`on_sleep`/`on_wake`/`on_poll`/`on_poll_end`)
    /// returned an error.
    #[error("sleep callback failed: {0}")]
    CallbackFailed(String),
}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SleepError>;
