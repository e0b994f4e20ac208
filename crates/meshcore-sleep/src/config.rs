//! Sleep manager configuration (`spec.md` §4.1c, §4.3).

use std::{path::PathBuf, time::Duration};

use crate::window::WindowConfig;

/// Delay after startup before an agent with sleep enabled sleeps on its own
/// (`spec.md` §4.3).
pub const DEFAULT_AUTO_SLEEP_DELAY: Duration = Duration::from_secs(5);

/// Default cap on queued gossip entries held per sleeping agent (`spec.md`
/// §4.4).
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default sweep interval for expiring seen-command dedup entries.
pub const DEFAULT_DEDUP_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default expiry for seen-command dedup entries.
pub const DEFAULT_DEDUP_EXPIRY: Duration = Duration::from_secs(30 * 60);

/// Top-level sleep manager configuration.
#[derive(Debug, Clone, Copy)]
pub struct SleepConfig {
    /// Whether this agent participates in hibernation at all. When `false`,
    /// [`crate::manager::SleepManager::sleep`] always fails with
    /// [`crate::error::SleepError::NotEnabled`].
    pub enabled: bool,
    /// Listening-window placement. `window.cycle_length`/`window.window_length`
    /// are this agent's poll interval and poll duration.
    pub window: WindowConfig,
    /// Whether an agent with `enabled = true` sleeps on its own
    /// `auto_sleep_delay` after startup, versus waiting for an explicit
    /// sleep command.
    pub auto_sleep_on_start: bool,
    /// Delay after startup before auto-sleeping, if `auto_sleep_on_start`.
    pub auto_sleep_delay: Duration,
    /// Where persisted sleep state is stored. `None` disables persistence
    /// (state resets to `Awake` on every restart); a config loader is
    /// expected to turn this into a [`crate::persistence::FileStatePersistence`].
    pub state_file: Option<PathBuf>,
    /// Capacity of the per-agent queued-state buffer.
    pub max_items_per_peer: usize,
    /// How often the dedup map sweeps for expired entries.
    pub dedup_sweep_interval: Duration,
    /// How long a seen command id is remembered before it can be replayed.
    pub dedup_expiry: Duration,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window: WindowConfig::default(),
            auto_sleep_on_start: true,
            auto_sleep_delay: DEFAULT_AUTO_SLEEP_DELAY,
            state_file: None,
            max_items_per_peer: DEFAULT_QUEUE_CAPACITY,
            dedup_sweep_interval: DEFAULT_DEDUP_SWEEP_INTERVAL,
            dedup_expiry: DEFAULT_DEDUP_EXPIRY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_is_disabled_by_default() {
        assert!(!SleepConfig::default().enabled);
    }
}
