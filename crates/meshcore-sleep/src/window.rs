//! Deterministic listening-window calculator (`spec.md` §4.5).
//!
//! A sleeping agent cannot be reached at arbitrary times; instead each agent
//! has a short, deterministically-placed listening window inside every
//! cycle, derived from its own `AgentID` so peers can predict it without any
//! coordination.

use std::time::Duration;

use meshcore_proto::AgentId;

/// Default cycle length: the period after which an agent's window repeats.
pub const DEFAULT_CYCLE_LENGTH: Duration = Duration::from_secs(5 * 60);
/// Default window length: how long the agent listens within each cycle.
pub const DEFAULT_WINDOW_LENGTH: Duration = Duration::from_secs(30);
/// Default clock tolerance: safety margin shaved off both ends of the window.
pub const DEFAULT_CLOCK_TOLERANCE: Duration = Duration::from_secs(5);

/// Configuration for [`WindowCalculator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Period after which the window repeats.
    pub cycle_length: Duration,
    /// How long the window stays open within each cycle.
    pub window_length: Duration,
    /// Safety margin added to both ends of the window when computing
    /// [`WindowInfo::safe_start_unix_ms`]/[`WindowInfo::safe_end_unix_ms`], to
    /// absorb clock skew between peers.
    pub clock_tolerance: Duration,
    /// Epoch windows are computed relative to, in milliseconds since the
    /// Unix epoch.
    pub epoch_unix_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            cycle_length: DEFAULT_CYCLE_LENGTH,
            window_length: DEFAULT_WINDOW_LENGTH,
            clock_tolerance: DEFAULT_CLOCK_TOLERANCE,
            epoch_unix_ms: 0,
        }
    }
}

impl WindowConfig {
    /// Clamp `window_length` to at most `cycle_length / 6`, as a too-long
    /// window would leave no room for a deterministic offset within the
    /// cycle.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        let max_window = self.cycle_length / 6;
        if self.window_length > max_window {
            self.window_length = max_window;
        }
        self
    }
}

/// A concrete listening window, computed for one agent at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowInfo {
    /// Start of the window, in milliseconds since the Unix epoch.
    pub start_unix_ms: u64,
    /// End of the window (exclusive), in milliseconds since the Unix epoch.
    pub end_unix_ms: u64,
    /// Start of the window expanded outward by the clock tolerance: the
    /// earliest a peer with a skewed clock may reasonably believe the window
    /// has opened (`spec.md` §4.5: `SafeStart = Start − Tolerance`).
    pub safe_start_unix_ms: u64,
    /// End of the window expanded outward by the clock tolerance
    /// (`spec.md` §4.5: `SafeEnd = End + Tolerance`).
    pub safe_end_unix_ms: u64,
    /// Midpoint of the window.
    pub midpoint_unix_ms: u64,
}

impl WindowInfo {
    /// Whether `now_unix_ms` falls within `[safe_start, safe_end)`.
    #[must_use]
    pub fn currently_active(&self, now_unix_ms: u64) -> bool {
        (self.safe_start_unix_ms..self.safe_end_unix_ms).contains(&now_unix_ms)
    }

    /// Milliseconds until this window's safe start, `0` if already active or
    /// past.
    #[must_use]
    pub fn time_until_start_ms(&self, now_unix_ms: u64) -> u64 {
        self.safe_start_unix_ms.saturating_sub(now_unix_ms)
    }
}

/// Computes deterministic listening windows for a single agent.
#[derive(Debug, Clone, Copy)]
pub struct WindowCalculator {
    config: WindowConfig,
    /// Per-agent seed: `upper64(agent_id) XOR lower64(agent_id)`.
    seed: u64,
}

impl WindowCalculator {
    /// Build a calculator for `agent_id` under `config` (clamped via
    /// [`WindowConfig::clamped`]).
    #[must_use]
    pub fn new(agent_id: AgentId, config: WindowConfig) -> Self {
        Self { config: config.clamped(), seed: agent_id.upper64() ^ agent_id.lower64() }
    }

    /// The window offset within a cycle, in milliseconds, deterministic per
    /// agent and bounded so the window never crosses a cycle boundary.
    fn offset_ms(&self) -> u64 {
        let cycle_ms = self.config.cycle_length.as_millis() as u64;
        let window_ms = self.config.window_length.as_millis() as u64;
        let span = cycle_ms.saturating_sub(window_ms).saturating_add(1).max(1);
        self.seed % span
    }

    /// The window containing or following `now_unix_ms`.
    #[must_use]
    pub fn window_at(&self, now_unix_ms: u64) -> WindowInfo {
        let cycle_ms = self.config.cycle_length.as_millis() as u64;
        let window_ms = self.config.window_length.as_millis() as u64;
        let tolerance_ms = self.config.clock_tolerance.as_millis() as u64;
        let offset = self.offset_ms();

        let elapsed = now_unix_ms.saturating_sub(self.config.epoch_unix_ms);
        let cycle_index = if cycle_ms == 0 { 0 } else { elapsed / cycle_ms };
        let cycle_start = self.config.epoch_unix_ms + cycle_index * cycle_ms;

        let mut start = cycle_start + offset;
        let mut end = start + window_ms;

        // If `now` is already past this cycle's window, advance to the next
        // cycle's window instead of returning a window in the past.
        if now_unix_ms >= end {
            start += cycle_ms;
            end += cycle_ms;
        }

        WindowInfo {
            start_unix_ms: start,
            end_unix_ms: end,
            safe_start_unix_ms: start.saturating_sub(tolerance_ms),
            safe_end_unix_ms: end + tolerance_ms,
            midpoint_unix_ms: start + window_ms / 2,
        }
    }
}
