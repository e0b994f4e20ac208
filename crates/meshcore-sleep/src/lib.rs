//! Sleep/wake hibernation subsystem for overlay-mesh agents.
//!
//! An agent with hibernation enabled spends most of its time
//! [`state::AgentState::Sleeping`], waking briefly on a deterministic,
//! per-agent schedule ([`window::WindowCalculator`]) to check for queued
//! commands, and fully waking when an explicit, signed
//! [`meshcore_proto::payloads::sleep::WakeCommand`] arrives. Gossip updates
//! addressed to a sleeping peer are buffered ([`queue::StateQueue`]) rather
//! than dropped, and delivered as a single batch the next time that peer is
//! reachable.

pub mod callbacks;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod manager;
pub mod persistence;
pub mod queue;
pub mod state;
pub mod window;

pub use callbacks::{NoopCallbacks, SleepCallbacks};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SleepConfig;
pub use dedup::SeenCommands;
pub use error::{Result, SleepError};
pub use manager::SleepManager;
pub use persistence::{FileStatePersistence, MemoryStatePersistence, SleepStatePersistence};
pub use queue::{QueueStats, StateQueue};
pub use state::{AgentState, SleepAction, SleepState};
pub use window::{WindowCalculator, WindowConfig, WindowInfo};
