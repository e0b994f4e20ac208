//! Lifecycle hooks the driver invokes around state transitions.
//!
//! Mirrors the split the transport layer uses between pure state (here,
//! [`crate::state::SleepState`]) and the environment it runs in: callers
//! plug in their own side effects (pausing peer connections, flushing
//! buffers) without the state machine itself depending on any of it.

/// Hooks invoked by [`crate::manager::SleepManager`] around sleep/wake/poll
/// transitions.
///
/// Default implementations are no-ops, so callers only override what they
/// need.
pub trait SleepCallbacks: Send + Sync + 'static {
    /// Called after the agent transitions into [`crate::state::AgentState::Sleeping`].
    ///
    /// # Errors
    ///
    /// An error here is surfaced to the caller of
    /// [`crate::manager::SleepManager::sleep`] as
    /// [`crate::error::SleepError::CallbackFailed`], but the state transition
    /// itself is not rolled back.
    fn on_sleep(&self) -> Result<(), String> {
        Ok(())
    }

    /// Called after the agent transitions into [`crate::state::AgentState::Awake`].
    ///
    /// # Errors
    ///
    /// See [`Self::on_sleep`].
    fn on_wake(&self) -> Result<(), String> {
        Ok(())
    }

    /// Called when a listening window opens, before checking for queued
    /// commands.
    ///
    /// # Errors
    ///
    /// See [`Self::on_sleep`].
    fn on_poll(&self) -> Result<(), String> {
        Ok(())
    }

    /// Called when a listening window closes.
    ///
    /// # Errors
    ///
    /// See [`Self::on_sleep`].
    fn on_poll_end(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A [`SleepCallbacks`] that does nothing, for agents that have no need to
/// react to hibernation transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl SleepCallbacks for NoopCallbacks {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;
    impl SleepCallbacks for Failing {
        fn on_sleep(&self) -> Result<(), String> {
            Err("boom".to_string())
        }
    }

    #[test]
    fn noop_callbacks_always_succeed() {
        let cb = NoopCallbacks;
        assert!(cb.on_sleep().is_ok());
        assert!(cb.on_wake().is_ok());
        assert!(cb.on_poll().is_ok());
        assert!(cb.on_poll_end().is_ok());
    }

    #[test]
    fn overridden_hook_can_fail() {
        assert!(Failing.on_sleep().is_err());
        assert!(Failing.on_wake().is_ok());
    }
}
