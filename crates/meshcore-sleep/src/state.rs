//! Pure sleep/wake state machine (`spec.md` §4.3).
//!
//! Like the session layer's `Connection`, this is I/O-free: methods take the
//! current time and return the list of [`SleepAction`]s the driver
//! ([`crate::manager::SleepManager`]) must execute. Keeping the transition
//! logic pure makes every state/time combination directly testable without a
//! runtime.

use crate::error::{Result, SleepError};

/// Hibernation state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Fully participating in the mesh.
    Awake,
    /// Hibernating outside its listening window.
    Sleeping,
    /// Inside its listening window, checking for queued commands.
    Polling,
}

/// Side effects the driver must perform after a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepAction {
    /// Persist the current state to disk.
    PersistState,
    /// Invoke the `on_sleep` callback.
    InvokeOnSleep,
    /// Invoke the `on_wake` callback.
    InvokeOnWake,
    /// Invoke the `on_poll` callback (window opened).
    InvokeOnPoll,
    /// Invoke the `on_poll_end` callback (window closed).
    InvokeOnPollEnd,
}

/// The sleep manager's persisted/observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepState {
    state: AgentState,
    sleep_start_time_unix_ms: Option<u64>,
    last_poll_time_unix_ms: Option<u64>,
    command_seq: u64,
}

impl Default for SleepState {
    fn default() -> Self {
        Self { state: AgentState::Awake, sleep_start_time_unix_ms: None, last_poll_time_unix_ms: None, command_seq: 0 }
    }
}

impl SleepState {
    /// Reconstruct state as persisted (used by [`crate::persistence`]).
    #[must_use]
    pub const fn from_parts(
        state: AgentState,
        sleep_start_time_unix_ms: Option<u64>,
        last_poll_time_unix_ms: Option<u64>,
        command_seq: u64,
    ) -> Self {
        Self { state, sleep_start_time_unix_ms, last_poll_time_unix_ms, command_seq }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// When the agent most recently entered [`AgentState::Sleeping`].
    #[must_use]
    pub const fn sleep_start_time_unix_ms(&self) -> Option<u64> {
        self.sleep_start_time_unix_ms
    }

    /// When the agent most recently entered [`AgentState::Polling`].
    #[must_use]
    pub const fn last_poll_time_unix_ms(&self) -> Option<u64> {
        self.last_poll_time_unix_ms
    }

    /// Highest command id this agent has accepted, for dedup/idempotency.
    #[must_use]
    pub const fn command_seq(&self) -> u64 {
        self.command_seq
    }

    /// Transition `Awake -> Sleeping`.
    ///
    /// # Errors
    ///
    /// Returns [`SleepError::AlreadySleeping`] unless currently
    /// [`AgentState::Awake`].
    pub fn sleep(&mut self, now_unix_ms: u64) -> Result<Vec<SleepAction>> {
        if self.state != AgentState::Awake {
            return Err(SleepError::AlreadySleeping(self.state));
        }
        self.state = AgentState::Sleeping;
        self.sleep_start_time_unix_ms = Some(now_unix_ms);
        Ok(vec![SleepAction::InvokeOnSleep, SleepAction::PersistState])
    }

    /// Transition `Sleeping -> Polling`, marking the window as opened.
    ///
    /// # Errors
    ///
    /// Returns [`SleepError::NotSleeping`] unless currently
    /// [`AgentState::Sleeping`].
    pub fn begin_poll(&mut self, now_unix_ms: u64) -> Result<Vec<SleepAction>> {
        if self.state != AgentState::Sleeping {
            return Err(SleepError::NotSleeping(self.state));
        }
        self.state = AgentState::Polling;
        self.last_poll_time_unix_ms = Some(now_unix_ms);
        Ok(vec![SleepAction::InvokeOnPoll, SleepAction::PersistState])
    }

    /// Transition `Polling -> Sleeping` (no wake command was queued) or
    /// `Polling -> Awake` (a wake command was queued).
    ///
    /// # Errors
    ///
    /// Returns [`SleepError::NotSleeping`] unless currently
    /// [`AgentState::Polling`].
    pub fn end_poll(&mut self, woken: bool) -> Result<Vec<SleepAction>> {
        if self.state != AgentState::Polling {
            return Err(SleepError::NotSleeping(self.state));
        }
        let mut actions = vec![SleepAction::InvokeOnPollEnd];
        if woken {
            self.state = AgentState::Awake;
            self.sleep_start_time_unix_ms = None;
            actions.push(SleepAction::InvokeOnWake);
        } else {
            self.state = AgentState::Sleeping;
        }
        actions.push(SleepAction::PersistState);
        Ok(actions)
    }

    /// Transition directly to `Awake` from [`AgentState::Sleeping`] or
    /// [`AgentState::Polling`] (an explicit wake command arrived outside a
    /// poll window, e.g. delivered over an already-open connection).
    ///
    /// # Errors
    ///
    /// Returns [`SleepError::NotSleeping`] if already [`AgentState::Awake`].
    pub fn wake(&mut self, command_id: u64) -> Result<Vec<SleepAction>> {
        if self.state == AgentState::Awake {
            return Err(SleepError::NotSleeping(self.state));
        }
        self.state = AgentState::Awake;
        self.sleep_start_time_unix_ms = None;
        self.command_seq = self.command_seq.max(command_id);
        Ok(vec![SleepAction::InvokeOnWake, SleepAction::PersistState])
    }

    /// Record that `command_id` has been accepted, for dedup bookkeeping
    /// independent of a state transition.
    pub fn record_command_seq(&mut self, command_id: u64) {
        self.command_seq = self.command_seq.max(command_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awake_sleeps_once() {
        let mut s = SleepState::default();
        let actions = s.sleep(100).expect("awake can sleep");
        assert_eq!(s.state(), AgentState::Sleeping);
        assert_eq!(s.sleep_start_time_unix_ms(), Some(100));
        assert!(actions.contains(&SleepAction::InvokeOnSleep));
        assert!(matches!(s.sleep(200), Err(SleepError::AlreadySleeping(AgentState::Sleeping))));
    }

    #[test]
    fn full_poll_cycle_without_wake_returns_to_sleeping() {
        let mut s = SleepState::default();
        s.sleep(0).expect("sleep");
        s.begin_poll(300_000).expect("begin poll");
        assert_eq!(s.state(), AgentState::Polling);
        assert_eq!(s.last_poll_time_unix_ms(), Some(300_000));
        let actions = s.end_poll(false).expect("end poll");
        assert_eq!(s.state(), AgentState::Sleeping);
        assert!(!actions.contains(&SleepAction::InvokeOnWake));
    }

    #[test]
    fn poll_cycle_with_wake_command_wakes() {
        let mut s = SleepState::default();
        s.sleep(0).expect("sleep");
        s.begin_poll(300_000).expect("begin poll");
        let actions = s.end_poll(true).expect("end poll");
        assert_eq!(s.state(), AgentState::Awake);
        assert!(s.sleep_start_time_unix_ms().is_none());
        assert!(actions.contains(&SleepAction::InvokeOnWake));
    }

    #[test]
    fn explicit_wake_from_sleeping_or_polling() {
        let mut s = SleepState::default();
        s.sleep(0).expect("sleep");
        s.wake(5).expect("wake from sleeping");
        assert_eq!(s.state(), AgentState::Awake);
        assert_eq!(s.command_seq(), 5);

        s.sleep(10).expect("sleep again");
        s.begin_poll(20).expect("begin poll");
        s.wake(6).expect("wake from polling");
        assert_eq!(s.state(), AgentState::Awake);
        assert_eq!(s.command_seq(), 6);
    }

    #[test]
    fn cannot_wake_already_awake_agent() {
        let mut s = SleepState::default();
        assert!(matches!(s.wake(1), Err(SleepError::NotSleeping(AgentState::Awake))));
    }

    #[test]
    fn command_seq_never_decreases() {
        let mut s = SleepState::default();
        s.record_command_seq(10);
        s.record_command_seq(3);
        assert_eq!(s.command_seq(), 10);
    }
}
