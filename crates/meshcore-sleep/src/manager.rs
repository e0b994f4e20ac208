//! Orchestrates the sleep/wake state machine: timer-driven scheduling,
//! persistence, callback dispatch, command dedup, and per-peer queuing.
//!
//! Follows the driver pattern used elsewhere in the agent: pure state
//! ([`SleepState`]) lives behind a lock, and every public method translates
//! the [`SleepAction`]s it returns into concrete side effects (persistence
//! writes, callback invocations) right away. A lock-free [`AtomicU8`] mirrors
//! the current [`AgentState`] so callers that only need to know whether an
//! agent is sleeping never contend with an in-flight transition. The
//! background tasks spawned by [`SleepManager::spawn_auto_sleep`],
//! [`SleepManager::spawn_poll_loop`], and [`SleepManager::spawn_dedup_sweep`]
//! select against a `watch` channel so [`SleepManager::stop`] can cancel them
//! promptly.

use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use meshcore_proto::{
    AgentId,
    payloads::{
        routing::{NodeInfoAdvertise, RouteAdvertise, RouteWithdraw},
        sleep::{QueuedState, SignedCommand, SleepCommand, WakeCommand},
    },
};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    callbacks::SleepCallbacks,
    clock::Clock,
    config::SleepConfig,
    dedup::SeenCommands,
    error::{Result, SleepError},
    persistence::SleepStatePersistence,
    queue::{QueueStats, StateQueue},
    state::{AgentState, SleepAction, SleepState},
    window::{WindowCalculator, WindowInfo},
};

fn encode_state(state: AgentState) -> u8 {
    match state {
        AgentState::Awake => 0,
        AgentState::Sleeping => 1,
        AgentState::Polling => 2,
    }
}

/// Ties the sleep state machine to a clock, a persistence backend, and a set
/// of lifecycle callbacks for one agent.
pub struct SleepManager<C: Clock, P: SleepStatePersistence, CB: SleepCallbacks> {
    agent_id: AgentId,
    config: SleepConfig,
    clock: Arc<C>,
    persistence: P,
    callbacks: Arc<CB>,
    window: WindowCalculator,
    state_hint: AtomicU8,
    inner: tokio::sync::Mutex<SleepState>,
    queue: std::sync::RwLock<StateQueue>,
    dedup: std::sync::RwLock<SeenCommands>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl<C: Clock, P: SleepStatePersistence, CB: SleepCallbacks> SleepManager<C, P, CB> {
    /// Build a manager for `agent_id`, restoring state from `persistence` if
    /// any was saved from a previous run.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted state exists but cannot be read.
    pub fn new(agent_id: AgentId, config: SleepConfig, clock: Arc<C>, persistence: P, callbacks: Arc<CB>) -> Result<Arc<Self>> {
        let state = persistence.load()?.unwrap_or_default();
        let window = WindowCalculator::new(agent_id, config.window);
        let (stop_tx, stop_rx) = watch::channel(false);
        Ok(Arc::new(Self {
            agent_id,
            config,
            clock,
            persistence,
            callbacks,
            window,
            state_hint: AtomicU8::new(encode_state(state.state())),
            inner: tokio::sync::Mutex::new(state),
            queue: std::sync::RwLock::new(StateQueue::new(config.max_items_per_peer)),
            dedup: std::sync::RwLock::new(SeenCommands::new()),
            stop_tx,
            stop_rx,
        }))
    }

    /// The agent this manager is hibernating on behalf of.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Current hibernation state. Lock-free: does not contend with an
    /// in-flight transition on another task.
    #[must_use]
    pub fn state(&self) -> AgentState {
        match self.state_hint.load(Ordering::Acquire) {
            1 => AgentState::Sleeping,
            2 => AgentState::Polling,
            _ => AgentState::Awake,
        }
    }

    async fn apply(&self, guard: &SleepState, actions: Vec<SleepAction>) -> Result<()> {
        let agent_id = self.agent_id;
        let new_state = guard.state();
        self.state_hint.store(encode_state(new_state), Ordering::Release);
        tracing::debug!(?agent_id, ?new_state, "agent state transition");
        for action in actions {
            match action {
                SleepAction::PersistState => {
                    if let Err(err) = self.persistence.store(guard) {
                        tracing::warn!(?agent_id, %err, "failed to persist sleep state");
                        return Err(err);
                    }
                }
                SleepAction::InvokeOnSleep => self.callbacks.on_sleep().map_err(SleepError::CallbackFailed)?,
                SleepAction::InvokeOnWake => self.callbacks.on_wake().map_err(SleepError::CallbackFailed)?,
                SleepAction::InvokeOnPoll => self.callbacks.on_poll().map_err(SleepError::CallbackFailed)?,
                SleepAction::InvokeOnPollEnd => self.callbacks.on_poll_end().map_err(SleepError::CallbackFailed)?,
            }
        }
        Ok(())
    }

    /// Transition to [`AgentState::Sleeping`].
    ///
    /// # Errors
    ///
    /// Returns [`SleepError::NotEnabled`] if sleep is disabled in
    /// configuration, or [`SleepError::AlreadySleeping`] if not currently
    /// [`AgentState::Awake`].
    pub async fn sleep(&self) -> Result<()> {
        if !self.config.enabled {
            return Err(SleepError::NotEnabled);
        }
        let now = self.clock.now_unix_ms();
        let mut guard = self.inner.lock().await;
        let actions = guard.sleep(now)?;
        self.apply(&guard, actions).await
    }

    /// Transition directly to [`AgentState::Awake`], as if `command_id` was
    /// just accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SleepError::NotSleeping`] if already awake.
    pub async fn wake(&self, command_id: u64) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let actions = guard.wake(command_id)?;
        self.apply(&guard, actions).await
    }

    /// Transition `Sleeping -> Polling`.
    ///
    /// # Errors
    ///
    /// Returns [`SleepError::NotSleeping`] unless currently sleeping.
    pub async fn begin_poll(&self) -> Result<()> {
        let now = self.clock.now_unix_ms();
        let mut guard = self.inner.lock().await;
        let actions = guard.begin_poll(now)?;
        self.apply(&guard, actions).await
    }

    /// Transition out of [`AgentState::Polling`], to `Awake` if `woken` or
    /// back to `Sleeping` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SleepError::NotSleeping`] unless currently polling.
    pub async fn end_poll(&self, woken: bool) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let actions = guard.end_poll(woken)?;
        self.apply(&guard, actions).await
    }

    /// This agent's deterministic listening window containing or following
    /// `now_unix_ms`.
    #[must_use]
    pub fn window_at(&self, now_unix_ms: u64) -> WindowInfo {
        self.window.window_at(now_unix_ms)
    }

    /// Handle a sleep command received from a peer, applying it unless its
    /// `(origin, command_id)` pair has already been seen.
    ///
    /// Returns `true` if the command was newly applied.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::sleep`], except that a stale
    /// re-delivery (the agent is already in the target state) is swallowed.
    pub async fn handle_sleep_command(&self, command: &SleepCommand, now_unix_ms: u64) -> Result<bool> {
        self.handle_signed_command(&command.0, now_unix_ms, |manager| Box::pin(async move { manager.sleep().await })).await
    }

    /// Handle a wake command received from a peer, applying it unless its
    /// `(origin, command_id)` pair has already been seen.
    ///
    /// Returns `true` if the command was newly applied.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::wake`], except for a stale
    /// re-delivery, which is ignored.
    pub async fn handle_wake_command(&self, command: &WakeCommand, now_unix_ms: u64) -> Result<bool> {
        let command_id = command.0.command_id;
        self.handle_signed_command(&command.0, now_unix_ms, move |manager| Box::pin(async move { manager.wake(command_id).await }))
            .await
    }

    async fn handle_signed_command<'a, F>(&'a self, command: &SignedCommand, now_unix_ms: u64, apply: F) -> Result<bool>
    where
        F: FnOnce(&'a Self) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>,
    {
        let newly_seen = {
            #[allow(clippy::unwrap_used, reason = "dedup map's RwLock is never held across a panic point")]
            self.dedup.write().unwrap().record(command.origin, command.command_id, now_unix_ms)
        };
        if !newly_seen {
            tracing::debug!(origin = ?command.origin, command_id = command.command_id, "dropped duplicate signed command");
            return Ok(false);
        }
        match apply(self).await {
            Ok(()) | Err(SleepError::AlreadySleeping(_) | SleepError::NotSleeping(_)) => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// Remove entries from the dedup tracker older than the configured
    /// expiry.
    pub fn sweep_dedup(&self, now_unix_ms: u64) {
        #[allow(clippy::unwrap_used, reason = "dedup map's RwLock is never held across a panic point")]
        self.dedup
            .write()
            .unwrap()
            .sweep(now_unix_ms, u64::try_from(self.config.dedup_expiry.as_millis()).unwrap_or(u64::MAX));
    }

    /// Buffer a route advertisement for `peer`, to be delivered the next
    /// time its listening window is known to be open.
    pub fn enqueue_route_advertise(&self, peer: AgentId, advertise: RouteAdvertise) {
        #[allow(clippy::unwrap_used, reason = "queue's RwLock is never held across a panic point")]
        self.queue.write().unwrap().push_route_advertise(peer, advertise);
    }

    /// Buffer a route withdrawal for `peer`.
    pub fn enqueue_route_withdraw(&self, peer: AgentId, withdraw: RouteWithdraw) {
        #[allow(clippy::unwrap_used, reason = "queue's RwLock is never held across a panic point")]
        self.queue.write().unwrap().push_route_withdraw(peer, withdraw);
    }

    /// Buffer a node info advertisement for `peer`.
    pub fn enqueue_node_info_advertise(&self, peer: AgentId, advertise: NodeInfoAdvertise) {
        #[allow(clippy::unwrap_used, reason = "queue's RwLock is never held across a panic point")]
        self.queue.write().unwrap().push_node_info_advertise(peer, advertise);
    }

    /// Drain and return everything buffered for `peer`.
    #[must_use]
    pub fn drain_for_peer(&self, peer: AgentId) -> Option<QueuedState> {
        #[allow(clippy::unwrap_used, reason = "queue's RwLock is never held across a panic point")]
        self.queue.write().unwrap().get_and_clear(peer)
    }

    /// Snapshot of the buffered-queue sizes, for diagnostics.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        #[allow(clippy::unwrap_used, reason = "queue's RwLock is never held across a panic point")]
        self.queue.read().unwrap().stats()
    }

    /// Signal every task spawned by [`Self::spawn_auto_sleep`],
    /// [`Self::spawn_poll_loop`], and [`Self::spawn_dedup_sweep`] to stop at
    /// their next checkpoint.
    pub fn stop(&self) {
        let _ignore_no_receivers = self.stop_tx.send(true);
    }

    /// Spawn a background task that sleeps this agent after
    /// `config.auto_sleep_delay`, if sleep is enabled.
    pub fn spawn_auto_sleep(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut stop_rx = self.stop_rx.clone();
        tokio::spawn(async move {
            if !manager.config.enabled || !manager.config.auto_sleep_on_start {
                return;
            }
            tokio::select! {
                () = tokio::time::sleep(manager.config.auto_sleep_delay) => {}
                _ = stop_rx.changed() => return,
            }
            if let Err(err) = manager.sleep().await {
                tracing::warn!("auto-sleep failed: {err}");
            }
        })
    }

    /// Spawn a background task that opens and closes this agent's listening
    /// window once per cycle for as long as the agent remains sleeping,
    /// using the real clock (`tokio::time::sleep`, not the injected
    /// [`Clock`], since only [`C`] is abstracted for testing the window
    /// math, not the driver loop).
    pub fn spawn_poll_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut stop_rx = self.stop_rx.clone();
        tokio::spawn(async move {
            loop {
                if manager.state() != AgentState::Sleeping {
                    break;
                }
                let now = manager.clock.now_unix_ms();
                let window = manager.window_at(now);

                tokio::select! {
                    () = tokio::time::sleep(std::time::Duration::from_millis(window.time_until_start_ms(now))) => {}
                    _ = stop_rx.changed() => break,
                }

                if let Err(err) = manager.begin_poll().await {
                    tracing::warn!("failed to begin poll window: {err}");
                    break;
                }

                let window_now = manager.clock.now_unix_ms();
                tokio::select! {
                    () = tokio::time::sleep(std::time::Duration::from_millis(window.end_unix_ms.saturating_sub(window_now))) => {}
                    _ = stop_rx.changed() => break,
                }

                if manager.state() == AgentState::Polling {
                    if let Err(err) = manager.end_poll(false).await {
                        tracing::warn!("failed to end poll window: {err}");
                        break;
                    }
                }
            }
        })
    }

    /// Spawn a background task that periodically sweeps expired entries out
    /// of the seen-command dedup tracker, every `config.dedup_sweep_interval`
    /// (`spec.md` §4.3: "background sweep every 5 minutes").
    pub fn spawn_dedup_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut stop_rx = self.stop_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(manager.config.dedup_sweep_interval) => {}
                    _ = stop_rx.changed() => break,
                }
                let now = manager.clock.now_unix_ms();
                manager.sweep_dedup(now);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{callbacks::NoopCallbacks, clock::ManualClock, persistence::MemoryStatePersistence};

    fn agent(byte: u8) -> AgentId {
        AgentId::from_bytes([byte; 16])
    }

    fn command(origin: AgentId, command_id: u64) -> SignedCommand {
        SignedCommand { origin, command_id, timestamp: 0, signature: [0; 64], seen_by: vec![] }
    }

    fn enabled_manager() -> Arc<SleepManager<ManualClock, MemoryStatePersistence, NoopCallbacks>> {
        let config = SleepConfig { enabled: true, ..SleepConfig::default() };
        SleepManager::new(agent(1), config, Arc::new(ManualClock::new(0)), MemoryStatePersistence::default(), Arc::new(NoopCallbacks))
            .expect("new manager")
    }

    #[tokio::test]
    async fn sleep_requires_config_enabled() {
        let config = SleepConfig { enabled: false, ..SleepConfig::default() };
        let manager =
            SleepManager::new(agent(1), config, Arc::new(ManualClock::new(0)), MemoryStatePersistence::default(), Arc::new(NoopCallbacks))
                .expect("new manager");
        assert!(matches!(manager.sleep().await, Err(SleepError::NotEnabled)));
    }

    #[tokio::test]
    async fn sleep_then_wake_round_trips_through_manager() {
        let manager = enabled_manager();
        assert_eq!(manager.state(), AgentState::Awake);
        manager.sleep().await.expect("sleep");
        assert_eq!(manager.state(), AgentState::Sleeping);
        manager.wake(1).await.expect("wake");
        assert_eq!(manager.state(), AgentState::Awake);
    }

    #[tokio::test]
    async fn persists_state_across_a_fresh_manager_instance() {
        let persistence = MemoryStatePersistence::default();
        let config = SleepConfig { enabled: true, ..SleepConfig::default() };
        let clock = Arc::new(ManualClock::new(0));
        let first = SleepManager::new(agent(2), config, Arc::clone(&clock), persistence.clone(), Arc::new(NoopCallbacks)).expect("first");
        first.sleep().await.expect("sleep");

        let second = SleepManager::new(agent(2), config, clock, persistence, Arc::new(NoopCallbacks)).expect("second");
        assert_eq!(second.state(), AgentState::Sleeping);
    }

    #[tokio::test]
    async fn duplicate_sleep_command_is_ignored() {
        let manager = enabled_manager();
        let cmd = SleepCommand(command(agent(9), 5));
        assert!(manager.handle_sleep_command(&cmd, 0).await.expect("first application"));
        assert!(!manager.handle_sleep_command(&cmd, 1).await.expect("duplicate is ignored"));
        assert_eq!(manager.state(), AgentState::Sleeping);
    }

    #[tokio::test]
    async fn wake_command_wakes_a_sleeping_agent() {
        let manager = enabled_manager();
        manager.sleep().await.expect("sleep");
        let cmd = WakeCommand(command(agent(9), 7));
        assert!(manager.handle_wake_command(&cmd, 0).await.expect("apply wake"));
        assert_eq!(manager.state(), AgentState::Awake);
    }

    #[tokio::test]
    async fn queue_round_trips_through_the_manager() {
        let manager = enabled_manager();
        let peer = agent(3);
        assert!(manager.drain_for_peer(peer).is_none());
        manager.enqueue_route_withdraw(peer, RouteWithdraw { origin: agent(1), sequence: 1, routes: vec![], seen_by: vec![] });
        let drained = manager.drain_for_peer(peer).expect("drained");
        assert_eq!(drained.route_withdraws.len(), 1);
    }

    #[tokio::test]
    async fn stop_halts_the_poll_loop() {
        let manager = enabled_manager();
        manager.sleep().await.expect("sleep");
        let handle = manager.spawn_poll_loop();
        manager.stop();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle).await.expect("loop exits promptly").expect("task did not panic");
    }

    #[tokio::test]
    async fn stop_halts_the_dedup_sweep_loop() {
        let manager = enabled_manager();
        let handle = manager.spawn_dedup_sweep();
        manager.stop();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle).await.expect("loop exits promptly").expect("task did not panic");
    }
}
