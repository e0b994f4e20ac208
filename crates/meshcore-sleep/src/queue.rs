//! Per-peer buffering of gossip updates that arrive while an agent is
//! sleeping, delivered as a single [`QueuedState`] the next time that peer's
//! listening window opens (`spec.md` §4.4).

use std::collections::HashMap;

use meshcore_proto::{
    AgentId,
    payloads::{
        routing::{NodeInfoAdvertise, RouteAdvertise, RouteWithdraw},
        sleep::{QueuedState, SleepCommand, WakeCommand},
    },
};

use crate::config::DEFAULT_QUEUE_CAPACITY;

/// Counts of buffered entries, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Number of distinct peers with buffered state.
    pub peers: usize,
    /// Total entries buffered across all peers (route advertises, withdraws,
    /// and node info advertises, not counting pending sleep/wake commands).
    pub total_entries: usize,
}

/// Buffers [`QueuedState`] per peer while that peer is unreachable, capping
/// each category at `capacity` entries with oldest-first eviction so a
/// sleeping peer that never wakes cannot grow the buffer without bound.
#[derive(Debug)]
pub struct StateQueue {
    capacity: usize,
    by_peer: HashMap<AgentId, QueuedState>,
}

impl Default for StateQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

fn push_capped<T>(entries: &mut Vec<T>, entry: T, capacity: usize) {
    entries.push(entry);
    while entries.len() > capacity {
        entries.remove(0);
    }
}

impl StateQueue {
    /// An empty queue, capping each peer's per-category entries at
    /// `capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, by_peer: HashMap::new() }
    }

    /// Buffer a route advertisement for `peer`.
    pub fn push_route_advertise(&mut self, peer: AgentId, advertise: RouteAdvertise) {
        let entry = self.by_peer.entry(peer).or_default();
        push_capped(&mut entry.route_advertises, advertise, self.capacity);
    }

    /// Buffer a route withdrawal for `peer`.
    pub fn push_route_withdraw(&mut self, peer: AgentId, withdraw: RouteWithdraw) {
        let entry = self.by_peer.entry(peer).or_default();
        push_capped(&mut entry.route_withdraws, withdraw, self.capacity);
    }

    /// Buffer a node info advertisement for `peer`.
    pub fn push_node_info_advertise(&mut self, peer: AgentId, advertise: NodeInfoAdvertise) {
        let entry = self.by_peer.entry(peer).or_default();
        push_capped(&mut entry.node_info_advertises, advertise, self.capacity);
    }

    /// Record a sleep command queued for `peer`, replacing any previously
    /// queued sleep command.
    pub fn set_pending_sleep(&mut self, peer: AgentId, command: SleepCommand) {
        self.by_peer.entry(peer).or_default().pending_sleep = Some(command);
    }

    /// Record a wake command queued for `peer`, replacing any previously
    /// queued wake command.
    pub fn set_pending_wake(&mut self, peer: AgentId, command: WakeCommand) {
        self.by_peer.entry(peer).or_default().pending_wake = Some(command);
    }

    /// Whether any state is currently buffered for `peer`.
    #[must_use]
    pub fn has_state_for(&self, peer: AgentId) -> bool {
        self.by_peer.get(&peer).is_some_and(|queued| {
            !queued.route_advertises.is_empty()
                || !queued.route_withdraws.is_empty()
                || !queued.node_info_advertises.is_empty()
                || queued.pending_sleep.is_some()
                || queued.pending_wake.is_some()
        })
    }

    /// Remove and return all state buffered for `peer`, if any. Intended to
    /// be called once a peer's listening window opens and the buffered
    /// updates are about to be delivered.
    pub fn get_and_clear(&mut self, peer: AgentId) -> Option<QueuedState> {
        self.by_peer.remove(&peer)
    }

    /// Snapshot counts across all buffered peers.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let total_entries = self
            .by_peer
            .values()
            .map(|queued| queued.route_advertises.len() + queued.route_withdraws.len() + queued.node_info_advertises.len())
            .sum();
        QueueStats { peers: self.by_peer.len(), total_entries }
    }
}

#[cfg(test)]
mod tests {
    use meshcore_proto::{AgentId, payloads::routing::RoutePrefix};

    use super::*;

    fn agent(byte: u8) -> AgentId {
        AgentId::from_bytes([byte; 16])
    }

    fn withdraw(sequence: u64) -> RouteWithdraw {
        RouteWithdraw {
            origin: agent(1),
            sequence,
            routes: vec![meshcore_proto::payloads::routing::Route { prefix_len: 24, prefix: RoutePrefix::Ipv4([10, 0, 0, 0]), metric: 1 }],
            seen_by: vec![],
        }
    }

    #[test]
    fn has_state_for_tracks_presence_and_clear_empties_it() {
        let mut queue = StateQueue::default();
        let peer = agent(9);
        assert!(!queue.has_state_for(peer));
        queue.push_route_withdraw(peer, withdraw(1));
        assert!(queue.has_state_for(peer));
        let drained = queue.get_and_clear(peer).expect("present");
        assert_eq!(drained.route_withdraws.len(), 1);
        assert!(!queue.has_state_for(peer));
        assert!(queue.get_and_clear(peer).is_none());
    }

    #[test]
    fn per_peer_category_is_capped_with_oldest_first_eviction() {
        let mut queue = StateQueue::new(2);
        let peer = agent(1);
        queue.push_route_withdraw(peer, withdraw(1));
        queue.push_route_withdraw(peer, withdraw(2));
        queue.push_route_withdraw(peer, withdraw(3));
        let drained = queue.get_and_clear(peer).expect("present");
        assert_eq!(drained.route_withdraws.len(), 2);
        assert_eq!(drained.route_withdraws[0].sequence, 2);
        assert_eq!(drained.route_withdraws[1].sequence, 3);
    }

    #[test]
    fn stats_counts_peers_and_entries() {
        let mut queue = StateQueue::default();
        queue.push_route_withdraw(agent(1), withdraw(1));
        queue.push_route_withdraw(agent(1), withdraw(2));
        queue.push_route_withdraw(agent(2), withdraw(3));
        let stats = queue.stats();
        assert_eq!(stats.peers, 2);
        assert_eq!(stats.total_entries, 3);
    }
}
