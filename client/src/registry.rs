//! Local view of every peer in the session
//!
//! The registry is plain data: it knows nothing about sockets or visual
//! representations. It is mutated from the network (joins, departures,
//! moves, snapshots) and from local input (the self peer's position), and
//! reports exactly which ids changed so the caller can keep per-peer
//! resources in step.

use crate::error::RegistryError;
use log::debug;
use shared::{Peer, PeerId, Position, SessionState};
use std::collections::{BTreeSet, HashSet};

/// Ids added and removed by one [`PeerRegistry::reconcile`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub joined: BTreeSet<PeerId>,
    pub left: BTreeSet<PeerId>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Mapping of peer id to peer state, with the local player pinned
///
/// The self peer is always present and always listed first. Remote peers
/// keep the order in which they were first seen. No two entries share an id.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    self_peer: Peer,
    others: Vec<Peer>,
}

impl PeerRegistry {
    pub fn new(self_peer: Peer) -> Self {
        Self {
            self_peer,
            others: Vec::new(),
        }
    }

    pub fn self_peer(&self) -> &Peer {
        &self.self_peer
    }

    pub fn self_id(&self) -> PeerId {
        self.self_peer.id
    }

    pub fn get(&self, id: PeerId) -> Option<&Peer> {
        if id == self.self_peer.id {
            Some(&self.self_peer)
        } else {
            self.others.iter().find(|p| p.id == id)
        }
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.get(id).is_some()
    }

    /// All ids, self first
    pub fn ids(&self) -> Vec<PeerId> {
        std::iter::once(self.self_peer.id)
            .chain(self.others.iter().map(|p| p.id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.others.len() + 1
    }

    /// Always false; the self peer cannot be removed
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn snapshot(&self) -> SessionState {
        let mut players = Vec::with_capacity(self.len());
        players.push(self.self_peer.clone());
        players.extend(self.others.iter().cloned());
        SessionState::new(players)
    }

    /// Inserts a peer that is not yet known
    ///
    /// Re-adding a known id is rejected and leaves the existing entry,
    /// including its position, untouched.
    pub fn add(&mut self, peer: Peer) -> Result<(), RegistryError> {
        if self.contains(peer.id) {
            return Err(RegistryError::AlreadyExists(peer.id));
        }
        debug!("Registry: added peer {}", peer.id);
        self.others.push(peer);
        Ok(())
    }

    pub fn remove(&mut self, id: PeerId) -> Result<Peer, RegistryError> {
        if id == self.self_peer.id {
            return Err(RegistryError::SelfPeer(id));
        }
        let index = self
            .others
            .iter()
            .position(|p| p.id == id)
            .ok_or(RegistryError::UnknownPeer(id))?;
        debug!("Registry: removed peer {}", id);
        Ok(self.others.remove(index))
    }

    pub fn update_position(&mut self, id: PeerId, position: Position) -> Result<(), RegistryError> {
        let peer = if id == self.self_peer.id {
            &mut self.self_peer
        } else {
            self.others
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(RegistryError::UnknownPeer(id))?
        };
        peer.position = position;
        Ok(())
    }

    pub fn move_self(&mut self, position: Position) {
        self.self_peer.position = position;
    }

    /// Diffs the registry against a full incoming view and applies the result
    ///
    /// Ids only in `incoming` are added with their incoming position. Ids only
    /// held locally are removed, except the self peer. Positions of ids on both
    /// sides are left alone; moves travel as their own messages. Duplicate ids
    /// inside `incoming` count once, first occurrence wins.
    pub fn reconcile(&mut self, incoming: &SessionState) -> Reconciliation {
        let mut outcome = Reconciliation::default();
        let incoming_ids: HashSet<PeerId> = incoming.ids().collect();

        self.others.retain(|peer| {
            let keep = incoming_ids.contains(&peer.id);
            if !keep {
                outcome.left.insert(peer.id);
            }
            keep
        });

        for peer in &incoming.players {
            if !self.contains(peer.id) {
                outcome.joined.insert(peer.id);
                self.others.push(peer.clone());
            }
        }

        if !outcome.is_empty() {
            debug!(
                "Registry: reconciled snapshot, joined {:?}, left {:?}",
                outcome.joined, outcome.left
            );
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn peer(id: PeerId) -> Peer {
        Peer::new(id, Position::default())
    }

    fn state(ids: &[PeerId]) -> SessionState {
        SessionState::new(ids.iter().map(|&id| peer(id)).collect())
    }

    fn sorted_ids(registry: &PeerRegistry) -> Vec<PeerId> {
        let mut ids = registry.ids();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_registry_starts_with_self() {
        let registry = PeerRegistry::new(Peer::new(7, Position::new(1.0, 2.0, 3.0)));
        assert_eq!(registry.ids(), vec![7]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.self_id(), 7);
        assert_eq!(registry.self_peer().position, Position::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_add_new_peer() {
        let mut registry = PeerRegistry::new(peer(1));
        assert_eq!(registry.add(peer(2)), Ok(()));
        assert_eq!(registry.ids(), vec![1, 2]);
    }

    #[test]
    fn test_add_existing_peer_is_rejected() {
        let mut registry = PeerRegistry::new(peer(1));
        registry.add(Peer::new(2, Position::new(5.0, 5.0, 5.0))).unwrap();

        assert_eq!(
            registry.add(Peer::new(2, Position::new(9.0, 9.0, 9.0))),
            Err(RegistryError::AlreadyExists(2))
        );
        assert_eq!(registry.add(peer(1)), Err(RegistryError::AlreadyExists(1)));
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(2).unwrap().position,
            Position::new(5.0, 5.0, 5.0)
        );
    }

    #[test]
    fn test_remove_peer() {
        let mut registry = PeerRegistry::new(peer(1));
        registry.add(peer(2)).unwrap();

        let removed = registry.remove(2).unwrap();
        assert_eq!(removed.id, 2);
        assert_eq!(registry.ids(), vec![1]);
    }

    #[test]
    fn test_remove_unknown_peer_leaves_state() {
        let mut registry = PeerRegistry::new(peer(1));
        registry.add(peer(2)).unwrap();

        assert_eq!(registry.remove(99), Err(RegistryError::UnknownPeer(99)));
        assert_eq!(registry.ids(), vec![1, 2]);
    }

    #[test]
    fn test_remove_self_is_rejected() {
        let mut registry = PeerRegistry::new(peer(1));
        assert_eq!(registry.remove(1), Err(RegistryError::SelfPeer(1)));
        assert!(registry.contains(1));
    }

    #[test]
    fn test_update_position() {
        let mut registry = PeerRegistry::new(peer(1));
        registry.add(peer(2)).unwrap();

        registry
            .update_position(2, Position::new(4.0, 5.0, 6.0))
            .unwrap();
        assert_eq!(registry.get(2).unwrap().position, Position::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_update_position_unknown_peer() {
        let mut registry = PeerRegistry::new(peer(1));
        let before = registry.snapshot();

        assert_eq!(
            registry.update_position(3, Position::new(1.0, 1.0, 1.0)),
            Err(RegistryError::UnknownPeer(3))
        );
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn test_move_self() {
        let mut registry = PeerRegistry::new(peer(1));
        registry.move_self(Position::new(0.5, 0.0, -0.5));
        assert_eq!(registry.self_peer().position, Position::new(0.5, 0.0, -0.5));
        assert_eq!(registry.snapshot().players[0].position, Position::new(0.5, 0.0, -0.5));
    }

    #[test]
    fn test_reconcile_joins_and_departures() {
        let mut registry = PeerRegistry::new(peer(2));
        registry.add(peer(1)).unwrap();
        registry.add(peer(3)).unwrap();

        let outcome = registry.reconcile(&state(&[2, 3, 4]));

        assert_eq!(outcome.joined, BTreeSet::from([4]));
        assert_eq!(outcome.left, BTreeSet::from([1]));
        assert_eq!(sorted_ids(&registry), vec![2, 3, 4]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut registry = PeerRegistry::new(peer(2));
        registry.add(peer(1)).unwrap();
        let incoming = state(&[2, 5, 6]);

        let first = registry.reconcile(&incoming);
        assert!(!first.is_empty());

        let second = registry.reconcile(&incoming);
        assert!(second.is_empty());
        assert_eq!(sorted_ids(&registry), vec![2, 5, 6]);
    }

    #[test]
    fn test_reconcile_keeps_self_when_snapshot_omits_it() {
        let mut registry = PeerRegistry::new(peer(1));
        registry.add(peer(2)).unwrap();

        let outcome = registry.reconcile(&state(&[2, 3]));

        assert!(!outcome.left.contains(&1));
        assert_eq!(outcome.joined, BTreeSet::from([3]));
        assert_eq!(registry.ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_reconcile_departure_set_never_names_self() {
        // Self is the id the snapshot drops; only the remote departure counts.
        let mut registry = PeerRegistry::new(peer(1));
        registry.add(peer(2)).unwrap();
        registry.add(peer(3)).unwrap();

        let outcome = registry.reconcile(&state(&[2, 3, 4]));

        assert_eq!(outcome.joined, BTreeSet::from([4]));
        assert!(outcome.left.is_empty());
        assert_eq!(sorted_ids(&registry), vec![1, 2, 3, 4]);
        assert_eq!(registry.self_id(), 1);

        // A later snapshot that includes self changes nothing for it.
        let again = registry.reconcile(&state(&[1, 2, 3, 4]));
        assert!(again.is_empty());
    }

    #[test]
    fn test_reconcile_ignores_position_differences() {
        let mut registry = PeerRegistry::new(peer(1));
        registry.add(Peer::new(2, Position::new(1.0, 1.0, 1.0))).unwrap();

        let incoming = SessionState::new(vec![
            Peer::new(1, Position::new(50.0, 50.0, 50.0)),
            Peer::new(2, Position::new(9.0, 9.0, 9.0)),
        ]);
        let outcome = registry.reconcile(&incoming);

        assert!(outcome.is_empty());
        assert_eq!(registry.self_peer().position, Position::default());
        assert_eq!(registry.get(2).unwrap().position, Position::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_reconcile_takes_incoming_position_for_new_peers() {
        let mut registry = PeerRegistry::new(peer(1));
        let incoming = SessionState::new(vec![Peer::new(8, Position::new(3.0, 2.0, 1.0))]);

        registry.reconcile(&incoming);

        assert_eq!(registry.get(8).unwrap().position, Position::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn test_reconcile_collapses_duplicate_incoming_ids() {
        let mut registry = PeerRegistry::new(peer(1));
        let incoming = SessionState::new(vec![
            Peer::new(4, Position::new(1.0, 0.0, 0.0)),
            Peer::new(4, Position::new(2.0, 0.0, 0.0)),
        ]);

        let outcome = registry.reconcile(&incoming);

        assert_eq!(outcome.joined, BTreeSet::from([4]));
        assert_eq!(registry.ids(), vec![1, 4]);
        assert_eq!(registry.get(4).unwrap().position, Position::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_snapshot_lists_self_first() {
        let mut registry = PeerRegistry::new(peer(9));
        registry.add(peer(3)).unwrap();
        registry.add(peer(5)).unwrap();

        let ids: Vec<PeerId> = registry.snapshot().ids().collect();
        assert_eq!(ids, vec![9, 3, 5]);
    }

    #[test]
    fn test_random_interleavings_never_duplicate_ids() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let self_id = rng.gen_range(0..8);
            let mut registry = PeerRegistry::new(peer(self_id));

            for _ in 0..50 {
                let before: BTreeSet<PeerId> = registry.ids().into_iter().collect();

                match rng.gen_range(0..3) {
                    0 => {
                        let _ = registry.add(peer(rng.gen_range(0..8)));
                    }
                    1 => {
                        let _ = registry.remove(rng.gen_range(0..8));
                    }
                    _ => {
                        let count = rng.gen_range(0..6);
                        let ids: Vec<PeerId> = (0..count).map(|_| rng.gen_range(0..8)).collect();
                        let outcome = registry.reconcile(&state(&ids));

                        let after: BTreeSet<PeerId> = registry.ids().into_iter().collect();
                        let expected: BTreeSet<PeerId> = before
                            .difference(&outcome.left)
                            .copied()
                            .chain(outcome.joined.iter().copied())
                            .collect();
                        assert_eq!(after, expected);
                        assert!(outcome.joined.is_disjoint(&before));
                        assert!(outcome.left.is_subset(&before));
                    }
                }

                let ids = registry.ids();
                let unique: HashSet<PeerId> = ids.iter().copied().collect();
                assert_eq!(unique.len(), ids.len(), "duplicate id in {:?}", ids);
                assert!(registry.contains(self_id));
            }
        }
    }
}
