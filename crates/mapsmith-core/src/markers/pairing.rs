//! Two-phase placement of linked teleport markers.

use super::{Marker, MarkerId, MarkerMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Visual line joining the two halves of a teleport pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connector {
    /// Point A.
    pub from: MarkerId,
    /// Point B.
    pub to: MarkerId,
}

impl Connector {
    pub fn involves(&self, id: MarkerId) -> bool {
        self.from == id || self.to == id
    }
}

/// Where the pairing state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingState {
    #[default]
    Idle,
    /// Point A exists and the next teleport placement completes the pair.
    AwaitingPointB { point_a: MarkerId, pair_id: u64 },
}

/// Outcome of placing a teleport marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingEvent {
    PointAPlaced { point_a: MarkerId, pair_id: u64 },
    PairCompleted { connector: Connector, pair_id: u64 },
}

/// Owns the pending-pair pointer and the connectors between pairs.
///
/// Markers themselves live in the document; links between them are ids, so
/// nothing here ever holds a live cycle.
#[derive(Debug, Clone, Default)]
pub struct TeleportPairing {
    state: PairingState,
    next_pair_id: u64,
    connectors: Vec<Connector>,
}

impl TeleportPairing {
    pub fn new() -> Self {
        Self {
            state: PairingState::Idle,
            next_pair_id: 1,
            connectors: Vec::new(),
        }
    }

    pub fn state(&self) -> PairingState {
        self.state
    }

    /// The pending point A, if a pair is half placed.
    pub fn pending(&self) -> Option<MarkerId> {
        match self.state {
            PairingState::AwaitingPointB { point_a, .. } => Some(point_a),
            PairingState::Idle => None,
        }
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn connector_for(&self, id: MarkerId) -> Option<Connector> {
        self.connectors.iter().copied().find(|c| c.involves(id))
    }

    fn allocate_pair_id(&mut self) -> u64 {
        let id = self.next_pair_id.max(1);
        self.next_pair_id = id + 1;
        id
    }

    /// Register a freshly inserted teleport marker.
    ///
    /// The first placement becomes point A; the second completes the pair,
    /// links both back references and creates the connector.
    pub fn place(&mut self, markers: &mut MarkerMap, marker_id: MarkerId) -> PairingEvent {
        if let PairingState::AwaitingPointB { point_a, pair_id } = self.state {
            if markers.contains_key(&point_a) && point_a != marker_id {
                return self.complete(markers, point_a, marker_id, pair_id);
            }
            log::warn!("Pending teleport {} vanished, starting a new pair", point_a);
        }

        let pair_id = self.allocate_pair_id();
        if let Some(marker) = markers.get_mut(&marker_id) {
            marker.data.pair_id = Some(pair_id);
            marker.data.is_point_a = true;
            marker.data.has_pair = false;
            marker.data.paired_marker = None;
        }
        self.state = PairingState::AwaitingPointB {
            point_a: marker_id,
            pair_id,
        };
        log::debug!("Teleport point A {} placed (pair {})", marker_id, pair_id);
        PairingEvent::PointAPlaced {
            point_a: marker_id,
            pair_id,
        }
    }

    fn complete(
        &mut self,
        markers: &mut MarkerMap,
        point_a: MarkerId,
        point_b: MarkerId,
        pair_id: u64,
    ) -> PairingEvent {
        link(markers, point_a, point_b, pair_id);
        let connector = Connector {
            from: point_a,
            to: point_b,
        };
        self.connectors.push(connector);
        self.state = PairingState::Idle;
        log::debug!("Teleport pair {} linked: {} <-> {}", pair_id, point_a, point_b);
        PairingEvent::PairCompleted { connector, pair_id }
    }

    /// Abandon a half-placed pair, removing the orphaned point A.
    pub fn cancel(&mut self, markers: &mut MarkerMap) -> Option<Marker> {
        let PairingState::AwaitingPointB { point_a, .. } = self.state else {
            return None;
        };
        self.state = PairingState::Idle;
        let removed = markers.remove(&point_a);
        if removed.is_some() {
            log::debug!("Discarded unpaired teleport {}", point_a);
        }
        removed
    }

    /// Clean up after a marker was removed from the map.
    ///
    /// Clears the partner's back reference and returns the connectors that
    /// were dropped.
    pub fn on_removed(&mut self, markers: &mut MarkerMap, removed: &Marker) -> Vec<Connector> {
        if self.pending() == Some(removed.id) {
            self.state = PairingState::Idle;
        }

        if let Some(partner_id) = removed.data.paired_marker {
            match markers.get_mut(&partner_id) {
                Some(partner) => partner.clear_pair(),
                None => log::warn!(
                    "Teleport {} was paired with missing marker {}",
                    removed.id,
                    partner_id
                ),
            }
        }

        let (dropped, kept): (Vec<_>, Vec<_>) = self
            .connectors
            .drain(..)
            .partition(|c| c.involves(removed.id));
        self.connectors = kept;
        dropped
    }

    /// Make a lone point A that was never paired the pending half again.
    ///
    /// Undo and redo can bring back a point A whose pair was never completed.
    /// Does nothing while another pair is pending. Returns the adopted marker.
    pub fn resume_pending(&mut self, markers: &MarkerMap) -> Option<MarkerId> {
        if self.pending().is_some() {
            return None;
        }
        let shares_pair = |id: MarkerId, pair_id: u64| {
            markers
                .values()
                .any(|m| m.id != id && m.is_teleport() && m.data.pair_id == Some(pair_id))
        };
        let (point_a, pair_id) = markers
            .values()
            .filter(|m| m.is_teleport() && m.data.is_point_a && !m.data.has_pair)
            .filter_map(|m| m.data.pair_id.map(|pair_id| (m.id, pair_id)))
            .filter(|&(id, pair_id)| !shares_pair(id, pair_id))
            .min()?;

        self.state = PairingState::AwaitingPointB { point_a, pair_id };
        log::debug!("Teleport {} is pending again (pair {})", point_a, pair_id);
        Some(point_a)
    }

    /// Rebuild back references and connectors from persisted `pair_id`s.
    ///
    /// Markers whose partner is missing are kept but left unpaired. A pending
    /// point A that is still present and still alone stays pending. Returns
    /// the number of pairs linked.
    pub fn reconstruct(&mut self, markers: &mut MarkerMap) -> usize {
        let pending = self.pending();
        self.state = PairingState::Idle;
        self.connectors.clear();

        let mut groups: BTreeMap<u64, Vec<MarkerId>> = BTreeMap::new();
        for marker in markers.values_mut().filter(|m| m.is_teleport()) {
            marker.data.paired_marker = None;
            match marker.data.pair_id {
                Some(pair_id) => groups.entry(pair_id).or_default().push(marker.id),
                None => marker.data.has_pair = false,
            }
        }

        let floor = groups.keys().next_back().map_or(1, |max| max + 1);
        self.next_pair_id = self.next_pair_id.max(floor);

        let mut linked = 0;
        for (pair_id, mut ids) in groups {
            ids.sort_unstable();
            if ids.len() == 1 && pending == Some(ids[0]) {
                self.state = PairingState::AwaitingPointB {
                    point_a: ids[0],
                    pair_id,
                };
                continue;
            }
            if ids.len() < 2 {
                for id in &ids {
                    log::warn!("Teleport {} has no partner for pair {}, leaving it unpaired", id, pair_id);
                    if let Some(marker) = markers.get_mut(id) {
                        marker.data.has_pair = false;
                    }
                }
                continue;
            }
            if ids.len() > 2 {
                log::warn!(
                    "Pair {} has {} teleports, linking the first two",
                    pair_id,
                    ids.len()
                );
                for id in &ids[2..] {
                    if let Some(marker) = markers.get_mut(id) {
                        marker.clear_pair();
                    }
                }
            }

            let (first, second) = (ids[0], ids[1]);
            let first_is_a = markers.get(&first).is_some_and(|m| m.data.is_point_a);
            let second_is_a = markers.get(&second).is_some_and(|m| m.data.is_point_a);
            let (point_a, point_b) = if second_is_a && !first_is_a {
                (second, first)
            } else {
                (first, second)
            };

            link(markers, point_a, point_b, pair_id);
            self.connectors.push(Connector {
                from: point_a,
                to: point_b,
            });
            linked += 1;
        }
        linked
    }
}

fn link(markers: &mut MarkerMap, point_a: MarkerId, point_b: MarkerId, pair_id: u64) {
    for (id, partner, is_a) in [(point_a, point_b, true), (point_b, point_a, false)] {
        if let Some(marker) = markers.get_mut(&id) {
            marker.data.pair_id = Some(pair_id);
            marker.data.is_point_a = is_a;
            marker.data.has_pair = true;
            marker.data.paired_marker = Some(partner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerKind;
    use kurbo::Point;

    fn add_teleport(markers: &mut MarkerMap, id: MarkerId) {
        markers.insert(id, Marker::new(id, MarkerKind::Teleport, Point::new(id as f64, 0.0)));
    }

    #[test]
    fn test_two_placements_link_pair() {
        let mut markers = MarkerMap::new();
        let mut pairing = TeleportPairing::new();

        add_teleport(&mut markers, 1);
        let event = pairing.place(&mut markers, 1);
        assert!(matches!(event, PairingEvent::PointAPlaced { point_a: 1, .. }));
        assert_eq!(pairing.pending(), Some(1));

        add_teleport(&mut markers, 2);
        let event = pairing.place(&mut markers, 2);
        assert!(matches!(event, PairingEvent::PairCompleted { .. }));
        assert_eq!(pairing.state(), PairingState::Idle);

        assert_eq!(markers[&1].paired_marker(), Some(2));
        assert_eq!(markers[&2].paired_marker(), Some(1));
        assert!(markers[&1].data.is_point_a);
        assert!(!markers[&2].data.is_point_a);
        assert!(markers[&1].data.has_pair && markers[&2].data.has_pair);
        assert_eq!(markers[&1].data.pair_id, markers[&2].data.pair_id);
        assert_eq!(pairing.connectors(), &[Connector { from: 1, to: 2 }]);
    }

    #[test]
    fn test_removing_point_a_unlinks_point_b() {
        let mut markers = MarkerMap::new();
        let mut pairing = TeleportPairing::new();
        add_teleport(&mut markers, 1);
        pairing.place(&mut markers, 1);
        add_teleport(&mut markers, 2);
        pairing.place(&mut markers, 2);

        let removed = markers.remove(&1).unwrap();
        let dropped = pairing.on_removed(&mut markers, &removed);

        assert_eq!(dropped, vec![Connector { from: 1, to: 2 }]);
        assert!(pairing.connectors().is_empty());
        assert!(!markers[&2].data.has_pair);
        assert_eq!(markers[&2].paired_marker(), None);
    }

    #[test]
    fn test_cancel_discards_pending_point_a() {
        let mut markers = MarkerMap::new();
        let mut pairing = TeleportPairing::new();
        add_teleport(&mut markers, 1);
        pairing.place(&mut markers, 1);

        let discarded = pairing.cancel(&mut markers).unwrap();
        assert_eq!(discarded.id, 1);
        assert!(markers.is_empty());
        assert_eq!(pairing.state(), PairingState::Idle);
        assert!(pairing.cancel(&mut markers).is_none());
    }

    #[test]
    fn test_removing_pending_clears_state() {
        let mut markers = MarkerMap::new();
        let mut pairing = TeleportPairing::new();
        add_teleport(&mut markers, 1);
        pairing.place(&mut markers, 1);

        let removed = markers.remove(&1).unwrap();
        assert!(pairing.on_removed(&mut markers, &removed).is_empty());
        assert_eq!(pairing.pending(), None);

        // The next placement starts a fresh pair.
        add_teleport(&mut markers, 2);
        assert!(matches!(
            pairing.place(&mut markers, 2),
            PairingEvent::PointAPlaced { point_a: 2, .. }
        ));
    }

    #[test]
    fn test_pair_ids_are_unique() {
        let mut markers = MarkerMap::new();
        let mut pairing = TeleportPairing::new();
        for id in 1..=4 {
            add_teleport(&mut markers, id);
            pairing.place(&mut markers, id);
        }
        assert_ne!(markers[&1].data.pair_id, markers[&3].data.pair_id);
        assert_eq!(pairing.connectors().len(), 2);
    }

    #[test]
    fn test_reconstruct_keeps_pending_point_a() {
        let mut markers = MarkerMap::new();
        let mut pairing = TeleportPairing::new();
        add_teleport(&mut markers, 1);
        pairing.place(&mut markers, 1);

        assert_eq!(pairing.reconstruct(&mut markers), 0);
        assert_eq!(pairing.pending(), Some(1));

        add_teleport(&mut markers, 2);
        assert!(matches!(
            pairing.place(&mut markers, 2),
            PairingEvent::PairCompleted { .. }
        ));
    }

    #[test]
    fn test_reconstruct_from_pair_ids() {
        let mut markers = MarkerMap::new();
        for id in [10, 11, 12, 13] {
            add_teleport(&mut markers, id);
        }
        // Pair 5: point A is the higher id.
        markers.get_mut(&10).unwrap().data.pair_id = Some(5);
        let b = markers.get_mut(&11).unwrap();
        b.data.pair_id = Some(5);
        b.data.is_point_a = true;
        // Pair 9 lost its partner.
        let orphan = markers.get_mut(&12).unwrap();
        orphan.data.pair_id = Some(9);
        orphan.data.has_pair = true;

        let mut pairing = TeleportPairing::new();
        assert_eq!(pairing.reconstruct(&mut markers), 1);

        assert_eq!(pairing.connectors(), &[Connector { from: 11, to: 10 }]);
        assert_eq!(markers[&10].paired_marker(), Some(11));
        assert_eq!(markers[&11].paired_marker(), Some(10));
        assert!(!markers[&10].data.is_point_a);
        assert!(!markers[&12].data.has_pair);
        assert_eq!(markers[&12].paired_marker(), None);
        assert_eq!(markers[&13].paired_marker(), None);

        // New pairs never reuse a persisted pair id.
        add_teleport(&mut markers, 20);
        let PairingEvent::PointAPlaced { pair_id, .. } = pairing.place(&mut markers, 20) else {
            panic!("expected point A");
        };
        assert_eq!(pair_id, 10);
    }

    #[test]
    fn test_resume_pending_adopts_unfinished_point_a() {
        let mut markers = MarkerMap::new();
        let mut pairing = TeleportPairing::new();
        add_teleport(&mut markers, 1);
        pairing.place(&mut markers, 1);
        add_teleport(&mut markers, 2);
        pairing.place(&mut markers, 2);
        add_teleport(&mut markers, 3);
        pairing.place(&mut markers, 3);

        // A fresh session only sees the persisted fields.
        let mut restored = TeleportPairing::new();
        restored.reconstruct(&mut markers);
        assert_eq!(restored.state(), PairingState::Idle);
        assert_eq!(restored.resume_pending(&markers), Some(3));
        assert_eq!(restored.pending(), Some(3));

        // A survivor of a deleted pair is not adopted.
        let removed = markers.remove(&3).unwrap();
        restored.on_removed(&mut markers, &removed);
        let removed = markers.remove(&1).unwrap();
        restored.on_removed(&mut markers, &removed);
        assert_eq!(restored.resume_pending(&markers), None);
        assert_eq!(restored.state(), PairingState::Idle);
    }
}
