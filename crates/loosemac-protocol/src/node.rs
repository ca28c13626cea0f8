//! Per-node protocol state.
//!
//! A node is a plain aggregate: the tick loop and the state machine in
//! [`crate::fsm`] mutate it directly. The one structural invariant is the
//! **self-entry**: a node's marking vector always records the node itself
//! under its current slot. Both slot-selection paths re-establish it.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::slot::{Frame, Slot};

/// A unique node identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Claiming a slot; has not yet announced it this round.
    NotReady,
    /// Announced a claim; waiting one full frame for objections.
    Waiting,
    /// The claim survived a full frame. Terminal.
    Ready,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::NotReady => write!(f, "NOTREADY"),
            NodeState::Waiting => write!(f, "WAITING"),
            NodeState::Ready => write!(f, "READY"),
        }
    }
}

/// What a node believes each slot's owner to be.
///
/// Fixed-size, indexed by slot: entry σ holds the id last heard beaconing
/// in σ, or nothing. The entry for the node's own slot names the node
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkingVector {
    owners: Vec<Option<NodeId>>,
}

impl MarkingVector {
    /// An empty vector covering every slot of `frame`.
    pub fn new(frame: Frame) -> Self {
        Self {
            owners: vec![None; frame.lambda() as usize],
        }
    }

    fn index(slot: Slot) -> usize {
        (slot.value() - 1) as usize
    }

    /// The frame this vector covers.
    pub fn frame(&self) -> Frame {
        Frame::new(self.owners.len() as u64)
    }

    /// The recorded owner of `slot`, if any.
    pub fn owner(&self, slot: Slot) -> Option<NodeId> {
        self.owners[Self::index(slot)]
    }

    /// Write `owner` under `slot`, replacing any prior entry.
    pub fn set(&mut self, slot: Slot, owner: NodeId) {
        self.owners[Self::index(slot)] = Some(owner);
    }

    /// Remove the entry for `slot`, if any.
    pub fn clear(&mut self, slot: Slot) {
        self.owners[Self::index(slot)] = None;
    }

    /// Record `owner` under `slot`, evicting a stale entry for the same
    /// owner elsewhere. Senders move between slots; their old claim dies
    /// with the new beacon.
    pub fn record(&mut self, slot: Slot, owner: NodeId) {
        if let Some(stale) = self.slot_of(owner) {
            if stale != slot {
                self.clear(stale);
            }
        }
        self.set(slot, owner);
    }

    /// The slot currently recorded for `owner`, if any.
    pub fn slot_of(&self, owner: NodeId) -> Option<Slot> {
        self.owners
            .iter()
            .position(|entry| *entry == Some(owner))
            .map(|i| Slot(i as u64 + 1))
    }

    /// All slots with no recorded owner, ascending.
    pub fn free_slots(&self) -> Vec<Slot> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_none())
            .map(|(i, _)| Slot(i as u64 + 1))
            .collect()
    }

    /// Whether every slot has a recorded owner.
    pub fn is_saturated(&self) -> bool {
        self.owners.iter().all(|entry| entry.is_some())
    }

    /// All (slot, owner) entries, ascending by slot.
    pub fn entries(&self) -> impl Iterator<Item = (Slot, NodeId)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.map(|owner| (Slot(i as u64 + 1), owner)))
    }
}

/// A node in the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier.
    pub id: NodeId,
    /// One-hop adjacency, in declaration order.
    pub neighbors: Vec<NodeId>,
    /// Protocol state.
    pub state: NodeState,
    /// Currently claimed slot.
    pub slot: Slot,
    /// Preferred slots, consumed head-first on each reassignment.
    pub default_slots: VecDeque<Slot>,
    /// Beacon pending for the next own slot.
    pub snd_hello: bool,
    /// Conflict report pending for the next own slot.
    pub snd_error: bool,
    /// Observed slot ownership, self-entry included.
    pub vectors: MarkingVector,
    /// Tick at which an undisturbed wait promotes the node to READY.
    pub ready_time: Option<u64>,
}

impl Node {
    /// Construct a node and pick its initial slot.
    ///
    /// The initial pick consumes the head of `default_slots` if one is
    /// given, otherwise draws uniformly from the frame.
    pub fn new<R: Rng>(
        id: NodeId,
        neighbors: Vec<NodeId>,
        default_slots: VecDeque<Slot>,
        frame: Frame,
        rng: &mut R,
    ) -> Self {
        let mut vectors = MarkingVector::new(frame);
        let mut default_slots = default_slots;
        let slot = default_slots.pop_front().unwrap_or_else(|| {
            let free = vectors.free_slots();
            free[rng.gen_range(0..free.len())]
        });
        vectors.set(slot, id);
        Self {
            id,
            neighbors,
            state: NodeState::NotReady,
            slot,
            default_slots,
            snd_hello: true,
            snd_error: false,
            vectors,
            ready_time: None,
        }
    }

    /// Whether the node has reached its terminal state.
    pub fn is_ready(&self) -> bool {
        self.state == NodeState::Ready
    }

    /// Abandon the current slot claim and pick a fresh one.
    ///
    /// Drops the self-entry, consumes the next preferred slot if any is
    /// left, otherwise draws uniformly from the slots the marking vector
    /// shows free, then re-establishes the self-entry.
    ///
    /// Saturation is judged before the self-entry drops: if every slot of
    /// the frame was claimed, the one slot freed by the drop is the slot
    /// just abandoned, and re-picking it would only replay the conflict.
    /// The draw then covers every slot other than the abandoned one and
    /// lets collision sort out the contention; a one-slot frame has
    /// nowhere to jump and keeps its slot.
    pub fn reassign_slot<R: Rng>(&mut self, rng: &mut R) -> Slot {
        let saturated = self.vectors.is_saturated();
        self.vectors.clear(self.slot);
        let next = if let Some(preferred) = self.default_slots.pop_front() {
            preferred
        } else if saturated {
            let others: Vec<Slot> = self
                .vectors
                .frame()
                .slots()
                .filter(|slot| *slot != self.slot)
                .collect();
            match others.len() {
                0 => self.slot,
                n => others[rng.gen_range(0..n)],
            }
        } else {
            let free = self.vectors.free_slots();
            free[rng.gen_range(0..free.len())]
        };
        self.vectors.set(next, self.id);
        self.slot = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frame4() -> Frame {
        Frame::new(4)
    }

    #[test]
    fn marking_vector_starts_empty() {
        let vectors = MarkingVector::new(frame4());
        for slot in frame4().slots() {
            assert_eq!(vectors.owner(slot), None);
        }
        assert_eq!(vectors.free_slots().len(), 4);
        assert!(!vectors.is_saturated());
    }

    #[test]
    fn record_evicts_stale_entry_for_moved_sender() {
        let mut vectors = MarkingVector::new(frame4());
        vectors.record(Slot(1), NodeId(7));
        vectors.record(Slot(3), NodeId(7));

        assert_eq!(vectors.owner(Slot(1)), None);
        assert_eq!(vectors.owner(Slot(3)), Some(NodeId(7)));
        assert_eq!(vectors.slot_of(NodeId(7)), Some(Slot(3)));
    }

    #[test]
    fn record_same_slot_is_idempotent() {
        let mut vectors = MarkingVector::new(frame4());
        vectors.record(Slot(2), NodeId(5));
        vectors.record(Slot(2), NodeId(5));
        assert_eq!(vectors.owner(Slot(2)), Some(NodeId(5)));
        assert_eq!(vectors.entries().count(), 1);
    }

    #[test]
    fn saturation_detected() {
        let mut vectors = MarkingVector::new(Frame::new(2));
        vectors.set(Slot(1), NodeId(1));
        assert!(!vectors.is_saturated());
        vectors.set(Slot(2), NodeId(2));
        assert!(vectors.is_saturated());
        assert!(vectors.free_slots().is_empty());
    }

    #[test]
    fn new_node_establishes_self_entry() {
        let mut rng = StdRng::seed_from_u64(1);
        let node = Node::new(NodeId(3), vec![], VecDeque::new(), frame4(), &mut rng);

        assert_eq!(node.state, NodeState::NotReady);
        assert!(node.snd_hello);
        assert!(!node.snd_error);
        assert_eq!(node.ready_time, None);
        assert!(frame4().contains(node.slot));
        assert_eq!(node.vectors.owner(node.slot), Some(NodeId(3)));
    }

    #[test]
    fn new_node_prefers_default_slot() {
        let mut rng = StdRng::seed_from_u64(1);
        let defaults: VecDeque<Slot> = [Slot(3), Slot(1)].into_iter().collect();
        let node = Node::new(NodeId(3), vec![], defaults, frame4(), &mut rng);

        assert_eq!(node.slot, Slot(3));
        assert_eq!(node.default_slots.len(), 1);
    }

    #[test]
    fn reassign_consumes_defaults_head_first() {
        let mut rng = StdRng::seed_from_u64(1);
        let defaults: VecDeque<Slot> = [Slot(3), Slot(1)].into_iter().collect();
        let mut node = Node::new(NodeId(3), vec![], defaults, frame4(), &mut rng);

        let next = node.reassign_slot(&mut rng);
        assert_eq!(next, Slot(1));
        assert_eq!(node.slot, Slot(1));
        assert!(node.default_slots.is_empty());
        assert_eq!(node.vectors.owner(Slot(1)), Some(NodeId(3)));
        assert_eq!(node.vectors.owner(Slot(3)), None);
    }

    #[test]
    fn random_reassign_avoids_marked_slots() {
        let mut rng = StdRng::seed_from_u64(7);
        let defaults: VecDeque<Slot> = [Slot(1)].into_iter().collect();
        let mut node = Node::new(NodeId(1), vec![], defaults, frame4(), &mut rng);

        // Slots 2 and 3 are marked for others; slot 4 and the vacated
        // slot 1 are the only legal draws.
        node.vectors.set(Slot(2), NodeId(98));
        node.vectors.set(Slot(3), NodeId(99));

        let next = node.reassign_slot(&mut rng);
        assert!(next == Slot(1) || next == Slot(4), "drew {next}");
        assert_eq!(node.vectors.owner(next), Some(NodeId(1)));
        assert_eq!(node.vectors.owner(Slot(2)), Some(NodeId(98)));
        assert_eq!(node.vectors.owner(Slot(3)), Some(NodeId(99)));
    }

    #[test]
    fn saturated_vector_jumps_off_the_abandoned_slot() {
        let mut rng = StdRng::seed_from_u64(7);
        let defaults: VecDeque<Slot> = [Slot(1)].into_iter().collect();
        let mut node = Node::new(NodeId(1), vec![], defaults, frame4(), &mut rng);

        // Every slot is claimed, so re-picking slot 1 would only replay
        // the conflict: the draw must land somewhere else.
        node.vectors.set(Slot(2), NodeId(97));
        node.vectors.set(Slot(3), NodeId(98));
        node.vectors.set(Slot(4), NodeId(99));
        assert!(node.vectors.is_saturated());

        let next = node.reassign_slot(&mut rng);
        assert_ne!(next, Slot(1));
        assert_eq!(node.vectors.owner(next), Some(NodeId(1)));
        assert_eq!(node.vectors.owner(Slot(1)), None);
    }

    #[test]
    fn degenerate_frame_keeps_the_only_slot() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut node = Node::new(NodeId(1), vec![], VecDeque::new(), Frame::new(1), &mut rng);
        assert_eq!(node.slot, Slot(1));
        assert_eq!(node.reassign_slot(&mut rng), Slot(1));
        assert_eq!(node.vectors.owner(Slot(1)), Some(NodeId(1)));
    }
}
