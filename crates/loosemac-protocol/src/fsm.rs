//! The per-node finite-state machine.
//!
//! Dispatch is a double `match` over (state, event). Every cell is spelled
//! out, so the compiler enforces totality; inert cells return
//! [`Outcome::Ignored`].
//!
//! | state \ event | HeardBeacon  | SentMsg  | HeardConflict  | DetectedCollision | WaitIsOver |
//! |---------------|--------------|----------|----------------|-------------------|------------|
//! | NOTREADY      | heard_beacon | sent_msg | -              | collision_noreset | -          |
//! | WAITING       | heard_beacon | -        | heard_conflict | collision_reset   | make_ready |
//! | READY         | -            | -        | -              | -                 | -          |
//!
//! A READY node ignores the medium entirely: its slot and marking vector
//! are frozen the moment it promotes.

use rand::Rng;

use crate::mailbox::{broadcast, Mailbox};
use crate::message::MessageKind;
use crate::node::{Node, NodeId, NodeState};
use crate::slot::{Frame, Slot};

/// An event dispatched to a node's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A pristine beacon arrived from `sender`.
    HeardBeacon { sender: NodeId },
    /// The tick loop determined the node transmits `kind` this tick.
    SentMsg { kind: MessageKind },
    /// A conflict report arrived from `sender`.
    HeardConflict { sender: NodeId },
    /// The mailbox cell was corrupt: two transmissions overlapped here.
    DetectedCollision,
    /// The node's scheduled wait may have elapsed.
    WaitIsOver,
}

/// What a dispatch did, for the caller's event trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The (state, event) cell is inert.
    Ignored,
    /// A message went out to the whole neighborhood; the node now waits.
    Sent,
    /// The beacon was recorded in the marking vector.
    Recorded,
    /// The beacon's slot was already marked: a conflict report is pending.
    MarkingConflict,
    /// A collision was flagged; a conflict report is pending.
    CollisionFlagged,
    /// The node fell back to NOTREADY and claimed `new_slot`.
    Reset { new_slot: Slot },
    /// The wait elapsed undisturbed; the node is READY.
    Promoted,
}

/// Dispatch one event against one node.
///
/// `tick` is the current simulated time and `frame` the run's frame; both
/// feed the handlers (the slot a beacon lands in, the promotion schedule).
/// `mailbox` receives outgoing transmissions and `rng` feeds slot
/// reselection.
pub fn dispatch<R: Rng>(
    node: &mut Node,
    event: Event,
    tick: u64,
    frame: Frame,
    mailbox: &mut Mailbox,
    rng: &mut R,
) -> Outcome {
    use Event::*;
    use NodeState::*;

    match (node.state, event) {
        (NotReady, HeardBeacon { sender }) | (Waiting, HeardBeacon { sender }) => {
            heard_beacon(node, sender, tick, frame)
        }
        (NotReady, SentMsg { kind }) => sent_msg(node, kind, tick, frame, mailbox),
        (NotReady, DetectedCollision) => collision_noreset(node),
        (Waiting, HeardConflict { sender }) => heard_conflict(node, sender, rng),
        (Waiting, DetectedCollision) => collision_reset(node, rng),
        (Waiting, WaitIsOver) => make_ready(node, tick),
        (NotReady, HeardConflict { .. })
        | (NotReady, WaitIsOver)
        | (Waiting, SentMsg { .. })
        | (Ready, _) => Outcome::Ignored,
    }
}

/// Send a pure conflict report in the node's own slot.
///
/// This path deliberately bypasses the dispatcher: the report consumes the
/// slot and clears the pending flag, but does not reschedule the wait and
/// does not change the node's state.
pub fn send_conflict_report(node: &mut Node, mailbox: &mut Mailbox) {
    broadcast(node, MessageKind::ConflictReport, mailbox);
    node.snd_error = false;
}

/// Transmit `kind` to the whole neighborhood and start the one-frame wait.
fn sent_msg(
    node: &mut Node,
    kind: MessageKind,
    tick: u64,
    frame: Frame,
    mailbox: &mut Mailbox,
) -> Outcome {
    broadcast(node, kind, mailbox);
    node.snd_hello = false;
    if kind == MessageKind::BeaconConflict {
        node.snd_error = false;
    }
    node.ready_time = Some(tick + frame.lambda());
    node.state = NodeState::Waiting;
    Outcome::Sent
}

/// Record the sender under the current slot, or flag a marking conflict
/// when the slot already has an owner.
///
/// The stale-entry scan runs only on the unoccupied path: a sender heard in
/// a fresh slot abandons whatever slot it was recorded under before.
fn heard_beacon(node: &mut Node, sender: NodeId, tick: u64, frame: Frame) -> Outcome {
    let slot = frame.slot_at(tick);
    if node.vectors.owner(slot).is_none() {
        node.vectors.record(slot, sender);
        Outcome::Recorded
    } else {
        node.snd_error = true;
        Outcome::MarkingConflict
    }
}

/// A neighbor reported a conflict involving this node: abandon the claim,
/// fall back to NOTREADY and queue a beacon for the fresh slot.
fn heard_conflict<R: Rng>(node: &mut Node, _sender: NodeId, rng: &mut R) -> Outcome {
    node.ready_time = None;
    node.state = NodeState::NotReady;
    let new_slot = node.reassign_slot(rng);
    node.snd_hello = true;
    Outcome::Reset { new_slot }
}

/// Flag the collision so a conflict report goes out in the next own slot.
fn collision_noreset(node: &mut Node) -> Outcome {
    node.snd_error = true;
    Outcome::CollisionFlagged
}

/// Flag the collision, then abandon the claim like a heard conflict.
fn collision_reset<R: Rng>(node: &mut Node, rng: &mut R) -> Outcome {
    node.snd_error = true;
    node.ready_time = None;
    node.state = NodeState::NotReady;
    let new_slot = node.reassign_slot(rng);
    node.snd_hello = true;
    Outcome::Reset { new_slot }
}

/// Promote to READY once the scheduled tick arrives. Any earlier tick is a
/// no-op; a cleared schedule never promotes.
fn make_ready(node: &mut Node, tick: u64) -> Outcome {
    if node.ready_time == Some(tick) {
        node.ready_time = None;
        node.state = NodeState::Ready;
        Outcome::Promoted
    } else {
        Outcome::Ignored
    }
}
