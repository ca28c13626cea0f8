//! LooseMAC protocol engine.
//!
//! LooseMAC is a distributed time-slot allocation protocol for multi-hop
//! wireless networks. Each node autonomously picks a transmission slot
//! within a repeating frame of length λ and defends it with beacons until
//! no node hears two neighbors transmit in the same slot.
//!
//! # Protocol sketch
//!
//! 1. A node claims a slot and beacons in it.
//! 2. Hearing a beacon, a neighbor records the claim in its marking vector.
//! 3. A beacon for a slot the hearer has already marked is a **marking
//!    conflict**; the hearer reports it in its own next slot.
//! 4. Two transmissions reaching one node in the same slot corrupt each
//!    other; the hearer treats the corrupted delivery as a collision.
//! 5. A conflict report or a collision throws the claimant back to slot
//!    selection; a claimant left undisturbed for one full frame becomes
//!    READY and never moves again.
//!
//! This crate is pure state-machine logic: no I/O, no clocks, no logging.
//! The driver owns the tick loop, the broadcast medium's lifecycle, and
//! the random stream for slot selection.

mod fsm;
mod mailbox;
mod message;
mod node;
mod slot;

pub use fsm::{dispatch, send_conflict_report, Event, Outcome};
pub use mailbox::{broadcast, Mailbox};
pub use message::{Delivery, Message, MessageKind};
pub use node::{MarkingVector, Node, NodeId, NodeState};
pub use slot::{Frame, Slot};
