//! The single-hop broadcast medium.

use std::collections::HashMap;

use crate::message::{Delivery, Message, MessageKind};
use crate::node::{Node, NodeId};

/// Per-tick store of deliveries, one cell per recipient.
///
/// The first write to a recipient's cell records the message; any later
/// write within the same tick fuses the cell into [`Delivery::Corrupt`],
/// whatever the new payload. The tick loop clears the box at the start of
/// every tick, never between phases.
#[derive(Debug, Default)]
pub struct Mailbox {
    cells: HashMap<NodeId, Delivery>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `msg` to `recipient`, fusing with any prior delivery.
    pub fn put(&mut self, recipient: NodeId, msg: Message) {
        use std::collections::hash_map::Entry;
        match self.cells.entry(recipient) {
            Entry::Vacant(cell) => {
                cell.insert(Delivery::Pristine(msg));
            }
            Entry::Occupied(mut cell) => {
                let fused = cell.get().merge(msg);
                cell.insert(fused);
            }
        }
    }

    /// Remove and return the delivery for `recipient`, if any.
    pub fn take(&mut self, recipient: NodeId) -> Option<Delivery> {
        self.cells.remove(&recipient)
    }

    /// The delivery waiting for `recipient`, if any, left in place.
    pub fn peek(&self, recipient: NodeId) -> Option<&Delivery> {
        self.cells.get(&recipient)
    }

    /// Drop every cell. Run at the start of each tick.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Write a `kind` transmission from `node` into every neighbor's cell,
/// fusing as needed. The sender's own cell is untouched.
pub fn broadcast(node: &Node, kind: MessageKind, mailbox: &mut Mailbox) {
    let msg = Message {
        kind,
        from: node.id,
    };
    for &neighbor in &node.neighbors {
        mailbox.put(neighbor, msg);
    }
}
