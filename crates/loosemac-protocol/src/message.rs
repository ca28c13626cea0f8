//! Protocol messages and delivery fusion.

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// What a transmission announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// The sender claims the current slot.
    Beacon,
    /// The sender observed a marking conflict involving the recipient.
    ConflictReport,
    /// A beacon and a conflict report combined in one transmission.
    BeaconConflict,
}

/// A transmission from one node, heard by its one-hop neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub from: NodeId,
}

/// What a recipient finds in its mailbox cell at the end of a tick.
///
/// Two transmissions arriving at the same recipient in the same slot fuse
/// into [`Delivery::Corrupt`]. Fusion is absorbing: a third arrival
/// changes nothing, and no sender ever transmits `Corrupt` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// Exactly one transmission reached the recipient this slot.
    Pristine(Message),
    /// Two or more transmissions overlapped at the recipient.
    Corrupt,
}

impl Delivery {
    /// Fuse another arrival into this delivery.
    #[must_use]
    pub fn merge(self, _incoming: Message) -> Delivery {
        Delivery::Corrupt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon(from: u64) -> Message {
        Message {
            kind: MessageKind::Beacon,
            from: NodeId(from),
        }
    }

    #[test]
    fn second_arrival_corrupts() {
        let delivery = Delivery::Pristine(beacon(1));
        assert_eq!(delivery.merge(beacon(2)), Delivery::Corrupt);
    }

    #[test]
    fn fusion_is_absorbing() {
        let delivery = Delivery::Pristine(beacon(1))
            .merge(beacon(2))
            .merge(beacon(3));
        assert_eq!(delivery, Delivery::Corrupt);
    }

    #[test]
    fn same_sender_twice_still_corrupts() {
        // The cell does not inspect the payload; any overlap is a collision.
        let delivery = Delivery::Pristine(beacon(1)).merge(beacon(1));
        assert_eq!(delivery, Delivery::Corrupt);
    }
}
