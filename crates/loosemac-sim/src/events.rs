//! Trace events recorded on the simulation timeline.

use loosemac_protocol::{NodeId, Slot};
use serde::{Deserialize, Serialize};

/// Everything observable the simulation does, in order of occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TraceEvent {
    /// A node picked its initial slot during init.
    SlotChosen { node: NodeId, slot: Slot },

    /// A node broadcast a beacon in its slot.
    BeaconSent { node: NodeId, slot: Slot, tick: u64 },

    /// A node broadcast a pure conflict report in its slot.
    ConflictReportSent { node: NodeId, slot: Slot, tick: u64 },

    /// A node broadcast a combined beacon and conflict report.
    BeaconConflictSent { node: NodeId, slot: Slot, tick: u64 },

    /// A hearer recorded a beacon in its marking vector.
    BeaconRecorded {
        node: NodeId,
        from: NodeId,
        slot: Slot,
        tick: u64,
    },

    /// A beacon arrived for a slot the hearer had already marked.
    MarkingConflict {
        node: NodeId,
        from: NodeId,
        slot: Slot,
        tick: u64,
    },

    /// Two or more transmissions collided at a recipient.
    CollisionDetected { node: NodeId, tick: u64 },

    /// A node abandoned its slot claim and picked another.
    SlotReassigned {
        node: NodeId,
        from_slot: Slot,
        to_slot: Slot,
        tick: u64,
    },

    /// A node's wait elapsed undisturbed; its slot is stable.
    NodeReady { node: NodeId, slot: Slot, tick: u64 },
}

impl TraceEvent {
    /// The tick this event occurred at. Initial slot choices are tick 0.
    pub fn tick(&self) -> u64 {
        match self {
            TraceEvent::SlotChosen { .. } => 0,
            TraceEvent::BeaconSent { tick, .. } => *tick,
            TraceEvent::ConflictReportSent { tick, .. } => *tick,
            TraceEvent::BeaconConflictSent { tick, .. } => *tick,
            TraceEvent::BeaconRecorded { tick, .. } => *tick,
            TraceEvent::MarkingConflict { tick, .. } => *tick,
            TraceEvent::CollisionDetected { tick, .. } => *tick,
            TraceEvent::SlotReassigned { tick, .. } => *tick,
            TraceEvent::NodeReady { tick, .. } => *tick,
        }
    }

    /// The node this event happened at or to.
    pub fn node(&self) -> NodeId {
        match self {
            TraceEvent::SlotChosen { node, .. } => *node,
            TraceEvent::BeaconSent { node, .. } => *node,
            TraceEvent::ConflictReportSent { node, .. } => *node,
            TraceEvent::BeaconConflictSent { node, .. } => *node,
            TraceEvent::BeaconRecorded { node, .. } => *node,
            TraceEvent::MarkingConflict { node, .. } => *node,
            TraceEvent::CollisionDetected { node, .. } => *node,
            TraceEvent::SlotReassigned { node, .. } => *node,
            TraceEvent::NodeReady { node, .. } => *node,
        }
    }
}
