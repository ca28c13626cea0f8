//! Network topology: frame length, adjacency, preferred slots.

use std::collections::HashSet;

use loosemac_protocol::{Frame, NodeId, Slot};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One node's row in the topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    /// One-hop adjacency. Symmetry is the input's responsibility; the
    /// engine delivers along whatever edges are declared.
    pub neighbors: Vec<NodeId>,
    /// Preferred slots, already wrapped into [1, λ], consumed head-first.
    pub default_slots: Vec<Slot>,
}

/// A static multi-hop network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub frame: Frame,
    pub nodes: Vec<NodeSpec>,
}

impl Topology {
    /// Build a validated topology.
    pub fn new(frame: Frame, nodes: Vec<NodeSpec>) -> Result<Self> {
        let topology = Self { frame, nodes };
        topology.validate()?;
        Ok(topology)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidNodeCount(0));
        }
        if self.frame.lambda() < 1 {
            return Err(Error::InvalidFrame(self.frame.lambda()));
        }

        let mut declared = HashSet::new();
        for spec in &self.nodes {
            if !declared.insert(spec.id) {
                return Err(Error::DuplicateNode(spec.id));
            }
        }
        for spec in &self.nodes {
            for &neighbor in &spec.neighbors {
                if neighbor == spec.id {
                    return Err(Error::SelfLoop(spec.id));
                }
                if !declared.contains(&neighbor) {
                    return Err(Error::UnknownNeighbor {
                        node: spec.id,
                        neighbor,
                    });
                }
            }
        }
        Ok(())
    }
}
