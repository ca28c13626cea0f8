//! Per-tick status reporting.

use std::fmt;

use loosemac_protocol::{NodeId, NodeState, Slot};
use serde::{Deserialize, Serialize};

use crate::simulation::Simulation;

/// One node's line in the status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatus {
    pub id: NodeId,
    pub state: NodeState,
    pub slot: Slot,
    pub neighbors: Vec<NodeId>,
    pub snd_hello: bool,
    pub snd_error: bool,
    /// Marking-vector entries, ascending by slot.
    pub vectors: Vec<(Slot, NodeId)>,
    pub ready_time: Option<u64>,
}

/// The whole population at the end of a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub tick: u64,
    pub nodes: Vec<NodeStatus>,
    pub not_ready: Vec<NodeId>,
    pub waiting: Vec<NodeId>,
    pub ready: Vec<NodeId>,
}

impl From<&Simulation> for StatusReport {
    fn from(sim: &Simulation) -> Self {
        let nodes = sim
            .nodes()
            .map(|node| NodeStatus {
                id: node.id,
                state: node.state,
                slot: node.slot,
                neighbors: node.neighbors.clone(),
                snd_hello: node.snd_hello,
                snd_error: node.snd_error,
                vectors: node.vectors.entries().collect(),
                ready_time: node.ready_time,
            })
            .collect();

        Self {
            tick: sim.tick(),
            nodes,
            not_ready: sim.roster(NodeState::NotReady),
            waiting: sim.roster(NodeState::Waiting),
            ready: sim.roster(NodeState::Ready),
        }
    }
}

fn ids(list: &[NodeId]) -> String {
    list.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- tick {} --", self.tick)?;
        for node in &self.nodes {
            let marks = node
                .vectors
                .iter()
                .map(|(slot, owner)| format!("{slot}:{owner}"))
                .collect::<Vec<_>>()
                .join(" ");
            write!(
                f,
                "node {:<3} {:<8} slot {:<3} nbrs [{}]  hello={} error={}  marks {{{}}}",
                node.id.0,
                node.state.to_string(),
                node.slot.0,
                ids(&node.neighbors),
                node.snd_hello,
                node.snd_error,
                marks,
            )?;
            if let Some(at) = node.ready_time {
                write!(f, "  ready@{at}")?;
            }
            writeln!(f)?;
        }
        writeln!(
            f,
            "rosters: NOTREADY [{}]  WAITING [{}]  READY [{}]",
            ids(&self.not_ready),
            ids(&self.waiting),
            ids(&self.ready),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;
    use crate::simulation::SimulationConfig;

    #[test]
    fn report_reflects_the_population() {
        let topology = loader::parse("2\n1 (1) 2 [1]\n2 (1) 1 [2]\n").unwrap();
        let mut sim = Simulation::new(&topology, SimulationConfig::default());
        sim.step();

        let report = StatusReport::from(&sim);
        assert_eq!(report.tick, 1);
        assert_eq!(report.nodes.len(), 2);
        assert_eq!(report.waiting, vec![NodeId(1)]);
        assert_eq!(report.not_ready, vec![NodeId(2)]);

        // Node 2 heard node 1's beacon in slot 1.
        let node2 = &report.nodes[1];
        assert!(node2.vectors.contains(&(Slot(1), NodeId(1))));
    }

    #[test]
    fn display_names_every_node_and_roster() {
        let topology = loader::parse("2\n1 (1) 2 [1]\n2 (1) 1 [2]\n").unwrap();
        let mut sim = Simulation::new(&topology, SimulationConfig::default());
        sim.step();

        let text = StatusReport::from(&sim).to_string();
        assert!(text.contains("-- tick 1 --"));
        assert!(text.contains("node 1"));
        assert!(text.contains("node 2"));
        assert!(text.contains("WAITING"));
        assert!(text.contains("rosters:"));
        assert!(text.contains("ready@3"));
    }

    #[test]
    fn report_serializes_to_json() {
        let topology = loader::parse("1\n1 (0)\n").unwrap();
        let sim = Simulation::new(&topology, SimulationConfig::default());

        let report = StatusReport::from(&sim);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"tick\":0"));
    }
}
