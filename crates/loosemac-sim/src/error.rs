//! Error types for the simulator.

use loosemac_protocol::NodeId;
use thiserror::Error;

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur loading a topology or driving a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A node id declared more than once
    #[error("node {0} is declared twice")]
    DuplicateNode(NodeId),

    /// An adjacency entry naming an undeclared node
    #[error("node {node} lists undeclared neighbor {neighbor}")]
    UnknownNeighbor { node: NodeId, neighbor: NodeId },

    /// A node naming itself as neighbor
    #[error("node {0} lists itself as a neighbor")]
    SelfLoop(NodeId),

    /// Frame length below 1
    #[error("frame length must be at least 1, got {0}")]
    InvalidFrame(u64),

    /// Node count below 1
    #[error("node count must be at least 1, got {0}")]
    InvalidNodeCount(u64),

    /// The run hit the tick bound without every node reaching READY
    #[error("no stable slot assignment after {ticks} ticks")]
    NonConvergence { ticks: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
