//! LooseMAC simulator.
//!
//! Drives a population of [`loosemac_protocol`] nodes over a static graph
//! in lockstep discrete time until every node holds a transmission slot no
//! one-hop neighbor contests.
//!
//! # Architecture
//!
//! - **Loader**: parses the plain-text topology format
//! - **Simulation**: owns the node table, the mailbox, and the random
//!   stream; runs the four-phase tick loop
//! - **Events**: records every observable step on a serde timeline
//! - **Report**: renders a per-tick status of the whole population
//!
//! # Usage
//!
//! ```
//! use loosemac_sim::{loader, Simulation, SimulationConfig};
//!
//! let topology = loader::parse("2\n1 (1) 2 [1]\n2 (1) 1 [2]\n").unwrap();
//! let mut sim = Simulation::new(&topology, SimulationConfig::default());
//! let converged_at = sim.run().unwrap();
//! assert_eq!(converged_at, 4);
//! ```

mod error;
pub mod events;
mod graph;
pub mod loader;
mod report;
mod simulation;

pub use error::{Error, Result};
pub use events::TraceEvent;
pub use graph::{NodeSpec, Topology};
pub use report::{NodeStatus, StatusReport};
pub use simulation::{Simulation, SimulationConfig};
