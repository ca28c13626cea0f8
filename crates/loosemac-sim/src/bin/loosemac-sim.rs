//! LooseMAC slot-allocation simulator.
//!
//! Reads a topology from standard input, runs the protocol until every
//! node holds a stable slot, and prints a status report per tick.
//!
//! Usage: `loosemac-sim [max_ticks] [seed] < topology.txt`
//!
//! The event trace goes through `tracing`; set `RUST_LOG=loosemac=debug`
//! to see every send, delivery, conflict, and promotion.

use std::env;
use std::io::Read;

use loosemac_sim::{loader, Error, Simulation, SimulationConfig, StatusReport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loosemac=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    let max_ticks: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10_000);
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(42);

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let topology = loader::parse(&input)?;

    println!("LooseMAC simulator");
    println!("==================");
    println!();
    println!(
        "{} nodes, frame length {}, seed {}",
        topology.node_count(),
        topology.frame,
        seed
    );
    println!();

    let mut sim = Simulation::new(&topology, SimulationConfig { seed, max_ticks });
    while !sim.is_converged() {
        if sim.tick() >= max_ticks {
            return Err(Error::NonConvergence { ticks: sim.tick() }.into());
        }
        sim.step();
        println!("{}", StatusReport::from(&sim));
    }

    println!("all {} nodes READY at tick {}", sim.node_count(), sim.tick());
    for node in sim.nodes() {
        println!("  node {}: slot {}", node.id, node.slot);
    }

    Ok(())
}
