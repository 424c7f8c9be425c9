pub mod engine;
pub mod frontier;
pub mod seeds;
pub mod stats;

pub use engine::{Collaborators, DiscoveryEngine, DiscoveryReport, Termination};
pub use frontier::{Admission, Frontier, FrontierEntry};
pub use seeds::{SeedBatch, SeedRounds};
pub use stats::DiscoveryStats;
