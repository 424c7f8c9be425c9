pub mod discovery;
pub mod infra;
pub mod scheduling;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use discovery::engine::{Collaborators, DiscoveryEngine, DiscoveryReport, Termination};
pub use discovery::stats::DiscoveryStats;
