pub mod cancel;
pub mod pacing;

pub use cancel::CancellationController;
pub use pacing::Pacer;
