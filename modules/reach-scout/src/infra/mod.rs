pub mod checkpoint;
pub mod util;

pub use checkpoint::{ExportFormat, FileCheckpointWriter};
