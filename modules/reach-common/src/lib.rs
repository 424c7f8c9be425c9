pub mod config;
pub mod error;
pub mod identifier;
pub mod quality;
pub mod types;

pub use config::{
    ApiCredentials, DiscoveryConfig, FrontierConfig, OverflowPolicy, SeedingConfig, TopicFamily,
    ValidatorConfig,
};
pub use error::{ReachError, RemoteError};
pub use identifier::IdentifierValidator;
pub use quality::*;
pub use types::*;
