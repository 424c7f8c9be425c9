use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReachError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Failure from a remote collaborator (profile lookup, neighbor fetch, seed page).
///
/// The discovery engine folds both variants into "unresolvable"; the split
/// only exists so logs can tell throttling apart from dead accounts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Timeout, rate limiting, 5xx.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// Not found, private, banned/suspended, malformed response.
    #[error("permanent remote failure: {0}")]
    Permanent(String),
}

impl RemoteError {
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteError::Transient(_) => "transient",
            RemoteError::Permanent(_) => "permanent",
        }
    }
}
