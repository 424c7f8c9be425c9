use thiserror::Error;

pub type Result<T> = std::result::Result<T, InstagramError>;

#[derive(Debug, Error)]
pub enum InstagramError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Profile unavailable: {0}")]
    ProfileUnavailable(String),
}

impl InstagramError {
    /// Whether retrying later could plausibly succeed (timeouts, throttling, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            InstagramError::Network(_) | InstagramError::Timeout(_) => true,
            InstagramError::Api { status, .. } => *status == 429 || *status >= 500,
            InstagramError::Parse(_) | InstagramError::ProfileUnavailable(_) => false,
        }
    }
}

impl From<reqwest::Error> for InstagramError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InstagramError::Timeout(err.to_string())
        } else if err.is_decode() {
            InstagramError::Parse(err.to_string())
        } else {
            InstagramError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for InstagramError {
    fn from(err: serde_json::Error) -> Self {
        InstagramError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_and_server_errors_are_transient() {
        assert!(InstagramError::Api { status: 429, message: String::new() }.is_transient());
        assert!(InstagramError::Api { status: 503, message: String::new() }.is_transient());
        assert!(InstagramError::Timeout("3s".into()).is_transient());
    }

    #[test]
    fn missing_profiles_are_permanent() {
        assert!(!InstagramError::Api { status: 404, message: String::new() }.is_transient());
        assert!(!InstagramError::ProfileUnavailable("ghost".into()).is_transient());
        assert!(!InstagramError::Parse("eof".into()).is_transient());
    }
}
