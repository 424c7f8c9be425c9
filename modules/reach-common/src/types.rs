use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, case-sensitive account handle.
pub type Identifier = String;

/// What a profile lookup tells us about an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub identifier: Identifier,
    pub display_name: String,
    pub follower_count: u64,
    pub following_count: u64,
    pub post_count: u64,
    pub is_verified: bool,
    pub is_private: bool,
    pub profile_url: String,
}

/// How an identifier entered the frontier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Collected from a topic search.
    Seed { topic: String },
    /// Supplied by the caller as a starting account.
    Given,
    /// Suggested as similar to an already-processed account.
    Account { parent: Identifier },
}

impl Origin {
    pub fn seed(topic: impl Into<String>) -> Self {
        Origin::Seed {
            topic: topic.into(),
        }
    }

    pub fn account(parent: impl Into<Identifier>) -> Self {
        Origin::Account {
            parent: parent.into(),
        }
    }

    pub fn parent(&self) -> Option<&str> {
        match self {
            Origin::Seed { .. } | Origin::Given => None,
            Origin::Account { parent } => Some(parent),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Seed { topic } => write!(f, "#{topic}"),
            Origin::Account { parent } => write!(f, "@{parent}"),
            Origin::Given => write!(f, "given"),
        }
    }
}

/// A profile that met the follower threshold, with how we got there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedResult {
    #[serde(flatten)]
    pub profile: ProfileSummary,
    pub discovery_depth: u32,
    /// Human-readable trail back to the seed topic, e.g. `#luxury > @a > @d`.
    pub discovery_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_display() {
        assert_eq!(Origin::seed("luxury").to_string(), "#luxury");
        assert_eq!(Origin::account("alice").to_string(), "@alice");
        assert_eq!(Origin::account("alice").parent(), Some("alice"));
        assert_eq!(Origin::seed("luxury").parent(), None);
        assert_eq!(Origin::Given.parent(), None);
    }

    #[test]
    fn qualified_result_serializes_flat() {
        let result = QualifiedResult {
            profile: ProfileSummary {
                identifier: "alice".into(),
                display_name: "Alice".into(),
                follower_count: 60_000,
                following_count: 10,
                post_count: 5,
                is_verified: true,
                is_private: false,
                profile_url: "https://instagram.com/alice".into(),
            },
            discovery_depth: 1,
            discovery_path: "#luxury > @alice".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["identifier"], "alice");
        assert_eq!(value["discovery_depth"], 1);
    }
}
