use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ReachError;
use crate::quality::TierPolicy;

/// Every knob of a discovery session. Loadable from TOML; any omitted field
/// takes its default, so an empty file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Stop once this many qualifying profiles are collected.
    pub target: usize,
    /// Follower count a profile needs to qualify.
    pub min_followers: u64,
    pub tiers: TierPolicy,
    pub frontier: FrontierConfig,
    /// Stop fanning out once `qualified / target` reaches this ratio.
    pub near_target_ratio: f64,
    /// Write a checkpoint every N qualified results. 0 disables periodic checkpoints.
    pub checkpoint_every: usize,
    /// Concurrent workers draining the frontier.
    pub workers: usize,
    /// Global pacing between work items, shared by all workers.
    pub request_delay_ms: u64,
    /// Timeout for profile and similar-account lookups.
    pub call_timeout_ms: u64,
    /// Treat private profiles as dead ends.
    pub private_is_unresolvable: bool,
    /// Log a progress line every N processed accounts.
    pub progress_every: u64,
    pub seeding: SeedingConfig,
    pub validator: ValidatorConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            target: 100,
            min_followers: 50_000,
            tiers: TierPolicy::default(),
            frontier: FrontierConfig::default(),
            near_target_ratio: 0.8,
            checkpoint_every: 50,
            workers: 1,
            request_delay_ms: 50,
            call_timeout_ms: 3_000,
            private_is_unresolvable: true,
            progress_every: 5,
            seeding: SeedingConfig::default(),
            validator: ValidatorConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DiscoveryConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> std::result::Result<(), ReachError> {
        if self.target == 0 {
            return Err(ReachError::Config("target must be at least 1".into()));
        }
        if self.frontier.capacity == 0 {
            return Err(ReachError::Config("frontier.capacity must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ReachError::Config("workers must be at least 1".into()));
        }
        if !(self.near_target_ratio > 0.0 && self.near_target_ratio <= 1.0) {
            return Err(ReachError::Config(format!(
                "near_target_ratio must be in (0, 1], got {}",
                self.near_target_ratio
            )));
        }
        if self.call_timeout_ms == 0 || self.seeding.page_timeout_ms == 0 {
            return Err(ReachError::Config("timeouts must be non-zero".into()));
        }
        if self.seeding.initial_pages == 0 {
            return Err(ReachError::Config("seeding.initial_pages must be at least 1".into()));
        }
        if self.seeding.max_pages < self.seeding.initial_pages {
            return Err(ReachError::Config(
                "seeding.max_pages must be >= seeding.initial_pages".into(),
            ));
        }
        if self.validator.min_length == 0 || self.validator.max_length < self.validator.min_length {
            return Err(ReachError::Config("validator length bounds are inverted".into()));
        }
        Ok(())
    }
}

/// What `admit` does with an identifier it turns away because the frontier is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Leave it unvisited; a later suggestion may admit it once there is room.
    #[default]
    Retry,
    /// Mark it visited anyway; it will never be processed this session.
    MarkVisited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontierConfig {
    /// Maximum pending entries. Admission beyond this is silently dropped.
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000,
            overflow: OverflowPolicy::Retry,
        }
    }
}

/// Fallback topics for a family of primary topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFamily {
    /// Matches any primary topic containing this key (case-insensitive).
    pub key: String,
    pub related: Vec<String>,
}

impl TopicFamily {
    fn new(key: &str, related: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            related: related.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedingConfig {
    /// Pages fetched the first time a topic is searched.
    pub initial_pages: u32,
    /// Pages fetched when resuming a topic in a later round.
    pub expansion_pages: u32,
    /// Hard cap on pages per topic.
    pub max_pages: u32,
    pub page_delay_ms: u64,
    pub page_timeout_ms: u64,
    /// Continuation tokens older than this are not trusted for resuming.
    pub token_ttl_secs: u64,
    /// Stop collecting seeds after this many productive rounds.
    pub max_rounds: Option<u32>,
    pub families: Vec<TopicFamily>,
    /// Fallbacks for topics that match no family.
    pub default_related: Vec<String>,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            initial_pages: 3,
            expansion_pages: 5,
            max_pages: 15,
            page_delay_ms: 1_000,
            page_timeout_ms: 30_000,
            token_ttl_secs: 300,
            max_rounds: Some(3),
            families: vec![
                TopicFamily::new("luxury", &["fashion", "lifestyle", "style", "designer"]),
                TopicFamily::new("fashion", &["style", "ootd", "outfit", "clothing"]),
                TopicFamily::new("business", &["entrepreneur", "startup", "marketing", "success"]),
                TopicFamily::new("gaming", &["gamer", "esports", "videogames", "streaming"]),
                TopicFamily::new("fitness", &["gym", "workout", "health", "bodybuilding"]),
                TopicFamily::new("travel", &["vacation", "adventure", "explore", "wanderlust"]),
                TopicFamily::new("food", &["foodie", "cooking", "recipe", "restaurant"]),
                TopicFamily::new("tech", &["technology", "coding", "programming", "startup"]),
            ],
            default_related: ["lifestyle", "style", "business", "success"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SeedingConfig {
    /// Related topics for `topic`: the first family whose key appears in the
    /// topic, else the default list. The topic itself is never returned.
    pub fn related_topics(&self, topic: &str) -> Vec<String> {
        let lowered = topic.trim_start_matches('#').to_lowercase();
        let related = self
            .families
            .iter()
            .find(|family| lowered.contains(&family.key.to_lowercase()))
            .map(|family| &family.related)
            .unwrap_or(&self.default_related);
        related
            .iter()
            .filter(|r| r.to_lowercase() != lowered)
            .cloned()
            .collect()
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    pub min_length: usize,
    pub max_length: usize,
    /// Minimum length for handles recovered from caption text, where short
    /// tokens are usually fragments.
    pub free_text_min_length: usize,
    /// Replaces the built-in denylist when set.
    pub denylist: Option<Vec<String>>,
    /// Added on top of whichever denylist is in effect.
    pub extra_denylist: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_length: 1,
            max_length: 30,
            free_text_min_length: 3,
            denylist: None,
            extra_denylist: Vec::new(),
        }
    }
}

/// API credentials. Secrets stay in the environment.
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_host: Option<String>,
}

impl ApiCredentials {
    pub fn from_env() -> std::result::Result<Self, ReachError> {
        Ok(Self {
            api_key: required_env("INSTAGRAM_API_KEY")?,
            api_host: env::var("INSTAGRAM_API_HOST").ok().filter(|h| !h.is_empty()),
        })
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"[redacted]")
            .field("api_host", &self.api_host)
            .finish()
    }
}

fn required_env(key: &str) -> std::result::Result<String, ReachError> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ReachError::Config(format!("{key} environment variable is required")))
}
