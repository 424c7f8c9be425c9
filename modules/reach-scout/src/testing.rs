// Test doubles for the discovery engine.
//
// - MockGraph implements ProfileResolver, NeighborProvider and SeedProvider
//   over an in-memory account graph and records every call it receives.
// - RecordingCheckpointWriter captures exports instead of writing files.
//
// Plus fast_config() for engine tests that should not sleep.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use reach_common::{DiscoveryConfig, Identifier, ProfileSummary, QualifiedResult, RemoteError};

use crate::scheduling::CancellationController;
use crate::traits::{
    CheckpointHint, CheckpointReason, CheckpointWriter, NeighborProvider, ProfileResolver,
    SeedPage, SeedProvider,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Default config with every sleep removed.
pub fn fast_config(target: usize, min_followers: u64) -> DiscoveryConfig {
    let mut config = DiscoveryConfig {
        target,
        min_followers,
        request_delay_ms: 0,
        ..Default::default()
    };
    config.seeding.page_delay_ms = 0;
    config
}

pub fn profile_summary(identifier: &str, follower_count: u64) -> ProfileSummary {
    ProfileSummary {
        identifier: identifier.to_string(),
        display_name: identifier.to_uppercase(),
        follower_count,
        following_count: 100,
        post_count: 10,
        is_verified: false,
        is_private: false,
        profile_url: format!("https://instagram.com/{identifier}"),
    }
}

// ---------------------------------------------------------------------------
// MockGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve(String),
    Neighbors { identifier: String, max_count: usize },
    SeedPage { topic: String, token: Option<String> },
}

/// In-memory account graph. Unknown accounts fail to resolve, accounts with
/// no registered neighbors have none, unknown topics return one empty page.
/// Builder pattern: `.profile()`, `.neighbors()`, `.seed_pages()`.
#[derive(Default)]
pub struct MockGraph {
    profiles: HashMap<String, ProfileSummary>,
    neighbors: HashMap<String, Vec<String>>,
    failing_neighbors: HashSet<String>,
    seed_pages: HashMap<String, Vec<Vec<String>>>,
    failing_pages: HashSet<(String, usize)>,
    slow_pages: HashMap<(String, usize), Duration>,
    cancel_on_resolve: Option<(String, CancellationController)>,
    panic_on_resolve: Option<String>,
    resolve_delay: Duration,
    calls: Mutex<Vec<Call>>,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(mut self, identifier: &str, follower_count: u64) -> Self {
        self.profiles
            .insert(identifier.to_string(), profile_summary(identifier, follower_count));
        self
    }

    pub fn private_profile(mut self, identifier: &str, follower_count: u64) -> Self {
        let mut profile = profile_summary(identifier, follower_count);
        profile.is_private = true;
        self.profiles.insert(identifier.to_string(), profile);
        self
    }

    pub fn neighbors(mut self, identifier: &str, neighbors: &[&str]) -> Self {
        self.neighbors.insert(
            identifier.to_string(),
            neighbors.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    /// Similar-account lookups for `identifier` fail as if rate limited.
    pub fn fail_neighbors(mut self, identifier: &str) -> Self {
        self.failing_neighbors.insert(identifier.to_string());
        self
    }

    /// Register the pages a topic search returns. Tokens are `topic:index`.
    pub fn seed_pages(mut self, topic: &str, pages: &[&[&str]]) -> Self {
        self.seed_pages.insert(
            topic.to_string(),
            pages
                .iter()
                .map(|page| page.iter().map(|id| id.to_string()).collect())
                .collect(),
        );
        self
    }

    pub fn fail_seed_page(mut self, topic: &str, index: usize) -> Self {
        self.failing_pages.insert((topic.to_string(), index));
        self
    }

    /// Page `index` of `topic` takes `delay` to answer.
    pub fn slow_seed_page(mut self, topic: &str, index: usize, delay: Duration) -> Self {
        self.slow_pages.insert((topic.to_string(), index), delay);
        self
    }

    /// Resolving `identifier` panics, standing in for a bug deep in a collaborator.
    pub fn panic_on_resolve(mut self, identifier: &str) -> Self {
        self.panic_on_resolve = Some(identifier.to_string());
        self
    }

    /// Trip `controller` when `identifier` is resolved.
    pub fn cancel_on_resolve(mut self, identifier: &str, controller: CancellationController) -> Self {
        self.cancel_on_resolve = Some((identifier.to_string(), controller));
        self
    }

    /// Every resolve sleeps this long, so concurrent workers interleave.
    pub fn resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }

    // --- Inspection ---

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remote_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Identifiers in the order they were resolved.
    pub fn resolved(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Resolve(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn neighbor_requests(&self) -> Vec<String> {
        self.neighbor_widths().into_iter().map(|(id, _)| id).collect()
    }

    /// `(identifier, max_count)` for every similar-accounts request.
    pub fn neighbor_widths(&self) -> Vec<(String, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Neighbors {
                    identifier,
                    max_count,
                } => Some((identifier, max_count)),
                _ => None,
            })
            .collect()
    }

    /// Tokens passed for each page request on `topic`, in order.
    pub fn seed_tokens(&self, topic: &str) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SeedPage { topic: t, token } if t == topic => Some(token),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ProfileResolver for MockGraph {
    async fn resolve(&self, identifier: &str) -> Result<ProfileSummary, RemoteError> {
        self.record(Call::Resolve(identifier.to_string()));
        if !self.resolve_delay.is_zero() {
            tokio::time::sleep(self.resolve_delay).await;
        }
        if self.panic_on_resolve.as_deref() == Some(identifier) {
            panic!("resolver blew up on {identifier}");
        }
        if let Some((trigger, controller)) = &self.cancel_on_resolve {
            if trigger == identifier {
                controller.cancel();
            }
        }
        self.profiles
            .get(identifier)
            .cloned()
            .ok_or_else(|| RemoteError::Permanent(format!("{identifier} not found")))
    }
}

#[async_trait]
impl NeighborProvider for MockGraph {
    async fn neighbors(
        &self,
        identifier: &str,
        max_count: usize,
    ) -> Result<Vec<Identifier>, RemoteError> {
        self.record(Call::Neighbors {
            identifier: identifier.to_string(),
            max_count,
        });
        if self.failing_neighbors.contains(identifier) {
            return Err(RemoteError::Transient("429 Too Many Requests".into()));
        }
        Ok(self
            .neighbors
            .get(identifier)
            .map(|n| n.iter().take(max_count).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl SeedProvider for MockGraph {
    async fn search_page(
        &self,
        topic: &str,
        continuation: Option<&str>,
    ) -> Result<SeedPage, RemoteError> {
        self.record(Call::SeedPage {
            topic: topic.to_string(),
            token: continuation.map(str::to_string),
        });
        let Some(pages) = self.seed_pages.get(topic) else {
            return Ok(SeedPage::default());
        };
        let index = match continuation {
            None => 0,
            Some(token) => token
                .rsplit_once(':')
                .and_then(|(_, i)| i.parse::<usize>().ok())
                .ok_or_else(|| RemoteError::Permanent(format!("bad token {token}")))?,
        };
        if let Some(delay) = self.slow_pages.get(&(topic.to_string(), index)) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_pages.contains(&(topic.to_string(), index)) {
            return Err(RemoteError::Transient("502 Bad Gateway".into()));
        }
        let Some(page) = pages.get(index) else {
            return Err(RemoteError::Permanent(format!("no page {index} for {topic}")));
        };
        Ok(SeedPage {
            identifiers: page.clone(),
            next_token: (index + 1 < pages.len()).then(|| format!("{topic}:{}", index + 1)),
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingCheckpointWriter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedExport {
    pub reason: CheckpointReason,
    pub identifiers: Vec<String>,
}

/// Keeps every export in memory. `failing()` makes every export error
/// after it has been recorded.
#[derive(Default)]
pub struct RecordingCheckpointWriter {
    exports: Mutex<Vec<RecordedExport>>,
    fail: bool,
}

impl RecordingCheckpointWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn exports(&self) -> Vec<RecordedExport> {
        self.exports.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<CheckpointReason> {
        self.exports().into_iter().map(|e| e.reason).collect()
    }

    /// The final export, if any.
    pub fn last(&self) -> Option<RecordedExport> {
        self.exports.lock().unwrap().last().cloned()
    }
}

impl CheckpointWriter for RecordingCheckpointWriter {
    fn export(&self, results: &[QualifiedResult], hint: &CheckpointHint) -> Result<PathBuf> {
        self.exports.lock().unwrap().push(RecordedExport {
            reason: hint.reason,
            identifiers: results.iter().map(|r| r.profile.identifier.clone()).collect(),
        });
        if self.fail {
            bail!("disk full");
        }
        Ok(PathBuf::from(format!("memory/{}_{}", hint.reason, results.len())))
    }
}
