// Seams between the discovery engine and the outside world.
//
// ProfileResolver, NeighborProvider and SeedProvider are the three remote
// calls the engine makes. CheckpointWriter persists partial and final
// results. MockGraph and RecordingCheckpointWriter in `testing` implement
// them in memory, so engine tests run with no network.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use instagram_client::{InstagramClient, InstagramError, UserData};
use reach_common::{
    Identifier, IdentifierValidator, ProfileSummary, QualifiedResult, RemoteError, ValidatorConfig,
};

// ---------------------------------------------------------------------------
// Remote collaborators
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Look up an account. Any error means "unresolvable" to the engine.
    async fn resolve(&self, identifier: &str) -> Result<ProfileSummary, RemoteError>;
}

#[async_trait]
pub trait NeighborProvider: Send + Sync {
    /// Up to `max_count` accounts similar to `identifier`, possibly empty.
    async fn neighbors(&self, identifier: &str, max_count: usize)
        -> Result<Vec<Identifier>, RemoteError>;
}

/// One page of a topic search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedPage {
    pub identifiers: Vec<Identifier>,
    /// Absent on the last page.
    pub next_token: Option<String>,
}

#[async_trait]
pub trait SeedProvider: Send + Sync {
    async fn search_page(
        &self,
        topic: &str,
        continuation: Option<&str>,
    ) -> Result<SeedPage, RemoteError>;
}

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointReason {
    /// Every N qualified results.
    Periodic,
    /// Run ended normally (target reached or seeds exhausted).
    Completed,
    /// Run interrupted by the operator.
    Cancelled,
    /// Run aborted by an internal failure.
    Emergency,
}

impl fmt::Display for CheckpointReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckpointReason::Periodic => "periodic",
            CheckpointReason::Completed => "completed",
            CheckpointReason::Cancelled => "cancelled",
            CheckpointReason::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

/// Run context handed to the writer alongside the results.
#[derive(Debug, Clone)]
pub struct CheckpointHint {
    pub run_id: Uuid,
    /// `None` when the run started from given accounts only.
    pub topic: Option<String>,
    pub min_followers: u64,
    pub reason: CheckpointReason,
}

pub trait CheckpointWriter: Send + Sync {
    /// Persist a snapshot of the results. Returns where it went.
    fn export(&self, results: &[QualifiedResult], hint: &CheckpointHint) -> anyhow::Result<PathBuf>;
}

// ---------------------------------------------------------------------------
// InstagramSource: the three remote seams backed by the scraper API
// ---------------------------------------------------------------------------

pub struct InstagramSource {
    client: InstagramClient,
    /// Gate for handles mined from hashtag posts.
    free_text: IdentifierValidator,
}

impl InstagramSource {
    pub fn new(client: InstagramClient, validator: &ValidatorConfig) -> Self {
        Self {
            client,
            free_text: IdentifierValidator::for_free_text(validator),
        }
    }
}

fn remote_error(err: InstagramError) -> RemoteError {
    if err.is_transient() {
        RemoteError::Transient(err.to_string())
    } else {
        RemoteError::Permanent(err.to_string())
    }
}

fn summary_from(identifier: &str, user: UserData) -> ProfileSummary {
    let identifier = user
        .username
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| identifier.to_string());
    ProfileSummary {
        profile_url: InstagramClient::profile_url(&identifier),
        identifier,
        display_name: user.full_name.unwrap_or_default(),
        follower_count: user.follower_count,
        following_count: user.following_count,
        post_count: user.media_count,
        is_verified: user.is_verified,
        is_private: user.is_private,
    }
}

#[async_trait]
impl ProfileResolver for InstagramSource {
    async fn resolve(&self, identifier: &str) -> Result<ProfileSummary, RemoteError> {
        let user = self.client.profile(identifier).await.map_err(remote_error)?;
        Ok(summary_from(identifier, user))
    }
}

#[async_trait]
impl NeighborProvider for InstagramSource {
    async fn neighbors(
        &self,
        identifier: &str,
        max_count: usize,
    ) -> Result<Vec<Identifier>, RemoteError> {
        self.client
            .similar_accounts(identifier, max_count)
            .await
            .map_err(remote_error)
    }
}

#[async_trait]
impl SeedProvider for InstagramSource {
    async fn search_page(
        &self,
        topic: &str,
        continuation: Option<&str>,
    ) -> Result<SeedPage, RemoteError> {
        let page = self
            .client
            .search_hashtag(topic, continuation)
            .await
            .map_err(remote_error)?;

        let mut seen = HashSet::new();
        let identifiers = page
            .posts
            .iter()
            .filter_map(|post| {
                post.username_candidates()
                    .into_iter()
                    .find(|c| self.free_text.is_valid(c))
            })
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Ok(SeedPage {
            identifiers,
            next_token: page.next_token,
        })
    }
}
