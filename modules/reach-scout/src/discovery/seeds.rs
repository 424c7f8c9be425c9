//! Seed collection rounds.
//!
//! The first round searches the primary topic for a few pages. Later rounds
//! resume that topic from the saved continuation token until it runs dry or
//! hits the page cap, then fall back to related topics, each tried once.
//! A round only ends once some source yields identifiers, so the round cap
//! counts productive collections, not topics tried.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use reach_common::{Identifier, SeedingConfig};
use tracing::{debug, info, warn};

use crate::scheduling::CancellationController;
use crate::traits::SeedProvider;

/// Candidate identifiers from one round, in page order, de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedBatch {
    pub round: u32,
    pub topic: String,
    pub identifiers: Vec<Identifier>,
}

struct Continuation {
    token: String,
    fetched_at: Instant,
}

pub struct SeedRounds {
    config: SeedingConfig,
    primary: String,
    current: String,
    /// Pages requested for `current`, including failed ones.
    pages_searched: u32,
    continuation: Option<Continuation>,
    /// Filled on first fallback.
    related: Option<VecDeque<String>>,
    tried: HashSet<String>,
    /// Rounds that produced a batch.
    rounds: u32,
    page_calls: u64,
}

impl SeedRounds {
    pub fn new(topic: &str, config: SeedingConfig) -> Self {
        let primary = topic.trim_start_matches('#').to_string();
        Self {
            config,
            current: primary.clone(),
            primary,
            pages_searched: 0,
            continuation: None,
            related: None,
            tried: HashSet::new(),
            rounds: 0,
            page_calls: 0,
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn page_calls(&self) -> u64 {
        self.page_calls
    }

    pub fn topics_searched(&self) -> u32 {
        self.tried.len() as u32
    }

    /// Run the next round: keep trying sources until one yields identifiers.
    /// `None` once every source is exhausted, the round limit is hit, or the
    /// run was cancelled.
    pub async fn next_batch(
        &mut self,
        provider: &dyn SeedProvider,
        cancel: &CancellationController,
    ) -> Option<SeedBatch> {
        if let Some(max) = self.config.max_rounds {
            if self.rounds >= max {
                info!(rounds = self.rounds, "Seed round limit reached");
                return None;
            }
        }

        loop {
            if cancel.is_cancelled() {
                return None;
            }

            let (pages, token) = if self.tried.is_empty() {
                self.tried.insert(self.primary.to_lowercase());
                (self.config.initial_pages, None)
            } else if let Some(resume) = self.resumable() {
                resume
            } else {
                let Some(topic) = self.next_related() else {
                    info!(topics = self.tried.len(), "Every seed topic is exhausted");
                    return None;
                };
                info!(from = %self.current, to = %topic, "Switching to related topic");
                self.current = topic;
                self.pages_searched = 0;
                self.continuation = None;
                (self.config.initial_pages, None)
            };

            let pages = pages.min(self.config.max_pages.saturating_sub(self.pages_searched));
            let topic = self.current.clone();
            let identifiers = self.fetch(provider, cancel, &topic, pages, token).await;
            if identifiers.is_empty() {
                debug!(topic = %topic, "No seeds from topic");
                continue;
            }

            self.rounds += 1;
            return Some(SeedBatch {
                round: self.rounds,
                topic,
                identifiers,
            });
        }
    }

    /// Page budget and starting token for continuing the current topic.
    fn resumable(&mut self) -> Option<(u32, Option<String>)> {
        if self.pages_searched >= self.config.max_pages {
            return None;
        }
        let continuation = self.continuation.take()?;
        if continuation.fetched_at.elapsed() >= self.config.token_ttl() {
            info!(topic = %self.current, "Continuation token expired, restarting from the first page");
            return Some((self.config.expansion_pages, None));
        }
        Some((self.config.expansion_pages, Some(continuation.token)))
    }

    fn next_related(&mut self) -> Option<String> {
        if self.related.is_none() {
            self.related = Some(self.config.related_topics(&self.primary).into());
        }
        let queue = self.related.as_mut()?;
        while let Some(topic) = queue.pop_front() {
            if self.tried.insert(topic.to_lowercase()) {
                return Some(topic);
            }
        }
        None
    }

    async fn fetch(
        &mut self,
        provider: &dyn SeedProvider,
        cancel: &CancellationController,
        topic: &str,
        pages: u32,
        mut token: Option<String>,
    ) -> Vec<Identifier> {
        let mut identifiers = Vec::new();
        let mut seen = HashSet::new();
        let page_delay = self.config.page_delay();

        for page in 0..pages {
            if page > 0 {
                if cancel.is_cancelled() {
                    break;
                }
                if !page_delay.is_zero() {
                    tokio::time::sleep(page_delay).await;
                }
            }

            self.page_calls += 1;
            self.pages_searched += 1;
            let call = provider.search_page(topic, token.as_deref());
            let outcome = tokio::time::timeout(self.config.page_timeout(), call).await;
            match outcome {
                Ok(Ok(result)) => {
                    debug!(
                        topic,
                        page = self.pages_searched,
                        found = result.identifiers.len(),
                        "Fetched seed page"
                    );
                    identifiers.extend(result.identifiers.into_iter().filter(|id| seen.insert(id.clone())));
                    token = result.next_token;
                }
                Ok(Err(e)) => {
                    warn!(topic, kind = e.kind(), error = %e, "Seed page failed");
                    token = None;
                }
                Err(_) => {
                    warn!(topic, "Seed page timed out");
                    token = None;
                }
            }
            if token.is_none() {
                break;
            }
        }

        // a topic that yields nothing is not worth paging further
        self.continuation = match token {
            Some(token) if !identifiers.is_empty() => Some(Continuation {
                token,
                fetched_at: Instant::now(),
            }),
            _ => None,
        };
        identifiers
    }
}
