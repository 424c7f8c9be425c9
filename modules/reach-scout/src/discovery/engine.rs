//! Bounded breadth-first discovery over the account similarity graph.
//!
//! The coordinator loop refills the frontier from seed rounds whenever it
//! runs dry, then lets `workers` drain it. All shared state lives behind one
//! lock that is never held across a remote call.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use reach_common::{
    classify, DiscoveryConfig, Identifier, IdentifierValidator, Origin, ProfileSummary,
    QualifiedResult,
};

use super::frontier::{Admission, Frontier, FrontierEntry};
use super::seeds::SeedRounds;
use super::stats::DiscoveryStats;
use crate::infra::util::format_count;
use crate::scheduling::{CancellationController, Pacer};
use crate::traits::{
    CheckpointHint, CheckpointReason, CheckpointWriter, NeighborProvider, ProfileResolver,
    SeedProvider,
};

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    TargetReached,
    /// Frontier drained and no seed round produced anything new.
    SeedsExhausted,
    Cancelled,
    /// Internal failure; results up to this point were still exported.
    Failed(String),
}

impl Termination {
    fn checkpoint_reason(&self) -> CheckpointReason {
        match self {
            Termination::TargetReached | Termination::SeedsExhausted => CheckpointReason::Completed,
            Termination::Cancelled => CheckpointReason::Cancelled,
            Termination::Failed(_) => CheckpointReason::Emergency,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::TargetReached => write!(f, "target reached"),
            Termination::SeedsExhausted => write!(f, "seeds exhausted"),
            Termination::Cancelled => write!(f, "cancelled"),
            Termination::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome of a run. Always produced, whatever the termination.
#[derive(Debug)]
pub struct DiscoveryReport {
    pub run_id: Uuid,
    /// `None` for runs seeded only from given accounts.
    pub topic: Option<String>,
    pub started_at: DateTime<Utc>,
    pub termination: Termination,
    /// In the order they qualified.
    pub results: Vec<QualifiedResult>,
    pub stats: DiscoveryStats,
    /// Where the final export went, if it succeeded.
    pub checkpoint: Option<PathBuf>,
}

impl DiscoveryReport {
    /// Results sorted by follower count, highest first.
    pub fn ranked(&self) -> Vec<&QualifiedResult> {
        let mut ranked: Vec<_> = self.results.iter().collect();
        ranked.sort_by(|a, b| b.profile.follower_count.cmp(&a.profile.follower_count));
        ranked
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Discovery Run Complete ===")?;
        match &self.topic {
            Some(topic) => writeln!(f, "Topic:       #{topic}")?,
            None => writeln!(f, "Topic:       none (given accounts only)")?,
        }
        writeln!(f, "Run:         {}", self.run_id)?;
        writeln!(f, "Termination: {}", self.termination)?;
        writeln!(f, "Profiles:    {}", self.results.len())?;
        if let Some(path) = &self.checkpoint {
            writeln!(f, "Saved to:    {}", path.display())?;
        }
        let ranked = self.ranked();
        if !ranked.is_empty() {
            writeln!(f, "\nTop profiles:")?;
            for (i, result) in ranked.iter().take(5).enumerate() {
                let p = &result.profile;
                let badge = if p.is_verified { " ✓" } else { "" };
                writeln!(
                    f,
                    "  {}. @{}{} ({} followers, depth {})",
                    i + 1,
                    p.identifier,
                    badge,
                    format_count(p.follower_count),
                    result.discovery_depth
                )?;
            }
        }
        writeln!(f)?;
        write!(f, "{}", self.stats)
    }
}

/// The remote and storage seams the engine drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub resolver: &'a dyn ProfileResolver,
    pub neighbors: &'a dyn NeighborProvider,
    pub seeds: &'a dyn SeedProvider,
    pub checkpoints: &'a dyn CheckpointWriter,
}

/// Mutable state of one run.
struct Session {
    frontier: Frontier,
    results: Vec<QualifiedResult>,
    stats: DiscoveryStats,
    /// Entries taken from the frontier and not yet finished.
    in_flight: usize,
    target: usize,
}

impl Session {
    fn target_reached(&self) -> bool {
        self.results.len() >= self.target
    }

    fn progress(&self) -> f64 {
        self.results.len() as f64 / self.target as f64
    }

    /// Append a result unless the target is already met. Returns the new count.
    fn record(&mut self, result: QualifiedResult) -> Option<usize> {
        if self.target_reached() {
            return None;
        }
        self.results.push(result);
        self.stats.qualified += 1;
        Some(self.results.len())
    }
}

enum Next {
    Entry(FrontierEntry),
    /// Frontier empty but an in-flight entry may still add to it.
    Wait,
    Done,
}

enum Expansion {
    Expand,
    MaxDepth,
    FrontierFull,
    NearTarget,
    Cancelled,
}

pub struct DiscoveryEngine<'a> {
    collaborators: Collaborators<'a>,
    config: DiscoveryConfig,
    /// Topic searched for seeds. Without one only given accounts seed the run.
    topic: Option<String>,
    seed_accounts: Vec<Identifier>,
    validator: IdentifierValidator,
    cancel: CancellationController,
    pacer: Pacer,
    /// Signalled whenever an in-flight entry finishes.
    idle: Notify,
    run_id: Uuid,
}

impl<'a> DiscoveryEngine<'a> {
    /// Seed from a topic search, with related topics as fallback.
    pub fn new(
        config: DiscoveryConfig,
        topic: impl Into<String>,
        collaborators: Collaborators<'a>,
        cancel: CancellationController,
    ) -> Self {
        let topic = topic.into().trim_start_matches('#').to_string();
        Self::build(config, Some(topic), collaborators, cancel)
    }

    /// Seed only from `accounts` and expand through similar accounts. No
    /// topic search happens.
    pub fn from_accounts(
        config: DiscoveryConfig,
        accounts: Vec<Identifier>,
        collaborators: Collaborators<'a>,
        cancel: CancellationController,
    ) -> Self {
        Self::build(config, None, collaborators, cancel).with_seed_accounts(accounts)
    }

    /// Admit `accounts` at depth 0 before the first seed round.
    pub fn with_seed_accounts(mut self, accounts: Vec<Identifier>) -> Self {
        self.seed_accounts = accounts
            .into_iter()
            .map(|a| a.trim_start_matches('@').to_string())
            .collect();
        self
    }

    fn build(
        config: DiscoveryConfig,
        topic: Option<String>,
        collaborators: Collaborators<'a>,
        cancel: CancellationController,
    ) -> Self {
        Self {
            collaborators,
            validator: IdentifierValidator::new(&config.validator),
            pacer: Pacer::new(config.request_delay()),
            config,
            topic,
            seed_accounts: Vec::new(),
            cancel,
            idle: Notify::new(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run to completion. Never fails outright: internal errors and panics in
    /// collaborators end the run with [`Termination::Failed`] after an
    /// emergency export of what was collected.
    pub async fn run(&self) -> DiscoveryReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            run_id = %self.run_id,
            topic = self.topic.as_deref().unwrap_or("-"),
            seed_accounts = self.seed_accounts.len(),
            target = self.config.target,
            min_followers = self.config.min_followers,
            workers = self.config.workers,
            "Starting discovery"
        );

        let shared = Mutex::new(Session {
            frontier: Frontier::new(&self.config.frontier),
            results: Vec::new(),
            stats: DiscoveryStats::default(),
            in_flight: 0,
            target: self.config.target,
        });
        let mut rounds = self
            .topic
            .as_deref()
            .map(|topic| SeedRounds::new(topic, self.config.seeding.clone()));

        let outcome = AssertUnwindSafe(self.drive(&shared, rounds.as_mut()))
            .catch_unwind()
            .await;
        let termination = match outcome {
            Ok(Ok(termination)) => termination,
            Ok(Err(e)) => {
                error!(run_id = %self.run_id, error = %e, "Discovery failed, saving partial results");
                Termination::Failed(e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(&*panic);
                error!(run_id = %self.run_id, reason = %reason, "Discovery panicked, saving partial results");
                Termination::Failed(format!("panic: {reason}"))
            }
        };

        let mut session = shared.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(rounds) = &rounds {
            session.stats.seed_rounds = rounds.rounds();
            session.stats.seed_page_calls = rounds.page_calls();
            session.stats.topics_searched = rounds.topics_searched();
        }

        let checkpoint = self.export(
            &session.results,
            termination.checkpoint_reason(),
            &mut session.stats,
        );

        info!(
            run_id = %self.run_id,
            termination = %termination,
            found = session.results.len(),
            processed = session.stats.processed,
            elapsed_secs = clock.elapsed().as_secs(),
            "Discovery finished"
        );

        DiscoveryReport {
            run_id: self.run_id,
            topic: self.topic.clone(),
            started_at,
            termination,
            results: session.results,
            stats: session.stats,
            checkpoint,
        }
    }

    async fn drive(
        &self,
        shared: &Mutex<Session>,
        mut rounds: Option<&mut SeedRounds>,
    ) -> Result<Termination> {
        if !self.seed_accounts.is_empty() {
            let mut session = lock(shared)?;
            let admitted =
                self.admit_candidates(&mut session, self.seed_accounts.iter().cloned(), 0, &Origin::Given);
            session.stats.seeds_admitted += admitted as u64;
            info!(given = self.seed_accounts.len(), admitted, "Seeded from given accounts");
        }

        loop {
            if self.cancel.is_cancelled() {
                info!("Discovery cancelled");
                return Ok(Termination::Cancelled);
            }

            let (reached, empty) = {
                let session = lock(shared)?;
                (session.target_reached(), session.frontier.is_empty())
            };
            if reached {
                return Ok(Termination::TargetReached);
            }

            if empty {
                let batch = match rounds.as_deref_mut() {
                    Some(rounds) => rounds.next_batch(self.collaborators.seeds, &self.cancel).await,
                    None => None,
                };
                let Some(batch) = batch else {
                    if self.cancel.is_cancelled() {
                        continue;
                    }
                    info!("No more seeds to explore");
                    return Ok(Termination::SeedsExhausted);
                };

                let found = batch.identifiers.len();
                let admitted = {
                    let mut session = lock(shared)?;
                    let admitted =
                        self.admit_candidates(&mut session, batch.identifiers, 0, &Origin::seed(&batch.topic));
                    session.stats.seeds_admitted += admitted as u64;
                    admitted
                };
                info!(
                    round = batch.round,
                    topic = %batch.topic,
                    found,
                    admitted,
                    "Seed round complete"
                );
                continue;
            }

            let workers = (0..self.config.workers).map(|worker| self.work(worker, shared));
            try_join_all(workers).await?;
        }
    }

    /// Drain the frontier until it is empty with nothing in flight, the
    /// target is met, or the run is cancelled.
    async fn work(&self, worker: usize, shared: &Mutex<Session>) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            // registered before the state check so a finish in between still wakes us
            let finished = self.idle.notified();
            let next = {
                let mut session = lock(shared)?;
                if session.target_reached() {
                    Next::Done
                } else if let Some(entry) = session.frontier.take_next() {
                    session.in_flight += 1;
                    Next::Entry(entry)
                } else if session.in_flight == 0 {
                    Next::Done
                } else {
                    Next::Wait
                }
            };

            match next {
                Next::Done => return Ok(()),
                Next::Wait => finished.await,
                Next::Entry(entry) => {
                    let outcome = self.process(worker, shared, entry).await;
                    lock(shared)?.in_flight -= 1;
                    self.idle.notify_waiters();
                    outcome?;
                    self.pacer.pace().await;
                }
            }
        }
    }

    async fn process(&self, worker: usize, shared: &Mutex<Session>, entry: FrontierEntry) -> Result<()> {
        let FrontierEntry {
            identifier, depth, ..
        } = entry;

        {
            let mut session = lock(shared)?;
            session.stats.processed += 1;
            session.stats.resolve_calls += 1;
            let every = self.config.progress_every;
            if every > 0 && session.stats.processed % every == 0 {
                info!(
                    processed = session.stats.processed,
                    identifier = %identifier,
                    depth,
                    progress = %format!("{:.0}%", session.progress() * 100.0),
                    found = session.results.len(),
                    target = self.config.target,
                    frontier = session.frontier.len(),
                    visited = session.frontier.visited_count(),
                    "Discovery progress"
                );
            }
        }

        let Some(profile) = self.resolve(shared, &identifier).await? else {
            return Ok(());
        };

        let threshold = self.config.min_followers;
        let tier = classify(profile.follower_count, threshold);
        let followers = profile.follower_count;

        let (snapshot, reached, progress, frontier_full) = {
            let mut session = lock(shared)?;
            let mut snapshot = None;
            if followers >= threshold {
                let result = QualifiedResult {
                    discovery_path: session.frontier.discovery_path(&identifier),
                    profile,
                    discovery_depth: depth,
                };
                if let Some(count) = session.record(result) {
                    info!(
                        worker,
                        count,
                        target = self.config.target,
                        identifier = %identifier,
                        followers = %format_count(followers),
                        depth,
                        "Found qualifying profile"
                    );
                    let every = self.config.checkpoint_every;
                    if every > 0 && count % every == 0 {
                        snapshot = Some(session.results.clone());
                    }
                }
            } else {
                session.stats.below_threshold += 1;
                debug!(identifier = %identifier, followers, tier = %tier, "Below threshold");
            }
            (
                snapshot,
                session.target_reached(),
                session.progress(),
                session.frontier.is_full(),
            )
        };

        if let Some(results) = snapshot {
            let mut stats = DiscoveryStats::default();
            self.export(&results, CheckpointReason::Periodic, &mut stats);
            let mut session = lock(shared)?;
            session.stats.checkpoints_written += stats.checkpoints_written;
            session.stats.checkpoints_failed += stats.checkpoints_failed;
        }
        if reached {
            return Ok(());
        }

        let limits = self.config.tiers.limits(tier);
        let decision = if depth >= limits.max_depth {
            Expansion::MaxDepth
        } else if frontier_full {
            Expansion::FrontierFull
        } else if progress >= self.config.near_target_ratio {
            Expansion::NearTarget
        } else if self.cancel.is_cancelled() {
            Expansion::Cancelled
        } else {
            Expansion::Expand
        };

        let skipped = match decision {
            Expansion::Expand => None,
            Expansion::MaxDepth => Some("max depth"),
            Expansion::FrontierFull => Some("frontier full"),
            Expansion::NearTarget => Some("near target"),
            Expansion::Cancelled => Some("cancelled"),
        };
        if let Some(reason) = skipped {
            let mut session = lock(shared)?;
            match decision {
                Expansion::MaxDepth => session.stats.skipped_max_depth += 1,
                Expansion::FrontierFull => session.stats.skipped_frontier_full += 1,
                Expansion::NearTarget => session.stats.skipped_near_target += 1,
                _ => session.stats.skipped_cancelled += 1,
            }
            debug!(identifier = %identifier, tier = %tier, depth, reason, "Not expanding");
            return Ok(());
        }

        let candidates = self.fetch_neighbors(shared, &identifier, limits.expansion_width).await?;
        let found = candidates.len();
        let mut session = lock(shared)?;
        session.stats.expansions.bump(tier);
        let admitted = self.admit_candidates(
            &mut session,
            candidates.into_iter().take(limits.expansion_width),
            depth + 1,
            &Origin::account(&identifier),
        );
        session.stats.neighbors_admitted += admitted as u64;
        debug!(
            identifier = %identifier,
            tier = %tier,
            found,
            admitted,
            frontier = session.frontier.len(),
            "Expanded"
        );
        Ok(())
    }

    /// `None` means unresolvable: lookup failed, timed out, or the profile is
    /// private and private profiles are dead ends.
    async fn resolve(&self, shared: &Mutex<Session>, identifier: &str) -> Result<Option<ProfileSummary>> {
        let call = self.collaborators.resolver.resolve(identifier);
        let outcome = tokio::time::timeout(self.config.call_timeout(), call).await;

        let mut session = lock(shared)?;
        match outcome {
            Ok(Ok(profile)) if profile.is_private && self.config.private_is_unresolvable => {
                debug!(identifier, "Private profile, skipping");
                session.stats.unresolvable += 1;
                session.stats.private_skipped += 1;
                Ok(None)
            }
            Ok(Ok(profile)) => Ok(Some(profile)),
            Ok(Err(e)) => {
                debug!(identifier, kind = e.kind(), error = %e, "Profile unavailable");
                session.stats.unresolvable += 1;
                Ok(None)
            }
            Err(_) => {
                debug!(identifier, "Profile lookup timed out");
                session.stats.unresolvable += 1;
                Ok(None)
            }
        }
    }

    /// Failures and timeouts yield no neighbors.
    async fn fetch_neighbors(
        &self,
        shared: &Mutex<Session>,
        identifier: &str,
        width: usize,
    ) -> Result<Vec<Identifier>> {
        let call = self.collaborators.neighbors.neighbors(identifier, width);
        let outcome = tokio::time::timeout(self.config.call_timeout(), call).await;

        let mut session = lock(shared)?;
        session.stats.neighbor_calls += 1;
        match outcome {
            Ok(Ok(neighbors)) => Ok(neighbors),
            Ok(Err(e)) => {
                warn!(identifier, kind = e.kind(), error = %e, "Similar accounts lookup failed");
                session.stats.neighbor_failures += 1;
                Ok(Vec::new())
            }
            Err(_) => {
                warn!(identifier, "Similar accounts lookup timed out");
                session.stats.neighbor_failures += 1;
                Ok(Vec::new())
            }
        }
    }

    /// Validate then admit. Returns how many were admitted.
    fn admit_candidates(
        &self,
        session: &mut Session,
        candidates: impl IntoIterator<Item = Identifier>,
        depth: u32,
        origin: &Origin,
    ) -> usize {
        let mut admitted = 0;
        for candidate in candidates {
            if let Err(e) = self.validator.check(&candidate) {
                debug!(error = %e, "Rejected candidate");
                session.stats.validation_rejected += 1;
                continue;
            }
            match session.frontier.try_admit(candidate, depth, origin.clone()) {
                Admission::Admitted => admitted += 1,
                Admission::AlreadyVisited => session.stats.already_visited += 1,
                Admission::AtCapacity => session.stats.dropped_at_capacity += 1,
            }
        }
        admitted
    }

    /// Export failures are logged and counted, never escalated.
    fn export(
        &self,
        results: &[QualifiedResult],
        reason: CheckpointReason,
        stats: &mut DiscoveryStats,
    ) -> Option<PathBuf> {
        let hint = CheckpointHint {
            run_id: self.run_id,
            topic: self.topic.clone(),
            min_followers: self.config.min_followers,
            reason,
        };
        match self.collaborators.checkpoints.export(results, &hint) {
            Ok(path) => {
                stats.checkpoints_written += 1;
                info!(reason = %reason, profiles = results.len(), path = %path.display(), "Saved results");
                Some(path)
            }
            Err(e) => {
                stats.checkpoints_failed += 1;
                warn!(reason = %reason, error = %e, "Failed to save results");
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn lock(shared: &Mutex<Session>) -> Result<MutexGuard<'_, Session>> {
    shared
        .lock()
        .map_err(|_| anyhow!("discovery state lock poisoned"))
}
