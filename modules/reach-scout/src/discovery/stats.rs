use std::fmt;

use reach_common::QualityTier;
use serde::Serialize;

use crate::infra::util::percent;

/// Per-tier counter.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct TierCounts {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl TierCounts {
    pub fn bump(&mut self, tier: QualityTier) {
        match tier {
            QualityTier::High => self.high += 1,
            QualityTier::Medium => self.medium += 1,
            QualityTier::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.high + self.medium + self.low
    }
}

/// Counters from a discovery run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DiscoveryStats {
    pub processed: u64,
    pub qualified: u64,
    pub below_threshold: u64,
    pub unresolvable: u64,
    pub private_skipped: u64,
    pub validation_rejected: u64,
    pub already_visited: u64,
    pub dropped_at_capacity: u64,
    pub seeds_admitted: u64,
    pub neighbors_admitted: u64,
    pub expansions: TierCounts,
    pub skipped_max_depth: u64,
    pub skipped_frontier_full: u64,
    pub skipped_near_target: u64,
    pub skipped_cancelled: u64,
    pub resolve_calls: u64,
    pub neighbor_calls: u64,
    pub neighbor_failures: u64,
    pub seed_page_calls: u64,
    pub seed_rounds: u32,
    pub topics_searched: u32,
    pub checkpoints_written: u32,
    pub checkpoints_failed: u32,
}

impl DiscoveryStats {
    pub fn api_calls(&self) -> u64 {
        self.resolve_calls + self.neighbor_calls + self.seed_page_calls
    }
}

impl fmt::Display for DiscoveryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accounts processed: {}", self.processed)?;
        writeln!(
            f,
            "Qualified:          {} ({:.1}%)",
            self.qualified,
            percent(self.qualified, self.processed)
        )?;
        writeln!(f, "Below threshold:    {}", self.below_threshold)?;
        writeln!(f, "Unresolvable:       {}", self.unresolvable)?;
        if self.private_skipped > 0 {
            writeln!(f, "  of which private: {}", self.private_skipped)?;
        }
        writeln!(f, "\nFrontier:")?;
        writeln!(f, "  Seeds admitted:     {}", self.seeds_admitted)?;
        writeln!(f, "  Neighbors admitted: {}", self.neighbors_admitted)?;
        writeln!(f, "  Already visited:    {}", self.already_visited)?;
        writeln!(f, "  Invalid handles:    {}", self.validation_rejected)?;
        writeln!(f, "  Dropped (full):     {}", self.dropped_at_capacity)?;
        writeln!(f, "\nExpansions: {}", self.expansions.total())?;
        writeln!(f, "  High:   {}", self.expansions.high)?;
        writeln!(f, "  Medium: {}", self.expansions.medium)?;
        writeln!(f, "  Low:    {}", self.expansions.low)?;
        let skipped = self.skipped_max_depth
            + self.skipped_frontier_full
            + self.skipped_near_target
            + self.skipped_cancelled;
        if skipped > 0 {
            writeln!(f, "Skipped expansions: {skipped}")?;
            writeln!(f, "  Max depth:      {}", self.skipped_max_depth)?;
            writeln!(f, "  Frontier full:  {}", self.skipped_frontier_full)?;
            writeln!(f, "  Near target:    {}", self.skipped_near_target)?;
            writeln!(f, "  Cancelled:      {}", self.skipped_cancelled)?;
        }
        writeln!(f, "\nAPI calls: {}", self.api_calls())?;
        writeln!(f, "  Profile lookups:  {}", self.resolve_calls)?;
        writeln!(
            f,
            "  Similar accounts: {} ({} failed)",
            self.neighbor_calls, self.neighbor_failures
        )?;
        writeln!(f, "  Hashtag pages:    {}", self.seed_page_calls)?;
        writeln!(
            f,
            "Seed rounds: {} across {} topic(s)",
            self.seed_rounds, self.topics_searched
        )?;
        write!(
            f,
            "Checkpoints: {} written, {} failed",
            self.checkpoints_written, self.checkpoints_failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_counts_bump_by_tier() {
        let mut counts = TierCounts::default();
        counts.bump(QualityTier::High);
        counts.bump(QualityTier::Low);
        counts.bump(QualityTier::Low);
        assert_eq!(counts.high, 1);
        assert_eq!(counts.low, 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn display_hides_empty_skip_section() {
        let stats = DiscoveryStats {
            processed: 4,
            qualified: 1,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("Qualified:          1 (25.0%)"));
        assert!(!text.contains("Skipped expansions"));
    }
}
