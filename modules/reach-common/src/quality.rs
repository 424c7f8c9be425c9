use serde::{Deserialize, Serialize};

/// Quality bucket of a resolved account, relative to the follower threshold.
/// Ordered by expansion generosity: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Below half the threshold
    Low,
    /// At least half the threshold but short of it
    Medium,
    /// Meets or exceeds the threshold
    High,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an account by follower count. Pure and total.
///
/// "Half the threshold" is compared as `2 * followers >= threshold` so odd
/// thresholds don't round in either direction.
pub fn classify(follower_count: u64, threshold: u64) -> QualityTier {
    if follower_count >= threshold {
        QualityTier::High
    } else if follower_count.saturating_mul(2) >= threshold {
        QualityTier::Medium
    } else {
        QualityTier::Low
    }
}

/// Expansion limits for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierLimits {
    /// An entry at depth `d` is expanded only while `d < max_depth`.
    pub max_depth: u32,
    /// How many similar accounts to request when expanding.
    pub expansion_width: usize,
}

/// Per-tier expansion policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierPolicy {
    pub high: TierLimits,
    pub medium: TierLimits,
    pub low: TierLimits,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            high: TierLimits {
                max_depth: 3,
                expansion_width: 25,
            },
            medium: TierLimits {
                max_depth: 1,
                expansion_width: 15,
            },
            low: TierLimits {
                max_depth: 1,
                expansion_width: 8,
            },
        }
    }
}

impl TierPolicy {
    pub fn limits(&self, tier: QualityTier) -> TierLimits {
        match tier {
            QualityTier::High => self.high,
            QualityTier::Medium => self.medium,
            QualityTier::Low => self.low,
        }
    }

    pub fn max_depth(&self, tier: QualityTier) -> u32 {
        self.limits(tier).max_depth
    }

    pub fn expansion_width(&self, tier: QualityTier) -> usize {
        self.limits(tier).expansion_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(classify(50_000, 50_000), QualityTier::High);
        assert_eq!(classify(49_999, 50_000), QualityTier::Medium);
        assert_eq!(classify(25_000, 50_000), QualityTier::Medium);
        assert_eq!(classify(24_999, 50_000), QualityTier::Low);
        assert_eq!(classify(0, 50_000), QualityTier::Low);
    }

    #[test]
    fn odd_threshold_half_is_not_rounded_down() {
        // half of 5 is 2.5: 2 is Low, 3 is Medium
        assert_eq!(classify(2, 5), QualityTier::Low);
        assert_eq!(classify(3, 5), QualityTier::Medium);
    }

    #[test]
    fn zero_threshold_is_always_high() {
        assert_eq!(classify(0, 0), QualityTier::High);
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        assert_eq!(classify(u64::MAX - 1, u64::MAX), QualityTier::Medium);
    }

    #[test]
    fn default_policy_table() {
        let policy = TierPolicy::default();
        assert_eq!(policy.max_depth(QualityTier::High), 3);
        assert_eq!(policy.expansion_width(QualityTier::High), 25);
        assert_eq!(policy.max_depth(QualityTier::Medium), 1);
        assert_eq!(policy.expansion_width(QualityTier::Medium), 15);
        assert_eq!(policy.max_depth(QualityTier::Low), 1);
        assert_eq!(policy.expansion_width(QualityTier::Low), 8);
    }

    proptest! {
        #[test]
        fn classify_is_monotonic_in_followers(a in 0u64..10_000_000, b in 0u64..10_000_000, threshold in 0u64..5_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify(lo, threshold) <= classify(hi, threshold));
        }

        #[test]
        fn default_policy_is_monotonic_in_tier(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let policy = TierPolicy::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let (t_lo, t_hi) = (classify(lo, 50_000), classify(hi, 50_000));
            prop_assert!(policy.max_depth(t_lo) <= policy.max_depth(t_hi));
            prop_assert!(policy.expansion_width(t_lo) <= policy.expansion_width(t_hi));
        }
    }
}
