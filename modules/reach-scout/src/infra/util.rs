// Formatting helpers shared by logging, the run report and export file names.

/// Compact follower count: 950, 1.2K, 3.4M.
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Threshold label used in file names, e.g. 50000 -> `50k+`.
pub fn threshold_label(min_followers: u64) -> String {
    format!("{}k+", min_followers / 1_000)
}

/// Share of `part` in `whole` as a percentage; 0 when `whole` is 0.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
