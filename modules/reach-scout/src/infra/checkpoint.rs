use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use reach_common::QualifiedResult;

use super::util::threshold_label;
use crate::traits::{CheckpointHint, CheckpointReason, CheckpointWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

const CSV_HEADER: [&str; 11] = [
    "rank",
    "username",
    "full_name",
    "followers",
    "following",
    "posts",
    "verified",
    "private",
    "profile_url",
    "discovery_depth",
    "discovery_path",
];

/// One exported profile, ranked by follower count.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    rank: usize,
    username: &'a str,
    full_name: &'a str,
    followers: u64,
    following: u64,
    posts: u64,
    verified: bool,
    private: bool,
    profile_url: &'a str,
    discovery_depth: u32,
    discovery_path: &'a str,
}

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    run_id: Uuid,
    topic: Option<&'a str>,
    min_followers: u64,
    reason: CheckpointReason,
    exported_at: DateTime<Utc>,
    total_profiles: usize,
    profiles: Vec<ExportRow<'a>>,
}

/// Writes checkpoints and the final export to disk.
///
/// Periodic snapshots are `checkpoint_*`, interrupted runs `emergency_*`,
/// completed runs `profiles_*` (or the explicit output path when given).
pub struct FileCheckpointWriter {
    dir: PathBuf,
    format: ExportFormat,
    final_output: Option<PathBuf>,
}

impl FileCheckpointWriter {
    pub fn new(dir: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
            final_output: None,
        }
    }

    /// Write the completed export here instead of a generated name.
    pub fn with_final_output(mut self, path: Option<PathBuf>) -> Self {
        self.final_output = path;
        self
    }

    fn path_for(&self, count: usize, hint: &CheckpointHint) -> PathBuf {
        let prefix = match hint.reason {
            CheckpointReason::Periodic => "checkpoint",
            CheckpointReason::Cancelled | CheckpointReason::Emergency => "emergency",
            CheckpointReason::Completed => {
                if let Some(path) = &self.final_output {
                    return path.clone();
                }
                "profiles"
            }
        };
        let name = format!(
            "{prefix}_{count}_profiles_{}_{}.{}",
            threshold_label(hint.min_followers),
            Utc::now().timestamp(),
            self.format.extension()
        );
        self.dir.join(name)
    }
}

impl CheckpointWriter for FileCheckpointWriter {
    fn export(&self, results: &[QualifiedResult], hint: &CheckpointHint) -> Result<PathBuf> {
        let path = self.path_for(results.len(), hint);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let rows = ranked_rows(results);
        match self.format {
            ExportFormat::Csv => write_csv(&path, &rows)?,
            ExportFormat::Json => {
                let document = ExportDocument {
                    run_id: hint.run_id,
                    topic: hint.topic.as_deref(),
                    min_followers: hint.min_followers,
                    reason: hint.reason,
                    exported_at: Utc::now(),
                    total_profiles: rows.len(),
                    profiles: rows,
                };
                write_json(&path, &document)?;
            }
        }
        Ok(path)
    }
}

/// Highest follower count first; ties keep discovery order.
fn ranked_rows(results: &[QualifiedResult]) -> Vec<ExportRow<'_>> {
    let mut sorted: Vec<_> = results.iter().collect();
    sorted.sort_by(|a, b| b.profile.follower_count.cmp(&a.profile.follower_count));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, r)| ExportRow {
            rank: i + 1,
            username: &r.profile.identifier,
            full_name: &r.profile.display_name,
            followers: r.profile.follower_count,
            following: r.profile.following_count,
            posts: r.profile.post_count,
            verified: r.profile.is_verified,
            private: r.profile.is_private,
            profile_url: &r.profile.profile_url,
            discovery_depth: r.discovery_depth,
            discovery_path: &r.discovery_path,
        })
        .collect()
}

fn write_csv(path: &Path, rows: &[ExportRow<'_>]) -> Result<()> {
    // header written by hand so an empty export still has one
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn write_json(path: &Path, document: &ExportDocument<'_>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, document)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    out.flush()?;
    Ok(())
}
