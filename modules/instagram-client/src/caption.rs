//! Username recovery from hashtag posts.
//!
//! Hashtag feeds rarely carry the author's handle directly. When the owner
//! block has no username we fall back to the accessibility caption, which
//! Instagram renders as e.g. "Photo by jane.doe on May 02, 2024. May be an
//! image of ...". Candidates are returned in priority order; deciding which
//! one is a real account (and not "May" or "Jessica") is the caller's job.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::PostNode;

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([a-zA-Z0-9_.]+)").unwrap());

static BYLINE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Photo by ([a-zA-Z0-9_.\s]+) on",
        r"(?i)Video by ([a-zA-Z0-9_.\s]+) on",
        r"(?i)Reel by ([a-zA-Z0-9_.\s]+) on",
        r"(?i)Photo shared by ([a-zA-Z0-9_.\s]+) on",
        r"(?i)Video shared by ([a-zA-Z0-9_.\s]+) on",
        r"(?i)Reel shared by ([a-zA-Z0-9_.\s]+) on",
        r"(?i)shared by ([a-zA-Z0-9_.\s]+) on",
        r"(?i)Photo shared by ([a-zA-Z0-9_.\s]+) tagging",
        r"(?i)by ([a-zA-Z0-9_.\s]+) in [A-Za-z]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static QUOTED_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#""([a-zA-Z0-9_.]+)""#).unwrap(),
        Regex::new(r"'([a-zA-Z0-9_.]+)'").unwrap(),
    ]
});

/// All plausible usernames in a caption, most reliable first:
/// explicit @mentions, then single-word "Photo by X on" bylines, then quoted tokens.
pub fn caption_candidates(caption: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        if !candidate.is_empty() && !out.iter().any(|c| c == candidate) {
            out.push(candidate.to_string());
        }
    };

    for cap in MENTION_RE.captures_iter(caption) {
        push(&cap[1]);
    }

    for re in BYLINE_RES.iter() {
        if let Some(cap) = re.captures(caption) {
            let name = cap[1].trim();
            // "Jessica Chen" is a display name, not a handle
            if !name.contains(char::is_whitespace) {
                push(name);
            }
        }
    }

    for re in QUOTED_RES.iter() {
        for cap in re.captures_iter(caption) {
            push(&cap[1]);
        }
    }

    out
}

impl PostNode {
    /// Username candidates for this post's author. A username on the owner
    /// block wins outright; otherwise the caption is mined.
    pub fn username_candidates(&self) -> Vec<String> {
        if let Some(name) = self
            .owner
            .as_ref()
            .and_then(|o| o.username.as_deref())
            .filter(|n| !n.is_empty())
        {
            return vec![name.to_string()];
        }
        self.accessibility_caption
            .as_deref()
            .map(caption_candidates)
            .unwrap_or_default()
    }
}
