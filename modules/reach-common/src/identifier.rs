//! Account handle validation.
//!
//! Handles recovered from captions are noisy: "Photo by May on ..." yields
//! "May", quoted text yields random words. The validator is the single gate
//! every candidate passes before it can cost a remote call.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ValidatorConfig;
use crate::error::ReachError;

static HANDLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").unwrap());

/// Words that show up in captions and look like handles but never are.
pub const DEFAULT_DENYLIST: &[&str] = &[
    // social media terms
    "instagram", "photo", "video", "image", "picture", "post", "story", "reel", "igtv",
    "follow", "like", "share", "tag", "comment", "dm", "live", "stories",
    // generic caption words
    "the", "and", "for", "with", "this", "that", "here", "there", "what", "when",
    "where", "how", "why", "who", "all", "any", "can", "now", "new", "get",
    // first names from "Photo by [Name] on" bylines
    "john", "jane", "mike", "sarah", "david", "emily", "chris", "alex", "jessica",
    "michael", "ashley", "daniel", "amanda", "james", "lisa", "robert", "jennifer",
    "william", "elizabeth", "richard", "maria", "thomas", "susan", "charles", "nancy",
    // dates
    "january", "february", "march", "april", "may", "june", "july", "august",
    "september", "october", "november", "december", "jan", "feb", "mar", "apr",
    "jun", "jul", "aug", "sep", "oct", "nov", "dec", "monday", "tuesday",
    "wednesday", "thursday", "friday", "saturday", "sunday",
    // account-ish nouns
    "content", "creator", "user", "account", "profile", "page", "feed", "explore",
];

#[derive(Debug, Clone)]
pub struct IdentifierValidator {
    min_length: usize,
    max_length: usize,
    denylist: HashSet<String>,
}

impl Default for IdentifierValidator {
    fn default() -> Self {
        Self::new(&ValidatorConfig::default())
    }
}

impl IdentifierValidator {
    pub fn new(config: &ValidatorConfig) -> Self {
        let base: Vec<String> = match &config.denylist {
            Some(words) => words.clone(),
            None => DEFAULT_DENYLIST.iter().map(|w| w.to_string()).collect(),
        };
        let denylist = base
            .into_iter()
            .chain(config.extra_denylist.iter().cloned())
            .map(|w| w.to_lowercase())
            .collect();
        Self {
            min_length: config.min_length,
            max_length: config.max_length,
            denylist,
        }
    }

    /// Stricter variant for handles mined from free text.
    pub fn for_free_text(config: &ValidatorConfig) -> Self {
        let mut validator = Self::new(config);
        validator.min_length = validator.min_length.max(config.free_text_min_length);
        validator
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        self.check(candidate).is_ok()
    }

    /// Like [`is_valid`](Self::is_valid) but says why a candidate was rejected.
    pub fn check(&self, candidate: &str) -> Result<(), ReachError> {
        if candidate.is_empty() {
            return Err(ReachError::Validation("empty identifier".into()));
        }
        if !HANDLE_RE.is_match(candidate) {
            return Err(ReachError::Validation(format!(
                "{candidate:?} contains characters outside [A-Za-z0-9_.]"
            )));
        }
        // ASCII-only past this point, so byte length is char length
        let len = candidate.len();
        if len < self.min_length || len > self.max_length {
            return Err(ReachError::Validation(format!(
                "{candidate:?} length {len} outside {}..={}",
                self.min_length, self.max_length
            )));
        }
        if self.denylist.contains(&candidate.to_lowercase()) {
            return Err(ReachError::Validation(format!("{candidate:?} is a denylisted word")));
        }
        Ok(())
    }
}
