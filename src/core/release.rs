//! Release identifiers and the selection rules built on them.
//!
//! A release is a directory under `<root>/releases/` whose name is the Unix
//! epoch second it was created at. Because every id is exactly ten digits,
//! string order and numeric order agree.

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("release pattern is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Parse a directory name; surrounding whitespace is ignored.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        release_pattern()
            .is_match(name)
            .then(|| Self(name.to_string()))
    }

    /// Release id for an epoch timestamp, if it has the ten-digit shape.
    pub fn from_timestamp(secs: i64) -> Option<Self> {
        Self::parse(&secs.to_string())
    }

    pub fn now() -> Option<Self> {
        Self::from_timestamp(Utc::now().timestamp())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn timestamp(&self) -> i64 {
        // Ten ASCII digits always fit in an i64.
        self.0.parse().unwrap_or_default()
    }

    /// Human readable creation time, e.g. `3rd March 2024 at 14:05:09`.
    pub fn created_on(&self) -> String {
        match DateTime::<Utc>::from_timestamp(self.timestamp(), 0) {
            Some(time) => format!(
                "{}{} {}",
                time.day(),
                ordinal_suffix(time.day()),
                time.format("%B %Y at %H:%M:%S")
            ),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ReleaseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Collect release ids from `ls -1` output, ascending. Other entries are ignored.
pub fn parse_listing(output: &str) -> Vec<ReleaseId> {
    let mut releases: Vec<ReleaseId> = output.lines().filter_map(ReleaseId::parse).collect();
    releases.sort();
    releases.dedup();
    releases
}

/// Releases that fall outside the `retain` newest ones, newest first.
///
/// A `retain` of zero disables pruning entirely.
pub fn select_for_removal(releases: &[ReleaseId], retain: u32) -> Vec<ReleaseId> {
    if retain == 0 {
        return Vec::new();
    }

    let mut newest_first = releases.to_vec();
    newest_first.sort_by(|a, b| b.cmp(a));
    newest_first.into_iter().skip(retain as usize).collect()
}

/// The release immediately older than `current` in `releases`.
pub fn predecessor(releases: &[ReleaseId], current: &ReleaseId) -> Option<ReleaseId> {
    let mut ascending = releases.to_vec();
    ascending.sort();
    let position = ascending.iter().position(|r| r == current)?;
    position
        .checked_sub(1)
        .map(|previous| ascending[previous].clone())
}
