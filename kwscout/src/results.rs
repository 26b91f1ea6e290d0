//! Result types shared by both worker pools.
//!
//! A worker owns one [`PartialResult`] for its shard and never shares it.
//! Folding a partial into a [`SearchOutcome`] is the only way results from
//! different workers meet, whether that happens under the thread pool's
//! mutex or in the process pool's coordinator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use crate::diagnostics::Diagnostic;

/// Formats a match location as `<path>:line <N>`.
pub fn format_location(path: &Path, line_number: usize) -> String {
    format!("{}:line {}", path.display(), line_number)
}

/// Keyword to match locations, in discovery order.
///
/// A keyword is present only if it has at least one location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordMatches {
    entries: HashMap<String, Vec<String>>,
}

impl KeywordMatches {
    /// Creates an empty map
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a location to the keyword's list, creating the list if needed
    pub fn record(&mut self, keyword: &str, location: String) {
        match self.entries.get_mut(keyword) {
            Some(locations) => locations.push(location),
            None => {
                self.entries.insert(keyword.to_string(), vec![location]);
            }
        }
    }

    /// Folds `other` into this map: each keyword's list is extended, or
    /// created when this map has not seen the keyword yet.
    pub fn extend(&mut self, other: KeywordMatches) {
        for (keyword, locations) in other.entries {
            if locations.is_empty() {
                continue;
            }
            self.entries.entry(keyword).or_default().extend(locations);
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&[String]> {
        self.entries.get(keyword).map(Vec::as_slice)
    }

    pub fn contains_keyword(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    /// Number of locations recorded for `keyword`
    pub fn count(&self, keyword: &str) -> usize {
        self.entries.get(keyword).map_or(0, Vec::len)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(keyword, locations)| (keyword.as_str(), locations.as_slice()))
    }

    /// Number of keywords with at least one match
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of locations across all keywords
    pub fn total_matches(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Keyword-sorted view with each location list sorted.
    ///
    /// Two searches over the same input agree exactly when their sorted
    /// views are equal, whatever order their workers finished in.
    pub fn sorted(&self) -> BTreeMap<&str, Vec<&str>> {
        self.entries
            .iter()
            .map(|(keyword, locations)| {
                let mut sorted: Vec<&str> = locations.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                (keyword.as_str(), sorted)
            })
            .collect()
    }

    /// Whether both maps hold the same multiset of locations per keyword
    pub fn equivalent_to(&self, other: &KeywordMatches) -> bool {
        self.sorted() == other.sorted()
    }

    pub fn into_inner(self) -> HashMap<String, Vec<String>> {
        self.entries
    }
}

impl From<HashMap<String, Vec<String>>> for KeywordMatches {
    fn from(entries: HashMap<String, Vec<String>>) -> Self {
        let mut matches = Self::new();
        matches.extend(Self { entries });
        matches
    }
}

/// Counters describing the work a search performed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Files read to the end
    pub files_scanned: usize,
    /// Files that could not be opened or read
    pub files_failed: usize,
    pub lines_scanned: u64,
    pub bytes_read: u64,
}

impl ScanStats {
    pub fn merge(&mut self, other: ScanStats) {
        self.files_scanned += other.files_scanned;
        self.files_failed += other.files_failed;
        self.lines_scanned += other.lines_scanned;
        self.bytes_read += other.bytes_read;
    }
}

/// Everything one worker found in its shard.
///
/// This is the single message a worker process sends back to the
/// coordinator, so it must stay serializable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialResult {
    /// Index of the shard this result covers
    pub worker: usize,
    pub matches: KeywordMatches,
    pub stats: ScanStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl PartialResult {
    pub fn new(worker: usize) -> Self {
        Self {
            worker,
            ..Default::default()
        }
    }
}

/// The merged result of a search, returned to the caller
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Final keyword map
    pub matches: KeywordMatches,
    pub stats: ScanStats,
    /// Every diagnostic raised by workers or the coordinator
    pub diagnostics: Vec<Diagnostic>,
    /// Workers that were started
    pub workers_launched: usize,
    /// Workers whose partial result has been folded in
    pub workers_reported: usize,
    /// Wall-clock time of the search call
    pub elapsed: Duration,
}

impl SearchOutcome {
    /// Creates an empty outcome
    pub fn new() -> Self {
        Default::default()
    }

    /// Folds one worker's partial result into this outcome
    pub fn fold(&mut self, partial: PartialResult) {
        self.matches.extend(partial.matches);
        self.stats.merge(partial.stats);
        self.diagnostics.extend(partial.diagnostics);
        self.workers_reported += 1;
    }

    /// Records a diagnostic that did not come from a worker's shard
    pub fn note(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// True when every launched worker has been folded in
    pub fn is_complete(&self) -> bool {
        self.workers_reported == self.workers_launched
    }
}
