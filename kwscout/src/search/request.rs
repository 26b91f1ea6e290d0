use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::scanner::KeywordScanner;
use crate::config::{default_worker_count, EncodingMode, SearchConfig};
use crate::diagnostics::{Diagnostic, Reporter};
use crate::errors::{SearchError, SearchResult};
use crate::results::{PartialResult, SearchOutcome};

/// Input to a search: which files, which keywords, how many workers.
///
/// Paths may repeat and need not be readable; unreadable ones cost a
/// diagnostic, not the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub files: Vec<PathBuf>,
    pub keywords: Vec<String>,
    pub workers: NonZeroUsize,
    pub encoding_mode: EncodingMode,
}

impl SearchRequest {
    /// Creates a request sized to the available parallelism
    pub fn new(files: Vec<PathBuf>, keywords: Vec<String>) -> Self {
        Self {
            files,
            keywords,
            workers: default_worker_count(),
            encoding_mode: EncodingMode::default(),
        }
    }

    /// Builds a request from a loaded configuration
    pub fn from_config(config: &SearchConfig, files: Vec<PathBuf>) -> Self {
        Self {
            files,
            keywords: config.keywords.clone(),
            workers: config.worker_count,
            encoding_mode: config.encoding_mode,
        }
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_encoding(mut self, encoding_mode: EncodingMode) -> Self {
        self.encoding_mode = encoding_mode;
        self
    }

    /// Rejects keywords that would match every line.
    pub fn validate(&self) -> SearchResult<()> {
        if self.keywords.iter().any(|k| k.is_empty()) {
            return Err(SearchError::invalid_keyword(
                "keywords must be non-empty strings",
            ));
        }
        Ok(())
    }

    /// True when no worker needs to run at all
    pub fn is_trivial(&self) -> bool {
        self.files.is_empty() || self.keywords.is_empty()
    }

    pub fn scanner(&self) -> KeywordScanner {
        KeywordScanner::new(&self.keywords).with_encoding(self.encoding_mode)
    }
}

/// A worker pool that can run a [`SearchRequest`].
pub trait SearchStrategy {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Runs the search, reporting diagnostics as they occur.
    ///
    /// Only failures that prevent the search as a whole are returned as
    /// errors; everything else ends up in the outcome's diagnostics.
    fn search(&self, request: &SearchRequest, reporter: &dyn Reporter)
        -> SearchResult<SearchOutcome>;
}

/// Scans every file of one shard in order, folding per-file results into a
/// worker-local partial result.
///
/// Per-file failures become diagnostics and the loop moves on.
pub fn scan_shard<P: AsRef<Path>>(
    worker: usize,
    files: &[P],
    scanner: &KeywordScanner,
    reporter: &dyn Reporter,
) -> PartialResult {
    let mut partial = PartialResult::new(worker);

    for path in files {
        let path = path.as_ref();
        match scanner.scan_file(path) {
            Ok(scan) => {
                partial.stats.files_scanned += 1;
                partial.stats.lines_scanned += scan.lines;
                partial.stats.bytes_read += scan.bytes;
                partial.matches.extend(scan.matches);
            }
            Err(e) => {
                partial.stats.files_failed += 1;
                let diagnostic = Diagnostic::file_failure(path, &e).for_worker(worker);
                reporter.report(&diagnostic);
                partial.diagnostics.push(diagnostic);
            }
        }
    }

    debug!(
        "Worker {} scanned {} files ({} failed), {} keywords matched",
        worker,
        partial.stats.files_scanned,
        partial.stats.files_failed,
        partial.matches.len()
    );
    partial
}
