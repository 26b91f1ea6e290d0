use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::partition::partition;
use super::request::{scan_shard, SearchRequest, SearchStrategy};
use crate::diagnostics::{Diagnostic, Reporter};
use crate::errors::{SearchError, SearchResult};
use crate::results::SearchOutcome;

/// Shared-memory worker pool.
///
/// Each non-empty shard runs as one job on a dedicated rayon pool sized to
/// the request. Workers scan without holding any lock and take the single
/// outcome mutex only to fold their finished partial result.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPoolSearch;

impl ThreadPoolSearch {
    pub fn new() -> Self {
        Self
    }
}

impl SearchStrategy for ThreadPoolSearch {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn search(
        &self,
        request: &SearchRequest,
        reporter: &dyn Reporter,
    ) -> SearchResult<SearchOutcome> {
        let started = Instant::now();
        request.validate()?;
        info!(
            "Starting thread search over {} files for {:?}",
            request.files.len(),
            request.keywords
        );

        if request.is_trivial() {
            debug!("Nothing to search, returning empty result");
            return Ok(SearchOutcome::new());
        }

        let shards = partition(&request.files, request.workers.get());
        let active: Vec<(usize, &Vec<_>)> = shards
            .iter()
            .enumerate()
            .filter(|(_, shard)| !shard.is_empty())
            .collect();
        debug!(
            "Partitioned {} files into {} shards, {} non-empty",
            request.files.len(),
            shards.len(),
            active.len()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(active.len())
            .thread_name(|index| format!("kwscout-worker-{}", index))
            .build()
            .map_err(|e| SearchError::worker_launch(e.to_string()))?;

        let scanner = request.scanner();
        let shared = Mutex::new(SearchOutcome {
            workers_launched: active.len(),
            ..SearchOutcome::new()
        });

        pool.scope(|scope| {
            for &(worker, shard) in &active {
                let scanner = &scanner;
                let shared = &shared;
                scope.spawn(move |_| {
                    let scanned = panic::catch_unwind(AssertUnwindSafe(|| {
                        scan_shard(worker, shard.as_slice(), scanner, reporter)
                    }));

                    // Only the fold runs under the lock.
                    match scanned {
                        Ok(partial) => {
                            shared
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .fold(partial);
                        }
                        Err(_) => {
                            let diagnostic = Diagnostic::error(format!(
                                "worker panicked, {} files in its shard were not searched",
                                shard.len()
                            ))
                            .for_worker(worker);
                            shared
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .note(diagnostic.clone());

                            // The reporter itself may be what panicked.
                            let reported = panic::catch_unwind(AssertUnwindSafe(|| {
                                reporter.report(&diagnostic)
                            }));
                            if reported.is_err() {
                                warn!("Reporter panicked while reporting: {}", diagnostic);
                            }
                        }
                    }
                });
            }
        });

        let mut outcome = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
        outcome.elapsed = started.elapsed();

        info!(
            "Thread search complete. Found {} matches for {} keywords in {:?}",
            outcome.matches.total_matches(),
            outcome.matches.len(),
            outcome.elapsed
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::TracingReporter;
    use std::fs;
    use std::num::NonZeroUsize;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn keywords() -> Vec<String> {
        vec!["python".into(), "data".into(), "algorithm".into()]
    }

    #[test]
    fn test_four_file_scenario() {
        let dir = tempdir().unwrap();
        let mut files = Vec::new();
        for (i, word) in ["python", "data", "algorithm", "nothing"].iter().enumerate() {
            let path = dir.path().join(format!("file{}.txt", i + 1));
            fs::write(&path, word).unwrap();
            files.push(path);
        }

        let request = SearchRequest::new(files.clone(), keywords())
            .with_workers(NonZeroUsize::new(2).unwrap());
        let outcome = ThreadPoolSearch::new()
            .search(&request, &TracingReporter)
            .unwrap();

        assert_eq!(outcome.matches.len(), 3);
        assert_eq!(
            outcome.matches.get("python").unwrap(),
            &[format!("{}:line 1", files[0].display())]
        );
        assert_eq!(
            outcome.matches.get("data").unwrap(),
            &[format!("{}:line 1", files[1].display())]
        );
        assert_eq!(
            outcome.matches.get("algorithm").unwrap(),
            &[format!("{}:line 1", files[2].display())]
        );
        let file4 = files[3].display().to_string();
        assert!(outcome
            .matches
            .iter()
            .all(|(_, locations)| locations.iter().all(|l| !l.starts_with(&file4))));
        assert!(outcome.is_complete());
        assert_eq!(outcome.workers_launched, 2);
        assert_eq!(outcome.stats.files_scanned, 4);
    }

    #[test]
    fn test_missing_file_tolerated() {
        let dir = tempdir().unwrap();
        let mut files: Vec<PathBuf> = (0..5)
            .map(|i| {
                let path = dir.path().join(format!("ok_{}.txt", i));
                fs::write(&path, "some data\n").unwrap();
                path
            })
            .collect();
        files.insert(2, dir.path().join("does_not_exist.txt"));

        let request =
            SearchRequest::new(files, keywords()).with_workers(NonZeroUsize::new(3).unwrap());
        let outcome = ThreadPoolSearch::new()
            .search(&request, &TracingReporter)
            .unwrap();

        assert_eq!(outcome.matches.count("data"), 5);
        assert_eq!(outcome.stats.files_failed, 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].message.contains("does_not_exist.txt"));
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_more_workers_than_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.txt");
        fs::write(&path, "data\n").unwrap();

        let request =
            SearchRequest::new(vec![path], keywords()).with_workers(NonZeroUsize::new(8).unwrap());
        let outcome = ThreadPoolSearch::new()
            .search(&request, &TracingReporter)
            .unwrap();

        assert_eq!(outcome.workers_launched, 1);
        assert_eq!(outcome.matches.count("data"), 1);
    }

    struct PanickingReporter;

    impl Reporter for PanickingReporter {
        fn report(&self, _diagnostic: &Diagnostic) {
            panic!("reporter fault");
        }
    }

    #[test]
    fn test_panicking_reporter_loses_only_its_shard() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "python\n").unwrap();
        let files = vec![good.clone(), dir.path().join("missing.txt")];

        let request =
            SearchRequest::new(files, keywords()).with_workers(NonZeroUsize::new(2).unwrap());
        let outcome = ThreadPoolSearch::new()
            .search(&request, &PanickingReporter)
            .unwrap();

        assert_eq!(
            outcome.matches.get("python").unwrap(),
            &[format!("{}:line 1", good.display())]
        );
        assert_eq!(outcome.workers_launched, 2);
        assert_eq!(outcome.workers_reported, 1);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].worker, Some(1));
        assert!(outcome.diagnostics[0].message.contains("worker panicked"));
    }

    #[test]
    fn test_trivial_requests() {
        let outcome = ThreadPoolSearch::new()
            .search(&SearchRequest::new(vec![], keywords()), &TracingReporter)
            .unwrap();
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.workers_launched, 0);

        let outcome = ThreadPoolSearch::new()
            .search(
                &SearchRequest::new(vec![PathBuf::from("x")], vec![]),
                &TracingReporter,
            )
            .unwrap();
        assert!(outcome.matches.is_empty());

        let err = ThreadPoolSearch::new()
            .search(
                &SearchRequest::new(vec![PathBuf::from("x")], vec![String::new()]),
                &TracingReporter,
            )
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidKeyword(_)));
    }
}
