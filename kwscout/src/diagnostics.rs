//! Diagnostics raised while searching, and the capability used to report them.
//!
//! Searches never log through ambient state alone: every entry point takes a
//! [`Reporter`], and every diagnostic is also kept in the returned
//! [`SearchOutcome`](crate::results::SearchOutcome).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{error, warn};

use crate::errors::SearchError;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal problem encountered during a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Index of the worker that raised it, if any
    pub worker: Option<usize>,
    /// File the problem relates to, if any
    pub path: Option<PathBuf>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            worker: None,
            path: None,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(message)
        }
    }

    /// Builds the diagnostic for a file that could not be scanned.
    pub fn file_failure(path: impl Into<PathBuf>, err: &SearchError) -> Self {
        let path = path.into();
        let message = match err {
            SearchError::FileNotFound(_) => format!("File not found: {}", path.display()),
            other => format!("Error processing file {}: {}", path.display(), other),
        };
        Self {
            path: Some(path),
            ..Self::error(message)
        }
    }

    pub fn for_worker(mut self, worker: usize) -> Self {
        self.worker = Some(worker);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.worker {
            Some(worker) => write!(f, "[worker {}] {}", worker, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Receives diagnostics as they happen.
///
/// Implementations are called from worker threads, so they must be
/// `Send + Sync`. A search produces the same outcome whatever reporter it is
/// given.
pub trait Reporter: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` at their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!("{}", diagnostic),
            Severity::Error => error!("{}", diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Diagnostic>>);

    impl Reporter for Recording {
        fn report(&self, diagnostic: &Diagnostic) {
            self.0.lock().unwrap().push(diagnostic.clone());
        }
    }

    #[test]
    fn test_file_failure_messages() {
        let err = SearchError::file_not_found("gone.txt");
        let diag = Diagnostic::file_failure("gone.txt", &err);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "File not found: gone.txt");
        assert_eq!(diag.path, Some(PathBuf::from("gone.txt")));

        let err = SearchError::permission_denied("locked.txt");
        let diag = Diagnostic::file_failure("locked.txt", &err).for_worker(3);
        assert!(diag.message.starts_with("Error processing file locked.txt"));
        assert_eq!(diag.to_string(), format!("[worker 3] {}", diag.message));
    }

    #[test]
    fn test_reporter_is_object_safe() {
        let recording = Recording::default();
        let reporter: &dyn Reporter = &recording;
        reporter.report(&Diagnostic::warning("slow worker"));
        TracingReporter.report(&Diagnostic::warning("goes to tracing"));

        let seen = recording.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "slow worker");
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Diagnostic::error("boom")).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
    }
}
