//! Wire protocol between the process pool coordinator and its workers.
//!
//! Each message is one JSON document on a single line. The coordinator
//! writes exactly one [`WorkRequest`] to a worker's stdin; the worker answers
//! with exactly one [`WorkResponse`] on stdout and exits.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::PartialResult;

/// One worker's assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRequest {
    /// Shard index
    pub worker: usize,
    pub files: Vec<PathBuf>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub encoding_mode: EncodingMode,
}

/// A worker's single reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkResponse {
    /// The whole shard was processed
    Result { partial: PartialResult },
    /// The worker could not process its request
    Error { message: String },
}

impl WorkRequest {
    /// Serialize to a JSON line (with newline)
    pub fn to_line(&self) -> SearchResult<String> {
        to_line(self)
    }

    /// Deserialize from a JSON line
    pub fn from_line(line: &str) -> SearchResult<Self> {
        serde_json::from_str(line.trim()).map_err(|e| {
            SearchError::worker_protocol(format!("invalid work request: {}", e))
        })
    }
}

impl WorkResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to a JSON line (with newline)
    pub fn to_line(&self) -> SearchResult<String> {
        to_line(self)
    }

    /// Deserialize from a JSON line
    pub fn from_line(line: &str) -> SearchResult<Self> {
        serde_json::from_str(line.trim()).map_err(|e| {
            SearchError::worker_protocol(format!("invalid worker response: {}", e))
        })
    }
}

fn to_line<T: Serialize>(message: &T) -> SearchResult<String> {
    let mut json = serde_json::to_string(message)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_line() {
        let request = WorkRequest {
            worker: 1,
            files: vec![PathBuf::from("a.txt"), PathBuf::from("dir/b.txt")],
            keywords: vec!["python".into()],
            encoding_mode: EncodingMode::Lossy,
        };
        let line = request.to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        assert_eq!(WorkRequest::from_line(&line).unwrap(), request);
    }

    #[test]
    fn test_request_encoding_defaults() {
        let request =
            WorkRequest::from_line(r#"{"worker":0,"files":[],"keywords":["data"]}"#).unwrap();
        assert_eq!(request.encoding_mode, EncodingMode::FailFast);
    }

    #[test]
    fn test_response_tagging() {
        let line = WorkResponse::error("bad input").to_line().unwrap();
        assert!(line.contains(r#""type":"error""#));
        assert_eq!(
            WorkResponse::from_line(&line).unwrap(),
            WorkResponse::error("bad input")
        );

        let line = WorkResponse::Result {
            partial: PartialResult::new(3),
        }
        .to_line()
        .unwrap();
        assert!(line.contains(r#""type":"result""#));
        assert!(matches!(
            WorkResponse::from_line(&line).unwrap(),
            WorkResponse::Result { partial } if partial.worker == 3
        ));
    }

    #[test]
    fn test_garbage_is_protocol_error() {
        let err = WorkResponse::from_line("not json").unwrap_err();
        assert!(matches!(err, SearchError::WorkerProtocol(_)));
    }
}
