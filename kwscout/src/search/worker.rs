//! Worker-process side of the process pool.
//!
//! Runs when the executable is started with `--internal-worker`: read one
//! request from stdin, scan the shard, write one response to stdout.

use std::io::{self, BufRead, Write};
use tracing::debug;

use super::protocol::{WorkRequest, WorkResponse};
use super::request::scan_shard;
use super::scanner::KeywordScanner;
use crate::diagnostics::TracingReporter;
use crate::errors::SearchResult;

/// Serves a single work request read from `input`, answering on `output`.
///
/// A malformed request is answered with [`WorkResponse::Error`]; only a
/// failure to read or write the pipes is returned as an error.
pub fn serve<R: BufRead, W: Write>(mut input: R, mut output: W) -> SearchResult<()> {
    let mut line = String::new();
    input.read_line(&mut line)?;

    let response = match WorkRequest::from_line(&line) {
        Ok(request) => {
            debug!(
                "Worker {} received {} files",
                request.worker,
                request.files.len()
            );
            let scanner =
                KeywordScanner::new(&request.keywords).with_encoding(request.encoding_mode);
            let partial = scan_shard(request.worker, &request.files, &scanner, &TracingReporter);
            WorkResponse::Result { partial }
        }
        Err(e) => WorkResponse::error(e.to_string()),
    };

    output.write_all(response.to_line()?.as_bytes())?;
    output.flush()?;
    Ok(())
}

/// Entry point for the `--internal-worker` mode, bound to stdin/stdout.
pub fn run_worker_main() -> SearchResult<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(stdin.lock(), stdout.lock())
}
