use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{trace, warn};

use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::{format_location, KeywordMatches};

const BUFFER_CAPACITY: usize = 64 * 1024;
const LINE_CAPACITY: usize = 256;

/// What scanning one file produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileScan {
    /// Keywords with at least one match in this file
    pub matches: KeywordMatches,
    pub lines: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
struct Keyword {
    /// As supplied by the caller; used as the result key
    original: String,
    folded: String,
}

/// Scans files line by line for a fixed set of keywords.
///
/// Matching is a case-insensitive substring test. A scanner holds no mutable
/// state, so one instance can be shared by every worker thread.
#[derive(Debug, Clone)]
pub struct KeywordScanner {
    keywords: Vec<Keyword>,
    encoding_mode: EncodingMode,
}

impl KeywordScanner {
    /// Builds a scanner for `keywords`. Exact duplicates are dropped, keeping
    /// the first occurrence.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut unique: Vec<Keyword> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = keyword.as_ref();
            if unique.iter().any(|k| k.original == keyword) {
                continue;
            }
            unique.push(Keyword {
                original: keyword.to_string(),
                folded: keyword.to_lowercase(),
            });
        }
        Self {
            keywords: unique,
            encoding_mode: EncodingMode::default(),
        }
    }

    pub fn with_encoding(mut self, encoding_mode: EncodingMode) -> Self {
        self.encoding_mode = encoding_mode;
        self
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|k| k.original.as_str())
    }

    /// Scans the file at `path`.
    ///
    /// Any failure to open or read the file is returned as an error and no
    /// partial matches from that file are kept.
    pub fn scan_file(&self, path: &Path) -> SearchResult<FileScan> {
        trace!("Scanning file: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        self.scan_reader(path, reader)
    }

    /// Scans already-opened content, labelling locations with `path`.
    pub fn scan_reader<R: BufRead>(&self, path: &Path, mut reader: R) -> SearchResult<FileScan> {
        let mut scan = FileScan::default();
        let mut raw = Vec::with_capacity(LINE_CAPACITY);
        let mut warned_lossy = false;

        loop {
            raw.clear();
            let read = reader
                .read_until(b'\n', &mut raw)
                .map_err(|e| SearchError::from_io(path, e))?;
            if read == 0 {
                break;
            }
            scan.bytes += read as u64;

            let mut end = raw.len();
            if raw[..end].ends_with(b"\n") {
                end -= 1;
            }
            if raw[..end].ends_with(b"\r") {
                end -= 1;
            }

            let text = match std::str::from_utf8(&raw[..end]) {
                Ok(text) => Cow::Borrowed(text),
                Err(e) => match self.encoding_mode {
                    EncodingMode::FailFast => return Err(SearchError::encoding_error(path, e)),
                    EncodingMode::Lossy => {
                        if !warned_lossy {
                            warn!("Invalid UTF-8 replaced in file: {}", path.display());
                            warned_lossy = true;
                        }
                        String::from_utf8_lossy(&raw[..end])
                    }
                },
            };

            // A lone `\r` also ends a line.
            for line in text.split('\r') {
                scan.lines += 1;
                self.match_line(line, path, scan.lines, &mut scan.matches);
            }
        }

        trace!(
            "Scanned {} lines in {}, {} keywords matched",
            scan.lines,
            path.display(),
            scan.matches.len()
        );
        Ok(scan)
    }

    fn match_line(&self, line: &str, path: &Path, line_number: u64, out: &mut KeywordMatches) {
        let folded = line.to_lowercase();
        for keyword in &self.keywords {
            if folded.contains(keyword.folded.as_str()) {
                out.record(
                    &keyword.original,
                    format_location(path, line_number as usize),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn scanner(keywords: &[&str]) -> KeywordScanner {
        KeywordScanner::new(keywords)
    }

    #[test]
    fn test_line_numbering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("three.txt");
        fs::write(&path, "first line\nsecond has data\nthird line\n").unwrap();

        let scan = scanner(&["data"]).scan_file(&path).unwrap();
        assert_eq!(
            scan.matches.get("data").unwrap(),
            &[format_location(&path, 2)]
        );
        assert_eq!(scan.lines, 3);
        assert_eq!(scan.bytes, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_case_insensitive() {
        let path = Path::new("mem.txt");
        let scan = scanner(&["python", "DATA"])
            .scan_reader(path, Cursor::new("I like Python\nBig data here\n"))
            .unwrap();

        assert_eq!(scan.matches.get("python").unwrap(), &["mem.txt:line 1"]);
        assert_eq!(scan.matches.get("DATA").unwrap(), &["mem.txt:line 2"]);
    }

    #[test]
    fn test_only_matched_keywords_present() {
        let scan = scanner(&["python", "algorithm"])
            .scan_reader(Path::new("x"), Cursor::new("python\npython again"))
            .unwrap();

        assert_eq!(scan.matches.count("python"), 2);
        assert!(!scan.matches.contains_keyword("algorithm"));
        assert_eq!(scan.lines, 2);
    }

    #[test]
    fn test_several_keywords_on_one_line() {
        let scan = scanner(&["data", "algorithm"])
            .scan_reader(Path::new("y"), Cursor::new("a data algorithm\r\n"))
            .unwrap();

        assert_eq!(scan.matches.get("data").unwrap(), &["y:line 1"]);
        assert_eq!(scan.matches.get("algorithm").unwrap(), &["y:line 1"]);
    }

    #[test]
    fn test_carriage_return_line_endings() {
        let scan = scanner(&["python"])
            .scan_reader(Path::new("mac.txt"), Cursor::new("first\rsecond\rpython here\r"))
            .unwrap();
        assert_eq!(scan.matches.get("python").unwrap(), &["mac.txt:line 3"]);
        assert_eq!(scan.lines, 3);

        let scan = scanner(&["python"])
            .scan_reader(
                Path::new("mixed.txt"),
                Cursor::new("a\r\nb\rPython\n\rpython\r\n"),
            )
            .unwrap();
        assert_eq!(
            scan.matches.get("python").unwrap(),
            &["mixed.txt:line 3", "mixed.txt:line 5"]
        );
        assert_eq!(scan.lines, 5);
    }

    #[test]
    fn test_duplicate_keywords_collapsed() {
        let s = scanner(&["data", "data", "Data"]);
        assert_eq!(s.keywords().collect::<Vec<_>>(), vec!["data", "Data"]);

        let scan = s
            .scan_reader(Path::new("z"), Cursor::new("data\n"))
            .unwrap();
        assert_eq!(scan.matches.count("data"), 1);
        assert_eq!(scan.matches.count("Data"), 1);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        let err = scanner(&["data"]).scan_file(&path).unwrap_err();
        assert!(matches!(err, SearchError::FileNotFound(p) if p == path));
    }

    #[test]
    fn test_invalid_utf8_fail_fast() {
        let bytes: &[u8] = b"data ok\n\xff\xfe data\n";
        let err = scanner(&["data"])
            .scan_reader(Path::new("bin"), Cursor::new(bytes))
            .unwrap_err();
        assert!(matches!(err, SearchError::EncodingError { .. }));
    }

    #[test]
    fn test_invalid_utf8_lossy() {
        let bytes: &[u8] = b"data ok\n\xff\xfe data\n";
        let scan = scanner(&["data"])
            .with_encoding(EncodingMode::Lossy)
            .scan_reader(Path::new("bin"), Cursor::new(bytes))
            .unwrap();
        assert_eq!(
            scan.matches.get("data").unwrap(),
            &["bin:line 1", "bin:line 2"]
        );
    }

    #[test]
    fn test_long_file_keeps_ascending_lines() {
        let mut content = String::new();
        for i in 0..2000 {
            if i % 7 == 0 {
                content.push_str(&format!("line {} mentions ALGORITHM\n", i));
            } else {
                content.push_str(&format!("line {} is filler\n", i));
            }
        }
        let scan = scanner(&["algorithm"])
            .scan_reader(Path::new("long"), Cursor::new(content))
            .unwrap();

        let lines: Vec<usize> = scan
            .matches
            .get("algorithm")
            .unwrap()
            .iter()
            .map(|loc| loc.rsplit(' ').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(lines.len(), 286);
        assert!(lines.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(lines[0], 1);
    }
}
