//! Synthetic text trees to search.
//!
//! Generates `file_<i>.txt` files of random words spread over a small nested
//! directory layout, and lists every file under a root.

use ignore::WalkBuilder;
use rand::seq::IndexedRandom;
use rand::Rng;
use rayon::prelude::*;
use std::fs;
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::default_worker_count;
use crate::errors::{SearchError, SearchResult};
use crate::search::partition;

const VOCABULARY: [&str; 15] = [
    "python",
    "data",
    "algorithm",
    "machine",
    "learning",
    "artificial",
    "intelligence",
    "programming",
    "code",
    "software",
    "computer",
    "science",
    "developer",
    "technology",
    "system",
];

/// Words appended with [`GeneratorConfig::keyword_probability`]
pub const PLANTED_KEYWORDS: [&str; 3] = ["python", "data", "algorithm"];

const RANDOM_WORDS: usize = 50;
const WRITE_BUFFER: usize = 1024 * 1024;

/// Settings for [`create_test_files`]
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub base_dir: PathBuf,
    pub num_files: usize,
    pub min_words: usize,
    pub max_words: usize,
    /// Chance that each planted keyword is appended to a file
    pub keyword_probability: f64,
    pub workers: NonZeroUsize,
    /// Remove `base_dir` before generating
    pub clean: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("test_search_files"),
            num_files: 50,
            min_words: 50,
            max_words: 500,
            keyword_probability: 0.7,
            workers: default_worker_count(),
            clean: true,
        }
    }
}

/// Directories files may land in, relative to the base directory
pub fn subdirectory_choices() -> Vec<PathBuf> {
    let subdirs = ["subdir1", "subdir2", "subdir3"];
    let nested = ["nested1", "nested2"];

    let mut choices = vec![PathBuf::new()];
    choices.extend(subdirs.iter().map(PathBuf::from));
    for subdir in subdirs {
        for inner in nested {
            choices.push(Path::new(subdir).join(inner));
        }
    }
    choices
}

/// Produces one file's worth of space-separated words.
pub fn generate_text<R: Rng + ?Sized>(
    rng: &mut R,
    min_words: usize,
    max_words: usize,
    keyword_probability: f64,
) -> String {
    let random_words: Vec<String> = (0..RANDOM_WORDS)
        .map(|_| {
            let len = rng.random_range(3..=8);
            (0..len)
                .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
                .collect()
        })
        .collect();

    let pool: Vec<&str> = VOCABULARY
        .iter()
        .copied()
        .chain(random_words.iter().map(String::as_str))
        .collect();

    let count = rng.random_range(min_words..=max_words.max(min_words));
    let mut words: Vec<&str> = (0..count)
        .filter_map(|_| pool.choose(rng).copied())
        .collect();

    for keyword in PLANTED_KEYWORDS {
        if rng.random_bool(keyword_probability) {
            words.push(keyword);
        }
    }

    words.join(" ")
}

fn write_file(path: &Path, text: &str) -> SearchResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path).map_err(|e| SearchError::from_io(path, e))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER, file);
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Generates `config.num_files` files under `config.base_dir`, spreading the
/// writes over round-robin shards on a rayon pool.
///
/// Returns the created paths, grouped by shard.
pub fn create_test_files(config: &GeneratorConfig) -> SearchResult<Vec<PathBuf>> {
    let probability = config.keyword_probability;
    if !(0.0..=1.0).contains(&probability) {
        return Err(SearchError::config_error(format!(
            "keyword probability must be within [0, 1], got {}",
            probability
        )));
    }

    if config.clean && config.base_dir.exists() {
        debug!("Removing existing directory {}", config.base_dir.display());
        fs::remove_dir_all(&config.base_dir)?;
    }
    fs::create_dir_all(&config.base_dir)?;

    let choices = subdirectory_choices();
    let mut rng = rand::rng();
    let targets: Vec<PathBuf> = (0..config.num_files)
        .map(|i| {
            let subdir = choices.choose(&mut rng).cloned().unwrap_or_default();
            config.base_dir.join(subdir).join(format!("file_{}.txt", i))
        })
        .collect();

    let shards = partition(&targets, config.workers.get());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.get())
        .build()
        .map_err(|e| SearchError::worker_launch(e.to_string()))?;

    let written: Vec<SearchResult<Vec<PathBuf>>> = pool.install(|| {
        shards
            .par_iter()
            .map(|shard| {
                let mut rng = rand::rng();
                let mut created = Vec::with_capacity(shard.len());
                for path in shard {
                    let text = generate_text(
                        &mut rng,
                        config.min_words,
                        config.max_words,
                        probability,
                    );
                    write_file(path, &text)?;
                    created.push(path.to_path_buf());
                }
                Ok(created)
            })
            .collect()
    });

    let mut created = Vec::with_capacity(targets.len());
    for shard in written {
        created.extend(shard?);
    }

    info!(
        "Created {} files under {}",
        created.len(),
        config.base_dir.display()
    );
    Ok(created)
}

/// Lists every regular file under `base_dir`, hidden and ignored ones
/// included.
pub fn find_all_files(base_dir: &Path) -> SearchResult<Vec<PathBuf>> {
    if !base_dir.exists() {
        return Ok(Vec::new());
    }

    let files: Vec<PathBuf> = WalkBuilder::new(base_dir)
        .standard_filters(false)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", base_dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .collect();

    debug!("Found {} files under {}", files.len(), base_dir.display());
    Ok(files)
}
