//! Incremental tailing of text files that another process may still be writing.
//!
//! The runner and both bots append to their log files for the whole duration of
//! a match, so the monitor re-reads them on every poll and only acts on what is
//! new. [`LogTailer`] keeps the previously seen content per path and hands back
//! the freshly appended lines.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Tails concurrently-written text files, returning only newly appended lines.
///
/// One tailer is shared by all matches of a session; paths embed the game id,
/// so entries of different matches never collide.
#[derive(Debug, Default)]
pub struct LogTailer {
    cache: HashMap<PathBuf, String>,
}

impl LogTailer {
    /// Creates a tailer with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lines appended to `path` since the previous call, trimmed,
    /// with empty lines dropped.
    ///
    /// A file that does not exist or cannot be read right now yields no lines;
    /// the next poll will try again. A file that shrank or was replaced since
    /// the last read is treated as entirely new content.
    pub fn read_new_lines(&mut self, path: &Path) -> Vec<String> {
        let Ok(content) = fs::read_to_string(path) else {
            return Vec::new();
        };

        let cached = self.cache.get(path).map(String::as_str).unwrap_or("");
        if content == cached {
            return Vec::new();
        }

        // A truncated or rotated file no longer extends the cached prefix;
        // slicing by the old length would return garbage.
        let appended = match content.strip_prefix(cached) {
            Some(suffix) => suffix,
            None => content.as_str(),
        };

        let lines = appended
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();

        self.cache.insert(path.to_path_buf(), content);
        lines
    }
}
