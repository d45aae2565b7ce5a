//! Decoding of the per-participant result records the runner writes.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Outcome record a participant's runtime writes once it knows how the match
/// ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct BotResult {
    pub(crate) is_winner: bool,
    pub(crate) is_crashed: bool,
}

/// Reads a result record if one is available.
///
/// `Ok(None)` means the record does not exist yet or is still empty, which is
/// the normal state while the match is running. An error means the file is
/// present but does not parse; the writer may be mid-write, so the caller
/// should retry on a later poll instead of giving up.
pub(crate) fn read_result(path: &Path) -> anyhow::Result<Option<BotResult>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Ok(None),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }

    let record = serde_json::from_str(&content)
        .with_context(|| format!("malformed result record {}", path.display()))?;
    Ok(Some(record))
}
