//! Relocation of replay files once a match outcome is known.
//!
//! The runner drops replays under generic `GAME_<id>_<slot>.rep` names. Once
//! per match the first replay that shows up is renamed in place to carry the
//! opponent, the map and the outcome, so a directory of replays stays
//! readable.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::maps;

/// Tries to move `candidate` to its final name.
///
/// Returns the destination path iff the relocation happened during this call.
/// A missing candidate is a no-op; a rename failure (the runner may still hold
/// the file) is logged and retried by the caller on a later poll. Exactly-once
/// semantics are the session's job, via its `replay_finalized` flag.
pub(crate) fn finalize(
    candidate: &Path,
    opponent: &str,
    map: &str,
    win: Option<bool>,
) -> Option<PathBuf> {
    if !candidate.exists() {
        return None;
    }

    let destination = destination(candidate, opponent, map, win);
    match std::fs::rename(candidate, &destination) {
        Ok(()) => {
            info!(replay = %destination.display(), "replay finalized");
            Some(destination)
        }
        Err(e) => {
            warn!("could not move replay {}: {e}", candidate.display());
            None
        }
    }
}

fn destination(candidate: &Path, opponent: &str, map: &str, win: Option<bool>) -> PathBuf {
    let stem = candidate
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("replay");

    let mut name = format!("{stem}-{opponent}-{}", maps::short_name(map));
    match win {
        Some(true) => name.push_str("-win"),
        Some(false) => name.push_str("-loss"),
        None => {}
    }
    name.push_str(".rep");

    candidate.with_file_name(name)
}

/// Opens the replay-viewer page and the folder holding `replay`.
///
/// Both launches are best-effort; a missing browser or file manager only costs
/// a warning.
pub(crate) fn show_in_viewer(replay: &Path) {
    if let Err(e) = Command::new("xdg-open")
        .arg("http://www.openbw.com/replay-viewer/")
        .spawn()
    {
        warn!("could not open replay viewer: {e}");
    }

    let folder = replay.parent().unwrap_or(Path::new("."));
    if let Err(e) = Command::new("xdg-open").arg(folder).spawn() {
        warn!("could not open replay folder: {e}");
    }
}
