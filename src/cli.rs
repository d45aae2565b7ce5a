//! Keyword-style command line parsing.
//!
//! The first argument is the opponent; everything after it is an order-free
//! keyword: `ui`, `replay`, `clean`, a timeout class (`short`/`medium`/
//! `long`), a run mode (`all`, `five`, `trainingrun`, `2p`/`3p`/`4p`) or a
//! fragment of a map name from the built-in pool.

use anyhow::bail;

use crate::configuration::TimeoutClass;
use crate::maps;

/// How the maps for a session are selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MapFilter {
    /// First map of a fresh shuffle.
    #[default]
    Any,
    /// First shuffled map for the given player count (2, 3 or 4).
    PlayerCount(u8),
    /// A specific pool map.
    Named(String),
}

/// Match-selection mode of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// One match.
    Single(MapFilter),
    /// Sequential matches over a shuffled pool; `None` plays every map.
    Batch {
        /// Maximum number of matches, `None` for the whole pool.
        limit: Option<usize>,
    },
    /// Endless training loop driven by the opponents file.
    Training,
}

/// What one invocation of the trainer should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Opponent bot name. Ignored by [`RunMode::Training`], which draws
    /// opponents from the opponents file.
    pub opponent: String,
    /// Run matches without a game window.
    pub headless: bool,
    /// Open the replay viewer after each finalized replay.
    pub show_replay: bool,
    /// Timeout budget class for the runner.
    pub timeout: TimeoutClass,
    /// Clear both bots' read/write directories before the first match.
    pub clean: bool,
    /// Match selection.
    pub mode: RunMode,
}

const USAGE: &str = "usage: bot-trainer <opponent> \
    [ui] [replay] [clean] [short|medium|long] \
    [all|five|trainingrun|2p|3p|4p|<map fragment>]";

/// Parses command line arguments (without the binary name) into a [`RunPlan`].
///
/// # Errors
/// Fails on a missing opponent or an argument that is neither a keyword nor a
/// fragment of a pool map name.
pub fn parse(args: &[String]) -> anyhow::Result<RunPlan> {
    let Some(opponent) = args.first() else {
        bail!("{USAGE}");
    };

    let mut plan = RunPlan {
        opponent: opponent.clone(),
        headless: true,
        show_replay: false,
        timeout: TimeoutClass::Max,
        clean: false,
        mode: RunMode::Single(MapFilter::Any),
    };

    for arg in &args[1..] {
        match arg.as_str() {
            "ui" => plan.headless = false,
            "replay" => plan.show_replay = true,
            "clean" => plan.clean = true,
            "short" | "medium" | "long" => {
                plan.timeout = TimeoutClass::from_keyword(arg).unwrap_or(TimeoutClass::Max);
            }
            "all" => plan.mode = RunMode::Batch { limit: None },
            "five" => plan.mode = RunMode::Batch { limit: Some(5) },
            "trainingrun" => plan.mode = RunMode::Training,
            "2p" => plan.mode = RunMode::Single(MapFilter::PlayerCount(2)),
            "3p" => plan.mode = RunMode::Single(MapFilter::PlayerCount(3)),
            "4p" => plan.mode = RunMode::Single(MapFilter::PlayerCount(4)),
            fragment => match maps::find_map(fragment) {
                Some(map) => plan.mode = RunMode::Single(MapFilter::Named(map.to_owned())),
                None => bail!("unrecognized argument '{fragment}'\n{USAGE}"),
            },
        }
    }

    Ok(plan)
}
