//! Parsers for the fixed line vocabulary found in runner output and bot logs.
//!
//! Everything the monitor learns from text artifacts goes through here: the
//! game-id announcement on the runner's stdout, the heartbeat line a bot
//! prints while its counterpart is gone, elimination announcements, and the
//! strategy lines a bot writes at the start of a game.

use std::fmt;

/// Runner stdout line announcing the id of the game being set up.
const GAME_ID_ANNOUNCE: &str = "Waiting until game GAME_";

/// Printed repeatedly by a bot whose counterpart stopped responding.
const HEARTBEAT: &str = "waiting for players...";

const GAME_ID_LEN: usize = 8;

/// 8-character token the runner assigns to a launched game.
///
/// All per-match artifact paths are derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct GameId(String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the game id from an announcement line, if this is one.
pub(crate) fn parse_game_id(line: &str) -> Option<GameId> {
    let start = line.find(GAME_ID_ANNOUNCE)? + GAME_ID_ANNOUNCE.len();
    let token = line.get(start..start + GAME_ID_LEN)?;
    Some(GameId(token.to_owned()))
}

pub(crate) fn is_heartbeat(line: &str) -> bool {
    line == HEARTBEAT
}

/// Name of the eliminated participant, if the line announces an elimination.
pub(crate) fn parse_elimination(line: &str) -> Option<&str> {
    line.strip_prefix(":: ")?.strip_suffix(" was eliminated.")
}

/// Which strategy field of the session a log line populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StrategyField {
    Observed,
    ExpectedOpponent,
    Opponent,
}

/// Marker table: line prefix to session field. Evaluated once per new line.
const STRATEGY_MARKERS: &[(&str, StrategyField)] = &[
    ("Opening: ", StrategyField::Observed),
    ("Expected enemy plan: ", StrategyField::ExpectedOpponent),
    ("Enemy plan: ", StrategyField::Opponent),
];

/// Matches a line against the strategy marker table.
pub(crate) fn parse_strategy(line: &str) -> Option<(StrategyField, &str)> {
    STRATEGY_MARKERS.iter().find_map(|(prefix, field)| {
        line.strip_prefix(prefix)
            .map(|value| (*field, value.trim()))
    })
}
