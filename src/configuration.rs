//! Config for the trainer behaviors and the runner's directory layout.
//!
//! Configuration can be created programmatically using [`Configuration::new()`]
//! or by reading environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration
//! values. All values are optional. Flags are case-insensitive; set the value
//! to `"true"` to enable one.
//!
//! - `TRAINER_BOT` — Name of the bot being trained (default: `Steamhammer`)
//! - `TRAINER_BASE_DIR` — Runner data directory (default: `~/.scbw`)
//! - `TRAINER_RUNNER` — Command used to launch a game (default: `scbw.play`)
//! - `TRAINER_VERBOSE` — Mirror match output on stdout (default: `true`)
//! - `TRAINER_LOG` — Enable logging to a file (default: `false`)
//! - `TRAINER_STOP_CONTAINERS` — Stop leftover game containers after each
//!   match (default: `true`)
//! - `TRAINER_RESULT_GRACE` — Seconds to wait for the runner to shut down
//!   after a result is known (default: `20`)

use std::path::PathBuf;
use std::time::Duration;

use crate::markers::GameId;

/// Timeout classes selectable per opponent or from the command line.
///
/// The budget is handed to the runner, which ends the game once it elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// One minute. Enough for crash-on-start checks.
    Short,
    /// Five minutes.
    Medium,
    /// Ten minutes.
    Long,
    /// Thirty minutes, the default.
    Max,
}

impl TimeoutClass {
    /// Wall-clock budget handed to the runner.
    pub fn budget(self) -> Duration {
        match self {
            TimeoutClass::Short => Duration::from_secs(60),
            TimeoutClass::Medium => Duration::from_secs(300),
            TimeoutClass::Long => Duration::from_secs(600),
            TimeoutClass::Max => Duration::from_secs(1800),
        }
    }

    /// Parses a command-line or opponents-file keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "short" => Some(TimeoutClass::Short),
            "medium" => Some(TimeoutClass::Medium),
            "long" => Some(TimeoutClass::Long),
            _ => None,
        }
    }
}

/// Configuration for trainer behaviors.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) bot_name: String,
    pub(crate) base_dir: PathBuf,
    pub(crate) runner_command: String,
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) stop_containers: bool,
    pub(crate) poll_interval: Duration,
    pub(crate) result_grace: Duration,
    pub(crate) stall_poll_limit: u32,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The bot under training is `Steamhammer`.
    /// - Runner data is expected under `~/.scbw`.
    /// - Games are launched through `scbw.play`.
    /// - Match output is mirrored to stdout.
    /// - Logging to file is disabled.
    /// - Leftover game containers are stopped after each match.
    /// - Artifacts are polled every 500 ms.
    /// - A match is cut 20 s after its result is known.
    /// - Three consecutive heartbeat polls count as a stalled match.
    pub fn new() -> Self {
        Self {
            bot_name: "Steamhammer".to_owned(),
            base_dir: default_base_dir(),
            runner_command: "scbw.play".to_owned(),
            verbose: true,
            log: false,
            stop_containers: true,
            poll_interval: Duration::from_millis(500),
            result_grace: Duration::from_secs(20),
            stall_poll_limit: 3,
        }
    }

    /// Create configuration from environment variables; see the module
    /// documentation for the recognized variables. Any unset or unparsable
    /// variable falls back to its default.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        let defaults = Self::new();
        Self {
            bot_name: std::env::var("TRAINER_BOT").unwrap_or(defaults.bot_name),
            base_dir: std::env::var("TRAINER_BASE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.base_dir),
            runner_command: std::env::var("TRAINER_RUNNER").unwrap_or(defaults.runner_command),
            verbose: get_env_flag("TRAINER_VERBOSE", defaults.verbose),
            log: get_env_flag("TRAINER_LOG", defaults.log),
            stop_containers: get_env_flag("TRAINER_STOP_CONTAINERS", defaults.stop_containers),
            result_grace: std::env::var("TRAINER_RESULT_GRACE")
                .ok()
                .and_then(|val| val.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.result_grace),
            poll_interval: defaults.poll_interval,
            stall_poll_limit: defaults.stall_poll_limit,
        }
    }

    /// Set the name of the bot being trained.
    pub fn with_bot_name(mut self, value: impl Into<String>) -> Self {
        self.bot_name = value.into();
        self
    }

    /// Set the runner data directory.
    pub fn with_base_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.base_dir = value.into();
        self
    }

    /// Set the command used to launch a game.
    pub fn with_runner_command(mut self, value: impl Into<String>) -> Self {
        self.runner_command = value.into();
        self
    }

    /// Enable or disable mirroring match output on stdout.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Enable or disable stopping leftover game containers after a match.
    pub fn with_stop_containers(mut self, value: bool) -> Self {
        self.stop_containers = value;
        self
    }

    /// Set how long a finished match may linger before its process is cut.
    pub fn with_result_grace(mut self, value: Duration) -> Self {
        self.result_grace = value;
        self
    }

    /// Set the polling cadence of the match monitor.
    pub fn with_poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

fn default_base_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".scbw"),
        None => PathBuf::from(".scbw"),
    }
}

// Artifact layout under the base directory. Paths are parameterized by the
// game id the runner announces, so none of them is usable before that.
impl Configuration {
    pub(crate) fn read_dir(&self, participant: &str) -> PathBuf {
        self.base_dir.join("bots").join(participant).join("read")
    }

    pub(crate) fn write_dir(&self, participant: &str) -> PathBuf {
        self.base_dir.join("bots").join(participant).join("write")
    }

    /// The bot's own error log inside its per-game write directory.
    pub(crate) fn error_log(&self, id: &GameId) -> PathBuf {
        self.write_dir(&self.bot_name)
            .join(format!("GAME_{id}_0"))
            .join(format!("{}_ErrorLog.txt", self.bot_name))
    }

    /// The bot's own main log inside its per-game write directory.
    pub(crate) fn main_log(&self, id: &GameId) -> PathBuf {
        self.write_dir(&self.bot_name)
            .join(format!("GAME_{id}_0"))
            .join(format!("{}_log.txt", self.bot_name))
    }

    /// Game log the runner keeps per participant.
    pub(crate) fn game_log(&self, id: &GameId, slot: usize, participant: &str) -> PathBuf {
        self.base_dir.join("logs").join(format!(
            "GAME_{id}_{slot}_{}_game.log",
            participant.replace(' ', "_")
        ))
    }

    /// Result record the runner writes per participant slot.
    pub(crate) fn result_file(&self, id: &GameId, slot: usize) -> PathBuf {
        self.base_dir
            .join("games")
            .join(format!("GAME_{id}"))
            .join(format!("result_{slot}.json"))
    }

    /// Replay file the runner drops per participant slot.
    pub(crate) fn replay_file(&self, id: &GameId, slot: usize) -> PathBuf {
        self.base_dir
            .join("maps")
            .join("replays")
            .join(format!("GAME_{id}_{slot}.rep"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::parse_game_id;

    fn game_id() -> GameId {
        parse_game_id("Waiting until game GAME_ab12cd34 is ready").unwrap()
    }

    #[test]
    fn timeout_keywords_map_to_classes() {
        assert_eq!(TimeoutClass::from_keyword("short"), Some(TimeoutClass::Short));
        assert_eq!(TimeoutClass::from_keyword("medium"), Some(TimeoutClass::Medium));
        assert_eq!(TimeoutClass::from_keyword("long"), Some(TimeoutClass::Long));
        assert_eq!(TimeoutClass::from_keyword("max"), None);
    }

    #[test]
    fn artifact_paths_embed_the_game_id() {
        let config = Configuration::new()
            .with_base_dir("/data/scbw")
            .with_bot_name("MyBot");
        let id = game_id();

        assert_eq!(
            config.error_log(&id),
            PathBuf::from("/data/scbw/bots/MyBot/write/GAME_ab12cd34_0/MyBot_ErrorLog.txt")
        );
        assert_eq!(
            config.result_file(&id, 1),
            PathBuf::from("/data/scbw/games/GAME_ab12cd34/result_1.json")
        );
        assert_eq!(
            config.replay_file(&id, 0),
            PathBuf::from("/data/scbw/maps/replays/GAME_ab12cd34_0.rep")
        );
    }

    #[test]
    fn game_log_underscores_spaced_names() {
        let config = Configuration::new().with_base_dir("/data/scbw");
        let id = game_id();

        assert_eq!(
            config.game_log(&id, 1, "Hannes Bredberg"),
            PathBuf::from("/data/scbw/logs/GAME_ab12cd34_1_Hannes_Bredberg_game.log")
        );
    }
}
