//! The match lifecycle state machine.
//!
//! [`MatchMonitor`] drives a single match from launch to a final verdict: it
//! spawns the external runner, polls its output and the on-disk artifacts on
//! a fixed cadence, applies the termination rules and reports the outcome.
//!
//! A match is over when any of these holds:
//! - the runner process exited on its own;
//! - a result is known and the runner lingered past the configured grace
//!   period (the game ended internally but shutdown hangs);
//! - the heartbeat line showed up in enough consecutive polls, meaning the
//!   counterpart process died and the game will never resume;
//! - the runner overran its own timeout budget by a wide margin.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::configuration::{Configuration, TimeoutClass};
use crate::containers;
use crate::logger;
use crate::markers::{self, GameId, StrategyField};
use crate::process::{RunnerHandle, RunnerProcess};
use crate::replay;
use crate::result_file::{self, BotResult};
use crate::tail::LogTailer;

/// Extra slack on top of the runner's own timeout budget before the monitor
/// gives up on it ever exiting.
const RUNNER_EXIT_MARGIN: Duration = Duration::from_secs(60);

/// Final classification of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The monitored bot won.
    Won,
    /// The monitored bot lost.
    Lost,
    /// The match died before producing a valid outcome.
    Crashed,
    /// No result ever appeared and nothing indicated a crash.
    TimedOut,
}

impl Verdict {
    /// `Some(true)` for a win, `Some(false)` for a loss, `None` otherwise.
    pub fn win(self) -> Option<bool> {
        match self {
            Verdict::Won => Some(true),
            Verdict::Lost => Some(false),
            Verdict::Crashed | Verdict::TimedOut => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Won => "win",
            Verdict::Lost => "loss",
            Verdict::Crashed => "crash",
            Verdict::TimedOut => "timeout",
        })
    }
}

/// One match to run: who, where, and under which timeout budget.
#[derive(Debug, Clone)]
pub struct MatchPlan {
    /// Opponent bot name, as known to the runner.
    pub opponent: String,
    /// Map file name, e.g. `(2)Benzene.scx`.
    pub map: String,
    /// Run without a game window.
    pub headless: bool,
    /// Open the replay viewer once the replay is finalized.
    pub show_replay: bool,
    /// Budget handed to the runner.
    pub timeout: TimeoutClass,
}

/// What a finished match reports back to the session driver.
#[derive(Debug)]
pub struct MatchReport {
    /// Final classification.
    pub verdict: Verdict,
    /// Game id the runner announced, if it got that far.
    pub game_id: Option<String>,
    /// Opening the monitored bot announced in its log.
    pub observed_strategy: Option<String>,
    /// What the bot expected the opponent to play.
    pub expected_opponent_strategy: Option<String>,
    /// What the bot recognized the opponent as playing.
    pub opponent_strategy: Option<String>,
}

/// Clock seam so the polling loop can be driven deterministically in tests.
pub(crate) trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, duration: Duration);
}

pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Tri-state result of the monitored bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultState {
    Unknown,
    /// The bot's own record reported a crash. Provisional: a clean opponent
    /// record may still turn this into a normal win/loss.
    Crashed,
    /// A definitive outcome. Never changes once set.
    Concluded { winner: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KillReason {
    Stalled,
    ShutdownHang,
    RunnerHang,
}

/// Mutable state of one launched match.
#[derive(Debug)]
struct MatchSession {
    id: Option<GameId>,
    result: ResultState,
    /// Set exactly once, when `result` first leaves `Unknown`.
    result_at: Option<Instant>,
    /// Consecutive polls in which the heartbeat line appeared.
    stall_polls: u32,
    stall_killed: bool,
    replay_finalized: bool,
    observed_strategy: Option<String>,
    expected_opponent_strategy: Option<String>,
    opponent_strategy: Option<String>,
}

impl MatchSession {
    fn new() -> Self {
        MatchSession {
            id: None,
            result: ResultState::Unknown,
            result_at: None,
            stall_polls: 0,
            stall_killed: false,
            replay_finalized: false,
            observed_strategy: None,
            expected_opponent_strategy: None,
            opponent_strategy: None,
        }
    }
}

/// Drives one match to completion.
///
/// A monitor is built per match and consumed by [`MatchMonitor::run`]; the
/// session state it accumulates dies with the report.
pub struct MatchMonitor<'a> {
    config: &'a Configuration,
    plan: MatchPlan,
    session: MatchSession,
}

impl<'a> MatchMonitor<'a> {
    /// Creates a monitor for one planned match.
    pub fn new(config: &'a Configuration, plan: MatchPlan) -> Self {
        MatchMonitor {
            config,
            plan,
            session: MatchSession::new(),
        }
    }

    /// Launches the runner and monitors it until a verdict is reached.
    ///
    /// # Errors
    /// Only a failure to spawn the runner is an error; everything that goes
    /// wrong after launch resolves to a verdict instead.
    #[instrument(skip_all, fields(opponent = %self.plan.opponent, map = %self.plan.map))]
    pub fn run(mut self, tailer: &mut LogTailer) -> anyhow::Result<MatchReport> {
        info!("starting match");
        if self.config.verbose {
            println!(
                "Starting game against {} on {}",
                self.plan.opponent, self.plan.map
            );
        }

        let mut process = RunnerProcess::spawn(self.config, &self.plan)?;
        let verdict = self.drive(&mut process, &mut SystemClock, tailer);

        if self.config.stop_containers {
            if let Some(id) = &self.session.id {
                containers::stop_match_containers(id);
            }
        }

        info!(%verdict, "match finished");
        Ok(MatchReport {
            verdict,
            game_id: self.session.id.as_ref().map(GameId::to_string),
            observed_strategy: self.session.observed_strategy.take(),
            expected_opponent_strategy: self.session.expected_opponent_strategy.take(),
            opponent_strategy: self.session.opponent_strategy.take(),
        })
    }

    /// The polling loop: Running until the process exits or a termination
    /// rule fires, then one Concluding pass for artifacts that landed in the
    /// gap, then the verdict.
    fn drive<P: RunnerHandle, C: Clock>(
        &mut self,
        process: &mut P,
        clock: &mut C,
        tailer: &mut LogTailer,
    ) -> Verdict {
        let started = clock.now();

        while !process.has_exited() {
            clock.sleep(self.config.poll_interval);
            self.poll_once(process, clock.now(), tailer);

            if let Some(reason) = self.termination(clock.now(), started) {
                warn!(?reason, "terminating the runner");
                if self.config.verbose {
                    println!("{}", kill_message(reason));
                }
                self.session.stall_killed =
                    reason == KillReason::Stalled && self.session.result == ResultState::Unknown;
                process.kill();
                break;
            }
        }

        // Results or replays may land between the last poll and process exit.
        self.poll_once(process, clock.now(), tailer);
        self.verdict()
    }

    /// One polling pass over every signal source.
    fn poll_once<P: RunnerHandle>(&mut self, process: &mut P, now: Instant, tailer: &mut LogTailer) {
        while let Some(line) = process.poll_line() {
            self.on_runner_line(&line);
        }

        // Until the runner announces the game id, no artifact path exists.
        let Some(id) = self.session.id.clone() else {
            return;
        };

        for line in tailer.read_new_lines(&self.config.error_log(&id)) {
            self.emit("Err: ", &line);
        }
        for line in tailer.read_new_lines(&self.config.main_log(&id)) {
            self.emit("Log: ", &line);
            self.scan_strategy_markers(&line);
        }

        let participants = [self.config.bot_name.clone(), self.plan.opponent.clone()];
        let mut heartbeat = false;
        for (slot, participant) in participants.iter().enumerate() {
            for line in tailer.read_new_lines(&self.config.game_log(&id, slot, participant)) {
                if markers::is_heartbeat(&line) {
                    heartbeat = true;
                } else if let Some(name) = markers::parse_elimination(&line) {
                    self.on_elimination(name, now);
                }
            }
        }
        self.session.stall_polls = if heartbeat {
            self.session.stall_polls + 1
        } else {
            0
        };

        self.check_results(&id, now);
        self.try_finalize_replays(&id);
    }

    fn on_runner_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.emit("", line);

        if self.session.id.is_none() {
            if let Some(id) = markers::parse_game_id(line) {
                info!(game_id = %id, "runner announced the game id");
                if self.config.verbose {
                    println!("Got game ID {id}");
                }
                self.session.id = Some(id);
            }
        }
    }

    fn scan_strategy_markers(&mut self, line: &str) {
        let Some((field, value)) = markers::parse_strategy(line) else {
            return;
        };
        let slot = match field {
            StrategyField::Observed => &mut self.session.observed_strategy,
            StrategyField::ExpectedOpponent => &mut self.session.expected_opponent_strategy,
            StrategyField::Opponent => &mut self.session.opponent_strategy,
        };
        // First occurrence wins.
        if slot.is_none() {
            info!(?field, value, "strategy announced");
            *slot = Some(value.to_owned());
        }
    }

    fn on_elimination(&mut self, name: &str, now: Instant) {
        if self.session.result != ResultState::Unknown {
            return;
        }
        let winner = if name == self.config.bot_name {
            false
        } else if name == self.plan.opponent {
            true
        } else {
            return;
        };
        info!(eliminated = name, "elimination announced");
        self.conclude(ResultState::Concluded { winner }, now);
    }

    /// Reads both result records, own slot first.
    fn check_results(&mut self, id: &GameId, now: Instant) {
        if let ResultState::Concluded { .. } = self.session.result {
            return;
        }

        // A self-reported crash stays provisional until the opponent's record
        // is seen.
        match result_file::read_result(&self.config.result_file(id, 0)) {
            Ok(Some(own)) => self.apply_own_result(own, now),
            Ok(None) => {}
            Err(e) => warn!("{e:#}"),
        }
        match result_file::read_result(&self.config.result_file(id, 1)) {
            Ok(Some(opponent)) => self.apply_opponent_result(opponent, now),
            Ok(None) => {}
            Err(e) => warn!("{e:#}"),
        }
    }

    fn apply_own_result(&mut self, own: BotResult, now: Instant) {
        if self.session.result != ResultState::Unknown {
            return;
        }
        let state = if own.is_crashed {
            ResultState::Crashed
        } else {
            ResultState::Concluded {
                winner: own.is_winner,
            }
        };
        self.conclude(state, now);
    }

    fn apply_opponent_result(&mut self, opponent: BotResult, now: Instant) {
        if opponent.is_crashed {
            // A crashed opponent record decides nothing for this side.
            return;
        }
        let winner = !opponent.is_winner;
        match self.session.result {
            ResultState::Unknown => self.conclude(ResultState::Concluded { winner }, now),
            ResultState::Crashed => {
                // The match completed validly from the opponent's side even
                // though this bot's process died uncleanly; the clean record
                // wins over the provisional crash.
                info!("clean opponent record supersedes the provisional crash");
                self.session.result = ResultState::Concluded { winner };
            }
            ResultState::Concluded { .. } => {}
        }
    }

    fn conclude(&mut self, state: ResultState, now: Instant) {
        self.session.result = state;
        if self.session.result_at.is_none() {
            self.session.result_at = Some(now);
        }
        info!(result = ?state, "match result registered");
    }

    /// Renames the first replay that shows up, once, after the outcome is
    /// known. Replays that appear later are caught by subsequent polls or the
    /// Concluding pass.
    fn try_finalize_replays(&mut self, id: &GameId) {
        if self.session.replay_finalized {
            return;
        }
        let win = match self.session.result {
            ResultState::Unknown => return,
            ResultState::Crashed => None,
            ResultState::Concluded { winner } => Some(winner),
        };

        for slot in 0..2 {
            let candidate = self.config.replay_file(id, slot);
            if let Some(destination) =
                replay::finalize(&candidate, &self.plan.opponent, &self.plan.map, win)
            {
                self.session.replay_finalized = true;
                if self.plan.show_replay {
                    replay::show_in_viewer(&destination);
                }
                break;
            }
        }
    }

    fn termination(&self, now: Instant, started: Instant) -> Option<KillReason> {
        if self.session.stall_polls >= self.config.stall_poll_limit {
            return Some(KillReason::Stalled);
        }
        if let Some(at) = self.session.result_at {
            if now.duration_since(at) > self.config.result_grace {
                return Some(KillReason::ShutdownHang);
            }
        }
        if now.duration_since(started) > self.plan.timeout.budget() + RUNNER_EXIT_MARGIN {
            return Some(KillReason::RunnerHang);
        }
        None
    }

    fn verdict(&self) -> Verdict {
        match self.session.result {
            ResultState::Concluded { winner: true } => Verdict::Won,
            ResultState::Concluded { winner: false } => Verdict::Lost,
            ResultState::Crashed => Verdict::Crashed,
            // The stall rule fires when the counterpart process died; a match
            // that just never produced a result is a timeout.
            ResultState::Unknown if self.session.stall_killed => Verdict::Crashed,
            ResultState::Unknown => Verdict::TimedOut,
        }
    }

    /// The single console/log sink; the polling loop is its only writer, so
    /// lines from the runner and from tailed files never interleave.
    fn emit(&self, prefix: &str, line: &str) {
        debug!("{prefix}{line}");
        if self.config.verbose {
            println!("{} {prefix}{line}", logger::wall_clock_stamp());
        }
    }
}

fn kill_message(reason: KillReason) -> &'static str {
    match reason {
        KillReason::Stalled => "Game appears to have crashed, killing it",
        KillReason::ShutdownHang => "Game is over but the runner did not exit, killing it",
        KillReason::RunnerHang => "Runner overran its timeout budget, killing it",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::fs;
    use std::io::Write;
    use std::path::Path;

    const ANNOUNCE: &str = "Waiting until game GAME_ab12cd34 is ready";
    const HEARTBEAT: &str = "waiting for players...";

    fn test_config(dir: &Path) -> Configuration {
        Configuration::new()
            .with_base_dir(dir)
            .with_bot_name("MyBot")
            .with_verbose(false)
            .with_stop_containers(false)
    }

    fn test_plan() -> MatchPlan {
        MatchPlan {
            opponent: "CherryPi".to_owned(),
            map: "(2)Benzene.scx".to_owned(),
            headless: true,
            show_replay: false,
            timeout: TimeoutClass::Short,
        }
    }

    fn announced_id() -> GameId {
        markers::parse_game_id(ANNOUNCE).unwrap()
    }

    fn write_result(config: &Configuration, slot: usize, winner: bool, crashed: bool) {
        let path = config.result_file(&announced_id(), slot);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!(r#"{{"is_winner": {winner}, "is_crashed": {crashed}}}"#),
        )
        .unwrap();
    }

    fn append_game_log(config: &Configuration, slot: usize, participant: &str, line: &str) {
        let path = config.game_log(&announced_id(), slot, participant);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        writeln!(file, "{line}").unwrap();
    }

    /// Hand-driven runner for poll-by-poll tests.
    #[derive(Default)]
    struct QueueRunner {
        lines: VecDeque<String>,
        exited: bool,
        kills: u32,
    }

    impl RunnerHandle for QueueRunner {
        fn poll_line(&mut self) -> Option<String> {
            self.lines.pop_front()
        }
        fn has_exited(&mut self) -> bool {
            self.exited
        }
        fn kill(&mut self) {
            self.kills += 1;
            self.exited = true;
        }
    }

    /// Scripted runner for full `drive` runs: the closure runs once per poll
    /// cycle (before the cycle's file reads) and returns whether the process
    /// exited on its own.
    struct ScriptedRunner<F: FnMut(u32, &mut VecDeque<String>) -> bool> {
        poll: u32,
        lines: VecDeque<String>,
        exited: bool,
        kills: u32,
        script: F,
    }

    impl<F: FnMut(u32, &mut VecDeque<String>) -> bool> ScriptedRunner<F> {
        fn new(script: F) -> Self {
            ScriptedRunner {
                poll: 0,
                lines: VecDeque::new(),
                exited: false,
                kills: 0,
                script,
            }
        }
    }

    impl<F: FnMut(u32, &mut VecDeque<String>) -> bool> RunnerHandle for ScriptedRunner<F> {
        fn poll_line(&mut self) -> Option<String> {
            self.lines.pop_front()
        }
        fn has_exited(&mut self) -> bool {
            if !self.exited {
                self.exited = (self.script)(self.poll, &mut self.lines);
                self.poll += 1;
            }
            self.exited
        }
        fn kill(&mut self) {
            self.kills += 1;
            self.exited = true;
        }
    }

    struct FakeClock {
        now: Instant,
    }

    impl FakeClock {
        fn new() -> Self {
            FakeClock {
                now: Instant::now(),
            }
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.now
        }
        fn sleep(&mut self, duration: Duration) {
            self.now += duration;
        }
    }

    #[test]
    fn announcement_assigns_the_id_and_own_win_concludes_won() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut runner = QueueRunner::default();
        let mut tailer = LogTailer::new();
        let now = Instant::now();

        // Two silent polls: nothing to do without an id.
        monitor.poll_once(&mut runner, now, &mut tailer);
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert_eq!(monitor.session.id, None);

        runner.lines.push_back(ANNOUNCE.to_owned());
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert_eq!(monitor.session.id.as_ref().unwrap().to_string(), "ab12cd34");

        write_result(&config, 0, true, false);
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert_eq!(monitor.verdict(), Verdict::Won);
    }

    #[test]
    fn own_crash_is_superseded_by_a_clean_opponent_record() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut runner = QueueRunner::default();
        let mut tailer = LogTailer::new();
        let now = Instant::now();

        runner.lines.push_back(ANNOUNCE.to_owned());
        write_result(&config, 0, false, true);
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert_eq!(monitor.verdict(), Verdict::Crashed);
        let concluded_at = monitor.session.result_at;

        // Opponent lost cleanly, so the match actually completed: our crash
        // record was just an unclean shutdown.
        write_result(&config, 1, false, false);
        monitor.poll_once(&mut runner, now + Duration::from_secs(1), &mut tailer);
        assert_eq!(monitor.verdict(), Verdict::Won);
        // The conclusion timestamp is set once and survives the supersede.
        assert_eq!(monitor.session.result_at, concluded_at);
    }

    #[test]
    fn concluded_result_is_final() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut runner = QueueRunner::default();
        let mut tailer = LogTailer::new();
        let now = Instant::now();

        runner.lines.push_back(ANNOUNCE.to_owned());
        write_result(&config, 0, true, false);
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert_eq!(monitor.verdict(), Verdict::Won);

        // A later crash report from the opponent must not rewrite history.
        write_result(&config, 1, false, true);
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert_eq!(monitor.verdict(), Verdict::Won);
    }

    #[test]
    fn elimination_line_concludes_the_match() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut runner = QueueRunner::default();
        let mut tailer = LogTailer::new();
        let now = Instant::now();

        runner.lines.push_back(ANNOUNCE.to_owned());
        monitor.poll_once(&mut runner, now, &mut tailer);

        append_game_log(&config, 1, "CherryPi", ":: CherryPi was eliminated.");
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert_eq!(monitor.verdict(), Verdict::Won);
    }

    #[test]
    fn heartbeat_with_a_gap_never_stalls() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut runner = QueueRunner::default();
        let mut tailer = LogTailer::new();
        let now = Instant::now();

        runner.lines.push_back(ANNOUNCE.to_owned());
        monitor.poll_once(&mut runner, now, &mut tailer);

        for _ in 0..2 {
            append_game_log(&config, 0, "MyBot", HEARTBEAT);
            monitor.poll_once(&mut runner, now, &mut tailer);
        }
        assert_eq!(monitor.session.stall_polls, 2);

        // One poll without a fresh heartbeat resets the counter.
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert_eq!(monitor.session.stall_polls, 0);

        for _ in 0..2 {
            append_game_log(&config, 0, "MyBot", HEARTBEAT);
            monitor.poll_once(&mut runner, now, &mut tailer);
        }
        assert_eq!(monitor.session.stall_polls, 2);
        assert_eq!(monitor.termination(now, now), None);
    }

    #[test]
    fn three_consecutive_heartbeats_kill_the_runner_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut tailer = LogTailer::new();
        let mut clock = FakeClock::new();

        let heartbeat_config = config.clone();
        let mut runner = ScriptedRunner::new(move |poll, lines| {
            match poll {
                0 => lines.push_back(ANNOUNCE.to_owned()),
                1..=3 => append_game_log(&heartbeat_config, 0, "MyBot", HEARTBEAT),
                _ => {}
            }
            false
        });

        let verdict = monitor.drive(&mut runner, &mut clock, &mut tailer);

        // No result ever appeared: the stall rule classifies this as a crash
        // of the counterpart, not as a timeout.
        assert_eq!(verdict, Verdict::Crashed);
        assert_eq!(runner.kills, 1);
    }

    #[test]
    fn result_landing_after_exit_is_still_collected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut tailer = LogTailer::new();
        let mut clock = FakeClock::new();

        let result_config = config.clone();
        let mut runner = ScriptedRunner::new(move |poll, lines| match poll {
            0 => {
                lines.push_back(ANNOUNCE.to_owned());
                false
            }
            // The runner exits in the same instant the result file lands:
            // only the Concluding pass can pick it up.
            _ => {
                write_result(&result_config, 0, false, false);
                true
            }
        });

        let verdict = monitor.drive(&mut runner, &mut clock, &mut tailer);
        assert_eq!(verdict, Verdict::Lost);
        assert_eq!(runner.kills, 0);
    }

    #[test]
    fn hung_runner_is_cut_after_the_result_grace() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path()).with_result_grace(Duration::from_secs(2));
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut tailer = LogTailer::new();
        let mut clock = FakeClock::new();

        let result_config = config.clone();
        let mut runner = ScriptedRunner::new(move |poll, lines| {
            match poll {
                0 => lines.push_back(ANNOUNCE.to_owned()),
                1 => write_result(&result_config, 0, true, false),
                _ => {}
            }
            false
        });

        let verdict = monitor.drive(&mut runner, &mut clock, &mut tailer);
        assert_eq!(verdict, Verdict::Won);
        assert_eq!(runner.kills, 1);
    }

    #[test]
    fn runner_that_never_exits_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut tailer = LogTailer::new();
        let mut clock = FakeClock::new();

        let mut runner = ScriptedRunner::new(|_, _| false);

        let verdict = monitor.drive(&mut runner, &mut clock, &mut tailer);
        assert_eq!(verdict, Verdict::TimedOut);
        assert_eq!(runner.kills, 1);
    }

    #[test]
    fn replay_is_relocated_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut runner = QueueRunner::default();
        let mut tailer = LogTailer::new();
        let now = Instant::now();

        runner.lines.push_back(ANNOUNCE.to_owned());
        monitor.poll_once(&mut runner, now, &mut tailer);

        let candidate = config.replay_file(&announced_id(), 0);
        fs::create_dir_all(candidate.parent().unwrap()).unwrap();
        fs::write(&candidate, b"rep").unwrap();

        write_result(&config, 0, true, false);
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert!(monitor.session.replay_finalized);
        assert!(!candidate.exists());

        // A file reappearing under the candidate name must be left alone.
        fs::write(&candidate, b"rep again").unwrap();
        monitor.poll_once(&mut runner, now, &mut tailer);
        assert!(candidate.exists());
    }

    #[test]
    fn strategy_markers_populate_first_occurrence_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut monitor = MatchMonitor::new(&config, test_plan());
        let mut runner = QueueRunner::default();
        let mut tailer = LogTailer::new();
        let now = Instant::now();

        runner.lines.push_back(ANNOUNCE.to_owned());
        monitor.poll_once(&mut runner, now, &mut tailer);

        let log = config.main_log(&announced_id());
        fs::create_dir_all(log.parent().unwrap()).unwrap();
        fs::write(&log, "Opening: 9-9 gate\nEnemy plan: rush\n").unwrap();
        monitor.poll_once(&mut runner, now, &mut tailer);

        let mut file = fs::OpenOptions::new().append(true).open(&log).unwrap();
        writeln!(file, "Opening: something else").unwrap();
        monitor.poll_once(&mut runner, now, &mut tailer);

        assert_eq!(monitor.session.observed_strategy.as_deref(), Some("9-9 gate"));
        assert_eq!(monitor.session.opponent_strategy.as_deref(), Some("rush"));
        assert_eq!(monitor.session.expected_opponent_strategy, None);
    }

    #[test]
    fn spawn_failure_is_a_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path()).with_runner_command("/nonexistent/runner");
        let monitor = MatchMonitor::new(&config, test_plan());
        let mut tailer = LogTailer::new();

        assert!(monitor.run(&mut tailer).is_err());
    }
}
