//! Sequential driving of matches and bookkeeping across them.
//!
//! [`SessionDriver`] owns everything that outlives a single match: the
//! log-tail cache, the aggregate score, and the training-run bookkeeping.
//! Matches run strictly one after another, so none of it needs locking.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use rand::Rng;
use tracing::{error, instrument, warn};

use crate::cli::{MapFilter, RunMode, RunPlan};
use crate::configuration::{Configuration, TimeoutClass};
use crate::logger;
use crate::maps;
use crate::monitor::{MatchMonitor, MatchPlan, MatchReport, Verdict};
use crate::tail::LogTailer;

const OPPONENTS_FILE: &str = "opponents.csv";

/// Outcome totals of a session; every finished match increments exactly one
/// of the four counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AggregateCounters {
    /// Matches the monitored bot won.
    pub wins: u32,
    /// Matches the monitored bot lost.
    pub losses: u32,
    /// Matches that died without producing a valid outcome.
    pub crashes: u32,
    /// Matches that never produced a result at all.
    pub timeouts: u32,
}

impl AggregateCounters {
    pub(crate) fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Won => self.wins += 1,
            Verdict::Lost => self.losses += 1,
            Verdict::Crashed => self.crashes += 1,
            Verdict::TimedOut => self.timeouts += 1,
        }
    }

    /// Total number of recorded matches.
    pub fn total(&self) -> u32 {
        self.wins + self.losses + self.crashes + self.timeouts
    }
}

impl fmt::Display for AggregateCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} wins {} losses ({} crashes, {} timeouts)",
            self.wins, self.losses, self.crashes, self.timeouts
        )
    }
}

/// One entry of the training roster.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TrainingOpponent {
    name: String,
    timeout: Option<TimeoutClass>,
}

/// Runs matches one after another according to a [`RunPlan`] and accumulates
/// their outcomes.
pub struct SessionDriver {
    config: Configuration,
    tailer: LogTailer,
    counters: AggregateCounters,
}

impl SessionDriver {
    /// Creates a driver; when the configuration asks for it, the file logger
    /// is installed here.
    pub fn new(config: Configuration) -> Self {
        if config.log {
            logger::init_logger();
        }
        SessionDriver {
            config,
            tailer: LogTailer::new(),
            counters: AggregateCounters::default(),
        }
    }

    /// Executes the plan and returns the final totals.
    ///
    /// A match that cannot even start is recorded as a crash in batch and
    /// training modes; only a single-match run propagates the setup error.
    /// [`RunMode::Training`] loops forever and only returns on a fatal setup
    /// error, such as a missing opponents file.
    #[instrument(skip_all, fields(opponent = %plan.opponent))]
    pub fn run(&mut self, plan: &RunPlan) -> anyhow::Result<AggregateCounters> {
        if plan.clean {
            self.clean_bot_directories(&plan.opponent);
        }

        match &plan.mode {
            RunMode::Single(filter) => {
                let map = pick_map(filter)?;
                let opponent = plan.opponent.clone();
                self.run_match(plan, &opponent, &map, plan.timeout)?;
            }
            RunMode::Batch { limit } => self.run_batch(plan, *limit),
            RunMode::Training => self.run_training(plan)?,
        }

        Ok(self.counters)
    }

    /// Final totals so far.
    pub fn counters(&self) -> AggregateCounters {
        self.counters
    }

    fn run_match(
        &mut self,
        plan: &RunPlan,
        opponent: &str,
        map: &str,
        timeout: TimeoutClass,
    ) -> anyhow::Result<MatchReport> {
        let match_plan = MatchPlan {
            opponent: opponent.to_owned(),
            map: map.to_owned(),
            headless: plan.headless,
            show_replay: plan.show_replay,
            timeout,
        };
        let report = MatchMonitor::new(&self.config, match_plan).run(&mut self.tailer)?;
        self.counters.record(report.verdict);
        Ok(report)
    }

    /// Like [`Self::run_match`], but a setup failure becomes a recorded crash
    /// instead of ending the session.
    fn run_match_recorded(
        &mut self,
        plan: &RunPlan,
        opponent: &str,
        map: &str,
        timeout: TimeoutClass,
    ) -> Option<MatchReport> {
        match self.run_match(plan, opponent, map, timeout) {
            Ok(report) => Some(report),
            Err(e) => {
                error!("match could not run: {e:#}");
                if self.config.verbose {
                    println!("Match could not run: {e:#}");
                }
                self.counters.record(Verdict::Crashed);
                None
            }
        }
    }

    fn run_batch(&mut self, plan: &RunPlan, limit: Option<usize>) {
        let pool = maps::shuffled_pool();
        let limit = limit.unwrap_or(pool.len());
        let opponent = plan.opponent.clone();

        for map in pool.into_iter().take(limit) {
            self.run_match_recorded(plan, &opponent, map, plan.timeout);
            if self.config.verbose {
                println!(
                    "Score is {} wins {} losses",
                    self.counters.wins, self.counters.losses
                );
            }
        }
    }

    fn run_training(&mut self, plan: &RunPlan) -> anyhow::Result<()> {
        let roster = load_opponents(Path::new(OPPONENTS_FILE))?;
        let output = PathBuf::from(logger::training_output_name());
        append_line(&output, "Opponent;Map;Game ID;Result")?;

        let pool = maps::shuffled_pool();
        let mut rng = rand::thread_rng();

        loop {
            let entry = &roster[rng.gen_range(0..roster.len())];
            let map = pool[rng.gen_range(0..pool.len())];
            let timeout = entry.timeout.unwrap_or(TimeoutClass::Max);

            if let Some(report) = self.run_match_recorded(plan, &entry.name, map, timeout) {
                if report.verdict.win().is_some() {
                    let row = format!(
                        "{};{};{};{}",
                        entry.name,
                        map,
                        report.game_id.as_deref().unwrap_or(""),
                        report.verdict,
                    );
                    if let Err(e) = append_line(&output, &row) {
                        warn!("could not record training result: {e:#}");
                    }
                }
            }

            if self.config.verbose {
                println!(
                    "Overall score is {} wins {} losses",
                    self.counters.wins, self.counters.losses
                );
            }
        }
    }

    /// Clears both bots' read/write directories. Failures only cost warnings;
    /// a missing directory is the common case on a first run.
    fn clean_bot_directories(&self, opponent: &str) {
        for dir in [
            self.config.read_dir(&self.config.bot_name),
            self.config.write_dir(&self.config.bot_name),
            self.config.read_dir(opponent),
            self.config.write_dir(opponent),
        ] {
            if let Err(e) = clear_directory(&dir) {
                warn!("failed to clear {}: {e}", dir.display());
                if self.config.verbose {
                    println!("Failed to clear {}: {e}", dir.display());
                }
            }
        }
    }
}

fn pick_map(filter: &MapFilter) -> anyhow::Result<String> {
    let map = match filter {
        MapFilter::Named(map) => return Ok(map.clone()),
        MapFilter::Any => maps::shuffled_pool()
            .first()
            .copied()
            .context("the map pool is empty")?,
        MapFilter::PlayerCount(count) => {
            let tag = format!("({count})");
            maps::shuffled_pool()
                .into_iter()
                .find(|map| map.contains(&tag))
                .with_context(|| format!("no {tag} map in the pool"))?
        }
    };
    Ok(map.to_owned())
}

/// Reads the training roster: one `name;timeout-class` entry per line, blank
/// lines and lines starting with `-` skipped.
fn load_opponents(path: &Path) -> anyhow::Result<Vec<TrainingOpponent>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("no {} file found for training run", path.display()))?;

    let roster: Vec<TrainingOpponent> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .map(|line| {
            let mut fields = line.split(';').map(str::trim);
            let name = fields.next().unwrap_or("").to_owned();
            let timeout = fields.next().and_then(TimeoutClass::from_keyword);
            TrainingOpponent { name, timeout }
        })
        .collect();

    if roster.is_empty() {
        anyhow::bail!("{} lists no active opponents", path.display());
    }
    Ok(roster)
}

fn append_line(path: &Path, line: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("could not append to {}", path.display()))
}

fn clear_directory(dir: &Path) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
