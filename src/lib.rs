//! # Bot Trainer
//!
//! A crate for launching, monitoring and scoring bot-vs-bot StarCraft matches
//! run through an external dockerized game runner.
//!
//! It provides:
//! - Match execution and lifecycle monitoring (`MatchMonitor`)
//! - Session orchestration for single matches, map batches and endless
//!   training runs (`SessionDriver`)
//! - Incremental tailing of the log files a running match appends to
//!   (`LogTailer`)
//!
//! The runner owns the game itself; this crate owns everything around it:
//! spawning the runner, watching the artifacts it produces (console output,
//! growing log files, result records, replay files), deciding when a match is
//! actually over — including matches that hang silently after the game ended —
//! recording the outcome, and cleaning up leftover containers.
//!
//! # Documentation Overview
//!
//! - For the per-match state machine and termination rules, see the
//!   [`monitor`] module.
//! - For directory layout, timeouts and environment overrides, see
//!   [`Configuration`](crate::configuration::Configuration).
//! - For run modes and aggregate scoring, see the [`session`] module.
//!
//! # Usage Example
//!
//! ```no_run
//! use bot_trainer::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::from_env().with_bot_name("Steamhammer");
//!
//!     let plan = RunPlan {
//!         opponent: "CherryPi".to_owned(),
//!         headless: true,
//!         show_replay: false,
//!         timeout: TimeoutClass::Medium,
//!         clean: false,
//!         mode: RunMode::Batch { limit: Some(5) },
//!     };
//!
//!     let mut driver = SessionDriver::new(config);
//!     let totals = driver.run(&plan)?;
//!     println!("{totals}");
//!
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

pub use anyhow;

pub mod cli;
pub mod configuration;
mod containers;
mod logger;
mod maps;
mod markers;
pub mod monitor;
mod process;
mod replay;
mod result_file;
pub mod session;
pub mod tail;

/// Commonly used types for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use bot_trainer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cli::{MapFilter, RunMode, RunPlan};
    pub use crate::configuration::{Configuration, TimeoutClass};
    pub use crate::monitor::{MatchMonitor, MatchPlan, MatchReport, Verdict};
    pub use crate::session::{AggregateCounters, SessionDriver};
    pub use crate::tail::LogTailer;
}
