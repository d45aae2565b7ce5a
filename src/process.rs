//! Ownership of the external game-runner process.
//!
//! The runner is spawned with piped stdout/stderr; two reader threads forward
//! its output line by line over a channel, so the monitor can pick lines up
//! between polls without ever blocking. The monitor loop is the only writer
//! to the console sink, which keeps output lines whole.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use anyhow::Context;
use tracing::{debug, warn};

use crate::configuration::Configuration;
use crate::monitor::MatchPlan;

/// Polling interface the match monitor drives a runner process through.
pub(crate) trait RunnerHandle {
    /// Next buffered output line, if any. Never blocks.
    fn poll_line(&mut self) -> Option<String>;

    /// True once the process has terminated.
    fn has_exited(&mut self) -> bool;

    /// Force-terminate the process. Tolerates one that already exited on its
    /// own between the caller's exit check and this call.
    fn kill(&mut self);
}

pub(crate) struct RunnerProcess {
    child: Child,
    lines: Receiver<String>,
}

impl RunnerProcess {
    /// Spawns the runner for one match and starts pumping its output.
    pub(crate) fn spawn(config: &Configuration, plan: &MatchPlan) -> anyhow::Result<RunnerProcess> {
        let mut command = Command::new(&config.runner_command);
        command
            .arg("--bots")
            .arg(&config.bot_name)
            .arg(&plan.opponent)
            .arg("--game_speed")
            .arg("0")
            .arg("--map")
            .arg(format!("sscai/{}", plan.map))
            .arg("--timeout")
            .arg(plan.timeout.budget().as_secs().to_string())
            .arg("--read_overwrite");
        if plan.headless {
            command.arg("--headless");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("could not launch '{}'", config.runner_command))?;

        let (tx, rx) = mpsc::channel();
        pump_lines(child.stdout.take().context("runner stdout not captured")?, tx.clone());
        pump_lines(child.stderr.take().context("runner stderr not captured")?, tx);

        Ok(RunnerProcess { child, lines: rx })
    }
}

fn pump_lines<R: Read + Send + 'static>(reader: R, tx: Sender<String>) {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            // A dropped receiver means the match is already being torn down.
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

impl RunnerHandle for RunnerProcess {
    fn poll_line(&mut self) -> Option<String> {
        match self.lines.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(status) => status.is_some(),
            Err(e) => {
                warn!("could not query runner status: {e}");
                false
            }
        }
    }

    fn kill(&mut self) {
        // The runner may finish between the exit check and this call; a kill
        // error on an exited process is the expected outcome of that race.
        if let Err(e) = self.child.kill() {
            debug!("kill on exited runner: {e}");
        }
        let _ = self.child.wait();
    }
}

impl Drop for RunnerProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            self.kill();
        }
    }
}
