//! Stopping leftover game containers after a match.
//!
//! The runner starts one container per participant, named after the game id.
//! They normally stop with the game, but a killed or crashed match can leave
//! them running; after each match the trainer enumerates and stops the
//! stragglers. Nothing here is fatal.

use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::markers::GameId;

/// Residual teardown can lag the runner's exit; enumerate after it settles.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Stops every running container whose name contains the game id.
pub(crate) fn stop_match_containers(id: &GameId) {
    thread::sleep(SETTLE_DELAY);

    let enumeration = Command::new("docker")
        .args(["ps", "-q", "--filter"])
        .arg(format!("name=GAME_{id}"))
        .output();
    let output = match enumeration {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            warn!("container enumeration exited with {}", output.status);
            return;
        }
        Err(e) => {
            warn!("could not enumerate containers: {e}");
            return;
        }
    };

    for container in String::from_utf8_lossy(&output.stdout).split_whitespace() {
        debug!(container, "stopping leftover container");
        match Command::new("docker").args(["stop", container]).status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("docker stop {container} exited with {status}"),
            Err(e) => warn!("could not stop container {container}: {e}"),
        }
    }
}
