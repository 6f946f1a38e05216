//! Fire-and-forget execution of item scripts.

use log::{debug, warn};
use std::process::{Command, Stdio};

/// Spawn `script` through `sh -c` with the given environment and return
/// immediately. The scheduler never waits on the child; a detached reaper
/// thread collects the exit status so no zombie is left behind. Spawn
/// failures are logged, not surfaced.
pub fn spawn_script(script: &str, env: &[(String, String)]) {
    if script.trim().is_empty() {
        return;
    }

    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    for (key, value) in env {
        command.env(key, value);
    }

    match command.spawn() {
        Ok(mut child) => {
            debug!("spawned script (pid {})", child.id());
            let result = std::thread::Builder::new()
                .name("script-reaper".to_string())
                .spawn(move || {
                    let _ = child.wait();
                });
            if let Err(e) = result {
                warn!("failed to spawn script reaper thread: {e}");
            }
        }
        Err(e) => warn!("failed to spawn script: {e}"),
    }
}
