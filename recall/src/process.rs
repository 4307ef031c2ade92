use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::platform::PlatformError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// A non-zero exit becomes `PlatformError::Automation` carrying the command's stderr.
pub fn run_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
    what: &str,
) -> Result<(), PlatformError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                tracing::debug!("{} finished", what);
                return Ok(());
            }
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                use std::io::Read;
                let _ = pipe.read_to_string(&mut stderr);
            }
            let stderr = stderr.trim();
            return Err(PlatformError::Automation {
                message: if stderr.is_empty() {
                    format!("{} exited with {}", what, status)
                } else {
                    format!("{} exited with {}: {}", what, status, stderr)
                },
            });
        }

        if Instant::now() >= deadline {
            tracing::warn!("{} timed out after {:?}, killing", what, timeout);
            let _ = child.kill();
            let _ = child.wait();
            return Err(PlatformError::Timeout {
                what: what.to_string(),
                timeout,
            });
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}
