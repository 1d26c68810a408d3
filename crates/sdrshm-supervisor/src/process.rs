//! Spawns the external process, polls for a ring to become usable, and
//! tears both down in the fixed order the cleanup contract requires.

use crate::invocation::ExternalProcessSpec;
use sdrshm_core::{RingError, StreamError};
use sdrshm_ring::RingReader;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const READY_POLL_TIMEOUT: Duration = Duration::from_secs(10);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(1);
const LOG_TAIL_BYTES: usize = 8192;

/// Let a publishing task (TX's ring writer) flush its last slots to the
/// external consumer before the supervisor tears the process down.
pub const WRITER_DONE_DRAIN_DELAY: Duration = Duration::from_millis(500);

/// Owns the `Child` for the external process and its log file. `terminate`
/// is idempotent: it's safe to call from a task's cleanup path and again
/// from `Drop`.
pub struct ProcessHandle {
    child: std::process::Child,
    log_path: PathBuf,
    terminated: AtomicBool,
}

impl ProcessHandle {
    pub fn spawn(spec: &ExternalProcessSpec, log_path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let log_path = log_path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stdout_file = File::create(&log_path)?;
        let stderr_file = stdout_file.try_clone()?;

        let child = spec
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .spawn()?;

        tracing::info!(exe = %spec.exe.display(), log = %log_path.display(), "spawned external process");

        Ok(Self { child, log_path, terminated: AtomicBool::new(false) })
    }

    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn log_tail(&self) -> String {
        match fs::read(&self.log_path) {
            Ok(bytes) => {
                let start = bytes.len().saturating_sub(LOG_TAIL_BYTES);
                String::from_utf8_lossy(&bytes[start..]).into_owned()
            }
            Err(_) => String::new(),
        }
    }

    /// Kills the process if it's still running, then reaps it. A no-op on
    /// the second and subsequent calls.
    pub fn terminate(&mut self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
        }
        match self.child.wait() {
            Ok(status) => tracing::debug!(pid = self.child.id(), %status, "external process reaped"),
            Err(err) => tracing::warn!(pid = self.child.id(), %err, "failed to reap external process"),
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Polls for `path` to become a valid, channel-matching ring, bounded by a
/// 10-second wall-clock deadline. `ring_too_small` / `ring_malformed` are
/// expected mid-creation and retried; any other error, or the process
/// exiting first, ends the wait early.
pub fn wait_for_ring_reader(
    path: &Path,
    expected_channels: u16,
    handle: &mut ProcessHandle,
) -> Result<RingReader, StreamError> {
    let deadline = Instant::now() + READY_POLL_TIMEOUT;
    loop {
        match RingReader::open(path) {
            Ok(reader) => {
                if reader.num_channels() != expected_channels {
                    return Err(StreamError::Ring(RingError::ChannelMismatch {
                        requested: expected_channels,
                        observed: reader.num_channels(),
                    }));
                }
                return Ok(reader);
            }
            Err(RingError::Absent(_)) => {}
            Err(err) if err.is_retryable_during_open() => {}
            Err(err) => return Err(StreamError::Ring(err)),
        }

        if let Ok(Some(_status)) = handle.try_wait() {
            return Err(StreamError::ProcessFailedToStart { log_tail: handle.log_tail() });
        }
        if Instant::now() >= deadline {
            return Err(StreamError::OpenTimeout);
        }
        std::thread::sleep(READY_POLL_INTERVAL);
    }
}

/// Deletes a stale ring file left over from a previous run, ignoring
/// "doesn't exist". Called before spawning a process that is expected to
/// create the ring fresh.
pub fn clear_stale_ring(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Fixed teardown order: terminate the external process, then delete the
/// ring file(s). Unmapping happens as a side effect of the caller dropping
/// its `RingWriter`/`RingReader` handles before calling this.
pub fn cleanup(mut handle: ProcessHandle, ring_paths: &[&Path]) {
    handle.terminate();
    for path in ring_paths {
        if let Err(err) = sdrshm_ring::delete_ring(path) {
            tracing::warn!(path = %path.display(), %err, "failed to delete ring file during cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::ExternalProcessSpec;
    use sdrshm_config::RxParams;
    use tempfile::NamedTempFile;

    fn scratch_path() -> PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        fs::remove_file(&path).ok();
        path
    }

    #[test]
    fn clear_stale_ring_is_idempotent_on_absent_path() {
        let path = scratch_path();
        clear_stale_ring(&path).unwrap();
        clear_stale_ring(&path).unwrap();
    }

    #[test]
    fn clear_stale_ring_removes_existing_file() {
        let path = scratch_path();
        fs::write(&path, b"stale").unwrap();
        clear_stale_ring(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn spawn_reports_missing_executable_as_io_error() {
        let mut params = RxParams::default();
        params.invocation_override = Some(PathBuf::from("/nonexistent/sdrshm-definitely-not-here"));
        let spec = ExternalProcessSpec::for_rx(1, &params);
        let log_path = scratch_path();
        let result = ProcessHandle::spawn(&spec, &log_path);
        assert!(matches!(result, Err(StreamError::Io(_))));
    }

    #[test]
    fn wait_for_ring_reader_times_out_when_nothing_shows_up() {
        // Spawn a process that exits immediately without creating a ring;
        // the wait should resolve via "process has exited", not the full
        // 10s timeout.
        let params_exe = PathBuf::from("/bin/true");
        let mut params = RxParams::default();
        params.ring_path = scratch_path();
        params.invocation_override = Some(params_exe);
        let spec = ExternalProcessSpec::for_rx(1, &params);
        let log_path = scratch_path();
        let mut handle = ProcessHandle::spawn(&spec, &log_path).unwrap();
        // Give /bin/true a moment to exit.
        std::thread::sleep(Duration::from_millis(50));
        let result = wait_for_ring_reader(&params.ring_path, 1, &mut handle);
        assert!(matches!(result, Err(StreamError::ProcessFailedToStart { .. })));
    }
}
