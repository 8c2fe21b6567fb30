use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::shared::constants::STDERR_CAPTURE_LIMIT;
use crate::shared::error::VideoError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which end of the child the session talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pipe {
    Stdin,
    Stdout,
}

/// One running ffmpeg child with its stderr drained on a helper thread.
///
/// Dropping the handle kills and reaps the child if nobody waited for it,
/// so no session can leave an orphaned process behind.
pub(crate) struct FfmpegProcess {
    program: PathBuf,
    child: Child,
    stderr: Option<JoinHandle<String>>,
    reaped: bool,
}

impl FfmpegProcess {
    pub(crate) fn spawn(program: &Path, args: &[OsString], pipe: Pipe) -> Result<Self, VideoError> {
        log::debug!("spawning {} {}", program.display(), display_args(args));

        let mut cmd = Command::new(program);
        cmd.args(args).stderr(Stdio::piped());
        match pipe {
            Pipe::Stdin => cmd.stdin(Stdio::piped()).stdout(Stdio::null()),
            Pipe::Stdout => cmd.stdin(Stdio::null()).stdout(Stdio::piped()),
        };

        let mut child = cmd.spawn().map_err(|e| spawn_error(program, e))?;
        let stderr = child.stderr.take().map(|stream| {
            let name = program.display().to_string();
            thread::spawn(move || drain_stderr(stream, &name))
        });

        Ok(Self {
            program: program.to_path_buf(),
            child,
            stderr,
            reaped: false,
        })
    }

    pub(crate) fn id(&self) -> u32 {
        self.child.id()
    }

    pub(crate) fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    pub(crate) fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Waits for the child to exit and fails on a non-zero status.
    ///
    /// With a timeout the child is killed once it expires.
    pub(crate) fn finish(&mut self, timeout: Option<Duration>) -> Result<(), VideoError> {
        let status = match self.wait(timeout) {
            Ok(status) => status,
            Err(err) => {
                self.kill();
                return Err(err);
            }
        };
        let stderr = self.collect_stderr();
        if status.success() {
            Ok(())
        } else {
            Err(VideoError::process(
                format!("{} exited with {status}", self.program.display()),
                stderr,
            ))
        }
    }

    /// Kills the child (if still running) and reaps it. Returns captured stderr.
    pub(crate) fn kill(&mut self) -> String {
        if !self.reaped {
            // Fails only when the child already exited, which is fine.
            let _ = self.child.kill();
            if let Err(e) = self.child.wait() {
                log::warn!("failed to reap {}: {e}", self.program.display());
            }
            self.reaped = true;
        }
        self.collect_stderr()
    }

    fn wait(&mut self, timeout: Option<Duration>) -> Result<ExitStatus, VideoError> {
        let Some(timeout) = timeout else {
            let status = self.child.wait()?;
            self.reaped = true;
            return Ok(status);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.reaped = true;
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(VideoError::process(
                    format!(
                        "{} did not exit within {timeout:?}",
                        self.program.display()
                    ),
                    "",
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn collect_stderr(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        if !self.reaped {
            log::debug!("terminating {} (pid {})", self.program.display(), self.id());
            self.kill();
        }
    }
}

fn spawn_error(program: &Path, err: io::Error) -> VideoError {
    if err.kind() == io::ErrorKind::NotFound {
        VideoError::ToolNotFound {
            tool: program.to_path_buf(),
        }
    } else {
        VideoError::Io(err)
    }
}

/// Logs every stderr line and keeps the first [`STDERR_CAPTURE_LIMIT`] bytes.
fn drain_stderr(stream: impl Read, name: &str) -> String {
    let mut reader = BufReader::new(stream);
    let mut captured = String::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                log::debug!("{name}: {}", text.trim_end());
                if captured.len() + text.len() <= STDERR_CAPTURE_LIMIT {
                    captured.push_str(&text);
                }
            }
        }
    }
    captured
}

pub(crate) fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
