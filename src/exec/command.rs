//! Process execution and output checks.

use super::document::Expect;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A fully resolved command, ready to spawn.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub cmd: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub env: HashMap<String, String>,
    pub inherit_env: bool,
    pub cwd: Option<PathBuf>,
    pub shell: bool,
}

impl Invocation {
    fn command(&self) -> Command {
        let mut command = if self.shell {
            let line = std::iter::once(self.cmd.as_str())
                .chain(self.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            let mut sh = Command::new("sh");
            sh.arg("-c").arg(line);
            sh
        } else {
            let mut direct = Command::new(&self.cmd);
            direct.args(&self.args);
            direct
        };

        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if !self.inherit_env {
            command.env_clear();
        }
        command
            .envs(&self.env)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

/// What a finished command produced.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExecOutput {
    /// Exit code if the process exited normally.
    pub exit_code: Option<i32>,
    /// Signal number if the process was terminated by a signal (Unix only).
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Spawn `inv` and wait for it, killing it once `timeout` has passed.
///
/// Stdin is fed and both output streams are drained on their own threads
/// while the process runs, so neither side can stall on a full pipe.
pub fn run_command(inv: &Invocation, timeout: Duration) -> Result<ExecOutput, String> {
    let mut child = inv
        .command()
        .spawn()
        .map_err(|e| format!("failed to spawn '{}': {e}", inv.cmd))?;

    let feeder = match (child.stdin.take(), inv.stdin.clone()) {
        (Some(pipe), Some(data)) => Some(feed(pipe, data)),
        _ => None,
    };
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_until(&mut child, Instant::now() + timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            // Pipe threads finish once the pipes close; nothing waits on them.
            return Err(format!("command timed out after {timeout:?}"));
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(format!("failed to wait: {e}"));
        }
    };

    if let Some(feeder) = feeder {
        join(feeder, "stdin")?.map_err(|e| format!("failed to write stdin: {e}"))?;
    }
    let stdout = join(stdout, "stdout")?.map_err(|e| format!("failed to read stdout: {e}"))?;
    let stderr = join(stderr, "stderr")?.map_err(|e| format!("failed to read stderr: {e}"))?;

    Ok(ExecOutput {
        exit_code: status.code(),
        signal: termination_signal(&status),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

fn feed(mut pipe: impl Write + Send + 'static, data: String) -> JoinHandle<io::Result<()>> {
    thread::spawn(move || match pipe.write_all(data.as_bytes()) {
        // The child may exit without reading all of its input.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join<T>(handle: JoinHandle<T>, stream: &str) -> Result<T, String> {
    handle
        .join()
        .map_err(|_| format!("{stream} pipe thread panicked"))
}

fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_: &ExitStatus) -> Option<i32> {
    None
}

/// Compare `output` against `expect`, returning one message per mismatch.
pub fn check_expectations(expect: &Expect, output: &ExecOutput) -> Vec<String> {
    let mut failures: Vec<String> = check_termination(expect, output).into_iter().collect();
    let streams = [
        ("stdout", &expect.stdout, &output.stdout),
        ("stderr", &expect.stderr, &output.stderr),
    ];
    for (stream, matcher, actual) in streams {
        if let Some(matcher) = matcher {
            failures.extend(matcher.mismatches(stream, actual));
        }
    }
    failures
}

/// An expected signal replaces the exit code check; otherwise the exit code
/// must match, defaulting to zero.
fn check_termination(expect: &Expect, output: &ExecOutput) -> Option<String> {
    let exit = expect.exit.unwrap_or(0);
    match (expect.signal, output.signal, output.exit_code) {
        (Some(want), Some(got), _) if want == got => None,
        (Some(want), Some(got), _) => Some(format!("signal: expected {want}, got {got}")),
        (Some(want), None, code) => Some(format!(
            "signal: expected {want}, but process exited with {}",
            code.map_or_else(|| "unknown status".to_string(), |c| format!("exit code {c}"))
        )),
        (None, _, Some(code)) if code == exit => None,
        (None, _, Some(code)) => Some(format!("exit code: expected {exit}, got {code}")),
        (None, signal, None) => Some(format!(
            "exit code: expected {exit}, but process was terminated by {}",
            signal.map_or_else(|| "unknown cause".to_string(), |s| format!("signal {s}"))
        )),
    }
}
