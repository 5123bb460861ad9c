use std::{
    io::{self, Read},
    path::PathBuf,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use tracing::debug;

pub(crate) const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Shell used to interpret the joined argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSpec {
    pub program: PathBuf,
    /// Start the shell as a login shell so profile files are read.
    pub login: bool,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub cwd: Option<PathBuf>,
    pub shell: Option<ShellSpec>,
    /// Run under `arch -arch <name>`; only honored on macOS.
    pub architecture: Option<String>,
    pub timeout: Duration,
    pub max_capture_bytes: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            shell: None,
            architecture: None,
            timeout: DEFAULT_TIMEOUT,
            max_capture_bytes: DEFAULT_MAX_CAPTURE_BYTES,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn shell(mut self, shell: ShellSpec) -> Self {
        self.shell = Some(shell);
        self
    }

    #[must_use]
    pub fn architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = Some(architecture.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("no program given")]
    EmptyCommand,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {}", describe_code(.code))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{program} timed out after {}ms", .timeout.as_millis())]
    Timeout { program: String, timeout: Duration },
    #[error("failed to capture output of {program}: {source}")]
    Capture {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// Failures that only say "this program did not run cleanly".
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. } | Self::Exit { .. } | Self::Timeout { .. }
        )
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Opt-in soft-failure mode for process results.
pub trait SoftFailure<T> {
    /// Maps spawn failures, non-zero exits and timeouts to `Ok(None)`; capture
    /// failures stay errors.
    fn soft(self) -> Result<Option<T>, ProcessError>;
}

impl<T> SoftFailure<T> for Result<T, ProcessError> {
    fn soft(self) -> Result<Option<T>, ProcessError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_soft() => {
                debug!(%err, "ignoring soft process failure");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Execute a program, capture stdout/stderr, and enforce the timeout.
///
/// # Errors
///
/// Returns [`ProcessError::Exit`] for a non-zero exit, [`ProcessError::Timeout`]
/// when the deadline passes (the child is killed), and
/// [`ProcessError::Spawn`]/[`ProcessError::Capture`] for I/O failures.
pub fn run_command(args: &[String], options: &RunOptions) -> Result<RunOutput, ProcessError> {
    let argv = effective_argv(args, options);
    let program = argv.first().cloned().ok_or(ProcessError::EmptyCommand)?;
    let mut command = configured_command(&argv, options);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    debug!(?argv, timeout_ms = options.timeout.as_millis(), "running command");
    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;
    let capture_error = |source: io::Error| ProcessError::Capture {
        program: program.clone(),
        source,
    };
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| capture_error(io::Error::other("stdout missing")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| capture_error(io::Error::other("stderr missing")))?;
    let limit = options.max_capture_bytes;
    let stdout_handle = thread::spawn(move || read_to_string_limited(stdout, limit));
    let stderr_handle = thread::spawn(move || read_to_string_limited(stderr, limit));

    let status = match wait_with_timeout(&mut child, options.timeout) {
        Ok(status) => status,
        Err(err) => {
            kill_process_group(&mut child);
            let _ = child.wait();
            return Err(capture_error(err));
        }
    };
    let Some(status) = status else {
        debug!(%program, "command timed out, killing process group");
        kill_process_group(&mut child);
        let _ = child.wait();
        // Readers are left detached: a descendant that escaped the group may
        // still hold the pipes open.
        drop((stdout_handle, stderr_handle));
        return Err(ProcessError::Timeout {
            program,
            timeout: options.timeout,
        });
    };

    let stdout = stdout_handle
        .join()
        .map_err(|_| capture_error(io::Error::other("stdout reader panicked")))?
        .map_err(capture_error)?;
    let stderr = stderr_handle
        .join()
        .map_err(|_| capture_error(io::Error::other("stderr reader panicked")))?
        .map_err(capture_error)?;

    if !status.success() {
        debug!(%program, %status, stderr = stderr.trim(), "command failed");
        return Err(ProcessError::Exit {
            program,
            code: status.code(),
            stderr,
        });
    }
    Ok(RunOutput {
        code: status.code().unwrap_or(0),
        stdout,
        stderr,
    })
}

fn effective_argv(args: &[String], options: &RunOptions) -> Vec<String> {
    match options.architecture.as_deref() {
        Some(arch) if cfg!(target_os = "macos") && !args.is_empty() => {
            let mut argv = vec!["arch".to_string(), "-arch".to_string(), arch.to_string()];
            argv.extend_from_slice(args);
            argv
        }
        _ => args.to_vec(),
    }
}

fn configured_command(argv: &[String], options: &RunOptions) -> Command {
    let mut command = match &options.shell {
        Some(shell) => shell_command(shell, &argv.join(" ")),
        None => {
            let mut command = Command::new(&argv[0]);
            command.args(&argv[1..]);
            command
        }
    };
    if let Some(cwd) = &options.cwd {
        command.current_dir(cwd);
    }
    isolate_process_group(&mut command);
    command
}

/// Starts the child as the leader of a new process group so a timeout can
/// take down everything it spawned.
#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: `kill` has no memory-safety preconditions; the negative pid
        // addresses the group the child leads.
        let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, error = %io::Error::last_os_error(), "failed to kill process group");
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(not(windows))]
fn shell_command(shell: &ShellSpec, script: &str) -> Command {
    let mut command = Command::new(&shell.program);
    if shell.login {
        command.arg("-l");
    }
    command.arg("-c").arg(script);
    command
}

#[cfg(windows)]
fn shell_command(shell: &ShellSpec, script: &str) -> Command {
    let mut command = Command::new(&shell.program);
    command.arg("/C").arg(script);
    command
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn read_to_string_limited(mut reader: impl Read, limit: usize) -> io::Result<String> {
    let mut buffer = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        append_limited(&mut buffer, &chunk[..read], limit, &mut truncated);
    }
    let mut text = String::from_utf8_lossy(&buffer).to_string();
    if truncated {
        text.push_str("\n[...truncated...]\n");
    }
    Ok(text)
}

fn append_limited(buffer: &mut Vec<u8>, chunk: &[u8], limit: usize, truncated: &mut bool) {
    if buffer.len().saturating_add(chunk.len()) <= limit {
        buffer.extend_from_slice(chunk);
        return;
    }
    *truncated = true;
    let room = limit.saturating_sub(buffer.len());
    buffer.extend_from_slice(&chunk[..room.min(chunk.len())]);
}
