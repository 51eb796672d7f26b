//! Subprocess execution utilities.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Interval between checks of the stdout completion flag.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Build from an argv list; `None` when the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program).args(args))
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn build_command(&self, program: &OsStr, prefix: &[&str]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(prefix);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    fn spawn(&self) -> Result<Child> {
        let err = match self.build_command(self.program.as_os_str(), &[]).spawn() {
            Ok(child) => return Ok(child),
            Err(err) => err,
        };

        // Batch files and shell built-ins only resolve through the command interpreter
        if cfg!(windows) && err.kind() == io::ErrorKind::NotFound {
            let program = self.program.to_string_lossy().into_owned();
            tracing::debug!("retrying `{}` through cmd /C", program);
            if let Ok(child) = self.build_command(OsStr::new("cmd"), &["/C", &program]).spawn() {
                return Ok(child);
            }
        }

        Err(err).with_context(|| format!("failed to spawn `{}`", self.display_command()))
    }

    /// Execute the command and wait for completion, capturing both streams.
    ///
    /// Stdout is drained on an auxiliary thread while this thread drains
    /// stderr, so a child filling either pipe cannot deadlock.
    pub fn exec(&self) -> Result<Output> {
        let mut child = self.spawn()?;

        let drained = Arc::new(Drained::default());
        let stdout = child.stdout.take();
        let publisher = Arc::clone(&drained);
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stdout) = stdout {
                if let Err(e) = stdout.read_to_end(&mut buf) {
                    tracing::debug!("failed to drain stdout: {}", e);
                }
            }
            publisher.publish(buf);
        });

        let stderr = match child.stderr.take() {
            Some(mut pipe) => {
                let mut buf = Vec::new();
                pipe.read_to_end(&mut buf).map(|_| buf)
            }
            None => Ok(Vec::new()),
        };
        self.finish(child, &drained, stderr)
    }

    /// Reap the child and collect its output.
    ///
    /// When stderr could not be read the child is killed and reaped before
    /// the error propagates, and the stdout thread is joined either way.
    fn finish(&self, mut child: Child, drained: &Drained, stderr: io::Result<Vec<u8>>) -> Result<Output> {
        let stderr = match stderr {
            Ok(stderr) => stderr,
            Err(err) => {
                if let Err(e) = child.kill() {
                    tracing::debug!("failed to kill `{}`: {}", self.display_command(), e);
                }
                if let Err(e) = child.wait() {
                    tracing::debug!("failed to reap `{}`: {}", self.display_command(), e);
                }
                drained.wait();
                return Err(err)
                    .with_context(|| format!("failed to read stderr of `{}`", self.display_command()));
            }
        };

        let status = child
            .wait()
            .with_context(|| format!("failed to wait for `{}`", self.display_command()))?;
        let stdout = drained.wait();

        Ok(Output {
            status,
            stdout,
            stderr,
        })
    }

    /// Execute and require success.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr.trim_end()
            );
        }
        Ok(output)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Stdout handed from the draining thread, published exactly once.
#[derive(Default)]
struct Drained {
    output: Mutex<Option<Vec<u8>>>,
    ready: Condvar,
}

impl Drained {
    fn publish(&self, bytes: Vec<u8>) {
        let mut slot = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(bytes);
        self.ready.notify_all();
    }

    fn wait(&self) -> Vec<u8> {
        let mut slot = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(bytes) = slot.take() {
                return bytes;
            }
            let (next, _) = self
                .ready
                .wait_timeout(slot, DRAIN_POLL)
                .unwrap_or_else(PoisonError::into_inner);
            slot = next;
        }
    }
}
