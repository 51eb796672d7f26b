//! Centralized shell output and progress management.
//!
//! The Shell provides a unified API for all user-facing output:
//! - Status lines with a right-aligned 12-column prefix
//! - Progress bars (via indicatif)
//! - Scoped timing spans with delayed start
//! - JSON output mode with one event per file operation
//!
//! Library code reports file operations through [`Shell::file_event`]; the
//! shell decides whether that becomes a status line, a JSON event or nothing.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and progress bars.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    #[default]
    Normal,
    /// --verbose: immediate status lines, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // File operations (green)
    Created,
    Updated,
    Deleted,
    Finished,

    // In-progress (cyan)
    Analyzing,
    Generating,
    Cleaning,
    Running,

    Info,

    Warning,

    Error,
}

impl Status {
    /// Get the display text for this status.
    fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "Created",
            Status::Updated => "Updated",
            Status::Deleted => "Deleted",
            Status::Finished => "Finished",
            Status::Analyzing => "Analyzing",
            Status::Generating => "Generating",
            Status::Cleaning => "Cleaning",
            Status::Running => "Running",
            Status::Info => "Info",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    /// Get the ANSI color code for this status.
    fn color_code(&self) -> &'static str {
        match self {
            Status::Created | Status::Updated | Status::Deleted | Status::Finished => "\x1b[1;32m",
            Status::Analyzing | Status::Generating | Status::Cleaning | Status::Running => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }

    /// JSON `action` field for file operation statuses.
    fn action(&self) -> &'static str {
        match self {
            Status::Created => "created",
            Status::Updated => "updated",
            Status::Deleted => "deleted",
            _ => "other",
        }
    }
}

/// Width of the right-aligned status column.
const STATUS_WIDTH: usize = 12;

/// Where output lines go.
#[derive(Debug)]
enum Sink {
    Stderr,
    /// Collected in memory, without color
    Memory(Mutex<Vec<String>>),
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
    sink: Sink,
    /// Whether we've printed anything
    has_output: AtomicBool,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell {
            mode,
            use_color,
            sink: Sink::Stderr,
            has_output: AtomicBool::new(false),
        }
    }

    /// Create a shell that records lines in memory instead of printing them.
    pub fn capturing(mode: ShellMode) -> Self {
        Shell {
            use_color: false,
            sink: Sink::Memory(Mutex::new(Vec::new())),
            ..Shell::new(mode)
        }
    }

    /// Create a shell from CLI flags with proper precedence.
    ///
    /// JSON mode takes precedence over quiet/verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice, json: bool) -> Self {
        let mode = if json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    /// Get the current shell mode.
    pub fn mode(&self) -> &ShellMode {
        &self.mode
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    /// Check if shell is in JSON mode.
    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Whether anything has been emitted.
    pub fn has_output(&self) -> bool {
        self.has_output.load(Ordering::SeqCst)
    }

    /// Lines recorded by a capturing shell; empty otherwise.
    pub fn captured(&self) -> Vec<String> {
        match &self.sink {
            Sink::Memory(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
            Sink::Stderr => Vec::new(),
        }
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`
    ///
    /// In quiet mode, only Error status is printed. In JSON mode, status
    /// lines are dropped.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            return;
        }

        if self.is_quiet() && status != Status::Error {
            return;
        }

        let line = format!("{} {}", self.format_status(status), msg);
        self.emit(line, false);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: impl Display) {
        if self.is_json() {
            let event = serde_json::json!({
                "reason": "error",
                "message": msg.to_string()
            });
            self.json_event(&event);
        } else {
            self.status(Status::Error, msg);
        }
    }

    /// Report a file operation.
    ///
    /// Human mode prints the status line with `display` as the message; JSON
    /// mode emits a `file-operation` event carrying the absolute path.
    pub fn file_event(&self, status: Status, path: &Path, display: impl Display) {
        if self.is_json() {
            let event = serde_json::json!({
                "reason": "file-operation",
                "action": status.action(),
                "path": path.display().to_string(),
            });
            self.json_event(&event);
        } else {
            self.status(status, display);
        }
    }

    /// Print a JSON event to stdout.
    ///
    /// Only works in JSON mode; silently ignored in human mode.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.is_json() {
            return;
        }

        let json_str = serde_json::to_string(event).unwrap_or_default();
        self.emit(json_str, true);
    }

    fn emit(&self, line: String, stdout: bool) {
        match &self.sink {
            Sink::Memory(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
            }
            Sink::Stderr if stdout => {
                println!("{}", line);
                let _ = io::stdout().flush();
            }
            Sink::Stderr => eprintln!("{}", line),
        }
        self.has_output.store(true, Ordering::SeqCst);
    }

    /// Format a status prefix with optional color.
    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();

        if self.use_color {
            format!("{}{:>width$}\x1b[0m", status.color_code(), text, width = STATUS_WIDTH)
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Create a scoped span for timing operations.
    ///
    /// The start message is only printed if the operation takes longer than
    /// the delay; the end message is printed on drop unless quiet.
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        Span::new(Arc::clone(self), status, msg.to_string())
    }

    /// Create a progress bar.
    ///
    /// In quiet or verbose mode, returns a no-op progress bar.
    /// In JSON mode, progress updates are emitted as JSON events.
    pub fn progress(self: &Arc<Self>, total: u64, msg: impl Display) -> Progress {
        Progress::new(Arc::clone(self), total, msg.to_string())
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// A scoped timing span with delayed start output.
pub struct Span {
    shell: Arc<Shell>,
    status: Status,
    message: String,
    start: Instant,
    start_printed: bool,
    delay: Duration,
    finished: bool,
}

impl Span {
    /// Default delay before printing start message.
    const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    fn new(shell: Arc<Shell>, status: Status, message: String) -> Self {
        let start_printed = shell.is_verbose();

        // In verbose mode, print start immediately
        if start_printed {
            shell.status(status, &message);
        }

        Span {
            shell,
            status,
            message,
            start: Instant::now(),
            start_printed,
            delay: Self::DEFAULT_DELAY,
            finished: false,
        }
    }

    /// Print the start message once the delay has passed.
    pub fn maybe_print_start(&mut self) {
        if !self.start_printed && self.start.elapsed() > self.delay {
            if !self.shell.is_quiet() && !self.shell.is_json() {
                self.shell.status(self.status, &self.message);
            }
            self.start_printed = true;
        }
    }

    /// Mark the span as finished with a custom message.
    pub fn finish_with_message(mut self, msg: impl Display) {
        self.finished = true;

        if !self.shell.is_quiet() && !self.shell.is_json() {
            let duration_str = format_duration(self.start.elapsed());
            self.shell
                .status(Status::Finished, format!("{} in {}", msg, duration_str));
        }
    }

    /// Get elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.finished || self.shell.is_quiet() || self.shell.is_json() {
            return;
        }

        let elapsed = self.start.elapsed();
        if self.start_printed || elapsed > Self::DEFAULT_DELAY {
            self.shell
                .status(Status::Finished, format!("in {}", format_duration(elapsed)));
        }
    }
}

/// Progress bar wrapper that respects shell mode.
pub struct Progress {
    shell: Arc<Shell>,
    pb: Option<ProgressBar>,
    total: u64,
    current: u64,
    message: String,
}

impl Progress {
    fn new(shell: Arc<Shell>, total: u64, message: String) -> Self {
        let pb = if shell.is_quiet() || shell.is_verbose() || shell.is_json() {
            None
        } else if total > 1 && io::stderr().is_terminal() {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb.set_message(message.clone());
            Some(pb)
        } else {
            None
        };

        Progress {
            shell,
            pb,
            total,
            current: 0,
            message,
        }
    }

    /// Advance the progress by `delta`.
    pub fn inc(&mut self, delta: u64) {
        self.current += delta;

        if let Some(pb) = &self.pb {
            pb.inc(delta);
        }

        if self.shell.is_json() {
            let event = serde_json::json!({
                "reason": "progress",
                "current": self.current,
                "total": self.total,
                "message": self.message
            });
            self.shell.json_event(&event);
        }
    }

    /// Finish the progress bar.
    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }

    /// Get the current position.
    pub fn position(&self) -> u64 {
        self.current
    }

    /// Get the total.
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
