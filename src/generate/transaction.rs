//! Nested, idempotent file transactions.
//!
//! A [`FileSynthesizer`] owns a stack of transaction frames. Generators open a
//! [`Transaction`], queue writes and deletes, and commit. Committing the
//! outermost frame executes the queued operations against the filesystem;
//! committing a nested frame moves its operations into the parent instead, so
//! many small generator transactions compose into one outer pass.
//!
//! Writes are skipped when the file already holds the same text (ignoring
//! `\r`), which keeps regenerated trees free of churn. A delete is an
//! assertion that a file should not exist and is a no-op when it does not.
//!
//! The frame stack lives in a `RefCell`, so a synthesizer is `!Sync`: each
//! thread that generates files owns its own instance.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::util::fs::relative_path;
use crate::util::shell::{Shell, Status};

/// Filesystem step that failed during a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Read,
    CreateDir,
    Write,
    Delete,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileAction::Read => "read",
            FileAction::CreateDir => "create parent directory of",
            FileAction::Write => "write",
            FileAction::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Error raised while committing a transaction.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("failed to {action} {}", .path.display())]
    Io {
        action: FileAction,
        path: PathBuf,
        source: io::Error,
    },

    #[error("transaction at depth {depth} was already closed by an enclosing commit")]
    FrameClosed { depth: usize },
}

/// A pending write or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFileOperation {
    path: PathBuf,
    /// `None` means the file must not exist
    content: Option<String>,
    idempotent: bool,
    silent: bool,
}

impl TextFileOperation {
    /// Materialize `content` at `path`.
    pub fn write(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        TextFileOperation {
            path: path.into(),
            content: Some(content.into()),
            idempotent: true,
            silent: false,
        }
    }

    /// Ensure `path` does not exist.
    pub fn delete(path: impl Into<PathBuf>) -> Self {
        TextFileOperation {
            path: path.into(),
            content: None,
            idempotent: true,
            silent: false,
        }
    }

    /// Suppress the status line for this operation.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Write even when the content is unchanged.
    pub fn forced(mut self) -> Self {
        self.idempotent = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn is_delete(&self) -> bool {
        self.content.is_none()
    }
}

/// Outcome counts of a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Writes skipped because the content already matched
    pub unchanged: usize,
    /// Operations handed to the enclosing transaction
    pub deferred: usize,
}

impl CommitReport {
    /// Number of files touched on disk.
    pub fn changed(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn merge(&mut self, other: CommitReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.deferred += other.deferred;
    }
}

/// Operations of one open transaction.
#[derive(Debug, Default)]
struct Frame {
    /// Unique per synthesizer, so a stale handle never matches a reopened frame
    id: u64,
    operations: Vec<TextFileOperation>,
    pending_writes: BTreeSet<PathBuf>,
    pending_deletes: BTreeSet<PathBuf>,
}

impl Frame {
    fn push(&mut self, op: TextFileOperation) {
        if op.is_delete() {
            self.pending_writes.remove(&op.path);
            self.pending_deletes.insert(op.path.clone());
        } else {
            self.pending_deletes.remove(&op.path);
            self.pending_writes.insert(op.path.clone());
        }
        self.operations.push(op);
    }

    /// Pending state of `path`: `Some(true)` for a write, `Some(false)` for a delete.
    fn pending(&self, path: &Path) -> Option<bool> {
        if self.pending_deletes.contains(path) {
            Some(false)
        } else if self.pending_writes.contains(path) {
            Some(true)
        } else {
            None
        }
    }
}

/// Context object holding the transaction frame stack.
#[derive(Debug)]
pub struct FileSynthesizer<'s> {
    shell: &'s Shell,
    /// Status lines show paths relative to this directory
    display_root: Option<PathBuf>,
    frames: RefCell<Vec<Frame>>,
    next_id: Cell<u64>,
}

impl<'s> FileSynthesizer<'s> {
    pub fn new(shell: &'s Shell) -> Self {
        FileSynthesizer {
            shell,
            display_root: None,
            frames: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Show paths relative to `root` in status lines.
    pub fn with_display_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.display_root = Some(root.into());
        self
    }

    /// Open a transaction nested in whatever is currently open.
    pub fn open(&self) -> Transaction<'_, 's> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let mut frames = self.frames.borrow_mut();
        frames.push(Frame {
            id,
            ..Frame::default()
        });
        let depth = frames.len() - 1;
        tracing::trace!(depth, id, "opened transaction");
        Transaction {
            synthesizer: self,
            depth,
            id,
            closed: false,
        }
    }

    /// Number of open transactions.
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Whether `path` will exist once the open transactions commit.
    ///
    /// Pending operations win over the filesystem, innermost frame first.
    pub fn file_exists(&self, path: &Path) -> bool {
        let frames = self.frames.borrow();
        frames
            .iter()
            .rev()
            .find_map(|frame| frame.pending(path))
            .unwrap_or_else(|| path.is_file())
    }

    fn execute(&self, op: &TextFileOperation, report: &mut CommitReport) -> Result<(), SynthesisError> {
        let io_err = |action, source| SynthesisError::Io {
            action,
            path: op.path.clone(),
            source,
        };

        let Some(content) = &op.content else {
            match fs::remove_file(&op.path) {
                Ok(()) => {
                    report.deleted += 1;
                    self.report(op, Status::Deleted);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(FileAction::Delete, e)),
            }
            return Ok(());
        };

        let existing = match fs::read(&op.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(io_err(FileAction::Read, e)),
        };

        if op.idempotent
            && existing
                .as_deref()
                .is_some_and(|old| same_text(old, content.as_bytes()))
        {
            tracing::trace!(path = %op.path.display(), "unchanged");
            report.unchanged += 1;
            return Ok(());
        }

        if let Some(parent) = op.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(FileAction::CreateDir, e))?;
        }
        fs::write(&op.path, content).map_err(|e| io_err(FileAction::Write, e))?;

        if existing.is_some() {
            report.updated += 1;
            self.report(op, Status::Updated);
        } else {
            report.created += 1;
            self.report(op, Status::Created);
        }
        Ok(())
    }

    fn report(&self, op: &TextFileOperation, status: Status) {
        tracing::debug!(path = %op.path.display(), ?status, "file operation");
        if op.silent {
            return;
        }
        let shown = match &self.display_root {
            Some(root) => relative_path(root, &op.path),
            None => op.path.clone(),
        };
        self.shell.file_event(status, &op.path, shown.display());
    }
}

/// Text equality ignoring carriage returns.
fn same_text(a: &[u8], b: &[u8]) -> bool {
    let strip = |bytes: &[u8]| bytes.iter().copied().filter(|&c| c != b'\r').collect::<Vec<_>>();
    if !a.contains(&b'\r') && !b.contains(&b'\r') {
        return a == b;
    }
    strip(a) == strip(b)
}

/// An open transaction frame.
///
/// Dropping a transaction without committing discards its operations.
#[must_use = "a transaction does nothing unless committed"]
pub struct Transaction<'a, 's> {
    synthesizer: &'a FileSynthesizer<'s>,
    depth: usize,
    id: u64,
    closed: bool,
}

impl<'a, 's> Transaction<'a, 's> {
    /// Nesting depth; 0 for the outermost transaction.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether this transaction's frame is still on the stack.
    fn is_open(&self, frames: &[Frame]) -> bool {
        frames.get(self.depth).is_some_and(|f| f.id == self.id)
    }

    /// Queue an operation.
    ///
    /// Operations added after an enclosing commit closed this transaction
    /// are dropped with a warning.
    pub fn add(&self, op: TextFileOperation) {
        let mut frames = self.synthesizer.frames.borrow_mut();
        match frames.get_mut(self.depth).filter(|f| f.id == self.id) {
            Some(frame) => frame.push(op),
            None => tracing::warn!(depth = self.depth, path = %op.path.display(), "dropping operation on closed transaction"),
        }
    }

    /// Queue a write.
    pub fn write(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.add(TextFileOperation::write(path, content));
    }

    /// Queue a delete.
    pub fn delete(&self, path: impl Into<PathBuf>) {
        self.add(TextFileOperation::delete(path));
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.synthesizer
            .frames
            .borrow()
            .get(self.depth)
            .filter(|f| f.id == self.id)
            .map_or(0, |f| f.operations.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commit and close the transaction.
    ///
    /// Any transactions still open inside this one are discarded. Operations
    /// execute in queue order; a failure leaves earlier operations applied.
    pub fn commit(mut self) -> Result<CommitReport, SynthesisError> {
        self.closed = true;

        let frame = {
            let mut frames = self.synthesizer.frames.borrow_mut();
            if !self.is_open(&frames) {
                return Err(SynthesisError::FrameClosed { depth: self.depth });
            }
            frames.truncate(self.depth + 1);
            let frame = frames.pop().unwrap_or_default();

            if let Some(parent) = frames.last_mut() {
                let deferred = frame.operations.len();
                for op in frame.operations {
                    parent.push(op);
                }
                tracing::trace!(depth = self.depth, deferred, "merged into enclosing transaction");
                return Ok(CommitReport {
                    deferred,
                    ..CommitReport::default()
                });
            }
            frame
        };

        let mut report = CommitReport::default();
        for op in &frame.operations {
            self.synthesizer.execute(op, &mut report)?;
        }
        tracing::debug!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            unchanged = report.unchanged,
            "committed transaction"
        );
        Ok(report)
    }
}

impl Drop for Transaction<'_, '_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Ok(mut frames) = self.synthesizer.frames.try_borrow_mut() {
            if self.is_open(&frames) {
                tracing::trace!(depth = self.depth, "discarding uncommitted transaction");
                frames.truncate(self.depth);
            }
        }
    }
}
