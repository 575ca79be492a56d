use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

/// A single byte-span replacement with before-text verification.
///
/// Splices compile down to this primitive: the located region becomes the
/// span, the region text becomes the verification, and the replacement block
/// becomes `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until apply() is called"]
pub struct Edit {
    /// Path to the file to edit
    pub file: PathBuf,
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// What we expect to find in the span before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for the replaced span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (used for large spans)
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using a hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("{file} changed since it was read: span [{byte_start}, {byte_end}) no longer matches")]
    BeforeTextMismatch {
        file: PathBuf,
        byte_start: usize,
        byte_end: usize,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in file of length {file_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        file_len: usize,
    },

    #[error("Byte range [{byte_start}, {byte_end}) splits a UTF-8 character")]
    NotCharBoundary { byte_start: usize, byte_end: usize },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Outcome of a successful edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub file: PathBuf,
    /// Bytes removed from the file
    pub removed: usize,
    /// Bytes written in their place
    pub inserted: usize,
}

impl Edit {
    /// Create a new edit, deriving the verification from `expected_before`.
    pub fn new(
        file: impl Into<PathBuf>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            file: file.into(),
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Check the span against `content` and return the current span text.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                file_len: content.len(),
            });
        }

        if !content.is_char_boundary(self.byte_start) || !content.is_char_boundary(self.byte_end)
        {
            return Err(EditError::NotCharBoundary {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            });
        }

        let current = &content[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            });
        }

        Ok(current)
    }

    /// Produce the edited text without touching the file system.
    pub fn apply_to(&self, content: &str) -> Result<String, EditError> {
        let current = self.validate(content)?;

        let mut out = String::with_capacity(content.len() - current.len() + self.new_text.len());
        out.push_str(&content[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&content[self.byte_end..]);
        Ok(out)
    }

    /// Apply this edit to the file system atomically.
    ///
    /// The file is re-read and the span re-verified right before writing, so
    /// a concurrent change to the region is refused rather than overwritten.
    /// Changes elsewhere in the file between that read and the rename are
    /// still lost; the file is not locked.
    pub fn apply(&self) -> Result<EditOutcome, EditError> {
        let original = fs::read(&self.file)?;
        let content = std::str::from_utf8(&original)?;

        let updated = self.apply_to(content)?;
        debug!(
            file = %self.file.display(),
            before = content.len(),
            after = updated.len(),
            "writing spliced content"
        );

        atomic_write(&self.file, updated.as_bytes())?;

        let outcome = EditOutcome {
            file: self.file.clone(),
            removed: self.byte_end - self.byte_start,
            inserted: self.new_text.len(),
        };
        info!(
            file = %outcome.file.display(),
            removed = outcome.removed,
            inserted = outcome.inserted,
            "edit applied"
        );
        Ok(outcome)
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full content lands or the original file is left in place. The
/// original file's permissions carry over to the replacement.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(EditError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            )))
        }
    };

    let permissions = fs::metadata(path)?.permissions();

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.as_file().set_permissions(permissions)?;

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
