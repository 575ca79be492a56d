//! Marker-based region location.
//!
//! A splice region starts at the first occurrence of the start marker and
//! ends right after the first closing token found inside a bounded window
//! that begins at the trigger marker following it. The window stands in for
//! "end of the enclosing function"; nothing here parses the target language,
//! and when several closing tokens fall inside the window the first one wins.

use std::ops::Range;
use thiserror::Error;
use tracing::{debug, warn};

/// Token that closes the region unless a patch overrides it.
pub const DEFAULT_CLOSING_TOKEN: &str = "};";

/// Window size, in characters, counted from the first character of the
/// trigger marker.
pub const DEFAULT_WINDOW: usize = 200;

/// Minimum normalized Levenshtein similarity for a line to be offered as a
/// hint when the start marker is missing.
const HINT_THRESHOLD: f64 = 0.6;

/// The literal markers that delimit one splice region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    /// First byte of the region.
    pub start: String,
    /// Must appear somewhere in the file; confirms the unpatched revision.
    pub guard: String,
    /// Searched for at or after `start`; the window begins here.
    pub trigger: String,
    /// Closing token; the region ends right after it.
    pub closing: String,
    /// Number of characters scanned for `closing`.
    pub window: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpliceError {
    #[error("start marker not found: {marker:?}")]
    StartMarkerMissing { marker: String },

    #[error("guard marker not found: {marker:?}")]
    GuardMarkerMissing { marker: String },

    #[error("trigger marker {marker:?} not found after byte {after}")]
    TriggerMarkerMissing { marker: String, after: usize },

    #[error("closing token {token:?} not found within {window} characters of byte {trigger}")]
    ClosingTokenMissing {
        token: String,
        window: usize,
        trigger: usize,
    },
}

impl SpliceError {
    /// True for the failures that mean "this is not the expected unpatched
    /// file" (start or guard marker absent).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SpliceError::StartMarkerMissing { .. } | SpliceError::GuardMarkerMissing { .. }
        )
    }
}

/// Byte range of a located region. `end` sits immediately after the
/// closing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceRegion {
    pub start: usize,
    pub end: usize,
}

impl SpliceRegion {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl MarkerSet {
    /// Markers with the default closing token and window.
    pub fn new(
        start: impl Into<String>,
        guard: impl Into<String>,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            guard: guard.into(),
            trigger: trigger.into(),
            closing: DEFAULT_CLOSING_TOKEN.to_string(),
            window: DEFAULT_WINDOW,
        }
    }

    pub fn with_closing(mut self, closing: impl Into<String>) -> Self {
        self.closing = closing.into();
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Locate the region to replace in `content`.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// start marker, guard marker, trigger marker after the start, closing
    /// token inside the window.
    pub fn locate(&self, content: &str) -> Result<SpliceRegion, SpliceError> {
        let Some(start) = content.find(self.start.as_str()) else {
            if let Some((line_no, line, score)) = closest_line(content, &self.start) {
                warn!(
                    line = line_no,
                    similarity = score,
                    "start marker missing; closest line is {:?}",
                    line.trim()
                );
            }
            return Err(SpliceError::StartMarkerMissing {
                marker: self.start.clone(),
            });
        };

        if !content.contains(self.guard.as_str()) {
            return Err(SpliceError::GuardMarkerMissing {
                marker: self.guard.clone(),
            });
        }

        let trigger = content[start..]
            .find(self.trigger.as_str())
            .map(|offset| start + offset)
            .ok_or_else(|| SpliceError::TriggerMarkerMissing {
                marker: self.trigger.clone(),
                after: start,
            })?;

        let window_end = char_window_end(content, trigger, self.window);
        let closing = content[trigger..window_end]
            .find(self.closing.as_str())
            .ok_or_else(|| SpliceError::ClosingTokenMissing {
                token: self.closing.clone(),
                window: self.window,
                trigger,
            })?;

        let end = trigger + closing + self.closing.len();
        debug!(start, trigger, end, "located splice region");

        Ok(SpliceRegion { start, end })
    }
}

/// Byte offset `chars` characters past `from`, clamped to the end of `content`.
fn char_window_end(content: &str, from: usize, chars: usize) -> usize {
    content[from..]
        .char_indices()
        .nth(chars)
        .map_or(content.len(), |(offset, _)| from + offset)
}

/// Build the spliced text: prefix, replacement, suffix.
pub fn splice(content: &str, region: SpliceRegion, replacement: &str) -> String {
    let mut out = String::with_capacity(content.len() - region.len() + replacement.len());
    out.push_str(&content[..region.start]);
    out.push_str(replacement);
    out.push_str(&content[region.end..]);
    out
}

/// Find the line most similar to `needle`, for "did you mean" hints.
///
/// Returns the 1-based line number, the line and its similarity score.
pub fn closest_line<'a>(content: &'a str, needle: &str) -> Option<(usize, &'a str, f64)> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }

    content
        .lines()
        .enumerate()
        .map(|(idx, line)| {
            (
                idx + 1,
                line,
                strsim::normalized_levenshtein(line.trim(), needle),
            )
        })
        .filter(|(_, _, score)| *score >= HINT_THRESHOLD)
        .max_by(|a, b| a.2.total_cmp(&b.2))
}
