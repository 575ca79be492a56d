//! One-line status reports.
//!
//! Every patch produces exactly one stdout line. Callers that need to tell
//! success from failure parse the leading `SUCCESS:` / `ERROR:` tag.

use crate::config::{ApplicationError, PatchDefinition, PatchResult};
use crate::splice::SpliceError;
use colored::{ColoredString, Colorize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    DryRun,
    Skipped,
    Error,
}

impl Status {
    fn tag(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::DryRun => "DRY RUN",
            Status::Skipped => "SKIPPED",
            Status::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub status: Status,
    pub message: String,
}

impl StatusLine {
    /// Build the line for one patch outcome.
    ///
    /// `qualify` prefixes the patch id, for sets holding more than one patch.
    pub fn for_outcome(
        patch: &PatchDefinition,
        result: &Result<PatchResult, ApplicationError>,
        qualify: bool,
    ) -> Self {
        let (status, message) = match result {
            Ok(PatchResult::Applied { .. }) => (Status::Success, patch.summary()),
            Ok(outcome @ PatchResult::WouldApply { .. }) => {
                (Status::DryRun, format!("{} ({})", patch.summary(), outcome))
            }
            Ok(PatchResult::SkippedVersion { reason }) => (Status::Skipped, reason.clone()),
            Err(e) => (Status::Error, error_message(e)),
        };

        let message = if qualify {
            format!("{}: {}", patch.id, message)
        } else {
            message
        };

        Self { status, message }
    }

    pub fn is_failure(&self) -> bool {
        self.status == Status::Error
    }

    /// The line with a coloured tag, for terminals.
    pub fn render(&self) -> String {
        let tag: ColoredString = match self.status {
            Status::Success => self.status.tag().green().bold(),
            Status::DryRun => self.status.tag().cyan().bold(),
            Status::Skipped => self.status.tag().yellow().bold(),
            Status::Error => self.status.tag().red().bold(),
        };
        format!("{}: {}", tag, self.message)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.tag(), self.message)
    }
}

fn error_message(error: &ApplicationError) -> String {
    match error {
        ApplicationError::Splice { source, .. } => match source {
            SpliceError::StartMarkerMissing { .. } | SpliceError::GuardMarkerMissing { .. } => {
                "Target patterns not found - file may already be patched".to_string()
            }
            SpliceError::TriggerMarkerMissing { marker, .. } => {
                format!("Could not find {}", call_name(marker))
            }
            SpliceError::ClosingTokenMissing { token, .. } => {
                format!("Could not find function end {token}")
            }
        },
        ApplicationError::Io { path, source } => {
            format!("Could not read {}: {}", path.display(), source)
        }
        other => other.to_string(),
    }
}

/// `triggerRevalidation();` is reported as `triggerRevalidation`.
fn call_name(marker: &str) -> &str {
    let name = marker.trim_end().trim_end_matches(';').trim_end();
    name.strip_suffix("()").unwrap_or(name)
}
