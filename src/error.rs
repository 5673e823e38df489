//! Structured error handling and exit codes.

use serde::Serialize;

use crate::duplicates::DetectError;
use crate::scanner::WalkError;

/// Exit codes for the dupetree application.
///
/// - 0: Success (completed normally, redundant directories found)
/// - 1: General error (unexpected failure)
/// - 2: No redundancy found (completed normally, nothing to report)
/// - 3: Partial success (completed, but some subtrees were skipped)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Scan completed and redundant directories were found.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No redundancy: Scan completed but no pair shares content.
    NoRedundancy = 2,
    /// Partial success: Scan completed but skipped unreadable subtrees.
    PartialSuccess = 3,
    /// Interrupted: Scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DT000",
            Self::GeneralError => "DT001",
            Self::NoRedundancy => "DT002",
            Self::PartialSuccess => "DT003",
            Self::Interrupted => "DT130",
        }
    }

    /// Exit code for an error that escaped [`crate::run_app`].
    ///
    /// Interruptions of the walker or the detector anywhere in the error
    /// chain map to [`ExitCode::Interrupted`]; everything else is a general
    /// error.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let interrupted = err.chain().any(|cause| {
            matches!(cause.downcast_ref::<WalkError>(), Some(WalkError::Interrupted))
                || matches!(
                    cause.downcast_ref::<DetectError>(),
                    Some(DetectError::Interrupted)
                )
        });
        if interrupted {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DT001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
