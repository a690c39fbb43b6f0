// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for batch reports and the interactive editor.
//
// Every technical error is mapped to plain English with a clear suggestion.

use crate::error::RectifyError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Disk hiccup or similar; trying again may work.
    Transient,
    /// User must do something (pick corners, fix a setting, choose another file).
    ActionRequired,
    /// Cannot be fixed by retrying: damaged file, unsupported format.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether running the same item again could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

/// Convert a `RectifyError` into a `HumanError`.
pub fn humanize_error(err: &RectifyError) -> HumanError {
    match err {
        RectifyError::InvalidInput(detail) => HumanError {
            message: "The corner points aren't usable.".into(),
            suggestion: format!("Give exactly four corners with real coordinates. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RectifyError::InvalidConfig(detail) => HumanError {
            message: "One of the enhancement settings is out of range.".into(),
            suggestion: format!("Adjust the setting and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RectifyError::DegenerateGeometry(_) => HumanError {
            message: "Those corners don't outline a page.".into(),
            suggestion: "Place the four corners on the page edges so the outline doesn't cross itself.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RectifyError::UnsupportedFormat(detail) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!("Use a JPEG, PNG or TIFF image. (File: {detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        RectifyError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged. Try opening it in another program, or export it again as JPEG or PNG.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        RectifyError::Metadata(_) => HumanError {
            message: "The photo's embedded information couldn't be kept.".into(),
            suggestion: "The corrected image is fine, but camera details or the colour profile may be missing.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        RectifyError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Permission to read or write that file was denied.".into(),
                suggestion: "Check the file and folder permissions, or choose a different output folder.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        RectifyError::Serialization(_) => HumanError {
            message: "The settings text couldn't be read.".into(),
            suggestion: "Check the JSON for typos and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
