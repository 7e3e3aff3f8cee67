// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secure Command-Line Argument Parsing
//!
//! Security-first argument validation, applied after clap has parsed the
//! raw arguments.
//!
//! ## Dangerous Patterns Detected
//!
//! - `..` - Path traversal
//! - `~` - Home directory expansion (security risk)
//! - `$` - Variable expansion
//! - Backticks - Command substitution
//! - `;` `&` `|` - Command chaining
//! - `>` `<` - Redirection
//! - Null bytes, newlines, carriage returns

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum single argument length
const MAX_ARG_LENGTH: usize = 1000;

/// Maximum path length
const MAX_PATH_LENGTH: usize = 4096;

/// Dangerous patterns that indicate potential attacks
const DANGEROUS_PATTERNS: &[&str] = &[
    "..", // Path traversal
    "~",  // Home directory
    "$",  // Variable expansion
    "`",  // Command substitution
    ";",  // Command chaining
    "&",  // Background/AND
    "|",  // Pipe
    ">",  // Redirect output
    "<",  // Redirect input
    "\n", // Newline
    "\r", // Carriage return
    "\0", // Null byte
];

/// Protected system directories
const PROTECTED_DIRS: &[&str] = &[
    "/etc",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/boot",
    "/sys",
    "/proc",
    "/dev",
];

/// Secure argument parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// Argument exceeds maximum length
    #[error("Argument too long (max {MAX_ARG_LENGTH} characters): {0}")]
    ArgumentTooLong(String),

    /// Dangerous pattern detected
    #[error("Dangerous pattern detected in argument: {pattern} in {arg}")]
    DangerousPattern { pattern: String, arg: String },

    /// Path too long
    #[error("Path exceeds maximum length (max {MAX_PATH_LENGTH})")]
    PathTooLong,

    /// Attempted access to protected system directory
    #[error("Access to protected system directory denied: {0}")]
    ProtectedDirectory(String),

    /// Path does not exist
    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    /// Invalid path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid argument value
    #[error("Invalid argument value for {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

/// Secure argument parser.
///
/// Stateless validation helpers applied to already-clap-parsed arguments.
pub struct SecureArgParser;

impl SecureArgParser {
    /// Validate a single argument for security issues
    pub fn validate_argument(arg: &str) -> Result<(), ParseError> {
        if arg.len() > MAX_ARG_LENGTH {
            return Err(ParseError::ArgumentTooLong(arg.chars().take(50).collect::<String>() + "..."));
        }

        for pattern in DANGEROUS_PATTERNS {
            if arg.contains(pattern) {
                return Err(ParseError::DangerousPattern {
                    pattern: pattern.to_string(),
                    arg: arg.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validate and canonicalize a path that must already exist.
    pub fn validate_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path).map_err(|e| match e {
            ParseError::ArgumentTooLong(_) => ParseError::InvalidPath(format!("Path too long: {path}")),
            ParseError::DangerousPattern { pattern, .. } => {
                ParseError::InvalidPath(format!("Path contains dangerous pattern '{pattern}': {path}"))
            }
            other => other,
        })?;

        let path_obj = Path::new(path);
        let canonical = path_obj.canonicalize().map_err(|e| {
            if !path_obj.exists() {
                ParseError::PathNotFound(path.to_string())
            } else {
                ParseError::InvalidPath(format!("{path}: {e}"))
            }
        })?;

        if canonical.to_string_lossy().len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }

        for protected in PROTECTED_DIRS {
            if canonical.starts_with(protected) {
                return Err(ParseError::ProtectedDirectory(canonical.display().to_string()));
            }
        }

        Ok(canonical)
    }

    /// Validate an optional output path, which may not exist yet.
    pub fn validate_output_path(path: Option<&Path>) -> Result<(), ParseError> {
        match path {
            Some(p) => Self::validate_argument(&p.to_string_lossy()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_safe_arguments() {
        assert!(SecureArgParser::validate_argument("safe-arg").is_ok());
        assert!(SecureArgParser::validate_argument("file.txt").is_ok());
        assert!(SecureArgParser::validate_argument("path/to/file").is_ok());
    }

    #[test]
    fn rejects_too_long_arguments() {
        let long_arg = "a".repeat(MAX_ARG_LENGTH + 1);
        assert!(matches!(SecureArgParser::validate_argument(&long_arg), Err(ParseError::ArgumentTooLong(_))));
    }

    #[test]
    fn detects_dangerous_patterns() {
        let dangerous = vec![
            "../etc/passwd",
            "~/.ssh/id_rsa",
            "$(whoami)",
            "`ls`",
            "file;rm -rf /",
            "file&background",
            "file|pipe",
            "file>output",
            "file<input",
            "file\nwith\nnewlines",
        ];

        for arg in dangerous {
            assert!(
                matches!(SecureArgParser::validate_argument(arg), Err(ParseError::DangerousPattern { .. })),
                "failed to detect dangerous pattern in: {arg}"
            );
        }
    }

    #[test]
    fn validate_path_rejects_missing_file() {
        assert!(matches!(SecureArgParser::validate_path("/no/such/path-for-cryptree-tests"), Err(ParseError::PathNotFound(_))));
    }
}
