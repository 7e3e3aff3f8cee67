// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse_cli()             │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_cli()                  │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration.
///
/// All file paths that must already exist have been canonicalized; output
/// paths and rule files are only pattern-checked since they may not exist
/// yet.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub passphrase: String,
}

/// Validated command variants, mirroring [`Commands`] with every path
/// checked.
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Encrypt {
        file: PathBuf,
        output: Option<PathBuf>,
        rules: Option<PathBuf>,
    },
    Decrypt {
        file: PathBuf,
        output: Option<PathBuf>,
    },
    Rotate {
        file: PathBuf,
        output: Option<PathBuf>,
    },
    UpdateKeys {
        file: PathBuf,
        output: Option<PathBuf>,
        rules: PathBuf,
    },
    Set {
        file: PathBuf,
        path: String,
        value: String,
        output: Option<PathBuf>,
    },
    Unset {
        file: PathBuf,
        path: String,
        output: Option<PathBuf>,
    },
    Extract {
        file: PathBuf,
        path: String,
    },
}

/// Parse and validate CLI arguments: clap parsing followed by security
/// validation of every path and string argument.
///
/// # Errors
///
/// Returns `ParseError` if any validation fails.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let passphrase = cli.passphrase.ok_or_else(|| ParseError::InvalidValue {
        arg: "passphrase".to_string(),
        reason: "provide --passphrase or set CRYPTREE_PASSPHRASE".to_string(),
    })?;
    SecureArgParser::validate_argument(&passphrase)?;

    let command = match cli.command {
        Commands::Encrypt { file, output, rules } => {
            let file = SecureArgParser::validate_path(&file.to_string_lossy())?;
            SecureArgParser::validate_output_path(output.as_deref())?;
            let rules = rules.map(|r| SecureArgParser::validate_path(&r.to_string_lossy())).transpose()?;
            ValidatedCommand::Encrypt { file, output, rules }
        }
        Commands::Decrypt { file, output } => {
            let file = SecureArgParser::validate_path(&file.to_string_lossy())?;
            SecureArgParser::validate_output_path(output.as_deref())?;
            ValidatedCommand::Decrypt { file, output }
        }
        Commands::Rotate { file, output } => {
            let file = SecureArgParser::validate_path(&file.to_string_lossy())?;
            SecureArgParser::validate_output_path(output.as_deref())?;
            ValidatedCommand::Rotate { file, output }
        }
        Commands::UpdateKeys { file, output, rules } => {
            let file = SecureArgParser::validate_path(&file.to_string_lossy())?;
            SecureArgParser::validate_output_path(output.as_deref())?;
            let rules = SecureArgParser::validate_path(&rules.to_string_lossy())?;
            ValidatedCommand::UpdateKeys { file, output, rules }
        }
        Commands::Set { file, path, value, output } => {
            let file = SecureArgParser::validate_path(&file.to_string_lossy())?;
            SecureArgParser::validate_argument(&path)?;
            SecureArgParser::validate_output_path(output.as_deref())?;
            ValidatedCommand::Set { file, path, value, output }
        }
        Commands::Unset { file, path, output } => {
            let file = SecureArgParser::validate_path(&file.to_string_lossy())?;
            SecureArgParser::validate_argument(&path)?;
            SecureArgParser::validate_output_path(output.as_deref())?;
            ValidatedCommand::Unset { file, path, output }
        }
        Commands::Extract { file, path } => {
            let file = SecureArgParser::validate_path(&file.to_string_lossy())?;
            ValidatedCommand::Extract { file, path }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        passphrase,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn rejects_missing_passphrase() {
        let cli = Cli::parse_from(["cryptree", "extract", "/tmp"]);
        let err = validate_cli(cli).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_dangerous_path_argument() {
        let cli = Cli::parse_from(["cryptree", "--passphrase", "pw", "extract", "../etc/passwd"]);
        let err = validate_cli(cli).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPath(_)));
    }
}
