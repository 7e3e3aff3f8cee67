// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and handles argument parsing.
//! Security validation happens in the validator module after parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "cryptree")]
#[command(about = concat!("Structural secrets-file encryption v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Passphrase for the local master-key backend (falls back to
    /// `CRYPTREE_PASSPHRASE` if omitted)
    #[arg(long, global = true, env = "CRYPTREE_PASSPHRASE")]
    pub passphrase: Option<String>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Encrypt every in-scope leaf of a document in place
    Encrypt {
        /// Document to encrypt (format auto-detected by extension)
        file: PathBuf,

        /// Write the result to a different path instead of overwriting
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Creation-rule file (key groups, threshold, scope selector) for a
        /// brand-new document
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Decrypt every ciphertext leaf of a document and verify its MAC
    Decrypt {
        /// Document to decrypt
        file: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-roll a document's data key and re-encrypt every leaf under it
    Rotate {
        /// Document to rotate
        file: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile a document's master keys without rotating its data key
    UpdateKeys {
        /// Document whose key groups should be replaced
        file: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Creation-rule file describing the new key groups and threshold
        #[arg(long)]
        rules: PathBuf,
    },

    /// Write a value at a dot-addressed path
    Set {
        /// Document to modify
        file: PathBuf,

        /// Dot-joined path, e.g. `database.password`
        path: String,

        /// Value to write (parsed as a string)
        value: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove the value at a dot-addressed path
    Unset {
        /// Document to modify
        file: PathBuf,

        /// Dot-joined path, e.g. `tags.0`
        path: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read the value at a dot-addressed path (or the whole document)
    Extract {
        /// Document to read
        file: PathBuf,

        /// Dot-joined path; omit to extract the whole document
        #[arg(default_value = "")]
        path: String,
    },
}

/// Parse CLI arguments
///
/// # Panics
///
/// Clap will exit the process with appropriate error message if parsing fails
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encrypt_with_rules() {
        let cli = Cli::parse_from(["cryptree", "encrypt", "secrets.yaml", "--rules", "rules.yaml"]);
        match cli.command {
            Commands::Encrypt { file, rules, .. } => {
                assert_eq!(file, PathBuf::from("secrets.yaml"));
                assert_eq!(rules, Some(PathBuf::from("rules.yaml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_set_with_positional_path_and_value() {
        let cli = Cli::parse_from(["cryptree", "set", "secrets.yaml", "database.password", "hunter2"]);
        match cli.command {
            Commands::Set { path, value, .. } => {
                assert_eq!(path, "database.password");
                assert_eq!(value, "hunter2");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
