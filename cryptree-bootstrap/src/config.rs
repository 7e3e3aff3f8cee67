// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Configuration
//!
//! Bootstrap-phase configuration structure.
//!
//! `AppConfig` holds **validated** configuration after command-line parsing
//! and security validation. It is immutable once built, so it can be shared
//! freely across the async tasks the CLI commands spawn.
//!
//! ```rust
//! use cryptree_bootstrap::config::{AppConfig, LogLevel};
//! use std::path::PathBuf;
//!
//! let config = AppConfig::builder()
//!     .app_name("cryptree")
//!     .log_level(LogLevel::Info)
//!     .input_path(PathBuf::from("/path/to/secrets.yaml"))
//!     .build();
//!
//! println!("Running: {}", config.app_name());
//! ```

use std::path::PathBuf;

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors (default)
    #[default]
    Info,
    /// All messages including debug
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Application configuration.
///
/// Immutable configuration structure holding all bootstrap-phase settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    app_name: String,
    log_level: LogLevel,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    verbose: bool,
    dry_run: bool,
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input_path.as_ref()
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        self.output_path.as_ref()
    }

    /// The rule file describing key groups, threshold, and scope selector
    /// for a brand-new document (`--rules` on `encrypt`/`updatekeys`).
    pub fn rules_path(&self) -> Option<&PathBuf> {
        self.rules_path.as_ref()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    app_name: Option<String>,
    log_level: Option<LogLevel>,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    verbose: bool,
    dry_run: bool,
}

impl AppConfigBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// # Panics
    /// Panics if `app_name` was not set.
    pub fn build(self) -> AppConfig {
        self.try_build().expect("app_name is required")
    }

    pub fn try_build(self) -> Result<AppConfig, String> {
        Ok(AppConfig {
            app_name: self.app_name.ok_or("app_name is required")?,
            log_level: self.log_level.unwrap_or_default(),
            input_path: self.input_path,
            output_path: self.output_path,
            rules_path: self.rules_path,
            verbose: self.verbose,
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_minimal_applies_defaults() {
        let config = AppConfig::builder().app_name("test-app").build();

        assert_eq!(config.app_name(), "test-app");
        assert_eq!(config.log_level(), LogLevel::Info);
        assert!(config.input_path().is_none());
        assert!(config.rules_path().is_none());
        assert!(!config.is_verbose());
        assert!(!config.is_dry_run());
    }

    #[test]
    fn builder_full_round_trips_every_field() {
        let config = AppConfig::builder()
            .app_name("full-app")
            .log_level(LogLevel::Debug)
            .input_path("/input.yaml")
            .output_path("/output.yaml")
            .rules_path("/rules.yaml")
            .verbose(true)
            .dry_run(true)
            .build();

        assert_eq!(config.log_level(), LogLevel::Debug);
        assert_eq!(config.input_path(), Some(&PathBuf::from("/input.yaml")));
        assert_eq!(config.output_path(), Some(&PathBuf::from("/output.yaml")));
        assert_eq!(config.rules_path(), Some(&PathBuf::from("/rules.yaml")));
        assert!(config.is_verbose());
        assert!(config.is_dry_run());
    }

    #[test]
    fn try_build_without_app_name_fails() {
        let result = AppConfig::builder().try_build();
        assert_eq!(result.unwrap_err(), "app_name is required");
    }

    #[test]
    fn log_level_maps_to_tracing() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
