// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Structured logging for the cryptree core.
//!
//! Installs a single global `tracing` subscriber, level driven by
//! `RUST_LOG` (falling back to `info`, or `debug` under `verbose`). Use
//! cases log the tree path and error category of whatever they touch —
//! never a data key, a master key, a Shamir share, or a decrypted leaf
//! value.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Safe to call more than once per process;
/// only the first call takes effect.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
