// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bidirectional bytes <-> tree format stores.

pub mod binary;
pub mod dotenv;
pub mod ini;
pub mod json;
pub mod metadata_wire;
pub mod yaml;

pub use binary::BinaryStore;
pub use dotenv::DotenvStore;
pub use ini::IniStore;
pub use json::JsonStore;
pub use yaml::YamlStore;
