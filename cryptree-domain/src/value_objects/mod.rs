// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects: immutable, self-validating types with no identity.

mod data_key;
mod key_group;
mod master_key_descriptor;
mod scope_selector;
mod tree_key;
mod tree_path;
mod tree_value;

pub use data_key::DataKey;
pub use key_group::KeyGroup;
pub use master_key_descriptor::MasterKeyDescriptor;
pub use scope_selector::ScopeSelector;
pub use tree_key::TreeKey;
pub use tree_path::{PathComponent, TreePath};
pub use tree_value::TreeValue;
