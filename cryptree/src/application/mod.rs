// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application layer: the use cases that drive the domain's tree walker,
//! scope predicate, MAC engine and Shamir envelope against real trees, and
//! the data-key envelope service they all share.

pub mod services;
pub mod use_cases;
