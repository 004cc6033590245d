// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration profiles.
//!
//! Profiles are read from `.config/junit-verdict.toml`. Each custom profile
//! falls back to `[profile.default]` for any setting it doesn't define, and
//! `[profile.default]` falls back to the built-in defaults.

mod imp;

pub use imp::*;
