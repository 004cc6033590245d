// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Read JUnit XML reports in Rust.
//!
//! Reports written by the JUnit 5 console launcher, by Ant's JUnit task and by
//! other JUnit 4 runners share a common shape but disagree on details: whether
//! captured output is recorded per testcase or per suite, which timezone the
//! `timestamp` attribute is in, and whether skipped tests count towards
//! `tests`. [`JunitXmlParser`] reads any of these dialects in a single forward
//! pass and returns a [`ParsedReport`].

mod errors;
mod parse;
mod report;

pub use errors::*;
pub use parse::*;
pub use report::*;
