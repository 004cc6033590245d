// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classify testcase results and report them to a host test framework.
//!
//! [`ReportValidator`] reads a directory of reports, drops duplicate results
//! and hands each remaining result to a classifier. Every result becomes an
//! [`Outcome`]; results that failed, were blocked or timed out are reported to
//! the [`OutcomeHost`] along with the [`SourceLocation`] of the testcase.

mod aggregator;
mod classify;
mod host;
mod location;
mod outcome;

pub use aggregator::*;
pub(crate) use classify::*;
pub use host::*;
pub use location::*;
pub use outcome::*;
