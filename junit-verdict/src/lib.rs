// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Turn JUnit XML reports into outcomes for a host test framework.
//!
//! Reports are read with [`junit_reader`]. Each testcase is classified as one
//! of [`Outcome`]'s variants, and anything that didn't pass or get skipped is
//! reported to an [`OutcomeHost`] with a reason and the location of the
//! testcase's source. How reports are interpreted is controlled by
//! [`ReportProfile`]s read from `.config/junit-verdict.toml`.
//!
//! ```no_run
//! use camino::Utf8Path;
//! use junit_verdict::{RecordingHost, ReportConfig, ReportValidator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReportConfig::from_sources("/path/to/project", None)?;
//! let profile = config.profile(ReportConfig::DEFAULT_PROFILE)?;
//!
//! let mut host = RecordingHost::new();
//! let summary = ReportValidator::new(&profile, "/path/to/project/src/test/java", &mut host)
//!     .validate_reports(Utf8Path::new("/path/to/project/junit-reports"))?;
//! println!("{}", summary.counts);
//! for outcome in host.outcomes() {
//!     println!("{}: {}", outcome.outcome, outcome.reason);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
mod helpers;
pub mod validate;

pub use config::{ReportConfig, ReportProfile};
pub use validate::{
    HostOutcome, Outcome, OutcomeCounts, OutcomeHost, RecordingHost, ReportValidator,
    SourceFile, SourceLocation, SourceLocator, ValidationSummary,
};
