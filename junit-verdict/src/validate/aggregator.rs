// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{HostOutcome, Outcome, OutcomeCounts, OutcomeHost, SourceLocator, TestcaseReporter};
use crate::{config::ReportProfile, errors::ValidateReportsError, helpers::plural};
use camino::{Utf8Path, Utf8PathBuf};
use junit_reader::JunitXmlParser;
use std::collections::HashSet;
use tracing::{debug, info};

const SEPARATOR_WIDTH: usize = 63;

/// What a call to [`ReportValidator::validate_reports`] found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// The number of distinct testcases with each outcome.
    pub counts: OutcomeCounts,

    /// The number of suites whose results were read. Suites with no tests aren't counted.
    pub suites: usize,

    /// The number of results that were ignored because an earlier result had
    /// the same classname and name.
    pub duplicates: usize,
}

/// Reads every report in a directory and reports the outcome of each testcase
/// to an [`OutcomeHost`].
///
/// Reports are read in file name order. A testcase is identified by its
/// classname and name, and only its first result in the directory counts.
#[derive(Debug)]
pub struct ReportValidator<H> {
    parser: JunitXmlParser,
    reporter: TestcaseReporter,
    genre: String,
    report_extension: String,
    custom_selection: bool,
    host: H,
}

impl<H: OutcomeHost> ReportValidator<H> {
    /// Creates a new validator.
    ///
    /// Test source files are looked up under `input_dir`. To keep ownership of
    /// the host, pass `&mut host`.
    pub fn new(profile: &ReportProfile, input_dir: impl Into<Utf8PathBuf>, host: H) -> Self {
        Self {
            parser: JunitXmlParser::new(profile.parser_options()),
            reporter: TestcaseReporter::new(
                profile.genre(),
                SourceLocator::new(input_dir, profile.source_suffix()),
            ),
            genre: profile.genre().to_owned(),
            report_extension: profile.report_extension().to_owned(),
            custom_selection: profile.custom_selection(),
            host,
        }
    }

    /// Overrides whether the tests were run with custom selection arguments.
    pub fn set_custom_selection(&mut self, custom_selection: bool) -> &mut Self {
        self.custom_selection = custom_selection;
        self
    }

    /// Returns the host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Consumes the validator, returning the host.
    pub fn into_host(self) -> H {
        self.host
    }

    /// Reads the reports in `reports_dir`, reporting outcomes to the host.
    ///
    /// Passing and skipped testcases aren't reported individually. If no
    /// testcases were found, or all of them were skipped, a single outcome is
    /// reported for the whole directory.
    pub fn validate_reports(
        &mut self,
        reports_dir: &Utf8Path,
    ) -> Result<ValidationSummary, ValidateReportsError> {
        let mut summary = ValidationSummary::default();
        let mut seen = HashSet::new();
        let mut last_reason = None;

        for report_path in self.report_paths(reports_dir)? {
            let (suite, results) = self.parser.parse(&report_path)?.into_parts();
            if suite.tests == 0 && suite.skipped_count() == 0 {
                debug!("ignoring suite \"{}\" which contains no tests", suite.name);
                continue;
            }

            if summary.suites > 0 {
                info!("");
                info!("{}", "~".repeat(SEPARATOR_WIDTH));
            }
            summary.suites += 1;

            info!(
                "Results for {} {} from suite \"{}\":",
                suite.tests,
                plural::testcases_str(suite.tests),
                suite.name,
            );
            info!("");

            for result in results {
                let key = (result.classname.clone(), result.name.clone());
                if seen.contains(&key) {
                    info!(
                        "ignoring duplicate results for {}.{}",
                        result.classname, result.name
                    );
                    summary.duplicates += 1;
                    continue;
                }

                let outcome = self.reporter.report(&result, &mut self.host)?;
                summary.counts.add(outcome);
                last_reason = result.outcome_reason;
                seen.insert(key);
            }

            // Some dialects only record output for the whole suite.
            if suite.has_output() {
                info!("This testsuite produced some stdout/err, see it at: {report_path}");
            }
        }

        info!("{}", "~".repeat(SEPARATOR_WIDTH));
        let counts = summary.counts;
        if counts.total() == 0 {
            let outcome = if self.custom_selection {
                HostOutcome {
                    outcome: Outcome::Skipped,
                    reason: "No tests were found (likely the result of the custom test selection)"
                        .to_owned(),
                    location: None,
                }
            } else {
                HostOutcome {
                    outcome: Outcome::Blocked,
                    reason: "No tests were found".to_owned(),
                    location: None,
                }
            };
            self.host.add_outcome(outcome);
        } else if counts.all_skipped() {
            let reason = last_reason
                .filter(|reason| !reason.is_empty())
                .unwrap_or_else(|| "<no reason>".to_owned());
            self.host.add_outcome(HostOutcome {
                outcome: Outcome::Skipped,
                reason: format!(
                    "All {} {} tests are skipped: {reason}",
                    counts.skipped, self.genre,
                ),
                location: None,
            });
        } else {
            info!("Summary of all testcase outcomes: {counts}");
        }

        Ok(summary)
    }

    /// Returns the reports in `reports_dir`, sorted by file name.
    fn report_paths(
        &self,
        reports_dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, ValidateReportsError> {
        let read_dir_error = |error| ValidateReportsError::ReadDir {
            dir: reports_dir.to_owned(),
            error,
        };
        let suffix = format!(".{}", self.report_extension);

        let mut paths = Vec::new();
        for entry in reports_dir.read_dir_utf8().map_err(read_dir_error)? {
            let entry = entry.map_err(read_dir_error)?;
            if entry.file_name().ends_with(&suffix) {
                paths.push(entry.into_path());
            }
        }
        paths.sort_unstable();

        debug!(
            "found {} {} in {reports_dir}",
            paths.len(),
            if paths.len() == 1 { "report" } else { "reports" },
        );
        Ok(paths)
    }
}
