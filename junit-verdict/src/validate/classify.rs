// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{HostOutcome, Outcome, OutcomeHost, SourceFile, SourceLocator};
use crate::{errors::ValidateReportsError, helpers::indent_block};
use junit_reader::TestcaseResult;
use tracing::info;

/// Logs at debug level for passing testcases and at info level otherwise.
macro_rules! detail {
    ($passed:expr, $($arg:tt)+) => {
        if $passed {
            tracing::debug!($($arg)+)
        } else {
            tracing::info!($($arg)+)
        }
    };
}

/// Classifies testcases one at a time and reports them to an [`OutcomeHost`].
#[derive(Clone, Debug)]
pub(crate) struct TestcaseReporter {
    genre: String,
    locator: SourceLocator,
}

impl TestcaseReporter {
    pub(crate) fn new(genre: impl Into<String>, locator: SourceLocator) -> Self {
        Self {
            genre: genre.into(),
            locator,
        }
    }

    /// Classifies `result`, logs it and reports it to `host` if it didn't pass
    /// or get skipped.
    pub(crate) fn report(
        &mut self,
        result: &TestcaseResult,
        host: &mut impl OutcomeHost,
    ) -> Result<Outcome, ValidateReportsError> {
        let outcome = Outcome::classify(&result.outcome, result.outcome_type.as_deref());
        let passed = outcome == Outcome::Passed;

        info!(
            "-- {} {}: {} ({:.1}s)",
            result.classname,
            result.name,
            result.outcome,
            result.time.as_secs_f64(),
        );

        if let Some(display_name) = &result.display_name
            && *display_name != result.name
        {
            detail!(passed, "   Display name: {display_name}");
        }

        let location = self
            .locator
            .locate(&result.classname, result.test_file_line);
        if let SourceFile::Path(path) = &location.file {
            detail!(passed, "   Test file: {path}");
        }

        match (outcome, &result.comparison) {
            (Outcome::Passed, _) => {}
            (Outcome::Failed, Some(comparison)) => {
                let label = format!("{}.{}", result.classname, result.name);
                if host.assert_equal(&label, comparison) {
                    return Err(ValidateReportsError::ComparisonDidNotFail { testcase: label });
                }
            }
            (Outcome::Skipped, _) => {
                info!(
                    "   Skipped because: {}",
                    reason_or_unknown(result.outcome_reason.as_deref()),
                );
            }
            (outcome, _) => {
                host.add_outcome(HostOutcome {
                    outcome,
                    reason: format!(
                        "{} {}: {} [in {}.{}]",
                        self.genre,
                        result.outcome,
                        reason_or_unknown(result.outcome_reason.as_deref()),
                        result.classname,
                        result.name,
                    ),
                    location: Some(location),
                });
            }
        }

        if let Some(stdout) = &result.system_out {
            detail!(passed, "Testcase stdout from {}: {}", result.name, indent_block(stdout));
        }
        if let Some(stderr) = &result.system_err {
            detail!(passed, "Testcase stderr from {}: {}", result.name, indent_block(stderr));
        }
        if let Some(details) = &result.outcome_details {
            detail!(passed, "Failure details from {}: {}", result.name, indent_block(details));
        }
        detail!(passed, "");

        Ok(outcome)
    }
}

fn reason_or_unknown(reason: Option<&str>) -> &str {
    reason.filter(|reason| !reason.is_empty()).unwrap_or("<unknown reason>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{RecordingHost, SourceLocation};
    use camino_tempfile::tempdir;
    use junit_reader::{Comparison, RawOutcome};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn reporter() -> TestcaseReporter {
        TestcaseReporter::new("JUnit", SourceLocator::new("/nonexistent/input", "java"))
    }

    fn result(
        outcome: RawOutcome,
        outcome_type: Option<&str>,
        reason: Option<&str>,
    ) -> TestcaseResult {
        let mut result =
            TestcaseResult::new("myorg.mytest.JUnit5Tests", "shouldTimeout()", outcome);
        if let Some(outcome_type) = outcome_type {
            result.set_outcome_type(outcome_type);
        }
        if let Some(reason) = reason {
            result.set_outcome_reason(reason);
        }
        result.test_file_line = Some(29);
        result
    }

    #[test]
    fn timeout_is_reported_with_location() {
        let mut host = RecordingHost::new();
        let outcome = reporter()
            .report(
                &result(
                    RawOutcome::Error,
                    Some("java.util.concurrent.TimeoutException"),
                    Some(
                        "java.util.concurrent.TimeoutException: \
                         shouldTimeout() timed out after 10 milliseconds",
                    ),
                ),
                &mut host,
            )
            .expect("reported");

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(
            host.into_outcomes(),
            vec![HostOutcome {
                outcome: Outcome::TimedOut,
                reason: "JUnit error: java.util.concurrent.TimeoutException: \
                         shouldTimeout() timed out after 10 milliseconds \
                         [in myorg.mytest.JUnit5Tests.shouldTimeout()]"
                    .to_owned(),
                location: Some(SourceLocation {
                    file: SourceFile::Classname("myorg.mytest.JUnit5Tests".to_owned()),
                    line: 29,
                }),
            }]
        );
    }

    #[test_case(RawOutcome::Passed, None; "passed")]
    #[test_case(RawOutcome::Skipped, Some("Reason test is disabled goes here"); "skipped")]
    #[test_case(RawOutcome::Skipped, None; "skipped without reason")]
    fn not_escalated(raw: RawOutcome, reason: Option<&str>) {
        let mut host = RecordingHost::new();
        let expected = Outcome::classify(&raw, None);
        let outcome = reporter()
            .report(&result(raw, None, reason), &mut host)
            .expect("reported");
        assert_eq!(outcome, expected);
        assert!(host.outcomes().is_empty());
    }

    #[test_case(RawOutcome::Error, Some(""), "JUnit error: <unknown reason>"; "empty reason")]
    #[test_case(
        RawOutcome::Other("flakyError".to_owned()),
        Some("retried"),
        "JUnit flakyError: retried"
        ; "unrecognized outcome"
    )]
    #[test_case(RawOutcome::Failure, Some("boom"), "JUnit failure: boom"; "failure without comparison")]
    fn escalated_reason(raw: RawOutcome, reason: Option<&str>, expected_prefix: &str) {
        let mut host = RecordingHost::new();
        reporter()
            .report(&result(raw, None, reason), &mut host)
            .expect("reported");

        let outcomes = host.into_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].reason,
            format!("{expected_prefix} [in myorg.mytest.JUnit5Tests.shouldTimeout()]")
        );
    }

    #[test]
    fn comparison_goes_through_assert_equal() {
        let dir = tempdir().expect("created temp dir");
        let mut reporter =
            TestcaseReporter::new("JUnit", SourceLocator::new(dir.path(), "java"));

        let message = "expected:<Hello [world]> but was:<Hello [funky world]>";
        let mut failed =
            TestcaseResult::new("myorg.mytest.JUnit4Tests", "shouldFail", RawOutcome::Failure);
        failed.set_outcome_reason(message);
        failed.comparison = Comparison::from_message(message);

        let mut host = RecordingHost::new();
        let outcome = reporter.report(&failed, &mut host).expect("reported");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(host.outcomes().len(), 1);
        assert_eq!(
            host.outcomes()[0].reason,
            "Assert that (expected == actual) with expected=\"Hello [world]\", \
             actual=\"Hello [funky world]\", testcaseName=\"myorg.mytest.JUnit4Tests.shouldFail\""
        );
    }

    struct AgreeableHost;

    impl OutcomeHost for AgreeableHost {
        fn add_outcome(&mut self, outcome: HostOutcome) {
            panic!("unexpected outcome: {outcome:?}");
        }

        fn assert_equal(&mut self, _label: &str, _comparison: &Comparison) -> bool {
            true
        }
    }

    #[test]
    fn comparison_that_passes_is_an_error() {
        let mut failed = TestcaseResult::new("myorg.T", "t", RawOutcome::Failure);
        failed.comparison = Some(Comparison {
            expected: "a".to_owned(),
            actual: "b".to_owned(),
        });

        let error = reporter()
            .report(&failed, &mut AgreeableHost)
            .expect_err("host agreeing with a failed comparison is an error");
        assert!(
            matches!(
                &error,
                ValidateReportsError::ComparisonDidNotFail { testcase } if testcase == "myorg.T.t"
            ),
            "unexpected error: {error:?}"
        );
    }
}
