// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, FixedOffset};
use indexmap::map::IndexMap;
use regex::Regex;
use std::{fmt, sync::LazyLock, time::Duration};

/// The contents of a single JUnit XML report file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedReport {
    /// The `testsuite` root element.
    pub suite: Suite,

    /// The testcases in this report, sorted by `(classname, name)`.
    pub results: Vec<TestcaseResult>,
}

impl ParsedReport {
    /// Splits this report into its suite and results.
    pub fn into_parts(self) -> (Suite, Vec<TestcaseResult>) {
        (self.suite, self.results)
    }
}

/// The `testsuite` root element of a report.
///
/// Counts other than `tests` are optional because dialects disagree on which
/// attributes they emit: Ant writes `errors`, the JUnit 5 launcher writes both
/// `errors` and `skipped`, and some other tools write `aborted`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Suite {
    /// The name of this suite.
    pub name: String,

    /// The number of tests declared by this suite.
    ///
    /// Depending on the dialect, this may or may not include skipped tests.
    pub tests: usize,

    /// The number of failed tests, if reported.
    pub failures: Option<usize>,

    /// The number of tests that errored, if reported.
    pub errors: Option<usize>,

    /// The number of skipped tests, if reported.
    pub skipped: Option<usize>,

    /// The number of aborted tests, if reported.
    pub aborted: Option<usize>,

    /// The time taken to execute every test in the suite.
    pub time: Duration,

    /// The time at which the suite began execution.
    pub timestamp: Option<DateTime<FixedOffset>>,

    /// Text written to standard output by the whole suite.
    ///
    /// Only set by dialects which don't record output per testcase.
    pub system_out: Option<String>,

    /// Text written to standard error by the whole suite.
    pub system_err: Option<String>,

    /// The JUnit 5 unique ID, if this suite was written by the JUnit 5 launcher.
    pub unique_id: Option<String>,

    /// The JUnit 5 display name.
    pub display_name: Option<String>,

    /// Other attributes, such as "hostname" or "package".
    pub extra: IndexMap<String, String>,
}

impl Suite {
    /// Creates a new, empty `Suite`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: 0,
            failures: None,
            errors: None,
            skipped: None,
            aborted: None,
            time: Duration::ZERO,
            timestamp: None,
            system_out: None,
            system_err: None,
            unique_id: None,
            display_name: None,
            extra: IndexMap::new(),
        }
    }

    /// Returns the number of skipped tests, or 0 if not reported.
    pub fn skipped_count(&self) -> usize {
        self.skipped.unwrap_or(0)
    }

    /// Returns true if this suite has any suite-level captured output.
    pub fn has_output(&self) -> bool {
        self.system_out.is_some() || self.system_err.is_some()
    }
}

/// A single testcase in a report.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct TestcaseResult {
    /// The qualified name of the class containing this testcase.
    ///
    /// Nested classes are separated with `$`, e.g. `myorg.MyTests$Nested`.
    pub classname: String,

    /// The name of the testcase, typically a method name, possibly with a
    /// suffix such as `foo()[2]`.
    pub name: String,

    /// The time taken to execute this testcase.
    pub time: Duration,

    /// The outcome as written in the report.
    pub outcome: RawOutcome,

    /// The qualified name of the throwable that caused a non-success outcome.
    pub outcome_type: Option<String>,

    /// The reason for a non-success outcome.
    ///
    /// Always set if the outcome isn't [`RawOutcome::Passed`], but may be empty.
    pub outcome_reason: Option<String>,

    /// The stack trace or other details for the outcome, with noisy frames removed.
    pub outcome_details: Option<String>,

    /// The stack trace or other details for the outcome, unfiltered.
    pub outcome_details_full: Option<String>,

    /// Expected and actual values, if the reason is an equality assertion message.
    pub comparison: Option<Comparison>,

    /// The line in the test's source file, recovered from the stack trace.
    pub test_file_line: Option<u32>,

    /// Text written to standard output by this testcase.
    pub system_out: Option<String>,

    /// Text written to standard error by this testcase.
    pub system_err: Option<String>,

    /// The JUnit 5 unique ID of this testcase.
    pub unique_id: Option<String>,

    /// The JUnit 5 display name of this testcase.
    pub display_name: Option<String>,
}

impl TestcaseResult {
    /// Creates a new testcase with the given outcome.
    pub fn new(classname: impl Into<String>, name: impl Into<String>, outcome: RawOutcome) -> Self {
        Self {
            classname: classname.into(),
            name: name.into(),
            time: Duration::ZERO,
            outcome,
            outcome_type: None,
            outcome_reason: None,
            outcome_details: None,
            outcome_details_full: None,
            comparison: None,
            test_file_line: None,
            system_out: None,
            system_err: None,
            unique_id: None,
            display_name: None,
        }
    }

    /// Returns the identity of this testcase: its classname and name.
    pub fn key(&self) -> (&str, &str) {
        (&self.classname, &self.name)
    }

    /// Sets the outcome reason.
    pub fn set_outcome_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.outcome_reason = Some(reason.into());
        self
    }

    /// Sets the outcome type.
    pub fn set_outcome_type(&mut self, ty: impl Into<String>) -> &mut Self {
        self.outcome_type = Some(ty.into());
        self
    }

    /// Sets the time taken for this testcase.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = time;
        self
    }
}

/// The outcome of a testcase, in the vocabulary of the report.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RawOutcome {
    /// No `failure`, `error` or `skipped` element was present.
    Passed,

    /// A `failure` element: usually an assertion that did not hold.
    Failure,

    /// An `error` element: usually an unexpected exception.
    Error,

    /// A `skipped` element.
    Skipped,

    /// Any other outcome.
    Other(String),
}

impl RawOutcome {
    /// Returns the outcome corresponding to this element tag or outcome string.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "passed" => RawOutcome::Passed,
            "failure" => RawOutcome::Failure,
            "error" => RawOutcome::Error,
            "skipped" => RawOutcome::Skipped,
            other => RawOutcome::Other(other.to_owned()),
        }
    }

    /// Returns the outcome as a string.
    pub fn as_str(&self) -> &str {
        match self {
            RawOutcome::Passed => "passed",
            RawOutcome::Failure => "failure",
            RawOutcome::Error => "error",
            RawOutcome::Skipped => "skipped",
            RawOutcome::Other(other) => other,
        }
    }
}

impl fmt::Display for RawOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The expected and actual values of a failed equality assertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    /// The expected value.
    pub expected: String,

    /// The actual value.
    pub actual: String,
}

static COMPARISON_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^expected: ?<(.*)> but was: ?<(.*)>$").expect("comparison regex is valid")
});

impl Comparison {
    /// Extracts a comparison from an assertion message of the form
    /// `expected: <X> but was: <Y>`.
    ///
    /// Returns `None` if the message is in a different form, or if the two values are equal.
    pub fn from_message(message: &str) -> Option<Self> {
        let captures = COMPARISON_REGEX.captures(message)?;
        let (expected, actual) = (&captures[1], &captures[2]);
        (expected != actual).then(|| Comparison {
            expected: expected.to_owned(),
            actual: actual.to_owned(),
        })
    }
}
