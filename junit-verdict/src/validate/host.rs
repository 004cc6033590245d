// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Outcome, SourceLocation};
use junit_reader::Comparison;

/// An outcome reported to the host test framework.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostOutcome {
    /// The outcome.
    pub outcome: Outcome,

    /// A one-line, human-readable reason for the outcome.
    pub reason: String,

    /// Where the outcome came from, if known.
    pub location: Option<SourceLocation>,
}

/// The host test framework that testcase outcomes are reported to.
///
/// Individual passed and skipped testcases are not reported through this
/// trait. A skipped outcome is only added when no testcase ran at all.
pub trait OutcomeHost {
    /// Adds an outcome.
    fn add_outcome(&mut self, outcome: HostOutcome);

    /// Asserts that `comparison.expected` equals `comparison.actual`, reporting
    /// a failure labelled with `label` if not.
    ///
    /// Returns true if the assertion passed.
    fn assert_equal(&mut self, label: &str, comparison: &Comparison) -> bool;
}

impl<H: OutcomeHost + ?Sized> OutcomeHost for &mut H {
    fn add_outcome(&mut self, outcome: HostOutcome) {
        (**self).add_outcome(outcome)
    }

    fn assert_equal(&mut self, label: &str, comparison: &Comparison) -> bool {
        (**self).assert_equal(label, comparison)
    }
}

/// An [`OutcomeHost`] that keeps every outcome in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingHost {
    outcomes: Vec<HostOutcome>,
}

impl RecordingHost {
    /// Creates a new, empty `RecordingHost`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the outcomes added so far, in order.
    pub fn outcomes(&self) -> &[HostOutcome] {
        &self.outcomes
    }

    /// Returns the recorded outcomes.
    pub fn into_outcomes(self) -> Vec<HostOutcome> {
        self.outcomes
    }
}

impl OutcomeHost for RecordingHost {
    fn add_outcome(&mut self, outcome: HostOutcome) {
        self.outcomes.push(outcome);
    }

    fn assert_equal(&mut self, label: &str, comparison: &Comparison) -> bool {
        if comparison.expected == comparison.actual {
            return true;
        }
        self.outcomes.push(HostOutcome {
            outcome: Outcome::Failed,
            reason: format!(
                "Assert that (expected == actual) with expected=\"{}\", actual=\"{}\", testcaseName=\"{label}\"",
                comparison.expected, comparison.actual,
            ),
            location: None,
        });
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_equal_records_mismatches() {
        let mut host = RecordingHost::new();
        let equal = Comparison {
            expected: "same".to_owned(),
            actual: "same".to_owned(),
        };
        assert!(host.assert_equal("myorg.T.same", &equal));
        assert!(host.outcomes().is_empty());

        let differ = Comparison {
            expected: "Hello []world".to_owned(),
            actual: "Hello [funky ]world".to_owned(),
        };
        // Report through a mutable reference, as a validator borrowing the host does.
        assert!(!(&mut host).assert_equal("myorg.mytest.JUnit4Tests.shouldFail", &differ));
        assert_eq!(
            host.into_outcomes(),
            vec![HostOutcome {
                outcome: Outcome::Failed,
                reason: "Assert that (expected == actual) with expected=\"Hello []world\", \
                         actual=\"Hello [funky ]world\", \
                         testcaseName=\"myorg.mytest.JUnit4Tests.shouldFail\""
                    .to_owned(),
                location: None,
            }]
        );
    }
}
