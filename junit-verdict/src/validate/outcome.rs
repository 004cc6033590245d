// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use junit_reader::RawOutcome;
use std::fmt;

/// The outcome of a testcase, as seen by the host test framework.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The testcase passed.
    Passed,

    /// The testcase was skipped.
    Skipped,

    /// An assertion in the testcase did not hold.
    Failed,

    /// The testcase could not complete, usually because of an unexpected exception.
    Blocked,

    /// The testcase exceeded its time limit.
    TimedOut,
}

impl Outcome {
    /// All outcomes, in the order they are summarized in.
    pub const ALL: [Outcome; 5] = [
        Outcome::Passed,
        Outcome::Skipped,
        Outcome::Failed,
        Outcome::Blocked,
        Outcome::TimedOut,
    ];

    /// Classifies a raw outcome from a report.
    ///
    /// Unrecognized outcomes are treated as blocked, so that they're investigated
    /// rather than silently passing. A failure or error whose `outcome_type`
    /// contains `Timeout` is a timeout, whether the framework reported it as an
    /// error or as an assertion failure.
    pub fn classify(raw: &RawOutcome, outcome_type: Option<&str>) -> Self {
        let outcome = match raw {
            RawOutcome::Passed => Outcome::Passed,
            RawOutcome::Failure => Outcome::Failed,
            RawOutcome::Error => Outcome::Blocked,
            RawOutcome::Skipped => Outcome::Skipped,
            RawOutcome::Other(_) => Outcome::Blocked,
        };

        match outcome {
            Outcome::Blocked | Outcome::Failed
                if outcome_type.is_some_and(|ty| ty.contains("Timeout")) =>
            {
                Outcome::TimedOut
            }
            other => other,
        }
    }

    /// Returns the name of this outcome as shown to users.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Skipped => "SKIPPED",
            Outcome::Failed => "FAILED",
            Outcome::Blocked => "BLOCKED",
            Outcome::TimedOut => "TIMED OUT",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The number of testcases with each outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// The number of testcases that passed.
    pub passed: usize,

    /// The number of testcases that were skipped.
    pub skipped: usize,

    /// The number of testcases that failed.
    pub failed: usize,

    /// The number of testcases that were blocked.
    pub blocked: usize,

    /// The number of testcases that timed out.
    pub timed_out: usize,
}

impl OutcomeCounts {
    /// Records a testcase with the given outcome.
    pub fn add(&mut self, outcome: Outcome) {
        *self.get_mut(outcome) += 1;
    }

    /// Returns the number of testcases with the given outcome.
    pub fn get(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Passed => self.passed,
            Outcome::Skipped => self.skipped,
            Outcome::Failed => self.failed,
            Outcome::Blocked => self.blocked,
            Outcome::TimedOut => self.timed_out,
        }
    }

    /// Returns the total number of testcases.
    pub fn total(&self) -> usize {
        Outcome::ALL.iter().map(|&outcome| self.get(outcome)).sum()
    }

    /// Returns true if there is at least one testcase and every testcase was skipped.
    pub fn all_skipped(&self) -> bool {
        self.skipped > 0 && self.skipped == self.total()
    }

    fn get_mut(&mut self, outcome: Outcome) -> &mut usize {
        match outcome {
            Outcome::Passed => &mut self.passed,
            Outcome::Skipped => &mut self.skipped,
            Outcome::Failed => &mut self.failed,
            Outcome::Blocked => &mut self.blocked,
            Outcome::TimedOut => &mut self.timed_out,
        }
    }
}

impl fmt::Display for OutcomeCounts {
    /// Lists the non-zero counts, e.g. `3 PASSED, 1 TIMED OUT`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for outcome in Outcome::ALL {
            let count = self.get(outcome);
            if count == 0 {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{count} {outcome}")?;
            first = false;
        }
        Ok(())
    }
}
