// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use thiserror::Error;

/// An error that occurs while parsing a JUnit XML report.
///
/// Returned by [`JunitXmlParser::parse`](crate::JunitXmlParser::parse). Whatever went wrong
/// underneath is available as the [`kind`](Self::kind) and through
/// [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("failed to parse JUnit XML report at `{path}`")]
#[non_exhaustive]
pub struct ParseReportError {
    path: Utf8PathBuf,
    #[source]
    kind: ParseReportErrorKind,
}

impl ParseReportError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, kind: ParseReportErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Returns the path to the report that failed to parse.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ParseReportErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseReportErrorKind {
    /// The report could not be opened.
    #[error("error opening report")]
    Open(#[source] io::Error),

    /// The report is not well-formed XML.
    #[error("report is not well-formed XML")]
    Xml(#[from] quick_xml::Error),

    /// A CDATA section is not valid UTF-8.
    #[error("CDATA section is not valid UTF-8")]
    InvalidCData(#[source] std::str::Utf8Error),

    /// The document ended while an element was still open.
    #[error("element `{name}` is never closed")]
    UnclosedElement {
        /// The name of the innermost open element.
        name: String,
    },

    /// A `testsuite` element appeared somewhere other than the root.
    #[error("`testsuite` is only expected once, as the root element (found at depth {depth})")]
    UnexpectedTestsuite {
        /// The nesting depth at which the element was found; the root is at depth 0.
        depth: usize,
    },

    /// The document does not contain a `testsuite` element.
    #[error("report has no `testsuite` root element")]
    MissingTestsuite,

    /// A count attribute such as `tests` or `skipped` is not a non-negative integer.
    #[error("attribute `{attribute}` is not a valid count: `{value}`")]
    InvalidCount {
        /// The attribute name.
        attribute: String,
        /// The attribute value.
        value: String,
    },

    /// A `time` attribute is not a non-negative number of seconds.
    #[error("attribute `{attribute}` is not a valid duration in seconds: `{value}`")]
    InvalidDuration {
        /// The attribute name.
        attribute: String,
        /// The attribute value.
        value: String,
    },

    /// The suite's `timestamp` attribute is not in the `YYYY-MM-DDThh:mm:ss` format.
    #[error("timestamp `{value}` is not in the format YYYY-MM-DDThh:mm:ss")]
    InvalidTimestamp {
        /// The attribute value.
        value: String,
        /// The underlying error.
        #[source]
        error: chrono::ParseError,
    },

    /// The suite's `timestamp` is interpreted as local time, but that time was
    /// skipped by a daylight-saving transition.
    #[error("timestamp `{value}` does not exist in the local time zone")]
    NonexistentLocalTime {
        /// The attribute value.
        value: String,
    },

    /// The suite declares more tests than there are `testcase` elements.
    #[error("suite declares {declared} tests but only {found} testcase elements were found")]
    TooFewResults {
        /// The value of the suite's `tests` attribute.
        declared: usize,
        /// The number of testcases parsed.
        found: usize,
    },

    /// The suite contains no testcases and does not say that it was skipped.
    #[error("suite `{suite}` contains no results, but its skipped count is 0")]
    EmptySuiteNotSkipped {
        /// The suite name.
        suite: String,
    },
}
