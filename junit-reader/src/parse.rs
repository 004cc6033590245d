// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse a JUnit XML report into a [`ParsedReport`].

use crate::{
    Comparison, ParseReportError, ParseReportErrorKind, ParsedReport, RawOutcome, Suite,
    TestcaseResult,
};
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::{
    borrow::Cow,
    fs::File,
    io::{BufRead, BufReader},
    sync::LazyLock,
    time::Duration,
};
use tracing::debug;

static TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The classname given to the synthetic result for a skipped suite with no testcases.
pub static SKIPPED_SUITE_TESTCASE_NAME: &str = "class";

/// The reason given to the synthetic result for a skipped suite with no testcases.
pub static SKIPPED_SUITE_REASON: &str = "Test suite is skipped";

/// The default for [`ParserOptions::stack_noise`].
pub static DEFAULT_STACK_NOISE: &str =
    r"^\t+(at (java[.]|sun[.]|org[.]junit|org.apache.tools.ant)|\.\.\. [0-9]+ more).*\n";

// Captures the file name and line number of a stack frame.
static STACK_FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]+at .*[(]([^:]*):([0-9]+)").expect("stack frame regex is valid")
});

static JUNIT5_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^unique-id: (.*)\ndisplay-name: (.+)").expect("JUnit 5 marker regex is valid")
});

/// Options controlling how reports are interpreted.
#[derive(Clone, Debug)]
pub struct ParserOptions {
    stack_noise: Regex,
    timestamp_zone: TimestampZone,
}

impl ParserOptions {
    /// Creates a new `ParserOptions` with the default stack noise filter and
    /// [`TimestampZone::Auto`].
    pub fn new() -> Self {
        Self {
            stack_noise: Self::compile_stack_noise(DEFAULT_STACK_NOISE)
                .expect("default stack noise regex is valid"),
            timestamp_zone: TimestampZone::Auto,
        }
    }

    /// Compiles a stack noise pattern. `^` and `$` match at line boundaries.
    pub fn compile_stack_noise(pattern: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern).multi_line(true).build()
    }

    /// Sets the regex matching lines to strip from
    /// [`outcome_details`](TestcaseResult::outcome_details).
    ///
    /// Matches are removed verbatim, so the pattern should include the trailing
    /// newline of each line it removes.
    pub fn set_stack_noise(&mut self, stack_noise: Regex) -> &mut Self {
        self.stack_noise = stack_noise;
        self
    }

    /// Sets how suite timestamps are interpreted.
    pub fn set_timestamp_zone(&mut self, timestamp_zone: TimestampZone) -> &mut Self {
        self.timestamp_zone = timestamp_zone;
        self
    }

    /// Returns the stack noise regex.
    pub fn stack_noise(&self) -> &Regex {
        &self.stack_noise
    }

    /// Returns the timestamp zone policy.
    pub fn timestamp_zone(&self) -> TimestampZone {
        self.timestamp_zone
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The time zone that a suite's `timestamp` attribute is written in.
///
/// The JUnit 5 console launcher writes local time, while Ant writes UTC. The
/// attribute itself carries no offset, so which one applies has to be guessed.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampZone {
    /// Pick based on the suite name; see [`TimestampZone::resolve`].
    #[default]
    Auto,

    /// Timestamps are in the local time zone.
    Local,

    /// Timestamps are in UTC.
    Utc,
}

impl TimestampZone {
    /// Names of suites written by the JUnit 5 console launcher.
    pub const LAUNCHER_SUITE_NAMES: &'static [&'static str] = &["JUnit Jupiter", "JUnit Vintage"];

    /// Resolves [`Auto`](Self::Auto) for a suite with the given name.
    ///
    /// Suites named after a JUnit 5 launcher engine use local time, all others
    /// use UTC. This is a heuristic: a suite from another tool that happens to
    /// share one of these names will be misinterpreted. Set an explicit zone
    /// if that matters.
    pub fn resolve(self, suite_name: &str) -> TimestampZone {
        match self {
            TimestampZone::Auto if Self::LAUNCHER_SUITE_NAMES.contains(&suite_name) => {
                TimestampZone::Local
            }
            TimestampZone::Auto => TimestampZone::Utc,
            other => other,
        }
    }

    fn to_instant(
        self,
        suite_name: &str,
        value: &str,
    ) -> Result<DateTime<FixedOffset>, ParseReportErrorKind> {
        let naive = NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(
            |error| ParseReportErrorKind::InvalidTimestamp {
                value: value.to_owned(),
                error,
            },
        )?;
        match self.resolve(suite_name) {
            TimestampZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|timestamp| timestamp.fixed_offset())
                .ok_or_else(|| ParseReportErrorKind::NonexistentLocalTime {
                    value: value.to_owned(),
                }),
            _ => Ok(Utc.from_utc_datetime(&naive).fixed_offset()),
        }
    }
}

/// A parser for JUnit XML reports.
///
/// The parser holds only configuration: every call to [`parse`](Self::parse)
/// uses fresh state, so one parser can read any number of reports.
#[derive(Clone, Debug, Default)]
pub struct JunitXmlParser {
    options: ParserOptions,
}

impl JunitXmlParser {
    /// Creates a new parser with the given options.
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Returns the options used by this parser.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses the report at `path`.
    pub fn parse(&self, path: &Utf8Path) -> Result<ParsedReport, ParseReportError> {
        let file = File::open(path)
            .map_err(|error| ParseReportError::new(path, ParseReportErrorKind::Open(error)))?;
        self.parse_reader(BufReader::new(file), path)
    }

    /// Parses a report from `reader`.
    ///
    /// `path` is only used for error messages and logging.
    pub fn parse_reader(
        &self,
        reader: impl BufRead,
        path: &Utf8Path,
    ) -> Result<ParsedReport, ParseReportError> {
        debug!("parsing JUnit XML report: {path}");
        self.parse_impl(reader)
            .map_err(|kind| ParseReportError::new(path, kind))
    }

    fn parse_impl(&self, input: impl BufRead) -> Result<ParsedReport, ParseReportErrorKind> {
        let mut reader = Reader::from_reader(input);
        // Report a start and an end for every element, including `<skipped/>`.
        reader.config_mut().expand_empty_elements = true;

        let mut stack = ElementStack::default();
        let mut unmarshaller = Unmarshaller::new(&self.options);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    let element = OpenElement::new(&start)?;
                    unmarshaller.element_start(&element, &stack)?;
                    stack.push(element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        unmarshaller.element_end(element, &stack)?;
                    }
                }
                Event::Text(text) => {
                    if let Some(sink) = stack.text_sink() {
                        push_normalized(sink, &text.unescape()?);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(sink) = stack.text_sink() {
                        let text = std::str::from_utf8(&cdata)
                            .map_err(ParseReportErrorKind::InvalidCData)?;
                        push_normalized(sink, text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(element) = stack.pop() {
            return Err(ParseReportErrorKind::UnclosedElement { name: element.name });
        }

        unmarshaller.finish()
    }
}

// XML processors normalize line endings to \n; quick-xml leaves that to us.
fn push_normalized(sink: &mut String, text: &str) {
    if text.contains('\r') {
        sink.push_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
    } else {
        sink.push_str(text);
    }
}

/// The elements that the unmarshaller acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ElementKind {
    Testsuite,
    Testcase,
    SystemOut,
    SystemErr,
    Failure,
    Error,
    Skipped,
}

impl ElementKind {
    fn from_name(name: &[u8]) -> Option<Self> {
        let kind = match name {
            b"testsuite" => ElementKind::Testsuite,
            b"testcase" => ElementKind::Testcase,
            b"system-out" => ElementKind::SystemOut,
            b"system-err" => ElementKind::SystemErr,
            b"failure" => ElementKind::Failure,
            b"error" => ElementKind::Error,
            b"skipped" => ElementKind::Skipped,
            _ => return None,
        };
        Some(kind)
    }

    fn collects_text(self) -> bool {
        !matches!(self, ElementKind::Testsuite | ElementKind::Testcase)
    }
}

/// An element whose end hasn't been seen yet.
#[derive(Debug)]
struct OpenElement {
    name: String,
    kind: Option<ElementKind>,
    attributes: IndexMap<String, String>,
    text: String,
}

impl OpenElement {
    fn new(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let kind = ElementKind::from_name(start.local_name().as_ref());
        let mut attributes = IndexMap::new();
        // Attributes of elements we don't act on are never read.
        if kind.is_some() {
            for attr in start.attributes() {
                let mut attr = attr?;
                if attr.value.iter().any(|b| matches!(b, b'\t' | b'\n' | b'\r')) {
                    attr.value = Cow::Owned(normalize_attribute_whitespace(&attr.value));
                }
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                attributes.insert(key, attr.unescape_value()?.into_owned());
            }
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            kind,
            attributes,
            text: String::new(),
        })
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|value| value.as_str())
    }

    /// Returns the attribute if it's present and non-empty.
    fn non_empty_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|value| !value.is_empty())
    }
}

// Attribute-value normalization: literal tabs and line endings each become a
// single space. Character references such as `&#10;` are unescaped afterwards,
// so they survive.
fn normalize_attribute_whitespace(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().peekable();
    while let Some(&b) = bytes.next() {
        match b {
            b'\r' => {
                if bytes.peek() == Some(&&b'\n') {
                    bytes.next();
                }
                out.push(b' ');
            }
            b'\t' | b'\n' => out.push(b' '),
            other => out.push(other),
        }
    }
    out
}

/// The ancestors of the element being processed, outermost first.
#[derive(Debug, Default)]
struct ElementStack {
    elements: Vec<OpenElement>,
}

impl ElementStack {
    fn depth(&self) -> usize {
        self.elements.len()
    }

    fn parent_kind(&self) -> Option<ElementKind> {
        self.elements.last().and_then(|element| element.kind)
    }

    fn push(&mut self, element: OpenElement) {
        self.elements.push(element);
    }

    fn pop(&mut self) -> Option<OpenElement> {
        self.elements.pop()
    }

    fn text_sink(&mut self) -> Option<&mut String> {
        self.elements
            .last_mut()
            .filter(|element| element.kind.is_some_and(ElementKind::collects_text))
            .map(|element| &mut element.text)
    }
}

/// Accumulated state for a single report.
struct Unmarshaller<'a> {
    options: &'a ParserOptions,
    suite: Option<Suite>,
    current: Option<TestcaseBuilder>,
    results: Vec<TestcaseResult>,
}

impl<'a> Unmarshaller<'a> {
    fn new(options: &'a ParserOptions) -> Self {
        Self {
            options,
            suite: None,
            current: None,
            results: Vec::new(),
        }
    }

    fn element_start(
        &mut self,
        element: &OpenElement,
        ancestors: &ElementStack,
    ) -> Result<(), ParseReportErrorKind> {
        match element.kind {
            Some(ElementKind::Testsuite) => self.start_testsuite(element, ancestors),
            Some(ElementKind::Testcase) => {
                self.current = Some(TestcaseBuilder::new(element)?);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn element_end(
        &mut self,
        element: OpenElement,
        ancestors: &ElementStack,
    ) -> Result<(), ParseReportErrorKind> {
        match element.kind {
            Some(ElementKind::Testcase) => {
                if let Some(builder) = self.current.take() {
                    self.results.push(builder.finish());
                }
            }
            Some(ElementKind::Failure) => self.outcome(RawOutcome::Failure, &element),
            Some(ElementKind::Error) => self.outcome(RawOutcome::Error, &element),
            Some(ElementKind::Skipped) => self.outcome(RawOutcome::Skipped, &element),
            Some(ElementKind::SystemOut) => {
                self.captured_output(OutputStream::Stdout, &element, ancestors)
            }
            Some(ElementKind::SystemErr) => {
                self.captured_output(OutputStream::Stderr, &element, ancestors)
            }
            Some(ElementKind::Testsuite) | None => {}
        }
        Ok(())
    }

    fn start_testsuite(
        &mut self,
        element: &OpenElement,
        ancestors: &ElementStack,
    ) -> Result<(), ParseReportErrorKind> {
        if ancestors.depth() != 0 || self.suite.is_some() {
            return Err(ParseReportErrorKind::UnexpectedTestsuite {
                depth: ancestors.depth(),
            });
        }

        let mut suite = Suite::new("");
        let mut timestamp = None;
        for (attribute, value) in &element.attributes {
            match attribute.as_str() {
                "name" => suite.name = value.clone(),
                "tests" => suite.tests = parse_count(attribute, value)?,
                "failures" => suite.failures = Some(parse_count(attribute, value)?),
                "errors" => suite.errors = Some(parse_count(attribute, value)?),
                "skipped" => suite.skipped = Some(parse_count(attribute, value)?),
                "aborted" => suite.aborted = Some(parse_count(attribute, value)?),
                "time" => suite.time = parse_duration(attribute, value)?,
                "timestamp" => timestamp = Some(value),
                _ => {
                    suite.extra.insert(attribute.clone(), value.clone());
                }
            }
        }

        // The zone may depend on the suite name, which can come after the timestamp.
        if let Some(timestamp) = timestamp {
            suite.timestamp = Some(
                self.options
                    .timestamp_zone
                    .to_instant(&suite.name, timestamp)?,
            );
        }

        self.suite = Some(suite);
        Ok(())
    }

    fn outcome(&mut self, outcome: RawOutcome, element: &OpenElement) {
        let Some(current) = self.current.as_mut() else {
            debug!(
                "ignoring `{}` element outside of a testcase",
                element.name
            );
            return;
        };

        if let Some(ty) = element.non_empty_attribute("type") {
            current.outcome_type = Some(ty.to_owned());
        }

        match element.non_empty_attribute("message") {
            Some(message) => {
                let mut reason = message.trim().to_owned();
                current.comparison = Comparison::from_message(&reason);

                if outcome == RawOutcome::Error
                    && let Some(ty) = &current.outcome_type
                    && !reason.contains(ty.as_str())
                {
                    reason = format!("{ty}: {reason}");
                }
                current.outcome_reason = Some(reason);

                let details = element.text.trim_start();
                if !details.is_empty() {
                    let filtered = self.options.stack_noise.replace_all(details, "");
                    current.outcome_details = Some(filtered.trim().to_owned());
                    current.outcome_details_full = Some(details.to_owned());
                }
            }
            None => {
                current.outcome_reason = Some(element.text.trim().to_owned());
            }
        }

        current.outcome = Some(outcome);
    }

    fn captured_output(
        &mut self,
        stream: OutputStream,
        element: &OpenElement,
        ancestors: &ElementStack,
    ) {
        let text = element.text.trim();
        if text.is_empty() {
            return;
        }

        let slots = match (ancestors.parent_kind(), &mut self.current, &mut self.suite) {
            (Some(ElementKind::Testsuite), _, Some(suite)) | (_, None, Some(suite)) => {
                OutputSlots::for_suite(suite)
            }
            (_, Some(current), _) => OutputSlots::for_testcase(current),
            (_, None, None) => return,
        };

        if stream == OutputStream::Stdout
            && let Some(captures) = JUNIT5_MARKER_REGEX.captures(text)
        {
            // Not real output: the launcher's identification of the suite or testcase.
            *slots.unique_id = Some(captures[1].to_owned());
            *slots.display_name = Some(captures[2].to_owned());
            return;
        }

        let target = match stream {
            OutputStream::Stdout => slots.system_out,
            OutputStream::Stderr => slots.system_err,
        };
        match target {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(text);
            }
            None => *target = Some(text.to_owned()),
        }
    }

    fn finish(self) -> Result<ParsedReport, ParseReportErrorKind> {
        let suite = self.suite.ok_or(ParseReportErrorKind::MissingTestsuite)?;
        let mut results = self.results;

        // Ant excludes skipped tests from `tests` while the JUnit 5 launcher
        // includes them, so this can't be an exact check.
        if results.len() < suite.tests {
            return Err(ParseReportErrorKind::TooFewResults {
                declared: suite.tests,
                found: results.len(),
            });
        }

        // Launchers don't write testcases in a consistent order.
        results.sort_by(|a, b| a.key().cmp(&b.key()));

        if results.is_empty() {
            if suite.unique_id.is_some() {
                // For example, the JUnit Vintage engine when there are no JUnit 4 tests.
                debug!(
                    "ignoring suite `{}` with no results generated by the JUnit 5 launcher",
                    suite.name
                );
            } else if suite.skipped_count() == 0 {
                return Err(ParseReportErrorKind::EmptySuiteNotSkipped {
                    suite: suite.name.clone(),
                });
            } else {
                // JUnit 4 and Ant write no testcases for a skipped class.
                let mut skipped = TestcaseResult::new(
                    suite.name.clone(),
                    SKIPPED_SUITE_TESTCASE_NAME,
                    RawOutcome::Skipped,
                );
                skipped.set_outcome_reason(SKIPPED_SUITE_REASON);
                results.push(skipped);
            }
        }

        Ok(ParsedReport { suite, results })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// The fields that captured output is written to, on either a suite or a testcase.
struct OutputSlots<'a> {
    system_out: &'a mut Option<String>,
    system_err: &'a mut Option<String>,
    unique_id: &'a mut Option<String>,
    display_name: &'a mut Option<String>,
}

impl<'a> OutputSlots<'a> {
    fn for_suite(suite: &'a mut Suite) -> Self {
        Self {
            system_out: &mut suite.system_out,
            system_err: &mut suite.system_err,
            unique_id: &mut suite.unique_id,
            display_name: &mut suite.display_name,
        }
    }

    fn for_testcase(testcase: &'a mut TestcaseBuilder) -> Self {
        Self {
            system_out: &mut testcase.system_out,
            system_err: &mut testcase.system_err,
            unique_id: &mut testcase.unique_id,
            display_name: &mut testcase.display_name,
        }
    }
}

/// A testcase whose end hasn't been seen yet.
#[derive(Debug, Default)]
struct TestcaseBuilder {
    classname: String,
    name: String,
    time: Duration,
    outcome: Option<RawOutcome>,
    outcome_type: Option<String>,
    outcome_reason: Option<String>,
    outcome_details: Option<String>,
    outcome_details_full: Option<String>,
    comparison: Option<Comparison>,
    system_out: Option<String>,
    system_err: Option<String>,
    unique_id: Option<String>,
    display_name: Option<String>,
}

impl TestcaseBuilder {
    fn new(element: &OpenElement) -> Result<Self, ParseReportErrorKind> {
        let time = match element.attribute("time") {
            Some(time) => parse_duration("time", time)?,
            None => Duration::ZERO,
        };
        Ok(Self {
            classname: element.attribute("classname").unwrap_or_default().to_owned(),
            name: element.attribute("name").unwrap_or_default().to_owned(),
            time,
            ..Default::default()
        })
    }

    fn finish(self) -> TestcaseResult {
        let test_file_line = self
            .outcome_details
            .as_deref()
            .and_then(|details| find_test_file_line(&self.classname, details));

        TestcaseResult {
            classname: self.classname,
            name: self.name,
            time: self.time,
            outcome: self.outcome.unwrap_or(RawOutcome::Passed),
            outcome_type: self.outcome_type,
            outcome_reason: self.outcome_reason,
            outcome_details: self.outcome_details,
            outcome_details_full: self.outcome_details_full,
            comparison: self.comparison,
            test_file_line,
            system_out: self.system_out,
            system_err: self.system_err,
            unique_id: self.unique_id,
            display_name: self.display_name,
        }
    }
}

/// Returns the class name without its package or any nested classes:
/// `myorg.MyTests$Nested` becomes `MyTests`.
fn simple_class_name(classname: &str) -> &str {
    let unqualified = classname.rsplit('.').next().unwrap_or(classname);
    unqualified.split('$').next().unwrap_or(unqualified)
}

/// Finds the line number of the first stack frame in the test's own source file.
fn find_test_file_line(classname: &str, details: &str) -> Option<u32> {
    let simple_name = simple_class_name(classname);
    if simple_name.is_empty() {
        return None;
    }

    details
        .lines()
        .filter_map(|line| STACK_FRAME_REGEX.captures(line))
        .find(|captures| captures[1].starts_with(simple_name))
        .and_then(|captures| captures[2].parse().ok())
}

fn parse_count(attribute: &str, value: &str) -> Result<usize, ParseReportErrorKind> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseReportErrorKind::InvalidCount {
            attribute: attribute.to_owned(),
            value: value.to_owned(),
        })
}

fn parse_duration(attribute: &str, value: &str) -> Result<Duration, ParseReportErrorKind> {
    let value_trimmed = value.trim();
    if value_trimmed.is_empty() {
        return Ok(Duration::ZERO);
    }
    value_trimmed
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| ParseReportErrorKind::InvalidDuration {
            attribute: attribute.to_owned(),
            value: value.to_owned(),
        })
}
