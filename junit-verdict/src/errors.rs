// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by junit-verdict.

use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use junit_reader::ParseReportError;
use std::io;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse junit-verdict config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config, including an invalid
    /// `stack-noise` regex.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error which indicates that a profile was requested but not known.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }

    /// Returns the name of the profile that wasn't found.
    pub fn profile(&self) -> &str {
        &self.profile
    }
}

/// An error that occurred while validating a directory of reports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidateReportsError {
    /// The reports directory could not be read.
    #[error("error reading reports directory `{dir}`")]
    ReadDir {
        /// The reports directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A report could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseReportError),

    /// A testcase failed with an expected/actual comparison, but the host
    /// considered the two values equal.
    #[error(
        "testcase `{testcase}` failed with a comparison, \
         but the host considered expected and actual equal"
    )]
    ComparisonDidNotFail {
        /// The testcase, as `classname.name`.
        testcase: String,
    },
}
