// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use junit_reader::{ParserOptions, TimestampZone};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Trait for handling configuration warnings.
///
/// The default implementation logs warnings; tests collect them instead.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        root: &Utf8Path,
        unknown: &BTreeSet<String>,
    );
}

/// Default implementation of ConfigWarnings that logs warnings using the tracing crate.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        root: &Utf8Path,
        unknown: &BTreeSet<String>,
    ) {
        let mut unknown_str = String::new();
        if let [single] = unknown.iter().collect::<Vec<_>>().as_slice() {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.push_str(single);
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!(
            "in config file {}, ignoring unknown configuration {unknown_str}",
            config_file.strip_prefix(root).unwrap_or(config_file),
        )
    }
}

/// Configuration for interpreting JUnit XML reports, made up of one or more profiles.
///
/// Loaded from `.config/junit-verdict.toml` and layered on top of
/// [`DEFAULT_CONFIG`](Self::DEFAULT_CONFIG).
#[derive(Clone, Debug)]
pub struct ReportConfig {
    root: Utf8PathBuf,
    default_profile: DefaultProfileImpl,
    other_profiles: HashMap<String, CustomProfileImpl>,
}

impl ReportConfig {
    /// The default location of the config within the root directory.
    pub const CONFIG_PATH: &'static str = ".config/junit-verdict.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the config from the given file, or if not specified from
    /// `.config/junit-verdict.toml` in `root`.
    ///
    /// If no config file is specified and `root` doesn't have one, the default
    /// config is used.
    pub fn from_sources(
        root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(root, config_file, &mut DefaultConfigWarnings)
    }

    /// Loads the config with custom warning handling.
    pub fn from_sources_with_warnings(
        root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let root = root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, &root, &unknown);
        }

        let (default_profile, other_profiles) = config.into_profiles();
        Ok(Self {
            root,
            default_profile,
            other_profiles,
        })
    }

    /// Returns the default config.
    #[cfg(test)]
    pub(crate) fn default_config(root: impl Into<Utf8PathBuf>) -> Self {
        let (config, unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");

        // The default config is embedded in the library, so it must not have any unknown keys.
        assert!(
            unknown.is_empty(),
            "found unknown keys in default config: {unknown:?}"
        );

        let (default_profile, other_profiles) = config.into_profiles();
        Self {
            root: root.into(),
            default_profile,
            other_profiles,
        }
    }

    /// Returns the root directory that the config was loaded relative to.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the profile with the given name, or an error if it isn't defined.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<ReportProfile, ProfileNotFound> {
        let name = name.as_ref();
        let custom = match name {
            Self::DEFAULT_PROFILE => None,
            other => Some(
                self.other_profiles
                    .get(other)
                    .ok_or_else(|| ProfileNotFound::new(name, self.all_profiles()))?,
            ),
        };
        Ok(ReportProfile::new(name, custom, &self.default_profile))
    }

    fn all_profiles(&self) -> impl Iterator<Item = &str> {
        self.other_profiles
            .keys()
            .map(|key| key.as_str())
            .chain(std::iter::once(Self::DEFAULT_PROFILE))
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ReportConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ReportConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The config crate also reports the key; drop it so that the
                // path is only reported once.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// The settings for a single profile, with custom profiles resolved against the default profile.
#[derive(Clone, Debug)]
pub struct ReportProfile {
    name: String,
    genre: String,
    source_suffix: String,
    report_extension: String,
    timestamp_zone: TimestampZone,
    stack_noise: Regex,
    custom_selection: bool,
}

impl ReportProfile {
    fn new(name: &str, custom: Option<&CustomProfileImpl>, default: &DefaultProfileImpl) -> Self {
        Self {
            name: name.to_owned(),
            genre: custom
                .and_then(|custom| custom.genre.clone())
                .unwrap_or_else(|| default.genre.clone()),
            source_suffix: custom
                .and_then(|custom| custom.source_suffix.clone())
                .unwrap_or_else(|| default.source_suffix.clone()),
            report_extension: custom
                .and_then(|custom| custom.report_extension.clone())
                .unwrap_or_else(|| default.report_extension.clone()),
            timestamp_zone: custom
                .and_then(|custom| custom.timestamp_zone)
                .unwrap_or(default.timestamp_zone),
            stack_noise: custom
                .and_then(|custom| custom.stack_noise.clone())
                .unwrap_or_else(|| default.stack_noise.clone()),
            custom_selection: custom
                .and_then(|custom| custom.custom_selection)
                .unwrap_or(default.custom_selection),
        }
    }

    /// Returns the name of this profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the test framework, e.g. `JUnit`.
    pub fn genre(&self) -> &str {
        &self.genre
    }

    /// Returns the extension of test source files, without the leading dot.
    pub fn source_suffix(&self) -> &str {
        &self.source_suffix
    }

    /// Returns the extension of report files, without the leading dot.
    pub fn report_extension(&self) -> &str {
        &self.report_extension
    }

    /// Returns how suite timestamps are interpreted.
    pub fn timestamp_zone(&self) -> TimestampZone {
        self.timestamp_zone
    }

    /// Returns the regex matching stack trace lines to leave out of failure details.
    pub fn stack_noise(&self) -> &Regex {
        &self.stack_noise
    }

    /// Returns true if the tests were run with custom selection arguments.
    pub fn custom_selection(&self) -> bool {
        self.custom_selection
    }

    /// Returns the options to parse reports with.
    pub fn parser_options(&self) -> ParserOptions {
        let mut options = ParserOptions::new();
        options
            .set_stack_noise(self.stack_noise.clone())
            .set_timestamp_zone(self.timestamp_zone);
        options
    }
}

// This is the form of `ReportConfig` that gets deserialized.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigDeserialize {
    #[serde(rename = "profile")]
    profiles: HashMap<String, CustomProfileImpl>,
}

impl ReportConfigDeserialize {
    fn into_profiles(mut self) -> (DefaultProfileImpl, HashMap<String, CustomProfileImpl>) {
        let p = self
            .profiles
            .remove(ReportConfig::DEFAULT_PROFILE)
            .expect("default profile should exist");
        (DefaultProfileImpl::new(p), self.profiles)
    }
}

#[derive(Clone, Debug)]
struct DefaultProfileImpl {
    genre: String,
    source_suffix: String,
    report_extension: String,
    timestamp_zone: TimestampZone,
    stack_noise: Regex,
    custom_selection: bool,
}

impl DefaultProfileImpl {
    fn new(p: CustomProfileImpl) -> Self {
        Self {
            genre: p.genre.expect("genre present in default profile"),
            source_suffix: p
                .source_suffix
                .expect("source-suffix present in default profile"),
            report_extension: p
                .report_extension
                .expect("report-extension present in default profile"),
            timestamp_zone: p
                .timestamp_zone
                .expect("timestamp-zone present in default profile"),
            stack_noise: p
                .stack_noise
                .expect("stack-noise present in default profile"),
            custom_selection: p
                .custom_selection
                .expect("custom-selection present in default profile"),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    source_suffix: Option<String>,
    #[serde(default)]
    report_extension: Option<String>,
    #[serde(default)]
    timestamp_zone: Option<TimestampZone>,
    #[serde(default, deserialize_with = "deserialize_stack_noise")]
    stack_noise: Option<Regex>,
    #[serde(default)]
    custom_selection: Option<bool>,
}

fn deserialize_stack_noise<'de, D>(deserializer: D) -> Result<Option<Regex>, D::Error>
where
    D: Deserializer<'de>,
{
    let pattern = Option::<String>::deserialize(deserializer)?;
    pattern
        .map(|pattern| {
            ParserOptions::compile_stack_noise(&pattern).map_err(|error| {
                serde::de::Error::custom(format!("invalid stack-noise regex: {error}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::tempdir;
    use indoc::indoc;
    use junit_reader::DEFAULT_STACK_NOISE;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[derive(Default)]
    struct TestConfigWarnings {
        unknown_config_keys: Vec<(Utf8PathBuf, BTreeSet<String>)>,
    }

    impl ConfigWarnings for TestConfigWarnings {
        fn unknown_config_keys(
            &mut self,
            config_file: &Utf8Path,
            _root: &Utf8Path,
            unknown: &BTreeSet<String>,
        ) {
            self.unknown_config_keys
                .push((config_file.to_owned(), unknown.clone()));
        }
    }

    fn write_config(root: &Utf8Path, contents: &str) {
        let config_dir = root.join(".config");
        std::fs::create_dir_all(&config_dir).expect("created .config");
        std::fs::write(config_dir.join("junit-verdict.toml"), contents)
            .expect("wrote config file");
    }

    #[test]
    fn default_profile_matches_parser_defaults() {
        let config = ReportConfig::default_config("/fake/root");
        let profile = config.profile("default").expect("default profile exists");

        assert_eq!(profile.name(), "default");
        assert_eq!(profile.genre(), "JUnit");
        assert_eq!(profile.source_suffix(), "java");
        assert_eq!(profile.report_extension(), "xml");
        assert_eq!(profile.timestamp_zone(), TimestampZone::Auto);
        assert!(!profile.custom_selection());
        assert_eq!(profile.stack_noise().as_str(), DEFAULT_STACK_NOISE);
        assert!(
            profile
                .stack_noise()
                .is_match("java.lang.Exception: boom\n\t... 12 more\n"),
            "stack noise matches at line starts"
        );
    }

    #[test_case(
        "",
        ("JUnit", TimestampZone::Auto, false),
        None
        ; "empty config uses the defaults"
    )]
    #[test_case(
        indoc! {r#"
            [profile.default]
            genre = "TestNG"
            timestamp-zone = "utc"
        "#},
        ("TestNG", TimestampZone::Utc, false),
        None
        ; "overrides the default profile"
    )]
    #[test_case(
        indoc! {r#"
            [profile.default]
            genre = "TestNG"

            [profile.ci]
            timestamp-zone = "local"
            custom-selection = true
        "#},
        ("TestNG", TimestampZone::Auto, false),
        Some(("TestNG", TimestampZone::Local, true))
        ; "custom profile falls back to the default profile"
    )]
    fn profiles_adhere_to_hierarchy(
        config_contents: &str,
        expected_default: (&str, TimestampZone, bool),
        expected_ci: Option<(&str, TimestampZone, bool)>,
    ) {
        let root = tempdir().expect("created temp dir");
        write_config(root.path(), config_contents);

        let config = ReportConfig::from_sources(root.path(), None).expect("config file should parse");

        let summarize = |profile: ReportProfile| {
            (
                profile.genre().to_owned(),
                profile.timestamp_zone(),
                profile.custom_selection(),
            )
        };
        let to_owned = |(genre, zone, custom): (&str, TimestampZone, bool)| {
            (genre.to_owned(), zone, custom)
        };

        assert_eq!(
            summarize(config.profile("default").expect("default profile exists")),
            to_owned(expected_default),
        );
        match expected_ci {
            Some(expected_ci) => assert_eq!(
                summarize(config.profile("ci").expect("ci profile exists")),
                to_owned(expected_ci),
            ),
            None => {
                let error = config.profile("ci").expect_err("ci profile should not exist");
                assert_eq!(error.profile(), "ci");
                assert_eq!(
                    error.to_string(),
                    "profile `ci` not found (known profiles: default)"
                );
            }
        }
    }

    #[test]
    fn custom_stack_noise_is_passed_to_the_parser() {
        let root = tempdir().expect("created temp dir");
        write_config(
            root.path(),
            indoc! {r#"
                [profile.internal]
                stack-noise = '^\tat myorg[.]internal.*\n'
            "#},
        );

        let config = ReportConfig::from_sources(root.path(), None).expect("config file should parse");
        let options = config
            .profile("internal")
            .expect("internal profile exists")
            .parser_options();
        assert_eq!(options.stack_noise().as_str(), r"^\tat myorg[.]internal.*\n");
        assert_eq!(options.timestamp_zone(), TimestampZone::Auto);
    }

    #[test]
    fn invalid_stack_noise() {
        let root = tempdir().expect("created temp dir");
        write_config(
            root.path(),
            indoc! {r#"
                [profile.ci]
                stack-noise = "at (unclosed"
            "#},
        );

        let error = ReportConfig::from_sources(root.path(), None)
            .expect_err("invalid regex should fail to parse");
        assert_eq!(
            error.config_file(),
            root.path().join(".config/junit-verdict.toml").as_path()
        );
        match error.kind() {
            ConfigParseErrorKind::DeserializeError(error) => {
                assert_eq!(error.path().to_string(), "profile.ci.stack-noise");
                assert!(
                    error.inner().to_string().contains("invalid stack-noise regex"),
                    "unexpected error: {}",
                    error.inner()
                );
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn invalid_timestamp_zone() {
        let root = tempdir().expect("created temp dir");
        write_config(
            root.path(),
            indoc! {r#"
                [profile.default]
                timestamp-zone = "mars"
            "#},
        );

        let error = ReportConfig::from_sources(root.path(), None)
            .expect_err("unknown zone should fail to parse");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::DeserializeError(_)),
            "unexpected error kind: {:?}",
            error.kind()
        );
    }

    #[test]
    fn explicit_config_file_is_required() {
        let root = tempdir().expect("created temp dir");
        let config_file = root.path().join("missing.toml");

        let error = ReportConfig::from_sources(root.path(), Some(&config_file))
            .expect_err("missing explicit config file should fail");
        assert_eq!(error.config_file(), config_file.as_path());
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::BuildError(_)),
            "unexpected error kind: {:?}",
            error.kind()
        );
    }

    #[test]
    fn unknown_keys_are_reported() {
        let root = tempdir().expect("created temp dir");
        write_config(
            root.path(),
            indoc! {r#"
                [profile.default]
                genre = "JUnit"
                retries = 3

                [profile.ci]
                source-sufix = "kt"
            "#},
        );

        let mut warnings = TestConfigWarnings::default();
        ReportConfig::from_sources_with_warnings(root.path(), None, &mut warnings)
            .expect("config file should parse");

        assert_eq!(
            warnings.unknown_config_keys,
            vec![(
                root.path().join(".config/junit-verdict.toml"),
                BTreeSet::from([
                    "profile.ci.source-sufix".to_owned(),
                    "profile.default.retries".to_owned(),
                ])
            )]
        );
    }
}
