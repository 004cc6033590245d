// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use std::{collections::HashMap, fmt};

/// Where a testcase is defined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    /// The file containing the testcase.
    pub file: SourceFile,

    /// The line in `file`, or 0 if not known.
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// The file part of a [`SourceLocation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceFile {
    /// The source file was found on disk.
    Path(Utf8PathBuf),

    /// The source file wasn't found, so the location names the class instead.
    Classname(String),
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFile::Path(path) => write!(f, "{path}"),
            SourceFile::Classname(classname) => f.write_str(classname),
        }
    }
}

/// Maps classnames to the source files that define them.
///
/// A class `myorg.MyTests$Nested` is expected at `myorg/MyTests.<suffix>`
/// under the input directory. Whether each candidate exists is only checked
/// once.
#[derive(Clone, Debug)]
pub struct SourceLocator {
    input_dir: Utf8PathBuf,
    source_suffix: String,
    exists: HashMap<Utf8PathBuf, bool>,
}

impl SourceLocator {
    /// Creates a new locator for sources under `input_dir` with the given extension.
    pub fn new(input_dir: impl Into<Utf8PathBuf>, source_suffix: impl Into<String>) -> Self {
        Self {
            input_dir: input_dir.into(),
            source_suffix: source_suffix.into(),
            exists: HashMap::new(),
        }
    }

    /// Returns the directory sources are looked up in.
    pub fn input_dir(&self) -> &Utf8Path {
        &self.input_dir
    }

    /// Returns the path where the source for `classname` is expected.
    pub fn source_path(&self, classname: &str) -> Utf8PathBuf {
        // Nested classes are defined in the file of their outermost class.
        let outer = classname.split('$').next().unwrap_or(classname);
        let mut path = self.input_dir.join(outer.replace('.', "/"));
        path.set_extension(&self.source_suffix);
        path
    }

    /// Returns the location of a testcase in `classname`, falling back to the
    /// classname itself if its source file can't be found.
    pub fn locate(&mut self, classname: &str, line: Option<u32>) -> SourceLocation {
        let path = self.source_path(classname);
        let exists = *self
            .exists
            .entry(path.clone())
            .or_insert_with(|| path.is_file());

        let file = if exists {
            SourceFile::Path(path)
        } else {
            SourceFile::Classname(classname.to_owned())
        };
        SourceLocation {
            file,
            line: line.unwrap_or(0),
        }
    }
}
