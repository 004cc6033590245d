// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Utilities for pluralizing words.
pub(crate) mod plural {
    /// Returns "testcase" if `count` is 1, otherwise "testcases".
    pub(crate) fn testcases_str(count: usize) -> &'static str {
        if count == 1 { "testcase" } else { "testcases" }
    }
}

/// Formats a multi-line block of text so that every line starts on a new,
/// indented line of its own.
pub(crate) fn indent_block(text: &str) -> String {
    const PREFIX: &str = "\n  ";
    let mut out = String::with_capacity(text.len() + PREFIX.len());
    for line in text.split('\n') {
        out.push_str(PREFIX);
        out.push_str(line);
    }
    out
}
