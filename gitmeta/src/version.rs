//! `--version` output for the command-line tools.

use std::fmt;

/// What a binary knows about its own build: package fields plus the
/// git metadata injected by the build script. Empty fields are omitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildInfo<'a> {
    pub tool: &'a str,
    pub version: &'a str,
    pub authors: &'a str,
    pub repository: &'a str,
    pub describe: &'a str,
    pub branch: &'a str,
    pub commit: &'a str,
}

impl fmt::Display for BuildInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.tool, self.version)?;
        if !self.authors.is_empty() {
            // CARGO_PKG_AUTHORS separates authors with ':'
            writeln!(f, "Copyright (c) {}", self.authors.replace(':', ", "))?;
        }
        writeln!(f, "License: GNU AGPL v3 (AGPL-3.0-only)")?;
        if !self.repository.is_empty() {
            writeln!(f, "{}", self.repository)?;
        }

        let build = [
            ("Describe", self.describe),
            ("Branch", self.branch),
            ("Commit", self.commit),
        ];
        if build.iter().any(|(_, v)| !v.is_empty()) {
            writeln!(f)?;
            for (label, value) in build.iter().filter(|(_, v)| !v.is_empty()) {
                writeln!(f, "\t{:<10}{value}", format!("{label}:"))?;
            }
        }
        Ok(())
    }
}
