//! Property sinks: where resolved metadata ends up.

use std::collections::BTreeMap;
use std::io::Write;

use crate::error::Result;

/// Prefixes used when none are configured.
pub const DEFAULT_PREFIXES: &[&str] = &["gitmeta", "git"];

/// Accepts `(key, value)` pairs.
pub trait PropertySink {
    fn set_property(&mut self, key: &str, value: &str) -> Result<()>;
}

impl PropertySink for BTreeMap<String, String> {
    fn set_property(&mut self, key: &str, value: &str) -> Result<()> {
        self.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Republishes every property under each prefix, as `<prefix>.<key>`.
///
/// Stops at the first failing write, so keys under earlier prefixes may
/// already be in the inner sink. [`WriterSink`] holds everything until
/// [`WriterSink::finish`], which keeps the output all-or-nothing.
pub struct Prefixed<'a, S: ?Sized> {
    sink: &'a mut S,
    prefixes: &'a [String],
}

impl<'a, S: PropertySink + ?Sized> Prefixed<'a, S> {
    pub fn new(sink: &'a mut S, prefixes: &'a [String]) -> Self {
        Self { sink, prefixes }
    }
}

impl<S: PropertySink + ?Sized> PropertySink for Prefixed<'_, S> {
    fn set_property(&mut self, key: &str, value: &str) -> Result<()> {
        for prefix in self.prefixes {
            self.sink.set_property(&format!("{prefix}.{key}"), value)?;
        }
        Ok(())
    }
}

/// Text rendering used by [`WriterSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyFormat {
    /// `key=value`
    Properties,
    /// `cargo:rustc-env=KEY=value`, for build scripts.
    Cargo,
}

/// Renders one line per property and writes them all to `W` on [`finish`].
///
/// Nothing reaches `W` if the sink is dropped without finishing.
///
/// [`finish`]: WriterSink::finish
pub struct WriterSink<W: Write> {
    out: W,
    format: PropertyFormat,
    pending: String,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W, format: PropertyFormat) -> Self {
        Self {
            out,
            format,
            pending: String::new(),
        }
    }

    /// Write the buffered lines in one call and flush.
    pub fn finish(mut self) -> Result<W> {
        self.out.write_all(self.pending.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> PropertySink for WriterSink<W> {
    fn set_property(&mut self, key: &str, value: &str) -> Result<()> {
        let line = match self.format {
            PropertyFormat::Properties => format!("{key}={value}\n"),
            PropertyFormat::Cargo => format!("cargo:rustc-env={}={value}\n", env_var_name(key)),
        };
        self.pending.push_str(&line);
        Ok(())
    }
}

/// `tag.describe` -> `TAG_DESCRIBE`.
pub fn env_var_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}
