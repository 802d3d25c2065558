//! Pretty JSON output for the index, word counts and query results.
//!
//! Output is tab-indented with keys in sorted order (every map written here is a
//! `BTreeMap`), and floating point values always carry 8 decimal places.

use crate::index::{InvertedIndex, SearchResult};
use anyhow::Result;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

struct FixedScoreFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl FixedScoreFormatter<'_> {
    fn new() -> Self {
        Self { inner: PrettyFormatter::with_indent(b"\t") }
    }
}

impl Formatter for FixedScoreFormatter<'_> {
    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        write!(writer, "{value:.8}")
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

pub fn to_writer<W: io::Write, T: ?Sized + Serialize>(writer: W, value: &T) -> Result<()> {
    let mut ser = Serializer::with_formatter(writer, FixedScoreFormatter::new());
    value.serialize(&mut ser)?;
    Ok(())
}

pub fn to_string<T: ?Sized + Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    to_writer(&mut buf, value)?;
    Ok(String::from_utf8(buf)?)
}

fn write_file<T: ?Sized + Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    to_writer(&mut out, value)?;
    out.flush()?;
    Ok(())
}

/// Writes `word -> location -> [positions]`.
pub fn write_index(index: &InvertedIndex, path: &Path) -> Result<()> {
    write_file(path, index.postings())
}

/// Writes `location -> word count`.
pub fn write_counts(index: &InvertedIndex, path: &Path) -> Result<()> {
    write_file(path, index.counts())
}

/// Writes `query -> [{count, score, where}]`.
pub fn write_results(results: &BTreeMap<String, Vec<SearchResult>>, path: &Path) -> Result<()> {
    write_file(path, results)
}
