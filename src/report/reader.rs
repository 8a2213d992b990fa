//! Report reader (§4.E): a streaming, line-oriented parser. Never buffers the
//! whole file — callers iterating a multi-gigabyte report hold only the
//! current line and the accumulated position counters.
//!
//! Accepts LF or CRLF line endings on read, even though the writer only ever
//! emits LF, since reports are plain text and may pass through tooling that
//! normalizes line endings.

use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{DupfilesError, Result};
use crate::hash::HashValue;
use crate::model::{HashMode, NodeType, PositionMetadata, ReportHead, ReportTailLine};

pub struct ReportReader {
    inner: BufReader<File>,
    path: Utf8PathBuf,
    head: ReportHead,
    line_no: u64,
    byte_offset: u64,
}

fn strip_eol(line: &str) -> &str {
    line.strip_suffix('\n').map(|s| s.strip_suffix('\r').unwrap_or(s)).unwrap_or(line)
}

fn invalid(path: &Utf8Path, line: u64, byte_offset: u64, message: impl Into<String>) -> DupfilesError {
    DupfilesError::InvalidReport { path: path.to_path_buf(), line, byte_offset, message: message.into() }
}

fn parse_version(path: &Utf8Path, line_no: u64, byte_offset: u64, raw: &str) -> Result<(u32, u32, u32)> {
    let mut parts = raw.splitn(3, '.');
    let (Some(major), Some(minor), Some(patch)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid(path, line_no, byte_offset, format!("malformed format version '{raw}'")));
    };
    let parse = |s: &str| s.parse::<u32>().map_err(|_| invalid(path, line_no, byte_offset, format!("non-numeric version component '{s}'")));
    Ok((parse(major)?, parse(minor)?, parse(patch)?))
}

impl ReportReader {
    pub fn open(path: &Utf8Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DupfilesError::io(path.to_path_buf(), e))?;
        let mut inner = BufReader::new(file);

        let mut raw_line = String::new();
        let n = inner.read_line(&mut raw_line).map_err(|e| DupfilesError::io(path.to_path_buf(), e))?;
        if n == 0 {
            return Err(invalid(path, 1, 0, "report has no head line"));
        }
        let fields: Vec<&str> = strip_eol(&raw_line).split('\t').collect();
        let [version, timestamp, algorithm_name, mode, separator, node_name, base_path] = fields.as_slice() else {
            return Err(invalid(path, 1, 0, format!("head line must have 7 tab-separated fields, found {}", fields.len())));
        };

        let format_version = parse_version(path, 1, 0, version)?;
        let timestamp: u64 =
            timestamp.parse().map_err(|_| invalid(path, 1, 0, format!("non-numeric timestamp '{timestamp}'")))?;
        let mode: HashMode = mode.parse().map_err(|_| invalid(path, 1, 0, format!("unknown mode '{mode}'")))?;
        let separator =
            separator.chars().next().ok_or_else(|| invalid(path, 1, 0, "empty path separator field"))?;

        let head = ReportHead {
            format_version,
            timestamp,
            algorithm_name: algorithm_name.to_string(),
            mode,
            path_separator: separator,
            node_name: node_name.to_string(),
            base_path: Utf8PathBuf::from(*base_path),
        };

        Ok(ReportReader { inner, path: path.to_path_buf(), head, line_no: 1, byte_offset: n as u64 })
    }

    pub fn head(&self) -> &ReportHead {
        &self.head
    }

    /// Reads the next tail line, or `None` at end of file. Returns the line
    /// together with its position (line number, byte offset of the line's
    /// first byte) for callers that need to seek back (`find --long`).
    pub fn next_tail(&mut self) -> Result<Option<(ReportTailLine, PositionMetadata)>> {
        let mut raw_line = String::new();
        let line_start = self.byte_offset;
        let n = self.inner.read_line(&mut raw_line).map_err(|e| DupfilesError::io(self.path.clone(), e))?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        self.byte_offset += n as u64;

        let trimmed = strip_eol(&raw_line);
        let fields: Vec<&str> = trimmed.splitn(4, '\t').collect();
        let [hash_hex, node_type, size, path] = fields.as_slice() else {
            return Err(invalid(&self.path, self.line_no, line_start, format!(
                "tail line must have 4 tab-separated fields, found {}",
                fields.len()
            )));
        };

        let hash = HashValue::from_hex(hash_hex)
            .ok_or_else(|| invalid(&self.path, self.line_no, line_start, format!("malformed hex digest '{hash_hex}'")))?;
        let node_type = node_type
            .as_bytes()
            .first()
            .copied()
            .and_then(NodeType::from_tag)
            .ok_or_else(|| invalid(&self.path, self.line_no, line_start, format!("unknown node type '{node_type}'")))?;
        let size: u64 =
            size.parse().map_err(|_| invalid(&self.path, self.line_no, line_start, format!("non-numeric size '{size}'")))?;

        let path = if *path == "." { String::new() } else { path.to_string() };
        let path = if self.head.path_separator == '/' { path } else { path.replace(self.head.path_separator, "/") };

        Ok(Some((
            ReportTailLine { hash, node_type, size, path: Utf8PathBuf::from(path) },
            PositionMetadata { line_no: self.line_no, byte_offset: line_start },
        )))
    }
}

impl Iterator for ReportReader {
    type Item = Result<(ReportTailLine, PositionMetadata)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_tail() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
