//! Report writer (§4.D): an append-only, line-oriented text stream.
//!
//! One head line precedes any number of tail lines. Lines are always
//! terminated with LF on write, even on Windows — the reader accepts either,
//! but the writer picks one encoding so two runs of the same walk produce
//! byte-identical files.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{DupfilesError, Result};
use crate::model::ReportHead;

pub struct ReportWriter {
    out: BufWriter<File>,
    path: Utf8PathBuf,
    separator: char,
    wrote_head: bool,
}

impl ReportWriter {
    /// Opens `path` for writing. Fails with `AlreadyExists` if the file is
    /// already there and `overwrite` is false.
    pub fn create(path: &Utf8Path, overwrite: bool) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if overwrite {
            options.truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                DupfilesError::AlreadyExists { path: path.to_path_buf() }
            } else {
                DupfilesError::io(path.to_path_buf(), e)
            }
        })?;
        Ok(ReportWriter { out: BufWriter::new(file), path: path.to_path_buf(), separator: '/', wrote_head: false })
    }

    pub fn write_head(&mut self, head: &ReportHead) -> Result<()> {
        if self.wrote_head {
            return Err(DupfilesError::InvariantViolation { message: "report head already written".to_string() });
        }
        let (major, minor, patch) = head.format_version;
        writeln!(
            self.out,
            "{major}.{minor}.{patch}\t{}\t{}\t{}\t{}\t{}\t{}",
            head.timestamp,
            head.algorithm_name,
            head.mode.as_str(),
            head.path_separator,
            head.node_name,
            head.base_path,
        )
        .map_err(|e| DupfilesError::io(self.path.clone(), e))?;
        self.separator = head.path_separator;
        self.wrote_head = true;
        Ok(())
    }

    pub fn write_tail(&mut self, line: &crate::model::ReportTailLine) -> Result<()> {
        if !self.wrote_head {
            return Err(DupfilesError::InvariantViolation { message: "tail line written before head".to_string() });
        }
        let rendered = self.render_path(&line.path);
        let hash_hex = line.hash.to_hex();
        let node_type = line.node_type.as_char();
        let size = line.size;
        writeln!(self.out, "{hash_hex}\t{node_type}\t{size}\t{rendered}").map_err(|e| DupfilesError::io(self.path.clone(), e))
    }

    fn render_path(&self, path: &Utf8Path) -> String {
        let as_str = path.as_str();
        let as_str = if as_str.is_empty() { "." } else { as_str };
        if self.separator == '/' {
            as_str.to_string()
        } else {
            as_str.replace('/', &self.separator.to_string())
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.out.flush().map_err(|e| DupfilesError::io(self.path.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashValue;
    use crate::model::{NodeType, ReportTailLine, FORMAT_VERSION, HashMode};
    use tempfile::tempdir;

    fn head() -> ReportHead {
        ReportHead {
            format_version: FORMAT_VERSION,
            timestamp: 1_700_000_000,
            algorithm_name: "fnv-1a-128".to_string(),
            mode: HashMode::Three,
            path_separator: '/',
            node_name: "test".to_string(),
            base_path: Utf8PathBuf::from("/tmp/example"),
        }
    }

    fn tail(node_type: NodeType, size: u64, path: &str) -> ReportTailLine {
        ReportTailLine { hash: HashValue(vec![0xaa]), node_type, size, path: Utf8PathBuf::from(path) }
    }

    #[test]
    fn refuses_to_overwrite_by_default() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("report.txt")).unwrap();
        ReportWriter::create(&path, false).unwrap().close().unwrap();
        let err = ReportWriter::create(&path, false).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn overwrite_true_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("report.txt")).unwrap();
        let mut w = ReportWriter::create(&path, false).unwrap();
        w.write_head(&head()).unwrap();
        w.write_tail(&tail(NodeType::File, 3, "a.txt")).unwrap();
        w.close().unwrap();

        let mut w2 = ReportWriter::create(&path, true).unwrap();
        w2.write_head(&head()).unwrap();
        w2.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn tail_before_head_is_rejected() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("report.txt")).unwrap();
        let mut w = ReportWriter::create(&path, false).unwrap();
        let err = w.write_tail(&tail(NodeType::File, 0, "a.txt")).unwrap_err();
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn root_path_is_written_as_dot() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("report.txt")).unwrap();
        let mut w = ReportWriter::create(&path, false).unwrap();
        w.write_head(&head()).unwrap();
        w.write_tail(&tail(NodeType::Dir, 0, "")).unwrap();
        w.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().last().unwrap().ends_with('.'));
    }

    #[test]
    fn non_slash_separator_is_applied_to_written_paths() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("report.txt")).unwrap();
        let mut w = ReportWriter::create(&path, false).unwrap();
        let mut h = head();
        h.path_separator = '\\';
        w.write_head(&h).unwrap();
        w.write_tail(&tail(NodeType::File, 1, "sub/a.txt")).unwrap();
        w.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().last().unwrap().contains("sub\\a.txt"));
    }
}
