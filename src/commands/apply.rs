//! `apply`: extract a subdir slice of a report into its own report (§6).

use std::io::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use camino::Utf8PathBuf;
use clap::Args;

use crate::context::Context;
use crate::error::{DupfilesError, Result};
use crate::model::{ReportHead, FORMAT_VERSION};
use crate::report::{ReportReader, ReportWriter};
use crate::tree::{flatten_post_order, reconstruct};

#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// Existing report to slice.
    pub input: Utf8PathBuf,

    /// Where to write the sliced report.
    pub output: Utf8PathBuf,

    /// Base-relative subpath to extract; becomes the new report's root.
    pub subpath: Utf8PathBuf,

    #[arg(long)]
    pub overwrite: bool,
}

impl ApplyCommand {
    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        let mut reader = ReportReader::open(&self.input)?;
        let head = reader.head().clone();
        let mut lines = Vec::new();
        while let Some((line, _position)) = reader.next_tail()? {
            lines.push(line);
        }
        let root = reconstruct(lines);

        let subtree = root.find(self.subpath.as_str()).ok_or_else(|| DupfilesError::NotFound { path: self.subpath.clone() })?;
        let sliced_lines = flatten_post_order(subtree);

        let mut writer = ReportWriter::create(&self.output, self.overwrite)?;
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let new_base_path =
            if self.subpath.as_str().is_empty() { head.base_path.clone() } else { head.base_path.join(&self.subpath) };
        writer.write_head(&ReportHead {
            format_version: FORMAT_VERSION,
            timestamp,
            algorithm_name: head.algorithm_name,
            mode: head.mode,
            path_separator: head.path_separator,
            node_name: subtree.basename.clone(),
            base_path: new_base_path,
        })?;
        for line in &sliced_lines {
            writer.write_tail(line)?;
        }
        writer.close()?;

        if !ctx.json {
            let _ = writeln!(ctx.out, "wrote {} ({} nodes)", self.output, sliced_lines.len());
        } else {
            let _ = writeln!(ctx.out, "{}", serde_json::json!({"output": self.output.as_str(), "nodes": sliced_lines.len()}));
        }
        Ok(0)
    }
}
