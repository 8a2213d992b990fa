//! `stats`: single-pass statistics over one report (§4.H).

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Args;

use crate::context::Context;
use crate::error::Result;
use crate::report::ReportReader;
use crate::stats::StatsAccumulator;

#[derive(Args, Debug)]
pub struct StatsCommand {
    pub report: Utf8PathBuf,
}

impl StatsCommand {
    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        let mut reader = ReportReader::open(&self.report)?;
        let mut accumulator = StatsAccumulator::new();
        while let Some((line, _position)) = reader.next_tail()? {
            accumulator.ingest(&line)?;
        }
        let stats = accumulator.finish();

        if ctx.json {
            let payload = serde_json::json!({
                "dirs": stats.counts.dirs,
                "files": stats.counts.files,
                "symlinks": stats.counts.symlinks,
                "devices": stats.counts.devices,
                "fifos": stats.counts.fifos,
                "sockets": stats.counts.sockets,
                "max_depth": stats.max_depth,
                "total_size": stats.total_size,
                "top_10_biggest_files": stats.top_10_biggest_files.iter().map(|f| {
                    serde_json::json!({"path": f.path.as_str(), "size": f.size})
                }).collect::<Vec<_>>(),
            });
            let _ = writeln!(ctx.out, "{payload}");
        } else {
            let _ = writeln!(ctx.out, "dirs: {}", stats.counts.dirs);
            let _ = writeln!(ctx.out, "files: {}", stats.counts.files);
            let _ = writeln!(ctx.out, "symlinks: {}", stats.counts.symlinks);
            let _ = writeln!(ctx.out, "devices: {}", stats.counts.devices);
            let _ = writeln!(ctx.out, "fifos: {}", stats.counts.fifos);
            let _ = writeln!(ctx.out, "sockets: {}", stats.counts.sockets);
            let _ = writeln!(ctx.out, "max_depth: {}", stats.max_depth);
            let _ = writeln!(ctx.out, "total_size: {}", stats.total_size);
            let _ = writeln!(ctx.out, "top {} biggest files:", stats.top_10_biggest_files.len());
            for f in &stats.top_10_biggest_files {
                let _ = writeln!(ctx.out, "  {} {}", f.size, f.path);
            }
        }
        Ok(0)
    }
}
