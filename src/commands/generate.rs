//! `report` / `generate`: walk a base path and write a report (§4.C/D).

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use camino::Utf8PathBuf;
use clap::Args;

use crate::config;
use crate::context::{Context, EnvSnapshot};
use crate::error::{DupfilesError, Result};
use crate::hash::HashRegistry;
use crate::model::{ReportHead, FORMAT_VERSION};
use crate::report::ReportWriter;
use crate::walker::{self, ExcludeRules, TraversalOrder, WalkConfig};

#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Root of the tree to hash.
    pub base_path: Utf8PathBuf,

    /// Where to write the report. Defaults to `<base_path basename>.fsr`.
    #[arg(long)]
    pub output: Option<Utf8PathBuf>,

    /// Hash algorithm name (see `hashalgos`).
    #[arg(long)]
    pub algorithm: Option<String>,

    /// `three` (structure-sensitive) or `content` (content-only).
    #[arg(long)]
    pub mode: Option<String>,

    /// Visit directories breadth-first instead of depth-first. Scheduling
    /// only — doesn't change output.
    #[arg(long)]
    pub bfs: bool,

    /// Visit directories depth-first. The default, but available explicitly
    /// to override a `DUPFILES_BFS=true` environment default.
    #[arg(long)]
    pub dfs: bool,

    /// Treat directories that end up with no children (after exclusions) as
    /// excluded themselves, instead of emitting them as empty nodes.
    #[arg(long = "empty-mode")]
    pub empty_mode: bool,

    /// Basenames to exclude, exact match. Repeatable.
    #[arg(long = "exclude-basename")]
    pub exclude_basename: Vec<String>,

    /// Basename regexes to exclude. Repeatable.
    #[arg(long = "exclude-basename-regex")]
    pub exclude_basename_regex: Vec<String>,

    /// Base-relative subtrees to exclude entirely. Repeatable.
    #[arg(long = "exclude-tree")]
    pub exclude_tree: Vec<Utf8PathBuf>,

    /// Worker thread count. Defaults to the logical CPU count.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Overwrite the output file if it already exists.
    #[arg(long)]
    pub overwrite: bool,

    /// Skip nodes that raise `PermissionDenied` instead of failing the walk.
    #[arg(long)]
    pub ignore_perm_errors: bool,
}

/// Resolves traversal order from two independent boolean knobs, `--bfs`/
/// `DUPFILES_BFS` and `--dfs`/`DUPFILES_DFS` (§6 documents both). An explicit
/// CLI flag wins outright; otherwise `DUPFILES_BFS` wins over `DUPFILES_DFS`
/// when both are set, matching `config::resolve_bool`'s CLI-over-env
/// precedence applied to the "true" side of each knob. Falls back to Dfs.
fn resolve_order(bfs_flag: bool, dfs_flag: bool, env: &EnvSnapshot) -> TraversalOrder {
    if bfs_flag {
        return TraversalOrder::Bfs;
    }
    if dfs_flag {
        return TraversalOrder::Dfs;
    }
    if config::resolve_bool(None, env, "DUPFILES_BFS", false) {
        return TraversalOrder::Bfs;
    }
    if config::resolve_bool(None, env, "DUPFILES_DFS", false) {
        return TraversalOrder::Dfs;
    }
    TraversalOrder::Dfs
}

impl GenerateCommand {
    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        let algorithm = config::resolve_str(
            self.algorithm.as_deref(),
            &ctx.env,
            "DUPFILES_HASH_ALGORITHM",
            HashRegistry::default_name(),
        );
        HashRegistry::resolve(&algorithm)?;

        let mode = config::resolve_mode(self.mode.as_deref(), &ctx.env)?;

        let order = resolve_order(self.bfs, self.dfs, &ctx.env);

        let skip_empty_dirs = config::resolve_bool(
            if self.empty_mode { Some(true) } else { None },
            &ctx.env,
            "DUPFILES_EMPTY_MODE",
            false,
        );

        let overwrite =
            config::resolve_bool(if self.overwrite { Some(true) } else { None }, &ctx.env, "DUPFILES_OVERWRITE", false);
        let ignore_perm_errors = config::resolve_bool(
            if self.ignore_perm_errors { Some(true) } else { None },
            &ctx.env,
            "DUPFILES_IGNORE_PERM_ERRORS",
            false,
        );
        let workers = config::resolve_workers(self.workers, &ctx.env, num_cpus::get());

        let base_path = self.base_path.canonicalize_utf8().map_err(|e| DupfilesError::io(self.base_path.clone(), e))?;
        let basename = base_path.file_name().unwrap_or("root").to_string();

        let default_output = format!("{basename}.fsr");
        let output = match &self.output {
            Some(p) => p.clone(),
            None => Utf8PathBuf::from(config::resolve_str(None, &ctx.env, "DUPFILES_OUTPUT", &default_output)),
        };

        let mut excludes = ExcludeRules {
            basename: self.exclude_basename.iter().cloned().collect(),
            basename_regex: self
                .exclude_basename_regex
                .iter()
                .map(|pattern| regex::Regex::new(pattern).map_err(|e| DupfilesError::BadArgument { message: e.to_string() }))
                .collect::<Result<Vec<_>>>()?,
            tree: self.exclude_tree.iter().cloned().collect(),
        };

        // The report's own output file must not try to hash itself if it
        // lands inside base_path.
        if let Ok(output_abs) = output.canonicalize_utf8() {
            if let Ok(rel) = output_abs.strip_prefix(&base_path) {
                excludes.tree.insert(rel.to_path_buf());
            }
        } else if let Some(parent) = output.parent() {
            if let Ok(parent_abs) = parent.canonicalize_utf8() {
                if let Ok(rel) = parent_abs.strip_prefix(&base_path) {
                    let joined = if rel.as_str().is_empty() {
                        Utf8PathBuf::from(output.file_name().unwrap_or_default())
                    } else {
                        rel.join(output.file_name().unwrap_or_default())
                    };
                    excludes.tree.insert(joined);
                }
            }
        }

        let config = WalkConfig {
            base_path: base_path.clone(),
            order,
            excludes,
            mode,
            algorithm: algorithm.clone(),
            workers,
            ignore_perm_errors,
            skip_empty_dirs,
        };

        let handle = walker::walk(config)?;

        let mut writer = ReportWriter::create(&output, overwrite)?;
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        writer.write_head(&ReportHead {
            format_version: FORMAT_VERSION,
            timestamp,
            algorithm_name: algorithm,
            mode,
            path_separator: '/',
            node_name: basename,
            base_path: base_path.clone(),
        })?;

        for line in handle.receiver.iter() {
            writer.write_tail(&line)?;
        }
        let warnings = handle.join()?;
        writer.close()?;

        for warning in &warnings {
            let _ = writeln!(ctx.err, "warning: {warning}");
        }
        if !ctx.json {
            let _ = writeln!(ctx.out, "wrote {output}");
        } else {
            let _ = writeln!(ctx.out, "{}", serde_json::json!({"output": output.as_str(), "warnings": warnings}));
        }
        Ok(0)
    }
}
