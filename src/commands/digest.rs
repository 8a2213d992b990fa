//! `digest` / `hash`: the digest of a single file or directory (§6).

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Args;

use crate::config;
use crate::context::Context;
use crate::error::{DupfilesError, Result};
use crate::hash::{HashRegistry, NodeHasher};
use crate::walker::{self, ExcludeRules, TraversalOrder, WalkConfig};

#[derive(Args, Debug)]
pub struct DigestCommand {
    pub path: Utf8PathBuf,

    #[arg(long)]
    pub algorithm: Option<String>,

    #[arg(long)]
    pub mode: Option<String>,
}

impl DigestCommand {
    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        let algorithm = config::resolve_str(
            self.algorithm.as_deref(),
            &ctx.env,
            "DUPFILES_HASH_ALGORITHM",
            HashRegistry::default_name(),
        );
        HashRegistry::resolve(&algorithm)?;

        let mode = config::resolve_mode(self.mode.as_deref(), &ctx.env)?;

        let meta = std::fs::metadata(&self.path).map_err(|e| DupfilesError::io(self.path.clone(), e))?;
        let hash = if meta.is_file() {
            let hasher = NodeHasher::new(&algorithm, mode)?;
            let mut file = std::fs::File::open(&self.path).map_err(|e| DupfilesError::io(self.path.clone(), e))?;
            let content_hash = hasher.hash_file_content(&mut file)?;
            let basename = self.path.file_name().unwrap_or("");
            hasher.hash_file(basename, &content_hash)
        } else {
            let base_path = self.path.canonicalize_utf8().map_err(|e| DupfilesError::io(self.path.clone(), e))?;
            let config = WalkConfig {
                base_path,
                order: TraversalOrder::Dfs,
                excludes: ExcludeRules::default(),
                mode,
                algorithm: algorithm.clone(),
                workers: 1,
                ignore_perm_errors: false,
                skip_empty_dirs: false,
            };
            let handle = walker::walk(config)?;
            let mut root_hash = None;
            for line in handle.receiver.iter() {
                if line.path.as_str().is_empty() {
                    root_hash = Some(line.hash);
                }
            }
            handle.join()?;
            root_hash.ok_or_else(|| DupfilesError::InvariantViolation { message: "walk produced no root line".to_string() })?
        };

        if ctx.json {
            let _ = writeln!(ctx.out, "{}", serde_json::json!({"path": self.path.as_str(), "algorithm": algorithm, "hash": hash.to_hex()}));
        } else {
            let _ = writeln!(ctx.out, "{}", hash.to_hex());
        }
        Ok(0)
    }
}
