//! `diff`: cross-report diff engine (§4.G).

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Args;

use crate::context::Context;
use crate::diff::{self, DifferenceReason, DiffPair};
use crate::error::{DupfilesError, Result};

#[derive(Args, Debug)]
pub struct DiffCommand {
    /// `report=base_path` pairs. At least two are required for a meaningful diff.
    #[arg(required = true, num_args = 2..)]
    pub pairs: Vec<String>,

    /// Cluster by `(hash, type, size, child_count)` and explain why clusters
    /// differ, instead of the plain presence/absence view.
    #[arg(long)]
    pub clustered: bool,
}

impl DiffCommand {
    fn parse_pairs(&self) -> Result<Vec<DiffPair>> {
        self.pairs
            .iter()
            .map(|raw| {
                let (report, base) = raw.split_once('=').ok_or_else(|| DupfilesError::BadArgument {
                    message: format!("expected `report=base_path`, got '{raw}'"),
                })?;
                Ok(DiffPair { report_path: Utf8PathBuf::from(report), base_path: Utf8PathBuf::from(base) })
            })
            .collect()
    }

    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        let pairs = self.parse_pairs()?;

        if self.clustered {
            let clusters = diff::diff_clustered(&pairs)?;
            if ctx.json {
                let payload: Vec<_> = clusters
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "basename": c.basename,
                            "reason": c.reason.map(reason_str),
                            "pairs": c.pairs.iter().map(|p| serde_json::json!({
                                "pair_index": p.pair_index,
                                "hash": p.hash.to_hex(),
                                "size": p.size,
                                "child_count": p.child_count,
                            })).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                let _ = writeln!(ctx.out, "{}", serde_json::json!(payload));
            } else {
                for c in &clusters {
                    match c.reason {
                        Some(reason) => {
                            let _ = writeln!(ctx.out, "~ {} (differs by {})", c.basename, reason_str(reason));
                        }
                        None if c.pairs.len() == pairs.len() => {
                            let _ = writeln!(ctx.out, "= {}", c.basename);
                        }
                        None => {
                            let _ = writeln!(ctx.out, "~ {} (present in {}/{} pairs)", c.basename, c.pairs.len(), pairs.len());
                        }
                    }
                }
            }
        } else {
            let result = diff::diff(&pairs)?;
            for not_found in &result.not_found {
                let _ = writeln!(ctx.err, "pair {}: base_path not found", not_found.pair_index);
            }
            if ctx.json {
                let payload: Vec<_> = result
                    .entries
                    .iter()
                    .map(|e| serde_json::json!({"basename": e.basename, "hash": e.hash.to_hex(), "present_in": e.present_in}))
                    .collect();
                let _ = writeln!(ctx.out, "{}", serde_json::json!(payload));
            } else {
                for entry in &result.entries {
                    let markers: String =
                        entry.present_in.iter().map(|present| if *present { '+' } else { '-' }).collect();
                    let _ = writeln!(ctx.out, "{markers} {}", entry.basename);
                }
            }
        }

        Ok(0)
    }
}

fn reason_str(reason: DifferenceReason) -> &'static str {
    match reason {
        DifferenceReason::Size => "size",
        DifferenceReason::NodeType => "node type",
        DifferenceReason::ChildCount => "child count",
        DifferenceReason::HashValue => "hash value",
    }
}
