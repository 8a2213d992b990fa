//! `find`: duplicate detection across reports (§4.F).

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Args;

use crate::config;
use crate::context::Context;
use crate::dedupe;
use crate::error::Result;

/// The sentinel exit code when `--result-by-exitcode` is set and duplicates
/// were found (§6).
pub const DUPLICATES_FOUND_EXIT_CODE: i32 = 42;

#[derive(Args, Debug)]
pub struct FindCommand {
    /// Report files to search for duplicates across. At least two are needed
    /// for a cross-report match, but a single report can still self-match.
    #[arg(required = true, num_args = 1..)]
    pub reports: Vec<Utf8PathBuf>,

    /// Include each member's line number and byte offset in its report.
    #[arg(long)]
    pub long: bool,

    /// Exit with a distinguished non-zero code if any duplicates were found.
    #[arg(long)]
    pub result_by_exitcode: bool,
}

impl FindCommand {
    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        let sets = dedupe::detect(&self.reports)?;
        let long = config::resolve_bool(if self.long { Some(true) } else { None }, &ctx.env, "DUPFILES_LONG", false);

        if ctx.json {
            let payload: Vec<_> = sets
                .iter()
                .map(|set| {
                    serde_json::json!({
                        "hash": set.hash.to_hex(),
                        "members": set.members.iter().map(|m| {
                            if long {
                                serde_json::json!({
                                    "report_id": m.report_id,
                                    "path": m.path.as_str(),
                                    "line_no": m.position.map(|p| p.line_no),
                                    "byte_offset": m.position.map(|p| p.byte_offset),
                                })
                            } else {
                                serde_json::json!({"report_id": m.report_id, "path": m.path.as_str()})
                            }
                        }).collect::<Vec<_>>(),
                    })
                })
                .collect();
            let _ = writeln!(ctx.out, "{}", serde_json::json!(payload));
        } else {
            for set in &sets {
                let _ = writeln!(ctx.out, "{}", set.hash.to_hex());
                for member in &set.members {
                    if long {
                        if let Some(pos) = member.position {
                            let _ = writeln!(
                                ctx.out,
                                "  [{}] {} (line {}, offset {})",
                                member.report_id, member.path, pos.line_no, pos.byte_offset
                            );
                            continue;
                        }
                    }
                    let _ = writeln!(ctx.out, "  [{}] {}", member.report_id, member.path);
                }
            }
        }

        if self.result_by_exitcode && !sets.is_empty() {
            Ok(DUPLICATES_FOUND_EXIT_CODE)
        } else {
            Ok(0)
        }
    }
}
