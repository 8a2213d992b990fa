//! `hashalgos`: list supported hash algorithms (§6).

use std::io::Write;

use clap::Args;

use crate::context::Context;
use crate::error::Result;
use crate::hash::HashRegistry;

/// Distinguished exit code for `hashalgos --check-support` on an unknown
/// algorithm name (§6) — intentionally not `UnknownAlgorithm::exit_code()`
/// (8), which is the generic "the tool rejected this name" code; this one
/// means specifically "you asked me to check, and the answer is no".
pub const UNSUPPORTED_ALGORITHM_EXIT_CODE: i32 = 100;

#[derive(Args, Debug)]
pub struct HashAlgosCommand {
    /// Check whether a single algorithm name is supported, instead of
    /// listing every name.
    #[arg(long)]
    pub check_support: Option<String>,
}

impl HashAlgosCommand {
    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        if let Some(name) = &self.check_support {
            let supported = HashRegistry::resolve(name).is_ok();
            if ctx.json {
                let _ = writeln!(ctx.out, "{}", serde_json::json!({"algorithm": name, "supported": supported}));
            } else {
                let _ = writeln!(ctx.out, "{}", if supported { "supported" } else { "unsupported" });
            }
            return Ok(if supported { 0 } else { UNSUPPORTED_ALGORITHM_EXIT_CODE });
        }

        let names = HashRegistry::names();
        if ctx.json {
            let _ = writeln!(ctx.out, "{}", serde_json::json!({"algorithms": names, "default": HashRegistry::default_name()}));
        } else {
            for name in names {
                let marker = if *name == HashRegistry::default_name() { " (default)" } else { "" };
                let _ = writeln!(ctx.out, "{name}{marker}");
            }
        }
        Ok(0)
    }
}
