//! `tree`: reconstruct and pretty-print a report (§4.I).

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Args;

use crate::context::Context;
use crate::error::Result;
use crate::model::TreeNode;
use crate::report::ReportReader;
use crate::tree::reconstruct;

#[derive(Args, Debug)]
pub struct TreeCommand {
    pub report: Utf8PathBuf,
}

impl TreeCommand {
    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        let mut reader = ReportReader::open(&self.report)?;
        let mut lines = Vec::new();
        while let Some((line, _position)) = reader.next_tail()? {
            lines.push(line);
        }
        let root = reconstruct(lines);

        if ctx.json {
            let _ = writeln!(ctx.out, "{}", to_json(&root));
        } else {
            let label = if root.basename.is_empty() { "." } else { &root.basename };
            let _ = writeln!(ctx.out, "{label}");
            print_children(ctx, &root, "");
        }
        Ok(0)
    }
}

fn print_children(ctx: &mut Context, node: &TreeNode, prefix: &str) {
    for (i, child) in node.children.iter().enumerate() {
        let is_last = i == node.children.len() - 1;
        let connector = if is_last { "└── " } else { "├── " };
        let _ = writeln!(ctx.out, "{prefix}{connector}{}", child.basename);
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        print_children(ctx, child, &child_prefix);
    }
}

fn to_json(node: &TreeNode) -> serde_json::Value {
    serde_json::json!({
        "basename": node.basename,
        "node_type": node.node_type.as_char().to_string(),
        "size": node.size,
        "hash": node.hash.to_hex(),
        "children": node.children.iter().map(to_json).collect::<Vec<_>>(),
    })
}
