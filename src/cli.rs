//! Clap-derived CLI surface (§4.N).

use clap::{Parser, Subcommand};

use crate::commands::{
    apply::ApplyCommand, diff::DiffCommand, digest::DigestCommand, find::FindCommand, generate::GenerateCommand,
    hashalgos::HashAlgosCommand, stats::StatsCommand, tree::TreeCommand,
};
use crate::context::Context;
use crate::error::Result;

/// Find duplicate files and directory subtrees by recursive content hashing.
#[derive(Parser, Debug)]
#[command(name = "dupfiles", version, arg_required_else_help = true)]
pub struct Cli {
    /// Render command output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level: error, warn, info, debug, trace. Defaults to `warn`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format: pretty, json, compact. Defaults to `compact`.
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: DupfilesCommand,
}

#[derive(Subcommand, Debug)]
pub enum DupfilesCommand {
    /// Walk a base path and write a filesystem report.
    #[command(alias = "generate")]
    Report(GenerateCommand),
    /// Find duplicate subtrees across one or more reports.
    Find(FindCommand),
    /// Diff the children of named subpaths across report pairs.
    Diff(DiffCommand),
    /// Compute per-type counts, max depth, total size, and top-10 files.
    Stats(StatsCommand),
    /// Compute the digest of a single file or directory.
    #[command(alias = "hash")]
    Digest(DigestCommand),
    /// List supported hash algorithms.
    HashAlgos(HashAlgosCommand),
    /// Reconstruct and pretty-print a report's tree.
    Tree(TreeCommand),
    /// Extract a subdir slice of a report into its own report.
    Apply(ApplyCommand),
}

impl DupfilesCommand {
    pub fn exec(&self, ctx: &mut Context) -> Result<i32> {
        match self {
            DupfilesCommand::Report(cmd) => cmd.exec(ctx),
            DupfilesCommand::Find(cmd) => cmd.exec(ctx),
            DupfilesCommand::Diff(cmd) => cmd.exec(ctx),
            DupfilesCommand::Stats(cmd) => cmd.exec(ctx),
            DupfilesCommand::Digest(cmd) => cmd.exec(ctx),
            DupfilesCommand::HashAlgos(cmd) => cmd.exec(ctx),
            DupfilesCommand::Tree(cmd) => cmd.exec(ctx),
            DupfilesCommand::Apply(cmd) => cmd.exec(ctx),
        }
    }
}
