//! Explicit CLI context, replacing file-scope mutable globals.
//!
//! Per the redesign note in SPEC_FULL.md §9 ("global CLI state → explicit
//! context"), command handlers never read `std::env::var` or write to
//! `io::stdout()`/`io::stderr()` directly. They take a `&mut Context`, which
//! makes them trivially unit-testable with in-memory buffers.

use std::collections::HashMap;
use std::io::Write;

/// The `DUPFILES_*` environment variables this tool consults, snapshotted
/// once at startup so command handlers never race with a mutated environment
/// and so tests can substitute a fake environment.
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn from_process_env() -> Self {
        let vars = std::env::vars()
            .filter(|(k, _)| k.starts_with("DUPFILES_"))
            .collect();
        EnvSnapshot { vars }
    }

    pub fn empty() -> Self {
        EnvSnapshot { vars: HashMap::new() }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }
}

/// Bundles I/O and environment for one CLI invocation.
pub struct Context {
    pub out: Box<dyn Write>,
    pub err: Box<dyn Write>,
    pub env: EnvSnapshot,
    /// Whether command output should be rendered as JSON.
    pub json: bool,
}

impl Context {
    pub fn new(json: bool) -> Self {
        Context {
            out: Box::new(std::io::stdout()),
            err: Box::new(std::io::stderr()),
            env: EnvSnapshot::from_process_env(),
            json,
        }
    }

    /// Render a `DupfilesError` to `self.err` (human) or `self.out` (JSON),
    /// following the §7 user-visible-failure contract.
    pub fn report_error(&mut self, error: &crate::error::DupfilesError) {
        if self.json {
            let payload = serde_json::json!({
                "error": error.to_string(),
                "code": error.exit_code(),
            });
            let _ = writeln!(self.out, "{payload}");
        } else {
            let _ = writeln!(self.err, "Error: {error}");
        }
    }
}
