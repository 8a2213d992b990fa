//! CLI / environment-variable / default precedence layering.
//!
//! This is the single place `DUPFILES_*` environment variables are read.
//! Centralizing it fixes two bugs the original tool was documented (SPEC_FULL.md
//! §9) to have: an `EnvOr`-style helper returning the env *key* instead of its
//! value, and boolean env vars being parsed with inconsistent semantics across
//! call sites. The rule here is canonical everywhere: an explicitly-set CLI
//! value always wins; otherwise an explicitly-set and parseable env var wins;
//! otherwise the default applies.

use crate::context::EnvSnapshot;

/// Resolve a `String`/`PathBuf`-like value: CLI flag > env var > default.
pub fn resolve_str(cli_value: Option<&str>, env: &EnvSnapshot, env_var: &str, default: &str) -> String {
    if let Some(v) = cli_value {
        return v.to_string();
    }
    if let Some(v) = env.get(env_var) {
        return v.to_string();
    }
    default.to_string()
}

/// Resolve a boolean: CLI flag (if explicitly passed) > env var > default.
///
/// `cli_value` is `Some(true/false)` only when the flag was explicitly passed;
/// a bare `--flag` clap arg should be modeled as `Option<bool>` via
/// `ArgAction::SetTrue` plus a `.get_flag()`/explicit-presence check at the
/// call site, not as a plain `bool` that can't distinguish "unset" from "false".
pub fn resolve_bool(cli_value: Option<bool>, env: &EnvSnapshot, env_var: &str, default: bool) -> bool {
    if let Some(v) = cli_value {
        return v;
    }
    if let Some(raw) = env.get(env_var) {
        if let Some(parsed) = parse_bool(raw) {
            return parsed;
        }
        // unset/unparseable → keep the default rather than erroring, per
        // the canonicalized policy in SPEC_FULL.md §9.
    }
    default
}

/// Resolve the node-hash structure mode: CLI `--mode` string (if given) wins
/// outright; otherwise `DUPFILES_CONTENT_MODE` is read as the *boolean* §6
/// documents it to be (`1`/`true` selects content mode, anything else/unset
/// keeps `three`) rather than being handed to `HashMode::from_str`, which
/// only understands the literal strings `"three"`/`"content"`.
pub fn resolve_mode(cli_value: Option<&str>, env: &EnvSnapshot) -> crate::error::Result<crate::model::HashMode> {
    if let Some(v) = cli_value {
        return v.parse();
    }
    let content_mode = resolve_bool(None, env, "DUPFILES_CONTENT_MODE", false);
    Ok(if content_mode { crate::model::HashMode::Content } else { crate::model::HashMode::Three })
}

/// Resolve a worker count in `[1, 256]`: CLI flag > env var > default.
pub fn resolve_workers(cli_value: Option<usize>, env: &EnvSnapshot, default: usize) -> usize {
    if let Some(v) = cli_value {
        return v.clamp(1, 256);
    }
    if let Some(raw) = env.get("DUPFILES_WORKERS") {
        if let Ok(parsed) = raw.parse::<usize>() {
            return parsed.clamp(1, 256);
        }
    }
    default.clamp(1, 256)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_value_wins_over_env() {
        let env = EnvSnapshot::empty().with("DUPFILES_JSON", "true");
        assert!(!resolve_bool(Some(false), &env, "DUPFILES_JSON", false));
    }

    #[test]
    fn env_wins_over_default_when_cli_unset() {
        let env = EnvSnapshot::empty().with("DUPFILES_JSON", "true");
        assert!(resolve_bool(None, &env, "DUPFILES_JSON", false));
    }

    #[test]
    fn unparseable_env_falls_back_to_default() {
        let env = EnvSnapshot::empty().with("DUPFILES_JSON", "maybe");
        assert!(!resolve_bool(None, &env, "DUPFILES_JSON", false));
        assert!(resolve_bool(None, &env, "DUPFILES_JSON", true));
    }

    #[test]
    fn workers_clamped_to_range() {
        let env = EnvSnapshot::empty();
        assert_eq!(resolve_workers(Some(0), &env, 4), 1);
        assert_eq!(resolve_workers(Some(9000), &env, 4), 256);
        assert_eq!(resolve_workers(None, &env, 4), 4);
    }

    #[test]
    fn content_mode_env_var_is_read_as_a_boolean_not_a_mode_name() {
        let env = EnvSnapshot::empty().with("DUPFILES_CONTENT_MODE", "1");
        assert_eq!(resolve_mode(None, &env).unwrap(), crate::model::HashMode::Content);

        let env = EnvSnapshot::empty().with("DUPFILES_CONTENT_MODE", "false");
        assert_eq!(resolve_mode(None, &env).unwrap(), crate::model::HashMode::Three);

        let env = EnvSnapshot::empty();
        assert_eq!(resolve_mode(None, &env).unwrap(), crate::model::HashMode::Three);
    }

    #[test]
    fn cli_mode_string_overrides_the_boolean_env_var() {
        let env = EnvSnapshot::empty().with("DUPFILES_CONTENT_MODE", "true");
        assert_eq!(resolve_mode(Some("three"), &env).unwrap(), crate::model::HashMode::Three);
    }

    #[test]
    fn env_value_not_key_is_returned() {
        // Regression test for the documented `EnvOr`-returns-key bug.
        let env = EnvSnapshot::empty().with("DUPFILES_HASH_ALGORITHM", "sha-256");
        let resolved = resolve_str(None, &env, "DUPFILES_HASH_ALGORITHM", "fnv-1a-128");
        assert_eq!(resolved, "sha-256");
        assert_ne!(resolved, "DUPFILES_HASH_ALGORITHM");
    }
}
