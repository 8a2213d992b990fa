//! Subcommand implementations (§4.N). Each struct owns its own flags and a
//! `exec` method; `main.rs` does nothing but parse, build a `Context`, and
//! dispatch.

pub mod apply;
pub mod diff;
pub mod digest;
pub mod find;
pub mod generate;
pub mod hashalgos;
pub mod stats;
pub mod tree;
