//! Hash registry (§4.A): a closed mapping from algorithm name to constructor.

use crate::error::{DupfilesError, Result};

use super::algorithms::{Fnv1a128, HashValue, Sha256, Xxh3_128};

/// Stateful hash accumulator. The registry hands out a fresh instance per
/// walk (per the "Dynamic dispatch over hashers" design note, §9) so no
/// hasher instance is ever shared across threads.
pub trait Hasher: Send {
    fn reset(&mut self);
    fn update(&mut self, bytes: &[u8]);
    fn finalize(&self) -> HashValue;
    fn output_size(&self) -> usize;
    fn name(&self) -> &'static str;
}

/// The algorithm names this build supports, in a stable order. The first
/// entry is the designated default — `default()` is the only place that
/// decision is made; every call site consults it rather than hardcoding a
/// name, fixing the "multiple files disagree on the default" bug.
const ALGORITHM_NAMES: &[&str] = &["fnv-1a-128", "xxh3-128", "sha-256"];

pub struct HashRegistry;

impl HashRegistry {
    pub fn names() -> &'static [&'static str] {
        ALGORITHM_NAMES
    }

    pub fn default_name() -> &'static str {
        ALGORITHM_NAMES[0]
    }

    pub fn default_hasher() -> Box<dyn Hasher> {
        Self::resolve(Self::default_name()).expect("default algorithm always resolves")
    }

    pub fn resolve(name: &str) -> Result<Box<dyn Hasher>> {
        match name {
            "fnv-1a-128" => Ok(Box::new(Fnv1a128::new())),
            "xxh3-128" => Ok(Box::new(Xxh3_128::new())),
            "sha-256" => Ok(Box::new(Sha256::new())),
            _ => Err(DupfilesError::UnknownAlgorithm { name: name.to_string() }),
        }
    }
}
