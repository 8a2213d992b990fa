//! Concrete hash algorithms backing the registry (§4.A).

use sha2::Digest;

use super::registry::Hasher;

/// An opaque byte sequence of length `algorithm.output_size()`. Lexical hex
/// encoding is its canonical text form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashValue(pub Vec<u8>);

impl HashValue {
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() % 2 != 0 {
            return None;
        }
        let mut bytes = Vec::with_capacity(s.len() / 2);
        let chars: Vec<char> = s.chars().collect();
        for pair in chars.chunks(2) {
            let byte = u8::from_str_radix(&pair.iter().collect::<String>(), 16).ok()?;
            bytes.push(byte);
        }
        Some(HashValue(bytes))
    }

    pub fn empty() -> Self {
        HashValue(Vec::new())
    }
}

impl std::fmt::Display for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// fnv-1a-128 — hand-rolled, dependency-free, the registry's default algorithm
// and the one the locked-down test vector (invariant 9) is defined against.
// ---------------------------------------------------------------------------

const FNV_OFFSET_BASIS: u128 = 0x6c62272e07bb014262b821756295c58d;
const FNV_PRIME: u128 = 0x0000000001000000000000000000013b;

#[derive(Default)]
pub struct Fnv1a128 {
    state: u128,
}

impl Fnv1a128 {
    pub fn new() -> Self {
        Fnv1a128 { state: FNV_OFFSET_BASIS }
    }
}

impl Hasher for Fnv1a128 {
    fn reset(&mut self) {
        self.state = FNV_OFFSET_BASIS;
    }

    fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u128;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    fn finalize(&self) -> HashValue {
        HashValue(self.state.to_be_bytes().to_vec())
    }

    fn output_size(&self) -> usize {
        16
    }

    fn name(&self) -> &'static str {
        "fnv-1a-128"
    }
}

// ---------------------------------------------------------------------------
// xxh3-128 — via the teacher's existing `xxhash-rust` dependency.
// ---------------------------------------------------------------------------

pub struct Xxh3_128 {
    inner: xxhash_rust::xxh3::Xxh3,
}

impl Xxh3_128 {
    pub fn new() -> Self {
        Xxh3_128 { inner: xxhash_rust::xxh3::Xxh3::new() }
    }
}

impl Hasher for Xxh3_128 {
    fn reset(&mut self) {
        self.inner = xxhash_rust::xxh3::Xxh3::new();
    }

    fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    fn finalize(&self) -> HashValue {
        HashValue(self.inner.digest128().to_be_bytes().to_vec())
    }

    fn output_size(&self) -> usize {
        16
    }

    fn name(&self) -> &'static str {
        "xxh3-128"
    }
}

// ---------------------------------------------------------------------------
// sha-256 — via the teacher's existing `sha2` dependency.
// ---------------------------------------------------------------------------

pub struct Sha256 {
    inner: sha2::Sha256,
}

impl Sha256 {
    pub fn new() -> Self {
        Sha256 { inner: sha2::Sha256::new() }
    }
}

impl Hasher for Sha256 {
    fn reset(&mut self) {
        self.inner = sha2::Sha256::new();
    }

    fn update(&mut self, bytes: &[u8]) {
        sha2::Digest::update(&mut self.inner, bytes);
    }

    fn finalize(&self) -> HashValue {
        HashValue(self.inner.clone().finalize().to_vec())
    }

    fn output_size(&self) -> usize {
        32
    }

    fn name(&self) -> &'static str {
        "sha-256"
    }
}
