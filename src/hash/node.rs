//! Node-digest algorithm (§4.B): computes a node's digest from its metadata,
//! content, and (for directories) its children's already-computed digests.
//!
//! Grounded on the teacher's `fs_tree_hasher::compute_dir_hash` (sorted child
//! iteration feeding a running hasher) and `hash_file_full`, generalized from
//! "mtime+size or xxh3 of a file" to the full type/basename/content/children
//! encoding this spec requires.

use std::io::Read;

use crate::error::{DupfilesError, Result};
use crate::model::{HashMode, NodeType};

use super::registry::{HashRegistry, Hasher};
use super::HashValue;

/// Computes node digests for one walk. Not `Clone`/`Sync` — callers construct
/// a fresh `NodeHasher` (and thus a fresh underlying `Hasher`) per thread, per
/// the registry's "fresh instance per walk" contract.
pub struct NodeHasher {
    algorithm: String,
    mode: HashMode,
}

impl NodeHasher {
    pub fn new(algorithm: &str, mode: HashMode) -> Result<Self> {
        // Validate eagerly so a bad algorithm name fails fast, before any I/O.
        HashRegistry::resolve(algorithm)?;
        Ok(NodeHasher { algorithm: algorithm.to_string(), mode })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn mode(&self) -> HashMode {
        self.mode
    }

    fn new_hasher(&self) -> Box<dyn Hasher> {
        HashRegistry::resolve(&self.algorithm).expect("validated in new()")
    }

    /// Hash a regular file's content, streamed from `reader`.
    pub fn hash_file_content(&self, reader: &mut impl Read) -> Result<HashValue> {
        let mut hasher = self.new_hasher();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| DupfilesError::io("<file content>", e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }

    /// Hash a regular file node: type + basename + content (three mode), or
    /// content only (content mode).
    pub fn hash_file(&self, basename: &str, content_hash: &HashValue) -> HashValue {
        match self.mode {
            HashMode::Three => {
                let mut hasher = self.new_hasher();
                hasher.update(&[NodeType::File.tag()]);
                hasher.update(basename.as_bytes());
                hasher.update(&[0u8]);
                hasher.update(&content_hash.0);
                hasher.finalize()
            }
            HashMode::Content => content_hash.clone(),
        }
    }

    /// Hash a node whose digest doesn't depend on content — symlinks hash
    /// their target string, device/FIFO/socket nodes hash type + basename.
    pub fn hash_opaque(&self, node_type: NodeType, basename: &str, target: Option<&str>) -> HashValue {
        let mut hasher = self.new_hasher();
        if self.mode == HashMode::Three {
            hasher.update(&[node_type.tag()]);
            hasher.update(basename.as_bytes());
            hasher.update(&[0u8]);
        }
        if let Some(target) = target {
            hasher.update(target.as_bytes());
        }
        hasher.finalize()
    }

    /// Hash a directory from its already-computed children. `children` is
    /// `(basename, hash)` pairs in any order — this function sorts them.
    ///
    /// Three mode sorts by basename (ascending) and feeds type+basename+each
    /// child's hash. Content mode sorts by hash byte-lex ascending (so
    /// renaming/reshuffling children doesn't change the aggregate) and feeds
    /// only the sorted hashes.
    pub fn hash_dir(&self, basename: &str, children: &[(String, HashValue)]) -> HashValue {
        let mut hasher = self.new_hasher();
        match self.mode {
            HashMode::Three => {
                hasher.update(&[NodeType::Dir.tag()]);
                hasher.update(basename.as_bytes());
                hasher.update(&[0u8]);

                let mut sorted: Vec<&(String, HashValue)> = children.iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                for (_, hash) in sorted {
                    hasher.update(&hash.0);
                }
            }
            HashMode::Content => {
                let mut sorted: Vec<&HashValue> = children.iter().map(|(_, h)| h).collect();
                sorted.sort();
                for hash in sorted {
                    hasher.update(&hash.0);
                }
            }
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn nh(mode: HashMode) -> NodeHasher {
        NodeHasher::new("fnv-1a-128", mode).unwrap()
    }

    #[test]
    fn empty_file_hashes_type_basename_and_nothing_else() {
        let h = nh(HashMode::Three);
        let content = h.hash_file_content(&mut Cursor::new(b"")).unwrap();
        let a = h.hash_file("a.txt", &content);
        let b = h.hash_file("a.txt", &content);
        assert_eq!(a, b);
    }

    #[test]
    fn three_mode_renaming_changes_hash() {
        let h = nh(HashMode::Three);
        let content = h.hash_file_content(&mut Cursor::new(b"hello")).unwrap();
        let a = h.hash_file("a.txt", &content);
        let b = h.hash_file("b.txt", &content);
        assert_ne!(a, b, "three mode must be basename-sensitive");
    }

    #[test]
    fn content_mode_renaming_keeps_hash() {
        let h = nh(HashMode::Content);
        let content = h.hash_file_content(&mut Cursor::new(b"hello")).unwrap();
        let a = h.hash_file("a.txt", &content);
        let b = h.hash_file("b.txt", &content);
        assert_eq!(a, b, "content mode must be basename-agnostic");
    }

    #[test]
    fn dir_hash_independent_of_child_listing_order() {
        let h = nh(HashMode::Three);
        let ca = h.hash_file_content(&mut Cursor::new(b"1")).unwrap();
        let cb = h.hash_file_content(&mut Cursor::new(b"2")).unwrap();
        let fa = h.hash_file("a.txt", &ca);
        let fb = h.hash_file("b.txt", &cb);

        let forward = h.hash_dir("root", &[("a.txt".into(), fa.clone()), ("b.txt".into(), fb.clone())]);
        let reversed = h.hash_dir("root", &[("b.txt".into(), fb), ("a.txt".into(), fa)]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn content_mode_dir_hash_ignores_basenames() {
        let h = nh(HashMode::Content);
        let ca = h.hash_file_content(&mut Cursor::new(b"x")).unwrap();
        let fa = h.hash_file("a.txt", &ca);
        let fb = h.hash_file("z.txt", &ca);
        // same content, different basenames -> same per-file hash in content mode
        assert_eq!(fa, fb);

        let d1 = h.hash_dir("root", &[("a.txt".into(), fa.clone())]);
        let d2 = h.hash_dir("root", &[("totally-renamed".into(), fa)]);
        assert_eq!(d1, d2);
    }

    #[test]
    fn symlink_hashes_target_not_content() {
        let h = nh(HashMode::Three);
        let a = h.hash_opaque(NodeType::Symlink, "link", Some("/etc/passwd"));
        let b = h.hash_opaque(NodeType::Symlink, "link", Some("/etc/shadow"));
        assert_ne!(a, b);
    }

    #[test]
    fn device_hashes_type_and_basename_only() {
        let h = nh(HashMode::Three);
        let a = h.hash_opaque(NodeType::Device, "sda", None);
        let b = h.hash_opaque(NodeType::Device, "sda", None);
        assert_eq!(a, b);
        let c = h.hash_opaque(NodeType::Device, "sdb", None);
        assert_ne!(a, c);
    }
}
