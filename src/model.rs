//! Shared data model (§3): the types every component passes around.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A node's filesystem kind, restricted to the closed set the report format
/// understands. Any other kind encountered during a walk fails the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Directory.
    Dir,
    /// Regular file.
    File,
    /// Symbolic link.
    Symlink,
    /// Character or block device.
    Device,
    /// FIFO / named pipe.
    Fifo,
    /// UNIX domain socket.
    Socket,
}

impl NodeType {
    /// The single-byte tag used both in the digest encoding (§4.B) and the
    /// report tail-line encoding (§6).
    pub fn tag(self) -> u8 {
        match self {
            NodeType::Dir => b'D',
            NodeType::File => b'F',
            NodeType::Symlink => b'L',
            NodeType::Device => b'C',
            NodeType::Fifo => b'P',
            NodeType::Socket => b'S',
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'D' => Some(NodeType::Dir),
            b'F' => Some(NodeType::File),
            b'L' => Some(NodeType::Symlink),
            b'C' => Some(NodeType::Device),
            b'P' => Some(NodeType::Fifo),
            b'S' => Some(NodeType::Socket),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        self.tag() as char
    }
}

/// Structure-sensitivity discipline the node hasher operates under (§4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashMode {
    /// Hash encodes node type + basename + content (structure-sensitive).
    Three,
    /// Hash encodes content only (matches `md5sum`-style tools).
    Content,
}

impl HashMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HashMode::Three => "three",
            HashMode::Content => "content",
        }
    }
}

impl std::str::FromStr for HashMode {
    type Err = crate::error::DupfilesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "three" => Ok(HashMode::Three),
            "content" => Ok(HashMode::Content),
            _ => Err(crate::error::DupfilesError::BadArgument {
                message: format!("invalid mode '{s}', expected 'three' or 'content'"),
            }),
        }
    }
}

/// One line's worth of data about a visited node. Created by the walker;
/// immutable after emission.
#[derive(Debug, Clone)]
pub struct FileData {
    pub path: Utf8PathBuf,
    pub node_type: NodeType,
    pub size: u64,
    pub hash: crate::hash::HashValue,
}

/// The per-node record persisted to a report (the text encoding of `FileData`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTailLine {
    pub hash: crate::hash::HashValue,
    pub node_type: NodeType,
    pub size: u64,
    pub path: Utf8PathBuf,
}

/// (major, minor, patch) of the on-disk report format this crate writes and reads.
pub const FORMAT_VERSION: (u32, u32, u32) = (1, 0, 0);

#[derive(Debug, Clone)]
pub struct ReportHead {
    pub format_version: (u32, u32, u32),
    pub timestamp: u64,
    pub algorithm_name: String,
    pub mode: HashMode,
    pub path_separator: char,
    pub node_name: String,
    pub base_path: Utf8PathBuf,
}

/// A maximal set of report paths that all share a digest (§3, §4.F).
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    pub hash: crate::hash::HashValue,
    pub members: Vec<DuplicateMember>,
}

#[derive(Debug, Clone)]
pub struct DuplicateMember {
    pub report_id: usize,
    pub path: Utf8PathBuf,
    pub position: Option<PositionMetadata>,
}

/// Line number + byte offset of a tail line within its report file, used to
/// locate a duplicate back in the original report (`find --long`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionMetadata {
    pub line_no: u64,
    pub byte_offset: u64,
}

/// An in-memory tree node, rebuilt from a report by the reconstructor (§4.I).
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub basename: String,
    pub node_type: NodeType,
    pub size: u64,
    pub hash: crate::hash::HashValue,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn child_mut(&mut self, basename: &str) -> Option<&mut TreeNode> {
        self.children.iter_mut().find(|c| c.basename == basename)
    }

    /// Looks up a descendant by a `/`-separated, base-relative path. An
    /// empty path returns `self`.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let mut current = self;
        if path.is_empty() {
            return Some(current);
        }
        for component in path.split('/') {
            current = current.children.iter().find(|c| c.basename == component)?;
        }
        Some(current)
    }
}
