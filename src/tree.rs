//! Tree reconstructor (§4.I): replays a post-order report into an in-memory
//! `TreeNode` tree.
//!
//! Because the report is post-order, a leaf's tail line can arrive before
//! any of its ancestor directories' own tail lines. Ancestors are created as
//! placeholders on first reference (from a descendant's path) and their real
//! metadata is filled in once their own tail line arrives later in the
//! stream — never twice, since a well-formed report names each path exactly
//! once.

use camino::{Utf8Path, Utf8PathBuf};

use crate::hash::HashValue;
use crate::model::{NodeType, ReportTailLine, TreeNode};

pub struct TreeBuilder {
    root: TreeNode,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder { root: TreeNode { basename: String::new(), node_type: NodeType::Dir, size: 0, hash: HashValue::empty(), children: Vec::new() } }
    }

    pub fn ingest(&mut self, line: &ReportTailLine) {
        let path = line.path.as_str();
        if path.is_empty() {
            self.root.node_type = line.node_type;
            self.root.size = line.size;
            self.root.hash = line.hash.clone();
            return;
        }

        let components: Vec<&str> = path.split('/').collect();
        let mut current = &mut self.root;
        let last = components.len() - 1;
        for (i, component) in components.into_iter().enumerate() {
            if current.child_mut(component).is_none() {
                current.children.push(TreeNode {
                    basename: component.to_string(),
                    node_type: NodeType::Dir,
                    size: 0,
                    hash: HashValue::empty(),
                    children: Vec::new(),
                });
            }
            let child = current.child_mut(component).expect("just inserted or already present");
            if i == last {
                child.node_type = line.node_type;
                child.size = line.size;
                child.hash = line.hash.clone();
            }
            current = child;
        }
    }

    pub fn finish(self) -> TreeNode {
        self.root
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn reconstruct<I: IntoIterator<Item = ReportTailLine>>(lines: I) -> TreeNode {
    let mut builder = TreeBuilder::new();
    for line in lines {
        builder.ingest(&line);
    }
    builder.finish()
}

/// Inverse of `reconstruct`: replays `node` back into post-order tail lines,
/// with paths relative to `node` itself (so `node`'s own line has an empty
/// path). Used by `apply` to re-root a subtree into a standalone report.
pub fn flatten_post_order(node: &TreeNode) -> Vec<ReportTailLine> {
    fn visit(node: &TreeNode, path: &Utf8Path, out: &mut Vec<ReportTailLine>) {
        for child in &node.children {
            let child_path =
                if path.as_str().is_empty() { Utf8PathBuf::from(&child.basename) } else { path.join(&child.basename) };
            visit(child, &child_path, out);
        }
        out.push(ReportTailLine { hash: node.hash.clone(), node_type: node.node_type, size: node.size, path: path.to_path_buf() });
    }

    let mut out = Vec::new();
    visit(node, Utf8Path::new(""), &mut out);
    out
}
