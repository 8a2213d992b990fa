//! Statistics pass (§4.H): single-pass, constant-memory accumulation over
//! one report's tail lines.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use camino::Utf8PathBuf;

use crate::error::{DupfilesError, Result};
use crate::model::{NodeType, ReportTailLine};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub dirs: u64,
    pub files: u64,
    pub symlinks: u64,
    pub devices: u64,
    pub fifos: u64,
    pub sockets: u64,
}

impl TypeCounts {
    pub fn total(&self) -> u64 {
        self.dirs + self.files + self.symlinks + self.devices + self.fifos + self.sockets
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiggestFile {
    pub path: Utf8PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub counts: TypeCounts,
    pub max_depth: u64,
    pub total_size: u64,
    pub top_10_biggest_files: Vec<BiggestFile>,
}

/// Accumulates `Stats` over a stream of tail lines. The heap never holds
/// more than 11 entries (one over the limit, trimmed immediately), so
/// memory is O(1) regardless of report size.
pub struct StatsAccumulator {
    counts: TypeCounts,
    max_depth: u64,
    total_size: u64,
    heap: BinaryHeap<Reverse<(u64, Reverse<String>)>>,
}

const TOP_N: usize = 10;

impl StatsAccumulator {
    pub fn new() -> Self {
        StatsAccumulator { counts: TypeCounts::default(), max_depth: 0, total_size: 0, heap: BinaryHeap::new() }
    }

    pub fn ingest(&mut self, line: &ReportTailLine) -> Result<()> {
        match line.node_type {
            NodeType::Dir => self.counts.dirs += 1,
            NodeType::File => self.counts.files += 1,
            NodeType::Symlink => self.counts.symlinks += 1,
            NodeType::Device => self.counts.devices += 1,
            NodeType::Fifo => self.counts.fifos += 1,
            NodeType::Socket => self.counts.sockets += 1,
        }

        let depth = line.path.as_str().matches('/').count() as u64 + 1;
        self.max_depth = self.max_depth.max(depth);

        self.total_size = self
            .total_size
            .checked_add(line.size)
            .ok_or_else(|| DupfilesError::Overflow { what: "total_size".to_string() })?;

        if line.node_type == NodeType::File {
            self.heap.push(Reverse((line.size, Reverse(line.path.to_string()))));
            if self.heap.len() > TOP_N {
                self.heap.pop();
            }
        }

        Ok(())
    }

    pub fn finish(self) -> Stats {
        let mut top: Vec<BiggestFile> = self
            .heap
            .into_iter()
            .map(|Reverse((size, Reverse(path)))| BiggestFile { path: Utf8PathBuf::from(path), size })
            .collect();
        // Biggest first; ties broken by path, ascending.
        top.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));

        Stats { counts: self.counts, max_depth: self.max_depth, total_size: self.total_size, top_10_biggest_files: top }
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
