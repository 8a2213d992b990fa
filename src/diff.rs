//! Diff engine (§4.G): compares the children of a named subpath across
//! `(report, base_path)` pairs, joining on `(basename, hash)`.

use std::collections::{HashMap, HashSet};

use camino::Utf8PathBuf;

use crate::error::Result;
use crate::hash::HashValue;
use crate::model::NodeType;
use crate::report::ReportReader;
use crate::tree::reconstruct;

#[derive(Debug, Clone)]
struct ChildInfo {
    hash: HashValue,
    node_type: NodeType,
    size: u64,
    child_count: usize,
}

/// One `(report, base_path)` input to a diff.
#[derive(Debug, Clone)]
pub struct DiffPair {
    pub report_path: Utf8PathBuf,
    pub base_path: Utf8PathBuf,
}

/// A `base_path` that couldn't be found in its report — reported, not fatal.
#[derive(Debug, Clone)]
pub struct PairNotFound {
    pub pair_index: usize,
    pub base_path: Utf8PathBuf,
}

/// One `(basename, hash)` identifier and which pairs contain a matching child.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub basename: String,
    pub hash: HashValue,
    pub present_in: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct DiffResult {
    pub entries: Vec<DiffEntry>,
    pub not_found: Vec<PairNotFound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceReason {
    Size,
    NodeType,
    ChildCount,
    HashValue,
}

#[derive(Debug, Clone)]
pub struct PairChild {
    pub pair_index: usize,
    pub hash: HashValue,
    pub node_type: NodeType,
    pub size: u64,
    pub child_count: usize,
}

/// One basename clustered across every pair that has it, with the reason the
/// cluster isn't uniform (`None` if every present pair agrees).
#[derive(Debug, Clone)]
pub struct DiffCluster {
    pub basename: String,
    pub pairs: Vec<PairChild>,
    pub reason: Option<DifferenceReason>,
}

/// Reads every pair's report, reconstructs its tree, and returns the
/// `base_path` node's children, or `None` if `base_path` wasn't found.
fn children_of(pair: &DiffPair) -> Result<Option<HashMap<String, ChildInfo>>> {
    let mut reader = ReportReader::open(&pair.report_path)?;
    let mut lines = Vec::new();
    while let Some((line, _position)) = reader.next_tail()? {
        lines.push(line);
    }
    let tree = reconstruct(lines);

    Ok(tree.find(pair.base_path.as_str()).map(|node| {
        node.children
            .iter()
            .map(|child| {
                (
                    child.basename.clone(),
                    ChildInfo { hash: child.hash.clone(), node_type: child.node_type, size: child.size, child_count: child.children.len() },
                )
            })
            .collect()
    }))
}

fn gather(pairs: &[DiffPair]) -> Result<(Vec<Option<HashMap<String, ChildInfo>>>, Vec<PairNotFound>)> {
    let mut per_pair = Vec::with_capacity(pairs.len());
    let mut not_found = Vec::new();
    for (pair_index, pair) in pairs.iter().enumerate() {
        match children_of(pair)? {
            Some(map) => per_pair.push(Some(map)),
            None => {
                not_found.push(PairNotFound { pair_index, base_path: pair.base_path.clone() });
                per_pair.push(None);
            }
        }
    }
    Ok((per_pair, not_found))
}

/// Presence/absence join on `(basename, hash)` (§4.G, the plain `+`/`-` view).
pub fn diff(pairs: &[DiffPair]) -> Result<DiffResult> {
    let (per_pair, not_found) = gather(pairs)?;

    let mut order: Vec<(String, String)> = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for map in per_pair.iter().flatten() {
        for (basename, info) in map {
            let key = (basename.clone(), info.hash.to_hex());
            if seen.insert(key.clone()) {
                order.push(key);
            }
        }
    }

    let entries = order
        .into_iter()
        .map(|(basename, hash_hex)| {
            let present_in = per_pair
                .iter()
                .map(|map| {
                    map.as_ref()
                        .map(|m| m.get(&basename).is_some_and(|info| info.hash.to_hex() == hash_hex))
                        .unwrap_or(false)
                })
                .collect();
            DiffEntry { basename, hash: HashValue::from_hex(&hash_hex).expect("hex was produced by HashValue::to_hex"), present_in }
        })
        .collect();

    Ok(DiffResult { entries, not_found })
}

/// Clustered view (§4.G "richer mode"): groups by basename and explains why a
/// basename's instances differ across pairs, when they do.
pub fn diff_clustered(pairs: &[DiffPair]) -> Result<Vec<DiffCluster>> {
    let (per_pair, _not_found) = gather(pairs)?;

    let mut order: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for map in per_pair.iter().flatten() {
        for basename in map.keys() {
            if seen.insert(basename.clone()) {
                order.push(basename.clone());
            }
        }
    }

    let clusters = order
        .into_iter()
        .map(|basename| {
            let present: Vec<PairChild> = per_pair
                .iter()
                .enumerate()
                .filter_map(|(pair_index, map)| {
                    map.as_ref().and_then(|m| m.get(&basename)).map(|info| PairChild {
                        pair_index,
                        hash: info.hash.clone(),
                        node_type: info.node_type,
                        size: info.size,
                        child_count: info.child_count,
                    })
                })
                .collect();

            let reason = reason_for(&present);
            DiffCluster { basename, pairs: present, reason }
        })
        .collect();

    Ok(clusters)
}

/// First criterion (in spec order: size, node type, child count, else hash)
/// on which every present pair fails to agree. `None` if they all agree, or
/// if fewer than two pairs have this basename.
fn reason_for(present: &[PairChild]) -> Option<DifferenceReason> {
    let first = present.first()?;
    if present.len() < 2 {
        return None;
    }
    if present.iter().any(|c| c.size != first.size) {
        return Some(DifferenceReason::Size);
    }
    if present.iter().any(|c| c.node_type != first.node_type) {
        return Some(DifferenceReason::NodeType);
    }
    if present.iter().any(|c| c.child_count != first.child_count) {
        return Some(DifferenceReason::ChildCount);
    }
    if present.iter().any(|c| c.hash != first.hash) {
        return Some(DifferenceReason::HashValue);
    }
    None
}
