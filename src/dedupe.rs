//! Duplicate detector (§4.F): emits every `DuplicateSet` of size ≥ 2,
//! closest to the root — if a whole directory is duplicated, its children
//! are not separately reported.
//!
//! Two passes: pass 1 ingests every tail line from every report into a
//! `hash -> members` map and drops singleton hashes (grounded on the
//! teacher's two-pass accumulate-then-sweep shape in `job_system::job_results`,
//! generalized from job outcomes to duplicate candidates). Pass 2 walks the
//! survivors in increasing path depth and suppresses anything covered by an
//! already-accepted ancestor, so only maximal duplicates remain.

use std::collections::{HashMap, HashSet};

use camino::Utf8PathBuf;

use crate::error::Result;
use crate::hash::HashValue;
use crate::model::{DuplicateMember, DuplicateSet, PositionMetadata};
use crate::report::ReportReader;

struct Candidate {
    hash_hex: String,
    report_id: usize,
    path: Utf8PathBuf,
    position: PositionMetadata,
}

fn depth(path: &Utf8PathBuf) -> usize {
    path.as_str().matches('/').count()
}

fn is_strict_descendant(ancestor: &str, path: &str) -> bool {
    if ancestor.is_empty() {
        !path.is_empty()
    } else {
        path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/')
    }
}

/// Scans every report's tail lines (§4.F, pass 1) and returns duplicate
/// candidates — hashes seen more than once across the given reports, with
/// every occurrence retained (singleton hashes are dropped here already).
fn ingest(report_paths: &[Utf8PathBuf]) -> Result<Vec<Candidate>> {
    let mut by_hash: HashMap<String, Vec<Candidate>> = HashMap::new();

    for (report_id, path) in report_paths.iter().enumerate() {
        let mut reader = ReportReader::open(path)?;
        while let Some((line, position)) = reader.next_tail()? {
            by_hash.entry(line.hash.to_hex()).or_default().push(Candidate {
                hash_hex: line.hash.to_hex(),
                report_id,
                path: line.path,
                position,
            });
        }
    }

    by_hash.retain(|_, members| members.len() >= 2);
    Ok(by_hash.into_values().flatten().collect())
}

/// Runs detection across `report_paths` and returns every maximal duplicate
/// set, ordered by hash byte-lex ascending.
pub fn detect(report_paths: &[Utf8PathBuf]) -> Result<Vec<DuplicateSet>> {
    let mut candidates = ingest(report_paths)?;
    // Increasing depth first: a shallower duplicate suppresses everything
    // beneath it in the same report before those deeper entries are visited.
    candidates.sort_by_key(|c| depth(&c.path));

    let mut covered: HashSet<(usize, Utf8PathBuf)> = HashSet::new();
    let mut survivors: HashMap<String, Vec<DuplicateMember>> = HashMap::new();

    for candidate in &candidates {
        let key = (candidate.report_id, candidate.path.clone());
        if covered.contains(&key) {
            continue;
        }
        survivors.entry(candidate.hash_hex.clone()).or_default().push(DuplicateMember {
            report_id: candidate.report_id,
            path: candidate.path.clone(),
            position: Some(candidate.position),
        });

        for other in &candidates {
            if other.report_id == candidate.report_id && is_strict_descendant(candidate.path.as_str(), other.path.as_str()) {
                covered.insert((other.report_id, other.path.clone()));
            }
        }
    }

    let mut sets: Vec<DuplicateSet> = survivors
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(hash_hex, members)| DuplicateSet {
            hash: HashValue::from_hex(&hash_hex).expect("hex was produced by HashValue::to_hex"),
            members,
        })
        .collect();
    sets.sort_by(|a, b| a.hash.cmp(&b.hash));
    Ok(sets)
}
