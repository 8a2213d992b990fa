//! End-to-end coverage over a generated filesystem tree: walk it, write a
//! report, and drive every downstream pass (dedupe, diff, stats, tree
//! reconstruction) off that report, the way the CLI commands themselves do.

use camino::Utf8PathBuf;
use tempfile::tempdir;

use dupfiles::dedupe;
use dupfiles::diff::{self, DiffPair};
use dupfiles::model::{HashMode, ReportHead, FORMAT_VERSION};
use dupfiles::report::{ReportReader, ReportWriter};
use dupfiles::stats::StatsAccumulator;
use dupfiles::tree::reconstruct;
use dupfiles::walker::{self, ExcludeRules, TraversalOrder, WalkConfig};

fn write_report_for(base: &Utf8PathBuf, mode: HashMode, order: TraversalOrder, workers: usize) -> Utf8PathBuf {
    let config = WalkConfig {
        base_path: base.clone(),
        order,
        excludes: ExcludeRules::default(),
        mode,
        algorithm: "fnv-1a-128".to_string(),
        workers,
        ignore_perm_errors: false,
        skip_empty_dirs: false,
    };
    let handle = walker::walk(config).unwrap();

    let out_dir = tempdir().unwrap();
    let report_path = Utf8PathBuf::try_from(out_dir.keep().join("report.fsr")).unwrap();
    let mut writer = ReportWriter::create(&report_path, false).unwrap();
    writer
        .write_head(&ReportHead {
            format_version: FORMAT_VERSION,
            timestamp: 1,
            algorithm_name: "fnv-1a-128".to_string(),
            mode,
            path_separator: '/',
            node_name: base.file_name().unwrap_or("").to_string(),
            base_path: base.clone(),
        })
        .unwrap();
    for line in handle.receiver.iter() {
        writer.write_tail(&line).unwrap();
    }
    handle.join().unwrap();
    writer.close().unwrap();
    report_path
}

fn make_tree() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/b.txt"), "world").unwrap();
    std::fs::create_dir(dir.path().join("empty")).unwrap();
    dir
}

#[test]
fn report_round_trips_through_reader() {
    let dir = make_tree();
    let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    let report_path = write_report_for(&base, HashMode::Three, TraversalOrder::Dfs, 2);

    let mut reader = ReportReader::open(&report_path).unwrap();
    assert_eq!(reader.head().algorithm_name, "fnv-1a-128");
    let mut paths = Vec::new();
    while let Some((line, _pos)) = reader.next_tail().unwrap() {
        paths.push(line.path.to_string());
    }
    assert!(paths.contains(&"a.txt".to_string()));
    assert!(paths.contains(&"sub/b.txt".to_string()));
    assert!(paths.contains(&"sub".to_string()));
    assert!(paths.contains(&"empty".to_string()));
    assert_eq!(paths.last().unwrap(), "", "root line comes last");
}

#[test]
fn two_walks_of_the_same_tree_produce_byte_identical_reports() {
    let dir = make_tree();
    let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

    let r1 = write_report_for(&base, HashMode::Three, TraversalOrder::Dfs, 1);
    let r2 = write_report_for(&base, HashMode::Three, TraversalOrder::Bfs, 4);

    // Root hash must match regardless of traversal order or worker count.
    let mut reader1 = ReportReader::open(&r1).unwrap();
    let mut reader2 = ReportReader::open(&r2).unwrap();
    let mut root1 = None;
    while let Some((line, _)) = reader1.next_tail().unwrap() {
        if line.path.as_str().is_empty() {
            root1 = Some(line.hash);
        }
    }
    let mut root2 = None;
    while let Some((line, _)) = reader2.next_tail().unwrap() {
        if line.path.as_str().is_empty() {
            root2 = Some(line.hash);
        }
    }
    assert_eq!(root1, root2);
}

#[test]
fn duplicate_subtree_across_two_reports_is_detected_once() {
    let root = tempdir().unwrap();
    for name in ["one", "two"] {
        let sub = root.path().join(name).join("payload");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("data.bin"), "same bytes").unwrap();
    }

    let base_one = Utf8PathBuf::try_from(root.path().join("one")).unwrap();
    let base_two = Utf8PathBuf::try_from(root.path().join("two")).unwrap();
    let r1 = write_report_for(&base_one, HashMode::Three, TraversalOrder::Dfs, 2);
    let r2 = write_report_for(&base_two, HashMode::Three, TraversalOrder::Dfs, 2);

    let sets = dedupe::detect(&[r1, r2]).unwrap();
    assert_eq!(sets.len(), 1, "the payload directory should be the single maximal duplicate");
    assert_eq!(sets[0].members.len(), 2);
    assert_eq!(sets[0].members[0].path.as_str(), "payload");
}

#[test]
fn diff_flags_a_child_present_in_only_one_report() {
    let root = tempdir().unwrap();
    std::fs::create_dir(root.path().join("left")).unwrap();
    std::fs::write(root.path().join("left/shared.txt"), "same").unwrap();
    std::fs::write(root.path().join("left/only_left.txt"), "left-only").unwrap();

    std::fs::create_dir(root.path().join("right")).unwrap();
    std::fs::write(root.path().join("right/shared.txt"), "same").unwrap();

    let base_left = Utf8PathBuf::try_from(root.path().join("left")).unwrap();
    let base_right = Utf8PathBuf::try_from(root.path().join("right")).unwrap();
    let r1 = write_report_for(&base_left, HashMode::Three, TraversalOrder::Dfs, 1);
    let r2 = write_report_for(&base_right, HashMode::Three, TraversalOrder::Dfs, 1);

    let pairs = vec![
        DiffPair { report_path: r1, base_path: Utf8PathBuf::from("") },
        DiffPair { report_path: r2, base_path: Utf8PathBuf::from("") },
    ];
    let result = diff::diff(&pairs).unwrap();
    assert!(result.not_found.is_empty());

    let only_left = result.entries.iter().find(|e| e.basename == "only_left.txt").unwrap();
    assert_eq!(only_left.present_in, vec![true, false]);

    let shared = result.entries.iter().find(|e| e.basename == "shared.txt").unwrap();
    assert_eq!(shared.present_in, vec![true, true]);
}

#[test]
fn stats_pass_matches_the_tree_contents() {
    let dir = make_tree();
    let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    let report_path = write_report_for(&base, HashMode::Three, TraversalOrder::Dfs, 2);

    let mut reader = ReportReader::open(&report_path).unwrap();
    let mut acc = StatsAccumulator::new();
    while let Some((line, _pos)) = reader.next_tail().unwrap() {
        acc.ingest(&line).unwrap();
    }
    let stats = acc.finish();

    assert_eq!(stats.counts.files, 2);
    assert_eq!(stats.counts.dirs, 3, "root, sub, and empty");
    assert_eq!(stats.total_size, "hello".len() as u64 + "world".len() as u64);
    assert_eq!(stats.top_10_biggest_files.len(), 2);
}

#[test]
fn tree_reconstruction_matches_the_walked_shape() {
    let dir = make_tree();
    let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    let report_path = write_report_for(&base, HashMode::Three, TraversalOrder::Dfs, 2);

    let mut reader = ReportReader::open(&report_path).unwrap();
    let mut lines = Vec::new();
    while let Some((line, _pos)) = reader.next_tail().unwrap() {
        lines.push(line);
    }
    let tree = reconstruct(lines);

    assert!(tree.find("a.txt").is_some());
    assert!(tree.find("sub/b.txt").is_some());
    assert!(tree.find("empty").is_some());
    assert!(tree.find("does/not/exist").is_none());
}

#[test]
fn content_mode_ignores_directory_basename_but_three_mode_does_not() {
    let root = tempdir().unwrap();
    for name in ["alpha", "beta"] {
        let sub = root.path().join(name);
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("f.txt"), "identical").unwrap();
    }
    let base = Utf8PathBuf::try_from(root.path().to_path_buf()).unwrap();

    let three_report = write_report_for(&base, HashMode::Three, TraversalOrder::Dfs, 1);
    let content_report = write_report_for(&base, HashMode::Content, TraversalOrder::Dfs, 1);

    let hash_of = |path: &Utf8PathBuf, name: &str| {
        let mut reader = ReportReader::open(path).unwrap();
        let mut found = None;
        while let Some((line, _)) = reader.next_tail().unwrap() {
            if line.path.as_str() == name {
                found = Some(line.hash);
            }
        }
        found.unwrap()
    };

    assert_ne!(hash_of(&three_report, "alpha"), hash_of(&three_report, "beta"));
    assert_eq!(hash_of(&content_report, "alpha"), hash_of(&content_report, "beta"));
}

#[test]
fn excluded_basename_is_invisible_to_every_downstream_pass() {
    let dir = make_tree();
    std::fs::write(dir.path().join("secret.txt"), "do not see me").unwrap();
    let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

    let mut excludes = ExcludeRules::default();
    excludes.basename.insert("secret.txt".to_string());
    let config = WalkConfig {
        base_path: base,
        order: TraversalOrder::Dfs,
        excludes,
        mode: HashMode::Three,
        algorithm: "fnv-1a-128".to_string(),
        workers: 2,
        ignore_perm_errors: false,
        skip_empty_dirs: false,
    };
    let handle = walker::walk(config).unwrap();
    let lines: Vec<_> = handle.receiver.iter().collect();
    handle.join().unwrap();

    assert!(!lines.iter().any(|l| l.path.as_str() == "secret.txt"));
}

#[test]
fn unknown_hash_algorithm_exits_eight() {
    use dupfiles::hash::HashRegistry;
    let err = HashRegistry::resolve("not-a-real-algorithm").unwrap_err();
    assert_eq!(err.exit_code(), 8);
}
