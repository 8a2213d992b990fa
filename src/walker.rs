//! Concurrent post-order filesystem walker (§4.C).
//!
//! Discovery (deciding what's in the tree, applying exclude rules, resolving
//! node types) is a single synchronous pass, since it's pure metadata I/O and
//! gains little from threading. Hashing file content is the expensive part,
//! and that's what the worker pool parallelizes.
//!
//! The worker pool itself — crossbeam channel, `std::thread::scope`, an
//! `AtomicBool` abort flag — mirrors the teacher's `job_system::JobSystem`.
//! Its `JobGraph` (a general blocked-by/blocks multimap) is overkill here:
//! a walker's dependency graph is always a tree, so a per-directory
//! `AtomicUsize` remaining-count, decremented as each child finishes and
//! bubbled up when it hits zero, replaces it entirely.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use crossbeam::channel::{Receiver, Sender};
use regex::Regex;

use crate::error::{DupfilesError, Result};
use crate::hash::{HashValue, NodeHasher};
use crate::model::{HashMode, NodeType, ReportTailLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    Dfs,
    Bfs,
}

/// Exclusion rules (§4.C): basename exact match, basename regex, and tree
/// prefix match. `exclude_tree` is base-relative.
#[derive(Default)]
pub struct ExcludeRules {
    pub basename: std::collections::HashSet<String>,
    pub basename_regex: Vec<Regex>,
    pub tree: std::collections::HashSet<Utf8PathBuf>,
}

impl ExcludeRules {
    pub fn is_excluded(&self, rel_path: &Utf8Path, basename: &str) -> bool {
        if self.basename.contains(basename) {
            return true;
        }
        if self.basename_regex.iter().any(|re| re.is_match(basename)) {
            return true;
        }
        self.tree.iter().any(|t| rel_path == t || rel_path.starts_with(t))
    }
}

pub struct WalkConfig {
    pub base_path: Utf8PathBuf,
    pub order: TraversalOrder,
    pub excludes: ExcludeRules,
    pub mode: HashMode,
    pub algorithm: String,
    pub workers: usize,
    pub ignore_perm_errors: bool,
    /// When set, a directory left with no children after exclusions is
    /// itself treated as excluded (invisible to its parent) rather than
    /// emitted as an empty node. The root is exempt.
    pub skip_empty_dirs: bool,
}

/// A tree shape discovered from the filesystem, with exclusions already
/// applied — a node this walk will never see is simply absent here.
enum Discovered {
    Dir { basename: String, size: u64, children: Vec<Discovered> },
    Leaf { basename: String, size: u64, kind: JobKind },
}

#[derive(Clone)]
enum JobKind {
    File,
    Symlink(String),
    Device,
    Fifo,
    Socket,
}

impl JobKind {
    fn node_type(&self) -> NodeType {
        match self {
            JobKind::File => NodeType::File,
            JobKind::Symlink(_) => NodeType::Symlink,
            JobKind::Device => NodeType::Device,
            JobKind::Fifo => NodeType::Fifo,
            JobKind::Socket => NodeType::Socket,
        }
    }
}

struct DirRecord {
    parent: Option<usize>,
    basename: String,
    rel_path: Utf8PathBuf,
    size: u64,
    remaining: AtomicUsize,
    children: Mutex<Vec<(String, HashValue)>>,
}

struct FileJob {
    dir_id: usize,
    basename: String,
    rel_path: Utf8PathBuf,
    size: u64,
    kind: JobKind,
}

/// Classifies an I/O result against the `ignore_perm_errors` contract: a
/// `PermissionDenied` error is swallowed (with a warning) when the flag is
/// set, and is otherwise — like any other I/O error — fatal.
fn io_result<T>(
    path: &Utf8Path,
    result: std::io::Result<T>,
    ignore_perm_errors: bool,
    warnings: &Mutex<Vec<String>>,
) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            if ignore_perm_errors {
                warnings.lock().unwrap().push(format!("skipped {path}: permission denied"));
                tracing::warn!(%path, "skipped node: permission denied");
                Ok(None)
            } else {
                Err(DupfilesError::PermissionDenied { path: path.to_path_buf() })
            }
        }
        Err(e) => Err(DupfilesError::io(path.to_path_buf(), e)),
    }
}

fn discover(
    abs_path: &Utf8Path,
    rel_path: &Utf8Path,
    basename: &str,
    is_root: bool,
    cfg: &WalkConfig,
    warnings: &Mutex<Vec<String>>,
) -> Result<Option<Discovered>> {
    if !is_root && cfg.excludes.is_excluded(rel_path, basename) {
        return Ok(None);
    }

    // The root is followed if it's itself a symlink (a user pointing
    // `generate` at a symlinked tree expects to walk the target); every
    // other node's own symlink-ness is part of its identity and is never
    // followed.
    let meta = if is_root {
        io_result(abs_path, std::fs::metadata(abs_path), cfg.ignore_perm_errors, warnings)?
    } else {
        io_result(abs_path, std::fs::symlink_metadata(abs_path), cfg.ignore_perm_errors, warnings)?
    };
    let meta = match meta {
        Some(m) => m,
        None => return Ok(None),
    };

    if !is_root && meta.file_type().is_symlink() {
        let target = io_result(abs_path, std::fs::read_link(abs_path), cfg.ignore_perm_errors, warnings)?;
        let target = match target {
            Some(t) => t,
            None => return Ok(None),
        };
        return Ok(Some(Discovered::Leaf {
            basename: basename.to_string(),
            size: meta.len(),
            kind: JobKind::Symlink(target.to_string_lossy().into_owned()),
        }));
    }

    if meta.is_dir() {
        let entries = io_result(abs_path, std::fs::read_dir(abs_path), cfg.ignore_perm_errors, warnings)?;
        let entries = match entries {
            Some(e) => e,
            None => return Ok(None),
        };
        let mut children = Vec::new();
        for entry in entries {
            let entry = io_result(abs_path, entry, cfg.ignore_perm_errors, warnings)?;
            let entry = match entry {
                Some(e) => e,
                None => continue,
            };
            let child_name = entry.file_name().into_string().map_err(|raw| DupfilesError::InvariantViolation {
                message: format!("non-utf8 filename {raw:?} under {abs_path}"),
            })?;
            let child_abs = Utf8PathBuf::try_from(entry.path())
                .map_err(|e| DupfilesError::InvariantViolation { message: e.to_string() })?;
            let child_rel =
                if rel_path.as_str().is_empty() { Utf8PathBuf::from(&child_name) } else { rel_path.join(&child_name) };

            if let Some(child) = discover(&child_abs, &child_rel, &child_name, false, cfg, warnings)? {
                children.push(child);
            }
        }
        if cfg.skip_empty_dirs && !is_root && children.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Discovered::Dir { basename: basename.to_string(), size: meta.len(), children }));
    }

    if meta.is_file() {
        return Ok(Some(Discovered::Leaf { basename: basename.to_string(), size: meta.len(), kind: JobKind::File }));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        let ft = meta.file_type();
        let kind = if ft.is_char_device() || ft.is_block_device() {
            Some(JobKind::Device)
        } else if ft.is_fifo() {
            Some(JobKind::Fifo)
        } else if ft.is_socket() {
            Some(JobKind::Socket)
        } else {
            None
        };
        if let Some(kind) = kind {
            return Ok(Some(Discovered::Leaf { basename: basename.to_string(), size: meta.len(), kind }));
        }
    }

    Err(DupfilesError::InvariantViolation { message: format!("unsupported node type at {abs_path}") })
}

/// Flattens a `Discovered` tree into an arena of `DirRecord`s plus the flat
/// list of file-hash jobs. `order` only affects the order jobs land in the
/// queue — the emitted result is identical either way, since directory
/// finalization is driven by remaining-children counters, not discovery
/// order.
fn flatten(root: Discovered, order: TraversalOrder) -> (Vec<DirRecord>, Vec<FileJob>, Vec<usize>) {
    let mut dirs = Vec::new();
    let mut jobs = Vec::new();
    let mut ready = Vec::new();

    let mut pending: VecDeque<(Discovered, Option<usize>, Utf8PathBuf)> = VecDeque::new();
    pending.push_back((root, None, Utf8PathBuf::new()));

    loop {
        let next = match order {
            TraversalOrder::Bfs => pending.pop_front(),
            TraversalOrder::Dfs => pending.pop_back(),
        };
        let Some((node, parent_id, rel_path)) = next else { break };

        match node {
            Discovered::Dir { basename, size, children } => {
                let id = dirs.len();
                let remaining = children.len();
                dirs.push(DirRecord {
                    parent: parent_id,
                    basename,
                    rel_path: rel_path.clone(),
                    size,
                    remaining: AtomicUsize::new(remaining),
                    children: Mutex::new(Vec::with_capacity(remaining)),
                });
                if remaining == 0 {
                    ready.push(id);
                } else {
                    for child in children {
                        let child_basename = match &child {
                            Discovered::Dir { basename, .. } | Discovered::Leaf { basename, .. } => basename.clone(),
                        };
                        let child_rel = if rel_path.as_str().is_empty() {
                            Utf8PathBuf::from(&child_basename)
                        } else {
                            rel_path.join(&child_basename)
                        };
                        pending.push_back((child, Some(id), child_rel));
                    }
                }
            }
            Discovered::Leaf { basename, size, kind } => {
                let dir_id = parent_id.expect("a leaf always has a directory parent");
                jobs.push(FileJob { dir_id, basename, rel_path, size, kind });
            }
        }
    }

    (dirs, jobs, ready)
}

/// Combines a finished directory's already-collected children into its own
/// digest, emits its tail line, and — if that was the last outstanding child
/// of its own parent — recurses upward. Iterative, not recursive, so depth
/// doesn't cost stack.
fn finalize_dir(dirs: &[DirRecord], start: usize, hasher: &NodeHasher, emit: &Sender<ReportTailLine>) {
    let mut current = Some(start);
    while let Some(id) = current {
        let rec = &dirs[id];
        let hash = {
            let children = rec.children.lock().unwrap();
            hasher.hash_dir(&rec.basename, &children)
        };
        let _ = emit.send(ReportTailLine {
            hash: hash.clone(),
            node_type: NodeType::Dir,
            size: rec.size,
            path: rec.rel_path.clone(),
        });

        current = match rec.parent {
            Some(parent_id) => {
                dirs[parent_id].children.lock().unwrap().push((rec.basename.clone(), hash));
                if dirs[parent_id].remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    Some(parent_id)
                } else {
                    None
                }
            }
            None => None,
        };
    }
}

fn emit_and_bubble(job: &FileJob, hash: HashValue, dirs: &[DirRecord], hasher: &NodeHasher, emit: &Sender<ReportTailLine>) {
    let _ = emit.send(ReportTailLine {
        hash: hash.clone(),
        node_type: job.kind.node_type(),
        size: job.size,
        path: job.rel_path.clone(),
    });
    let parent = &dirs[job.dir_id];
    parent.children.lock().unwrap().push((job.basename.clone(), hash));
    if parent.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
        finalize_dir(dirs, job.dir_id, hasher, emit);
    }
}

/// Skips a node as if it had been excluded: decrements its parent's
/// remaining-children count without contributing a child hash. Used when a
/// permission error surfaces only at open/read time, after discovery already
/// counted the node as present.
fn skip_and_bubble(job: &FileJob, dirs: &[DirRecord], hasher: &NodeHasher, emit: &Sender<ReportTailLine>) {
    let parent = &dirs[job.dir_id];
    if parent.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
        finalize_dir(dirs, job.dir_id, hasher, emit);
    }
}

fn process_job(
    job: FileJob,
    dirs: &[DirRecord],
    base_path: &Utf8Path,
    hasher: &NodeHasher,
    emit: &Sender<ReportTailLine>,
    warnings: &Mutex<Vec<String>>,
    ignore_perm_errors: bool,
) -> Result<()> {
    let abs_path = base_path.join(&job.rel_path);
    match &job.kind {
        JobKind::File => {
            let file = io_result(&abs_path, std::fs::File::open(&abs_path), ignore_perm_errors, warnings)?;
            match file {
                Some(mut f) => {
                    let content_hash = hasher.hash_file_content(&mut f)?;
                    let hash = hasher.hash_file(&job.basename, &content_hash);
                    emit_and_bubble(&job, hash, dirs, hasher, emit);
                }
                None => skip_and_bubble(&job, dirs, hasher, emit),
            }
        }
        JobKind::Symlink(target) => {
            let hash = hasher.hash_opaque(NodeType::Symlink, &job.basename, Some(target));
            emit_and_bubble(&job, hash, dirs, hasher, emit);
        }
        JobKind::Device => {
            let hash = hasher.hash_opaque(NodeType::Device, &job.basename, None);
            emit_and_bubble(&job, hash, dirs, hasher, emit);
        }
        JobKind::Fifo => {
            let hash = hasher.hash_opaque(NodeType::Fifo, &job.basename, None);
            emit_and_bubble(&job, hash, dirs, hasher, emit);
        }
        JobKind::Socket => {
            let hash = hasher.hash_opaque(NodeType::Socket, &job.basename, None);
            emit_and_bubble(&job, hash, dirs, hasher, emit);
        }
    }
    Ok(())
}

/// A running walk: tail lines arrive on `receiver` in post-order as they're
/// produced; call `join` after draining it to collect warnings or the first
/// fatal error.
pub struct WalkHandle {
    pub receiver: Receiver<ReportTailLine>,
    join: std::thread::JoinHandle<Result<Vec<String>>>,
}

impl WalkHandle {
    pub fn join(self) -> Result<Vec<String>> {
        match self.join.join() {
            Ok(result) => result,
            Err(_) => Err(DupfilesError::InvariantViolation { message: "walker thread panicked".to_string() }),
        }
    }
}

/// Starts a walk in the background and returns immediately with a handle
/// whose `receiver` streams `ReportTailLine`s in post-order as they're
/// produced — the caller (typically the report writer) doesn't have to wait
/// for the whole tree before consuming the first line.
pub fn walk(config: WalkConfig) -> Result<WalkHandle> {
    let (tx, rx) = crossbeam::channel::unbounded::<ReportTailLine>();

    let join = std::thread::spawn(move || -> Result<Vec<String>> {
        let warnings = Mutex::new(Vec::new());
        let base_path = config.base_path.clone();
        let root_basename = base_path.file_name().unwrap_or("").to_string();

        let discovered = discover(&base_path, Utf8Path::new(""), &root_basename, true, &config, &warnings)?
            .ok_or_else(|| DupfilesError::NotFound { path: base_path.clone() })?;

        let (dirs, jobs, ready) = flatten(discovered, config.order);
        let dirs = Arc::new(dirs);
        let hasher = NodeHasher::new(&config.algorithm, config.mode)?;

        // Childless directories finalize immediately, single-threaded; their
        // cascade (via finalize_dir's own upward walk) handles any ancestor
        // chain that turns out to be entirely empty too.
        for id in ready {
            finalize_dir(&dirs, id, &hasher, &tx);
        }

        if !jobs.is_empty() {
            let (job_tx, job_rx) = crossbeam::channel::unbounded::<FileJob>();
            for job in jobs {
                job_tx.send(job).expect("job receiver outlives this send");
            }
            drop(job_tx);

            let abort = Arc::new(AtomicBool::new(false));
            let first_error: Arc<Mutex<Option<DupfilesError>>> = Arc::new(Mutex::new(None));
            let num_workers = config.workers.max(1);
            let algorithm = config.algorithm.clone();
            let mode = config.mode;
            let ignore_perm_errors = config.ignore_perm_errors;

            std::thread::scope(|scope| {
                for worker_id in 0..num_workers {
                    let job_rx = job_rx.clone();
                    let dirs = Arc::clone(&dirs);
                    let tx = tx.clone();
                    let warnings = &warnings;
                    let abort = Arc::clone(&abort);
                    let first_error = Arc::clone(&first_error);
                    let algorithm = algorithm.clone();
                    let base_path = base_path.clone();

                    scope.spawn(move || {
                        let _span = tracing::debug_span!("walker_worker", id = worker_id).entered();
                        let hasher = match NodeHasher::new(&algorithm, mode) {
                            Ok(h) => h,
                            Err(e) => {
                                *first_error.lock().unwrap() = Some(e);
                                abort.store(true, Ordering::SeqCst);
                                return;
                            }
                        };
                        while !abort.load(Ordering::Acquire) {
                            match job_rx.recv() {
                                Ok(job) => {
                                    if let Err(e) =
                                        process_job(job, &dirs, &base_path, &hasher, &tx, warnings, ignore_perm_errors)
                                    {
                                        *first_error.lock().unwrap() = Some(e);
                                        abort.store(true, Ordering::SeqCst);
                                        return;
                                    }
                                }
                                Err(_) => break,
                            }
                        }
                    });
                }
            });

            if abort.load(Ordering::Acquire) {
                drop(tx);
                return Err(first_error.lock().unwrap().take().unwrap_or(DupfilesError::Cancelled));
            }
        }

        drop(tx);
        Ok(warnings.into_inner().unwrap())
    });

    Ok(WalkHandle { receiver: rx, join })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn cfg(base: Utf8PathBuf, order: TraversalOrder, mode: HashMode) -> WalkConfig {
        WalkConfig {
            base_path: base,
            order,
            excludes: ExcludeRules::default(),
            mode,
            algorithm: "fnv-1a-128".to_string(),
            workers: 2,
            ignore_perm_errors: false,
            skip_empty_dirs: false,
        }
    }

    fn drain(handle: WalkHandle) -> (Vec<ReportTailLine>, Vec<String>) {
        let lines: Vec<_> = handle.receiver.iter().collect();
        let warnings = handle.join.join().unwrap().unwrap();
        (lines, warnings)
    }

    #[test]
    fn post_order_root_is_last_and_children_precede_it() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hi\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), "hi\n").unwrap();

        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let handle = walk(cfg(base, TraversalOrder::Dfs, HashMode::Three)).unwrap();
        let (lines, warnings) = drain(handle);

        assert!(warnings.is_empty());
        assert_eq!(lines.last().unwrap().path.as_str(), "");
        assert_eq!(lines.len(), 4); // a.txt, sub/b.txt, sub, root

        let root_index = lines.iter().position(|l| l.path.as_str() == "").unwrap();
        let sub_index = lines.iter().position(|l| l.path.as_str() == "sub").unwrap();
        let leaf_index = lines.iter().position(|l| l.path.as_str() == "sub/b.txt").unwrap();
        assert!(leaf_index < sub_index);
        assert!(sub_index < root_index);
    }

    #[test]
    fn dfs_and_bfs_produce_the_same_set_of_lines() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), "y").unwrap();
        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

        let dfs = drain(walk(cfg(base.clone(), TraversalOrder::Dfs, HashMode::Three)).unwrap()).0;
        let bfs = drain(walk(cfg(base, TraversalOrder::Bfs, HashMode::Three)).unwrap()).0;

        let mut dfs_hashes: Vec<_> = dfs.iter().map(|l| l.hash.to_hex()).collect();
        let mut bfs_hashes: Vec<_> = bfs.iter().map(|l| l.hash.to_hex()).collect();
        dfs_hashes.sort();
        bfs_hashes.sort();
        assert_eq!(dfs_hashes, bfs_hashes);
    }

    #[test]
    fn empty_directory_finalizes_with_empty_children() {
        let dir = tempdir().unwrap();
        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let handle = walk(cfg(base, TraversalOrder::Dfs, HashMode::Content)).unwrap();
        let (lines, _) = drain(handle);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].node_type, NodeType::Dir);
        assert_eq!(lines[0].path.as_str(), "");
    }

    #[test]
    fn exclude_basename_hides_matching_nodes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), "1").unwrap();
        fs::write(dir.path().join("skip.txt"), "2").unwrap();
        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

        let mut config = cfg(base, TraversalOrder::Dfs, HashMode::Three);
        config.excludes.basename.insert("skip.txt".to_string());
        let (lines, _) = drain(walk(config).unwrap());

        assert!(lines.iter().any(|l| l.path.as_str() == "keep.txt"));
        assert!(!lines.iter().any(|l| l.path.as_str() == "skip.txt"));
    }

    #[test]
    fn skip_empty_dirs_hides_a_directory_with_no_surviving_children() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hi").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

        let mut config = cfg(base, TraversalOrder::Dfs, HashMode::Three);
        config.skip_empty_dirs = true;
        let (lines, _) = drain(walk(config).unwrap());

        assert!(!lines.iter().any(|l| l.path.as_str() == "empty"));
        assert!(lines.iter().any(|l| l.path.as_str() == "a.txt"));
    }

    #[test]
    fn skip_empty_dirs_never_hides_the_root_itself() {
        let dir = tempdir().unwrap();
        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

        let mut config = cfg(base, TraversalOrder::Dfs, HashMode::Three);
        config.skip_empty_dirs = true;
        let (lines, _) = drain(walk(config).unwrap());

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].path.as_str(), "");
    }

    #[test]
    fn missing_root_is_an_error() {
        let base = Utf8PathBuf::from("/does/not/exist/hopefully");
        let err = walk(cfg(base, TraversalOrder::Dfs, HashMode::Three)).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn content_mode_two_identical_trees_under_different_names_match() {
        let root = tempdir().unwrap();
        for name in ["one", "two"] {
            let sub = root.path().join(name);
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join("file.txt"), "same content").unwrap();
        }
        let base = Utf8PathBuf::try_from(root.path().to_path_buf()).unwrap();
        let (lines, _) = drain(walk(cfg(base, TraversalOrder::Dfs, HashMode::Content)).unwrap());

        let one = lines.iter().find(|l| l.path.as_str() == "one").unwrap();
        let two = lines.iter().find(|l| l.path.as_str() == "two").unwrap();
        assert_eq!(one.hash, two.hash, "content mode ignores directory basenames too");
    }
}
