//! Object database
//!
//! Resolves object ids to decoded objects across loose and packed storage.
//!
//! ## Lookup order
//!
//! For the repository's own `objects/` directory and then each alternate:
//! 1. the loose object file `objects/xx/yyyy...`
//! 2. every `objects/pack/pack-*.idx` index, in file-name order
//!
//! ## Caching
//!
//! A `Database` lives for one query. Commits and trees are memoized by value
//! (behind `Arc`); blobs only by `Weak` reference, so a blob stays cached while
//! some caller still holds it and is dropped as soon as nobody does.

use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::diff::tree_diff::TreeDiff;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, RawObject};
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::artifacts::pack::delta::apply_delta;
use crate::artifacts::pack::pack_file::{ChainBase, MAX_DELTA_CHAIN, PackFile};
use crate::errors::{GitError, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use walkdir::WalkDir;

/// One object directory: loose fan-out folders plus its packs
#[derive(Debug)]
struct ObjectSource {
    path: PathBuf,
    packs: Vec<PackFile>,
}

impl ObjectSource {
    fn open(path: PathBuf, algorithm: HashAlgorithm) -> Result<Self> {
        let pack_dir = path.join("pack");
        let mut packs = Vec::new();

        if pack_dir.is_dir() {
            for entry in WalkDir::new(&pack_dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                let entry = entry.map_err(std::io::Error::from)?;
                let is_index = entry.path().extension().is_some_and(|ext| ext == "idx");
                if is_index && entry.path().with_extension("pack").is_file() {
                    packs.push(PackFile::open(entry.path(), algorithm)?);
                }
            }
        }

        tracing::debug!(objects = %path.display(), packs = packs.len(), "opened object source");
        Ok(ObjectSource { path, packs })
    }

    fn read_loose(&self, oid: &ObjectId) -> Result<Option<Bytes>> {
        let object_path = self.path.join(oid.to_path());
        let compressed = match std::fs::read(&object_path) {
            Ok(compressed) => compressed,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut decoder = flate2::read::ZlibDecoder::new(&compressed[..]);
        let mut content = Vec::new();
        decoder
            .read_to_end(&mut content)
            .map_err(|e| GitError::corrupt(oid, format!("bad zlib stream: {e}")))?;

        Ok(Some(content.into()))
    }
}

/// Where the next link of a resolution was found
enum Located {
    Loose(RawObject),
    Packed {
        base: ChainBase,
        deltas: Vec<Bytes>,
    },
}

/// Counters exposed for instrumentation and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Objects read from disk (cache misses)
    pub reads: usize,
    /// Lookups answered from the cache
    pub cache_hits: usize,
}

#[derive(Debug)]
pub struct Database {
    sources: Vec<ObjectSource>,
    algorithm: HashAlgorithm,
    commits: Mutex<HashMap<ObjectId, Arc<Commit>>>,
    trees: Mutex<HashMap<ObjectId, Arc<Tree>>>,
    blobs: Mutex<HashMap<ObjectId, Weak<Blob>>>,
    reads: AtomicUsize,
    cache_hits: AtomicUsize,
}

impl Database {
    /// Open `objects_path` and any alternates listed in `info/alternates`.
    pub fn open(objects_path: &Path, algorithm: HashAlgorithm) -> Result<Self> {
        let mut sources = vec![ObjectSource::open(objects_path.to_path_buf(), algorithm)?];

        for alternate in Self::alternates(objects_path)? {
            if alternate.is_dir() {
                sources.push(ObjectSource::open(alternate, algorithm)?);
            } else {
                tracing::warn!(alternate = %alternate.display(), "skipping missing alternate");
            }
        }

        Ok(Database {
            sources,
            algorithm,
            commits: Mutex::new(HashMap::new()),
            trees: Mutex::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
            reads: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
        })
    }

    fn alternates(objects_path: &Path) -> Result<Vec<PathBuf>> {
        let alternates_path = objects_path.join("info").join("alternates");
        let content = match std::fs::read_to_string(&alternates_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| objects_path.join(line))
            .collect())
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn objects_path(&self) -> &Path {
        &self.sources[0].path
    }

    pub fn pack_count(&self) -> usize {
        self.sources.iter().map(|source| source.packs.len()).sum()
    }

    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            reads: self.reads.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    pub fn tree_diff(
        &self,
        old_oid: Option<&ObjectId>,
        new_oid: Option<&ObjectId>,
        path_filter: &PathFilter,
    ) -> Result<TreeDiff<'_>> {
        let mut tree_diff = TreeDiff::new(self);
        tree_diff.compare_oids(old_oid, new_oid, Path::new(""), path_filter)?;
        Ok(tree_diff)
    }

    /// Resolve `oid` to a decoded object, consulting the cache first.
    pub fn resolve(&self, oid: &ObjectId) -> Result<Object> {
        if let Some(object) = self.cached(oid) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(object);
        }

        let raw = self.load_raw(oid)?;
        raw.verify(oid)?;
        let object = raw.decode(oid)?;
        self.remember(oid, &object);

        Ok(object)
    }

    pub fn load_commit(&self, oid: &ObjectId) -> Result<Arc<Commit>> {
        match self.resolve(oid)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(Self::unexpected_type(oid, ObjectType::Commit, &other)),
        }
    }

    pub fn load_tree(&self, oid: &ObjectId) -> Result<Arc<Tree>> {
        match self.resolve(oid)? {
            Object::Tree(tree) => Ok(tree),
            other => Err(Self::unexpected_type(oid, ObjectType::Tree, &other)),
        }
    }

    pub fn load_blob(&self, oid: &ObjectId) -> Result<Arc<Blob>> {
        match self.resolve(oid)? {
            Object::Blob(blob) => Ok(blob),
            other => Err(Self::unexpected_type(oid, ObjectType::Blob, &other)),
        }
    }

    /// Walk `path` (slash separated) down from `tree_oid`.
    ///
    /// Returns `None` when any component is missing or a non-final component
    /// is not a directory.
    pub fn lookup_path(&self, tree_oid: &ObjectId, path: &Path) -> Result<Option<TreeEntry>> {
        let mut components = path
            .components()
            .filter_map(|component| component.as_os_str().to_str())
            .peekable();
        let mut tree = self.load_tree(tree_oid)?;

        while let Some(name) = components.next() {
            let Some(entry) = tree.entry(name).cloned() else {
                return Ok(None);
            };

            if components.peek().is_none() {
                return Ok(Some(entry));
            }
            if !entry.is_tree() {
                return Ok(None);
            }

            tree = self
                .load_tree(&entry.oid)
                .map_err(|e| e.at_path(path))?;
        }

        Ok(None)
    }

    fn unexpected_type(oid: &ObjectId, expected: ObjectType, found: &Object) -> GitError {
        GitError::corrupt(
            oid,
            format!("expected {expected}, found {}", found.object_type()),
        )
    }

    fn cached(&self, oid: &ObjectId) -> Option<Object> {
        if let Some(commit) = lock(&self.commits).get(oid) {
            return Some(Object::Commit(commit.clone()));
        }
        if let Some(tree) = lock(&self.trees).get(oid) {
            return Some(Object::Tree(tree.clone()));
        }
        lock(&self.blobs)
            .get(oid)
            .and_then(Weak::upgrade)
            .map(Object::Blob)
    }

    fn remember(&self, oid: &ObjectId, object: &Object) {
        match object {
            Object::Commit(commit) => {
                lock(&self.commits).insert(oid.clone(), commit.clone());
            }
            Object::Tree(tree) => {
                lock(&self.trees).insert(oid.clone(), tree.clone());
            }
            Object::Blob(blob) => {
                let mut blobs = lock(&self.blobs);
                blobs.retain(|_, weak| weak.strong_count() > 0);
                blobs.insert(oid.clone(), Arc::downgrade(blob));
            }
        }
    }

    /// Read the raw bytes of `oid`, replaying delta chains iteratively.
    ///
    /// A ref-delta whose base is stored elsewhere (loose, another pack or an
    /// alternate) continues the same loop with that base id instead of
    /// recursing.
    pub fn load_raw(&self, oid: &ObjectId) -> Result<RawObject> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let mut pending: Vec<Bytes> = Vec::new();
        let mut target = oid.clone();

        let base = loop {
            let located = self.locate(&target)?.ok_or_else(|| {
                if &target == oid {
                    GitError::not_found(oid)
                } else {
                    GitError::corrupt(oid, format!("missing delta base {target}"))
                }
            })?;

            match located {
                Located::Loose(raw) => break raw,
                Located::Packed { base, deltas } => {
                    pending.extend(deltas);
                    match base {
                        ChainBase::Object(raw) => break raw,
                        ChainBase::External(next) => {
                            if pending.len() > MAX_DELTA_CHAIN {
                                return Err(GitError::corrupt(oid, "delta chain too long"));
                            }
                            target = next;
                        }
                    }
                }
            }
        };

        if !pending.is_empty() {
            tracing::trace!(%oid, depth = pending.len(), "replaying delta chain");
        }

        let object_type = base.object_type;
        let mut data = base.payload;
        for delta in pending.iter().rev() {
            data = apply_delta(&data, delta)
                .map_err(|reason| GitError::corrupt(oid, reason))?
                .into();
        }

        Ok(RawObject::new(object_type, data))
    }

    fn locate(&self, oid: &ObjectId) -> Result<Option<Located>> {
        for source in &self.sources {
            if let Some(content) = source.read_loose(oid)? {
                tracing::trace!(%oid, "loose object hit");
                return Ok(Some(Located::Loose(RawObject::parse_loose(oid, content)?)));
            }

            for pack in &source.packs {
                if let Some(offset) = pack.find_offset(oid) {
                    let chain = pack.read_chain(oid, offset)?;
                    return Ok(Some(Located::Packed {
                        base: chain.base,
                        deltas: chain.deltas,
                    }));
                }
            }
        }

        Ok(None)
    }
}

/// Lock a cache map, recovering the data if another worker panicked.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
