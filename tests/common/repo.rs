use assert_fs::TempDir;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use gitread::Repository;
use gitread::areas::database::Database;
use gitread::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const AUTHOR: &str = "Ada Lovelace <ada@example.com>";
pub const START_TIME: i64 = 1_700_000_000;

/// A bare-bones repository written object by object, without a git binary.
///
/// `commit` snapshots a whole file list, chains it onto the previous commit
/// and moves `refs/heads/main`.
pub struct TestRepo {
    dir: TempDir,
    head: Option<ObjectId>,
    clock: i64,
}

enum Node {
    File(ObjectId),
    Dir(BTreeMap<String, Node>),
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let git_dir = dir.path().join(".git");
        std::fs::create_dir_all(git_dir.join("objects").join("pack")).expect("objects dir");
        std::fs::create_dir_all(git_dir.join("refs").join("heads")).expect("refs dir");
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").expect("HEAD");

        TestRepo {
            dir,
            head: None,
            clock: START_TIME,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> PathBuf {
        self.dir.path().join(".git")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.git_dir().join("objects")
    }

    pub fn head(&self) -> Option<&ObjectId> {
        self.head.as_ref()
    }

    pub fn repository(&self) -> Repository {
        Repository::open(self.path()).expect("repository opens")
    }

    pub fn database(&self) -> Database {
        Database::open(&self.objects_dir(), HashAlgorithm::Sha1).expect("database opens")
    }

    pub fn object_id(kind: &str, payload: &[u8]) -> ObjectId {
        let header = format!("{kind} {}\0", payload.len());
        HashAlgorithm::Sha1.digest(&[header.as_bytes(), payload])
    }

    pub fn loose_path(&self, oid: &ObjectId) -> PathBuf {
        self.objects_dir().join(oid.to_path())
    }

    /// Store `<kind> <len>\0<payload>` as a loose object.
    pub fn write_object(&self, kind: &str, payload: &[u8]) -> ObjectId {
        let oid = Self::object_id(kind, payload);
        let mut content = format!("{kind} {}\0", payload.len()).into_bytes();
        content.extend_from_slice(payload);
        self.write_loose_content(&oid, &content);
        oid
    }

    /// Compress `content` (header included) into the loose file for `oid`,
    /// whatever it actually hashes to.
    pub fn write_loose_content(&self, oid: &ObjectId, content: &[u8]) {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).expect("compress");
        self.write_loose_file(oid, &encoder.finish().expect("compress"));
    }

    /// Write raw (already compressed, or deliberately broken) bytes as the
    /// loose file for `oid`.
    pub fn write_loose_file(&self, oid: &ObjectId, bytes: &[u8]) {
        let path = self.loose_path(oid);
        std::fs::create_dir_all(path.parent().expect("fan-out dir")).expect("fan-out dir");
        std::fs::write(path, bytes).expect("loose object");
    }

    pub fn remove_loose(&self, oid: &ObjectId) {
        std::fs::remove_file(self.loose_path(oid)).expect("loose object exists");
    }

    pub fn write_blob(&self, content: impl AsRef<[u8]>) -> ObjectId {
        self.write_object("blob", content.as_ref())
    }

    /// Write a tree from `(mode, name, oid)` entries in git's canonical order.
    pub fn write_tree(&self, entries: &[(&str, &str, &ObjectId)]) -> ObjectId {
        let mut entries = entries.to_vec();
        entries.sort_by_key(|(mode, name, _)| {
            if *mode == "40000" {
                format!("{name}/")
            } else {
                name.to_string()
            }
        });

        let mut payload = Vec::new();
        for (mode, name, oid) in entries {
            payload.extend_from_slice(format!("{mode} {name}\0").as_bytes());
            payload.extend_from_slice(oid.as_bytes());
        }

        self.write_object("tree", &payload)
    }

    /// Write blobs and nested trees for `files` (slash separated paths).
    pub fn write_snapshot(&self, files: &[(&str, &str)]) -> ObjectId {
        let mut root = BTreeMap::new();
        for (path, content) in files {
            let oid = self.write_blob(content);
            let mut parts = path.split('/').collect::<Vec<_>>();
            let file_name = parts.pop().expect("non-empty path");

            let mut dir = &mut root;
            for part in parts {
                let node = dir
                    .entry(part.to_string())
                    .or_insert_with(|| Node::Dir(BTreeMap::new()));
                dir = match node {
                    Node::Dir(children) => children,
                    Node::File(_) => panic!("{part} is both a file and a directory"),
                };
            }
            dir.insert(file_name.to_string(), Node::File(oid));
        }

        self.write_dir(&root)
    }

    fn write_dir(&self, dir: &BTreeMap<String, Node>) -> ObjectId {
        let children = dir
            .iter()
            .map(|(name, node)| match node {
                Node::File(oid) => ("100644", name.as_str(), oid.clone()),
                Node::Dir(children) => ("40000", name.as_str(), self.write_dir(children)),
            })
            .collect::<Vec<_>>();
        let entries = children
            .iter()
            .map(|(mode, name, oid)| (*mode, *name, oid))
            .collect::<Vec<_>>();

        self.write_tree(&entries)
    }

    /// Write a commit object; the author date advances one minute per call.
    pub fn write_commit(&mut self, tree: &ObjectId, parent: Option<&ObjectId>, message: &str) -> ObjectId {
        self.clock += 60;
        let mut payload = format!("tree {tree}\n");
        if let Some(parent) = parent {
            payload.push_str(&format!("parent {parent}\n"));
        }
        payload.push_str(&format!("author {AUTHOR} {} +0000\n", self.clock));
        payload.push_str(&format!("committer {AUTHOR} {} +0000\n", self.clock));
        payload.push_str(&format!("\n{message}\n"));

        self.write_object("commit", payload.as_bytes())
    }

    pub fn set_head(&mut self, oid: &ObjectId) {
        std::fs::write(
            self.git_dir().join("refs").join("heads").join("main"),
            format!("{oid}\n"),
        )
        .expect("branch ref");
        self.head = Some(oid.clone());
    }

    /// Commit a full snapshot of `files` on top of the current HEAD.
    pub fn commit(&mut self, files: &[(&str, &str)], message: &str) -> ObjectId {
        let tree = self.write_snapshot(files);
        self.commit_tree(&tree, message)
    }

    pub fn commit_tree(&mut self, tree: &ObjectId, message: &str) -> ObjectId {
        let parent = self.head.clone();
        let oid = self.write_commit(tree, parent.as_ref(), message);
        self.set_head(&oid);
        oid
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
