use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;

/// Restricts a tree walk to the entries leading to a set of paths.
///
/// Once a requested path is reached, everything below it matches, so a
/// filter on a directory selects the whole subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter {
    path_trie: Trie<String>,
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::empty()
    }
}

impl PathFilter {
    /// Filter that lets every entry through
    pub fn empty() -> Self {
        Self {
            path_trie: Trie::with_matching(true),
        }
    }

    pub fn new<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        let mut trie = Trie::new();
        for path in paths {
            let components: Vec<String> = path
                .as_ref()
                .components()
                .map(|comp| comp.as_os_str().to_string_lossy().to_string())
                .collect();
            trie.insert(&components);
        }

        Self { path_trie: trie }
    }

    pub fn for_path(path: &Path) -> Self {
        Self::new([path])
    }

    pub fn matches_all(&self) -> bool {
        self.path_trie.is_matching
    }

    /// Whether the entry `name` at this level is on the way to (or below) a requested path
    pub fn matches(&self, name: &str) -> bool {
        self.path_trie.contains_single(name)
    }

    /// Filter to apply one level down, inside `name`
    pub fn descend(&self, name: &str) -> Self {
        if self.path_trie.is_matching {
            return self.clone();
        }

        Self {
            path_trie: self
                .path_trie
                .children
                .get(name)
                .cloned()
                .unwrap_or_else(Trie::new),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trie<T: Hash + Eq + Clone> {
    is_matching: bool,
    children: HashMap<T, Trie<T>>,
}

impl<T: Hash + Eq + Clone> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> Trie<T> {
    pub fn new() -> Self {
        Self::with_matching(false)
    }

    pub fn with_matching(is_matching: bool) -> Self {
        Trie {
            is_matching,
            children: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: &[T]) {
        let mut node = self;
        for part in path {
            node = node.children.entry(part.clone()).or_insert_with(Trie::new);
        }
        node.is_matching = true;
    }

    pub fn contains(&self, path: &[T]) -> bool {
        let mut node = self;
        for part in path {
            match node.children.get(part) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.is_matching
    }

    pub fn contains_single<Q>(&self, path_part: &Q) -> bool
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.is_matching || self.children.contains_key(path_part)
    }
}
