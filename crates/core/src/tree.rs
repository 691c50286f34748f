//! Reconstruction of a torrent's directory hierarchy from its flat file list.
//!
//! Every call to [`build_tree`] allocates its own root, so concurrent
//! ingestions never share builder state.

use serde::{Deserialize, Serialize};

/// A file as listed in torrent metadata: `/`-joined relative path and size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// A file leaf inside a [`Directory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLeaf {
    pub name: String,
    pub size: u64,
}

/// A directory node. The root has an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dirs: Vec<Directory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileLeaf>,
}

impl Directory {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Child directory with this exact name, created if missing.
    fn dir_mut(&mut self, name: &str) -> &mut Directory {
        let idx = match self.dirs.iter().position(|d| d.name == name) {
            Some(idx) => idx,
            None => {
                self.dirs.push(Directory::named(name));
                self.dirs.len() - 1
            }
        };
        &mut self.dirs[idx]
    }

    /// Insert a file leaf unless one with this exact name already exists.
    fn add_file(&mut self, name: &str, size: u64) {
        if !self.files.iter().any(|f| f.name == name) {
            self.files.push(FileLeaf {
                name: name.to_string(),
                size,
            });
        }
    }

    pub fn find_dir(&self, name: &str) -> Option<&Directory> {
        self.dirs.iter().find(|d| d.name == name)
    }

    pub fn find_file(&self, name: &str) -> Option<&FileLeaf> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Number of file leaves in this subtree.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.dirs.iter().map(Directory::file_count).sum::<usize>()
    }

    /// Sum of leaf sizes in this subtree.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum::<u64>()
            + self.dirs.iter().map(Directory::total_size).sum::<u64>()
    }
}

/// Build a nested directory structure from `(path, size)` entries.
///
/// Intermediate segments are looked up by name at each level before being
/// created, and the terminal segment becomes a file leaf, again de-duplicated
/// by exact name. Empty segments (leading, trailing or doubled slashes) are
/// ignored; an entry with no segments at all is dropped.
pub fn build_tree(entries: &[FileEntry]) -> Directory {
    let mut root = Directory::default();

    for entry in entries {
        let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, parents)) = segments.split_last() else {
            continue;
        };

        let mut parent = &mut root;
        for segment in parents {
            parent = parent.dir_mut(segment);
        }
        parent.add_file(file_name, entry.size);
    }

    root
}
