use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    slice,
};

use crate::{
    error::{Error, Result},
    storage::engine::{Engine, LineIterator},
};

/// In-memory storage engine
///
/// Files are line vectors keyed by path; directories are tracked explicitly so
/// that listing and recursive removal behave like the disk engine.
#[derive(Default)]
pub struct MemoryEngine {
    files: BTreeMap<PathBuf, Vec<String>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(dir) = parent.filter(|p| !p.as_os_str().is_empty()) {
            self.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
    }
}

/// Implements storage Engine trait (line-level operations)
impl Engine for MemoryEngine {
    type LineIterator<'a> = MemoryLineIterator<'a>;

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn create_dir(&mut self, path: &Path) -> Result<()> {
        self.add_parents(path);
        self.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_dir(&mut self, path: &Path) -> Result<()> {
        if !self.dirs.contains(path) {
            return Err(Error::Internal(format!("no such directory {}", path.display())));
        }
        self.files.retain(|p, _| !p.starts_with(path));
        self.dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }

    fn list_dirs(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self
            .dirs
            .iter()
            .filter(|d| d.parent() == Some(path))
            .filter_map(|d| d.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect())
    }

    fn append_line(&mut self, path: &Path, line: &str) -> Result<()> {
        self.add_parents(path);
        self.files.entry(path.to_path_buf()).or_default().push(line.to_string());
        Ok(())
    }

    fn write_lines(&mut self, path: &Path, lines: &[String]) -> Result<()> {
        self.add_parents(path);
        self.files.insert(path.to_path_buf(), lines.to_vec());
        Ok(())
    }

    fn read_lines(&self, path: &Path) -> Result<Self::LineIterator<'_>> {
        match self.files.get(path) {
            Some(lines) => Ok(MemoryLineIterator { inner: lines.iter() }),
            None => Err(Error::Internal(format!("no such file {}", path.display()))),
        }
    }

    fn remove_file(&mut self, path: &Path) -> Result<()> {
        self.files.remove(path);
        Ok(())
    }
}

/// In-memory storage engine iterator
pub struct MemoryLineIterator<'a> {
    inner: slice::Iter<'a, String>,
}

impl<'a> LineIterator for MemoryLineIterator<'a> {}

impl<'a> Iterator for MemoryLineIterator<'a> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|line| Ok(line.clone()))
    }
}
