use std::path::Path;

use crate::error::Result;

/// Abstract storage engine interface (line-level file operations)
///
/// Different from sql::engine::Engine which operates on databases and tables.
/// Paths are relative to the engine root and use `/`-free components joined
/// with `Path::join`.
pub trait Engine {
    type LineIterator<'a>: LineIterator
    where
        Self: 'a;

    /// Returns true if a file or directory exists at `path`
    fn exists(&self, path: &Path) -> bool;
    /// Returns true if `path` is a directory
    fn is_dir(&self, path: &Path) -> bool;
    /// Creates a directory and any missing parents
    fn create_dir(&mut self, path: &Path) -> Result<()>;
    /// Removes a directory and everything below it
    fn remove_dir(&mut self, path: &Path) -> Result<()>;
    /// Lists the names of the directories directly below `path`, sorted
    fn list_dirs(&self, path: &Path) -> Result<Vec<String>>;

    /// Appends one line (a newline is added) and flushes, creating the file if needed
    fn append_line(&mut self, path: &Path, line: &str) -> Result<()>;
    /// Replaces the whole file with `lines` in one step
    fn write_lines(&mut self, path: &Path, lines: &[String]) -> Result<()>;
    /// Lazily reads the file line by line
    fn read_lines(&self, path: &Path) -> Result<Self::LineIterator<'_>>;
    /// Removes a single file; missing files are ignored
    fn remove_file(&mut self, path: &Path) -> Result<()>;
}

/// Storage engine line iterator
pub trait LineIterator: Iterator<Item = Result<String>> {}
