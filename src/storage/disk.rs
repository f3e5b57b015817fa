use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Lines, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    error::{Error, Result},
    storage::engine::{Engine, LineIterator},
};

/// On-disk storage engine rooted at a data directory
///
/// Every call opens, uses and closes its own file handle; nothing is held
/// across calls.
pub struct DiskEngine {
    root: PathBuf,
}

impl DiskEngine {
    /// Opens (and creates if needed) the data directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl Engine for DiskEngine {
    type LineIterator<'a> = DiskLineIterator;

    fn exists(&self, path: &Path) -> bool {
        self.path(path).exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.path(path).is_dir()
    }

    fn create_dir(&mut self, path: &Path) -> Result<()> {
        Ok(fs::create_dir_all(self.path(path))?)
    }

    fn remove_dir(&mut self, path: &Path) -> Result<()> {
        debug!("removing directory {}", path.display());
        Ok(fs::remove_dir_all(self.path(path))?)
    }

    fn list_dirs(&self, path: &Path) -> Result<Vec<String>> {
        let dir = self.path(path);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn append_line(&mut self, path: &Path, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(path))?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    /// Writes to a temporary file next to the target and renames it over the
    /// target, so a failed write never leaves a truncated file behind.
    fn write_lines(&mut self, path: &Path, lines: &[String]) -> Result<()> {
        let target = self.path(path);
        let parent = target
            .parent()
            .ok_or_else(|| Error::Internal(format!("{} has no parent directory", path.display())))?;
        let tmp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            for line in lines {
                writeln!(writer, "{}", line)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&target)?;
        Ok(())
    }

    fn read_lines(&self, path: &Path) -> Result<Self::LineIterator<'_>> {
        let file = File::open(self.path(path))?;
        Ok(DiskLineIterator { lines: BufReader::new(file).lines() })
    }

    fn remove_file(&mut self, path: &Path) -> Result<()> {
        let target = self.path(path);
        if target.exists() {
            fs::remove_file(target)?;
        }
        Ok(())
    }
}

/// Lazy line reader over one open file
pub struct DiskLineIterator {
    lines: Lines<BufReader<File>>,
}

impl LineIterator for DiskLineIterator {}

impl Iterator for DiskLineIterator {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next().map(|line| line.map_err(Error::from))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::DiskEngine;
    use crate::{error::Result, storage::engine::Engine};

    #[test]
    fn test_write_lines_replaces_content() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut eng = DiskEngine::new(dir.path())?;
        let file = Path::new("t").join("data.txt");
        eng.create_dir(Path::new("t"))?;
        eng.append_line(&file, "old")?;
        eng.write_lines(&file, &["id ### name".to_string(), "1 ### pen".to_string()])?;

        let content = fs::read_to_string(dir.path().join(&file))?;
        assert_eq!(content, "id ### name\n1 ### pen\n");
        // no temporary files are left next to the target
        assert_eq!(fs::read_dir(dir.path().join("t"))?.count(), 1);
        Ok(())
    }
}
