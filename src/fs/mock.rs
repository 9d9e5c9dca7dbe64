// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Paths are used verbatim as keys; tests are expected to use absolute paths.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    temp_counter: Arc<AtomicUsize>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
            temp_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build a filesystem pre-populated with `path -> contents` files.
    pub fn with_files<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fs = Self::new();
        for (path, contents) in entries {
            fs.add_file(path, contents);
        }
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dir_entry(&mut files, parent);
        }
        files.insert(path.clone(), MockEntry::File(content.into()));
        Self::link_to_parent(&mut files, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.lock();
        Self::ensure_dir_entry(&mut files, path.as_ref());
    }

    /// Delete a file or a whole directory tree, ignoring missing paths.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let mut files = self.lock();
        Self::remove_tree(&mut files, path.as_ref());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if path.as_os_str().is_empty() || files.contains_key(path) {
            return;
        }
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = path.parent() {
            if parent != path { // Avoid infinite loop at root
                Self::ensure_dir_entry(files, parent);
                Self::link_to_parent(files, path);
            }
        }
    }

    fn link_to_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str()))
        else {
            return;
        };
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }

    fn remove_tree(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) -> bool {
        if !files.contains_key(path) {
            return false;
        }
        files.retain(|p, _| !p.starts_with(path));
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                children.retain(|c| c != name);
            }
        }
        true
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.is_dir(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        if self.is_file(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        self.add_dir(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = self.lock();
        if Self::remove_tree(&mut files, path) {
            Ok(())
        } else {
            Err(anyhow!("No such directory: {:?}", path))
        }
    }

    fn temp_dir(&self, prefix: &str) -> Result<PathBuf> {
        let n = self.temp_counter.fetch_add(1, Ordering::SeqCst);
        let dir = PathBuf::from("/tmp").join(format!("{prefix}{n}"));
        self.add_dir(&dir);
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_creates_parents() {
        let fs = MockFileSystem::new();
        fs.add_file("/run/initramfs/live/setup.yaml", "disks: []");

        assert!(fs.is_dir(Path::new("/run/initramfs/live")));
        assert!(fs.is_file(Path::new("/run/initramfs/live/setup.yaml")));
    }

    #[test]
    fn remove_dir_all_drops_whole_tree() -> Result<()> {
        let fs = MockFileSystem::new();
        fs.add_file("/work/overlays/a", "a");
        fs.add_file("/work/iso/b", "b");
        fs.add_file("/workshop/keep", "c");

        fs.remove_dir_all(Path::new("/work"))?;

        assert!(!fs.exists(Path::new("/work")));
        assert!(!fs.exists(Path::new("/work/overlays/a")));
        assert!(fs.exists(Path::new("/workshop/keep")));
        assert!(fs.remove_dir_all(Path::new("/work")).is_err());
        Ok(())
    }

    #[test]
    fn temp_dirs_are_unique() -> Result<()> {
        let fs = MockFileSystem::new();
        let a = fs.temp_dir("elemental-")?;
        let b = fs.temp_dir("elemental-")?;
        assert_ne!(a, b);
        assert!(fs.is_dir(&a) && fs.is_dir(&b));
        Ok(())
    }
}
