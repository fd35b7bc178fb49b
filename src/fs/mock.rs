// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { len: usize, modified: u64 },
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Logical clock in seconds; every write advances it by one.
    clock: u64,
    deny_removal: HashSet<PathBuf>,
}

/// In-memory filesystem with a logical clock for modification times.
///
/// Each write stamps the file with the next tick, so "written later" always
/// means "newer" without sleeping in tests.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a file stamped with the next clock tick.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state.clock += 1;
        let modified = state.clock;
        insert_file(&mut state, path.as_ref(), content.into().len(), modified);
    }

    /// Add a file with an explicit modification time (seconds on the
    /// logical clock). The clock is moved forward if needed.
    pub fn add_file_at(&self, path: impl AsRef<Path>, modified: u64) {
        let mut state = self.lock();
        state.clock = state.clock.max(modified);
        insert_file(&mut state, path.as_ref(), 0, modified);
    }

    /// Change the modification time of an existing file.
    pub fn set_modified(&self, path: impl AsRef<Path>, modified: u64) {
        let mut state = self.lock();
        state.clock = state.clock.max(modified);
        if let Some(MockEntry::File { modified: m, .. }) = state.entries.get_mut(&key(path.as_ref())) {
            *m = modified;
        }
    }

    /// Make `remove` fail for this path, like a permission error would.
    pub fn deny_removal(&self, path: impl AsRef<Path>) {
        self.lock().deny_removal.insert(key(path.as_ref()));
    }

    /// All file paths currently present, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let state = self.lock();
        let mut files: Vec<PathBuf> = state
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File { .. }))
            .map(|(p, _)| p.clone())
            .collect();
        files.sort();
        files
    }

    pub fn file_len(&self, path: impl AsRef<Path>) -> Option<usize> {
        match self.lock().entries.get(&key(path.as_ref())) {
            Some(MockEntry::File { len, .. }) => Some(*len),
            _ => None,
        }
    }
}

/// `./a/b` and `a/b` name the same entry.
fn key(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn insert_file(state: &mut MockState, path: &Path, len: usize, modified: u64) {
    let path = key(path);
    let mut parent = path.parent();
    while let Some(dir) = parent {
        if dir.as_os_str().is_empty() {
            break;
        }
        state.entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
        parent = dir.parent();
    }
    state
        .entries
        .insert(path.clone(), MockEntry::File { len, modified });
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(&key(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(&key(path)), Some(MockEntry::Dir))
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        Ok(match self.lock().entries.get(&key(path)) {
            Some(MockEntry::File { modified, .. }) => Some(UNIX_EPOCH + Duration::from_secs(*modified)),
            Some(MockEntry::Dir) => Some(UNIX_EPOCH),
            None => None,
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        let path = key(path);
        let mut current = Some(path.as_path());
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            state.entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
            current = dir.parent();
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        let path = key(path);
        if state.deny_removal.contains(&path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        match state.entries.remove(&path) {
            Some(MockEntry::Dir) => {
                state.entries.retain(|p, _| !p.starts_with(&path));
                Ok(())
            }
            Some(MockEntry::File { .. }) => Ok(()),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn touch(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        state.clock += 1;
        let modified = state.clock;
        insert_file(&mut state, path, 0, modified);
        Ok(())
    }
}
