//! Source provider abstraction for reading sample files.
//!
//! The built-in checker reads `.bind` samples through a [`SourceProvider`]
//! so the same oracle works against the real filesystem and against an
//! in-memory corpus in tests.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Abstraction over how sample sources are read.
pub trait SourceProvider {
    /// Read the full contents of a sample file.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Reads sample files from the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// Serves sample files from a map of normalized paths to contents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        let files = files
            .into_iter()
            .map(|(p, c)| (Self::normalize_path(&p), c))
            .collect();
        Self { files }
    }

    /// Add or replace one file.
    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .insert(Self::normalize_path(path.as_ref()), content.into());
    }

    /// Lexically resolve `.` and `..` without touching the filesystem.
    fn normalize_path(path: &Path) -> PathBuf {
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                other => out.push(other),
            }
        }
        out
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        let normalized = Self::normalize_path(path);
        self.files.get(&normalized).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("sample not found in memory: {}", normalized.display()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_resolves_dot_and_dotdot() {
        let normalized = InMemoryProvider::normalize_path(Path::new("/a/b/../c/./d.bind"));
        assert_eq!(normalized, PathBuf::from("/a/c/d.bind"));
    }

    #[test]
    fn in_memory_read_source() {
        let mut provider = InMemoryProvider::default();
        provider.insert("/samples/order.bind", "type Order = { id: string }");
        let content = provider
            .read_source(Path::new("/samples/./order.bind"))
            .unwrap();
        assert_eq!(content, "type Order = { id: string }");

        let err = provider
            .read_source(Path::new("/samples/missing.bind"))
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
