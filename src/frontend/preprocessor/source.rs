//! Source loading for `#include`
//!
//! Files are named by logical paths: `/`-separated, relative to the project
//! root, with `.` and `..` resolved. A [`SourceLoader`] maps those names to
//! text.

use std::path::PathBuf;

use anyhow::Context;
use hashbrown::HashMap;

/// Where included files come from
pub trait SourceLoader: Send + Sync {
    fn exists(
        &self,
        path: &str,
    ) -> bool;

    fn load(
        &self,
        path: &str,
    ) -> anyhow::Result<String>;
}

/// Loads files relative to a root directory
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(
        &self,
        path: &str,
    ) -> PathBuf {
        self.root.join(path)
    }
}

impl SourceLoader for FsLoader {
    fn exists(
        &self,
        path: &str,
    ) -> bool {
        self.resolve(path).is_file()
    }

    fn load(
        &self,
        path: &str,
    ) -> anyhow::Result<String> {
        let full = self.resolve(path);
        let bytes = std::fs::read(&full).with_context(|| format!("reading {}", full.display()))?;
        // Strip a UTF-8 BOM if present
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }
}

/// In-memory file set
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(
        mut self,
        path: &str,
        text: impl Into<String>,
    ) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(
        &mut self,
        path: &str,
        text: impl Into<String>,
    ) {
        self.files.insert(normalize_path(path), text.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn exists(
        &self,
        path: &str,
    ) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    fn load(
        &self,
        path: &str,
    ) -> anyhow::Result<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .with_context(|| format!("no such file: {}", path))
    }
}

/// Lexically normalize a logical path
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            part => parts.push(part),
        }
    }
    parts.join("/")
}

/// Directory part of a logical path, empty at the root
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

/// Resolve `relative` against the directory containing `from`
pub fn resolve_relative(
    from: &str,
    relative: &str,
) -> String {
    let dir = parent_dir(from);
    if dir.is_empty() {
        normalize_path(relative)
    } else {
        normalize_path(&format!("{}/{}", dir, relative))
    }
}

/// Lowercased extension of a logical path, without the dot
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_path("code\\a/./b/../c.dm"), "code/a/c.dm");
        assert_eq!(normalize_path("../x.dm"), "../x.dm");
        assert_eq!(resolve_relative("code/main.dm", "sub/x.dm"), "code/sub/x.dm");
        assert_eq!(resolve_relative("main.dme", "maps\\a.dmm"), "maps/a.dmm");
        assert_eq!(extension("maps/A.DMM").as_deref(), Some("dmm"));
        assert_eq!(extension("noext"), None);
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with_file("code/a.dm", "x");
        assert!(loader.exists("code\\a.dm"));
        assert_eq!(loader.load("./code/a.dm").unwrap(), "x");
        assert!(loader.load("b.dm").is_err());
    }

    #[test]
    fn test_fs_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("code")).unwrap();
        std::fs::write(dir.path().join("code/a.dm"), "\u{feff}var/x").unwrap();

        let loader = FsLoader::new(dir.path());
        assert!(loader.exists("code/a.dm"));
        assert_eq!(loader.load("code/a.dm").unwrap(), "var/x");
        assert!(!loader.exists("code/b.dm"));
    }
}
