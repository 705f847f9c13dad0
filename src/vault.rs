//! Vault access: the file lookup capability consumed by note projection
//!
//! Paths handed around are vault-relative with '/' separators, the same form
//! notes use in their embeds.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A file known to the vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Vault-relative path ("Maps/_resources/cave.png")
    pub path: String,
    /// File name with extension ("cave.png")
    pub name: String,
    /// Lower-cased extension without dot, empty when absent
    pub extension: String,
}

impl FileHandle {
    pub fn new(path: &str) -> Self {
        let path = normalize(path);
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let extension = crate::media::extension_of(&name).unwrap_or_default();
        Self { path, name, extension }
    }

    /// Parent folder, empty for files at the vault root
    pub fn parent(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// File name without extension
    pub fn basename(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

/// Host file capability: lookup, listing, binary reads and resource URLs
pub trait FileLookup {
    /// Every file in the vault
    fn files(&self) -> &[FileHandle];

    fn resource_url_of(&self, file: &FileHandle) -> String;

    fn read_binary(&self, file: &FileHandle) -> Result<Vec<u8>>;

    /// Re-index after files changed on the host side
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    fn find_by_exact_path(&self, path: &str) -> Option<FileHandle> {
        let wanted = normalize(path);
        self.files().iter().find(|f| f.path == wanted).cloned()
    }

    fn find_by_relative_path(&self, dir: &str, name: &str) -> Option<FileHandle> {
        self.find_by_exact_path(&join(dir, name))
    }

    /// First file whose name equals the reference's last segment, or whose
    /// path ends with the whole reference
    fn find_by_base_name(&self, name: &str) -> Option<FileHandle> {
        let reference = normalize(name);
        let base = reference.rsplit('/').next().unwrap_or(&reference);
        self.files()
            .iter()
            .find(|f| f.name == base || f.path.ends_with(reference.as_str()))
            .cloned()
    }

    fn read_text(&self, file: &FileHandle) -> Result<String> {
        let bytes = self.read_binary(file)?;
        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", file.path))
    }
}

/// Strip leading "./" and "/" and collapse backslashes
pub fn normalize(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let mut path = path.as_str();
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            break;
        }
    }
    path.to_string()
}

pub fn join(dir: &str, name: &str) -> String {
    let dir = normalize(dir);
    let name = normalize(name);
    if dir.is_empty() {
        name
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Vault backed by a directory on disk
pub struct FsVault {
    root: PathBuf,
    files: Vec<FileHandle>,
}

impl FsVault {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("Vault root {} is not a directory", root.display());
        }
        let mut vault = Self { root, files: Vec::new() };
        vault.refresh()?;
        Ok(vault)
    }

    fn absolute(&self, file: &FileHandle) -> PathBuf {
        file.path.split('/').fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

fn scan_dir(root: &Path, dir: &Path, out: &mut Vec<FileHandle>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        // .obsidian, .git, .trash
        if name.starts_with('.') {
            continue;
        }

        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable vault entry");
                continue;
            }
        };

        if file_type.is_dir() {
            scan_dir(root, &path, out)?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(FileHandle::new(&relative));
        }
    }
    Ok(())
}

impl FileLookup for FsVault {
    fn files(&self) -> &[FileHandle] {
        &self.files
    }

    fn resource_url_of(&self, file: &FileHandle) -> String {
        let absolute = self.absolute(file);
        let absolute = absolute.canonicalize().unwrap_or(absolute);
        format!("file://{}", absolute.to_string_lossy().replace(' ', "%20"))
    }

    /// Rescan the directory tree
    fn refresh(&mut self) -> Result<()> {
        let mut files = Vec::new();
        scan_dir(&self.root, &self.root, &mut files)
            .with_context(|| format!("Failed to scan vault at {}", self.root.display()))?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        info!(root = %self.root.display(), count = files.len(), "Indexed vault files");
        self.files = files;
        Ok(())
    }

    fn read_binary(&self, file: &FileHandle) -> Result<Vec<u8>> {
        let path = self.absolute(file);
        debug!(path = %path.display(), "Reading vault file");
        fs::read(&path).with_context(|| format!("Failed to read vault file {}", path.display()))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryVault;
    use super::*;

    #[test]
    fn test_file_handle_parts() {
        let file = FileHandle::new("./Maps/_resources/Cave Entrance.PNG");
        assert_eq!(file.path, "Maps/_resources/Cave Entrance.PNG");
        assert_eq!(file.name, "Cave Entrance.PNG");
        assert_eq!(file.extension, "png");
        assert_eq!(file.parent(), "Maps/_resources");
        assert_eq!(file.basename(), "Cave Entrance");
    }

    #[test]
    fn test_join_and_normalize() {
        assert_eq!(join("", "a.png"), "a.png");
        assert_eq!(join("Maps/", "./a.png"), "Maps/a.png");
        assert_eq!(normalize("/Cards\\goblin.png"), "Cards/goblin.png");
    }

    #[test]
    fn test_find_by_base_name_matches_name_or_suffix() {
        let vault = MemoryVault::new().with_files(&["Art/goblin.png", "Maps/sub/cave.jpg"]);
        assert_eq!(vault.find_by_base_name("goblin.png").map(|f| f.path), Some("Art/goblin.png".to_string()));
        assert_eq!(vault.find_by_base_name("other/cave.jpg").map(|f| f.path), Some("Maps/sub/cave.jpg".to_string()));
        assert_eq!(vault.find_by_base_name("sub/cave.jpg").map(|f| f.path), Some("Maps/sub/cave.jpg".to_string()));
        assert!(vault.find_by_base_name("missing.png").is_none());
    }

    #[test]
    fn test_fs_vault_indexes_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Cards/_drafts")).unwrap();
        fs::create_dir_all(dir.path().join(".obsidian")).unwrap();
        fs::write(dir.path().join("Cards/goblin.png"), b"png-bytes").unwrap();
        fs::write(dir.path().join("Cards/_drafts/orc.png"), b"x").unwrap();
        fs::write(dir.path().join(".obsidian/app.json"), b"{}").unwrap();

        let vault = FsVault::open(dir.path()).unwrap();
        let paths: Vec<_> = vault.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Cards/_drafts/orc.png", "Cards/goblin.png"]);

        let goblin = vault.find_by_exact_path("Cards/goblin.png").unwrap();
        assert_eq!(vault.read_binary(&goblin).unwrap(), b"png-bytes");
        assert!(vault.resource_url_of(&goblin).starts_with("file://"));
    }

    #[test]
    fn test_fs_vault_rejects_missing_root() {
        assert!(FsVault::open("/definitely/not/a/vault").is_err());
    }
}
