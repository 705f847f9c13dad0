//! Card deck and map listings built from vault folders

use tracing::debug;

use crate::constants::media::NOTE_EXTENSION;
use crate::media::is_media_extension;
use crate::vault::{FileHandle, FileLookup, normalize};

/// Path relative to `folder`, or None when the file lives elsewhere
fn relative_to<'a>(path: &'a str, folder: &str) -> Option<&'a str> {
    if folder.is_empty() {
        return Some(path);
    }
    path.strip_prefix(folder)?.strip_prefix('/')
}

/// Any folder below the base whose name starts with '_' hides its contents
fn in_ignored_folder(relative: &str) -> bool {
    let mut parts: Vec<&str> = relative.split('/').collect();
    parts.pop();
    parts.iter().any(|part| part.starts_with('_'))
}

fn collect<L, F>(lookup: &L, folder: &str, keep: F) -> Vec<FileHandle>
where
    L: FileLookup + ?Sized,
    F: Fn(&FileHandle) -> bool,
{
    let folder = normalize(folder);
    let folder = folder.trim_end_matches('/');
    let mut files: Vec<FileHandle> = lookup
        .files()
        .iter()
        .filter(|f| relative_to(&f.path, folder).is_some_and(|rel| !in_ignored_folder(rel)))
        .filter(|f| keep(f))
        .cloned()
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// Maps: media files and markdown notes
pub fn scan_maps<L: FileLookup + ?Sized>(lookup: &L, folder: &str) -> Vec<FileHandle> {
    let maps = collect(lookup, folder, |f| is_media_extension(&f.extension) || f.extension == NOTE_EXTENSION);
    debug!(folder = %folder, count = maps.len(), "Scanned maps");
    maps
}

/// Ordered card images with a cursor that wraps at both ends
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<FileHandle>,
    current: usize,
}

impl Deck {
    pub fn scan<L: FileLookup + ?Sized>(lookup: &L, folder: &str) -> Self {
        let cards = collect(lookup, folder, |f| is_media_extension(&f.extension));
        debug!(folder = %folder, count = cards.len(), "Scanned card deck");
        Self { cards, current: 0 }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[cfg(test)]
    pub fn cards(&self) -> &[FileHandle] {
        &self.cards
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&FileHandle> {
        self.cards.get(self.current)
    }

    /// Jump to an index; out of range leaves the cursor alone
    pub fn select(&mut self, index: usize) -> Option<&FileHandle> {
        if index >= self.cards.len() {
            return None;
        }
        self.current = index;
        self.cards.get(index)
    }

    /// Move the cursor onto a card by path
    pub fn select_path(&mut self, path: &str) -> Option<&FileHandle> {
        let index = self.cards.iter().position(|c| c.path == path)?;
        self.select(index)
    }

    pub fn advance(&mut self) -> Option<&FileHandle> {
        if self.cards.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.cards.len();
        self.current()
    }

    pub fn retreat(&mut self) -> Option<&FileHandle> {
        if self.cards.is_empty() {
            return None;
        }
        self.current = (self.current + self.cards.len() - 1) % self.cards.len();
        self.current()
    }

    /// Rescan, keeping the cursor on the same card when it still exists
    pub fn rescan<L: FileLookup + ?Sized>(&mut self, lookup: &L, folder: &str) {
        let previous = self.current().map(|c| c.path.clone());
        *self = Self::scan(lookup, folder);
        if let Some(path) = previous {
            self.select_path(&path);
        }
    }
}
