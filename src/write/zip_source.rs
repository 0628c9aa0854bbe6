//! Entries selected from another ZIP archive.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::source::Source;
use crate::format::Zip64Policy;
use crate::read::{Entry, ZipMap};
use crate::{Error, Result};

/// A set of entries to copy from an existing archive.
///
/// The other archive is parsed once, read-only, when the `ZipSource` is
/// opened. Its file is opened again only while the selection is being added
/// to a [`ZipArchive`](crate::ZipArchive).
///
/// # Example
///
/// ```rust,no_run
/// use zipsplice::{ZipArchive, ZipSource};
///
/// let mut libs = ZipSource::open("libs.zip")?;
/// libs.select("classes.dex", "classes2.dex")?;
/// libs.select_with_level("lib/arm64-v8a/libfoo.so", "lib/arm64-v8a/libfoo.so", 0)?
///     .align(zipsplice::PAGE_ALIGNMENT)?;
///
/// let mut apk = ZipArchive::open("app.apk")?;
/// apk.add_zip_source(libs)?;
/// apk.close()?;
/// # Ok::<(), zipsplice::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ZipSource {
    path: PathBuf,
    entries: BTreeMap<String, Entry>,
    selected: Vec<Source>,
}

impl ZipSource {
    /// Parses the archive at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let map = ZipMap::from_path(path, false, Zip64Policy::Allow)?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: map.into_entries(),
            selected: Vec::new(),
        })
    }

    /// Opens `path` and selects every entry under its own name, keeping its
    /// compression.
    pub fn select_all(path: impl AsRef<Path>) -> Result<Self> {
        let mut source = Self::open(path)?;
        let names: Vec<String> = source.entries.keys().cloned().collect();
        for name in names {
            source.select(&name, name.clone())?;
        }
        Ok(source)
    }

    /// Selects `entry_name` to be written as `new_name`, payload unchanged.
    pub fn select(&mut self, entry_name: &str, new_name: impl Into<String>) -> Result<&mut Source> {
        self.push(entry_name, new_name.into(), None)
    }

    /// Selects `entry_name` to be written as `new_name`, stored if `level`
    /// is 0 and deflated otherwise.
    ///
    /// The payload is copied without decompression whenever the entry is
    /// already in the requested state.
    pub fn select_with_level(
        &mut self,
        entry_name: &str,
        new_name: impl Into<String>,
        level: u32,
    ) -> Result<&mut Source> {
        self.push(entry_name, new_name.into(), Some(level))
    }

    fn push(&mut self, entry_name: &str, new_name: String, level: Option<u32>) -> Result<&mut Source> {
        let entry = self.entries.get(entry_name).ok_or_else(|| Error::EntryNotFound {
            name: entry_name.to_string(),
        })?;
        let source = Source::from_entry(new_name, entry, level)?;
        self.selected.push(source);
        let last = self.selected.len() - 1;
        Ok(&mut self.selected[last])
    }

    /// Entries of the other archive, keyed by name.
    pub fn entries(&self) -> &BTreeMap<String, Entry> {
        &self.entries
    }

    /// Selected sources in selection order.
    pub fn selected(&self) -> &[Source] {
        &self.selected
    }

    /// Path of the other archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute path used to order sources deterministically.
    pub(crate) fn sort_key(&self) -> PathBuf {
        std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone())
    }

    /// Orders the selection by destination name.
    pub(crate) fn sort_selected(&mut self) {
        self.selected.sort_by(|a, b| a.name().cmp(b.name()));
    }

    pub(crate) fn into_selected(self) -> Vec<Source> {
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ByteSource, ZipArchive};
    use tempfile::TempDir;

    fn sample(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("source.zip");
        let mut archive = ZipArchive::open(&path).unwrap();
        archive
            .add(ByteSource::new(b"stored".to_vec(), "b.txt", 0).unwrap())
            .unwrap();
        archive
            .add(ByteSource::new(b"deflated deflated".to_vec(), "a.txt", 9).unwrap())
            .unwrap();
        archive.close().unwrap();
        path
    }

    #[test]
    fn test_select_missing_entry() {
        let dir = TempDir::new().unwrap();
        let mut source = ZipSource::open(sample(&dir)).unwrap();
        let err = source.select("nope", "x").unwrap_err();
        assert!(matches!(err, Error::EntryNotFound { ref name } if name == "nope"));
        assert!(source.selected().is_empty());
    }

    #[test]
    fn test_select_all_uses_entry_names() {
        let dir = TempDir::new().unwrap();
        let source = ZipSource::select_all(sample(&dir)).unwrap();
        let names: Vec<&str> = source.selected().iter().map(Source::name).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_sort_selected() {
        let dir = TempDir::new().unwrap();
        let mut source = ZipSource::open(sample(&dir)).unwrap();
        source.select("a.txt", "z").unwrap();
        source.select("b.txt", "m").unwrap().align(8).unwrap();
        source.sort_selected();
        let names: Vec<&str> = source.selected().iter().map(Source::name).collect();
        assert_eq!(names, vec!["m", "z"]);
        assert_eq!(source.selected()[0].alignment(), 8);
    }

    #[test]
    fn test_sort_key_is_absolute() {
        let dir = TempDir::new().unwrap();
        let source = ZipSource::open(sample(&dir)).unwrap();
        assert!(source.sort_key().is_absolute());
    }
}
