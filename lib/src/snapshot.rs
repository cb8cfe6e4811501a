use std::fs;
use std::path::Path;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{Chainable, Result};
use crate::util::path_key;

pub type Metadata = FxHashMap<String, Value>;

/// One file being transformed: its byte content plus whatever metadata
/// stages have attached so far.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub content: Vec<u8>,
    pub metadata: Metadata,
}

/// The full in-memory file tree of one pipeline run, keyed by normalized
/// relative path. The path string is an entry's only identity.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: FxHashMap<String, Entry>,
}

impl Entry {
    pub fn new(content: Vec<u8>) -> Self {
        Entry { content, metadata: Metadata::default() }
    }

    /// The entry's content as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.content)?)
    }

    pub fn set_text<S: Into<String>>(&mut self, text: S) {
        self.content = text.into().into_bytes();
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn set_meta<K, V>(&mut self, key: K, value: V)
        where K: Into<String>, V: Into<Value>
    {
        self.metadata.insert(key.into(), value.into());
    }

    /// Whether a metadata key is set to `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.meta(key), Some(Value::Bool(true)))
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    /// Read every regular file under `root` into a fresh snapshot. Keys
    /// are `/`-separated paths relative to `root`.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let mut snapshot = Snapshot::new();
        for entry in jwalk::WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let content = fs::read(&path).chain_with(|| error! {
                "failed to read source file",
                "path" => path.display(),
            })?;

            let relative = path.strip_prefix(root).unwrap_or(&path);
            snapshot.insert(path_key(relative), Entry::new(content));
        }

        Ok(snapshot)
    }

    /// Write every surviving entry under `root`, recreating the relative
    /// directory structure. Entries are independent, so writes run in
    /// parallel.
    pub fn write<P: AsRef<Path>>(&self, root: P) -> Result<()> {
        let root = root.as_ref();
        self.entries.par_iter().try_for_each(|(key, entry)| {
            let path = root.join(key);
            let io = || -> std::io::Result<()> {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }

                fs::write(&path, &entry.content)
            };

            io().chain_with(|| error! {
                "failed to write output file",
                "path" => path.display(),
            })
        })
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, entry: Entry) -> Option<Entry> {
        self.entries.insert(key.into(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Entry)> {
        self.entries.iter_mut().map(|(k, e)| (k.as_str(), e))
    }

    /// Keep only entries for which `f` returns `true`.
    pub fn retain<F: FnMut(&str, &mut Entry) -> bool>(&mut self, mut f: F) {
        self.entries.retain(|k, e| f(k, e));
    }

    /// Rename entries. `f` returns the new key for an entry, or `None` to
    /// leave it in place. Renames are collected during the traversal and
    /// applied after it, so `f` never observes a half-renamed snapshot.
    pub fn rekey<F>(&mut self, mut f: F)
        where F: FnMut(&str, &Entry) -> Option<String>
    {
        let renames: Vec<(String, String)> = self.entries.iter()
            .filter_map(|(key, entry)| {
                f(key, entry)
                    .filter(|new| new != key)
                    .map(|new| (key.clone(), new))
            })
            .collect();

        for (old, new) in renames {
            if let Some(entry) = self.entries.remove(&old) {
                self.entries.insert(new, entry);
            }
        }
    }
}
