use indexmap::IndexSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Ordered tag list where a tag's position is its class index.
///
/// Indices follow insertion order and never change once assigned, so a
/// registry written by one run can be read back to keep class ids stable.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: IndexSet<String>,
}

// Position is the class index, so equality is order-sensitive
impl PartialEq for TagRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.tags.iter().eq(other.tags.iter())
    }
}

impl Eq for TagRegistry {}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `tag`, assigning the next free one if it is new
    pub fn get_or_insert(&mut self, tag: &str) -> usize {
        match self.tags.get_index_of(tag) {
            Some(idx) => idx,
            None => self.tags.insert_full(tag.to_string()).0,
        }
    }

    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.tags.get_index_of(tag)
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.tags.get_index(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }

    /// Write one tag per line, in index order
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path).map_err(|e| Error::io(path, e))?);
        for tag in &self.tags {
            writeln!(writer, "{}", tag).map_err(|e| Error::io(path, e))?;
        }
        writer.flush().map_err(|e| Error::io(path, e))
    }

    /// Read a tag list written by [`TagRegistry::write_to`]; blank lines are ignored
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect())
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut registry = TagRegistry::new();
        for tag in iter {
            registry.get_or_insert(tag.as_ref());
        }
        registry
    }
}
