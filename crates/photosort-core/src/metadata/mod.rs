pub mod bmff;
pub mod exif;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::MetadataError;

/// The kinds of tag blocks the date resolver knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryKind {
    ExifSubIfd,
    ExifIfd0,
    Mp4,
    QuickTime,
    Gps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagName {
    DateOriginal,
    TzOriginal,
    DateDigitized,
    TzDigitized,
    DateTime,
    Tz,
    CreationTime,
    DateStamp,
    TimeStamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub denom: u32,
}

impl Rational {
    pub fn new(num: u32, denom: u32) -> Self {
        Self { num, denom }
    }

    pub fn to_f64(self) -> Option<f64> {
        (self.denom != 0).then(|| self.num as f64 / self.denom as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Rationals(Vec<Rational>),
    Instant(DateTime<Utc>),
}

/// One typed block of named tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    kind: DirectoryKind,
    tags: BTreeMap<TagName, TagValue>,
}

impl Directory {
    pub fn new(kind: DirectoryKind) -> Self {
        Self {
            kind,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, name: TagName, value: TagValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: TagName, value: TagValue) {
        self.tags.insert(name, value);
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn text(&self, name: TagName) -> Option<&str> {
        match self.tags.get(&name)? {
            TagValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn rationals(&self, name: TagName) -> Option<&[Rational]> {
        match self.tags.get(&name)? {
            TagValue::Rationals(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn instant(&self, name: TagName) -> Option<DateTime<Utc>> {
        match self.tags.get(&name)? {
            TagValue::Instant(at) => Some(*at),
            _ => None,
        }
    }
}

/// Everything the metadata reader found in one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    directories: Vec<Directory>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(mut self, directory: Directory) -> Self {
        self.push(directory);
        self
    }

    /// Empty directories are dropped.
    pub fn push(&mut self, directory: Directory) {
        if !directory.is_empty() {
            self.directories.push(directory);
        }
    }

    pub fn first(&self, kind: DirectoryKind) -> Option<&Directory> {
        self.directories.iter().find(|d| d.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}

/// Type alias for pluggable metadata readers
pub type MetadataReader = dyn Fn(&Path) -> Result<MetadataRecord, MetadataError> + Send + Sync;

/// Read the metadata of a file, choosing the decoder by extension.
pub fn read_metadata(path: &Path) -> Result<MetadataRecord, MetadataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4" | "mov" | "m4v") => bmff::read(path),
        _ => exif::read(path),
    }
}
