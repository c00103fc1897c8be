//! The result set returned to the caller of an operation.

use std::{collections::BTreeSet, path::PathBuf};

/// Everything the extraction pass created, in processing order.
///
/// These are append-only: a path written twice shows up twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Created {
    pub files: Vec<PathBuf>,
    pub links: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
}

impl Created {
    /// Files, then links, then directories.
    pub fn all(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .chain(&self.links)
            .chain(&self.directories)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.links.is_empty() && self.directories.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Every member name in the archive
    pub all: BTreeSet<String>,
    /// Selected member names and their ancestor directories
    pub filtered: BTreeSet<String>,
    pub created: Created,
    /// Whether the operation changed anything on disk
    pub updated: bool,
}
