//! Caller configuration for a single list or extract operation.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use rustix::{
    fs::Mode,
    process::{geteuid, umask},
};

/// What an operation should do with the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the listing pass only.  Nothing on disk is touched.
    List,
    /// List, then extract the wanted members into the destination.
    Extract,
}

fn umask_from_status(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Umask:"))
        .and_then(|value| u32::from_str_radix(value.trim(), 8).ok())
}

// Without procfs the umask can only be read by setting it, which races with anything else in the
// process that creates files or reads the umask.  Do that at most once.
static SET_AND_RESTORED_UMASK: LazyLock<u32> = LazyLock::new(|| {
    let previous = umask(Mode::from_raw_mode(0o022));
    umask(previous);
    previous.as_raw_mode() as u32
});

/// Reads the umask of the calling process.
///
/// This comes from `/proc/self/status` and leaves the process umask alone.  Only when that isn't
/// available is the umask set and restored, once, and the result reused from then on.
pub fn current_umask() -> u32 {
    fs::read_to_string("/proc/self/status")
        .ok()
        .as_deref()
        .and_then(umask_from_status)
        .unwrap_or_else(|| *SET_AND_RESTORED_UMASK)
}

/// Everything the caller declares about one operation.
///
/// A request is not modified while the operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// User name or numeric uid applied to everything created
    pub owner: Option<String>,
    /// Group name or numeric gid applied to everything created
    pub group: Option<String>,
    /// Replaces the per-entry mode entirely when set
    pub mode: Option<u32>,
    pub umask: u32,
    pub overwrite: bool,
    pub exclude: Vec<String>,
    /// Empty means every member
    pub extract_list: Vec<String>,
    pub strip_components: usize,
    /// Apply the uid/gid stored in the archive when no override is given
    pub same_owner: bool,
}

impl ArchiveRequest {
    pub fn new(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Self {
        ArchiveRequest {
            source: source.as_ref().to_path_buf(),
            destination: destination.as_ref().to_path_buf(),
            owner: None,
            group: None,
            mode: None,
            umask: current_umask(),
            overwrite: true,
            exclude: vec![],
            extract_list: vec![],
            strip_components: 0,
            same_owner: geteuid().is_root(),
        }
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn umask(mut self, umask: u32) -> Self {
        self.umask = umask;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn extract_list<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extract_list
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn strip_components(mut self, count: usize) -> Self {
        self.strip_components = count;
        self
    }

    pub fn same_owner(mut self, same_owner: bool) -> Self {
        self.same_owner = same_owner;
        self
    }
}
