//! Filesystem primitives used by the extraction pass.
//!
//! The extraction logic only ever asks for three things: a directory, a file with some content,
//! or a link.  Those requests go through the [`Provisioner`] trait so the decision making can be
//! exercised without touching the disk; [`HostProvisioner`] is the implementation that actually
//! creates things.

use std::{
    fmt,
    fs::{create_dir_all, remove_file},
    io::{self, Read},
    os::unix::fs::{chown, fchown, lchown},
    path::Path,
};

use log::{debug, info};
use rustix::fs::{chmodat, fchmod, linkat, symlinkat, AtFlags, Mode, CWD};
use tempfile::NamedTempFile;

use crate::{
    entry::LinkKind,
    error::{Error, Result},
};

/// Ownership and permissions to apply to a created object.
///
/// `None` for the owner or group leaves whatever the creating process gets by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attributes {
    pub owner: Option<u32>,
    pub group: Option<u32>,
    pub mode: u32,
}

/// The body of a file being created.
///
/// When `sensitive` is set the content must never show up in diagnostics; the [`fmt::Debug`]
/// implementation never prints it either way.
pub struct FileContent<'a> {
    pub reader: &'a mut dyn Read,
    pub sensitive: bool,
}

impl fmt::Debug for FileContent<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("FileContent")
            .field("reader", &"<suppressed>")
            .field("sensitive", &self.sensitive)
            .finish()
    }
}

/// The filesystem operations extraction relies on.
pub trait Provisioner {
    /// Creates `path` and any missing parents.  Only `path` itself receives `attrs`.
    fn create_directory(&mut self, path: &Path, attrs: &Attributes) -> Result<()>;

    /// Creates or replaces the file at `path` with the given content.
    fn create_file(
        &mut self,
        path: &Path,
        content: FileContent<'_>,
        attrs: &Attributes,
    ) -> Result<()>;

    /// Creates or replaces a link at `path` pointing at `target`.
    fn create_link(
        &mut self,
        path: &Path,
        target: &Path,
        kind: LinkKind,
        owner: Option<u32>,
    ) -> Result<()>;
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            create_dir_all(parent).map_err(|e| Error::provision(parent, e))?;
        }
    }
    Ok(())
}

/// Removes whatever non-directory currently sits at `path`.
fn clear_path(path: &Path) -> Result<()> {
    match path.symlink_metadata() {
        Ok(meta) if !meta.is_dir() => remove_file(path).map_err(|e| Error::provision(path, e)),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::provision(path, e)),
    }
}

/// Creates objects on the local filesystem.
#[derive(Debug, Default)]
pub struct HostProvisioner;

impl Provisioner for HostProvisioner {
    fn create_directory(&mut self, path: &Path, attrs: &Attributes) -> Result<()> {
        debug!("Creating directory {}", path.display());
        create_dir_all(path).map_err(|e| Error::provision(path, e))?;

        // explicit chmod: the process umask must not be applied a second time
        chmodat(CWD, path, Mode::from_raw_mode(attrs.mode), AtFlags::empty())
            .map_err(|e| Error::provision(path, e))?;

        if attrs.owner.is_some() || attrs.group.is_some() {
            chown(path, attrs.owner, attrs.group).map_err(|e| Error::provision(path, e))?;
        }
        Ok(())
    }

    fn create_file(
        &mut self,
        path: &Path,
        content: FileContent<'_>,
        attrs: &Attributes,
    ) -> Result<()> {
        info!("Creating file {}", path.display());
        ensure_parent(path)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // write next to the target and rename over it, so readers never see a partial file
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::provision(path, e))?;
        io::copy(content.reader, tmp.as_file_mut()).map_err(|e| Error::provision(path, e))?;

        fchmod(tmp.as_file(), Mode::from_raw_mode(attrs.mode))
            .map_err(|e| Error::provision(path, e))?;
        if attrs.owner.is_some() || attrs.group.is_some() {
            fchown(tmp.as_file(), attrs.owner, attrs.group)
                .map_err(|e| Error::provision(path, e))?;
        }

        tmp.persist(path)
            .map_err(|e| Error::provision(path, e.error))?;
        Ok(())
    }

    fn create_link(
        &mut self,
        path: &Path,
        target: &Path,
        kind: LinkKind,
        owner: Option<u32>,
    ) -> Result<()> {
        debug!("Creating {kind:?} link {} -> {}", path.display(), target.display());
        ensure_parent(path)?;

        let unchanged = kind == LinkKind::Symbolic
            && std::fs::read_link(path).is_ok_and(|current| current == target);
        if !unchanged {
            clear_path(path)?;
            match kind {
                LinkKind::Symbolic => symlinkat(target, CWD, path),
                LinkKind::Hard => linkat(CWD, target, CWD, path, AtFlags::empty()),
            }
            .map_err(|e| Error::provision(path, e))?;
        }

        if owner.is_some() {
            lchown(path, owner, None).map_err(|e| Error::provision(path, e))?;
        }
        Ok(())
    }
}
