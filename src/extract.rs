//! The extraction pass.
//!
//! This is a flat loop over the raw records of the archive.  Header records (PAX and GNU long
//! names) never create anything; they leave a [`PendingState`] behind that the next record
//! consumes.  Every other record is dispatched on its [`EntryKind`] to one of the directory, file
//! or link handlers, or skipped.
//!
//! A record that isn't wanted is skipped without touching the pending state, so a long name read
//! before it carries over to whatever comes next.  Every record that is dispatched consumes the
//! pending state, whether or not it ends up creating anything.

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    entry::{
        fix_mode, read_long_name, resolve, to_destination, EntryKind, LinkKind, PaxHeader,
        TarRecord,
    },
    error::Result,
    filter::Filters,
    fs::{Attributes, FileContent, Provisioner},
    report::Created,
};

/// Header state carried from one record to the next.
///
/// Threaded through the loop by value: each step takes the previous state and returns the one the
/// following record should see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingState {
    pub pax: Option<PaxHeader>,
    pub long_name: Option<String>,
}

/// Numeric settings for one extraction pass, with owner and group already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub destination: PathBuf,
    pub owner: Option<u32>,
    pub group: Option<u32>,
    pub mode: Option<u32>,
    pub umask: u32,
    pub overwrite: bool,
    pub strip_components: usize,
    pub same_owner: bool,
}

impl ExtractOptions {
    /// True when the uid or gid stored in the archive is never applied: there's no override for
    /// it and `same_owner` is off.
    pub fn ignores_stored_ids(&self) -> bool {
        !self.same_owner && (self.owner.is_none() || self.group.is_none())
    }

    fn owner_for(&self, record: &TarRecord) -> Option<u32> {
        self.owner.or(self.same_owner.then_some(record.uid))
    }

    fn group_for(&self, record: &TarRecord) -> Option<u32> {
        self.group.or(self.same_owner.then_some(record.gid))
    }
}

/// Runs the extraction pass over a freshly rewound archive.
pub struct Extractor<'a, P: ?Sized> {
    options: &'a ExtractOptions,
    filters: &'a Filters,
    provisioner: &'a mut P,
    created: Created,
}

impl<'a, P: Provisioner + ?Sized> Extractor<'a, P> {
    pub fn new(options: &'a ExtractOptions, filters: &'a Filters, provisioner: &'a mut P) -> Self {
        Extractor {
            options,
            filters,
            provisioner,
            created: Created::default(),
        }
    }

    pub fn run<R: Read>(mut self, archive: &mut tar::Archive<R>) -> Result<Created> {
        let mut pending = PendingState::default();

        if self.options.ignores_stored_ids() {
            debug!("Not applying the uid/gid stored in the archive (same_owner is off)");
        }

        for entry in archive.entries()?.raw(true) {
            let mut entry = entry?;
            let record = TarRecord::from_entry(&entry)?;
            pending = self.step(&record, &mut entry, pending)?;
        }

        Ok(self.created)
    }

    /// Processes one record and returns the pending state for the next one.
    pub fn step(
        &mut self,
        record: &TarRecord,
        content: &mut impl Read,
        pending: PendingState,
    ) -> Result<PendingState> {
        let name = pending.long_name.as_deref().unwrap_or(&record.name);
        info!("Next tar entry: {name}");

        let options = self.options;
        if !self.filters.wanted(
            name,
            record.kind,
            options.overwrite,
            &options.destination,
            options.strip_components,
        ) {
            debug!("Skipping {name}: not wanted");
            return Ok(pending);
        }

        match record.kind {
            EntryKind::Link(kind) => self.make_link(name, record, kind)?,
            EntryKind::Directory => self.make_directory(name, record)?,
            EntryKind::Unsupported(flag) => {
                debug!("Skipping {name}: unsupported entry type {:?}", flag as char);
            }
            EntryKind::PaxHeader { global } => {
                let pax = PaxHeader::read(content, global)?;
                for (key, value) in &pax.records {
                    debug!("Ignoring PAX record {key}={value}");
                }
                return Ok(PendingState {
                    pax: Some(pax),
                    long_name: None,
                });
            }
            EntryKind::LongName => {
                let long_name = read_long_name(content)?;
                debug!("Long name for the next entry: {long_name}");
                return Ok(PendingState {
                    pax: None,
                    long_name: Some(long_name),
                });
            }
            EntryKind::Regular => self.make_file(name, record, content)?,
        }

        Ok(PendingState::default())
    }

    fn destination(&self, name: &str) -> Option<PathBuf> {
        let relative = resolve(name, self.options.strip_components);
        if relative.as_os_str().is_empty() {
            debug!("Skipping {name}: nothing left after stripping components");
            None
        } else {
            Some(to_destination(&relative, &self.options.destination))
        }
    }

    fn created_earlier(&self, path: &Path) -> bool {
        self.created.files.iter().any(|p| p == path)
            || self.created.links.iter().any(|p| p == path)
    }

    fn make_link(&mut self, name: &str, record: &TarRecord, kind: LinkKind) -> Result<()> {
        let Some(path) = self.destination(name) else {
            return Ok(());
        };
        let link_name = record.link_name.as_deref().unwrap_or_default();

        let target = match kind {
            LinkKind::Symbolic => PathBuf::from(link_name),
            LinkKind::Hard => {
                let Some(target) = self.destination(link_name) else {
                    return Ok(());
                };
                if target.symlink_metadata().is_err() && !self.created_earlier(&target) {
                    debug!(
                        "Skipping hard link {name}: target {} doesn't exist",
                        target.display()
                    );
                    return Ok(());
                }
                target
            }
        };

        self.provisioner
            .create_link(&path, &target, kind, self.options.owner_for(record))?;
        self.created.links.push(path);
        Ok(())
    }

    fn make_directory(&mut self, name: &str, record: &TarRecord) -> Result<()> {
        let Some(path) = self.destination(name) else {
            return Ok(());
        };
        if path.is_dir() {
            return Ok(());
        }

        let options = self.options;
        let attrs = Attributes {
            owner: options.owner_for(record),
            group: options.group_for(record),
            mode: options
                .mode
                .unwrap_or((fix_mode(record.mode) | 0o111) & !options.umask),
        };
        self.provisioner.create_directory(&path, &attrs)?;
        self.created.directories.push(path);
        Ok(())
    }

    fn make_file(
        &mut self,
        name: &str,
        record: &TarRecord,
        content: &mut impl Read,
    ) -> Result<()> {
        let Some(path) = self.destination(name) else {
            return Ok(());
        };

        let options = self.options;
        let attrs = Attributes {
            owner: options.owner_for(record),
            group: options.group_for(record),
            mode: options.mode.unwrap_or(fix_mode(record.mode) & !options.umask),
        };
        self.provisioner.create_file(
            &path,
            FileContent {
                reader: content,
                sensitive: true,
            },
            &attrs,
        )?;
        self.created.files.push(path);
        Ok(())
    }
}
