//! The listing pass: one forward scan that records every member and every selected member.

use std::{collections::BTreeSet, io::Read};

use log::trace;

use crate::{
    entry::{ancestors, read_long_name, EntryKind, TarRecord},
    error::Result,
    filter::Filters,
};

/// Names found by the listing pass.  Order is irrelevant; only membership matters downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Every member name, header records excluded
    pub all: BTreeSet<String>,
    /// Every selected member name plus the ancestor directories of each
    pub filtered: BTreeSet<String>,
}

/// Scans `archive` once, filling in [`Listing::all`] and [`Listing::filtered`].
///
/// A GNU long name applies to the record that follows it, so members are listed under their
/// logical names.  Names containing `PaxHeader` are sidecar records some producers emit as
/// ordinary members; they are not listed.
pub fn list<R: Read>(archive: &mut tar::Archive<R>, filters: &mut Filters) -> Result<Listing> {
    let mut listing = Listing::default();
    let mut long_name: Option<String> = None;

    for entry in archive.entries()?.raw(true) {
        let mut entry = entry?;
        let record = TarRecord::from_entry(&entry)?;

        match record.kind {
            EntryKind::LongName => {
                long_name = Some(read_long_name(&mut entry)?);
                continue;
            }
            EntryKind::PaxHeader { .. } => continue,
            _ => {}
        }

        let name = long_name.take().unwrap_or(record.name);
        if name.contains("PaxHeader") {
            continue;
        }

        trace!("listing {name}");
        if filters.selected(&name) {
            listing.filtered.extend(ancestors(&name));
        }
        listing.all.insert(name);
    }

    Ok(listing)
}
