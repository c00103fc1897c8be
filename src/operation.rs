//! The operation driver: open, list, optionally extract, report.

use std::io::{Read, Seek};

use log::info;

use crate::{
    archive::ArchiveReader,
    error::Result,
    extract::{ExtractOptions, Extractor},
    filter::Filters,
    fs::{Attributes, HostProvisioner, Provisioner},
    listing,
    ownership::{resolve_group, resolve_owner},
    report::Report,
    request::{Action, ArchiveRequest},
};

/// Lists `request.source` without touching the filesystem.
pub fn list(request: &ArchiveRequest) -> Result<Report> {
    run(request, Action::List, &mut HostProvisioner)
}

/// Lists, then extracts `request.source` into `request.destination`.
pub fn extract(request: &ArchiveRequest) -> Result<Report> {
    run(request, Action::Extract, &mut HostProvisioner)
}

/// Opens `request.source` and runs `action` on it.  The archive is closed on every exit path.
pub fn run<P: Provisioner + ?Sized>(
    request: &ArchiveRequest,
    action: Action,
    provisioner: &mut P,
) -> Result<Report> {
    let mut archive = ArchiveReader::open(&request.source)?;
    run_on(&mut archive, request, action, provisioner)
}

/// Like [`run`], on an archive that is already open.  `request.source` is ignored.
pub fn run_on<R: Read + Seek, P: Provisioner + ?Sized>(
    archive: &mut ArchiveReader<R>,
    request: &ArchiveRequest,
    action: Action,
    provisioner: &mut P,
) -> Result<Report> {
    let mut report = Report::default();

    // resolve everything that can fail on bad input before anything is written
    let mut filters = Filters::new(&request.exclude, &request.extract_list)?;
    let options = ExtractOptions {
        destination: request.destination.clone(),
        owner: request.owner.as_deref().map(resolve_owner).transpose()?,
        group: request.group.as_deref().map(resolve_group).transpose()?,
        mode: request.mode,
        umask: request.umask,
        overwrite: request.overwrite,
        strip_components: request.strip_components,
        same_owner: request.same_owner,
    };

    let listing = listing::list(&mut archive.stream()?, &mut filters)?;
    info!(
        "{} members, {} selected",
        listing.all.len(),
        listing.filtered.len()
    );
    report.all = listing.all;
    report.filtered = listing.filtered.clone();

    if action == Action::Extract {
        let root_created = ensure_destination(&options, provisioner)?;
        filters.set_filtered(listing.filtered);

        report.created =
            Extractor::new(&options, &filters, provisioner).run(&mut archive.stream()?)?;
        report.updated = root_created || !report.created.is_empty();
    }

    Ok(report)
}

/// Creates the destination root if it isn't a directory yet.  Returns whether it was created.
fn ensure_destination<P: Provisioner + ?Sized>(
    options: &ExtractOptions,
    provisioner: &mut P,
) -> Result<bool> {
    let root = &options.destination;
    if root.as_os_str().is_empty() || root.is_dir() {
        return Ok(false);
    }

    let attrs = Attributes {
        owner: options.owner,
        group: options.group,
        mode: options.mode.unwrap_or(0o777 & !options.umask),
    };
    provisioner.create_directory(root, &attrs)?;
    Ok(true)
}
