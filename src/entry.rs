//! Decoding of individual tar records and resolution of their destination paths.
//!
//! Archives are walked in raw mode, so the GNU long-name/long-link records and PAX extended
//! headers show up here as records of their own.  They never produce a filesystem object; the
//! extraction pass carries them forward to the record that follows (see `extract`).

use std::{
    borrow::Cow,
    io::Read,
    path::{Component, Path, PathBuf},
};

use log::debug;
use tar::{Entry, PaxExtensions};

use crate::error::Result;

/// The kind of link a link record asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Hard,
    Symbolic,
}

/// Every type flag the extractor knows how to treat.
///
/// This is a closed set: any flag that isn't recognised lands in [`EntryKind::Unsupported`] and
/// gets skipped rather than being written out as a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// `0` or NUL (old-style archives)
    Regular,
    /// `5`
    Directory,
    /// `1` (hard) or `2` (symbolic)
    Link(LinkKind),
    /// `x` (local) or `g` (global)
    PaxHeader { global: bool },
    /// GNU `L` (long name) or `K` (long link)
    LongName,
    /// `3`, `4`, `6`, `7` and anything unknown
    Unsupported(u8),
}

impl EntryKind {
    pub fn from_type_flag(flag: u8) -> Self {
        match flag {
            b'0' | b'\0' => EntryKind::Regular,
            b'1' => EntryKind::Link(LinkKind::Hard),
            b'2' => EntryKind::Link(LinkKind::Symbolic),
            b'5' => EntryKind::Directory,
            b'x' => EntryKind::PaxHeader { global: false },
            b'g' => EntryKind::PaxHeader { global: true },
            b'L' | b'K' => EntryKind::LongName,
            other => EntryKind::Unsupported(other),
        }
    }

    /// Header records only ever modify the record that follows them.
    pub fn is_header(&self) -> bool {
        matches!(self, EntryKind::PaxHeader { .. } | EntryKind::LongName)
    }
}

/// The decoded header of one physical tar record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarRecord {
    /// The path as stored in the header (including any ustar prefix)
    pub name: String,
    pub kind: EntryKind,
    /// Mode bits as stored, before [`fix_mode`]
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// The stored link name, for link records
    pub link_name: Option<String>,
}

impl TarRecord {
    pub fn from_entry<R: Read>(entry: &Entry<'_, R>) -> Result<Self> {
        let header = entry.header();
        Ok(TarRecord {
            name: lossy(entry.path_bytes()),
            kind: EntryKind::from_type_flag(header.entry_type().as_byte()),
            mode: header.mode()?,
            uid: header.uid()? as u32,
            gid: header.gid()? as u32,
            link_name: entry.link_name_bytes().map(lossy),
        })
    }
}

fn lossy(bytes: Cow<'_, [u8]>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Reads the payload of a GNU long-name/long-link record.
///
/// The payload is NUL terminated by GNU tar; trailing NULs and whitespace are dropped.
pub fn read_long_name(reader: &mut impl Read) -> Result<String> {
    let mut content = vec![];
    reader.read_to_end(&mut content)?;
    let name = String::from_utf8_lossy(&content);
    Ok(name
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string())
}

/// The records of a PAX extended header.  These are acknowledged, never applied, so a malformed
/// record is logged and dropped instead of failing the read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaxHeader {
    pub global: bool,
    pub records: Vec<(String, String)>,
}

impl PaxHeader {
    pub fn read(reader: &mut impl Read, global: bool) -> Result<Self> {
        let mut content = vec![];
        reader.read_to_end(&mut content)?;

        let mut records = vec![];
        for item in PaxExtensions::new(&content) {
            let extension = match item {
                Ok(extension) => extension,
                Err(e) => {
                    debug!("Dropping PAX record: {e}");
                    continue;
                }
            };
            records.push((
                String::from_utf8_lossy(extension.key_bytes()).into_owned(),
                String::from_utf8_lossy(extension.value_bytes()).into_owned(),
            ));
        }

        Ok(PaxHeader { global, records })
    }
}

/// GNU tar doesn't always store the mode POSIX style.  When the stored value is larger than
/// `0o7777` only its last four octal digits are meaningful.
pub fn fix_mode(mode: u32) -> u32 {
    if mode > 0o7777 {
        mode & 0o7777
    } else {
        mode
    }
}

/// Splits `full_name` into its components, drops the first `strip_components` of them and joins
/// the rest back together.
///
/// Root and prefix components are never kept, so the result is always relative.  An empty result
/// means the record has no destination at all.  `..` is passed through untouched.
pub fn resolve(full_name: &str, strip_components: usize) -> PathBuf {
    Path::new(full_name)
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(..)))
        .skip(strip_components)
        .collect()
}

/// Joins a resolved relative path onto the destination root.
pub fn to_destination(relative: &Path, destination: &Path) -> PathBuf {
    destination.join(relative)
}

/// Expands an archive name into itself followed by each of its ancestors.
///
/// The name itself is kept exactly as stored; every ancestor gets a trailing separator, which is
/// how tar stores directory names.  `a/b/c` gives `a/b/c`, `a/b/` and `a/`.
pub fn ancestors(name: &str) -> Vec<String> {
    let mut paths = vec![name.to_string()];
    paths.extend(
        Path::new(name)
            .ancestors()
            .skip(1)
            .map(|p| p.to_string_lossy())
            .filter(|p| !p.is_empty() && p != "/")
            .map(|p| format!("{p}/")),
    );
    paths
}
