//! Opening archives, with transparent gzip support.
//!
//! Compression is detected from the stream itself (the two-byte gzip magic), never from the file
//! name.  Anything that doesn't carry the magic is read as a plain tar stream.  The underlying
//! reader must be seekable since every operation reads it from the start at least twice.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use flate2::read::GzDecoder;
use log::{debug, warn};

use crate::{
    error::{Error, Result},
    util::read_upto,
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The compression wrapping the tar payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

/// An open archive.  The handle is released when this is dropped.
#[derive(Debug)]
pub struct ArchiveReader<R> {
    reader: R,
}

impl ArchiveReader<File> {
    /// Opens the archive at `path`.  This is the only fatal input error an operation has.
    pub fn open(path: &Path) -> Result<Self> {
        match File::open(path) {
            Ok(file) => Ok(ArchiveReader { reader: file }),
            Err(source) => {
                warn!("Cannot open archive {}: {source}", path.display());
                Err(Error::Open {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    pub fn new(reader: R) -> Self {
        ArchiveReader { reader }
    }

    /// Sniffs the compression and leaves the reader at the start of the stream.
    pub fn compression(&mut self) -> Result<Compression> {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 2];
        let n = read_upto(&mut self.reader, &mut magic)?;
        self.reader.seek(SeekFrom::Start(0))?;

        Ok(if n == magic.len() && magic == GZIP_MAGIC {
            Compression::Gzip
        } else {
            Compression::None
        })
    }

    /// Rewinds and returns a fresh tar reader over the whole payload.
    pub fn stream(&mut self) -> Result<tar::Archive<Box<dyn Read + '_>>> {
        let compression = self.compression()?;
        debug!("Reading archive ({compression:?})");

        let payload: Box<dyn Read + '_> = match compression {
            Compression::Gzip => Box::new(GzDecoder::new(&mut self.reader)),
            Compression::None => Box::new(&mut self.reader),
        };
        Ok(tar::Archive::new(payload))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
