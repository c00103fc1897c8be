//! Streaming extraction of tar archives.
//!
//! An operation reads the archive twice: a listing pass that records every member and decides
//! which ones are selected, then (for extraction) a second pass that creates directories, files
//! and links under the destination.  See [`operation::extract`] for the entry point.

pub mod archive;
pub mod entry;
pub mod error;
pub mod extract;
pub mod filter;
pub mod fs;
pub mod listing;
pub mod operation;
pub mod ownership;
pub mod report;
pub mod request;
mod util;

#[cfg(any(test, feature = "test"))]
pub mod test;

pub use error::{Error, Result};
pub use operation::{extract, list, run};
pub use report::{Created, Report};
pub use request::{Action, ArchiveRequest};
