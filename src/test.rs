use std::{
    ffi::OsString,
    io::{empty, Write},
    sync::LazyLock,
};

use flate2::{write::GzEncoder, Compression};
use tar::{Builder, EntryType, Header};
use tempfile::TempDir;

static TMPDIR: LazyLock<OsString> = LazyLock::new(|| {
    if let Some(path) = std::env::var_os("TARBALL_TEST_TMPDIR") {
        eprintln!("temporary directory from $TARBALL_TEST_TMPDIR: {path:?}");
        path
    } else {
        std::env::temp_dir().into_os_string()
    }
});

pub fn tempdir() -> TempDir {
    TempDir::with_prefix_in("tarball-test-", TMPDIR.as_os_str()).unwrap()
}

/// Formats one `length key=value\n` PAX record; the length counts itself.
fn pax_record(key: &str, value: &str) -> Vec<u8> {
    let body = format!(" {key}={value}\n");
    let mut len = body.len() + 1;
    while format!("{len}").len() + body.len() != len {
        len += 1;
    }
    format!("{len}{body}").into_bytes()
}

/// Builds tar archives in memory, record by record.
pub struct TarFixture {
    builder: Builder<Vec<u8>>,
}

impl TarFixture {
    pub fn new() -> Self {
        TarFixture {
            builder: Builder::new(vec![]),
        }
    }

    fn header(entry_type: EntryType, mode: u32, size: u64) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(entry_type);
        header.set_mode(mode);
        header.set_uid(1000);
        header.set_gid(1000);
        header.set_mtime(1234567890);
        header.set_size(size);
        header
    }

    pub fn dir(mut self, path: &str, mode: u32) -> Self {
        let mut header = Self::header(EntryType::Directory, mode, 0);
        self.builder
            .append_data(&mut header, path, empty())
            .unwrap();
        self
    }

    pub fn file(mut self, path: &str, content: &[u8], mode: u32) -> Self {
        let mut header = Self::header(EntryType::Regular, mode, content.len() as u64);
        self.builder
            .append_data(&mut header, path, content)
            .unwrap();
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = Self::header(EntryType::Symlink, 0o777, 0);
        self.builder
            .append_link(&mut header, path, target)
            .unwrap();
        self
    }

    pub fn hardlink(mut self, path: &str, target: &str) -> Self {
        let mut header = Self::header(EntryType::Link, 0o644, 0);
        self.builder
            .append_link(&mut header, path, target)
            .unwrap();
        self
    }

    /// A bare GNU long-name record, applying to whatever comes next.
    pub fn long_name(mut self, name: &str) -> Self {
        let mut content = name.as_bytes().to_vec();
        content.push(0);
        let mut header = Self::header(EntryType::GNULongName, 0o644, content.len() as u64);
        self.builder
            .append_data(&mut header, "././@LongLink", &content[..])
            .unwrap();
        self
    }

    pub fn pax(mut self, path: &str, records: &[(&str, &str)]) -> Self {
        let content: Vec<u8> = records
            .iter()
            .flat_map(|(k, v)| pax_record(k, v))
            .collect();
        let mut header = Self::header(EntryType::XHeader, 0o644, content.len() as u64);
        self.builder
            .append_data(&mut header, path, &content[..])
            .unwrap();
        self
    }

    pub fn fifo(mut self, path: &str) -> Self {
        let mut header = Self::header(EntryType::Fifo, 0o644, 0);
        self.builder
            .append_data(&mut header, path, empty())
            .unwrap();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }

    pub fn finish_gz(self) -> Vec<u8> {
        let tar = self.finish();
        let mut encoder = GzEncoder::new(vec![], Compression::default());
        encoder.write_all(&tar).unwrap();
        encoder.finish().unwrap()
    }
}

/// `dir/`, `dir/a.txt` containing "hi", and `dir/b -> a.txt`.
pub fn sample_archive() -> Vec<u8> {
    TarFixture::new()
        .dir("dir/", 0o755)
        .file("dir/a.txt", b"hi", 0o644)
        .symlink("dir/b", "a.txt")
        .finish()
}

#[test]
fn test_pax_record_length() {
    assert_eq!(pax_record("path", "foo/bar"), b"16 path=foo/bar\n");
    let long = "v".repeat(95);
    let record = pax_record("k", &long);
    assert_eq!(record.len(), 102);
    assert!(record.starts_with(b"102 k="));
}
