use std::{
    fs,
    io::Write,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::Command,
};

use flate2::{write::GzEncoder, Compression};
use similar_asserts::assert_eq;
use tar::{Builder, EntryType, Header};
use tempfile::TempDir;

use tarball::{extract, list, ArchiveRequest};

fn header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(1700000000);
    header
}

fn project_tar() -> Vec<u8> {
    let mut builder = Builder::new(vec![]);
    let files: [(&str, &[u8]); 3] = [
        ("project/README.md", b"# project\n"),
        ("project/src/main.rs", b"fn main() {}\n"),
        ("project/.hidden", b"dot"),
    ];
    for (path, content) in files {
        let mut h = header(EntryType::Regular, 0o644, content.len() as u64);
        builder.append_data(&mut h, path, content).unwrap();
    }
    let mut h = header(EntryType::Directory, 0o700, 0);
    builder
        .append_data(&mut h, "project/bin/", std::io::empty())
        .unwrap();
    let mut h = header(EntryType::Regular, 0o755, 3);
    builder
        .append_data(&mut h, "project/bin/run", &b"#!\n"[..])
        .unwrap();
    let mut h = header(EntryType::Link, 0o644, 0);
    builder
        .append_link(&mut h, "project/README.copy", "project/README.md")
        .unwrap();

    // stored with a GNU long-name record in front of it
    let long = format!("project/{}/deep.txt", "nested".repeat(20));
    let mut h = header(EntryType::Regular, 0o644, 4);
    builder.append_data(&mut h, long, &b"deep"[..]).unwrap();

    builder.into_inner().unwrap()
}

fn write_archive(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn request(source: &Path, destination: &Path) -> ArchiveRequest {
    ArchiveRequest::new(source, destination)
        .umask(0o022)
        .same_owner(false)
}

#[test]
fn extract_project() {
    let td = TempDir::new().unwrap();
    let source = write_archive(td.path(), "project.tar", &project_tar());
    let out = td.path().join("out");

    let report = extract(&request(&source, &out)).unwrap();
    assert!(report.updated);
    assert_eq!(report.all.len(), 7);

    assert_eq!(
        fs::read_to_string(out.join("project/src/main.rs")).unwrap(),
        "fn main() {}\n"
    );
    assert_eq!(fs::read(out.join("project/.hidden")).unwrap(), b"dot");
    let long = out.join(format!("project/{}/deep.txt", "nested".repeat(20)));
    assert_eq!(fs::read(long).unwrap(), b"deep");

    let bin = fs::metadata(out.join("project/bin")).unwrap();
    assert_eq!(bin.permissions().mode() & 0o7777, 0o711);
    let run = fs::metadata(out.join("project/bin/run")).unwrap();
    assert_eq!(run.permissions().mode() & 0o7777, 0o755);

    assert_eq!(
        fs::read(out.join("project/README.copy")).unwrap(),
        b"# project\n"
    );
}

#[test]
fn extract_selected_gzip() {
    let td = TempDir::new().unwrap();
    let mut encoder = GzEncoder::new(vec![], Compression::default());
    encoder.write_all(&project_tar()).unwrap();
    let source = write_archive(td.path(), "project.tgz", &encoder.finish().unwrap());
    let out = td.path().join("out");

    let req = request(&source, &out)
        .extract_list(["project/src/*", "project/bin/*"])
        .exclude(["*.sh"])
        .strip_components(1);
    let report = extract(&req).unwrap();

    assert!(report.filtered.contains("project/src/"));
    assert!(report.filtered.contains("project/"));
    assert!(out.join("src/main.rs").is_file());
    assert!(out.join("bin/run").is_file());
    assert!(!out.join("README.md").exists());
    assert!(!out.join(".hidden").exists());
    // the hard link is always attempted, but its target was never extracted
    assert!(!out.join("README.copy").exists());
}

#[test]
fn list_is_pure() {
    let td = TempDir::new().unwrap();
    let source = write_archive(td.path(), "project.tar", &project_tar());
    let out = td.path().join("never");

    let first = list(&request(&source, &out)).unwrap();
    let second = list(&request(&source, &out)).unwrap();
    assert_eq!(first, second);
    assert!(!out.exists());
    assert!(first.created.is_empty());
}

#[test]
fn second_run_without_overwrite_is_noop() {
    let td = TempDir::new().unwrap();
    let source = write_archive(td.path(), "project.tar", &project_tar());
    let out = td.path().join("out");
    let req = request(&source, &out).overwrite(false);

    let first = extract(&req).unwrap();
    assert!(!first.created.all().is_empty());

    let second = extract(&req).unwrap();
    assert!(second.created.all().is_empty());
    assert!(!second.updated);
}

#[test_with::executable(tar)]
#[test]
fn extracts_like_system_tar() {
    let td = TempDir::new().unwrap();
    let tree = td.path().join("tree");
    fs::create_dir_all(tree.join("a/b")).unwrap();
    fs::write(tree.join("a/b/file"), b"content").unwrap();
    fs::write(tree.join("a/top"), b"top").unwrap();
    std::os::unix::fs::symlink("b/file", tree.join("a/link")).unwrap();

    let source = td.path().join("system.tar.gz");
    let status = Command::new("tar")
        .arg("-czf")
        .arg(&source)
        .arg("-C")
        .arg(&tree)
        .arg("a")
        .status()
        .unwrap();
    assert!(status.success());

    let out = td.path().join("out");
    let report = extract(&request(&source, &out)).unwrap();
    assert!(report.all.contains("a/b/file"));
    assert_eq!(fs::read(out.join("a/b/file")).unwrap(), b"content");
    assert_eq!(fs::read(out.join("a/top")).unwrap(), b"top");
    assert_eq!(
        fs::read_link(out.join("a/link")).unwrap(),
        PathBuf::from("b/file")
    );
}
