//! Resolution of owner and group names to numeric ids.
//!
//! A numeric string is taken as the id itself.  Anything else is looked up in the local account
//! databases (`/etc/passwd` and `/etc/group`), which share the same `name:x:id:...` layout.

use std::{fs, io, path::Path};

use crate::error::{Error, Result};

const PASSWD: &str = "/etc/passwd";
const GROUP: &str = "/etc/group";

/// Finds `name` in a colon-separated account database and returns its id (third field).
fn lookup(database: &str, name: &str) -> Option<u32> {
    database
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let mut fields = line.split(':');
            if fields.next()? != name {
                return None;
            }
            fields.nth(1)?.trim().parse().ok()
        })
}

fn resolve_in(path: &Path, name: &str) -> Result<Option<u32>> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(Some(id));
    }

    match fs::read_to_string(path) {
        Ok(database) => Ok(lookup(&database, name)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Resolves a user name or numeric uid.
pub fn resolve_owner(owner: &str) -> Result<u32> {
    resolve_in(Path::new(PASSWD), owner)?.ok_or_else(|| Error::UnknownUser(owner.to_string()))
}

/// Resolves a group name or numeric gid.
pub fn resolve_group(group: &str) -> Result<u32> {
    resolve_in(Path::new(GROUP), group)?.ok_or_else(|| Error::UnknownGroup(group.to_string()))
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::test::tempdir;

    const PASSWD_SAMPLE: &str = "\
# comment:x:7:7
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
someone:x:1000:1000:Some One,,,:/home/someone:/bin/bash
broken:x:notanumber:0::/:/bin/false
";

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(PASSWD_SAMPLE, "root"), Some(0));
        assert_eq!(lookup(PASSWD_SAMPLE, "someone"), Some(1000));
        assert_eq!(lookup(PASSWD_SAMPLE, "some"), None);
        assert_eq!(lookup(PASSWD_SAMPLE, "broken"), None);
        assert_eq!(lookup(PASSWD_SAMPLE, "# comment"), None);
        assert_eq!(lookup("", "root"), None);
    }

    #[test]
    fn test_resolve_in() -> Result<()> {
        let td = tempdir();
        let path = td.path().join("group");
        fs::write(&path, "wheel:x:10:someone\nusers:x:100:\n")?;

        assert_eq!(resolve_in(&path, "users")?, Some(100));
        assert_eq!(resolve_in(&path, "4242")?, Some(4242));
        assert_eq!(resolve_in(&path, "nobody-here")?, None);
        assert_eq!(resolve_in(&td.path().join("missing"), "wheel")?, None);
        Ok(())
    }

    #[test]
    fn test_resolve_numeric_and_unknown() {
        assert_eq!(resolve_owner("0").unwrap(), 0);
        assert_eq!(resolve_group("1234").unwrap(), 1234);
        assert!(matches!(
            resolve_owner("no-such-user-for-sure"),
            Err(Error::UnknownUser(name)) if name == "no-such-user-for-sure"
        ));
        assert!(matches!(
            resolve_group("no-such-group-for-sure"),
            Err(Error::UnknownGroup(_))
        ));
    }
}
