//! Filesystem metadata helpers shared by the PROPFIND engine, the `GET` directory
//! index, and the LOCK engine: stat/statvfs wrappers, RFC-1123 timestamps, human file
//! sizes, and the Microsoft `Win32FileAttributes` encoding.
//!
//! Follows `localfs.rs`'s 1:1 `std::fs`/libc mapping — this worker has no virtual
//! filesystem trait because, post-privilege-drop, it only ever touches the real
//! filesystem as the target user — and the original daemon's direct `stat`/`statvfs`
//! calls for quota and attribute reporting.

use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::path::display_name;

/// RFC-1123 (`Sun, 06 Nov 1994 08:49:37 GMT`), the fixed format the control channel
/// leans on in place of locale-formatted dates (§4.6).
pub fn rfc1123(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn unix_secs(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// The worker intentionally reuses ctime for both `creationdate` and `getlastmodified`
/// (SPEC_FULL.md design notes) — a known quirk of the reference server, preserved here
/// rather than "fixed" to use `mtime`/`birthtime`.
pub fn ctime(meta: &Metadata) -> SystemTime {
    UNIX_EPOCH + Duration::new(meta.ctime() as u64, meta.ctime_nsec() as u32)
}

pub fn mtime(meta: &Metadata) -> SystemTime {
    meta.modified().unwrap_or(UNIX_EPOCH)
}

/// `"{size}-{mtime}"`, the reference server's etag.
pub fn etag(meta: &Metadata) -> String {
    format!("{}-{}", meta.len(), unix_secs(mtime(meta)))
}

/// `00000012`/`00000010` for directories (dotfile/not), `00000022`/`00000020` for
/// files, per §4.4.
pub fn win32_file_attributes(path: &str, meta: &Metadata) -> &'static str {
    let hidden = display_name(path).starts_with('.');
    if meta.is_dir() {
        if hidden { "00000012" } else { "00000010" }
    } else if hidden {
        "00000022"
    } else {
        "00000020"
    }
}

pub struct Quota {
    pub used: u64,
    pub available: u64,
}

/// `statvfs` of `path` itself. Failures are silently swallowed by the caller (§4.4,
/// §9): this just surfaces `None` rather than synthesizing a fake quota.
pub fn quota_for(path: &Path) -> Option<Quota> {
    let vfs = nix::sys::statvfs::statvfs(path).ok()?;
    let block = vfs.block_size().max(1);
    let used = (vfs.blocks() - vfs.blocks_free()) * block;
    let available = vfs.blocks_available() * block;
    Some(Quota { used, available })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1123_epoch() {
        assert_eq!(rfc1123(UNIX_EPOCH), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn win32_attrs_dotfile_directory() {
        let dir = tempfile::tempdir().unwrap();
        let hidden = dir.path().join(".git");
        std::fs::create_dir(&hidden).unwrap();
        let meta = std::fs::metadata(&hidden).unwrap();
        assert_eq!(win32_file_attributes(hidden.to_str().unwrap(), &meta), "00000012");
    }

    #[test]
    fn win32_attrs_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("a.txt");
        std::fs::write(&f, b"x").unwrap();
        let meta = std::fs::metadata(&f).unwrap();
        assert_eq!(win32_file_attributes(f.to_str().unwrap(), &meta), "00000020");
    }

    #[test]
    fn quota_for_existing_dir_is_some() {
        let dir = tempfile::tempdir().unwrap();
        assert!(quota_for(dir.path()).is_some());
    }
}
