//! `GET` (C8, §4.6): stream a regular file's fd directly as the response body, or
//! render an HTML directory index.
//!
//! Follows the original daemon's `handleGet`: `fdopendir` the already-open directory
//! fd, sort entries by `strcoll` in the process locale, and write one `<tr>` per entry.
//! `handle_gethead.rs` streams from a `DavFile` the same way this streams from an
//! `OwnedFd` — its byte-range/conditional-request machinery has no counterpart in this
//! protocol (there is no HTTP layer on this side of the control channel) and is not
//! reproduced.

use std::ffi::CString;
use std::os::fd::OwnedFd;

use crate::errors::{fs_error, RapError, RapResult};
use crate::fsutil::{mtime, rfc1123};
use crate::mime::MimeRegistry;
use crate::path::{format_file_size, with_trailing_slash};
use crate::response::begin_body_response;
use crate::transport::{ControlChannel, Message, MessageId};

pub fn handle_get(channel: &ControlChannel, mime: &MimeRegistry, path: &str) -> RapResult<()> {
    let file = std::fs::File::open(path)
        .map_err(|e| fs_error(&e, MessageId::NotFound, MessageId::AccessDenied, MessageId::NotFound))?;
    let meta = file.metadata().map_err(RapError::from)?;

    if meta.is_dir() {
        drop(file);
        return handle_get_directory(channel, mime, path);
    }

    let mtime_secs = mtime(&meta).duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
    let fd: OwnedFd = file.into();
    let mut msg = Message::with_fd(MessageId::Ok, fd);
    msg.push_binary(&mtime_secs);
    msg.push_str(mime.find_mime_type(Some(path)));
    msg.push_str(path);
    channel.send(&msg).map_err(RapError::from)
}

fn handle_get_directory(channel: &ControlChannel, mime: &MimeRegistry, path: &str) -> RapResult<()> {
    let location = with_trailing_slash(path, true).into_owned();
    let mut pipe = begin_body_response(channel, MessageId::Ok, &location, "text/html")?;

    let mut names: Vec<String> = std::fs::read_dir(path)
        .map_err(RapError::from)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .collect();

    names.sort_by(|a, b| locale_compare(a, b));

    pipe.write_raw(b"<html><body><table>\n").map_err(RapError::from)?;
    pipe.write_raw(b"<tr><th>Type</th><th>Name</th><th>Size</th><th>Mime Type</th><th>Last Modified</th></tr>\n")
        .map_err(RapError::from)?;

    for name in names {
        let child_path = format!("{location}{name}");
        let child_meta = match std::fs::symlink_metadata(&child_path) {
            Ok(m) => m,
            Err(_) => continue,
        };
        let is_dir = child_meta.is_dir();
        let href = with_trailing_slash(&child_path, is_dir).into_owned();
        let display = if is_dir { format!("{name}/") } else { name.clone() };
        let kind = if is_dir { "dir" } else { "file" };
        let size = if child_meta.is_file() { format_file_size(child_meta.len()) } else { "-".to_string() };
        let mime_col = if is_dir { "-".to_string() } else { mime.find_mime_type(Some(&child_path)).to_string() };
        let row = format!(
            "<tr><td>{kind}</td><td><a href=\"{href}\">{display}</a></td><td>{size}</td><td>{mime_col}</td><td>{}</td></tr>\n",
            rfc1123(mtime(&child_meta)),
        );
        pipe.write_raw(row.as_bytes()).map_err(RapError::from)?;
    }

    pipe.write_raw(b"</table></body></html>\n").map_err(RapError::from)
}

/// `libc::strcoll` against the process locale (set once at startup via
/// `setlocale(LC_ALL, "")`), falling back to a byte-wise compare if either name
/// contains an interior NUL — the worker's best approximation of the C original's
/// sort, since Rust has no native collation API.
fn locale_compare(a: &str, b: &str) -> std::cmp::Ordering {
    let (Ok(ca), Ok(cb)) = (CString::new(a), CString::new(b)) else {
        return a.cmp(b);
    };
    let ordering = unsafe { libc::strcoll(ca.as_ptr(), cb.as_ptr()) };
    ordering.cmp(&0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_compare_is_consistent_with_equal_strings() {
        assert_eq!(locale_compare("a", "a"), std::cmp::Ordering::Equal);
    }

    #[test]
    fn locale_compare_orders_distinct_names() {
        assert_ne!(locale_compare("a", "b"), std::cmp::Ordering::Equal);
    }
}
