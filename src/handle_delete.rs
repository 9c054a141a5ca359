//! `DELETE` (§4.9): `rmdir` for directories, `unlink` otherwise.

use crate::errors::{RapError, RapResult};
use crate::transport::{ControlChannel, Message, MessageId};

pub fn handle_delete(channel: &ControlChannel, path: &str, body_fd: Option<std::os::fd::OwnedFd>) -> RapResult<()> {
    drop(body_fd);

    let meta = std::fs::symlink_metadata(path).map_err(|e| match e.raw_os_error() {
        Some(libc::ENOENT) | Some(libc::ENOTDIR) => RapError::status(MessageId::NotFound),
        Some(libc::EACCES) | Some(libc::EPERM) => RapError::status(MessageId::AccessDenied),
        _ => RapError::status(MessageId::InternalError),
    })?;

    let result = if meta.is_dir() { std::fs::remove_dir(path) } else { std::fs::remove_file(path) };
    result.map_err(|e| match e.raw_os_error() {
        Some(libc::ENOENT) | Some(libc::ENOTDIR) => RapError::status(MessageId::NotFound),
        Some(libc::EACCES) | Some(libc::EPERM) => RapError::status(MessageId::AccessDenied),
        _ => RapError::status(MessageId::InternalError),
    })?;

    channel.send(&Message::new(MessageId::OkNoContent)).map_err(RapError::from)
}
