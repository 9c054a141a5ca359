//! `PUT` (C8, §4.7): create/truncate the target and copy the request body into it.
//!
//! Follows `handle_put.rs`'s/`handle_lock.rs`'s `OpenOptions` construction (write +
//! create) and the original daemon's chunked copy loop, ported here as a single
//! `io::copy` since the body fd and target file are both blocking and the kernel already
//! does the chunking.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;

use crate::errors::{RapError, RapResult};
use crate::transport::{ControlChannel, Message, MessageId};

pub fn handle_put(channel: &ControlChannel, path: &str, body_fd: Option<std::os::fd::OwnedFd>) -> RapResult<()> {
    channel.send(&Message::new(MessageId::Continue)).map_err(RapError::from)?;

    let mut target = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o666)
        .open(path)
        .map_err(|e| match e.raw_os_error() {
            Some(libc::EACCES) => RapError::status(MessageId::AccessDenied),
            _ => RapError::status(MessageId::Conflict),
        })?;

    let body_fd = body_fd.ok_or(RapError::BadRequestBody)?;
    let mut source = std::fs::File::from(body_fd);

    match io::copy(&mut source, &mut target) {
        Ok(_) => {},
        Err(e) if e.raw_os_error() == Some(libc::ENOSPC) => {
            return Err(RapError::status(MessageId::InsufficientStorage));
        },
        Err(e) => return Err(RapError::from(e)),
    }

    channel.send(&Message::new(MessageId::Created)).map_err(RapError::from)
}
