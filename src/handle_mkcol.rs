//! `MKCOL` (§4.8). Any accompanying body fd is closed unread — this verb carries no
//! body in the reference server.

use crate::errors::{RapError, RapResult};
use crate::transport::{ControlChannel, Message, MessageId};

pub fn handle_mkcol(channel: &ControlChannel, path: &str, body_fd: Option<std::os::fd::OwnedFd>) -> RapResult<()> {
    drop(body_fd);

    match std::fs::create_dir(path) {
        Ok(()) => channel.send(&Message::new(MessageId::Created)).map_err(RapError::from),
        Err(e) => Err(match e.raw_os_error() {
            Some(libc::EACCES) => RapError::status(MessageId::AccessDenied),
            Some(libc::ENOSPC) | Some(libc::EDQUOT) => RapError::status(MessageId::InsufficientStorage),
            _ => RapError::status(MessageId::Conflict),
        }),
    }
}
