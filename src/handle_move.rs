//! `MOVE` (§4.10): `rename`, with cross-device moves left as a stub per the reference
//! server (no recursive copy-then-unlink is implemented here — see DESIGN.md).

use crate::errors::{RapError, RapResult};
use crate::transport::{ControlChannel, Message, MessageId};

pub fn handle_move(
    channel: &ControlChannel,
    path: &str,
    target: Option<&str>,
    body_fd: Option<std::os::fd::OwnedFd>,
) -> RapResult<()> {
    drop(body_fd);
    let target = target.ok_or_else(|| RapError::status_msg(MessageId::BadClientRequest, "Target not specified"))?;

    match std::fs::rename(path, target) {
        Ok(()) => channel.send(&Message::new(MessageId::OkNoContent)).map_err(RapError::from),
        Err(e) => Err(match e.raw_os_error() {
            Some(libc::EXDEV) => RapError::status(MessageId::InternalError),
            Some(libc::EPERM) | Some(libc::EACCES) => RapError::status(MessageId::AccessDenied),
            Some(libc::EDQUOT) => RapError::status(MessageId::InsufficientStorage),
            _ => RapError::status(MessageId::Conflict),
        }),
    }
}
