//! `COPY` (§4.11): unimplemented. The reference server never grew recursive
//! copy semantics for this verb — every request fails closed with `InternalError`
//! rather than silently doing the wrong thing.

use crate::errors::{RapError, RapResult};
use crate::transport::MessageId;

pub fn handle_copy(
    _path: &str,
    _target: Option<&str>,
    body_fd: Option<std::os::fd::OwnedFd>,
) -> RapResult<()> {
    drop(body_fd);
    Err(RapError::status_msg(MessageId::InternalError, "COPY is not implemented"))
}
