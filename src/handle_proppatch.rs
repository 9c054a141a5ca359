//! `PROPPATCH` (§4.11): no dead-property store exists in this protocol, so every patch
//! request is answered as if it were a successful `PROPFIND` at depth 1 over every
//! property — this is the reference server's documented no-op behavior, not a bug.

use std::os::fd::OwnedFd;

use crate::errors::RapResult;
use crate::mime::MimeRegistry;
use crate::propfind::{handle_propfind, Depth, PropertySet};
use crate::transport::ControlChannel;
use crate::xmlio::drain_body;

pub fn handle_proppatch(
    channel: &ControlChannel,
    mime: &MimeRegistry,
    path: &str,
    body_fd: Option<OwnedFd>,
) -> RapResult<()> {
    if let Some(fd) = body_fd {
        drain_body(fd)?;
    }
    handle_propfind(channel, mime, path, Depth::One, PropertySet::all())
}
