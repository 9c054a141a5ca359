//! Error taxonomy: every fallible operation in this crate returns `RapResult<T>`.
//! Follows `errors.rs`'s `DavError` / `DavError::statuscode` shape, generalized from
//! `http::StatusCode` to this protocol's `MessageId` response vocabulary, and
//! `localfs.rs`'s `impl From<io::Error> for FsError` for the errno → taxonomy mapping.

use std::io;

use crate::transport::MessageId;

/// A WebDAV condition name to embed as `<d:{name}>` in an error body, per §4.3.
pub type Condition = &'static str;

#[derive(Debug, thiserror::Error)]
pub enum RapError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("XML read error: {0}")]
    XmlRead(#[from] xml::reader::Error),

    #[error("XML tree parse error: {0}")]
    XmlTree(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] xml::writer::Error),

    #[error("malformed request body")]
    BadRequestBody,

    #[error("{0}")]
    Status(StatusError),

    #[error("authentication failed")]
    AuthFailed,
}

/// A client-visible failure: a response `MessageId` drawn from the server-response
/// range, an optional human-readable message (surfaced as `<x:text-error>`), and an
/// optional WebDAV condition name (surfaced as `<d:{condition}>`).
#[derive(Debug)]
pub struct StatusError {
    pub id: MessageId,
    pub message: Option<String>,
    pub condition: Option<Condition>,
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.id)?;
        if let Some(m) = &self.message {
            write!(f, ": {m}")?;
        }
        Ok(())
    }
}

impl RapError {
    pub fn status(id: MessageId) -> Self {
        RapError::Status(StatusError { id, message: None, condition: None })
    }

    pub fn status_msg(id: MessageId, message: impl Into<String>) -> Self {
        RapError::Status(StatusError { id, message: Some(message.into()), condition: None })
    }

    pub fn status_condition(id: MessageId, condition: Condition) -> Self {
        RapError::Status(StatusError { id, message: None, condition: Some(condition) })
    }

    /// The response kind to report to the front-end for this error.
    pub fn response_id(&self) -> MessageId {
        match self {
            RapError::Status(s) => s.id,
            RapError::AuthFailed => MessageId::AuthFailed,
            RapError::BadRequestBody => MessageId::BadClientRequest,
            RapError::XmlRead(_) | RapError::XmlWrite(_) | RapError::XmlTree(_) => MessageId::InternalError,
            RapError::Io(_) => MessageId::InternalError,
        }
    }
}

pub type RapResult<T> = Result<T, RapError>;

/// Convert a raw `nix` errno into an `io::Error` carrying the same errno, the same
/// conversion `transport.rs` applies to socket-layer failures.
pub fn nix_to_io(e: nix::Error) -> io::Error {
    io::Error::from_raw_os_error(e as i32)
}

/// Map an `io::Error` from a filesystem syscall onto the response taxonomy the way
/// `localfs.rs` maps onto `FsError`: specific errno values first, falling back to a
/// caller-supplied default for anything libc didn't set.
pub fn fs_error(e: &io::Error, not_found: MessageId, access_denied: MessageId, other: MessageId) -> RapError {
    if let Some(errno) = e.raw_os_error() {
        match errno {
            libc::ENOENT => return RapError::status(not_found),
            libc::EACCES | libc::EPERM => return RapError::status(access_denied),
            _ => {},
        }
    }
    RapError::status(other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_id_reflects_status_kind() {
        let e = RapError::status(MessageId::Conflict);
        assert_eq!(e.response_id() as u16, MessageId::Conflict as u16);
    }

    #[test]
    fn io_errors_default_to_internal_error() {
        let e = RapError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(e.response_id() as u16, MessageId::InternalError as u16);
    }

    #[test]
    fn fs_error_maps_enoent_to_caller_not_found() {
        let e = io::Error::from_raw_os_error(libc::ENOENT);
        let mapped = fs_error(&e, MessageId::NotFound, MessageId::AccessDenied, MessageId::Conflict);
        assert_eq!(mapped.response_id() as u16, MessageId::NotFound as u16);
    }
}
