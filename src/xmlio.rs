//! Streamed XML read/write over raw descriptors (§4.1/§4.3, design note "XML as
//! streams").
//!
//! Follows `xmltree_ext.rs`'s `emitter()`/`write_ev` pair wrapping `xml-rs`'s
//! `EventWriter`, and `handle_props.rs`'s `PropWriter::new` (the `EmitterConfig` used
//! for multistatus bodies). Request bodies in this protocol are small (property lists,
//! lockinfo), so rather than a fully streamed async reader, bodies are drained to a
//! buffer and parsed as a tree with `xmltree::Element` — a malformed or truncated body
//! must still be drained, not left half-read.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::OwnedFd;

use xml::common::XmlVersion;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};
use xmltree::Element;

use crate::errors::RapResult;

/// Read a request body fd to completion and hand back the bytes. The fd is consumed:
/// dropping the `File` closes it, satisfying invariant 2 (every received descriptor is
/// closed or forwarded before the handler returns).
pub fn drain_body(fd: OwnedFd) -> io::Result<Vec<u8>> {
    let mut file = File::from(fd);
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Parse a (possibly empty) request body into an XML element tree. An empty body is not
/// an error — callers treat it as "use the default" (all-properties, lock-refresh).
pub fn parse_body(bytes: &[u8]) -> RapResult<Option<Element>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(Element::parse(bytes)?))
}

/// A pipe whose read end is handed to the front-end in a response message and whose
/// write end the handler streams a body into. Matches invariant 3. The read end is
/// taken out by `begin_body_response` as soon as the control message is sent — by the
/// time a handler is writing XML, only the write end is reachable.
pub struct ResponsePipe {
    write_end: File,
}

/// Open a pipe for a body response. Returns the raw read end (to place in the control
/// message) separately from the `ResponsePipe` the handler then writes through.
pub fn open_response_pipe() -> io::Result<(OwnedFd, ResponsePipe)> {
    let (read_fd, write_fd) = nix::unistd::pipe().map_err(crate::errors::nix_to_io)?;
    Ok((read_fd, ResponsePipe { write_end: File::from(write_fd) }))
}

impl ResponsePipe {
    /// Start an `EventWriter` over the pipe's write end: no pretty-printing, no
    /// collapsing of empty elements (clients rely on e.g.
    /// `<d:collection></d:collection>` rather than a self-closing tag in some
    /// implementations).
    pub fn xml_writer(&mut self) -> EventWriter<&mut File> {
        EventWriter::new_with_config(
            &mut self.write_end,
            EmitterConfig {
                perform_indent: false,
                normalize_empty_elements: false,
                write_document_declaration: false,
                ..Default::default()
            },
        )
    }

    pub fn write_xml_declaration(&mut self) -> io::Result<()> {
        let mut w = self.xml_writer();
        w.write(XmlEvent::StartDocument {
            version: XmlVersion::Version10,
            encoding: Some("utf-8"),
            standalone: None,
        })
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    pub fn writer_mut(&mut self) -> &mut File {
        &mut self.write_end
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_end.write_all(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_parses_to_none() {
        assert!(parse_body(b"").unwrap().is_none());
        assert!(parse_body(b"   \n").unwrap().is_none());
    }

    #[test]
    fn well_formed_body_parses_to_some() {
        let body = b"<propfind xmlns=\"DAV:\"><allprop/></propfind>";
        let elem = parse_body(body).unwrap().unwrap();
        assert_eq!(elem.name, "propfind");
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_body(b"<propfind><unterminated>").is_err());
    }
}
