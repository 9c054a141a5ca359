//! PROPFIND Engine (C6): parse the requested property set, stat the target (and
//! optionally one level of children), emit a `<d:multistatus>` body.
//!
//! Follows `handle_props.rs`'s `PropWriter`/`build_prop` shape (the prop names, the
//! per-property match, the `<d:propstat>`/`<d:status>` wrapper) — trimmed to the fixed
//! property set this protocol names, with the dead-property store and
//! live-property-set/patch machinery dropped since `PROPPATCH` here is a no-op (§4.11).

use std::fs::Metadata;
use std::os::fd::OwnedFd;
use std::path::Path;

use xml::writer::XmlEvent;
use xmltree::Element;

use crate::errors::{fs_error, RapError, RapResult};
use crate::fsutil::{ctime, etag, quota_for, win32_file_attributes};
use crate::mime::MimeRegistry;
use crate::path::{display_name, is_dot_or_dotdot, percent_encode_href, with_trailing_slash};
use crate::response::{begin_body_response, NS_DAV, NS_MS};
use crate::transport::{ControlChannel, MessageId};
use crate::xmlio::{drain_body, parse_body};

#[derive(Debug, Clone, Copy, Default)]
pub struct PropertySet {
    pub creationdate: bool,
    pub displayname: bool,
    pub getcontentlength: bool,
    pub getcontenttype: bool,
    pub getetag: bool,
    pub getlastmodified: bool,
    pub resourcetype: bool,
    pub quota_used_bytes: bool,
    pub quota_available_bytes: bool,
    pub win32_file_attributes: bool,
}

impl PropertySet {
    pub fn all() -> Self {
        PropertySet {
            creationdate: true,
            displayname: true,
            getcontentlength: true,
            getcontenttype: true,
            getetag: true,
            getlastmodified: true,
            resourcetype: true,
            quota_used_bytes: true,
            quota_available_bytes: true,
            win32_file_attributes: true,
        }
    }

    fn set(&mut self, local_name: &str, namespace: Option<&str>) {
        match namespace {
            Some(NS_MS) if local_name == "Win32FileAttributes" => self.win32_file_attributes = true,
            Some(NS_DAV) | None => match local_name {
                "creationdate" => self.creationdate = true,
                "displayname" => self.displayname = true,
                "getcontentlength" => self.getcontentlength = true,
                "getcontenttype" => self.getcontenttype = true,
                "getetag" => self.getetag = true,
                "getlastmodified" => self.getlastmodified = true,
                "resourcetype" => self.resourcetype = true,
                "quota-used-bytes" => self.quota_used_bytes = true,
                "quota-available-bytes" => self.quota_available_bytes = true,
                _ => {},
            },
            _ => {},
        }
    }
}

/// Parse an optional `PROPFIND` request body. No body (or an all-whitespace one) means
/// "all properties" (§4.4).
pub fn parse_property_set(body_fd: Option<OwnedFd>) -> RapResult<PropertySet> {
    let bytes = match body_fd {
        Some(fd) => drain_body(fd).map_err(RapError::from)?,
        None => return Ok(PropertySet::all()),
    };
    let root = match parse_body(&bytes)? {
        Some(e) => e,
        None => return Ok(PropertySet::all()),
    };
    if root.name != "propfind" {
        return Err(RapError::BadRequestBody);
    }
    let prop = match root.get_child("prop") {
        Some(p) => p,
        None => return Ok(PropertySet::all()),
    };
    let mut set = PropertySet::default();
    for child in &prop.children {
        if let Some(elem) = child.as_element() {
            set.set(&elem.name, elem.namespace.as_deref());
        }
    }
    Ok(set)
}

/// Depth semantics relevant to this engine: only "0" vs "not 0" matter (§4.4, testable
/// property 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
}

impl Depth {
    pub fn from_wire(v: u8) -> Self {
        if v == 0 {
            Depth::Zero
        } else {
            Depth::One
        }
    }
}

pub fn handle_propfind(
    channel: &ControlChannel,
    mime: &MimeRegistry,
    path: &str,
    depth: Depth,
    props: PropertySet,
) -> RapResult<()> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => return Err(fs_error(&e, MessageId::NotFound, MessageId::AccessDenied, MessageId::NotFound)),
    };

    let location = with_trailing_slash(path, meta.is_dir()).into_owned();
    let mut pipe = begin_body_response(channel, MessageId::Multistatus, &location, "application/xml; charset=utf-8")?;

    {
        let mut w = pipe.xml_writer();
        w.write(XmlEvent::start_element("d:multistatus").ns("d", NS_DAV).ns("z", NS_MS))?;
    }

    write_entry_response(&mut pipe, &location, &meta, mime, &props)?;

    if depth != Depth::Zero && meta.is_dir() {
        if let Ok(entries) = std::fs::read_dir(path) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if is_dot_or_dotdot(&name) {
                    continue;
                }
                let child_meta = match std::fs::metadata(entry.path()) {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                let child_path = format!("{}{}", location, name);
                let child_path = with_trailing_slash(&child_path, child_meta.is_dir()).into_owned();
                write_entry_response(&mut pipe, &child_path, &child_meta, mime, &props)?;
            }
        }
    }

    {
        let mut w = pipe.xml_writer();
        w.write(XmlEvent::end_element())?; // multistatus
    }
    Ok(())
}

fn write_entry_response(
    pipe: &mut crate::xmlio::ResponsePipe,
    path: &str,
    meta: &Metadata,
    mime: &MimeRegistry,
    props: &PropertySet,
) -> RapResult<()> {
    let mut w = pipe.xml_writer();
    w.write(XmlEvent::start_element("d:response"))?;
    w.write(XmlEvent::start_element("d:href"))?;
    w.write(XmlEvent::characters(&percent_encode_href(path)))?;
    w.write(XmlEvent::end_element())?;

    w.write(XmlEvent::start_element("d:propstat"))?;
    w.write(XmlEvent::start_element("d:prop"))?;

    if props.creationdate {
        write_text_prop(&mut w, "d:creationdate", &crate::fsutil::rfc1123(ctime(meta)))?;
    }
    if props.getlastmodified {
        // Reuses ctime, matching the reference server's known quirk (SPEC_FULL.md §9).
        write_text_prop(&mut w, "d:getlastmodified", &crate::fsutil::rfc1123(ctime(meta)))?;
    }
    if props.getetag {
        write_text_prop(&mut w, "d:getetag", &etag(meta))?;
    }
    if props.resourcetype {
        if meta.is_dir() {
            w.write(XmlEvent::start_element("d:resourcetype"))?;
            w.write(XmlEvent::start_element("d:collection"))?;
            w.write(XmlEvent::end_element())?;
            w.write(XmlEvent::end_element())?;
        } else {
            w.write(XmlEvent::start_element("d:resourcetype"))?;
            w.write(XmlEvent::end_element())?;
        }
    }
    if meta.is_dir() {
        if props.quota_available_bytes || props.quota_used_bytes {
            if let Some(q) = quota_for(Path::new(path)) {
                if props.quota_used_bytes {
                    write_text_prop(&mut w, "d:quota-used-bytes", &q.used.to_string())?;
                }
                if props.quota_available_bytes {
                    write_text_prop(&mut w, "d:quota-available-bytes", &q.available.to_string())?;
                }
            }
        }
    } else {
        if props.getcontentlength {
            write_text_prop(&mut w, "d:getcontentlength", &meta.len().to_string())?;
        }
        if props.getcontenttype {
            write_text_prop(&mut w, "d:getcontenttype", mime.find_mime_type(Some(path)))?;
        }
    }
    if props.win32_file_attributes {
        write_text_prop(&mut w, "z:Win32FileAttributes", win32_file_attributes(path, meta))?;
    }
    if props.displayname {
        write_text_prop(&mut w, "d:displayname", display_name(path))?;
    }

    w.write(XmlEvent::end_element())?; // prop
    w.write(XmlEvent::start_element("d:status"))?;
    w.write(XmlEvent::characters("HTTP/1.1 200 OK"))?;
    w.write(XmlEvent::end_element())?;
    w.write(XmlEvent::end_element())?; // propstat
    w.write(XmlEvent::end_element())?; // response
    Ok(())
}

fn write_text_prop(
    w: &mut xml::writer::EventWriter<&mut std::fs::File>,
    name: &str,
    text: &str,
) -> Result<(), xml::writer::Error> {
    w.write(XmlEvent::start_element(name))?;
    w.write(XmlEvent::characters(text))?;
    w.write(XmlEvent::end_element())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_body_means_all_properties() {
        let ps = parse_property_set(None).unwrap();
        assert!(ps.getetag && ps.resourcetype && ps.creationdate);
    }

    #[test]
    fn depth_from_wire() {
        assert_eq!(Depth::from_wire(0), Depth::Zero);
        assert_eq!(Depth::from_wire(1), Depth::One);
        assert_eq!(Depth::from_wire(255), Depth::One);
    }
}
