//! Response Builder (C5): error and lock-discovery XML bodies shared by every verb
//! handler, plus the pipe/control-message plumbing each handler uses to reply.
//!
//! Follows `util.rs::dav_xml_error`'s `<D:error>` skeleton and
//! `handle_lock.rs::build_lock_prop`'s `<D:activelock>` tree, generalized from the
//! `D:`/`A:`/`Z:` namespace set there to this protocol's `d:`/`x:`/`z:` prefixes.

use std::time::Duration;

use xml::writer::XmlEvent;

use crate::errors::{Condition, RapError, RapResult};
use crate::path::percent_encode_href;
use crate::transport::{Message, MessageId};
use crate::xmlio::{open_response_pipe, ResponsePipe};

pub const NS_DAV: &str = "DAV:";
pub const NS_X: &str = "urn:couling-webdav:";
pub const NS_MS: &str = "urn:schemas-microsoft-com:";

/// Open a fresh pipe, send `id` to the front-end carrying its read end plus whatever
/// extra params the caller has already staged, and hand back the write end so the
/// caller can stream a body into it.
pub fn begin_body_response(
    channel: &crate::transport::ControlChannel,
    id: MessageId,
    location: &str,
    mime: &str,
) -> RapResult<ResponsePipe> {
    let (read_fd, mut pipe) = open_response_pipe().map_err(RapError::from)?;
    let mut msg = Message::with_fd(id, read_fd);
    msg.push_str(location);
    msg.push_str(mime);
    channel.send(&msg).map_err(RapError::from)?;
    pipe.write_xml_declaration().map_err(RapError::from)?;
    Ok(pipe)
}

/// `<d:error>` body (§4.3). `condition`, when present, nests an empty `<d:{condition}>`;
/// `message`, when present, adds an `<x:text-error>` with an href + human text.
pub fn write_error_body(
    channel: &crate::transport::ControlChannel,
    response_id: MessageId,
    href: &str,
    condition: Option<Condition>,
    message: Option<&str>,
) -> RapResult<()> {
    let mut pipe = begin_body_response(channel, response_id, href, "application/xml; charset=utf-8")?;
    {
        let mut w = pipe.xml_writer();
        w.write(
            XmlEvent::start_element("d:error")
                .ns("d", NS_DAV)
                .ns("x", NS_X),
        )?;
        if let Some(cond) = condition {
            w.write(XmlEvent::start_element(format!("d:{cond}").as_str()))?;
            w.write(XmlEvent::start_element("d:href"))?;
            w.write(XmlEvent::characters(&percent_encode_href(href)))?;
            w.write(XmlEvent::end_element())?;
            w.write(XmlEvent::end_element())?;
        }
        if let Some(msg) = message {
            w.write(XmlEvent::start_element("x:text-error"))?;
            w.write(XmlEvent::start_element("x:href"))?;
            w.write(XmlEvent::characters(&percent_encode_href(href)))?;
            w.write(XmlEvent::end_element())?;
            w.write(XmlEvent::start_element("x:text"))?;
            w.write(XmlEvent::characters(msg))?;
            w.write(XmlEvent::end_element())?;
            w.write(XmlEvent::end_element())?;
        }
        w.write(XmlEvent::end_element())?;
    }
    Ok(())
}

pub fn report_status_error(channel: &crate::transport::ControlChannel, err: &RapError) -> RapResult<()> {
    match err {
        RapError::Status(s) => {
            let href = s.message.as_deref().unwrap_or("");
            write_error_body(channel, s.id, href, s.condition, None)
        },
        _ => {
            let msg = Message::new(err.response_id());
            channel.send(&msg).map_err(RapError::from)
        },
    }
}

pub struct LockDiscovery<'a> {
    pub shared: bool,
    pub deep: bool,
    pub timeout: Option<Duration>,
    pub token: &'a str,
    pub path: &'a str,
    pub owner: Option<&'a str>,
}

/// `<d:prop><d:lockdiscovery><d:activelock>…</d:activelock></d:lockdiscovery></d:prop>`
/// (§4.3), the reply to a successful `LOCK`.
pub fn write_lock_body(channel: &crate::transport::ControlChannel, lock: &LockDiscovery) -> RapResult<()> {
    let mut pipe = begin_body_response(channel, MessageId::Ok, lock.path, "application/xml; charset=utf-8")?;
    {
        let mut w = pipe.xml_writer();
        w.write(XmlEvent::start_element("d:prop").ns("d", NS_DAV))?;
        w.write(XmlEvent::start_element("d:lockdiscovery"))?;
        w.write(XmlEvent::start_element("d:activelock"))?;

        w.write(XmlEvent::start_element("d:lockscope"))?;
        w.write(XmlEvent::start_element(if lock.shared { "d:shared" } else { "d:exclusive" }))?;
        w.write(XmlEvent::end_element())?;
        w.write(XmlEvent::end_element())?;

        w.write(XmlEvent::start_element("d:locktype"))?;
        w.write(XmlEvent::start_element(if lock.shared { "d:read" } else { "d:write" }))?;
        w.write(XmlEvent::end_element())?;
        w.write(XmlEvent::end_element())?;

        w.write(XmlEvent::start_element("d:depth"))?;
        w.write(XmlEvent::characters(if lock.deep { "infinity" } else { "0" }))?;
        w.write(XmlEvent::end_element())?;

        if let Some(owner) = lock.owner {
            w.write(XmlEvent::start_element("d:owner"))?;
            w.write(XmlEvent::characters(owner))?;
            w.write(XmlEvent::end_element())?;
        }

        w.write(XmlEvent::start_element("d:timeout"))?;
        let timeout_text = match lock.timeout {
            Some(d) => format!("Second-{}", d.as_secs()),
            None => "Infinite".to_string(),
        };
        w.write(XmlEvent::characters(&timeout_text))?;
        w.write(XmlEvent::end_element())?;

        w.write(XmlEvent::start_element("d:locktoken"))?;
        w.write(XmlEvent::start_element("d:href"))?;
        w.write(XmlEvent::characters(&format!("urn:uuid:{}", lock.token)))?;
        w.write(XmlEvent::end_element())?;
        w.write(XmlEvent::end_element())?;

        w.write(XmlEvent::start_element("d:lockroot"))?;
        w.write(XmlEvent::start_element("d:href"))?;
        w.write(XmlEvent::characters(&percent_encode_href(lock.path)))?;
        w.write(XmlEvent::end_element())?;
        w.write(XmlEvent::end_element())?;

        w.write(XmlEvent::end_element())?; // activelock
        w.write(XmlEvent::end_element())?; // lockdiscovery
        w.write(XmlEvent::end_element())?; // prop
    }
    Ok(())
}
