//! Main Dispatcher (C9, §4.13): pre-auth loop, then verb loop, both driven straight off
//! `ControlChannel::recv`.
//!
//! Follows `methods.rs`'s/`davhandler.rs`'s request-routing `match`, generalized from an
//! HTTP method enum to this protocol's `MessageId` request range. The two-loop shape
//! (accept only `AUTHENTICATE`, then accept any verb) mirrors the original daemon's own
//! `main` loop, since this is the one component with a privilege-separation boundary to
//! enforce before serving any requests.

use log::{error, warn};

use crate::auth::authenticate_with_service;
use crate::errors::{RapError, RapResult};
use crate::handle_copy::handle_copy;
use crate::handle_delete::handle_delete;
use crate::handle_get::handle_get;
use crate::handle_mkcol::handle_mkcol;
use crate::handle_move::handle_move;
use crate::handle_put::handle_put;
use crate::handle_proppatch::handle_proppatch;
use crate::lock::handle_lock;
use crate::mime::MimeRegistry;
use crate::propfind::{handle_propfind, parse_property_set, Depth};
use crate::response::report_status_error;
use crate::transport::{ControlChannel, Message, MessageId};

/// Runs both loops to completion. Returns the process exit code the caller should use:
/// `0` for an orderly shutdown, `1` for any transport failure.
pub fn run(channel: &ControlChannel, mime: &MimeRegistry, pam_service: &str) -> i32 {
    match pre_auth_loop(channel, pam_service) {
        Ok(true) => {},
        Ok(false) => return 0,
        Err(e) => {
            error!("transport error during authentication: {e}");
            return 1;
        },
    }

    match verb_loop(channel, mime) {
        Ok(()) => 0,
        Err(e) => {
            error!("transport error in verb loop: {e}");
            1
        },
    }
}

/// Accept exactly one message at a time; the only acceptable kind is `AUTHENTICATE`.
/// Returns `Ok(true)` once authentication succeeds, `Ok(false)` on an orderly peer
/// shutdown before that happens.
fn pre_auth_loop(channel: &ControlChannel, pam_service: &str) -> std::io::Result<bool> {
    loop {
        let msg = match channel.recv()? {
            Some(m) => m,
            None => return Ok(false),
        };

        if msg.id != MessageId::Authenticate {
            warn!("rejected {:?} before authentication", msg.id);
            channel.send(&Message::new(MessageId::InternalError))?;
            continue;
        }

        let user = msg.param_str(0).unwrap_or_default();
        let password = msg.param_str(1).unwrap_or_default();
        let rhost = msg.param_str(2);

        match authenticate_with_service(pam_service, user, password, rhost) {
            Ok(()) => {
                channel.send(&Message::new(MessageId::Ok))?;
                return Ok(true);
            },
            Err(_) => {
                channel.send(&Message::new(MessageId::AuthFailed))?;
            },
        }
    }
}

/// Receive a message and dispatch to the handler for its `id`; unknown kinds yield
/// `INTERNAL_ERROR`. Returns on any transport error or orderly peer shutdown.
fn verb_loop(channel: &ControlChannel, mime: &MimeRegistry) -> std::io::Result<()> {
    loop {
        let msg = match channel.recv()? {
            Some(m) => m,
            None => return Ok(()),
        };

        let result = dispatch(channel, mime, msg);
        if let Err(err) = result {
            if let Err(report_err) = report_status_error(channel, &err) {
                return Err(match report_err {
                    RapError::Io(io_err) => io_err,
                    other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
                });
            }
        }
    }
}

fn dispatch(channel: &ControlChannel, mime: &MimeRegistry, msg: Message) -> RapResult<()> {
    let path = msg.param_str(0).ok_or(RapError::BadRequestBody)?.to_string();

    match msg.id {
        MessageId::Get => handle_get(channel, mime, &path),
        MessageId::Put => handle_put(channel, &path, msg.fd),
        MessageId::Mkcol => handle_mkcol(channel, &path, msg.fd),
        MessageId::Delete => handle_delete(channel, &path, msg.fd),
        MessageId::Move => {
            let target = msg.param_str(1);
            handle_move(channel, &path, target, msg.fd)
        },
        MessageId::Copy => {
            let target = msg.param_str(1);
            handle_copy(&path, target, msg.fd)
        },
        MessageId::Propfind => {
            let depth = Depth::from_wire(msg.param_binary(1).unwrap_or(0u8));
            let props = parse_property_set(msg.fd)?;
            handle_propfind(channel, mime, &path, depth, props)
        },
        MessageId::Proppatch => handle_proppatch(channel, mime, &path, msg.fd),
        MessageId::Lock => {
            let token = msg.param_str(1);
            handle_lock(channel, &path, token, msg.fd)
        },
        MessageId::Authenticate => Err(RapError::status(MessageId::InternalError)),
        other => {
            warn!("unexpected message kind in verb loop: {other:?}");
            Err(RapError::status(MessageId::InternalError))
        },
    }
}
