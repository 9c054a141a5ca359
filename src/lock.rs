//! LOCK Engine (C7): parse `<lockinfo>`, take (or refresh) an advisory lock, and run the
//! two-phase exchange with the front-end's lock coordinator (§4.5).
//!
//! Follows `handle_lock.rs`'s `<lockscope>`/`<locktype>` parsing and `build_lock_prop`'s
//! XML shape, with the coordinator itself modeled as an external peer reached through
//! `ControlChannel::send_recv` rather than an in-process `DavLockSystem` trait object,
//! since this protocol keeps the lock table in the front-end (§1, "out of scope").

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use nix::fcntl::{flock, FlockArg};

use crate::errors::{fs_error, RapError, RapResult};
use crate::response::{report_status_error, write_lock_body, LockDiscovery};
use crate::transport::{ControlChannel, Message, MessageId};
use crate::xmlio::{drain_body, parse_body};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    Shared,
    Exclusive,
}

impl LockType {
    fn to_wire(self) -> u8 {
        match self {
            LockType::Shared => 0,
            LockType::Exclusive => 1,
        }
    }
}

/// Parsed `<lockinfo>`. Absence of a body means "refresh" (§4.5), represented by
/// `None` at the call site rather than as a variant here.
struct NewLockRequest {
    lock_type: LockType,
}

fn parse_lockinfo(bytes: &[u8]) -> RapResult<Option<NewLockRequest>> {
    let root = match parse_body(bytes)? {
        Some(e) => e,
        None => return Ok(None),
    };
    if root.name != "lockinfo" {
        return Err(RapError::BadRequestBody);
    }

    // Exclusive dominates: either child can assert it, neither can retract it.
    let mut exclusive = false;
    if let Some(scope) = root.get_child("lockscope") {
        for child in &scope.children {
            if let Some(e) = child.as_element() {
                if e.name == "exclusive" {
                    exclusive = true;
                }
            }
        }
    }
    if let Some(locktype) = root.get_child("locktype") {
        for child in &locktype.children {
            if let Some(e) = child.as_element() {
                if e.name == "write" {
                    exclusive = true;
                }
            }
        }
    }

    Ok(Some(NewLockRequest {
        lock_type: if exclusive { LockType::Exclusive } else { LockType::Shared },
    }))
}

pub fn handle_lock(
    channel: &ControlChannel,
    path: &str,
    token_submitted: Option<&str>,
    body_fd: Option<std::os::fd::OwnedFd>,
) -> RapResult<()> {
    // Phase 1 — interim CONTINUE.
    channel.send(&Message::new(MessageId::Continue)).map_err(RapError::from)?;

    let bytes = match body_fd {
        Some(fd) => drain_body(fd).map_err(RapError::from)?,
        None => Vec::new(),
    };
    let parsed = parse_lockinfo(&bytes)?;
    let requested_lock_type = parsed.as_ref().map(|n| n.lock_type);

    let interim = match parsed {
        Some(new_lock) => {
            if token_submitted.is_some() {
                return Err(RapError::status_condition(
                    MessageId::BadClientRequest,
                    "lock-token-submitted",
                ));
            }
            build_new_lock_interim(path, new_lock)?
        },
        None => {
            let token = token_submitted
                .ok_or_else(|| RapError::status_condition(MessageId::BadClientRequest, "lock-token-submitted"))?;
            let mut msg = Message::new(MessageId::InterimRespondRelock);
            msg.push_str(path);
            msg.push_str(token);
            msg
        },
    };

    // Phase 2 — commit with the coordinator.
    let reply = channel.send_recv(&interim).map_err(RapError::from)?;
    match reply.id {
        MessageId::CompleteRequestLock | MessageId::CompleteRequestRelock => {
            let token = reply.param_str(0).ok_or(RapError::BadRequestBody)?;
            let timeout_secs: i64 = reply.param_binary(1).unwrap_or(0);
            let timeout = if timeout_secs > 0 { Some(Duration::from_secs(timeout_secs as u64)) } else { None };
            let lock = LockDiscovery {
                shared: matches!(requested_lock_type, Some(LockType::Shared)),
                deep: true,
                timeout,
                token,
                path,
                owner: None,
            };
            write_lock_body(channel, &lock)
        },
        other => {
            let reason = reply.param_str(0).unwrap_or("lock request failed");
            let err = RapError::status_msg(other, reason);
            report_status_error(channel, &err)
        },
    }
}

fn build_new_lock_interim(path: &str, req: NewLockRequest) -> RapResult<Message> {
    let mut opts = OpenOptions::new();
    opts.mode(0o666);
    match req.lock_type {
        LockType::Exclusive => {
            opts.write(true).create(true);
        },
        LockType::Shared => {
            opts.read(true);
        },
    }
    let file = opts
        .open(path)
        .map_err(|e| fs_error(&e, MessageId::NotFound, MessageId::AccessDenied, MessageId::NotFound))?;

    let meta = file.metadata().map_err(RapError::from)?;
    if !meta.is_file() {
        return Err(RapError::status_msg(MessageId::Conflict, "Refusing non-regular file"));
    }

    let flock_arg = match req.lock_type {
        LockType::Exclusive => FlockArg::LockExclusiveNonblock,
        LockType::Shared => FlockArg::LockSharedNonblock,
    };
    flock(file.as_raw_fd(), flock_arg)
        .map_err(|_| RapError::status_condition(MessageId::Locked, "no-conflicting-lock"))?;

    let fd: std::os::fd::OwnedFd = file.into();
    let mut msg = Message::with_fd(MessageId::InterimRespondLock, fd);
    msg.push_str(path);
    msg.push_binary(&req.lock_type.to_wire());
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_refresh() {
        assert!(parse_lockinfo(b"").unwrap().is_none());
    }

    #[test]
    fn exclusive_dominates_shared() {
        let xml = br#"<lockinfo xmlns="DAV:">
            <lockscope><exclusive/><shared/></lockscope>
            <locktype><write/></locktype>
        </lockinfo>"#;
        let req = parse_lockinfo(xml).unwrap().unwrap();
        assert_eq!(req.lock_type, LockType::Exclusive);
    }

    #[test]
    fn shared_only() {
        let xml = br#"<lockinfo xmlns="DAV:">
            <lockscope><shared/></lockscope>
            <locktype><read/></locktype>
        </lockinfo>"#;
        let req = parse_lockinfo(xml).unwrap().unwrap();
        assert_eq!(req.lock_type, LockType::Shared);
    }

    #[test]
    fn missing_lockscope_defaults_to_locktype() {
        let xml = br#"<lockinfo xmlns="DAV:"><locktype><write/></locktype></lockinfo>"#;
        let req = parse_lockinfo(xml).unwrap().unwrap();
        assert_eq!(req.lock_type, LockType::Exclusive);
    }

    #[test]
    fn missing_both_defaults_to_shared() {
        let xml = br#"<lockinfo xmlns="DAV:"></lockinfo>"#;
        let req = parse_lockinfo(xml).unwrap().unwrap();
        assert_eq!(req.lock_type, LockType::Shared);
    }
}
