//! Authenticator (C4, §4.12): one pluggable-authentication round trip, ending in an
//! irreversible privilege drop.
//!
//! Grounded on the C original's `pamAuthenticate`/`lockToUser` (`rap.c`): start a PAM
//! conversation that answers every prompt with the supplied password, run the
//! authenticate/acct_mgmt/setcred/open_session sequence, replace the process
//! environment with PAM's, then switch real+effective uid/gid to the target account.
//! `pam-client`'s `conv_mock::Conversation` plays the role of the C original's
//! `pamConverse` callback — it already implements "answer every prompt with this fixed
//! password" as a library type, so no custom `Conversation` impl is needed here.

use nix::unistd::{setresgid, setresuid, Gid, Uid, User};
use pam_client::conv_mock::Conversation;
use pam_client::{Context, Flag};

use crate::state::{self, AuthState};

/// Default PAM service name (CLI arg 1 in the C original, `main.rs` here).
pub const PAM_SERVICE_DEFAULT: &str = "webdav";

pub fn authenticate_with_service(
    service: &str,
    user: &str,
    password: &str,
    rhost: Option<&str>,
) -> Result<(), String> {
    let conv = Conversation::with_credentials(user, password);
    let context = Context::new(service, Some(user), conv).map_err(|e| e.to_string())?;
    // Leaked deliberately: `open_session` below borrows `context`, and the resulting
    // `Session` is stored for the lifetime of the process in `state::AUTH`.
    let context: &'static mut Context<Conversation> = Box::leak(Box::new(context));

    if let Some(rhost) = rhost {
        context.set_rhost(rhost).map_err(|e| e.to_string())?;
    }
    context.set_ruser(user).map_err(|e| e.to_string())?;

    let flags = Flag::SILENT | Flag::DISALLOW_NULL_AUTHTOK;
    context.authenticate(flags).map_err(|e| e.to_string())?;
    context.acct_mgmt(flags).map_err(|e| e.to_string())?;
    context.setcred(Flag::ESTABLISH_CRED | Flag::SILENT).map_err(|e| e.to_string())?;

    let canonical_user = context.user().map_err(|e| e.to_string())?;
    let env = context.envlist().map_err(|e| e.to_string())?;

    let session = context.open_session(Flag::SILENT).map_err(|e| e.to_string())?;

    install_environment(&env);
    lock_to_user(&canonical_user).map_err(|e| {
        format!("could not switch to account {canonical_user}: {e}")
    })?;

    state::install(AuthState { user: canonical_user, session })
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Wipe the process environment and replace it wholesale with PAM's, mirroring the C
/// original's `clearenv` + `putenv` loop.
fn install_environment(env: &pam_client::env_list::EnvList) {
    for (key, _) in std::env::vars() {
        std::env::remove_var(key);
    }
    for entry in env.iter() {
        if let Some((key, value)) = entry.to_string_lossy().split_once('=') {
            std::env::set_var(key, value);
        }
    }
}

/// Switch real+effective uid/gid to the named account. Irreversible: once dropped,
/// the process can never regain root (invariant 1).
fn lock_to_user(user: &str) -> nix::Result<()> {
    let pw = User::from_name(user)?.ok_or(nix::errno::Errno::ENOENT)?;
    setresgid(pw.gid, pw.gid, pw.gid)?;
    setresuid(pw.uid, pw.uid, pw.uid)?;
    debug_assert_ne!(Uid::effective(), Uid::from_raw(0));
    debug_assert_ne!(Gid::effective(), Gid::from_raw(0));
    Ok(())
}
