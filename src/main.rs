//! `rap` — the worker process spawned once per authenticated WebDAV session (§1, §4.13).
//!
//! Follows `bin/main.rs`'s env_logger init and CLI parsing before handing off to the
//! rest of the crate, and the original daemon's `main()` for `setlocale`, mime-table
//! initialization, and the well-known control-socket fd.

mod auth;
mod dispatcher;
mod errors;
mod fsutil;
mod handle_copy;
mod handle_delete;
mod handle_get;
mod handle_mkcol;
mod handle_move;
mod handle_proppatch;
mod handle_put;
mod lock;
mod mime;
mod path;
mod propfind;
mod response;
mod state;
mod transport;
mod xmlio;

use std::ffi::CString;
use std::os::fd::RawFd;
use std::path::PathBuf;

use clap::Parser;

use crate::mime::MimeRegistry;
use crate::transport::ControlChannel;

/// The well-known descriptor the front-end execs this worker with, carrying the control
/// socket (the C original's `RAP_CONTROL_SOCKET`, always fd 3 by convention).
const CONTROL_SOCKET_FD: RawFd = 3;

#[derive(Parser, Debug)]
#[command(name = "rap", about = "Privilege-separated WebDAV request authenticator/processor")]
struct Cli {
    /// PAM service name used to authenticate the session.
    #[arg(default_value = auth::PAM_SERVICE_DEFAULT)]
    pam_service: String,

    /// Path to a `mime.types`-style file.
    #[arg(default_value = "/etc/mime.types")]
    mime_types_file: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    set_process_locale();

    let mime = match MimeRegistry::load(&cli.mime_types_file) {
        Ok(m) => m,
        Err(e) => {
            log::error!("could not load mime types from {}: {e}", cli.mime_types_file.display());
            std::process::exit(1);
        },
    };

    let channel = ControlChannel::from_raw_fd(CONTROL_SOCKET_FD);
    let code = dispatcher::run(&channel, &mime, &cli.pam_service);
    std::process::exit(code);
}

/// `setlocale(LC_ALL, "")` — pulls in the environment's locale for `strcoll`-based
/// directory sorting (§4.6). Failure is non-fatal: the process falls back to the "C"
/// locale, which `strcoll` already handles as a byte-wise compare.
fn set_process_locale() {
    let empty = CString::new("").unwrap();
    unsafe {
        if libc::setlocale(libc::LC_ALL, empty.as_ptr()).is_null() {
            log::warn!("setlocale(LC_ALL, \"\") failed; falling back to the C locale");
        }
    }
}
