//! Process-wide authentication state (§5, design note "Global mutable state").
//!
//! The C original keeps `authenticated`/`authenticatedUser`/`pamh` as static globals,
//! written once by `pamAuthenticate` and read everywhere else. Modeled here as a
//! `OnceLock<AuthState>`: write-once, read-only thereafter, which lets every handler
//! borrow it without a lock.

use std::sync::OnceLock;

use pam_client::Session;

pub struct AuthState {
    pub user: String,
    /// Kept alive for the life of the process; its `Drop` impl closes the PAM session
    /// (the C original's `atexit(&pamCleanup)` teardown).
    pub session: Session<'static>,
}

static AUTH: OnceLock<AuthState> = OnceLock::new();

/// True once `AUTHENTICATE` has succeeded. After this point the dispatcher's verb loop
/// is live and a second `AUTHENTICATE` is rejected (invariant 1).
pub fn is_authenticated() -> bool {
    AUTH.get().is_some()
}

pub fn authenticated_user() -> Option<&'static str> {
    AUTH.get().map(|a| a.user.as_str())
}

/// Install the authentication state. Called exactly once, from the pre-auth loop.
/// Returns an error if authentication has already happened in this process (it cannot,
/// under the dispatcher's own control flow, but the guard keeps the invariant explicit
/// rather than implicit in caller discipline).
pub fn install(state: AuthState) -> Result<(), &'static str> {
    AUTH.set(state).map_err(|_| "AUTHENTICATE already completed in this process")
}
