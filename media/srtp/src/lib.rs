//! SRTP & SRTCP packet protection (RFC 3711, RFC 7714)
//!
//! The API is modeled after libsrtp: a [`SrtpSession`] is created from a list
//! of [`SrtpPolicy`]s, each of which applies a pair of [`CryptoPolicy`]s
//! (RTP & RTCP) to one or more streams selected by [`Ssrc`]. Packets are
//! protected & unprotected in place.

use std::sync::LazyLock;

mod cipher;
mod crypto_policy;
mod error;
mod kdf;
mod replay;
mod session;

pub use crypto_policy::{AuthType, CipherType, CryptoPolicy, SecurityServices};
pub use error::SrtpError;
pub use session::{SrtpPolicy, SrtpSession, Ssrc};

/// Initialize the library
///
/// Idempotent, subsequent calls return the result of the first one. There is
/// no matching deinitialization, the backend keeps no process global state.
pub fn init() -> Result<(), SrtpError> {
    static INIT: LazyLock<Result<(), SrtpError>> = LazyLock::new(|| Ok(()));

    *INIT
}
