//! # SRTP media transport
//!
//! A transparent wrapper around an existing media transport which protects
//! outgoing RTP/RTCP with SRTP and verifies & decrypts incoming packets
//! (RFC 3711). Keys are negotiated over SDP, either with security
//! description attributes ([SDES, RFC 4568]) or an in-band DTLS handshake
//! ([DTLS-SRTP, RFC 5764], behind the `dtls-srtp` feature).
//!
//! [`SrtpTransport`] in the [`transport`] module is the top level type of
//! this crate. It implements the same [`MediaTransport`] contract it wraps,
//! so it can be slotted between an RTP endpoint and its datagram transport
//! without either of them noticing.
//!
//! [SDES, RFC 4568]: https://www.rfc-editor.org/rfc/rfc4568
//! [DTLS-SRTP, RFC 5764]: https://www.rfc-editor.org/rfc/rfc5764

mod error;
mod session;
pub mod suite;
pub mod transport;

#[cfg(feature = "dtls-srtp")]
mod ssl;

pub use error::Error;
pub use suite::{CryptoFlags, CryptoSuite, SrtpCryptoPolicy, suite_index, suites};
pub use transport::{
    Direction, KeyingKind, MediaTransport, PacketCallback, SrtpTransport, TransportAttachParam,
};

#[cfg(feature = "dtls-srtp")]
pub use ssl::OpenSslContext;

/// When the transport uses SRTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SrtpUse {
    /// Never offer or accept SRTP
    Disabled,
    /// Offer SRTP alongside plain RTP and follow the peer's choice
    #[default]
    Optional,
    /// Require SRTP, fail the negotiation without it
    Mandatory,
}

/// Settings of a [`SrtpTransport`], deep-copied at creation
#[derive(Clone)]
pub struct SrtpSetting {
    pub usage: SrtpUse,

    /// Ordered list of offered crypto suites. Empty keys are generated
    /// freshly for every negotiation.
    pub crypto: Vec<SrtpCryptoPolicy>,

    /// Ordered list of enabled keying methods, at most two
    pub keying: Vec<KeyingKind>,

    /// Close the member transport when this transport is closed
    pub close_member_tp: bool,

    /// Size of the per-direction transmit buffers
    pub mtu: usize,
}

impl Default for SrtpSetting {
    fn default() -> Self {
        // All registered suites except NULL, empty keys
        let crypto = suites()
            .iter()
            .skip(1)
            .map(|suite| SrtpCryptoPolicy::new(suite.name, Vec::new()))
            .collect();

        SrtpSetting {
            usage: SrtpUse::default(),
            crypto,
            keying: vec![KeyingKind::Sdes, KeyingKind::DtlsSrtp],
            close_member_tp: true,
            mtu: 1500,
        }
    }
}

/// SRTP state snapshot returned by [`SrtpTransport::get_info`]
#[derive(Debug, Clone)]
pub struct SrtpInfo {
    /// An SRTP session is running
    pub active: bool,
    pub tx_policy: SrtpCryptoPolicy,
    pub rx_policy: SrtpCryptoPolicy,
    /// The local usage policy
    pub usage: SrtpUse,
    /// The peer's usage as observed from its SDP
    pub peer_usage: SrtpUse,
}
