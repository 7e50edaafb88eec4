//! # Parsed SDP session & media descriptions
//!
//! Interchange model for SDP based media negotiation. Parsing and printing
//! of the full SDP text format is left to the application's SDP library;
//! this crate only models the session structure and the attributes relevant
//! to securing media transports (`a=crypto`, `a=fingerprint`, `a=setup`).
//! The attribute types implement [`Display`](std::fmt::Display) with their
//! canonical value encoding.

mod crypto;
mod fingerprint;
mod media_description;
mod setup;

pub use crypto::{SrtpCrypto, SrtpKeyingMaterial, SrtpSessionParam, SrtpSuite};
pub use fingerprint::{Fingerprint, FingerprintAlgorithm};
pub use media_description::{Media, MediaDescription, MediaType, TransportProtocol};
pub use setup::Setup;

/// Session description with the session-level attributes the media transport
/// layer cares about
#[derive(Debug, Clone, Default)]
pub struct SessionDescription {
    /// Session level certificate fingerprints (`a=fingerprint`)
    pub fingerprint: Vec<Fingerprint>,

    /// Session level DTLS connection setup role (`a=setup`)
    pub setup: Option<Setup>,

    /// Media descriptions of the session (`m=` sections, in order)
    pub media_descriptions: Vec<MediaDescription>,
}
