use crate::{Fingerprint, Setup, SrtpCrypto};
use std::fmt;

/// Type of a media stream (`m=<type> ...`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    Audio,
    Video,
    Application,
    Other(String),
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
            MediaType::Application => "application",
            MediaType::Other(other) => other,
        })
    }
}

/// Transport protocol of a media stream (`m=<type> <port> <proto> ...`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportProtocol {
    /// Plain RTP
    RtpAvp,
    /// Plain RTP with RTCP feedback
    RtpAvpf,
    /// SRTP, keyed via SDP crypto attributes
    RtpSavp,
    /// SRTP with RTCP feedback, keyed via SDP crypto attributes
    RtpSavpf,
    /// SRTP, keyed via an in-band DTLS handshake
    UdpTlsRtpSavp,
    /// SRTP with RTCP feedback, keyed via an in-band DTLS handshake
    UdpTlsRtpSavpf,
    Other(String),
}

impl TransportProtocol {
    /// Whether the protocol carries SRTP (in any keying variant)
    pub fn is_secure(&self) -> bool {
        matches!(
            self,
            TransportProtocol::RtpSavp
                | TransportProtocol::RtpSavpf
                | TransportProtocol::UdpTlsRtpSavp
                | TransportProtocol::UdpTlsRtpSavpf
        )
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportProtocol::RtpAvp => "RTP/AVP",
            TransportProtocol::RtpAvpf => "RTP/AVPF",
            TransportProtocol::RtpSavp => "RTP/SAVP",
            TransportProtocol::RtpSavpf => "RTP/SAVPF",
            TransportProtocol::UdpTlsRtpSavp => "UDP/TLS/RTP/SAVP",
            TransportProtocol::UdpTlsRtpSavpf => "UDP/TLS/RTP/SAVPF",
            TransportProtocol::Other(other) => other,
        })
    }
}

/// The `m=` line of a media description
#[derive(Debug, Clone)]
pub struct Media {
    pub media_type: MediaType,
    pub port: u16,
    pub proto: TransportProtocol,
}

/// Media description (`m=` section) with the attributes relevant to
/// transport negotiation
#[derive(Debug, Clone)]
pub struct MediaDescription {
    pub media: Media,

    /// Stream is marked inactive (`a=inactive`)
    pub inactive: bool,

    /// RTP & RTCP are multiplexed on a single port (`a=rtcp-mux`)
    pub rtcp_mux: bool,

    /// SRTP crypto attributes (`a=crypto`)
    pub crypto: Vec<SrtpCrypto>,

    /// Media level certificate fingerprints (`a=fingerprint`)
    pub fingerprint: Vec<Fingerprint>,

    /// Media level DTLS connection setup role (`a=setup`)
    pub setup: Option<Setup>,
}

impl MediaDescription {
    /// Create an empty media description for the given `m=` line
    pub fn new(media: Media) -> Self {
        MediaDescription {
            media,
            inactive: false,
            rtcp_mux: false,
            crypto: Vec::new(),
            fingerprint: Vec::new(),
            setup: None,
        }
    }
}
