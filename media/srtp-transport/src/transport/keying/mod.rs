//! Keying method interface
//!
//! A keying method negotiates SRTP master keys for one media stream. Two
//! methods exist: key exchange inside the SDP body ([`sdes`]) and an in-band
//! DTLS handshake on the RTP channel ([`dtls`], optional). During a
//! negotiation every enabled method is driven through the same
//! `media_create` / `encode_sdp` / `media_start` steps as the transport
//! itself; the first method to produce a complete policy pair wins and the
//! remaining ones are closed.

use crate::{Error, SrtpUse, suite::SrtpCryptoPolicy};
use sdp_types::SessionDescription;

pub(crate) mod sdes;

#[cfg(feature = "dtls-srtp")]
pub(crate) mod dtls;

/// The keying methods a transport can negotiate keys with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyingKind {
    /// SDP security descriptions, `a=crypto` attributes (RFC 4568)
    Sdes,
    /// DTLS handshake multiplexed on the RTP channel (RFC 5764)
    DtlsSrtp,
}

/// Negotiation state shared between the transport and its keying methods
pub(crate) struct Negotiation {
    /// Transmit policy produced by a keying method, empty while undecided
    pub(crate) tx_policy_neg: SrtpCryptoPolicy,
    /// Receive policy produced by a keying method, empty while undecided
    pub(crate) rx_policy_neg: SrtpCryptoPolicy,

    /// Number of keying methods still completing asynchronously
    pub(crate) pending_cnt: u32,

    /// Latched at the start of each negotiation: no remote SDP means this
    /// side is the offerer
    pub(crate) offerer_side: bool,

    /// SRTP usage mode observed from the peer's SDP
    pub(crate) peer_use: SrtpUse,
}

impl Negotiation {
    pub(crate) fn new(peer_use: SrtpUse) -> Self {
        Negotiation {
            tx_policy_neg: SrtpCryptoPolicy::default(),
            rx_policy_neg: SrtpCryptoPolicy::default(),
            pending_cnt: 0,
            offerer_side: false,
            peer_use,
        }
    }

    /// Both policy slots are filled, the negotiation is decided
    pub(crate) fn is_complete(&self) -> bool {
        !self.tx_policy_neg.is_empty() && !self.rx_policy_neg.is_empty()
    }

    pub(crate) fn clear_policies(&mut self) {
        self.tx_policy_neg.clear();
        self.rx_policy_neg.clear();
    }
}

/// Verdict of a keying method on an inbound packet
pub(crate) enum Inspection {
    /// Packet is not relevant to this method, processing continues
    Ignored,
    /// Packet was consumed by the method
    Consumed,
    /// Packet was consumed and completed the key negotiation
    Completed {
        tx: SrtpCryptoPolicy,
        rx: SrtpCryptoPolicy,
    },
    /// Packet was consumed and the negotiation failed for good
    Failed(Error),
}

/// Contract of a keying method.
///
/// The negotiation callbacks mirror the transport operations of the same
/// name. A method that cannot conclude during `media_start` (the DTLS
/// handshake) increments [`Negotiation::pending_cnt`] and later reports its
/// result through [`inspect_inbound`](Self::inspect_inbound).
pub(crate) trait KeyingMethod: Send {
    fn kind(&self) -> KeyingKind;

    fn media_create(
        &mut self,
        nego: &mut Negotiation,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error>;

    fn encode_sdp(
        &mut self,
        nego: &mut Negotiation,
        local: &mut SessionDescription,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error>;

    fn media_start(
        &mut self,
        nego: &mut Negotiation,
        local: &SessionDescription,
        remote: &SessionDescription,
        media_index: usize,
    ) -> Result<(), Error>;

    fn media_stop(&mut self);

    /// Offer an inbound packet from the RTP channel to the method
    fn inspect_inbound(&mut self, _pkt: &[u8]) -> Inspection {
        Inspection::Ignored
    }

    fn close(&mut self);

    #[cfg(feature = "dtls-srtp")]
    fn as_dtls(&mut self) -> Option<&mut dtls::DtlsKeying> {
        None
    }
}
