//! SDP security descriptions keying (RFC 4568)
//!
//! Keys are exchanged as media level `a=crypto` attributes. The offer
//! carries one attribute per enabled suite with a freshly generated key,
//! the answer echoes the chosen tag & suite with the answerer's own key.

use super::{Inspection, KeyingKind, KeyingMethod, Negotiation};
use crate::{
    Error, SrtpUse,
    suite::{CryptoFlags, SrtpCryptoPolicy, suite_index, suites},
};
use base64::{Engine, prelude::BASE64_STANDARD};
use rand::Rng;
use sdp_types::{
    MediaDescription, SessionDescription, SrtpCrypto, SrtpKeyingMaterial, SrtpSessionParam,
    SrtpSuite,
};

pub(crate) struct SdesKeying {
    usage: SrtpUse,
    /// Enabled suites with canonical names; preset keys are used verbatim
    crypto: Vec<SrtpCryptoPolicy>,
    /// Crypto attributes sent in the last outgoing offer
    offered: Vec<SrtpCryptoPolicy>,
}

impl SdesKeying {
    pub(crate) fn new(usage: SrtpUse, crypto: Vec<SrtpCryptoPolicy>) -> Self {
        SdesKeying {
            usage,
            crypto,
            offered: Vec::new(),
        }
    }

    fn enabled(&self, suite_name: &str) -> Option<&SrtpCryptoPolicy> {
        self.crypto
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(suite_name))
    }

    /// Pick the first usable crypto attribute from a remote offer.
    ///
    /// Returns the negotiated (tx, rx) pair and the answer attribute to
    /// emit. Offers carrying an MKI are skipped, it is not supported.
    fn select_from_offer(
        &self,
        remote_media: &MediaDescription,
    ) -> Result<(SrtpCryptoPolicy, SrtpCryptoPolicy, SrtpCrypto), Error> {
        let mut bad_key = false;

        for crypto in &remote_media.crypto {
            let Some(index) = suite_index(crypto.suite.as_str()) else {
                continue;
            };

            if index == 0 {
                continue;
            }

            let Some(local) = self.enabled(crypto.suite.as_str()) else {
                continue;
            };

            let Some(material) = crypto.keys.first() else {
                bad_key = true;
                continue;
            };

            if material.mki.is_some() {
                continue;
            }

            let Ok(remote_key) = BASE64_STANDARD.decode(material.key_and_salt.as_bytes()) else {
                bad_key = true;
                continue;
            };

            if remote_key.len() != suites()[index].key_len {
                bad_key = true;
                continue;
            }

            let flags = flags_from_params(&crypto.params);
            let local_key = key_for(local, index);

            let answer = SrtpCrypto {
                tag: crypto.tag,
                suite: crypto.suite.clone(),
                keys: vec![SrtpKeyingMaterial::new(BASE64_STANDARD.encode(&local_key))],
                params: crypto.params.clone(),
            };

            let name = suites()[index].name;

            let mut tx = SrtpCryptoPolicy::new(name, local_key);
            tx.flags = flags;
            let mut rx = SrtpCryptoPolicy::new(name, remote_key);
            rx.flags = flags;

            return Ok((tx, rx, answer));
        }

        if bad_key {
            Err(Error::InvalidKeyLength)
        } else {
            Err(Error::UnsupportedCryptoSuite)
        }
    }
}

impl KeyingMethod for SdesKeying {
    fn kind(&self) -> KeyingKind {
        KeyingKind::Sdes
    }

    fn media_create(
        &mut self,
        _nego: &mut Negotiation,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error> {
        self.offered.clear();

        if let Some(remote) = remote {
            remote
                .media_descriptions
                .get(media_index)
                .ok_or(Error::Bug)?;
        }

        Ok(())
    }

    fn encode_sdp(
        &mut self,
        nego: &mut Negotiation,
        local: &mut SessionDescription,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error> {
        let Some(remote) = remote else {
            // Outgoing offer: one crypto attribute per enabled suite
            let local_media = local
                .media_descriptions
                .get_mut(media_index)
                .ok_or(Error::Bug)?;

            self.offered.clear();

            for (position, policy) in self.crypto.iter().enumerate() {
                let index = suite_index(&policy.name).ok_or(Error::UnsupportedCryptoSuite)?;

                if index == 0 {
                    continue;
                }

                let key = key_for(policy, index);

                local_media.crypto.push(SrtpCrypto {
                    tag: position as u32 + 1,
                    suite: SrtpSuite::from_name(&policy.name),
                    keys: vec![SrtpKeyingMaterial::new(BASE64_STANDARD.encode(&key))],
                    params: params_from_flags(policy.flags),
                });

                let mut offered = SrtpCryptoPolicy::new(suites()[index].name, key);
                offered.flags = policy.flags;
                self.offered.push(offered);
            }

            if self.usage == SrtpUse::Mandatory {
                local_media.media.proto = sdp_types::TransportProtocol::RtpSavp;
            }

            return Ok(());
        };

        // Incoming offer: answer with the first matching suite
        let remote_media = remote
            .media_descriptions
            .get(media_index)
            .ok_or(Error::Bug)?;

        if remote_media.crypto.is_empty() {
            if remote_media.media.proto.is_secure() || self.usage == SrtpUse::Mandatory {
                // A secure transport without keys cannot be answered, and
                // mandatory usage cannot fall back to plain RTP
                return Err(Error::SdpRequiresCrypto);
            }

            // Plain RTP offer, leave the policy slots empty
            return Ok(());
        }

        let (tx, rx, answer) = self.select_from_offer(remote_media)?;

        let local_media = local
            .media_descriptions
            .get_mut(media_index)
            .ok_or(Error::Bug)?;

        if remote_media.media.proto.is_secure() {
            local_media.media.proto = remote_media.media.proto.clone();
        }

        local_media.crypto.push(answer);

        nego.tx_policy_neg = tx;
        nego.rx_policy_neg = rx;

        Ok(())
    }

    fn media_start(
        &mut self,
        nego: &mut Negotiation,
        _local: &SessionDescription,
        remote: &SessionDescription,
        media_index: usize,
    ) -> Result<(), Error> {
        let remote_media = remote
            .media_descriptions
            .get(media_index)
            .ok_or(Error::Bug)?;

        if !nego.offerer_side {
            // The answer side concluded in encode_sdp; re-run the selection
            // here only when that step was skipped by the application
            if !nego.is_complete() {
                if remote_media.crypto.is_empty() {
                    if remote_media.media.proto.is_secure() || self.usage == SrtpUse::Mandatory {
                        return Err(Error::SdpRequiresCrypto);
                    }

                    return Ok(());
                }

                let (tx, rx, _) = self.select_from_offer(remote_media)?;
                nego.tx_policy_neg = tx;
                nego.rx_policy_neg = rx;
            }

            return Ok(());
        }

        // Offerer side: match the answer against what was offered
        if remote_media.crypto.is_empty() {
            if self.usage == SrtpUse::Mandatory || remote_media.media.proto.is_secure() {
                return Err(Error::SdpRequiresCrypto);
            }

            return Ok(());
        }

        let mut bad_key = false;

        for crypto in &remote_media.crypto {
            let Some(offered) = self
                .offered
                .iter()
                .find(|o| o.name.eq_ignore_ascii_case(crypto.suite.as_str()))
            else {
                continue;
            };

            let index = suite_index(&offered.name).ok_or(Error::Bug)?;

            let Some(material) = crypto.keys.first() else {
                bad_key = true;
                continue;
            };

            if material.mki.is_some() {
                continue;
            }

            let Ok(remote_key) = BASE64_STANDARD.decode(material.key_and_salt.as_bytes()) else {
                bad_key = true;
                continue;
            };

            if remote_key.len() != suites()[index].key_len {
                bad_key = true;
                continue;
            }

            let flags = flags_from_params(&crypto.params);

            let mut tx = offered.clone();
            tx.flags = flags;
            let mut rx = SrtpCryptoPolicy::new(offered.name.clone(), remote_key);
            rx.flags = flags;

            nego.tx_policy_neg = tx;
            nego.rx_policy_neg = rx;

            return Ok(());
        }

        if bad_key {
            Err(Error::InvalidKeyLength)
        } else {
            Err(Error::UnsupportedCryptoSuite)
        }
    }

    fn media_stop(&mut self) {
        self.offered.clear();
    }

    fn inspect_inbound(&mut self, _pkt: &[u8]) -> Inspection {
        Inspection::Ignored
    }

    fn close(&mut self) {
        self.offered.clear();
    }
}

/// The policy's preset key, or a fresh random one of the suite's length
fn key_for(policy: &SrtpCryptoPolicy, suite: usize) -> Vec<u8> {
    if !policy.key.is_empty() {
        return policy.key.clone();
    }

    let mut key = vec![0u8; suites()[suite].key_len];
    rand::rng().fill_bytes(&mut key);
    key
}

fn flags_from_params(params: &[SrtpSessionParam]) -> CryptoFlags {
    let mut flags = CryptoFlags::default();

    for param in params {
        match param {
            SrtpSessionParam::UnencryptedSrtp => flags.no_encryption = true,
            SrtpSessionParam::UnauthenticatedSrtp => flags.no_authentication = true,
            SrtpSessionParam::UnencryptedSrtcp | SrtpSessionParam::Ext(_) => {}
        }
    }

    flags
}

fn params_from_flags(flags: CryptoFlags) -> Vec<SrtpSessionParam> {
    let mut params = Vec::new();

    if flags.no_encryption {
        params.push(SrtpSessionParam::UnencryptedSrtp);
        params.push(SrtpSessionParam::UnencryptedSrtcp);
    }

    if flags.no_authentication {
        params.push(SrtpSessionParam::UnauthenticatedSrtp);
    }

    params
}
