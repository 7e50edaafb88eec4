use crate::{
    CryptoPolicy, SrtpError,
    cipher::{GCM_TAG_LEN, PacketCipher, PacketAuth},
    crypto_policy::CipherType,
    kdf,
    replay::{DEFAULT_WINDOW_SIZE, ReplayOutcome, ReplayWindow, estimate_index},
};
use std::{borrow::Cow, collections::HashMap};

const SRTCP_INDEX_SIZE: usize = 4;
const SRTCP_MAX_INDEX: u32 = 0x7FFF_FFFF;
const RTCP_HEADER_LEN: usize = 8;

/// Defines which RTP/RTCP streams a [`SrtpPolicy`] applies to
#[derive(Debug, Clone, Copy)]
pub enum Ssrc {
    /// Policy applies to any inbound stream
    AnyInbound,
    /// Policy applies to any outbound stream
    AnyOutbound,
    /// Policy applies to the stream with the given SSRC, in both directions
    Specific(u32),
}

/// Policy which defines how packets of one or more streams are protected
pub struct SrtpPolicy<'a> {
    rtp: CryptoPolicy,
    rtcp: CryptoPolicy,
    key: Cow<'a, [u8]>,
    ssrc: Ssrc,
    window_size: u64,
}

impl<'a> SrtpPolicy<'a> {
    /// Create a new SRTP policy
    ///
    /// `rtp` - Crypto policy for RTP protection
    /// `rtcp` - Crypto policy for RTCP protection
    /// `key` - Master key + salt used for this policy
    /// `ssrc` - To which streams this policy applies
    pub fn new(
        rtp: CryptoPolicy,
        rtcp: CryptoPolicy,
        key: Cow<'a, [u8]>,
        ssrc: Ssrc,
    ) -> Result<Self, SrtpError> {
        let expected_key_length = [
            rtp.cipher_key_len,
            rtp.auth_key_len,
            rtcp.cipher_key_len,
            rtcp.auth_key_len,
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        if key.len() < expected_key_length {
            log::error!(
                "key is too short, expected: {expected_key_length}, got: {}",
                key.len()
            );
            return Err(SrtpError::BadParam);
        }

        Ok(Self {
            rtp,
            rtcp,
            key,
            ssrc,
            window_size: DEFAULT_WINDOW_SIZE,
        })
    }

    /// Window size for replay protection
    pub fn window_size(mut self, size: u32) -> Self {
        self.window_size = u64::from(size);
        self
    }
}

/// Derived per-direction transform of a policy
struct Transform {
    cipher: PacketCipher,
    auth: PacketAuth,
}

impl Transform {
    /// Derive the session transforms from the master key + salt.
    ///
    /// Labels are 0..=2 for RTP and 3..=5 for RTCP (RFC 3711 section 4.3.2).
    /// A NULL cipher derives nothing, its policy may still authenticate; the
    /// session auth key is then taken from the head of the master key since
    /// there is no salt to run the KDF with.
    fn derive(policy: &CryptoPolicy, master: &[u8], rtcp: bool) -> Result<Self, SrtpError> {
        let (enc_label, auth_label, salt_label) = if rtcp {
            (
                kdf::LABEL_SRTCP_ENCRYPTION,
                kdf::LABEL_SRTCP_AUTHENTICATION,
                kdf::LABEL_SRTCP_SALT,
            )
        } else {
            (
                kdf::LABEL_SRTP_ENCRYPTION,
                kdf::LABEL_SRTP_AUTHENTICATION,
                kdf::LABEL_SRTP_SALT,
            )
        };

        let salt_len = policy.cipher.salt_len();
        let conf = policy.sec_serv.conf();
        let auth = policy.sec_serv.auth();

        let (cipher, auth_key) = match policy.cipher {
            CipherType::Null => (PacketCipher::Null, None),
            _ => {
                if master.len() < policy.cipher_key_len {
                    return Err(SrtpError::BadParam);
                }

                let base_len = policy.cipher_key_len - salt_len;
                let (master_key, master_salt) = master[..policy.cipher_key_len].split_at(base_len);

                let session_key = kdf::derive(master_key, master_salt, enc_label, base_len)?;
                let session_salt = kdf::derive(master_key, master_salt, salt_label, salt_len)?;

                let cipher = match policy.cipher {
                    CipherType::AesIcm128 | CipherType::AesIcm192 | CipherType::AesIcm256 => {
                        PacketCipher::aes_cm(session_key, &session_salt)?
                    }
                    CipherType::AesGcm128 | CipherType::AesGcm256 => {
                        PacketCipher::aes_gcm(&session_key, &session_salt)?
                    }
                    CipherType::Null => unreachable!(),
                };

                let auth_key = if policy.auth_key_len > 0 {
                    Some(kdf::derive(
                        master_key,
                        master_salt,
                        auth_label,
                        policy.auth_key_len,
                    )?)
                } else {
                    None
                };

                (cipher, auth_key)
            }
        };

        let cipher = if conf { cipher } else { PacketCipher::Null };

        let auth = if auth && policy.auth_key_len > 0 {
            let key = match &auth_key {
                Some(key) => key.as_slice(),
                None => {
                    if master.len() < policy.auth_key_len {
                        return Err(SrtpError::BadParam);
                    }
                    &master[..policy.auth_key_len]
                }
            };

            PacketAuth::hmac_sha1(key, policy.auth_tag_len)?
        } else {
            PacketAuth::Null
        };

        Ok(Transform { cipher, auth })
    }
}

struct StreamTemplate {
    ssrc: Ssrc,
    rtp: Transform,
    rtcp: Transform,
    window_size: u64,
}

/// Mutable per-SSRC stream state
struct Stream {
    template: usize,
    // Outbound
    roc: u32,
    last_seq: u16,
    seq_seen: bool,
    srtcp_index: u32,
    // Inbound
    rtp_window: ReplayWindow,
    srtcp_window: ReplayWindow,
}

impl Stream {
    fn new(template: usize, window_size: u64) -> Self {
        Stream {
            template,
            roc: 0,
            last_seq: 0,
            seq_seen: false,
            srtcp_index: 0,
            rtp_window: ReplayWindow::new(window_size),
            srtcp_window: ReplayWindow::new(window_size),
        }
    }

    /// Track the rollover counter of outgoing packets, tolerating some
    /// reordering around the wrap (RFC 3550 appendix A.1)
    fn update_outbound_roc(&mut self, seq: u16) {
        const MAX_DISORDER: u16 = 100;

        if !self.seq_seen {
            self.seq_seen = true;
        } else if seq < MAX_DISORDER && self.last_seq > u16::MAX - MAX_DISORDER {
            self.roc = self.roc.wrapping_add(1);
        } else if self.last_seq < MAX_DISORDER && seq > u16::MAX - MAX_DISORDER {
            self.roc = self.roc.wrapping_sub(1);
        }

        self.last_seq = seq;
    }
}

/// SRTP session
///
/// Holds the stream policies and the per-SSRC protection state. One session
/// must either be used only for protecting or only for unprotecting packets,
/// matching its policies' [`Ssrc`] direction.
pub struct SrtpSession {
    templates: Vec<StreamTemplate>,
    streams: HashMap<u32, Stream>,
}

impl SrtpSession {
    /// Create a new SRTP session with the given stream policies
    pub fn new(policies: Vec<SrtpPolicy<'_>>) -> Result<Self, SrtpError> {
        crate::init()?;

        let mut templates = Vec::with_capacity(policies.len());

        for policy in &policies {
            templates.push(StreamTemplate {
                ssrc: policy.ssrc,
                rtp: Transform::derive(&policy.rtp, &policy.key, false)?,
                rtcp: Transform::derive(&policy.rtcp, &policy.key, true)?,
                window_size: policy.window_size,
            });
        }

        Ok(SrtpSession {
            templates,
            streams: HashMap::new(),
        })
    }

    fn stream_for(&mut self, ssrc: u32, inbound: bool) -> Result<&mut Stream, SrtpError> {
        if !self.streams.contains_key(&ssrc) {
            let template = self
                .templates
                .iter()
                .position(|t| match t.ssrc {
                    Ssrc::Specific(s) => s == ssrc,
                    Ssrc::AnyInbound => inbound,
                    Ssrc::AnyOutbound => !inbound,
                })
                .ok_or(SrtpError::NoCtx)?;

            let window_size = self.templates[template].window_size;
            self.streams
                .insert(ssrc, Stream::new(template, window_size));
        }

        Ok(self.streams.get_mut(&ssrc).expect("stream inserted above"))
    }

    /// Protect an RTP packet into an SRTP packet, in place
    pub fn protect_rtp(&mut self, buf: &mut Vec<u8>) -> Result<(), SrtpError> {
        let header = RtpHeader::parse(buf)?;

        let (template, roc) = {
            let stream = self.stream_for(header.ssrc, false)?;
            stream.update_outbound_roc(header.seq);
            (stream.template, stream.roc)
        };
        let template = &self.templates[template];

        if template.rtp.cipher.is_aead() {
            let iv = template.rtp.cipher.rtp_iv(header.ssrc, roc, header.seq);
            let (aad, payload) = buf.split_at(header.len);
            let sealed = template.rtp.cipher.seal(&iv, payload, aad)?;
            buf.truncate(header.len);
            buf.extend_from_slice(&sealed);
            return Ok(());
        }

        template.rtp.cipher.apply_keystream(
            header.ssrc,
            roc,
            header.seq,
            &mut buf[header.len..],
        )?;

        let tag = template.rtp.auth.compute(buf, Some(roc));
        buf.extend_from_slice(&tag);

        Ok(())
    }

    /// Unprotect a received SRTP packet into an RTP packet, in place
    pub fn unprotect_rtp(&mut self, buf: &mut Vec<u8>) -> Result<(), SrtpError> {
        let header = RtpHeader::parse(buf)?;

        let (template, index) = {
            let stream = self.stream_for(header.ssrc, true)?;
            let index = estimate_index(stream.rtp_window.latest(), header.seq);

            stream.rtp_window.check(index).map_err(|e| match e {
                ReplayOutcome::TooOld => SrtpError::ReplayOld,
                ReplayOutcome::AlreadySeen => SrtpError::ReplayFail,
            })?;

            (stream.template, index)
        };

        let roc = (index >> 16) as u32;
        let template = &self.templates[template];

        if template.rtp.cipher.is_aead() {
            if buf.len() < header.len + GCM_TAG_LEN {
                return Err(SrtpError::AuthFail);
            }

            let iv = template.rtp.cipher.rtp_iv(header.ssrc, roc, header.seq);
            let (aad, sealed) = buf.split_at(header.len);
            let opened = template.rtp.cipher.open(&iv, sealed, aad)?;
            buf.truncate(header.len);
            buf.extend_from_slice(&opened);
        } else {
            let tag_len = template.rtp.auth.tag_len();

            if buf.len() < header.len + tag_len {
                return Err(SrtpError::AuthFail);
            }

            let (body, tag) = buf.split_at(buf.len() - tag_len);
            template.rtp.auth.verify(body, Some(roc), tag)?;

            buf.truncate(buf.len() - tag_len);
            template.rtp.cipher.apply_keystream(
                header.ssrc,
                roc,
                header.seq,
                &mut buf[header.len..],
            )?;
        }

        let stream = self.streams.get_mut(&header.ssrc).expect("stream exists");
        stream.rtp_window.commit(index);

        Ok(())
    }

    /// Protect an RTCP packet into an SRTCP packet, in place
    pub fn protect_rtcp(&mut self, buf: &mut Vec<u8>) -> Result<(), SrtpError> {
        let ssrc = rtcp_ssrc(buf)?;

        let (template, index) = {
            let stream = self.stream_for(ssrc, false)?;
            let index = stream.srtcp_index;
            stream.srtcp_index = (index + 1) & SRTCP_MAX_INDEX;
            (stream.template, index)
        };
        let template = &self.templates[template];

        if template.rtcp.cipher.is_aead() {
            let iv = template.rtcp.cipher.rtcp_iv(ssrc, index);
            let e_index = (index | 1 << 31).to_be_bytes();

            let mut aad = Vec::with_capacity(RTCP_HEADER_LEN + SRTCP_INDEX_SIZE);
            aad.extend_from_slice(&buf[..RTCP_HEADER_LEN]);
            aad.extend_from_slice(&e_index);

            let sealed = template
                .rtcp
                .cipher
                .seal(&iv, &buf[RTCP_HEADER_LEN..], &aad)?;
            buf.truncate(RTCP_HEADER_LEN);
            buf.extend_from_slice(&sealed);
            buf.extend_from_slice(&e_index);
            return Ok(());
        }

        let encrypt = !matches!(template.rtcp.cipher, PacketCipher::Null);

        if encrypt {
            let roc = index >> 16;
            let seq = (index & 0xFFFF) as u16;
            template
                .rtcp
                .cipher
                .apply_keystream(ssrc, roc, seq, &mut buf[RTCP_HEADER_LEN..])?;
        }

        let e_bit = if encrypt { 1u32 << 31 } else { 0 };
        buf.extend_from_slice(&(index | e_bit).to_be_bytes());

        let tag = template.rtcp.auth.compute(buf, None);
        buf.extend_from_slice(&tag);

        Ok(())
    }

    /// Unprotect a received SRTCP packet into an RTCP packet, in place
    pub fn unprotect_rtcp(&mut self, buf: &mut Vec<u8>) -> Result<(), SrtpError> {
        let ssrc = rtcp_ssrc(buf)?;

        let template = self.stream_for(ssrc, true)?.template;
        let template = &self.templates[template];

        let aead = template.rtcp.cipher.is_aead();
        let tag_len = if aead {
            GCM_TAG_LEN
        } else {
            template.rtcp.auth.tag_len()
        };

        // E-flag + index is the last word for AEAD, before the tag otherwise
        let trailer = tag_len + SRTCP_INDEX_SIZE;
        if buf.len() < RTCP_HEADER_LEN + trailer {
            return Err(SrtpError::AuthFail);
        }

        let index_offset = if aead {
            buf.len() - SRTCP_INDEX_SIZE
        } else {
            buf.len() - trailer
        };

        let word = u32::from_be_bytes(
            buf[index_offset..index_offset + SRTCP_INDEX_SIZE]
                .try_into()
                .expect("slice is 4 bytes"),
        );
        let encrypted = word & 1 << 31 != 0;
        let index = word & SRTCP_MAX_INDEX;

        self.streams
            .get_mut(&ssrc)
            .expect("stream exists")
            .srtcp_window
            .check(u64::from(index))
            .map_err(|e| match e {
                ReplayOutcome::TooOld => SrtpError::ReplayOld,
                ReplayOutcome::AlreadySeen => SrtpError::ReplayFail,
            })?;

        if aead {
            let iv = template.rtcp.cipher.rtcp_iv(ssrc, index);

            let mut aad = Vec::with_capacity(RTCP_HEADER_LEN + SRTCP_INDEX_SIZE);
            aad.extend_from_slice(&buf[..RTCP_HEADER_LEN]);
            aad.extend_from_slice(&word.to_be_bytes());

            if encrypted {
                let sealed = &buf[RTCP_HEADER_LEN..index_offset];
                let opened = template.rtcp.cipher.open(&iv, sealed, &aad)?;
                buf.truncate(RTCP_HEADER_LEN);
                buf.extend_from_slice(&opened);
            } else {
                // Authentication only, the tag covers the whole packet
                aad.truncate(0);
                aad.extend_from_slice(&buf[..index_offset - GCM_TAG_LEN]);
                aad.extend_from_slice(&word.to_be_bytes());

                let tag = &buf[index_offset - GCM_TAG_LEN..index_offset];
                template.rtcp.cipher.open(&iv, tag, &aad)?;
                buf.truncate(index_offset - GCM_TAG_LEN);
            }
        } else {
            let (body, tag) = buf.split_at(buf.len() - tag_len);
            template.rtcp.auth.verify(body, None, tag)?;

            buf.truncate(index_offset);

            if encrypted {
                let roc = index >> 16;
                let seq = (index & 0xFFFF) as u16;
                template
                    .rtcp
                    .cipher
                    .apply_keystream(ssrc, roc, seq, &mut buf[RTCP_HEADER_LEN..])?;
            }
        }

        let stream = self.streams.get_mut(&ssrc).expect("stream exists");
        stream.srtcp_window.commit(u64::from(index));

        Ok(())
    }
}

struct RtpHeader {
    len: usize,
    ssrc: u32,
    seq: u16,
}

impl RtpHeader {
    fn parse(buf: &[u8]) -> Result<Self, SrtpError> {
        if buf.len() < 12 || buf[0] >> 6 != 2 {
            return Err(SrtpError::BadParam);
        }

        let csrc_count = usize::from(buf[0] & 0x0F);
        let has_extension = buf[0] & 0x10 != 0;
        let seq = u16::from_be_bytes([buf[2], buf[3]]);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);

        let mut len = 12 + 4 * csrc_count;

        if has_extension {
            if buf.len() < len + 4 {
                return Err(SrtpError::ParseErr);
            }

            let words = usize::from(u16::from_be_bytes([buf[len + 2], buf[len + 3]]));
            len += 4 + 4 * words;
        }

        if buf.len() < len {
            return Err(SrtpError::ParseErr);
        }

        Ok(RtpHeader { len, ssrc, seq })
    }
}

fn rtcp_ssrc(buf: &[u8]) -> Result<u32, SrtpError> {
    if buf.len() < RTCP_HEADER_LEN || buf[0] >> 6 != 2 {
        return Err(SrtpError::BadParam);
    }

    Ok(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CryptoPolicy;

    fn test_key(len: usize) -> Vec<u8> {
        (0..len as u8).collect()
    }

    fn rtp_packet(ssrc: u32, seq: u16, payload: &[u8]) -> Vec<u8> {
        let mut pkt = vec![0x80, 96, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0];
        pkt[2..4].copy_from_slice(&seq.to_be_bytes());
        pkt[8..12].copy_from_slice(&ssrc.to_be_bytes());
        pkt.extend_from_slice(payload);
        pkt
    }

    fn rtcp_packet(ssrc: u32) -> Vec<u8> {
        let mut pkt = vec![0x80, 200, 0, 6, 0, 0, 0, 0];
        pkt[4..8].copy_from_slice(&ssrc.to_be_bytes());
        pkt.extend_from_slice(&[0xAB; 20]);
        pkt
    }

    fn session_pair(policy: CryptoPolicy, key: &[u8]) -> (SrtpSession, SrtpSession) {
        let outbound = SrtpSession::new(vec![
            SrtpPolicy::new(policy, policy, key.into(), Ssrc::AnyOutbound).unwrap(),
        ])
        .unwrap();
        let inbound = SrtpSession::new(vec![
            SrtpPolicy::new(policy, policy, key.into(), Ssrc::AnyInbound).unwrap(),
        ])
        .unwrap();
        (outbound, inbound)
    }

    fn round_trip(policy: CryptoPolicy, expected_overhead: usize) {
        let key = test_key(policy.key_len().max(policy.auth_key_len));
        let (mut outbound, mut inbound) = session_pair(policy, &key);

        let plain = rtp_packet(0xDECAFBAD, 1234, b"some payload bytes");

        let mut pkt = plain.clone();
        outbound.protect_rtp(&mut pkt).unwrap();
        assert_eq!(pkt.len(), plain.len() + expected_overhead);
        if expected_overhead > 0 {
            assert_ne!(pkt, plain);
        }

        inbound.unprotect_rtp(&mut pkt).unwrap();
        assert_eq!(pkt, plain);
    }

    #[test]
    fn rtp_round_trip_aes_cm_128() {
        round_trip(CryptoPolicy::aes_cm_128_hmac_sha1_80(), 10);
    }

    #[test]
    fn rtp_round_trip_aes_cm_256() {
        round_trip(CryptoPolicy::aes_cm_256_hmac_sha1_80(), 10);
    }

    #[test]
    fn rtp_round_trip_aes_cm_192_short_tag() {
        round_trip(CryptoPolicy::aes_cm_192_hmac_sha1_32(), 4);
    }

    #[test]
    fn rtp_round_trip_aes_gcm_128() {
        round_trip(CryptoPolicy::aes_gcm_128_16_auth(), 16);
    }

    #[test]
    fn rtp_round_trip_aes_gcm_256() {
        round_trip(CryptoPolicy::aes_gcm_256_16_auth(), 16);
    }

    #[test]
    fn rtp_round_trip_auth_only() {
        round_trip(CryptoPolicy::null_cipher_hmac_sha1_80(), 10);
    }

    #[test]
    fn rtp_round_trip_encrypt_only() {
        round_trip(CryptoPolicy::aes_cm_128_null_auth(), 0);
    }

    #[test]
    fn null_policy_is_identity() {
        round_trip(CryptoPolicy::null_cipher_hmac_null(), 0);
    }

    #[test]
    fn tampered_packet_fails_authentication() {
        let policy = CryptoPolicy::aes_cm_128_hmac_sha1_80();
        let key = test_key(policy.key_len());
        let (mut outbound, mut inbound) = session_pair(policy, &key);

        let mut pkt = rtp_packet(1, 700, b"payload");
        outbound.protect_rtp(&mut pkt).unwrap();

        let last = pkt.len() - 1;
        pkt[last] ^= 0xFF;

        assert_eq!(inbound.unprotect_rtp(&mut pkt), Err(SrtpError::AuthFail));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let policy = CryptoPolicy::aes_gcm_128_16_auth();
        let (mut outbound, _) = session_pair(policy, &test_key(policy.key_len()));
        let mut other_key = test_key(policy.key_len());
        other_key[0] ^= 0xFF;
        let (_, mut inbound) = session_pair(policy, &other_key);

        let mut pkt = rtp_packet(1, 700, b"payload");
        outbound.protect_rtp(&mut pkt).unwrap();

        assert_eq!(inbound.unprotect_rtp(&mut pkt), Err(SrtpError::AuthFail));
    }

    #[test]
    fn duplicate_packet_is_replay() {
        let policy = CryptoPolicy::aes_cm_128_hmac_sha1_80();
        let key = test_key(policy.key_len());
        let (mut outbound, mut inbound) = session_pair(policy, &key);

        let mut pkt = rtp_packet(7, 100, b"payload");
        outbound.protect_rtp(&mut pkt).unwrap();
        let protected = pkt.clone();

        inbound.unprotect_rtp(&mut pkt).unwrap();

        let mut replayed = protected;
        assert_eq!(
            inbound.unprotect_rtp(&mut replayed),
            Err(SrtpError::ReplayFail)
        );
    }

    #[test]
    fn stale_packet_is_replay_old() {
        let policy = CryptoPolicy::aes_cm_128_hmac_sha1_80();
        let key = test_key(policy.key_len());
        let (mut outbound, mut inbound) = session_pair(policy, &key);

        let mut stale = rtp_packet(7, 10, b"early");
        outbound.protect_rtp(&mut stale).unwrap();

        let mut pkt = rtp_packet(7, 1000, b"late");
        outbound.protect_rtp(&mut pkt).unwrap();
        inbound.unprotect_rtp(&mut pkt).unwrap();

        assert_eq!(inbound.unprotect_rtp(&mut stale), Err(SrtpError::ReplayOld));
    }

    #[test]
    fn roc_follows_sequence_wraparound() {
        let policy = CryptoPolicy::aes_cm_128_hmac_sha1_80();
        let key = test_key(policy.key_len());
        let (mut outbound, mut inbound) = session_pair(policy, &key);

        for seq in [65533u16, 65534, 65535, 0, 1, 2] {
            let plain = rtp_packet(99, seq, b"wrapping");
            let mut pkt = plain.clone();
            outbound.protect_rtp(&mut pkt).unwrap();
            inbound.unprotect_rtp(&mut pkt).unwrap();
            assert_eq!(pkt, plain, "seq {seq} did not survive the rollover");
        }

        assert_eq!(outbound.streams[&99].roc, 1);
    }

    #[test]
    fn rtcp_round_trip() {
        for policy in [
            CryptoPolicy::aes_cm_128_hmac_sha1_80(),
            CryptoPolicy::aes_gcm_128_16_auth(),
        ] {
            let key = test_key(policy.key_len());
            let (mut outbound, mut inbound) = session_pair(policy, &key);

            let plain = rtcp_packet(0xCAFE);

            let mut pkt = plain.clone();
            outbound.protect_rtcp(&mut pkt).unwrap();
            assert_ne!(pkt, plain);

            inbound.unprotect_rtcp(&mut pkt).unwrap();
            assert_eq!(pkt, plain);

            // Replaying the same SRTCP index must fail
            let mut pkt = plain.clone();
            outbound.protect_rtcp(&mut pkt).unwrap();
            let replay = pkt.clone();
            inbound.unprotect_rtcp(&mut pkt).unwrap();

            let mut replay = replay;
            assert_eq!(
                inbound.unprotect_rtcp(&mut replay),
                Err(SrtpError::ReplayFail)
            );
        }
    }

    #[test]
    fn unknown_ssrc_without_wildcard_is_rejected() {
        let policy = CryptoPolicy::aes_cm_128_hmac_sha1_80();
        let key = test_key(policy.key_len());

        let mut session = SrtpSession::new(vec![
            SrtpPolicy::new(policy, policy, key.as_slice().into(), Ssrc::Specific(1)).unwrap(),
        ])
        .unwrap();

        let mut pkt = rtp_packet(2, 1, b"payload");
        assert_eq!(session.protect_rtp(&mut pkt), Err(SrtpError::NoCtx));
    }

    #[test]
    fn short_key_is_rejected() {
        let policy = CryptoPolicy::aes_cm_128_hmac_sha1_80();
        let key = test_key(16);

        assert!(
            SrtpPolicy::new(policy, policy, key.as_slice().into(), Ssrc::AnyInbound).is_err()
        );
    }
}
