//! DTLS-SRTP keying (RFC 5763/5764)
//!
//! The handshake runs in-band on the RTP channel: inbound datagrams whose
//! first byte classifies as DTLS are consumed from the receive path and fed
//! into an OpenSSL [`SslStream`] over an in-memory queue, outgoing handshake
//! records are flushed through the member transport. On completion the SRTP
//! master keys are extracted with the RFC 5764 keying material exporter.

use super::{Inspection, KeyingKind, KeyingMethod, Negotiation};
use crate::{
    Error,
    ssl::{OpenSslContext, profile_to_suite},
    suite::{SrtpCryptoPolicy, suite_index, suites},
    transport::{MediaTransport, packet_kind::PacketKind},
};
use openssl::{
    hash::MessageDigest,
    ssl::{ErrorCode, Ssl, SslStream, SslVerifyMode},
};
use sdp_types::{Fingerprint, FingerprintAlgorithm, SessionDescription, Setup};
use std::{
    collections::VecDeque,
    io::{self, Cursor, Read, Write},
    sync::Arc,
};

const DTLS_MTU: usize = 1200;

/// Which end of the DTLS handshake this transport takes
#[derive(Debug, Clone, Copy)]
pub(crate) enum DtlsSetup {
    Accept,
    Connect,
}

enum DtlsState {
    Idle,
    Handshaking(Box<Handshake>),
    Done,
    Failed,
}

struct Handshake {
    stream: SslStream<IoQueue>,
    setup: DtlsSetup,
}

pub(crate) struct DtlsKeying {
    member: Arc<dyn MediaTransport>,
    ctx: OpenSslContext,
    /// Role requested by the application before negotiation
    preferred_setup: Option<Setup>,
    /// Role fixed while producing the answer
    negotiated_setup: Option<DtlsSetup>,
    state: DtlsState,
}

impl DtlsKeying {
    pub(crate) fn new(member: Arc<dyn MediaTransport>) -> Result<Self, Error> {
        Ok(DtlsKeying {
            member,
            ctx: OpenSslContext::try_new()?,
            preferred_setup: None,
            negotiated_setup: None,
            state: DtlsState::Idle,
        })
    }

    /// Request a directional role for the next negotiation
    pub(crate) fn set_setup(&mut self, setup: Setup) {
        self.preferred_setup = Some(setup);
    }

    /// Fingerprint of the local certificate, as carried in `a=fingerprint`
    pub(crate) fn fingerprint(&self) -> Result<Fingerprint, Error> {
        Ok(Fingerprint {
            algorithm: FingerprintAlgorithm::SHA256,
            fingerprint: self.ctx.fingerprint()?,
        })
    }

    /// Role to answer with, given the remote offer's setup attribute
    fn answer_setup(&self, remote_setup: Option<Setup>) -> Result<DtlsSetup, Error> {
        match remote_setup {
            Some(Setup::Active) => Ok(DtlsSetup::Accept),
            Some(Setup::Passive) => Ok(DtlsSetup::Connect),
            // Accepting by default gives both sides the fingerprint before
            // any handshake flight is sent
            Some(Setup::ActPass) | None => match self.preferred_setup {
                Some(Setup::Active) => Ok(DtlsSetup::Connect),
                _ => Ok(DtlsSetup::Accept),
            },
            Some(Setup::HoldConn) => Err(Error::InvalidSetupAttribute),
        }
    }

    fn flush_to_member(&mut self) {
        let DtlsState::Handshaking(handshake) = &mut self.state else {
            return;
        };

        while let Some(data) = handshake.stream.get_mut().out.pop_front() {
            if let Err(e) = self.member.send_rtp(&data) {
                log::warn!("Failed to send DTLS handshake data: {e}");
            }
        }
    }

    /// Drive the handshake forward; `Ok(true)` once it completed
    fn drive(&mut self) -> Result<bool, Error> {
        let DtlsState::Handshaking(handshake) = &mut self.state else {
            return Ok(false);
        };

        let result = match handshake.setup {
            DtlsSetup::Accept => handshake.stream.accept(),
            DtlsSetup::Connect => handshake.stream.connect(),
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.code() == ErrorCode::WANT_READ => Ok(false),
            Err(e) => {
                self.state = DtlsState::Failed;
                Err(Error::DtlsHandshake(e))
            }
        }
    }

    /// Extract the negotiated SRTP policies from the completed handshake.
    ///
    /// The exporter yields client & server key halves followed by the salt
    /// halves; rotating the middle section pairs each key with its salt
    /// (RFC 5764 section 4.2).
    fn derive_policies(&self) -> Result<(SrtpCryptoPolicy, SrtpCryptoPolicy), Error> {
        let DtlsState::Handshaking(handshake) = &self.state else {
            return Err(Error::Bug);
        };

        let ssl = handshake.stream.ssl();

        let profile = ssl
            .selected_srtp_profile()
            .ok_or(Error::MissingSrtpProfile)?;

        let suite_name = profile_to_suite(profile.name()).ok_or(Error::MissingSrtpProfile)?;
        let index = suite_index(suite_name).ok_or(Error::UnsupportedCryptoSuite)?;
        let suite = &suites()[index];

        let master_len = suite.key_len;
        let base_len = master_len - suite.salt_len;

        let mut material = vec![0u8; 2 * master_len];
        ssl.export_keying_material(&mut material, "EXTRACTOR-dtls_srtp", None)
            .map_err(Error::ExportKeyingMaterial)?;

        material[base_len..base_len + master_len].rotate_left(base_len);

        let client_key = &material[..master_len];
        let server_key = &material[master_len..2 * master_len];

        let (tx_key, rx_key) = match handshake.setup {
            DtlsSetup::Accept => (server_key, client_key),
            DtlsSetup::Connect => (client_key, server_key),
        };

        Ok((
            SrtpCryptoPolicy::new(suite.name, tx_key.to_vec()),
            SrtpCryptoPolicy::new(suite.name, rx_key.to_vec()),
        ))
    }
}

impl KeyingMethod for DtlsKeying {
    fn kind(&self) -> KeyingKind {
        KeyingKind::DtlsSrtp
    }

    fn media_create(
        &mut self,
        _nego: &mut Negotiation,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error> {
        self.state = DtlsState::Idle;
        self.negotiated_setup = None;

        let Some(remote) = remote else {
            return Ok(());
        };

        let remote_media = remote
            .media_descriptions
            .get(media_index)
            .ok_or(Error::Bug)?;

        if remote.fingerprint.is_empty() && remote_media.fingerprint.is_empty() {
            return Err(Error::MissingRemoteFingerprint);
        }

        Ok(())
    }

    fn encode_sdp(
        &mut self,
        _nego: &mut Negotiation,
        local: &mut SessionDescription,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error> {
        let fingerprint = self.fingerprint()?;

        let setup = match remote {
            None => match self.preferred_setup {
                Some(Setup::Active) => Setup::Active,
                Some(Setup::Passive) => Setup::Passive,
                _ => Setup::ActPass,
            },
            Some(remote) => {
                let remote_media = remote
                    .media_descriptions
                    .get(media_index)
                    .ok_or(Error::Bug)?;

                let setup = self.answer_setup(remote_media.setup.or(remote.setup))?;
                self.negotiated_setup = Some(setup);

                match setup {
                    DtlsSetup::Accept => Setup::Passive,
                    DtlsSetup::Connect => Setup::Active,
                }
            }
        };

        let local_media = local
            .media_descriptions
            .get_mut(media_index)
            .ok_or(Error::Bug)?;

        local_media.setup = Some(setup);

        if !local_media
            .fingerprint
            .iter()
            .any(|f| *f == fingerprint)
        {
            local_media.fingerprint.push(fingerprint);
        }

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

        let fingerprints: Vec<(MessageDigest, Vec<u8>)> = remote
            .fingerprint
            .iter()
            .chain(remote_media.fingerprint.iter())
            .filter_map(|f| Some((to_openssl_digest(&f.algorithm)?, f.fingerprint.clone())))
            .collect();

        if fingerprints.is_empty() {
            return Err(Error::MissingRemoteFingerprint);
        }

        let setup = if nego.offerer_side {
            // The answer must have picked a side
            match remote_media.setup.or(remote.setup) {
                Some(Setup::Active) => DtlsSetup::Accept,
                Some(Setup::Passive) => DtlsSetup::Connect,
                Some(Setup::ActPass | Setup::HoldConn) | None => {
                    return Err(Error::InvalidSetupAttribute);
                }
            }
        } else {
            match self.negotiated_setup {
                Some(setup) => setup,
                None => self.answer_setup(remote_media.setup.or(remote.setup))?,
            }
        };

        let mut ssl = Ssl::new(&self.ctx.ctx)?;

        ssl.set_mtu(DTLS_MTU as u32)?;

        // Test the peer certificate against the fingerprints from the SDP
        ssl.set_verify_callback(
            SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT,
            move |_preverify_ok, x509_store| {
                let Some(certificate) = x509_store.current_cert() else {
                    return false;
                };

                for (digest, fingerprint) in &fingerprints {
                    let Ok(peer_fingerprint) = certificate.digest(*digest) else {
                        continue;
                    };

                    if peer_fingerprint.as_ref() == fingerprint.as_slice() {
                        return true;
                    }
                }

                false
            },
        );

        let stream = SslStream::new(
            ssl,
            IoQueue {
                to_read: None,
                out: VecDeque::new(),
            },
        )?;

        self.state = DtlsState::Handshaking(Box::new(Handshake { stream, setup }));

        // The connecting side opens with its first flight right away
        if let Err(e) = self.drive() {
            return Err(e);
        }
        self.flush_to_member();

        nego.pending_cnt += 1;

        Ok(())
    }

    fn media_stop(&mut self) {
        self.state = DtlsState::Idle;
        self.negotiated_setup = None;
    }

    fn inspect_inbound(&mut self, pkt: &[u8]) -> Inspection {
        if !matches!(PacketKind::identify(pkt), PacketKind::Dtls) {
            return Inspection::Ignored;
        }

        let DtlsState::Handshaking(handshake) = &mut self.state else {
            log::trace!("Dropping DTLS packet outside of a running handshake");
            return Inspection::Consumed;
        };

        let queue = handshake.stream.get_mut();
        if queue.to_read.is_some() {
            log::warn!("Previous DTLS packet was not consumed by the handshake");
        }
        queue.to_read = Some(Cursor::new(pkt.to_vec()));

        let completed = match self.drive() {
            Ok(completed) => completed,
            Err(e) => return Inspection::Failed(e),
        };

        self.flush_to_member();

        if !completed {
            return Inspection::Consumed;
        }

        match self.derive_policies() {
            Ok((tx, rx)) => {
                self.state = DtlsState::Done;
                Inspection::Completed { tx, rx }
            }
            Err(e) => {
                self.state = DtlsState::Failed;
                Inspection::Failed(e)
            }
        }
    }

    fn close(&mut self) {
        self.state = DtlsState::Idle;
    }

    fn as_dtls(&mut self) -> Option<&mut DtlsKeying> {
        Some(self)
    }
}

fn to_openssl_digest(algo: &FingerprintAlgorithm) -> Option<MessageDigest> {
    match algo {
        FingerprintAlgorithm::SHA1 => Some(MessageDigest::sha1()),
        FingerprintAlgorithm::SHA224 => Some(MessageDigest::sha224()),
        FingerprintAlgorithm::SHA256 => Some(MessageDigest::sha256()),
        FingerprintAlgorithm::SHA384 => Some(MessageDigest::sha384()),
        FingerprintAlgorithm::SHA512 => Some(MessageDigest::sha512()),
        FingerprintAlgorithm::MD5 => Some(MessageDigest::md5()),
        FingerprintAlgorithm::MD2 | FingerprintAlgorithm::Other(..) => None,
    }
}

/// In-memory datagram queue the [`SslStream`] reads from & writes to
struct IoQueue {
    to_read: Option<Cursor<Vec<u8>>>,
    out: VecDeque<Vec<u8>>,
}

impl Read for IoQueue {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(to_read) = &mut self.to_read else {
            return Err(io::ErrorKind::WouldBlock.into());
        };

        let result = to_read.read(buf)?;

        let position = usize::try_from(to_read.position()).expect("position must fit into usize");

        if position == to_read.get_ref().len() {
            self.to_read = None;
        }

        Ok(result)
    }
}

impl Write for IoQueue {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.push_back(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
