//! # SRTP media transport
//!
//! [`SrtpTransport`] wraps an existing [`MediaTransport`] and transparently
//! protects outgoing and unprotects incoming RTP & RTCP. Key negotiation is
//! delegated to the enabled keying methods (SDES and, if compiled in,
//! DTLS-SRTP); the first method to produce a complete policy pair wins the
//! negotiation and the others are closed.

use crate::{
    Error, SrtpInfo, SrtpSetting, SrtpUse,
    session::{PROBATION_CNT_INIT, SrtpCore},
    suite::{SrtpCryptoPolicy, suite_index, suites},
};
use self::keying::{Inspection, KeyingMethod, Negotiation};
use sdp_types::SessionDescription;
use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

pub(crate) mod keying;
pub(crate) mod packet_kind;

pub use self::keying::KeyingKind;

/// Callback invoked with every received (and unprotected) packet
pub type PacketCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Media flow direction, used by [`MediaTransport::simulate_lost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Recv,
    Both,
}

/// Parameters of [`MediaTransport::attach`]
#[derive(Clone)]
pub struct TransportAttachParam {
    pub rtp_cb: PacketCallback,
    pub rtcp_cb: PacketCallback,
    pub remote_rtp: SocketAddr,
    pub remote_rtcp: SocketAddr,
}

/// Contract of a media transport.
///
/// Implemented by the member transport wrapped by [`SrtpTransport`] and by
/// the wrapper itself, so transports can be stacked. A member transport must
/// not deliver packets synchronously from within `send_rtp`/`send_rtcp`.
pub trait MediaTransport: Send + Sync {
    /// Save the callbacks & remote addresses and start delivering packets
    fn attach(&self, param: TransportAttachParam) -> Result<(), Error>;

    /// Stop delivering packets and forget the attached callbacks
    fn detach(&self);

    fn send_rtp(&self, pkt: &[u8]) -> Result<(), Error>;

    fn send_rtcp(&self, pkt: &[u8]) -> Result<(), Error>;

    fn send_rtcp_to(&self, _addr: Option<SocketAddr>, pkt: &[u8]) -> Result<(), Error> {
        self.send_rtcp(pkt)
    }

    /// Begin a negotiation. `remote` is the remote offer, or `None` when
    /// this side is the offerer.
    fn media_create(
        &self,
        _remote: Option<&SessionDescription>,
        _media_index: usize,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Write this transport's attributes into the local SDP
    fn encode_sdp(
        &self,
        _local: &mut SessionDescription,
        _remote: Option<&SessionDescription>,
        _media_index: usize,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Conclude the negotiation with the final local & remote SDP
    fn media_start(
        &self,
        _local: &SessionDescription,
        _remote: &SessionDescription,
        _media_index: usize,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn media_stop(&self) -> Result<(), Error> {
        Ok(())
    }

    fn simulate_lost(&self, _dir: Direction, _pct_lost: u32) -> Result<(), Error> {
        Ok(())
    }

    /// Release the transport. Called at most once.
    fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}

struct KeyingState {
    methods: Vec<Box<dyn KeyingMethod>>,
    nego: Negotiation,
}

struct Inner {
    setting: SrtpSetting,
    member: Arc<dyn MediaTransport>,
    core: Mutex<SrtpCore>,
    keying: Mutex<KeyingState>,
    rtp_tx_buf: Mutex<Vec<u8>>,
    rtcp_tx_buf: Mutex<Vec<u8>>,
    member_attached: AtomicBool,
    closed: AtomicBool,
}

/// SRTP wrapper around a member [`MediaTransport`]
pub struct SrtpTransport {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SrtpTransport {
    /// Create an SRTP transport wrapping `member`.
    ///
    /// The settings are validated and copied: unknown suite names and short
    /// keys are rejected, keys are truncated to their suite's length and
    /// `mandatory` usage requires a non-empty crypto list.
    pub fn new(member: Arc<dyn MediaTransport>, setting: SrtpSetting) -> Result<Self, Error> {
        let mut setting = setting;

        if setting.usage == SrtpUse::Mandatory && setting.crypto.is_empty() {
            return Err(Error::SdpRequiresCrypto);
        }

        if setting.usage == SrtpUse::Disabled {
            setting.crypto.clear();
        } else {
            for crypto in &mut setting.crypto {
                let index = suite_index(&crypto.name).ok_or(Error::UnsupportedCryptoSuite)?;

                if !crypto.key.is_empty() && crypto.key.len() < suites()[index].key_len {
                    return Err(Error::InvalidKeyLength);
                }

                crypto.name = suites()[index].name.to_string();
                crypto.key.truncate(suites()[index].key_len);
            }
        }

        setting.keying.truncate(2);

        srtp::init()?;

        let mut methods: Vec<Box<dyn KeyingMethod>> = Vec::new();

        for kind in &setting.keying {
            match kind {
                KeyingKind::Sdes => methods.push(Box::new(keying::sdes::SdesKeying::new(
                    setting.usage,
                    setting.crypto.clone(),
                ))),
                KeyingKind::DtlsSrtp => {
                    #[cfg(feature = "dtls-srtp")]
                    methods.push(Box::new(keying::dtls::DtlsKeying::new(member.clone())?));

                    #[cfg(not(feature = "dtls-srtp"))]
                    {
                        if setting.keying.len() == 1 {
                            return Err(Error::DtlsNotSupported);
                        }

                        log::warn!("Skipping DTLS-SRTP keying, it is not compiled in");
                    }
                }
            }
        }

        let peer_use = setting.usage;

        Ok(SrtpTransport {
            inner: Arc::new(Inner {
                setting,
                member,
                core: Mutex::new(SrtpCore::new()),
                keying: Mutex::new(KeyingState {
                    methods,
                    nego: Negotiation::new(peer_use),
                }),
                rtp_tx_buf: Mutex::new(Vec::new()),
                rtcp_tx_buf: Mutex::new(Vec::new()),
                member_attached: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// The wrapped member transport
    pub fn member(&self) -> &Arc<dyn MediaTransport> {
        &self.inner.member
    }

    /// Manually start the SRTP session with the given transmit & receive
    /// policies, outside of any SDP negotiation
    pub fn start(&self, tx: &SrtpCryptoPolicy, rx: &SrtpCryptoPolicy) -> Result<(), Error> {
        lock(&self.inner.core).start(tx, rx)
    }

    /// Stop the SRTP session. A no-op when it is not running.
    pub fn stop(&self) {
        lock(&self.inner.core).stop()
    }

    /// Snapshot of the transport's SRTP state
    pub fn get_info(&self) -> SrtpInfo {
        // Lock order is always negotiation state first, then session state
        let keying = lock(&self.inner.keying);
        let core = lock(&self.inner.core);

        SrtpInfo {
            active: core.session_inited,
            tx_policy: core.tx_policy.clone(),
            rx_policy: core.rx_policy.clone(),
            usage: self.inner.setting.usage,
            peer_usage: keying.nego.peer_use,
        }
    }

    /// Number of keying methods still part of the current negotiation
    pub fn keying_count(&self) -> usize {
        lock(&self.inner.keying).methods.len()
    }

    /// Decrypt an opaque captured packet with the session's receive context
    pub fn decrypt_pkt(&self, is_rtp: bool, pkt: &mut Vec<u8>) -> Result<(), Error> {
        lock(&self.inner.core).decrypt(is_rtp, pkt)
    }

    /// Request a DTLS role for the next negotiation
    #[cfg(feature = "dtls-srtp")]
    pub fn set_dtls_setup(&self, setup: sdp_types::Setup) -> Result<(), Error> {
        let mut keying = lock(&self.inner.keying);

        let dtls = keying
            .methods
            .iter_mut()
            .find_map(|m| m.as_dtls())
            .ok_or(Error::DtlsNotSupported)?;

        dtls.set_setup(setup);
        Ok(())
    }

    /// Fingerprint of the local DTLS certificate
    #[cfg(feature = "dtls-srtp")]
    pub fn dtls_fingerprint(&self) -> Result<sdp_types::Fingerprint, Error> {
        let mut keying = lock(&self.inner.keying);

        let dtls = keying
            .methods
            .iter_mut()
            .find_map(|m| m.as_dtls())
            .ok_or(Error::DtlsNotSupported)?;

        dtls.fingerprint()
    }
}

impl MediaTransport for SrtpTransport {
    fn attach(&self, param: TransportAttachParam) -> Result<(), Error> {
        let inner = &self.inner;

        {
            let mut core = lock(&inner.core);
            core.rtp_cb = Some(param.rtp_cb.clone());
            core.rtcp_cb = Some(param.rtcp_cb.clone());
        }

        let rtp_weak: Weak<Inner> = Arc::downgrade(inner);
        let rtcp_weak: Weak<Inner> = Arc::downgrade(inner);

        let member_param = TransportAttachParam {
            rtp_cb: Arc::new(move |pkt| {
                if let Some(inner) = rtp_weak.upgrade() {
                    inner.recv_rtp(pkt);
                }
            }),
            rtcp_cb: Arc::new(move |pkt| {
                if let Some(inner) = rtcp_weak.upgrade() {
                    inner.recv_rtcp(pkt);
                }
            }),
            remote_rtp: param.remote_rtp,
            remote_rtcp: param.remote_rtcp,
        };

        if let Err(e) = inner.member.attach(member_param) {
            let mut core = lock(&inner.core);
            core.rtp_cb = None;
            core.rtcp_cb = None;
            return Err(e);
        }

        inner.member_attached.store(true, Ordering::Release);
        Ok(())
    }

    fn detach(&self) {
        if self.inner.member_attached.swap(false, Ordering::AcqRel) {
            self.inner.member.detach();
        }

        let mut core = lock(&self.inner.core);
        core.rtp_cb = None;
        core.rtcp_cb = None;
    }

    fn send_rtp(&self, pkt: &[u8]) -> Result<(), Error> {
        self.inner.send_rtp(pkt)
    }

    fn send_rtcp(&self, pkt: &[u8]) -> Result<(), Error> {
        self.inner.send_rtcp_to(None, pkt)
    }

    fn send_rtcp_to(&self, addr: Option<SocketAddr>, pkt: &[u8]) -> Result<(), Error> {
        self.inner.send_rtcp_to(addr, pkt)
    }

    fn media_create(
        &self,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error> {
        self.inner.media_create(remote, media_index)
    }

    fn encode_sdp(
        &self,
        local: &mut SessionDescription,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error> {
        self.inner.encode_sdp(local, remote, media_index)
    }

    fn media_start(
        &self,
        local: &SessionDescription,
        remote: &SessionDescription,
        media_index: usize,
    ) -> Result<(), Error> {
        self.inner.media_start(local, remote, media_index)
    }

    fn media_stop(&self) -> Result<(), Error> {
        self.inner.media_stop()
    }

    fn simulate_lost(&self, dir: Direction, pct_lost: u32) -> Result<(), Error> {
        self.inner.member.simulate_lost(dir, pct_lost)
    }

    fn close(&self) -> Result<(), Error> {
        self.inner.close()
    }
}

impl Drop for SrtpTransport {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            log::warn!("Failed to close SRTP transport: {e}");
        }
    }
}

impl Inner {
    fn send_rtp(&self, pkt: &[u8]) -> Result<(), Error> {
        if lock(&self.core).bypass {
            return self.member.send_rtp(pkt);
        }

        if pkt.len() > self.setting.mtu.saturating_sub(10) {
            return Err(Error::PacketTooBig);
        }

        let mut buf = lock(&self.rtp_tx_buf);
        buf.clear();
        buf.extend_from_slice(pkt);

        lock(&self.core).protect_rtp(&mut buf)?;

        self.member.send_rtp(&buf)
    }

    fn send_rtcp_to(&self, addr: Option<SocketAddr>, pkt: &[u8]) -> Result<(), Error> {
        if lock(&self.core).bypass {
            return self.member.send_rtcp_to(addr, pkt);
        }

        if pkt.len() > self.setting.mtu.saturating_sub(10) {
            return Err(Error::PacketTooBig);
        }

        let mut buf = lock(&self.rtcp_tx_buf);
        buf.clear();
        buf.extend_from_slice(pkt);

        lock(&self.core).protect_rtcp(&mut buf)?;

        self.member.send_rtcp_to(addr, &buf)
    }

    /// Receive path of the RTP channel.
    ///
    /// The channel also carries the in-band keying traffic (DTLS records),
    /// so every registered keying method gets a chance to claim the packet
    /// before it is treated as SRTP.
    fn recv_rtp(&self, pkt: &[u8]) {
        {
            let core = lock(&self.core);
            if core.bypass {
                let cb = core.rtp_cb.clone();
                drop(core);

                if let Some(cb) = cb {
                    cb(pkt);
                }
                return;
            }
        }

        let mut completed = false;

        {
            let mut state = lock(&self.keying);
            let state = &mut *state;

            let mut i = 0;
            while i < state.methods.len() {
                match state.methods[i].inspect_inbound(pkt) {
                    Inspection::Ignored => i += 1,
                    Inspection::Consumed => return,
                    Inspection::Completed { tx, rx } => {
                        state.nego.tx_policy_neg = tx;
                        state.nego.rx_policy_neg = rx;
                        state.nego.pending_cnt = 0;

                        let winner = state.methods.swap_remove(i);
                        for mut method in state.methods.drain(..) {
                            method.close();
                        }
                        state.methods.push(winner);

                        completed = true;
                        break;
                    }
                    Inspection::Failed(e) => {
                        log::warn!("Keying method failed on an inbound packet: {e}");
                        let mut method = state.methods.remove(i);
                        method.close();
                        return;
                    }
                }
            }
        }

        if completed {
            if let Err(e) = self.start_srtp() {
                log::warn!("Failed to start SRTP session after keying completed: {e}");
            }
            return;
        }

        let mut data = pkt.to_vec();

        let cb = {
            let mut core = lock(&self.core);

            if core.probation > 0 {
                core.probation -= 1;
            }

            match core.unprotect_rtp(&mut data) {
                Ok(()) => core.rtp_cb.clone(),
                Err(Error::InvalidOperation) => None,
                Err(e) => {
                    log::debug!("Failed to unprotect SRTP, pkt size={}: {e}", pkt.len());
                    None
                }
            }
        };

        // The callback runs outside the lock so it may re-enter the transport
        if let Some(cb) = cb {
            cb(&data);
        }
    }

    fn recv_rtcp(&self, pkt: &[u8]) {
        {
            let core = lock(&self.core);
            if core.bypass {
                let cb = core.rtcp_cb.clone();
                drop(core);

                if let Some(cb) = cb {
                    cb(pkt);
                }
                return;
            }
        }

        let mut data = pkt.to_vec();

        let cb = {
            let mut core = lock(&self.core);

            match core.unprotect_rtcp(&mut data) {
                Ok(()) => core.rtcp_cb.clone(),
                Err(Error::InvalidOperation) => None,
                Err(e) => {
                    log::debug!("Failed to unprotect SRTCP, pkt size={}: {e}", pkt.len());
                    None
                }
            }
        };

        if let Some(cb) = cb {
            cb(&data);
        }
    }

    fn media_create(&self, remote: Option<&SessionDescription>, media_index: usize) -> Result<(), Error> {
        {
            let mut state = lock(&self.keying);
            state.nego.clear_policies();
            state.nego.offerer_side = remote.is_none();
        }

        if remote.is_none() && self.setting.usage == SrtpUse::Disabled {
            lock(&self.core).bypass = true;
        }

        self.member.media_create(remote, media_index)?;

        if lock(&self.core).bypass {
            return Ok(());
        }

        let mut state = lock(&self.keying);
        let state = &mut *state;
        let mut last_err = Error::Bug;

        let mut i = 0;
        while i < state.methods.len() {
            match state.methods[i].media_create(&mut state.nego, remote, media_index) {
                Err(e) => {
                    let mut method = state.methods.remove(i);
                    method.close();
                    last_err = e;
                }
                Ok(()) if state.nego.offerer_side => {
                    // An outgoing offer carries a single keying method
                    let keep = state.methods.swap_remove(i);
                    for mut method in state.methods.drain(..) {
                        method.close();
                    }
                    state.methods.push(keep);
                    return Ok(());
                }
                Ok(()) => i += 1,
            }
        }

        if state.methods.is_empty() {
            return Err(last_err);
        }

        Ok(())
    }

    fn encode_sdp(
        &self,
        local: &mut SessionDescription,
        remote: Option<&SessionDescription>,
        media_index: usize,
    ) -> Result<(), Error> {
        {
            let mut state = lock(&self.keying);
            state.nego.clear_policies();
            state.nego.offerer_side = remote.is_none();
        }

        self.member.encode_sdp(local, remote, media_index)?;

        if lock(&self.core).bypass {
            return Ok(());
        }

        let mut state = lock(&self.keying);
        let state = &mut *state;
        let mut last_err = Error::Bug;

        let mut i = 0;
        while i < state.methods.len() {
            match state.methods[i].encode_sdp(&mut state.nego, local, remote, media_index) {
                Err(e) => {
                    let mut method = state.methods.remove(i);
                    method.close();
                    last_err = e;
                    continue;
                }
                Ok(()) => {}
            }

            if state.nego.is_complete() {
                keep_single_winner(state, i);
                break;
            }

            i += 1;
        }

        if state.methods.is_empty() {
            return Err(last_err);
        }

        Ok(())
    }

    fn media_start(
        &self,
        local: &SessionDescription,
        remote: &SessionDescription,
        media_index: usize,
    ) -> Result<(), Error> {
        self.member.media_start(local, remote, media_index)?;

        if lock(&self.core).bypass {
            return Ok(());
        }

        let pending = {
            let mut state = lock(&self.keying);
            let state = &mut *state;

            // Track the peer's observed SRTP usage for later re-negotiations
            if let Some(remote_media) = remote.media_descriptions.get(media_index) {
                let offers_keys = !remote_media.crypto.is_empty()
                    || !remote_media.fingerprint.is_empty()
                    || !remote.fingerprint.is_empty();

                state.nego.peer_use = if remote_media.media.proto.is_secure() {
                    SrtpUse::Mandatory
                } else if offers_keys {
                    SrtpUse::Optional
                } else {
                    SrtpUse::Disabled
                };
            }

            let mut last_err = Error::Bug;

            let mut i = 0;
            while i < state.methods.len() {
                match state.methods[i].media_start(&mut state.nego, local, remote, media_index) {
                    Err(e) => {
                        let mut method = state.methods.remove(i);
                        method.close();
                        last_err = e;
                        continue;
                    }
                    Ok(()) => {}
                }

                if state.nego.is_complete() {
                    keep_single_winner(state, i);
                    break;
                }

                i += 1;
            }

            if state.methods.is_empty() {
                return Err(last_err);
            }

            state.nego.pending_cnt
        };

        // An asynchronous keying method (DTLS) concludes the start later
        if pending > 0 {
            return Ok(());
        }

        self.start_srtp()
    }

    /// Install the negotiated policies. Empty slots turn the transport into
    /// a plain pass-through; a changed policy pair restarts the session.
    fn start_srtp(&self) -> Result<(), Error> {
        let mut keying = lock(&self.keying);
        let mut core = lock(&self.core);

        if !keying.nego.is_complete() {
            core.bypass = true;
            keying.nego.peer_use = SrtpUse::Disabled;
            core.stop();
            return Ok(());
        }

        core.probation = PROBATION_CNT_INIT;

        if keying.nego.tx_policy_neg != core.tx_policy
            || keying.nego.rx_policy_neg != core.rx_policy
        {
            let tx = keying.nego.tx_policy_neg.clone();
            let rx = keying.nego.rx_policy_neg.clone();
            core.start(&tx, &rx)?;
        }

        core.bypass = false;

        Ok(())
    }

    fn media_stop(&self) -> Result<(), Error> {
        {
            let mut state = lock(&self.keying);
            for method in &mut state.methods {
                method.media_stop();
            }
        }

        if let Err(e) = self.member.media_stop() {
            log::warn!("SRTP failed to stop the member media transport: {e}");
        }

        lock(&self.core).stop();

        Ok(())
    }

    fn close(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        {
            let mut state = lock(&self.keying);
            for mut method in state.methods.drain(..) {
                method.close();
            }
        }

        if self.setting.close_member_tp {
            if let Err(e) = self.member.close() {
                log::warn!("Failed to close the member transport: {e}");
            }
        }

        // Clearing the callbacks under the session mutex serializes with any
        // in-flight delivery; after this no callback is invoked again.
        let mut core = lock(&self.core);
        core.stop();
        core.rtp_cb = None;
        core.rtcp_cb = None;

        Ok(())
    }
}

/// Close every keying method except the winner at `index`
fn keep_single_winner(state: &mut KeyingState, index: usize) {
    let winner = state.methods.swap_remove(index);

    for mut method in state.methods.drain(..) {
        method.close();
    }

    state.methods.push(winner);
    state.nego.pending_cnt = 0;
}
