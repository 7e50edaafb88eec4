//! SRTP session state: the per-direction protection contexts and the
//! replay-probation recovery protocol.
//!
//! All methods are called with the owning transport's session mutex held.

use crate::{
    Error, PacketCallback,
    suite::{SrtpCryptoPolicy, suites},
};
use srtp::{CryptoPolicy, SecurityServices, SrtpError, SrtpPolicy, SrtpSession, Ssrc};

/// Initial value of the probation counter. While the counter is positive a
/// replay-looking unprotect failure restarts the receive context once, which
/// recovers streams whose sender re-initialized its RTP sequence number
/// after a re-negotiation.
pub(crate) const PROBATION_CNT_INIT: u32 = 100;

pub(crate) struct SrtpCore {
    pub(crate) session_inited: bool,
    pub(crate) bypass: bool,
    pub(crate) probation: u32,

    pub(crate) tx_policy: SrtpCryptoPolicy,
    pub(crate) rx_policy: SrtpCryptoPolicy,

    tx_ctx: Option<SrtpSession>,
    rx_ctx: Option<SrtpSession>,

    pub(crate) rtp_cb: Option<PacketCallback>,
    pub(crate) rtcp_cb: Option<PacketCallback>,
}

impl SrtpCore {
    pub(crate) fn new() -> Self {
        SrtpCore {
            session_inited: false,
            bypass: false,
            probation: PROBATION_CNT_INIT,
            tx_policy: SrtpCryptoPolicy::default(),
            rx_policy: SrtpCryptoPolicy::default(),
            tx_ctx: None,
            rx_ctx: None,
            rtp_cb: None,
            rtcp_cb: None,
        }
    }

    /// Initialize and start the SRTP session with the given policies.
    ///
    /// Both policies resolving to the `NULL` suite without flags switches the
    /// session to bypass without creating any contexts. The transmit context
    /// is created first; a receive context failure tears it down again.
    pub(crate) fn start(
        &mut self,
        tx: &SrtpCryptoPolicy,
        rx: &SrtpCryptoPolicy,
    ) -> Result<(), Error> {
        if self.session_inited {
            self.stop();
        }

        let tx_suite = tx.validate()?;
        let rx_suite = rx.validate()?;

        // A set flag redirects the respective part to the NULL suite
        let (cr_tx, au_tx) = apply_flags(tx_suite, tx);
        let (cr_rx, au_rx) = apply_flags(rx_suite, rx);

        if cr_tx == 0 && au_tx == 0 && cr_rx == 0 && au_rx == 0 {
            self.bypass = true;
            return Ok(());
        }

        if tx.key.len() != suites()[tx_suite].key_len
            || rx.key.len() != suites()[rx_suite].key_len
        {
            return Err(Error::InvalidKeyLength);
        }

        let tx_ctx = create_context(cr_tx, au_tx, &tx.key, Ssrc::AnyOutbound)?;

        // Drops the fresh transmit context again when this fails
        let rx_ctx = create_context(cr_rx, au_rx, &rx.key, Ssrc::AnyInbound)?;

        self.tx_ctx = Some(tx_ctx);
        self.rx_ctx = Some(rx_ctx);

        self.tx_policy = normalized(tx, tx_suite);
        self.rx_policy = normalized(rx, rx_suite);

        self.session_inited = true;
        self.probation = PROBATION_CNT_INIT;

        log::debug!(
            "SRTP started, tx: {}, rx: {}",
            self.tx_policy.name,
            self.rx_policy.name
        );

        Ok(())
    }

    /// Stop the SRTP session. A no-op when it is not running; never fails.
    pub(crate) fn stop(&mut self) {
        if !self.session_inited {
            return;
        }

        // Receive context released first, then transmit
        self.rx_ctx = None;
        self.tx_ctx = None;

        self.tx_policy.clear();
        self.rx_policy.clear();
        self.session_inited = false;
    }

    pub(crate) fn protect_rtp(&mut self, buf: &mut Vec<u8>) -> Result<(), Error> {
        if !self.session_inited {
            return Err(Error::InvalidOperation);
        }

        let ctx = self.tx_ctx.as_mut().expect("inited session has contexts");
        ctx.protect_rtp(buf).map_err(Error::Srtp)
    }

    pub(crate) fn protect_rtcp(&mut self, buf: &mut Vec<u8>) -> Result<(), Error> {
        if !self.session_inited {
            return Err(Error::InvalidOperation);
        }

        let ctx = self.tx_ctx.as_mut().expect("inited session has contexts");
        ctx.protect_rtcp(buf).map_err(Error::Srtp)
    }

    /// Unprotect a received SRTP packet, running the probation recovery
    /// protocol on replay-looking failures.
    ///
    /// After a re-negotiation the sender's sequence numbers may restart
    /// while stale packets are still in flight, so the receive context
    /// learns a wrong locus and flags the fresh packets as replayed.
    /// While the probation counter is positive such a failure rebuilds
    /// both contexts from the installed policies and retries once.
    pub(crate) fn unprotect_rtp(&mut self, buf: &mut Vec<u8>) -> Result<(), Error> {
        if !self.session_inited {
            return Err(Error::InvalidOperation);
        }

        let ctx = self.rx_ctx.as_mut().expect("inited session has contexts");
        let result = ctx.unprotect_rtp(buf);

        let Err(err @ (SrtpError::ReplayOld | SrtpError::ReplayFail)) = result else {
            return result.map_err(Error::Srtp);
        };

        if self.probation == 0 {
            return Err(Error::Srtp(err));
        }

        let tx = self.tx_policy.clone();
        let rx = self.rx_policy.clone();

        if let Err(restart_err) = self.start(&tx, &rx) {
            log::debug!("Failed to restart SRTP session: {restart_err}");
            return Err(Error::Srtp(err));
        }

        if self.bypass {
            return Ok(());
        }

        let ctx = self.rx_ctx.as_mut().expect("restart recreated contexts");
        ctx.unprotect_rtp(buf).map_err(Error::Srtp)
    }

    /// Unprotect a received SRTCP packet. RTCP failures never trigger the
    /// probation recovery.
    pub(crate) fn unprotect_rtcp(&mut self, buf: &mut Vec<u8>) -> Result<(), Error> {
        if !self.session_inited {
            return Err(Error::InvalidOperation);
        }

        let ctx = self.rx_ctx.as_mut().expect("inited session has contexts");
        ctx.unprotect_rtcp(buf).map_err(Error::Srtp)
    }

    /// Decrypt an opaque captured packet with the receive context
    pub(crate) fn decrypt(&mut self, is_rtp: bool, buf: &mut Vec<u8>) -> Result<(), Error> {
        if self.bypass {
            return Ok(());
        }

        if !self.session_inited {
            return Err(Error::InvalidOperation);
        }

        let ctx = self.rx_ctx.as_mut().expect("inited session has contexts");

        let result = if is_rtp {
            ctx.unprotect_rtp(buf)
        } else {
            ctx.unprotect_rtcp(buf)
        };

        result.map_err(|e| {
            log::debug!("Failed to decrypt captured packet, size={}: {e}", buf.len());
            Error::Srtp(e)
        })
    }
}

/// Split a policy into (cipher suite index, auth suite index), redirecting
/// disabled parts to the NULL suite.
fn apply_flags(suite: usize, policy: &SrtpCryptoPolicy) -> (usize, usize) {
    let cipher = if policy.flags.no_encryption { 0 } else { suite };
    let auth = if policy.flags.no_authentication {
        0
    } else {
        suite
    };
    (cipher, auth)
}

fn create_context(
    cipher_idx: usize,
    auth_idx: usize,
    key: &[u8],
    ssrc: Ssrc,
) -> Result<SrtpSession, Error> {
    let suites = suites();
    let cipher = &suites[cipher_idx];
    let auth = &suites[auth_idx];

    let sec_serv = match (cipher_idx > 0, auth_idx > 0) {
        (true, true) => SecurityServices::ConfAuth,
        (true, false) => SecurityServices::Conf,
        (false, true) => SecurityServices::Auth,
        (false, false) => SecurityServices::None,
    };

    let rtp = CryptoPolicy {
        cipher: cipher.cipher,
        cipher_key_len: cipher.key_len,
        auth: auth.auth,
        auth_key_len: auth.auth_key_len,
        auth_tag_len: auth.srtp_auth_tag_len,
        sec_serv,
    };

    let rtcp = CryptoPolicy {
        auth_tag_len: auth.srtcp_auth_tag_len,
        ..rtp
    };

    let policy = SrtpPolicy::new(rtp, rtcp, key.into(), ssrc)?;

    Ok(SrtpSession::new(vec![policy])?)
}

/// Copy of the policy with the canonical suite name and the key cut to the
/// suite's declared length
fn normalized(policy: &SrtpCryptoPolicy, suite: usize) -> SrtpCryptoPolicy {
    let mut normalized = policy.clone();
    normalized.name = suites()[suite].name.to_string();
    normalized.key.truncate(suites()[suite].key_len);
    normalized
}
