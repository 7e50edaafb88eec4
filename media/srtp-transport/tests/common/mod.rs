#![allow(dead_code)]

use lark_srtp_transport::{
    Direction, Error, MediaTransport, SrtpSetting, SrtpTransport, TransportAttachParam,
};
use sdp_types::{Media, MediaDescription, MediaType, SessionDescription, TransportProtocol};
use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

/// In-memory member transport. Sent packets are queued so a test can move
/// them to the peer; received packets are handed to the attached callbacks
/// via [`deliver_rtp`](Self::deliver_rtp).
#[derive(Default)]
pub struct LoopbackTransport {
    attached: Mutex<Option<TransportAttachParam>>,
    sent_rtp: Mutex<VecDeque<Vec<u8>>>,
    sent_rtcp: Mutex<VecDeque<Vec<u8>>>,
    closed: AtomicBool,
}

impl LoopbackTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deliver_rtp(&self, pkt: &[u8]) {
        let cb = self
            .attached
            .lock()
            .unwrap()
            .as_ref()
            .map(|param| param.rtp_cb.clone());

        if let Some(cb) = cb {
            cb(pkt);
        }
    }

    pub fn deliver_rtcp(&self, pkt: &[u8]) {
        let cb = self
            .attached
            .lock()
            .unwrap()
            .as_ref()
            .map(|param| param.rtcp_cb.clone());

        if let Some(cb) = cb {
            cb(pkt);
        }
    }

    pub fn drain_rtp(&self) -> Vec<Vec<u8>> {
        self.sent_rtp.lock().unwrap().drain(..).collect()
    }

    pub fn drain_rtcp(&self) -> Vec<Vec<u8>> {
        self.sent_rtcp.lock().unwrap().drain(..).collect()
    }

    pub fn sent_rtp_count(&self) -> usize {
        self.sent_rtp.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl MediaTransport for LoopbackTransport {
    fn attach(&self, param: TransportAttachParam) -> Result<(), Error> {
        *self.attached.lock().unwrap() = Some(param);
        Ok(())
    }

    fn detach(&self) {
        *self.attached.lock().unwrap() = None;
    }

    fn send_rtp(&self, pkt: &[u8]) -> Result<(), Error> {
        self.sent_rtp.lock().unwrap().push_back(pkt.to_vec());
        Ok(())
    }

    fn send_rtcp(&self, pkt: &[u8]) -> Result<(), Error> {
        self.sent_rtcp.lock().unwrap().push_back(pkt.to_vec());
        Ok(())
    }

    fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn simulate_lost(&self, _dir: Direction, _pct_lost: u32) -> Result<(), Error> {
        Ok(())
    }
}

/// Collects every packet handed to an application callback
pub type Collected = Arc<Mutex<Vec<Vec<u8>>>>;

pub fn attach_collecting(transport: &SrtpTransport) -> (Collected, Collected) {
    let rtp: Collected = Arc::new(Mutex::new(Vec::new()));
    let rtcp: Collected = Arc::new(Mutex::new(Vec::new()));

    let rtp_sink = rtp.clone();
    let rtcp_sink = rtcp.clone();

    let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();

    transport
        .attach(TransportAttachParam {
            rtp_cb: Arc::new(move |pkt| rtp_sink.lock().unwrap().push(pkt.to_vec())),
            rtcp_cb: Arc::new(move |pkt| rtcp_sink.lock().unwrap().push(pkt.to_vec())),
            remote_rtp: addr,
            remote_rtcp: addr,
        })
        .unwrap();

    (rtp, rtcp)
}

/// A session description with a single audio media line
pub fn session_with_media(proto: TransportProtocol) -> SessionDescription {
    SessionDescription {
        media_descriptions: vec![MediaDescription::new(Media {
            media_type: MediaType::Audio,
            port: 4000,
            proto,
        })],
        ..Default::default()
    }
}

/// Minimal RTP packet with the given sequence number
pub fn rtp_packet(ssrc: u32, seq: u16, payload: &[u8]) -> Vec<u8> {
    let mut pkt = vec![0x80, 96, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0];
    pkt[2..4].copy_from_slice(&seq.to_be_bytes());
    pkt[8..12].copy_from_slice(&ssrc.to_be_bytes());
    pkt.extend_from_slice(payload);
    pkt
}

/// Minimal RTCP sender report header
pub fn rtcp_packet(ssrc: u32) -> Vec<u8> {
    let mut pkt = vec![0x80, 200, 0, 6, 0, 0, 0, 0];
    pkt[4..8].copy_from_slice(&ssrc.to_be_bytes());
    pkt.extend_from_slice(&[0x42; 20]);
    pkt
}

/// Move every queued packet between the two member transports until both
/// queues stay empty, or the iteration limit is hit.
pub fn pump(a: &LoopbackTransport, b: &LoopbackTransport, limit: usize) {
    for _ in 0..limit {
        let a_out = a.drain_rtp();
        let b_out = b.drain_rtp();

        if a_out.is_empty() && b_out.is_empty() {
            return;
        }

        for pkt in a_out {
            b.deliver_rtp(&pkt);
        }

        for pkt in b_out {
            a.deliver_rtp(&pkt);
        }
    }
}

/// Run a full SDES offer/answer negotiation between the two transports
pub fn negotiate_sdes(
    offerer: &SrtpTransport,
    answerer: &SrtpTransport,
    proto: TransportProtocol,
) -> (SessionDescription, SessionDescription) {
    offerer.media_create(None, 0).unwrap();

    let mut offer = session_with_media(proto);
    offerer.encode_sdp(&mut offer, None, 0).unwrap();

    answerer.media_create(Some(&offer), 0).unwrap();

    let mut answer = session_with_media(TransportProtocol::RtpAvp);
    answerer.encode_sdp(&mut answer, Some(&offer), 0).unwrap();

    answerer.media_start(&answer, &offer, 0).unwrap();
    offerer.media_start(&offer, &answer, 0).unwrap();

    (offer, answer)
}

pub fn default_pair() -> (SrtpTransport, Arc<LoopbackTransport>, SrtpTransport, Arc<LoopbackTransport>) {
    let a_member = LoopbackTransport::new();
    let b_member = LoopbackTransport::new();

    let a = SrtpTransport::new(a_member.clone(), SrtpSetting::default()).unwrap();
    let b = SrtpTransport::new(b_member.clone(), SrtpSetting::default()).unwrap();

    (a, a_member, b, b_member)
}
