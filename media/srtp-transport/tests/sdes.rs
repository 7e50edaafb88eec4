use base64::{Engine, prelude::BASE64_STANDARD};
use common::{attach_collecting, negotiate_sdes, rtp_packet, session_with_media};
use common::LoopbackTransport;
use lark_srtp_transport::{
    Error, KeyingKind, MediaTransport, SrtpCryptoPolicy, SrtpSetting, SrtpTransport, SrtpUse,
};
use sdp_types::{SrtpCrypto, SrtpKeyingMaterial, SrtpSuite, TransportProtocol};

mod common;

fn sdes_transport(setting: SrtpSetting) -> (SrtpTransport, std::sync::Arc<LoopbackTransport>) {
    let member = LoopbackTransport::new();
    let setting = SrtpSetting {
        keying: vec![KeyingKind::Sdes],
        ..setting
    };

    (
        SrtpTransport::new(member.clone(), setting).unwrap(),
        member,
    )
}

#[test]
fn offer_contains_one_crypto_attribute_per_suite() {
    let (transport, _member) = sdes_transport(SrtpSetting {
        crypto: vec![SrtpCryptoPolicy::new("AES_CM_128_HMAC_SHA1_80", vec![])],
        ..Default::default()
    });

    transport.media_create(None, 0).unwrap();

    let mut offer = session_with_media(TransportProtocol::RtpAvp);
    transport.encode_sdp(&mut offer, None, 0).unwrap();

    let crypto = &offer.media_descriptions[0].crypto;
    assert_eq!(crypto.len(), 1);
    assert_eq!(crypto[0].tag, 1);
    assert_eq!(crypto[0].suite, SrtpSuite::AES_CM_128_HMAC_SHA1_80);

    let key = BASE64_STANDARD
        .decode(crypto[0].keys[0].key_and_salt.as_bytes())
        .unwrap();
    assert_eq!(key.len(), 30);

    assert!(
        crypto[0]
            .to_string()
            .starts_with("1 AES_CM_128_HMAC_SHA1_80 inline:")
    );
}

#[test]
fn answer_echoes_the_chosen_tag_and_suite() {
    let (transport, _member) = sdes_transport(SrtpSetting {
        crypto: vec![SrtpCryptoPolicy::new("AES_CM_128_HMAC_SHA1_80", vec![])],
        ..Default::default()
    });

    let mut offer = session_with_media(TransportProtocol::RtpSavp);
    offer.media_descriptions[0].crypto = vec![
        SrtpCrypto {
            tag: 1,
            suite: SrtpSuite::AES_256_CM_HMAC_SHA1_80,
            keys: vec![SrtpKeyingMaterial::new(
                BASE64_STANDARD.encode([7u8; 46]),
            )],
            params: vec![],
        },
        SrtpCrypto {
            tag: 2,
            suite: SrtpSuite::AES_CM_128_HMAC_SHA1_80,
            keys: vec![SrtpKeyingMaterial::new(
                BASE64_STANDARD.encode([9u8; 30]),
            )],
            params: vec![],
        },
    ];

    transport.media_create(Some(&offer), 0).unwrap();

    let mut answer = session_with_media(TransportProtocol::RtpAvp);
    transport.encode_sdp(&mut answer, Some(&offer), 0).unwrap();

    let media = &answer.media_descriptions[0];
    assert_eq!(media.media.proto, TransportProtocol::RtpSavp);
    assert_eq!(media.crypto.len(), 1);
    // The 256 bit suite is not enabled locally, so tag 2 wins
    assert_eq!(media.crypto[0].tag, 2);
    assert_eq!(media.crypto[0].suite, SrtpSuite::AES_CM_128_HMAC_SHA1_80);

    transport.media_start(&answer, &offer, 0).unwrap();

    let info = transport.get_info();
    assert!(info.active);
    assert_eq!(info.rx_policy.key, vec![9u8; 30]);
    assert_eq!(info.tx_policy.name, "AES_CM_128_HMAC_SHA1_80");
}

#[test]
fn mandatory_usage_rejects_a_plain_rtp_offer() {
    let (transport, _member) = sdes_transport(SrtpSetting {
        usage: SrtpUse::Mandatory,
        ..Default::default()
    });

    let offer = session_with_media(TransportProtocol::RtpAvp);

    transport.media_create(Some(&offer), 0).unwrap();

    let answer = session_with_media(TransportProtocol::RtpAvp);
    assert!(matches!(
        transport.media_start(&answer, &offer, 0),
        Err(Error::SdpRequiresCrypto)
    ));
}

#[test]
fn offers_with_short_keys_are_rejected() {
    let (transport, _member) = sdes_transport(SrtpSetting::default());

    let mut offer = session_with_media(TransportProtocol::RtpSavp);
    offer.media_descriptions[0].crypto = vec![SrtpCrypto {
        tag: 1,
        suite: SrtpSuite::AES_CM_128_HMAC_SHA1_80,
        keys: vec![SrtpKeyingMaterial::new(BASE64_STANDARD.encode([1u8; 16]))],
        params: vec![],
    }];

    transport.media_create(Some(&offer), 0).unwrap();

    let mut answer = session_with_media(TransportProtocol::RtpAvp);
    assert!(matches!(
        transport.encode_sdp(&mut answer, Some(&offer), 0),
        Err(Error::InvalidKeyLength)
    ));
}

#[test]
fn unknown_suites_in_the_offer_are_skipped() {
    let (transport, _member) = sdes_transport(SrtpSetting::default());

    let mut offer = session_with_media(TransportProtocol::RtpSavp);
    offer.media_descriptions[0].crypto = vec![
        SrtpCrypto {
            tag: 1,
            suite: SrtpSuite::Ext("FANCY_FUTURE_SUITE".into()),
            keys: vec![SrtpKeyingMaterial::new(BASE64_STANDARD.encode([1u8; 30]))],
            params: vec![],
        },
        SrtpCrypto {
            tag: 2,
            suite: SrtpSuite::AES_CM_128_HMAC_SHA1_32,
            keys: vec![SrtpKeyingMaterial::new(BASE64_STANDARD.encode([3u8; 30]))],
            params: vec![],
        },
    ];

    transport.media_create(Some(&offer), 0).unwrap();

    let mut answer = session_with_media(TransportProtocol::RtpAvp);
    transport.encode_sdp(&mut answer, Some(&offer), 0).unwrap();

    assert_eq!(answer.media_descriptions[0].crypto.len(), 1);
    assert_eq!(
        answer.media_descriptions[0].crypto[0].suite,
        SrtpSuite::AES_CM_128_HMAC_SHA1_32
    );
}

#[test]
fn full_sdes_negotiation_protects_media_both_ways() {
    let a_member = LoopbackTransport::new();
    let b_member = LoopbackTransport::new();

    let setting = SrtpSetting {
        keying: vec![KeyingKind::Sdes],
        crypto: vec![SrtpCryptoPolicy::new("AES_CM_128_HMAC_SHA1_80", vec![])],
        ..Default::default()
    };

    let a = SrtpTransport::new(a_member.clone(), setting.clone()).unwrap();
    let b = SrtpTransport::new(b_member.clone(), setting).unwrap();

    let (a_rtp, _) = attach_collecting(&a);
    let (b_rtp, _) = attach_collecting(&b);

    negotiate_sdes(&a, &b, TransportProtocol::RtpAvp);

    assert!(a.get_info().active);
    assert!(b.get_info().active);
    assert_eq!(a.keying_count(), 1);
    assert_eq!(b.keying_count(), 1);

    // A's transmit key is B's receive key
    assert_eq!(a.get_info().tx_policy, b.get_info().rx_policy);
    assert_eq!(a.get_info().rx_policy, b.get_info().tx_policy);

    let plain = rtp_packet(0x1234, 100, b"hello from a");
    a.send_rtp(&plain).unwrap();

    let wire = a_member.drain_rtp();
    assert_eq!(wire.len(), 1);
    assert_ne!(wire[0], plain);
    assert_eq!(wire[0].len(), plain.len() + 10);

    b_member.deliver_rtp(&wire[0]);
    assert_eq!(b_rtp.lock().unwrap().as_slice(), &[plain.clone()]);

    // And the other direction
    let reply = rtp_packet(0x9999, 7, b"hello from b");
    b.send_rtp(&reply).unwrap();

    let wire = b_member.drain_rtp();
    a_member.deliver_rtp(&wire[0]);
    assert_eq!(a_rtp.lock().unwrap().as_slice(), &[reply]);
}

#[test]
fn rtcp_is_protected_alongside_rtp() {
    let a_member = LoopbackTransport::new();
    let b_member = LoopbackTransport::new();

    let setting = SrtpSetting {
        keying: vec![KeyingKind::Sdes],
        ..Default::default()
    };

    let a = SrtpTransport::new(a_member.clone(), setting.clone()).unwrap();
    let b = SrtpTransport::new(b_member.clone(), setting).unwrap();

    let (_, _a_rtcp) = attach_collecting(&a);
    let (_, b_rtcp) = attach_collecting(&b);

    negotiate_sdes(&a, &b, TransportProtocol::RtpAvp);

    let report = common::rtcp_packet(0x1234);
    a.send_rtcp(&report).unwrap();

    let wire = a_member.drain_rtcp();
    assert_eq!(wire.len(), 1);
    assert_ne!(wire[0], report);

    b_member.deliver_rtcp(&wire[0]);
    assert_eq!(b_rtcp.lock().unwrap().as_slice(), &[report.clone()]);

    // A replayed RTCP packet is dropped for good, there is no probation
    // recovery on the RTCP path
    b_member.deliver_rtcp(&wire[0]);
    assert_eq!(b_rtcp.lock().unwrap().as_slice(), &[report]);
}
