use crate::suite::suites;
use openssl::{
    asn1::{Asn1Time, Asn1Type},
    bn::{BigNum, MsbOption},
    error::ErrorStack,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    rsa::Rsa,
    ssl::{SslAcceptor, SslContext, SslMethod, SslVersion},
    x509::{X509, X509Name},
};

/// Wrapper around a [`SslContext`] with the guarantee that a certificate is
/// set and the SRTP extension is enabled
#[derive(Clone)]
pub struct OpenSslContext {
    pub(crate) ctx: SslContext,
}

impl OpenSslContext {
    /// Create a new DTLS context with a fresh self-signed certificate
    pub fn try_new() -> Result<Self, ErrorStack> {
        let (cert, pkey) = make_self_signed_cert()?;

        let mut ctx = SslAcceptor::mozilla_modern(SslMethod::dtls())?;
        ctx.set_tlsext_use_srtp(&srtp_profile_names())?;
        ctx.set_min_proto_version(Some(SslVersion::DTLS1_2))?;
        ctx.set_private_key(&pkey)?;
        ctx.set_certificate(&cert)?;
        ctx.check_private_key()?;

        Ok(Self {
            ctx: ctx.build().into_context(),
        })
    }

    /// SHA-256 digest of the context's certificate
    pub(crate) fn fingerprint(&self) -> Result<Vec<u8>, ErrorStack> {
        let cert = self.ctx.certificate().expect("context is built with a certificate");
        Ok(cert.digest(MessageDigest::sha256())?.to_vec())
    }
}

/// The `use_srtp` profile list offered in the DTLS handshake, derived from
/// the registered crypto suites that have a DTLS-SRTP protection profile
fn srtp_profile_names() -> String {
    let profiles: Vec<&str> = suites()
        .iter()
        .filter_map(|suite| match suite.name {
            "AES_CM_128_HMAC_SHA1_80" => Some("SRTP_AES128_CM_SHA1_80"),
            "AES_CM_128_HMAC_SHA1_32" => Some("SRTP_AES128_CM_SHA1_32"),
            "AEAD_AES_128_GCM" => Some("SRTP_AEAD_AES_128_GCM"),
            "AEAD_AES_256_GCM" => Some("SRTP_AEAD_AES_256_GCM"),
            _ => None,
        })
        .collect();

    profiles.join(":")
}

/// Map a negotiated DTLS-SRTP protection profile to the registry suite name
pub(crate) fn profile_to_suite(profile_name: &str) -> Option<&'static str> {
    match profile_name {
        "SRTP_AES128_CM_SHA1_80" => Some("AES_CM_128_HMAC_SHA1_80"),
        "SRTP_AES128_CM_SHA1_32" => Some("AES_CM_128_HMAC_SHA1_32"),
        "SRTP_AEAD_AES_128_GCM" => Some("AEAD_AES_128_GCM"),
        "SRTP_AEAD_AES_256_GCM" => Some("AEAD_AES_256_GCM"),
        _ => None,
    }
}

fn make_self_signed_cert() -> Result<(X509, PKey<Private>), ErrorStack> {
    openssl::init();

    let rsa = Rsa::generate(2048)?;
    let pkey = PKey::from_rsa(rsa)?;

    let mut cert_builder = X509::builder()?;
    cert_builder.set_version(2)?;

    let serial_number = {
        let mut serial = BigNum::new()?;
        serial.rand(159, MsbOption::MAYBE_ZERO, false)?;
        serial.to_asn1_integer()?
    };
    cert_builder.set_serial_number(&serial_number)?;

    cert_builder.set_pubkey(&pkey)?;
    cert_builder.set_not_before(Asn1Time::days_from_now(0)?.as_ref())?;
    cert_builder.set_not_after(Asn1Time::days_from_now(7)?.as_ref())?;

    let mut x509_name = X509Name::builder()?;
    x509_name.append_entry_by_nid_with_type(Nid::COMMONNAME, "lark", Asn1Type::UTF8STRING)?;
    let x509_name = x509_name.build();

    cert_builder.set_subject_name(&x509_name)?;
    cert_builder.set_issuer_name(&x509_name)?;

    cert_builder.sign(&pkey, MessageDigest::sha256())?;
    let cert = cert_builder.build();

    Ok((cert, pkey))
}
