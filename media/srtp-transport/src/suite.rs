//! Crypto suite registry & SRTP key policies
//!
//! The registry is the process wide table of supported SDP security
//! description suites (RFC 4568 names). Index 0 is always the `NULL`
//! suite which bypasses protection entirely. The available suites are
//! selected at compile time via the crate's cargo features.

use crate::Error;
use srtp::{AuthType, CipherType, SecurityServices};
use std::sync::LazyLock;

/// One entry of the crypto suite registry
#[derive(Debug, Clone)]
pub struct CryptoSuite {
    /// IANA registered suite name
    pub name: &'static str,
    pub cipher: CipherType,
    /// Master key + salt length in bytes
    pub key_len: usize,
    pub salt_len: usize,
    pub auth: AuthType,
    pub auth_key_len: usize,
    pub srtp_auth_tag_len: usize,
    pub srtcp_auth_tag_len: usize,
    /// Default protection services of the suite
    pub service: SecurityServices,
}

static CRYPTO_SUITES: LazyLock<Vec<CryptoSuite>> = LazyLock::new(|| {
    let mut suites = vec![CryptoSuite {
        name: "NULL",
        cipher: CipherType::Null,
        key_len: 0,
        salt_len: 0,
        auth: AuthType::Null,
        auth_key_len: 0,
        srtp_auth_tag_len: 0,
        srtcp_auth_tag_len: 0,
        service: SecurityServices::None,
    }];

    #[cfg(feature = "aes-gcm-256")]
    suites.push(CryptoSuite {
        name: "AEAD_AES_256_GCM",
        cipher: CipherType::AesGcm256,
        key_len: 44,
        salt_len: 12,
        auth: AuthType::Null,
        auth_key_len: 0,
        srtp_auth_tag_len: 16,
        srtcp_auth_tag_len: 16,
        service: SecurityServices::ConfAuth,
    });

    #[cfg(feature = "aes-cm-256")]
    {
        suites.push(CryptoSuite {
            name: "AES_256_CM_HMAC_SHA1_80",
            cipher: CipherType::AesIcm256,
            key_len: 46,
            salt_len: 14,
            auth: AuthType::HmacSha1,
            auth_key_len: 20,
            srtp_auth_tag_len: 10,
            srtcp_auth_tag_len: 10,
            service: SecurityServices::ConfAuth,
        });
        suites.push(CryptoSuite {
            name: "AES_256_CM_HMAC_SHA1_32",
            cipher: CipherType::AesIcm256,
            key_len: 46,
            salt_len: 14,
            auth: AuthType::HmacSha1,
            auth_key_len: 20,
            srtp_auth_tag_len: 4,
            srtcp_auth_tag_len: 10,
            service: SecurityServices::ConfAuth,
        });
    }

    #[cfg(feature = "aes-cm-192")]
    {
        suites.push(CryptoSuite {
            name: "AES_192_CM_HMAC_SHA1_80",
            cipher: CipherType::AesIcm192,
            key_len: 38,
            salt_len: 14,
            auth: AuthType::HmacSha1,
            auth_key_len: 20,
            srtp_auth_tag_len: 10,
            srtcp_auth_tag_len: 10,
            service: SecurityServices::ConfAuth,
        });
        suites.push(CryptoSuite {
            name: "AES_192_CM_HMAC_SHA1_32",
            cipher: CipherType::AesIcm192,
            key_len: 38,
            salt_len: 14,
            auth: AuthType::HmacSha1,
            auth_key_len: 20,
            srtp_auth_tag_len: 4,
            srtcp_auth_tag_len: 10,
            service: SecurityServices::ConfAuth,
        });
    }

    #[cfg(feature = "aes-gcm-128")]
    suites.push(CryptoSuite {
        name: "AEAD_AES_128_GCM",
        cipher: CipherType::AesGcm128,
        key_len: 28,
        salt_len: 12,
        auth: AuthType::Null,
        auth_key_len: 0,
        srtp_auth_tag_len: 16,
        srtcp_auth_tag_len: 16,
        service: SecurityServices::ConfAuth,
    });

    #[cfg(feature = "aes-cm-128")]
    {
        suites.push(CryptoSuite {
            name: "AES_CM_128_HMAC_SHA1_80",
            cipher: CipherType::AesIcm128,
            key_len: 30,
            salt_len: 14,
            auth: AuthType::HmacSha1,
            auth_key_len: 20,
            srtp_auth_tag_len: 10,
            srtcp_auth_tag_len: 10,
            service: SecurityServices::ConfAuth,
        });
        suites.push(CryptoSuite {
            name: "AES_CM_128_HMAC_SHA1_32",
            cipher: CipherType::AesIcm128,
            key_len: 30,
            salt_len: 14,
            auth: AuthType::HmacSha1,
            auth_key_len: 20,
            srtp_auth_tag_len: 4,
            srtcp_auth_tag_len: 10,
            service: SecurityServices::ConfAuth,
        });
    }

    suites
});

/// All registered crypto suites, the `NULL` suite first
pub fn suites() -> &'static [CryptoSuite] {
    &CRYPTO_SUITES
}

/// Look up a suite by name, case-insensitively.
///
/// An empty name maps to the `NULL` suite at index 0, unknown names
/// return `None`.
pub fn suite_index(name: &str) -> Option<usize> {
    if name.is_empty() {
        return Some(0);
    }

    suites()
        .iter()
        .position(|suite| suite.name.eq_ignore_ascii_case(name))
}

/// Modifier flags of a [`SrtpCryptoPolicy`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CryptoFlags {
    /// Do not encrypt, authenticate only
    pub no_encryption: bool,
    /// Do not authenticate, encrypt only
    pub no_authentication: bool,
}

/// A crypto suite name paired with key material and modifier flags.
///
/// This is what keying methods negotiate and what an SRTP session is
/// started from.
#[derive(Debug, Clone, Default)]
pub struct SrtpCryptoPolicy {
    /// Suite name, empty selects the `NULL` suite
    pub name: String,
    /// Raw master key + salt
    pub key: Vec<u8>,
    pub flags: CryptoFlags,
}

impl SrtpCryptoPolicy {
    pub fn new(name: impl Into<String>, key: Vec<u8>) -> Self {
        SrtpCryptoPolicy {
            name: name.into(),
            key,
            flags: CryptoFlags::default(),
        }
    }

    /// A policy is empty when it carries no suite name or no key
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.key.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        *self = SrtpCryptoPolicy::default();
    }

    /// Resolve the policy's suite, validating the key length.
    ///
    /// A non-empty key shorter than the suite's key + salt length is
    /// rejected; empty keys pass (they are generated later).
    pub(crate) fn validate(&self) -> Result<usize, Error> {
        let index = suite_index(&self.name).ok_or(Error::UnsupportedCryptoSuite)?;

        if !self.key.is_empty() && self.key.len() < suites()[index].key_len {
            return Err(Error::InvalidKeyLength);
        }

        Ok(index)
    }
}

impl PartialEq for SrtpCryptoPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.name.eq_ignore_ascii_case(&other.name)
            && self.flags == other.flags
    }
}

impl Eq for SrtpCryptoPolicy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(suite_index("NULL"), Some(0));
        assert_eq!(suite_index(""), Some(0));
        assert_eq!(
            suite_index("AES_CM_128_HMAC_SHA1_80"),
            suite_index("aes_cm_128_hmac_sha1_80")
        );
        assert_eq!(suite_index("AES_CM_47_HMAC_MD5"), None);
    }

    #[test]
    fn null_suite_is_first_and_registry_is_closed() {
        let suites = suites();
        assert_eq!(suites[0].name, "NULL");
        assert!(suites.iter().skip(1).all(|s| s.key_len > 0));
    }

    #[test]
    fn policy_equality_ignores_name_case_only() {
        let a = SrtpCryptoPolicy::new("AES_CM_128_HMAC_SHA1_80", vec![1; 30]);
        let mut b = SrtpCryptoPolicy::new("aes_cm_128_hmac_sha1_80", vec![1; 30]);
        assert_eq!(a, b);

        b.key[0] = 2;
        assert_ne!(a, b);

        let mut c = a.clone();
        c.flags.no_encryption = true;
        assert_ne!(a, c);
    }

    #[test]
    fn short_keys_are_rejected_by_validation() {
        let policy = SrtpCryptoPolicy::new("AES_CM_128_HMAC_SHA1_80", vec![0; 16]);
        assert!(matches!(policy.validate(), Err(Error::InvalidKeyLength)));

        let empty_key = SrtpCryptoPolicy::new("AES_CM_128_HMAC_SHA1_80", vec![]);
        assert!(empty_key.validate().is_ok());

        let unknown = SrtpCryptoPolicy::new("NOT_A_SUITE", vec![0; 30]);
        assert!(matches!(
            unknown.validate(),
            Err(Error::UnsupportedCryptoSuite)
        ));
    }
}
