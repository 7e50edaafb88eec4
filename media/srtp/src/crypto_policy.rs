/// Cipher transform applied to the packet body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherType {
    /// Identity transform
    Null,
    /// AES-128 counter mode (RFC 3711)
    AesIcm128,
    /// AES-192 counter mode (RFC 6188)
    AesIcm192,
    /// AES-256 counter mode (RFC 6188)
    AesIcm256,
    /// AEAD AES-128-GCM (RFC 7714)
    AesGcm128,
    /// AEAD AES-256-GCM (RFC 7714)
    AesGcm256,
}

impl CipherType {
    /// Master salt length used by this cipher
    pub fn salt_len(&self) -> usize {
        match self {
            CipherType::Null => 0,
            CipherType::AesIcm128 | CipherType::AesIcm192 | CipherType::AesIcm256 => 14,
            CipherType::AesGcm128 | CipherType::AesGcm256 => 12,
        }
    }
}

/// Authentication transform applied to the protected packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// No authentication tag (AEAD ciphers carry their own)
    Null,
    /// HMAC-SHA1, truncated to the policy's tag length
    HmacSha1,
}

/// Which protection services a policy provides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityServices {
    None,
    Conf,
    Auth,
    ConfAuth,
}

impl SecurityServices {
    pub(crate) fn conf(&self) -> bool {
        matches!(self, SecurityServices::Conf | SecurityServices::ConfAuth)
    }

    pub(crate) fn auth(&self) -> bool {
        matches!(self, SecurityServices::Auth | SecurityServices::ConfAuth)
    }
}

/// Describes a particular crypto policy that can be applied to an SRTP stream.
///
/// An [`SrtpPolicy`](crate::SrtpPolicy) consists of a pair of these policies,
/// one for the RTP and one for the RTCP part of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoPolicy {
    pub cipher: CipherType,
    /// Master key + salt length in bytes
    pub cipher_key_len: usize,
    pub auth: AuthType,
    /// Session authentication key length in bytes
    pub auth_key_len: usize,
    /// Authentication tag length in bytes
    pub auth_tag_len: usize,
    pub sec_serv: SecurityServices,
}

impl CryptoPolicy {
    /// Length of the key (master key + salt) required for this crypto policy
    pub fn key_len(&self) -> usize {
        self.cipher_key_len
    }

    fn aes_cm(cipher: CipherType, key_len: usize, tag_len: usize) -> Self {
        CryptoPolicy {
            cipher,
            cipher_key_len: key_len,
            auth: AuthType::HmacSha1,
            auth_key_len: 20,
            auth_tag_len: tag_len,
            sec_serv: SecurityServices::ConfAuth,
        }
    }

    fn aes_cm_no_auth(cipher: CipherType, key_len: usize) -> Self {
        CryptoPolicy {
            cipher,
            cipher_key_len: key_len,
            auth: AuthType::Null,
            auth_key_len: 0,
            auth_tag_len: 0,
            sec_serv: SecurityServices::Conf,
        }
    }

    fn aes_gcm(cipher: CipherType, key_len: usize, tag_len: usize) -> Self {
        CryptoPolicy {
            cipher,
            cipher_key_len: key_len,
            auth: AuthType::Null,
            auth_key_len: 0,
            auth_tag_len: tag_len,
            sec_serv: SecurityServices::ConfAuth,
        }
    }

    pub fn aes_cm_128_hmac_sha1_80() -> Self {
        Self::aes_cm(CipherType::AesIcm128, 30, 10)
    }

    pub fn aes_cm_128_hmac_sha1_32() -> Self {
        Self::aes_cm(CipherType::AesIcm128, 30, 4)
    }

    pub fn aes_cm_128_null_auth() -> Self {
        Self::aes_cm_no_auth(CipherType::AesIcm128, 30)
    }

    pub fn aes_cm_192_hmac_sha1_80() -> Self {
        Self::aes_cm(CipherType::AesIcm192, 38, 10)
    }

    pub fn aes_cm_192_hmac_sha1_32() -> Self {
        Self::aes_cm(CipherType::AesIcm192, 38, 4)
    }

    pub fn aes_cm_192_null_auth() -> Self {
        Self::aes_cm_no_auth(CipherType::AesIcm192, 38)
    }

    pub fn aes_cm_256_hmac_sha1_80() -> Self {
        Self::aes_cm(CipherType::AesIcm256, 46, 10)
    }

    pub fn aes_cm_256_hmac_sha1_32() -> Self {
        Self::aes_cm(CipherType::AesIcm256, 46, 4)
    }

    pub fn aes_cm_256_null_auth() -> Self {
        Self::aes_cm_no_auth(CipherType::AesIcm256, 46)
    }

    pub fn aes_gcm_128_16_auth() -> Self {
        Self::aes_gcm(CipherType::AesGcm128, 28, 16)
    }

    pub fn aes_gcm_256_16_auth() -> Self {
        Self::aes_gcm(CipherType::AesGcm256, 44, 16)
    }

    pub fn null_cipher_hmac_sha1_80() -> Self {
        CryptoPolicy {
            cipher: CipherType::Null,
            cipher_key_len: 0,
            auth: AuthType::HmacSha1,
            auth_key_len: 20,
            auth_tag_len: 10,
            sec_serv: SecurityServices::Auth,
        }
    }

    pub fn null_cipher_hmac_null() -> Self {
        CryptoPolicy {
            cipher: CipherType::Null,
            cipher_key_len: 0,
            auth: AuthType::Null,
            auth_key_len: 0,
            auth_tag_len: 0,
            sec_serv: SecurityServices::None,
        }
    }
}
