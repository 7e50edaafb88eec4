//! Session-level transform state: keystream generation, AEAD and HMAC tags.
//!
//! Keys held here are session keys already derived via [`crate::kdf`].

use crate::SrtpError;
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::{
    Aes128Gcm, Aes256Gcm, KeyInit,
    aead::{Aead, Payload, generic_array::GenericArray},
};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes192Ctr = ctr::Ctr128BE<Aes192>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

pub(crate) const GCM_TAG_LEN: usize = 16;

/// Confidentiality transform of one direction of a stream
pub(crate) enum PacketCipher {
    Null,
    AesCm {
        key: Vec<u8>,
        salt: [u8; 14],
    },
    AesGcm128 {
        cipher: Box<Aes128Gcm>,
        salt: [u8; 12],
    },
    AesGcm256 {
        cipher: Box<Aes256Gcm>,
        salt: [u8; 12],
    },
}

impl PacketCipher {
    pub(crate) fn aes_cm(key: Vec<u8>, salt: &[u8]) -> Result<Self, SrtpError> {
        if !matches!(key.len(), 16 | 24 | 32) || salt.len() != 14 {
            return Err(SrtpError::BadParam);
        }

        let mut salt_buf = [0u8; 14];
        salt_buf.copy_from_slice(salt);

        Ok(PacketCipher::AesCm {
            key,
            salt: salt_buf,
        })
    }

    pub(crate) fn aes_gcm(key: &[u8], salt: &[u8]) -> Result<Self, SrtpError> {
        if salt.len() != 12 {
            return Err(SrtpError::BadParam);
        }

        let mut salt_buf = [0u8; 12];
        salt_buf.copy_from_slice(salt);

        match key.len() {
            16 => Ok(PacketCipher::AesGcm128 {
                cipher: Box::new(Aes128Gcm::new(GenericArray::from_slice(key))),
                salt: salt_buf,
            }),
            32 => Ok(PacketCipher::AesGcm256 {
                cipher: Box::new(Aes256Gcm::new(GenericArray::from_slice(key))),
                salt: salt_buf,
            }),
            _ => Err(SrtpError::BadParam),
        }
    }

    pub(crate) fn is_aead(&self) -> bool {
        matches!(
            self,
            PacketCipher::AesGcm128 { .. } | PacketCipher::AesGcm256 { .. }
        )
    }

    /// Apply the AES-CM keystream for the given (ssrc, roc, seq) position.
    ///
    /// The counter is the session salt XORed with the SSRC and the 48-bit
    /// packet index, shifted so the last two octets count keystream blocks
    /// (RFC 3711 section 4.1.1). Encryption and decryption are identical.
    pub(crate) fn apply_keystream(
        &self,
        ssrc: u32,
        roc: u32,
        seq: u16,
        data: &mut [u8],
    ) -> Result<(), SrtpError> {
        let (key, salt) = match self {
            PacketCipher::Null => return Ok(()),
            PacketCipher::AesCm { key, salt } => (key, salt),
            _ => return Err(SrtpError::CipherFail),
        };

        let mut counter = [0u8; 16];
        counter[4..8].copy_from_slice(&ssrc.to_be_bytes());
        counter[8..12].copy_from_slice(&roc.to_be_bytes());
        counter[12..14].copy_from_slice(&seq.to_be_bytes());

        for (c, s) in counter.iter_mut().zip(salt.iter()) {
            *c ^= s;
        }

        match key.len() {
            16 => Aes128Ctr::new_from_slices(key, &counter)
                .map_err(|_| SrtpError::CipherFail)?
                .apply_keystream(data),
            24 => Aes192Ctr::new_from_slices(key, &counter)
                .map_err(|_| SrtpError::CipherFail)?
                .apply_keystream(data),
            32 => Aes256Ctr::new_from_slices(key, &counter)
                .map_err(|_| SrtpError::CipherFail)?
                .apply_keystream(data),
            _ => return Err(SrtpError::CipherFail),
        }

        Ok(())
    }

    /// AEAD seal, returns ciphertext followed by the 16 octet tag
    pub(crate) fn seal(&self, iv: &[u8; 12], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, SrtpError> {
        let payload = Payload { msg, aad };

        match self {
            PacketCipher::AesGcm128 { cipher, .. } => cipher
                .encrypt(GenericArray::from_slice(iv), payload)
                .map_err(|_| SrtpError::CipherFail),
            PacketCipher::AesGcm256 { cipher, .. } => cipher
                .encrypt(GenericArray::from_slice(iv), payload)
                .map_err(|_| SrtpError::CipherFail),
            _ => Err(SrtpError::CipherFail),
        }
    }

    /// AEAD open, `msg` is ciphertext followed by the tag
    pub(crate) fn open(&self, iv: &[u8; 12], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, SrtpError> {
        let payload = Payload { msg, aad };

        match self {
            PacketCipher::AesGcm128 { cipher, .. } => cipher
                .decrypt(GenericArray::from_slice(iv), payload)
                .map_err(|_| SrtpError::AuthFail),
            PacketCipher::AesGcm256 { cipher, .. } => cipher
                .decrypt(GenericArray::from_slice(iv), payload)
                .map_err(|_| SrtpError::AuthFail),
            _ => Err(SrtpError::CipherFail),
        }
    }

    /// GCM IV for an RTP packet (RFC 7714 section 8.1)
    pub(crate) fn rtp_iv(&self, ssrc: u32, roc: u32, seq: u16) -> [u8; 12] {
        let mut iv = [0u8; 12];
        iv[2..6].copy_from_slice(&ssrc.to_be_bytes());
        iv[6..10].copy_from_slice(&roc.to_be_bytes());
        iv[10..12].copy_from_slice(&seq.to_be_bytes());
        self.xor_gcm_salt(&mut iv);
        iv
    }

    /// GCM IV for an RTCP packet (RFC 7714 section 9.1)
    pub(crate) fn rtcp_iv(&self, ssrc: u32, index: u32) -> [u8; 12] {
        let mut iv = [0u8; 12];
        iv[2..6].copy_from_slice(&ssrc.to_be_bytes());
        iv[8..12].copy_from_slice(&index.to_be_bytes());
        self.xor_gcm_salt(&mut iv);
        iv
    }

    fn xor_gcm_salt(&self, iv: &mut [u8; 12]) {
        let salt = match self {
            PacketCipher::AesGcm128 { salt, .. } | PacketCipher::AesGcm256 { salt, .. } => salt,
            _ => return,
        };

        for (b, s) in iv.iter_mut().zip(salt.iter()) {
            *b ^= s;
        }
    }
}

/// Authentication transform of one direction of a stream
pub(crate) enum PacketAuth {
    Null,
    HmacSha1 { mac: HmacSha1, tag_len: usize },
}

impl PacketAuth {
    pub(crate) fn hmac_sha1(key: &[u8], tag_len: usize) -> Result<Self, SrtpError> {
        if tag_len > 20 {
            return Err(SrtpError::BadParam);
        }

        Ok(PacketAuth::HmacSha1 {
            mac: <HmacSha1 as Mac>::new_from_slice(key).map_err(|_| SrtpError::BadParam)?,
            tag_len,
        })
    }

    pub(crate) fn tag_len(&self) -> usize {
        match self {
            PacketAuth::Null => 0,
            PacketAuth::HmacSha1 { tag_len, .. } => *tag_len,
        }
    }

    /// Tag over the authenticated portion, with the rollover counter
    /// appended for RTP (RFC 3711 section 4.2: `M = packet || roc`).
    pub(crate) fn compute(&self, data: &[u8], roc: Option<u32>) -> Vec<u8> {
        match self {
            PacketAuth::Null => Vec::new(),
            PacketAuth::HmacSha1 { mac, tag_len } => {
                let mut mac = mac.clone();
                mac.update(data);
                if let Some(roc) = roc {
                    mac.update(&roc.to_be_bytes());
                }

                let mut tag = mac.finalize().into_bytes().to_vec();
                tag.truncate(*tag_len);
                tag
            }
        }
    }

    pub(crate) fn verify(&self, data: &[u8], roc: Option<u32>, tag: &[u8]) -> Result<(), SrtpError> {
        let expected = self.compute(data, roc);

        if expected.ct_eq(tag).into() {
            Ok(())
        } else {
            Err(SrtpError::AuthFail)
        }
    }
}
