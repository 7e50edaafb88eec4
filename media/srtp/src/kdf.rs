//! AES-CM key derivation (RFC 3711 section 4.3)

use crate::SrtpError;
use aes::{
    Aes128, Aes192, Aes256,
    cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray},
};

pub(crate) const LABEL_SRTP_ENCRYPTION: u8 = 0x00;
pub(crate) const LABEL_SRTP_AUTHENTICATION: u8 = 0x01;
pub(crate) const LABEL_SRTP_SALT: u8 = 0x02;
pub(crate) const LABEL_SRTCP_ENCRYPTION: u8 = 0x03;
pub(crate) const LABEL_SRTCP_AUTHENTICATION: u8 = 0x04;
pub(crate) const LABEL_SRTCP_SALT: u8 = 0x05;

enum Prf {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl Prf {
    fn new(master_key: &[u8]) -> Result<Self, SrtpError> {
        match master_key.len() {
            16 => Ok(Prf::Aes128(Aes128::new(GenericArray::from_slice(
                master_key,
            )))),
            24 => Ok(Prf::Aes192(Aes192::new(GenericArray::from_slice(
                master_key,
            )))),
            32 => Ok(Prf::Aes256(Aes256::new(GenericArray::from_slice(
                master_key,
            )))),
            _ => Err(SrtpError::BadParam),
        }
    }

    fn encrypt(&self, block: &mut [u8; 16]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Prf::Aes128(aes) => aes.encrypt_block(block),
            Prf::Aes192(aes) => aes.encrypt_block(block),
            Prf::Aes256(aes) => aes.encrypt_block(block),
        }
    }
}

/// Derive `out_len` bytes of session keying material from the master key &
/// salt for the given usage label.
///
/// The input block is the master salt (112 bit, a 96 bit GCM salt is padded
/// with two null octets) XORed with `label || index DIV kdr`, multiplied by
/// 2^16 so the last two octets act as the AES-CM block counter. The key
/// derivation rate is fixed to zero.
pub(crate) fn derive(
    master_key: &[u8],
    master_salt: &[u8],
    label: u8,
    out_len: usize,
) -> Result<Vec<u8>, SrtpError> {
    if master_salt.len() > 14 {
        return Err(SrtpError::BadParam);
    }

    let prf = Prf::new(master_key)?;

    let mut input = [0u8; 16];
    input[..master_salt.len()].copy_from_slice(master_salt);
    input[7] ^= label;

    let mut out = Vec::with_capacity(out_len.next_multiple_of(16));
    let mut counter: u16 = 0;

    while out.len() < out_len {
        let mut block = input;
        block[14..16].copy_from_slice(&counter.to_be_bytes());
        prf.encrypt(&mut block);
        out.extend_from_slice(&block);
        counter = counter.checked_add(1).ok_or(SrtpError::KeyExpired)?;
    }

    out.truncate(out_len);
    Ok(out)
}
