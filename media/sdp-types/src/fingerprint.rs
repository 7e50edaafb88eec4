use std::fmt;

/// Certificate fingerprint attribute (`a=fingerprint`)
///
/// [RFC8122](https://www.rfc-editor.org/rfc/rfc8122)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub algorithm: FingerprintAlgorithm,
    pub fingerprint: Vec<u8>,
}

/// Hash function of a [`Fingerprint`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintAlgorithm {
    SHA1,
    SHA224,
    SHA256,
    SHA384,
    SHA512,
    MD5,
    MD2,
    Other(String),
}

impl fmt::Display for FingerprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FingerprintAlgorithm::SHA1 => "SHA-1",
            FingerprintAlgorithm::SHA224 => "SHA-224",
            FingerprintAlgorithm::SHA256 => "SHA-256",
            FingerprintAlgorithm::SHA384 => "SHA-384",
            FingerprintAlgorithm::SHA512 => "SHA-512",
            FingerprintAlgorithm::MD5 => "MD5",
            FingerprintAlgorithm::MD2 => "MD2",
            FingerprintAlgorithm::Other(other) => other,
        })
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.algorithm)?;

        let mut iter = self.fingerprint.iter();

        if let Some(b) = iter.next() {
            write!(f, "{b:02X}")?;

            for b in iter {
                write!(f, ":{b:02X}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_value_encoding() {
        let fingerprint = Fingerprint {
            algorithm: FingerprintAlgorithm::SHA256,
            fingerprint: vec![0xB5, 0x38, 0x75, 0x0A],
        };

        assert_eq!(fingerprint.to_string(), "SHA-256 B5:38:75:0A");
    }
}
