use std::fmt;

/// Crypto attribute (for SRTP only) (`a=crypto`)
///
/// [RFC4568](https://www.rfc-editor.org/rfc/rfc4568)
#[derive(Debug, Clone)]
pub struct SrtpCrypto {
    /// Unique identifier in a media description
    pub tag: u32,

    /// Crypto suite describing the encryption and authentication algorithm to use
    pub suite: SrtpSuite,

    /// One or more keys to use
    pub keys: Vec<SrtpKeyingMaterial>,

    /// Additional SRTP params
    pub params: Vec<SrtpSessionParam>,
}

impl fmt::Display for SrtpCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag, self.suite)?;

        if !self.keys.is_empty() {
            write!(f, " ")?;
        }

        let mut keys = self.keys.iter().peekable();

        while let Some(key) = keys.next() {
            write!(f, "inline:{key}")?;

            if keys.peek().is_some() {
                write!(f, ";")?;
            }
        }

        for param in &self.params {
            write!(f, " {param}")?;
        }

        Ok(())
    }
}

macro_rules! suite {
    ($($suite:ident),* $(,)?) => {
        /// Crypto suite names from the IANA SDP security descriptions registry
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        #[allow(non_camel_case_types)]
        pub enum SrtpSuite {
            $($suite,)*
            Ext(String),
        }

        impl SrtpSuite {
            /// Map a suite name to its enum value. Suite names are case
            /// sensitive on the wire, unknown names are kept in [`Ext`](Self::Ext).
            pub fn from_name(name: &str) -> Self {
                match name {
                    $(stringify!($suite) => Self::$suite,)*
                    _ => Self::Ext(name.to_string()),
                }
            }

            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$suite => stringify!($suite),)*
                    Self::Ext(ext) => ext,
                }
            }
        }

        impl fmt::Display for SrtpSuite {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

suite! {
    AES_CM_128_HMAC_SHA1_80,
    AES_CM_128_HMAC_SHA1_32,
    F8_128_HMAC_SHA1_80,
    AES_192_CM_HMAC_SHA1_80,
    AES_192_CM_HMAC_SHA1_32,
    AES_256_CM_HMAC_SHA1_80,
    AES_256_CM_HMAC_SHA1_32,
    AEAD_AES_128_GCM,
    AEAD_AES_256_GCM,
}

impl SrtpSuite {
    /// Master key and salt lengths of the suite in bytes
    pub fn key_and_salt_len(&self) -> Option<(usize, usize)> {
        match self {
            SrtpSuite::AES_CM_128_HMAC_SHA1_80
            | SrtpSuite::AES_CM_128_HMAC_SHA1_32
            | SrtpSuite::F8_128_HMAC_SHA1_80 => Some((16, 14)),
            SrtpSuite::AES_192_CM_HMAC_SHA1_80 | SrtpSuite::AES_192_CM_HMAC_SHA1_32 => {
                Some((24, 14))
            }
            SrtpSuite::AES_256_CM_HMAC_SHA1_80 | SrtpSuite::AES_256_CM_HMAC_SHA1_32 => {
                Some((32, 14))
            }
            SrtpSuite::AEAD_AES_128_GCM => Some((16, 12)),
            SrtpSuite::AEAD_AES_256_GCM => Some((32, 12)),
            SrtpSuite::Ext(_) => None,
        }
    }
}

/// Parameters for an SRTP session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SrtpSessionParam {
    /// SRTP messages are not encrypted
    UnencryptedSrtp,
    /// SRTCP messages are not encrypted
    UnencryptedSrtcp,
    /// SRTP messages are not authenticated
    UnauthenticatedSrtp,
    /// Unknown parameter
    Ext(String),
}

impl fmt::Display for SrtpSessionParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SrtpSessionParam::UnencryptedSrtp => write!(f, "UNENCRYPTED_SRTP"),
            SrtpSessionParam::UnencryptedSrtcp => write!(f, "UNENCRYPTED_SRTCP"),
            SrtpSessionParam::UnauthenticatedSrtp => write!(f, "UNAUTHENTICATED_SRTP"),
            SrtpSessionParam::Ext(ext) => write!(f, "{ext}"),
        }
    }
}

/// Keying material of a crypto attribute (`inline:` key parameter)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtpKeyingMaterial {
    /// Concatenated master key and salt, base64 encoded
    pub key_and_salt: String,

    /// Master key lifetime (max number of SRTP/SRTCP packets using this master key)
    pub lifetime: Option<u32>,

    /// Master key index and length of the MKI field in SRTP packets
    pub mki: Option<(u32, u32)>,
}

impl SrtpKeyingMaterial {
    pub fn new(key_and_salt: String) -> Self {
        Self {
            key_and_salt,
            lifetime: None,
            mki: None,
        }
    }
}

impl fmt::Display for SrtpKeyingMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_and_salt)?;

        if let Some(lifetime) = self.lifetime {
            if lifetime.is_power_of_two() {
                write!(f, "|2^{}", lifetime.trailing_zeros())?;
            } else {
                write!(f, "|{lifetime}")?;
            }
        }

        if let Some((mki, mki_length)) = self.mki {
            write!(f, "|{mki}:{mki_length}")?;
        }

        Ok(())
    }
}
