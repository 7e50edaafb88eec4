use srtp::SrtpError;

/// Errors surfaced by the SRTP transport layer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The SDP negotiation demands crypto but none is configured or offered
    #[error("SDP requires a crypto attribute but none is available")]
    SdpRequiresCrypto,

    /// A crypto suite name is not in the registry
    #[error("crypto suite is not supported")]
    UnsupportedCryptoSuite,

    /// An offered key is shorter than the suite's declared key + salt length
    #[error("SRTP key length does not match the crypto suite")]
    InvalidKeyLength,

    /// An outgoing packet exceeds the transmit buffer
    #[error("packet is too big for the transmit buffer")]
    PacketTooBig,

    /// Protect/unprotect was invoked before the session was started
    #[error("SRTP session has not been started")]
    InvalidOperation,

    /// DTLS-SRTP keying was requested but is not compiled in
    #[error("DTLS-SRTP keying is not supported")]
    DtlsNotSupported,

    /// Impossible path, used as the last-error sentinel during negotiation
    #[error("unexpected SRTP transport state")]
    Bug,

    /// Translated failure of the SRTP primitive library
    #[error("SRTP protection failed: {0}")]
    Srtp(#[from] SrtpError),

    /// The remote SDP does not carry a usable DTLS setup attribute
    #[cfg(feature = "dtls-srtp")]
    #[error("invalid or missing setup attribute in remote SDP")]
    InvalidSetupAttribute,

    /// The remote SDP does not carry a DTLS certificate fingerprint
    #[cfg(feature = "dtls-srtp")]
    #[error("remote SDP does not contain a DTLS fingerprint")]
    MissingRemoteFingerprint,

    /// Failed to set up the DTLS context or handshake state
    #[cfg(feature = "dtls-srtp")]
    #[error("failed to set up DTLS: {0}")]
    DtlsSetup(#[from] openssl::error::ErrorStack),

    /// The DTLS handshake failed
    #[cfg(feature = "dtls-srtp")]
    #[error("DTLS handshake failed: {0}")]
    DtlsHandshake(#[from] openssl::ssl::Error),

    /// The completed DTLS handshake did not negotiate an SRTP profile
    #[cfg(feature = "dtls-srtp")]
    #[error("DTLS session is missing the negotiated SRTP profile")]
    MissingSrtpProfile,

    /// Failed to export the SRTP keying material from the DTLS session
    #[cfg(feature = "dtls-srtp")]
    #[error("failed to export DTLS keying material: {0}")]
    ExportKeyingMaterial(#[source] openssl::error::ErrorStack),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_errors_keep_their_status_code() {
        let err = Error::from(SrtpError::ReplayOld);
        assert!(matches!(err, Error::Srtp(SrtpError::ReplayOld)));
        assert_eq!(
            err.to_string(),
            "SRTP protection failed: replay check failed (index too old)"
        );

        let unknown = Error::from(SrtpError::Other(42));
        assert_eq!(unknown.to_string(), "SRTP protection failed: libsrtp error 42");
    }
}
