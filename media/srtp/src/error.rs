use core::fmt;

macro_rules! error_codes {
    ($($variant:ident, $code:literal, $msg:literal;)*) => {
        /// Catch-all error type returned by most functions
        ///
        /// Carries the libsrtp status code taxonomy so callers can translate
        /// or match on specific conditions (e.g. the replay variants).
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum SrtpError {
            $(#[doc = $msg] $variant,)*
            /// Status code outside the known set
            Other(i32),
        }

        impl SrtpError {
            /// The numeric libsrtp status code
            pub fn code(&self) -> i32 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Other(code) => *code,
                }
            }

            /// Human readable description of the status code
            pub fn message(&self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some($msg),)*
                    Self::Other(..) => None,
                }
            }
        }

        impl fmt::Display for SrtpError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.message() {
                    Some(msg) => f.write_str(msg),
                    None => write!(f, "libsrtp error {}", self.code()),
                }
            }
        }
    };
}

error_codes! {
    Fail, 1, "unspecified failure";
    BadParam, 2, "unsupported parameter";
    AllocFail, 3, "couldn't allocate memory";
    DeallocFail, 4, "couldn't deallocate properly";
    InitFail, 5, "couldn't initialize";
    Terminus, 6, "can't process as much data as requested";
    AuthFail, 7, "authentication failure";
    CipherFail, 8, "cipher failure";
    ReplayFail, 9, "replay check failed (bad index)";
    ReplayOld, 10, "replay check failed (index too old)";
    AlgoFail, 11, "algorithm failed test routine";
    NoSuchOp, 12, "unsupported operation";
    NoCtx, 13, "no appropriate context found";
    CantCheck, 14, "unable to perform desired validation";
    KeyExpired, 15, "can't use key any more";
    NonceBad, 18, "nonce check failed";
    ParseErr, 21, "error parsing data";
    EncodeErr, 22, "error encoding data";
    BadMki, 25, "error MKI present in packet is invalid";
    PktIdxOld, 26, "packet index is too old to consider";
    PktIdxAdv, 27, "packet index advanced, reset needed";
}

impl std::error::Error for SrtpError {}
