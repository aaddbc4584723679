//! Error types for the certificate validation pipeline

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage in which an error was raised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// SSH certificate decoding
    Decode,
    /// Embedded X.509 extraction
    Extract,
    /// X.509 chain verification
    Verify,
    /// Subject common name matching
    Match,
    /// X.509 to SSH public key conversion
    Rederive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Extract => "extract",
            Stage::Verify => "verify",
            Stage::Match => "match",
            Stage::Rederive => "rederive",
        };
        f.write_str(name)
    }
}

/// Main error type for certificate validation
///
/// Every variant is terminal. Callers must treat any of them as a denied
/// authentication.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH certificate body does not parse as a certificate
    #[error("Failed to parse certificate: {0}")]
    DecodeError(String),

    /// The body parsed as a bare public key rather than a certificate
    #[error("Failed to cast to certificate: found a bare {0} key")]
    TypeMismatchError(String),

    /// The SSH certificate carries no embedded X.509 extension
    #[error("Certificate doesn't contain valid x509: missing '{0}' extension")]
    MissingExtensionError(String),

    /// The extension value is not valid base64
    #[error("Unable to decode X509 certificate: {0}")]
    TransportDecodeError(#[from] base64::DecodeError),

    /// The decoded bytes are not a DER X.509 certificate
    #[error("Unable to parse X509 certificate: {0}")]
    X509ParseError(String),

    /// The root CA bundle could not be read
    #[error("Unable to read root CA {}: {source}", .path.display())]
    RootLoadError {
        /// Path of the bundle
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The root CA bundle holds no usable certificate
    #[error("Failed to append root CA to pool: {0}")]
    RootParseError(String),

    /// No valid chain from the X.509 certificate to the root pool
    #[error("Failed to verify X509 certificate: {0}")]
    ChainVerificationError(String),

    /// The subject common name differs from the requested login name
    #[error("Certificate does not match requested user name: {common_name}, {requested}")]
    IdentityMismatchError {
        /// Common name found in the certificate subject
        common_name: String,
        /// Login name that was requested
        requested: String,
    },

    /// The X.509 public key has no SSH representation
    #[error("Unable to obtain SSH public key from X509 public key: {0}")]
    KeyConversionError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a DecodeError with detailed message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Create an X509ParseError with detailed message
    pub fn x509_parse(msg: impl Into<String>) -> Self {
        Self::X509ParseError(msg.into())
    }

    /// Create a RootParseError with detailed message
    pub fn root_parse(msg: impl Into<String>) -> Self {
        Self::RootParseError(msg.into())
    }

    /// Create a ChainVerificationError with detailed message
    pub fn chain(msg: impl Into<String>) -> Self {
        Self::ChainVerificationError(msg.into())
    }

    /// Create a KeyConversionError with detailed message
    pub fn key_conversion(msg: impl Into<String>) -> Self {
        Self::KeyConversionError(msg.into())
    }

    /// Stage of the pipeline that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            Error::DecodeError(_) | Error::TypeMismatchError(_) => Stage::Decode,
            Error::MissingExtensionError(_)
            | Error::TransportDecodeError(_)
            | Error::X509ParseError(_) => Stage::Extract,
            Error::RootLoadError { .. }
            | Error::RootParseError(_)
            | Error::ChainVerificationError(_) => Stage::Verify,
            Error::IdentityMismatchError { .. } => Stage::Match,
            Error::KeyConversionError(_) => Stage::Rederive,
        }
    }
}
