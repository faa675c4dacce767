#![forbid(unsafe_code)]

/// Errors produced by the Solna XML Security library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("blacklisted algorithm: {0}")]
    BlacklistedAlgorithm(String),

    #[error("invalid type of key for algorithm: {0}")]
    InvalidKey(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("digest mismatch for reference: {0}")]
    DigestMismatch(String),

    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("reference validation failed: {0}")]
    ReferenceValidation(String),

    #[error("PEM error: {0}")]
    Pem(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("no signature found")]
    NoSignatureFound,

    #[error("no encrypted data found")]
    NoEncryptedData,

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("too many elements: {0}")]
    TooManyElements(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown or unsupported identifier, bad canonicalization choice.
    Configuration,
    /// Blacklisted algorithm or algorithm/key-type mismatch.
    Policy,
    /// Digest or signature mismatch, malformed PEM/DER.
    Integrity,
    /// Unreadable file or failing native primitive.
    Resource,
    /// Missing, duplicated or malformed XML structure.
    Structural,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_)
            | Self::UnsupportedAlgorithm(_)
            | Self::Canonicalization(_) => ErrorKind::Configuration,
            Self::BlacklistedAlgorithm(_) | Self::InvalidKey(_) => ErrorKind::Policy,
            Self::DigestMismatch(_)
            | Self::SignatureVerificationFailed(_)
            | Self::ReferenceValidation(_)
            | Self::Pem(_)
            | Self::Certificate(_)
            | Self::Base64(_) => ErrorKind::Integrity,
            Self::Crypto(_) | Self::Io(_) => ErrorKind::Resource,
            Self::XmlParse(_)
            | Self::NoSignatureFound
            | Self::NoEncryptedData
            | Self::MissingElement(_)
            | Self::MissingAttribute(_)
            | Self::TooManyElements(_) => ErrorKind::Structural,
        }
    }

    /// Whether this error reports that signed or encrypted data failed an
    /// integrity check.
    pub fn is_integrity_failure(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }
}

pub type Result<T> = std::result::Result<T, Error>;
