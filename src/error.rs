//! use certdesk::error::CertDeskError;

use thiserror::Error;

/// Represents errors that can occur while operating the certificate authority.
///
/// Every core operation reports one of these kinds so that callers can tell
/// a bad request apart from a missing CA, a name collision, a cryptographic
/// failure, or a persistence failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertDeskError {
    /// Malformed or unsafe input, such as a CA or client name outside the allowed set.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The referenced certificate authority does not exist.
    #[error("Certificate authority not found: {0}")]
    NotFound(String),

    /// A certificate authority with the same name already exists.
    #[error("Certificate authority already exists: {0}")]
    AlreadyExists(String),

    /// Key generation, signing, verification, encoding or packaging failure.
    #[error("Crypto error: {0}")]
    CryptoError(String),

    /// Persistence failure, e.g. disk I/O.
    #[error("Store error: {0}")]
    StoreError(String),
}

pub type Result<T> = std::result::Result<T, CertDeskError>;

impl CertDeskError {
    pub(crate) fn crypto(context: &str, err: impl std::fmt::Display) -> Self {
        CertDeskError::CryptoError(format!("{context}: {err}"))
    }

    pub(crate) fn store(context: &str, err: impl std::fmt::Display) -> Self {
        CertDeskError::StoreError(format!("{context}: {err}"))
    }
}

impl From<der::Error> for CertDeskError {
    /// Converts a `der::Error` into a `CertDeskError`.
    fn from(err: der::Error) -> Self {
        CertDeskError::CryptoError(format!("DER encoding: {err}"))
    }
}

impl From<rsa::Error> for CertDeskError {
    fn from(err: rsa::Error) -> Self {
        CertDeskError::CryptoError(format!("RSA: {err}"))
    }
}

impl From<rsa::signature::Error> for CertDeskError {
    fn from(err: rsa::signature::Error) -> Self {
        CertDeskError::CryptoError(format!("signature: {err}"))
    }
}

impl From<pkcs8::Error> for CertDeskError {
    fn from(err: pkcs8::Error) -> Self {
        CertDeskError::CryptoError(format!("PKCS#8: {err}"))
    }
}

impl From<pkcs8::spki::Error> for CertDeskError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CertDeskError::CryptoError(format!("SPKI: {err}"))
    }
}

impl From<pem::PemError> for CertDeskError {
    fn from(err: pem::PemError) -> Self {
        CertDeskError::CryptoError(format!("PEM: {err}"))
    }
}

impl From<std::io::Error> for CertDeskError {
    fn from(err: std::io::Error) -> Self {
        CertDeskError::StoreError(err.to_string())
    }
}
