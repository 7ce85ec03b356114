use der::asn1::BitString;
use der::{Decode, Encode};
use x509_cert::request::{CertReq, CertReqInfo, Version};

use crate::cert::params::DistinguishedName;
use crate::cert::sha256_with_rsa;
use crate::error::{CertDeskError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::pem_utils::{der_to_pem, pem_to_der};

const PEM_LABEL: &str = "CERTIFICATE REQUEST";

/// A PKCS#10 certificate signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pub inner: CertReq,
}

impl SigningRequest {
    /// Builds a request for `common_name` carrying the public half of `key`,
    /// signed with the private half.
    pub fn new(key: &KeyPair, common_name: &str) -> Result<Self> {
        let info = CertReqInfo {
            version: Version::V1,
            subject: DistinguishedName::common_name(common_name).as_x509_name()?,
            public_key: key.as_spki()?,
            attributes: Default::default(),
        };

        let signature = key.sign_data(&info.to_der()?)?;

        Ok(SigningRequest {
            inner: CertReq {
                info,
                algorithm: sha256_with_rsa(),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.info.subject)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.info.public_key)
    }

    /// Checks the request's self-signature against its embedded public key.
    ///
    /// A request that fails this check may carry a public key its sender does
    /// not hold, so it must never be signed.
    pub fn verify(&self) -> Result<()> {
        if self.inner.algorithm.oid != const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION {
            return Err(CertDeskError::CryptoError(format!(
                "unsupported signing request algorithm {}",
                self.inner.algorithm.oid
            )));
        }

        let info = self.inner.info.to_der()?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertDeskError::CryptoError("signing request signature has unused bits".to_string())
        })?;

        self.public_key()?
            .verify(&info, signature)
            .map_err(|_| {
                CertDeskError::CryptoError(
                    "signing request signature does not match its public key".to_string(),
                )
            })
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(der_to_pem(&self.to_der()?, PEM_LABEL))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(SigningRequest {
            inner: CertReq::from_der(der)?,
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&pem_to_der(pem, PEM_LABEL)?)
    }
}
