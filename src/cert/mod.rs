pub mod extensions;
pub mod params;

use der::asn1::AnyRef;
use der::{Decode, DecodePem, Encode, EncodePem};
use extensions::{BasicConstraints, CertificateExtension};
use params::{CertificationRequestInfo, DistinguishedName, ExtensionParam, Validity};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{CertDeskError, Result};
use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::{from_x509_time, random_serial_number, serial_to_hex};

/// `sha256WithRSAEncryption` with the explicit NULL parameters RFC 4055 asks for.
pub fn sha256_with_rsa() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
        parameters: Some(AnyRef::NULL.into()),
    }
}

/// A signed X.509 v3 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub inner: CertificateInner,
}

impl Certificate {
    /// Creates a self-signed certificate for `common_name`, marked as a CA.
    ///
    /// Subject and issuer are both `common_name` and the serial number is random.
    pub fn new_self_signed(key: &KeyPair, common_name: &str, validity_days: i64) -> Result<Self> {
        let cert_info = CertificationRequestInfo::builder()
            .subject(DistinguishedName::common_name(common_name))
            .subject_public_key(PublicKey::from_key_pair(key))
            .is_ca(true)
            .build();

        // issuer name and signing key both come from the subject
        let self_issuer = SelfIssuer {
            name: cert_info.subject.as_x509_name()?,
            key,
        };

        self_issuer.issue(
            &cert_info,
            Validity::for_days(validity_days)?,
            random_serial_number()?,
        )
    }

    /// DER encoding of the whole certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    /// `CERTIFICATE` PEM block.
    pub fn to_pem(&self) -> Result<String> {
        Ok(self.inner.to_pem(pkcs8::LineEnding::LF)?)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Certificate {
            inner: CertificateInner::from_der(der)?,
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Certificate {
            inner: CertificateInner::from_pem(pem)?,
        })
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn subject_common_name(&self) -> String {
        DistinguishedName::from_x509_name(self.subject()).common_name
    }

    pub fn issuer_common_name(&self) -> String {
        DistinguishedName::from_x509_name(self.issuer()).common_name
    }

    pub fn serial_number(&self) -> &SerialNumber {
        &self.inner.tbs_certificate.serial_number
    }

    pub fn serial_hex(&self) -> String {
        serial_to_hex(self.serial_number())
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    pub fn not_before(&self) -> Result<OffsetDateTime> {
        from_x509_time(&self.inner.tbs_certificate.validity.not_before)
    }

    pub fn not_after(&self) -> Result<OffsetDateTime> {
        from_x509_time(&self.inner.tbs_certificate.validity.not_after)
    }

    /// Returns the extensions carried by the certificate.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Decodes the first extension of type `E`, if present.
    pub fn extension<E: CertificateExtension>(&self) -> Option<Result<E>> {
        self.extensions()
            .iter()
            .find(|ext| ext.oid == E::OID)
            .map(|ext| ext.to_extension())
    }

    pub fn is_ca(&self) -> bool {
        matches!(
            self.extension::<BasicConstraints>(),
            Some(Ok(BasicConstraints { is_ca: true, .. }))
        )
    }

    /// Checks that the certificate was signed by the private half of `issuer_key`.
    pub fn verify_signed_by(&self, issuer_key: &PublicKey) -> Result<()> {
        if self.inner.signature_algorithm.oid != const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION {
            return Err(CertDeskError::CryptoError(format!(
                "unsupported certificate signature algorithm {}",
                self.inner.signature_algorithm.oid
            )));
        }
        let tbs = self.inner.tbs_certificate.to_der()?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertDeskError::CryptoError("certificate signature has unused bits".to_string())
        })?;
        issuer_key.verify(&tbs, signature)
    }

    /// True when subject equals issuer and the certificate verifies under its own key.
    pub fn is_self_signed(&self) -> bool {
        self.subject() == self.issuer()
            && self
                .public_key()
                .and_then(|key| self.verify_signed_by(&key))
                .is_ok()
    }
}

// Signs with the subject's own key
struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }
}
