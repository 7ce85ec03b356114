use der::Encode;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;

use crate::cert::Certificate;
use crate::cert::extensions::{self, ExtendedKeyUsageOption};
use crate::cert::params::{CertificationRequestInfo, Validity};
use crate::cert::sha256_with_rsa;
use crate::csr::SigningRequest;
use crate::error::{CertDeskError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
pub trait Issuer {
    /// Returns the name written into the `issuer` field of issued certificates.
    fn issuer_name(&self) -> Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// CA requests get `keyCertSign`/`cRLSign`; end-entity requests get
    /// `digitalSignature`/`keyEncipherment` plus any extended key usages.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        validity: Validity,
        serial_number: SerialNumber,
    ) -> Result<Certificate> {
        let mut extensions = extensions::profile(
            cert_request.is_ca,
            &cert_request.subject_public_key,
            self.signing_key().public_key(),
            &cert_request.usages,
        )?;
        extensions.extend(cert_request.extensions.iter().cloned());

        let tbs_cert = TbsCertificate {
            serial_number,
            issuer: self.issuer_name(),
            validity,
            subject: cert_request.subject.as_x509_name()?,
            subject_public_key: cert_request.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = self.signing_key().sign_data(&tbs_cert_inner.to_der()?)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: sha256_with_rsa(),
            signature: der::asn1::BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner: cert_inner })
    }

    /// Signs a PKCS#10 request after checking its self-signature.
    ///
    /// The subject and public key are taken from the request; nothing else
    /// in it (attributes, requested extensions) is honoured.
    fn sign_request(
        &self,
        request: &SigningRequest,
        usages: Vec<ExtendedKeyUsageOption>,
        validity: Validity,
        serial_number: SerialNumber,
    ) -> Result<Certificate> {
        request.verify()?;

        let cert_info = CertificationRequestInfo::builder()
            .subject(request.subject())
            .subject_public_key(request.public_key()?)
            .usages(usages)
            .build();

        self.issue(&cert_info, validity, serial_number)
    }
}

/// A CA certificate together with its private key.
///
/// Construction checks that the key is the one the certificate certifies, so
/// every certificate this issuer signs chains to `cert`.
#[derive(Debug, Clone)]
pub struct SigningAuthority {
    cert: Certificate,
    key: KeyPair,
}

impl SigningAuthority {
    pub fn new(cert: Certificate, key: KeyPair) -> Result<Self> {
        let cert_key: PublicKey = cert.public_key()?;
        if !key.matches(&cert_key) {
            return Err(CertDeskError::CryptoError(
                "CA private key does not match the CA certificate".to_string(),
            ));
        }
        Ok(SigningAuthority { cert, key })
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }
}

impl Issuer for SigningAuthority {
    fn issuer_name(&self) -> Name {
        // The name of the issuer is the subject of the certificate
        self.cert.subject().clone()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }
}
