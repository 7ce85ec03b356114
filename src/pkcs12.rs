//! PKCS#12 export and import.
//!
//! A container holds the PKCS#8 key in a shrouded key bag, the leaf and CA
//! certificates in an encrypted certificate bag, and a password-derived MAC
//! over the authenticated safe.

use p12::PFX;

use crate::cert::Certificate;
use crate::error::{CertDeskError, Result};
use crate::key::KeyPair;

/// Serializes `key`, `certificate` and the issuing `ca_certificate` into a
/// password-protected PKCS#12 container.
///
/// Fails when the key is not the one `certificate` certifies, when
/// `ca_certificate` did not issue `certificate`, or when the password is empty.
pub fn export(
    key: &KeyPair,
    certificate: &Certificate,
    ca_certificate: &Certificate,
    password: &str,
) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(CertDeskError::InvalidInput(
            "PKCS#12 export password must not be empty".to_string(),
        ));
    }
    if !key.matches(&certificate.public_key()?) {
        return Err(CertDeskError::CryptoError(
            "private key does not match the certificate's public key".to_string(),
        ));
    }

    if certificate.issuer() != ca_certificate.subject() {
        return Err(CertDeskError::CryptoError(format!(
            "certificate issuer {} is not the CA subject {}",
            certificate.issuer(),
            ca_certificate.subject()
        )));
    }
    certificate
        .verify_signed_by(&ca_certificate.public_key()?)
        .map_err(|e| {
            CertDeskError::CryptoError(format!("certificate was not signed by the CA key: {e}"))
        })?;

    let cert_der = certificate.to_der()?;
    let key_der = key.to_pkcs8_der()?;
    let ca_der = ca_certificate.to_der()?;
    let friendly_name = certificate.subject_common_name();

    let pfx = PFX::new(&cert_der, &key_der, Some(ca_der.as_slice()), password, &friendly_name)
        .ok_or_else(|| CertDeskError::CryptoError("failed to build PKCS#12 container".to_string()))?;
    Ok(pfx.to_der())
}

/// The contents of a decrypted PKCS#12 container.
#[derive(Debug, Clone)]
pub struct Pkcs12Bundle {
    pub key: KeyPair,
    pub certificate: Certificate,
    pub ca_certificates: Vec<Certificate>,
}

impl Pkcs12Bundle {
    /// Opens a container produced by [`export`].
    ///
    /// The MAC is checked first, so a wrong password is reported as such
    /// rather than as a decryption or parse failure.
    pub fn open(der: &[u8], password: &str) -> Result<Self> {
        let pfx = PFX::parse(der)
            .map_err(|e| CertDeskError::CryptoError(format!("malformed PKCS#12 container: {e:?}")))?;

        if !pfx.verify_mac(password) {
            return Err(CertDeskError::CryptoError(
                "PKCS#12 MAC verification failed (wrong password?)".to_string(),
            ));
        }

        let key_der = pfx
            .key_bags(password)
            .map_err(|e| CertDeskError::CryptoError(format!("PKCS#12 key bag: {e:?}")))?
            .into_iter()
            .next()
            .ok_or_else(|| CertDeskError::CryptoError("PKCS#12 container holds no key".to_string()))?;
        let key = KeyPair::import_from_pkcs8_der(&key_der)?;

        let mut certificate = None;
        let mut ca_certificates = Vec::new();
        for cert_der in pfx
            .cert_x509_bags(password)
            .map_err(|e| CertDeskError::CryptoError(format!("PKCS#12 certificate bag: {e:?}")))?
        {
            let cert = Certificate::from_der(&cert_der)?;
            if certificate.is_none() && key.matches(&cert.public_key()?) {
                certificate = Some(cert);
            } else {
                ca_certificates.push(cert);
            }
        }

        let certificate = certificate.ok_or_else(|| {
            CertDeskError::CryptoError("PKCS#12 container holds no certificate for its key".to_string())
        })?;

        Ok(Pkcs12Bundle {
            key,
            certificate,
            ca_certificates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::ExtendedKeyUsageOption;
    use crate::cert::params::Validity;
    use crate::csr::SigningRequest;
    use crate::issuer::{Issuer, SigningAuthority};
    use crate::tbs_certificate::random_serial_number;

    fn issued() -> (SigningAuthority, KeyPair, Certificate) {
        let ca_key = KeyPair::generate_rsa(2048).unwrap();
        let ca_cert = Certificate::new_self_signed(&ca_key, "acme", 3650).unwrap();
        let ca = SigningAuthority::new(ca_cert, ca_key).unwrap();

        let key = KeyPair::generate_rsa(2048).unwrap();
        let request = SigningRequest::new(&key, "alice").unwrap();
        let cert = ca
            .sign_request(
                &request,
                vec![ExtendedKeyUsageOption::ClientAuth],
                Validity::for_days(365).unwrap(),
                random_serial_number().unwrap(),
            )
            .unwrap();
        (ca, key, cert)
    }

    #[test]
    fn open_with_export_password() {
        let (ca, key, cert) = issued();
        let der = export(&key, &cert, ca.certificate(), "s3cret").unwrap();

        let bundle = Pkcs12Bundle::open(&der, "s3cret").unwrap();
        assert!(bundle.key.matches(key.public_key()));
        assert_eq!(bundle.certificate, cert);
        assert_eq!(bundle.ca_certificates, vec![ca.certificate().clone()]);
    }

    #[test]
    fn wrong_password_fails() {
        let (ca, key, cert) = issued();
        let der = export(&key, &cert, ca.certificate(), "s3cret").unwrap();

        let err = Pkcs12Bundle::open(&der, "changeit").unwrap_err();
        assert!(matches!(err, CertDeskError::CryptoError(_)));
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let (ca, _key, cert) = issued();
        let err = export(ca.key(), &cert, ca.certificate(), "s3cret").unwrap_err();
        assert!(matches!(err, CertDeskError::CryptoError(_)));
    }

    #[test]
    fn unrelated_ca_certificate_is_rejected() {
        let (_ca, key, cert) = issued();
        let other_key = KeyPair::generate_rsa(2048).unwrap();
        let other = Certificate::new_self_signed(&other_key, "globex", 3650).unwrap();

        let err = export(&key, &cert, &other, "s3cret").unwrap_err();
        assert!(matches!(err, CertDeskError::CryptoError(_)));
    }

    #[test]
    fn ca_with_same_name_but_other_key_is_rejected() {
        let (_ca, key, cert) = issued();
        let other_key = KeyPair::generate_rsa(2048).unwrap();
        let impostor = Certificate::new_self_signed(&other_key, "acme", 3650).unwrap();

        let err = export(&key, &cert, &impostor, "s3cret").unwrap_err();
        assert!(matches!(err, CertDeskError::CryptoError(_)));
    }

    #[test]
    fn empty_password_is_rejected() {
        let (ca, key, cert) = issued();
        let err = export(&key, &cert, ca.certificate(), "").unwrap_err();
        assert!(matches!(err, CertDeskError::InvalidInput(_)));
    }
}
