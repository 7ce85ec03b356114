//! The key/certificate primitive layer as free functions.
//!
//! Everything here is pure with respect to external state: no file or network
//! I/O, only randomness.

use x509_cert::serial_number::SerialNumber;

use crate::cert::Certificate;
use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::params::Validity;
use crate::csr::SigningRequest;
use crate::error::Result;
use crate::issuer::{Issuer, SigningAuthority};
use crate::key::KeyPair;
use crate::tbs_certificate::random_serial_number;

pub fn generate_key_pair(bits: usize) -> Result<KeyPair> {
    KeyPair::generate_rsa(bits)
}

pub fn create_self_signed_certificate(
    key: &KeyPair,
    common_name: &str,
    validity_days: i64,
) -> Result<Certificate> {
    Certificate::new_self_signed(key, common_name, validity_days)
}

pub fn create_signing_request(key: &KeyPair, common_name: &str) -> Result<SigningRequest> {
    SigningRequest::new(key, common_name)
}

/// Signs `csr` as a client certificate under the given CA, with a random serial.
pub fn sign_certificate(
    csr: &SigningRequest,
    ca_key: &KeyPair,
    ca_certificate: &Certificate,
    validity_days: i64,
) -> Result<Certificate> {
    let authority = SigningAuthority::new(ca_certificate.clone(), ca_key.clone())?;
    sign_certificate_with_serial(csr, &authority, validity_days, random_serial_number()?)
}

/// Like [`sign_certificate`], with a serial the caller has already reserved.
pub fn sign_certificate_with_serial(
    csr: &SigningRequest,
    authority: &SigningAuthority,
    validity_days: i64,
    serial_number: SerialNumber,
) -> Result<Certificate> {
    authority.sign_request(
        csr,
        vec![ExtendedKeyUsageOption::ClientAuth],
        Validity::for_days(validity_days)?,
        serial_number,
    )
}

pub fn export_pkcs12(
    key: &KeyPair,
    certificate: &Certificate,
    ca_certificate: &Certificate,
    password: &str,
) -> Result<Vec<u8>> {
    crate::pkcs12::export(key, certificate, ca_certificate, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CertDeskError;

    #[test]
    fn sign_certificate_rejects_foreign_ca_key() {
        let ca_key = generate_key_pair(2048).unwrap();
        let ca_cert = create_self_signed_certificate(&ca_key, "acme", 3650).unwrap();
        let impostor = generate_key_pair(2048).unwrap();
        let csr = create_signing_request(&impostor, "alice").unwrap();

        let err = sign_certificate(&csr, &impostor, &ca_cert, 365).unwrap_err();
        assert!(matches!(err, CertDeskError::CryptoError(_)));
    }

    #[test]
    fn out_of_range_lifetimes_are_rejected() {
        let key = generate_key_pair(2048).unwrap();
        for days in [0, -10, 4_000_000] {
            let err = create_self_signed_certificate(&key, "acme", days).unwrap_err();
            assert!(matches!(err, CertDeskError::InvalidInput(_)), "{days}");
        }

        let ca_cert = create_self_signed_certificate(&key, "acme", 3650).unwrap();
        let client_key = generate_key_pair(2048).unwrap();
        let csr = create_signing_request(&client_key, "alice").unwrap();
        let err = sign_certificate(&csr, &key, &ca_cert, -1).unwrap_err();
        assert!(matches!(err, CertDeskError::InvalidInput(_)));
    }

    #[test]
    fn export_requires_the_issuing_ca() {
        let ca_key = generate_key_pair(2048).unwrap();
        let ca_cert = create_self_signed_certificate(&ca_key, "acme", 3650).unwrap();
        let other_key = generate_key_pair(2048).unwrap();
        let other_ca = create_self_signed_certificate(&other_key, "globex", 3650).unwrap();
        let client_key = generate_key_pair(2048).unwrap();
        let csr = create_signing_request(&client_key, "alice").unwrap();
        let cert = sign_certificate(&csr, &ca_key, &ca_cert, 365).unwrap();

        assert!(export_pkcs12(&client_key, &cert, &ca_cert, "pw").is_ok());
        let err = export_pkcs12(&client_key, &cert, &other_ca, "pw").unwrap_err();
        assert!(matches!(err, CertDeskError::CryptoError(_)));
    }

    #[test]
    fn successive_signatures_get_distinct_serials() {
        let ca_key = generate_key_pair(2048).unwrap();
        let ca_cert = create_self_signed_certificate(&ca_key, "acme", 3650).unwrap();
        let client_key = generate_key_pair(2048).unwrap();
        let csr = create_signing_request(&client_key, "alice").unwrap();

        let first = sign_certificate(&csr, &ca_key, &ca_cert, 365).unwrap();
        let second = sign_certificate(&csr, &ca_key, &ca_cert, 365).unwrap();
        assert_ne!(first.serial_number(), second.serial_number());
        assert_eq!(
            (first.not_after().unwrap() - first.not_before().unwrap()).whole_days(),
            365
        );
    }
}
