//! Client certificate issuance.
//!
//! [`IssuanceService`] turns a CA name and a client name into a signed client
//! certificate, its fresh private key and a password-protected PKCS#12
//! package, then hands the result to the store's repository.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::info;

use crate::cert::Certificate;
use crate::error::{CertDeskError, Result};
use crate::key::KeyPair;
use crate::name::validate_name;
use crate::pki;
use crate::store::{BundleFiles, BundlePaths, CaRepository, CaStore};

/// Length of generated export passwords.
pub const EXPORT_PASSWORD_LEN: usize = 24;

/// An issued client certificate and everything packaged with it.
///
/// The export password is only ever held here; it is not persisted.
#[derive(Clone)]
pub struct ClientCertificateBundle {
    client_name: String,
    ca_name: String,
    key: KeyPair,
    certificate: Certificate,
    ca_certificate: Certificate,
    package: Vec<u8>,
    export_password: String,
    files: Option<BundlePaths>,
}

impl std::fmt::Debug for ClientCertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificateBundle")
            .field("client_name", &self.client_name)
            .field("ca_name", &self.ca_name)
            .field("serial", &self.certificate.serial_hex())
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

impl ClientCertificateBundle {
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn ca_name(&self) -> &str {
        &self.ca_name
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn ca_certificate(&self) -> &Certificate {
        &self.ca_certificate
    }

    /// PKCS#12 DER bytes.
    pub fn package(&self) -> &[u8] {
        &self.package
    }

    pub fn export_password(&self) -> &str {
        &self.export_password
    }

    /// Where the repository wrote the bundle, if it writes files at all.
    pub fn files(&self) -> Option<&BundlePaths> {
        self.files.as_ref()
    }
}

/// Issues client certificates from the CAs of a [`CaStore`].
pub struct IssuanceService<R> {
    store: Arc<CaStore<R>>,
}

impl<R> Clone for IssuanceService<R> {
    fn clone(&self) -> Self {
        IssuanceService {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: CaRepository> IssuanceService<R> {
    pub fn new(store: Arc<CaStore<R>>) -> Self {
        IssuanceService { store }
    }

    pub fn store(&self) -> &CaStore<R> {
        &self.store
    }

    /// Issues a certificate for `client_name` under `ca_name` with a freshly
    /// generated export password.
    pub fn issue_client_certificate(
        &self,
        ca_name: &str,
        client_name: &str,
    ) -> Result<ClientCertificateBundle> {
        self.issue(ca_name, client_name, generate_export_password())
    }

    /// Like [`Self::issue_client_certificate`] but protects the package with
    /// `password`, which must not be empty.
    pub fn issue_client_certificate_with_password(
        &self,
        ca_name: &str,
        client_name: &str,
        password: &str,
    ) -> Result<ClientCertificateBundle> {
        if password.is_empty() {
            return Err(CertDeskError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        self.issue(ca_name, client_name, password.to_string())
    }

    fn issue(
        &self,
        ca_name: &str,
        client_name: &str,
        export_password: String,
    ) -> Result<ClientCertificateBundle> {
        let ca = self.store.get_ca(ca_name)?;
        validate_name("clientName", client_name)?;

        let policy = self.store.policy();
        let key = pki::generate_key_pair(policy.client_key_bits)?;
        let request = pki::create_signing_request(&key, client_name)?;
        let serial = self.store.allocate_serial(&ca)?;
        let certificate = pki::sign_certificate_with_serial(
            &request,
            ca.authority(),
            policy.client_validity_days,
            serial,
        )?;
        let package = pki::export_pkcs12(&key, &certificate, ca.certificate(), &export_password)?;

        let serial_hex = certificate.serial_hex();
        let key_pem = key.to_pkcs8_pem()?;
        let csr_pem = request.to_pem()?;
        let certificate_pem = certificate.to_pem()?;
        let files = self.store.repository().store_bundle(&BundleFiles {
            ca_name,
            client_name,
            serial_hex: &serial_hex,
            key_pem: &key_pem,
            csr_pem: &csr_pem,
            certificate_pem: &certificate_pem,
            package: &package,
        })?;

        info!(
            ca = %ca_name,
            client = %client_name,
            serial = %serial_hex,
            "issued client certificate"
        );

        Ok(ClientCertificateBundle {
            client_name: client_name.to_string(),
            ca_name: ca_name.to_string(),
            key,
            certificate,
            ca_certificate: ca.certificate().clone(),
            package,
            export_password,
            files,
        })
    }
}

fn generate_export_password() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(EXPORT_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::{BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption};
    use crate::pkcs12::Pkcs12Bundle;
    use crate::policy::CaPolicy;
    use crate::store::MemoryRepository;

    fn service() -> IssuanceService<MemoryRepository> {
        let store = CaStore::new(
            MemoryRepository::default(),
            CaPolicy::builder().ca_key_bits(2048).build(),
        );
        IssuanceService::new(Arc::new(store))
    }

    #[test]
    fn issued_certificate_chains_to_ca() {
        let service = service();
        let ca = service.store().create_ca("acme").unwrap();

        let bundle = service.issue_client_certificate("acme", "alice").unwrap();
        let cert = bundle.certificate();

        assert_eq!(cert.subject_common_name(), "alice");
        assert_eq!(cert.issuer(), ca.certificate().subject());
        cert.verify_signed_by(&ca.certificate().public_key().unwrap())
            .unwrap();
        assert!(!cert.is_ca());
        assert_eq!(
            cert.extension::<BasicConstraints>().unwrap().unwrap(),
            BasicConstraints {
                is_ca: false,
                max_path_length: None
            }
        );
        assert_eq!(
            cert.extension::<ExtendedKeyUsage>().unwrap().unwrap().usage,
            vec![ExtendedKeyUsageOption::ClientAuth]
        );
        assert!(bundle.key().matches(&cert.public_key().unwrap()));
        assert!(bundle.files().is_none());
    }

    #[test]
    fn repeated_issuance_is_distinct() {
        let service = service();
        service.store().create_ca("acme").unwrap();

        let first = service.issue_client_certificate("acme", "alice").unwrap();
        let second = service.issue_client_certificate("acme", "alice").unwrap();

        assert_ne!(
            first.certificate().serial_number(),
            second.certificate().serial_number()
        );
        assert_ne!(first.key().public_key(), second.key().public_key());
        assert_ne!(first.export_password(), second.export_password());
    }

    #[test]
    fn package_opens_with_returned_password_only() {
        let service = service();
        service.store().create_ca("acme").unwrap();
        let bundle = service.issue_client_certificate("acme", "alice").unwrap();

        assert_eq!(bundle.export_password().len(), EXPORT_PASSWORD_LEN);
        assert!(bundle
            .export_password()
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));

        let opened = Pkcs12Bundle::open(bundle.package(), bundle.export_password()).unwrap();
        assert_eq!(&opened.certificate, bundle.certificate());
        assert!(opened.key.matches(bundle.key().public_key()));
        assert_eq!(opened.ca_certificates, vec![bundle.ca_certificate().clone()]);

        assert!(Pkcs12Bundle::open(bundle.package(), "changeit").is_err());
    }

    #[test]
    fn caller_supplied_password() {
        let service = service();
        service.store().create_ca("acme").unwrap();

        let bundle = service
            .issue_client_certificate_with_password("acme", "alice", "hunter2")
            .unwrap();
        assert_eq!(bundle.export_password(), "hunter2");
        Pkcs12Bundle::open(bundle.package(), "hunter2").unwrap();

        assert!(matches!(
            service
                .issue_client_certificate_with_password("acme", "alice", "")
                .unwrap_err(),
            CertDeskError::InvalidInput(_)
        ));
    }

    #[test]
    fn unknown_ca_and_bad_client_names() {
        let service = service();
        service.store().create_ca("acme").unwrap();

        assert_eq!(
            service
                .issue_client_certificate("ghost-ca", "bob")
                .unwrap_err(),
            CertDeskError::NotFound("ghost-ca".to_string())
        );
        for client in ["", "../../etc/passwd", "bob; rm -rf /", "$(id)"] {
            assert!(matches!(
                service.issue_client_certificate("acme", client).unwrap_err(),
                CertDeskError::InvalidInput(_)
            ));
        }
    }
}
