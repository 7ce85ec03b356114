//! The CA store: named certificate authorities on top of a pluggable repository.

pub mod fs;
pub mod memory;

use std::path::PathBuf;

use parking_lot::Mutex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use x509_cert::serial_number::SerialNumber;

pub use fs::FileRepository;
pub use memory::MemoryRepository;

use crate::cert::Certificate;
use crate::error::{CertDeskError, Result};
use crate::issuer::SigningAuthority;
use crate::key::KeyPair;
use crate::name::validate_name;
use crate::policy::CaPolicy;
use crate::tbs_certificate::{random_serial_number, serial_to_hex};

/// Number of fresh serials drawn before allocation gives up.
const MAX_SERIAL_ATTEMPTS: usize = 8;

/// CA material as it is persisted: PKCS#8 key PEM and certificate PEM.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCa {
    pub key_pem: String,
    pub certificate_pem: String,
}

impl std::fmt::Debug for StoredCa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCa")
            .field("certificate_pem", &self.certificate_pem)
            .finish_non_exhaustive()
    }
}

/// Everything written for one issued client bundle.
#[derive(Debug, Clone, Copy)]
pub struct BundleFiles<'a> {
    pub ca_name: &'a str,
    pub client_name: &'a str,
    pub serial_hex: &'a str,
    pub key_pem: &'a str,
    pub csr_pem: &'a str,
    pub certificate_pem: &'a str,
    pub package: &'a [u8],
}

/// Where a repository put a bundle's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub directory: PathBuf,
    pub key: PathBuf,
    pub csr: PathBuf,
    pub certificate: PathBuf,
    pub package: PathBuf,
}

/// Persistence seam under [`CaStore`].
///
/// Implementations never expose a CA whose key and certificate were not both
/// written; `insert` is all-or-nothing.
pub trait CaRepository: Send + Sync {
    /// Names of all complete CAs, in any order.
    fn list_names(&self) -> Result<Vec<String>>;

    /// Loads a CA's material, or `None` if no complete CA has that name.
    fn load(&self, name: &str) -> Result<Option<StoredCa>>;

    /// Persists a new CA. Fails with `AlreadyExists` if the name is taken.
    fn insert(&self, name: &str, ca: &StoredCa) -> Result<()>;

    /// Adds `serial_hex` to the CA's serial ledger. Returns `false` if it was already there.
    fn record_serial(&self, ca_name: &str, serial_hex: &str) -> Result<bool>;

    /// Persists an issued bundle. Repositories without a file layout return `None`.
    fn store_bundle(&self, files: &BundleFiles<'_>) -> Result<Option<BundlePaths>>;
}

/// A listed certificate authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaSummary {
    pub name: String,
    /// `notBefore` of the CA certificate.
    pub created: OffsetDateTime,
}

/// A named certificate authority: its key and self-signed certificate.
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    name: String,
    authority: SigningAuthority,
}

impl CertificateAuthority {
    fn from_stored(name: &str, stored: &StoredCa) -> Result<Self> {
        let parse = || -> Result<SigningAuthority> {
            let key = KeyPair::import_from_pkcs8_pem(&stored.key_pem)?;
            let cert = Certificate::from_pem(&stored.certificate_pem)?;
            SigningAuthority::new(cert, key)
        };
        let authority =
            parse().map_err(|e| CertDeskError::store(&format!("CA {name} has unreadable material"), e))?;
        Ok(CertificateAuthority {
            name: name.to_string(),
            authority,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn certificate(&self) -> &Certificate {
        self.authority.certificate()
    }

    pub fn key(&self) -> &KeyPair {
        self.authority.key()
    }

    pub fn authority(&self) -> &SigningAuthority {
        &self.authority
    }

    pub fn summary(&self) -> Result<CaSummary> {
        Ok(CaSummary {
            name: self.name.clone(),
            created: self.certificate().not_before()?,
        })
    }
}

/// Creates, looks up and enumerates certificate authorities.
///
/// Mutations (CA creation, serial allocation) are serialised by a single
/// store-wide lock.
pub struct CaStore<R> {
    repository: R,
    policy: CaPolicy,
    write_lock: Mutex<()>,
}

impl<R: CaRepository> CaStore<R> {
    pub fn new(repository: R, policy: CaPolicy) -> Self {
        CaStore {
            repository,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &CaPolicy {
        &self.policy
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Lists every CA, ordered by name.
    pub fn list_cas(&self) -> Result<Vec<CaSummary>> {
        let mut names = self.repository.list_names()?;
        names.sort();
        names.dedup();

        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            match self.repository.load(&name)? {
                Some(stored) => summaries.push(CertificateAuthority::from_stored(&name, &stored)?.summary()?),
                None => debug!(ca = %name, "CA disappeared while listing"),
            }
        }
        Ok(summaries)
    }

    /// Creates a CA with a fresh key and a self-signed certificate whose common name is `name`.
    pub fn create_ca(&self, name: &str) -> Result<CertificateAuthority> {
        validate_name("CA name", name)?;

        let _guard = self.write_lock.lock();
        if self.repository.load(name)?.is_some() {
            return Err(CertDeskError::AlreadyExists(name.to_string()));
        }

        let key = KeyPair::generate_rsa(self.policy.ca_key_bits)?;
        let certificate = Certificate::new_self_signed(&key, name, self.policy.ca_validity_days)?;
        let stored = StoredCa {
            key_pem: key.to_pkcs8_pem()?,
            certificate_pem: certificate.to_pem()?,
        };
        self.repository.insert(name, &stored)?;

        info!(
            ca = %name,
            bits = self.policy.ca_key_bits,
            serial = %certificate.serial_hex(),
            "created certificate authority"
        );

        Ok(CertificateAuthority {
            name: name.to_string(),
            authority: SigningAuthority::new(certificate, key)?,
        })
    }

    pub fn get_ca(&self, name: &str) -> Result<CertificateAuthority> {
        validate_name("CA name", name)?;
        let stored = self
            .repository
            .load(name)?
            .ok_or_else(|| CertDeskError::NotFound(name.to_string()))?;
        CertificateAuthority::from_stored(name, &stored)
    }

    /// Reserves a serial number no other certificate from `ca` carries.
    pub fn allocate_serial(&self, ca: &CertificateAuthority) -> Result<SerialNumber> {
        let _guard = self.write_lock.lock();
        for attempt in 1..=MAX_SERIAL_ATTEMPTS {
            let serial = random_serial_number()?;
            if &serial == ca.certificate().serial_number() {
                continue;
            }
            if self.repository.record_serial(ca.name(), &serial_to_hex(&serial))? {
                return Ok(serial);
            }
            warn!(ca = %ca.name(), attempt, "serial number collision, drawing again");
        }
        Err(CertDeskError::CryptoError(format!(
            "no unique serial number for CA {} after {MAX_SERIAL_ATTEMPTS} attempts",
            ca.name()
        )))
    }
}
