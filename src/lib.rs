//! # CertDesk - A Small Certificate Authority Service
//!
//! CertDesk creates named certificate authorities and issues client
//! certificates from them, packaged with their private keys in
//! password-protected PKCS#12 containers. All cryptography is done in process
//! with the RustCrypto crates; no external tools are invoked.
//!
//! ## Layers
//!
//! - **Primitives** ([`key`], [`cert`], [`csr`], [`issuer`], [`pkcs12`], and
//!   the [`pki`] facade): RSA key generation, self-signed CA certificates,
//!   PKCS#10 requests, issuance with SHA-256 signatures, and PKCS#12 export.
//! - **CA store** ([`store`]): named CAs on top of a [`store::CaRepository`],
//!   either on disk ([`store::FileRepository`]) or in memory
//!   ([`store::MemoryRepository`]).
//! - **Issuance** ([`issuance`]): turns a CA name and a client name into a
//!   signed certificate, a fresh key and a PKCS#12 package with a one-time
//!   export password.
//! - **HTTP** ([`server`]): an axum router exposing the above as JSON.
//!
//! ## Key Sizes and Lifetimes
//!
//! Defaults come from [`policy::CaPolicy`]:
//! - **CA**: 4096-bit RSA, 3650 days
//! - **Client**: 2048-bit RSA, 365 days
//!
//! ## Quick Start
//!
//! ### Creating a CA and Issuing a Client Certificate
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use certdesk::{
//!     issuance::IssuanceService,
//!     pkcs12::Pkcs12Bundle,
//!     policy::CaPolicy,
//!     store::{CaStore, FileRepository},
//! };
//!
//! # fn main() -> Result<(), certdesk::error::CertDeskError> {
//! let repository = FileRepository::open("./certificates")?;
//! let store = Arc::new(CaStore::new(repository, CaPolicy::default()));
//!
//! store.create_ca("acme")?;
//!
//! let issuance = IssuanceService::new(Arc::clone(&store));
//! let bundle = issuance.issue_client_certificate("acme", "alice")?;
//!
//! println!("Serial: {}", bundle.certificate().serial_hex());
//! println!("Export password: {}", bundle.export_password());
//!
//! let opened = Pkcs12Bundle::open(bundle.package(), bundle.export_password())?;
//! assert_eq!(&opened.certificate, bundle.certificate());
//! # Ok(())
//! # }
//! ```
//!
//! ### Using the Primitives Directly
//!
//! ```rust,no_run
//! use certdesk::pki;
//!
//! # fn main() -> Result<(), certdesk::error::CertDeskError> {
//! let ca_key = pki::generate_key_pair(4096)?;
//! let ca_cert = pki::create_self_signed_certificate(&ca_key, "acme", 3650)?;
//!
//! let client_key = pki::generate_key_pair(2048)?;
//! let csr = pki::create_signing_request(&client_key, "alice")?;
//! let client_cert = pki::sign_certificate(&csr, &ca_key, &ca_cert, 365)?;
//!
//! client_cert.verify_signed_by(&ca_cert.public_key()?)?;
//! let p12 = pki::export_pkcs12(&client_key, &client_cert, &ca_cert, "s3cret")?;
//! println!("{} byte PKCS#12 package", p12.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation reports a [`error::CertDeskError`] kind:
//!
//! ```rust
//! use certdesk::{error::CertDeskError, key::KeyPair};
//!
//! match KeyPair::import_from_pkcs8_pem("invalid pem data") {
//!     Ok(_) => println!("Key imported successfully"),
//!     Err(CertDeskError::CryptoError(msg)) => println!("Failed to decode key: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: RSA key generation, PKCS#8 import/export, signing
//! - [`cert`]: Certificate encoding/decoding, extensions and inspection
//! - [`csr`]: PKCS#10 signing requests
//! - [`issuer`]: Certificate issuing
//! - [`pkcs12`]: PKCS#12 export and import
//! - [`pki`]: The primitive operations as free functions
//! - [`name`]: CA and client name validation
//! - [`policy`]: Key sizes and validity periods
//! - [`store`]: The CA store and its repositories
//! - [`issuance`]: Client certificate issuance
//! - [`server`]: HTTP routes
//! - [`error`]: Error kinds
//! - [`tbs_certificate`]: Low-level certificate structure manipulation

pub mod cert;
pub mod csr;
pub mod error;
pub mod issuance;
pub mod issuer;
pub mod key;
pub mod name;
pub mod pem_utils;
pub mod pkcs12;
pub mod pki;
pub mod policy;
pub mod server;
pub mod store;
pub mod tbs_certificate;
