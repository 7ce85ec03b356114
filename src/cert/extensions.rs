//! The X.509 v3 extensions this crate writes and reads back.
//!
//! CA certificates get `BasicConstraints(cA)` and `KeyUsage(keyCertSign,
//! cRLSign)`, both critical. Client certificates get `BasicConstraints(!cA)`
//! and `KeyUsage(digitalSignature, keyEncipherment)`, both critical, plus an
//! `ExtendedKeyUsage`. Both carry subject and authority key identifiers.

use const_oid::AssociatedOid;
use der::asn1::OctetString;
use der::oid::ObjectIdentifier;
use der::{Decode, Encode};
use x509_cert::ext::pkix;

pub use der::flagset::FlagSet;
pub use x509_cert::ext::pkix::KeyUsages;

use crate::cert::params::ExtensionParam;
use crate::error::{CertDeskError, Result};
use crate::key::PublicKey;

/// An extension with a typed value.
///
/// ```
/// use certdesk::cert::extensions::{BasicConstraints, CertificateExtension};
///
/// let value = BasicConstraints::ca().encode_value().unwrap();
/// assert!(BasicConstraints::decode_value(&value).unwrap().is_ca);
/// assert!(BasicConstraints::CRITICAL);
/// ```
pub trait CertificateExtension: Sized {
    const OID: ObjectIdentifier;

    /// Criticality used when this crate writes the extension.
    const CRITICAL: bool;

    /// DER encoding of the `extnValue` contents.
    fn encode_value(&self) -> Result<Vec<u8>>;

    fn decode_value(der: &[u8]) -> Result<Self>;
}

/// Builds the extension list for a certificate over `subject_key`, issued by
/// the holder of `issuer_key`.
pub fn profile(
    is_ca: bool,
    subject_key: &PublicKey,
    issuer_key: &PublicKey,
    usages: &[ExtendedKeyUsageOption],
) -> Result<Vec<ExtensionParam>> {
    let (constraints, key_usage) = if is_ca {
        (BasicConstraints::ca(), KeyUsage::certificate_signing())
    } else {
        (BasicConstraints::end_entity(), KeyUsage::key_exchange())
    };

    let mut extensions = vec![
        ExtensionParam::from_extension(&constraints)?,
        ExtensionParam::from_extension(&key_usage)?,
        ExtensionParam::from_extension(&SubjectKeyIdentifier(subject_key.key_identifier()?))?,
        ExtensionParam::from_extension(&AuthorityKeyIdentifier {
            key_identifier: issuer_key.key_identifier()?,
        })?,
    ];
    if !usages.is_empty() {
        extensions.push(ExtensionParam::from_extension(&ExtendedKeyUsage {
            usage: usages.to_vec(),
        })?);
    }
    Ok(extensions)
}

/// `cA` flag and optional path length.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl BasicConstraints {
    /// A CA that may only sign end-entity certificates.
    pub fn ca() -> Self {
        BasicConstraints {
            is_ca: true,
            max_path_length: Some(0),
        }
    }

    pub fn end_entity() -> Self {
        BasicConstraints::default()
    }
}

impl CertificateExtension for BasicConstraints {
    const OID: ObjectIdentifier = pkix::BasicConstraints::OID;
    const CRITICAL: bool = true;

    fn encode_value(&self) -> Result<Vec<u8>> {
        let value = pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };
        Ok(value.to_der()?)
    }

    fn decode_value(der: &[u8]) -> Result<Self> {
        let value = pkix::BasicConstraints::from_der(der)?;
        Ok(BasicConstraints {
            is_ca: value.ca,
            max_path_length: value.path_len_constraint,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    pub fn certificate_signing() -> Self {
        KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
    }

    /// Signing plus RSA key transport, as TLS client authentication needs.
    pub fn key_exchange() -> Self {
        KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
    }
}

impl CertificateExtension for KeyUsage {
    const OID: ObjectIdentifier = pkix::KeyUsage::OID;
    const CRITICAL: bool = true;

    fn encode_value(&self) -> Result<Vec<u8>> {
        Ok(pkix::KeyUsage(self.0).to_der()?)
    }

    fn decode_value(der: &[u8]) -> Result<Self> {
        Ok(KeyUsage(pkix::KeyUsage::from_der(der)?.0))
    }
}

/// Key purposes understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(option: ExtendedKeyUsageOption) -> Self {
        match option {
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
        }
    }
}

impl TryFrom<ObjectIdentifier> for ExtendedKeyUsageOption {
    type Error = CertDeskError;

    fn try_from(oid: ObjectIdentifier) -> Result<Self> {
        [ExtendedKeyUsageOption::ServerAuth, ExtendedKeyUsageOption::ClientAuth]
            .into_iter()
            .find(|option| ObjectIdentifier::from(*option) == oid)
            .ok_or_else(|| {
                CertDeskError::InvalidInput(format!("unsupported extended key usage {oid}"))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl CertificateExtension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = pkix::ExtendedKeyUsage::OID;
    const CRITICAL: bool = false;

    fn encode_value(&self) -> Result<Vec<u8>> {
        let purposes = self.usage.iter().copied().map(ObjectIdentifier::from).collect();
        Ok(pkix::ExtendedKeyUsage(purposes).to_der()?)
    }

    fn decode_value(der: &[u8]) -> Result<Self> {
        let usage = pkix::ExtendedKeyUsage::from_der(der)?
            .0
            .into_iter()
            .map(ExtendedKeyUsageOption::try_from)
            .collect::<Result<_>>()?;
        Ok(ExtendedKeyUsage { usage })
    }
}

/// SHA-1 identifier of the certified public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl CertificateExtension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = pkix::SubjectKeyIdentifier::OID;
    const CRITICAL: bool = false;

    fn encode_value(&self) -> Result<Vec<u8>> {
        Ok(pkix::SubjectKeyIdentifier(OctetString::new(self.0.clone())?).to_der()?)
    }

    fn decode_value(der: &[u8]) -> Result<Self> {
        let id = pkix::SubjectKeyIdentifier::from_der(der)?;
        Ok(SubjectKeyIdentifier(id.0.into_bytes()))
    }
}

/// Names the issuing CA's key by its key identifier; the issuer/serial form
/// is never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl CertificateExtension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = pkix::AuthorityKeyIdentifier::OID;
    const CRITICAL: bool = false;

    fn encode_value(&self) -> Result<Vec<u8>> {
        let value = pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.clone())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };
        Ok(value.to_der()?)
    }

    fn decode_value(der: &[u8]) -> Result<Self> {
        let key_identifier = pkix::AuthorityKeyIdentifier::from_der(der)?
            .key_identifier
            .ok_or_else(|| {
                CertDeskError::CryptoError(
                    "authority key identifier carries no keyIdentifier".to_string(),
                )
            })?
            .into_bytes();
        Ok(AuthorityKeyIdentifier { key_identifier })
    }
}
