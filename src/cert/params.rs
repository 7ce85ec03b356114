use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, SetOfVec};
use der::{Tag, Tagged};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::CertificateExtension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::{CertDeskError, Result};
use crate::key::PublicKey;

/// What a certificate should say about its subject, before an issuer signs it.
///
/// `usages` only applies to end-entity certificates. `extensions` are
/// appended after the standard CA or client set.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Subject or issuer name of a certificate.
///
/// Only the attributes this crate writes are modelled; unknown attributes are
/// ignored when reading a name back.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub organization: Option<String>,
}

impl DistinguishedName {
    pub fn common_name(common_name: impl Into<String>) -> Self {
        DistinguishedName {
            common_name: common_name.into(),
            organization: None,
        }
    }

    /// Converts the distinguished name to an X.509 `Name`, one RDN per
    /// attribute, values encoded as UTF8String.
    pub fn as_x509_name(&self) -> Result<Name> {
        if self.common_name.is_empty() {
            return Err(CertDeskError::InvalidInput(
                "common name must not be empty".to_string(),
            ));
        }

        let mut rdns = Vec::with_capacity(2);
        if let Some(organization) = &self.organization {
            rdns.push(single_attribute_rdn(const_oid::db::rfc4519::O, organization)?);
        }
        rdns.push(single_attribute_rdn(
            const_oid::db::rfc4519::CN,
            &self.common_name,
        )?);
        Ok(RdnSequence(rdns))
    }

    /// Reads the common name and organization out of an X.509 `Name`.
    pub fn from_x509_name(name: &Name) -> Self {
        let mut dn = DistinguishedName::default();
        for rdn in name.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = directory_string(&attr.value) else {
                    continue;
                };
                if attr.oid == const_oid::db::rfc4519::CN {
                    dn.common_name = value;
                } else if attr.oid == const_oid::db::rfc4519::O {
                    dn.organization = Some(value);
                }
            }
        }
        dn
    }
}

fn single_attribute_rdn(oid: ObjectIdentifier, value: &str) -> Result<RelativeDistinguishedName> {
    let atv = AttributeTypeAndValue {
        oid,
        value: Any::new(Tag::Utf8String, value.as_bytes().to_vec())?,
    };
    Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?))
}

fn directory_string(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
            std::str::from_utf8(value.value()).ok().map(str::to_owned)
        }
        _ => None,
    }
}

/// `notBefore`/`notAfter` bounds of a certificate.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// `days` days starting now.
    ///
    /// Both bounds are truncated to whole seconds, which is all X.509 time
    /// encodings carry. `days` must be positive and the end date must still
    /// be representable.
    pub fn for_days(days: i64) -> Result<Self> {
        if days <= 0 {
            return Err(CertDeskError::InvalidInput(format!(
                "validity must be at least one day, got {days}"
            )));
        }
        let now = OffsetDateTime::now_utc()
            .replace_nanosecond(0)
            .unwrap_or_else(|_| OffsetDateTime::now_utc());
        let not_after = days
            .checked_mul(86_400)
            .map(Duration::seconds)
            .and_then(|lifetime| now.checked_add(lifetime))
            .ok_or_else(|| {
                CertDeskError::InvalidInput(format!("validity of {days} days is out of range"))
            })?;
        Ok(Self {
            not_before: now,
            not_after,
        })
    }

    pub fn days(&self) -> i64 {
        (self.not_after - self.not_before).whole_days()
    }
}

/// An extension in untyped form: identifier, criticality and encoded value.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Encodes `extension` with the criticality this crate always uses for it.
    pub fn from_extension<E: CertificateExtension>(extension: &E) -> Result<Self> {
        Ok(ExtensionParam {
            oid: E::OID,
            critical: E::CRITICAL,
            value: extension.encode_value()?,
        })
    }

    pub fn to_extension<E: CertificateExtension>(&self) -> Result<E> {
        if self.oid != E::OID {
            return Err(CertDeskError::CryptoError(format!(
                "extension {} is not {}",
                self.oid,
                E::OID
            )));
        }
        E::decode_value(&self.value)
    }
}
