use der::Encode;
use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use rand::Rng;
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::params::{ExtensionParam, Validity};
use crate::cert::sha256_with_rsa;
use crate::error::{CertDeskError, Result};
use crate::key::PublicKey;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `issuer` - The distinguished name of the certificate issuer, copied verbatim from the issuer's certificate.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
pub struct TbsCertificate {
    pub serial_number: SerialNumber,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: self.serial_number.clone(),
            signature: sha256_with_rsa(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_tbs_certificate_inner()?.to_der()?)
    }
}

/// Generates a random, positive, non-zero serial number carrying 127 bits of entropy.
pub fn random_serial_number() -> Result<SerialNumber> {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    // Clear the sign bit and keep the leading octet non-zero so the INTEGER
    // encoding is positive and minimal.
    bytes[0] = (bytes[0] & 0x7f).max(1);
    Ok(SerialNumber::new(&bytes)?)
}

/// Lowercase hex rendering of a serial number's content octets.
pub fn serial_to_hex(serial: &SerialNumber) -> String {
    serial
        .as_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// RFC 5280 §4.1.2.5: UTCTime through 2049, GeneralizedTime from 2050 on.
fn to_x509_time(at: OffsetDateTime) -> Result<Time> {
    let secs = u64::try_from(at.unix_timestamp()).map_err(|_| {
        CertDeskError::CryptoError(format!("validity bound {at} precedes the unix epoch"))
    })?;
    let since_epoch = std::time::Duration::from_secs(secs);
    if at.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_unix_duration(since_epoch)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(
            since_epoch,
        )?))
    }
}

pub(crate) fn from_x509_time(time: &Time) -> Result<OffsetDateTime> {
    let secs = time.to_unix_duration().as_secs();
    let secs = i64::try_from(secs)
        .map_err(|e| CertDeskError::crypto("certificate time out of range", e))?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| CertDeskError::crypto("certificate time out of range", e))
}
