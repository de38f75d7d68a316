use der::Encode;
use der::asn1::{GeneralizedTime, UtcTime};
use sha1::{Digest, Sha1};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::Time;

use crate::cert::params::{DistinguishedName, Validity};
use crate::error::{ChainGenError, Result};

/// The "to be signed" portion of one certificate, assembled from a node's
/// configuration and its issuer's identity.
pub struct TbsCertificate {
    pub serial_number: u64,
    /// Algorithm the issuer will sign with; repeated in the outer envelope.
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub issuer: DistinguishedName,
    pub validity: Validity,
    pub subject: DistinguishedName,
    pub subject_public_key: SubjectPublicKeyInfoOwned,
    /// Already interpreted into DER extensions, in configuration order.
    pub extensions: Vec<x509_cert::ext::Extension>,
}

impl TbsCertificate {
    /// Converts into the `x509-cert` representation for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: encode_serial(self.serial_number)?,
            signature: self.signature_algorithm.clone(),
            issuer: self.issuer.to_x509_name()?,
            validity,
            subject: self.subject.to_x509_name()?,
            subject_public_key_info: self.subject_public_key.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            // An empty extension list must be absent, not an empty SEQUENCE.
            extensions: if self.extensions.is_empty() {
                None
            } else {
                Some(self.extensions.clone())
            },
        })
    }

    /// Encodes the TBS content into DER, the exact bytes that get signed.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_tbs_certificate_inner()?.to_der()?)
    }
}

/// Key identifier of a public key: SHA-1 over the subject-public-key bits,
/// the conventional method for SKI/AKI values in test fixtures.
pub(crate) fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

fn encode_serial(serial: u64) -> Result<SerialNumber> {
    let bytes = serial.to_be_bytes();
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);
    Ok(SerialNumber::new(&bytes[start..])?)
}

/// UTCTime cannot represent dates from 2050 on; RFC 5280 switches to
/// GeneralizedTime there.
fn to_x509_time(t: OffsetDateTime) -> Result<Time> {
    let seconds = u64::try_from(t.unix_timestamp()).map_err(|_| {
        ChainGenError::Encoding(format!("validity time {t} precedes the Unix epoch"))
    })?;
    let duration = std::time::Duration::from_secs(seconds);
    if t.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_unix_duration(duration)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(
            duration,
        )?))
    }
}
