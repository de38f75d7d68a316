use core::str::FromStr;

use bon::Builder;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use x509_cert::name::RdnSequence;

use crate::error::{ChainGenError, Result};

/// Certificate validity period (`notBefore`, `notAfter`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }
}

impl Default for Validity {
    /// A fixed window, so unconfigured runs produce reproducible fixtures.
    fn default() -> Self {
        Self {
            not_before: datetime!(2018-01-01 12:00 UTC),
            not_after: datetime!(2034-01-01 12:00 UTC),
        }
    }
}

/// Distinguished name of a certificate subject or issuer.
///
/// Chain fixtures mostly need a bare common name; the remaining attributes
/// are available for harnesses that exercise name matching.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// A name consisting only of a common name, the shape issuance labels use.
    pub fn from_label(label: &str) -> Self {
        DistinguishedName {
            common_name: label.to_string(),
            ..Default::default()
        }
    }

    /// Converts the distinguished name into an X.509 RDN sequence.
    ///
    /// Only attributes that are actually present are emitted.
    pub fn to_x509_name(&self) -> Result<x509_cert::name::DistinguishedName> {
        let mut parts = vec![format!("CN={}", self.common_name)];
        if let Some(ou) = &self.organization_unit {
            parts.push(format!("OU={ou}"));
        }
        if let Some(o) = &self.organization {
            parts.push(format!("O={o}"));
        }
        if let Some(l) = &self.locality {
            parts.push(format!("L={l}"));
        }
        if let Some(st) = &self.state {
            parts.push(format!("ST={st}"));
        }
        if let Some(c) = &self.country {
            parts.push(format!("C={c}"));
        }
        RdnSequence::from_str(&parts.join(","))
            .map_err(|e| ChainGenError::Encoding(format!("invalid distinguished name: {e}")))
    }
}
