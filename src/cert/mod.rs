pub mod extensions;
pub mod params;

use std::fmt;

use der::Encode;
use x509_cert::certificate::CertificateInner;

use crate::error::Result;
use crate::pem_utils::der_to_pem;

/// Digest algorithm used to produce a node's signature.
///
/// Recorded as plain data at configuration time; whether the issuing key can
/// actually sign with it is only decided when the signature is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Lower-case token used in output file names (`sha1-chain.pem`).
    pub fn token(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        DigestAlgorithm::Sha256
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A signed X.509 certificate.
///
/// Produced exactly once per node; immutable from then on.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    /// Encodes the certificate into a PEM `CERTIFICATE` block.
    pub fn to_pem(&self) -> Result<String> {
        Ok(der_to_pem(&self.to_der()?, "CERTIFICATE"))
    }
}
