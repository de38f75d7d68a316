use der::asn1::AnyRef;
use p256::ecdsa::SigningKey as P256SigningKey;
use p384::ecdsa::SigningKey as P384SigningKey;
use p521::ecdsa::SigningKey as P521SigningKey;
use pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer as _};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::DigestAlgorithm;
use crate::error::{ChainGenError, Result};

/// Key algorithm requested for freshly created nodes.
///
/// RSA keys accept every supported digest algorithm; ECDSA keys sign with
/// their curve-matched digest only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    Rsa2048,
    Rsa3072,
    Rsa4096,
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
}

impl Default for KeySpec {
    fn default() -> Self {
        KeySpec::Rsa2048
    }
}

/// Supported key types for certificate operations.
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
    },
    EcdsaP521 {
        signing_key: P521SigningKey,
    },
}

impl KeyPair {
    /// Generate a fresh key pair of the requested kind.
    pub fn generate(spec: KeySpec) -> Result<Self> {
        match spec {
            KeySpec::Rsa2048 => Self::generate_rsa(2048),
            KeySpec::Rsa3072 => Self::generate_rsa(3072),
            KeySpec::Rsa4096 => Self::generate_rsa(4096),
            KeySpec::EcdsaP256 => Ok(Self::generate_ecdsa_p256()),
            KeySpec::EcdsaP384 => Ok(Self::generate_ecdsa_p384()),
            KeySpec::EcdsaP521 => Ok(Self::generate_ecdsa_p521()),
        }
    }

    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let signing_key = P256SigningKey::random(&mut rand_core::OsRng);
        KeyPair::EcdsaP256 { signing_key }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let signing_key = P384SigningKey::random(&mut rand_core::OsRng);
        KeyPair::EcdsaP384 { signing_key }
    }

    /// Generate an ECDSA P-521 key pair.
    pub fn generate_ecdsa_p521() -> Self {
        let signing_key = P521SigningKey::random(&mut rand_core::OsRng);
        KeyPair::EcdsaP521 { signing_key }
    }

    /// Short human-readable name of the key algorithm, for error messages.
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            KeyPair::Rsa { .. } => "RSA",
            KeyPair::EcdsaP256 { .. } => "ECDSA P-256",
            KeyPair::EcdsaP384 { .. } => "ECDSA P-384",
            KeyPair::EcdsaP521 { .. } => "ECDSA P-521",
        }
    }

    /// Export the private key as PKCS#8 PEM, so a harness can reuse the same
    /// key material across generation runs.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP256 { signing_key } => signing_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP384 { signing_key } => signing_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP521 { signing_key } => signing_key.to_pkcs8_pem(LineEnding::LF),
        }
        .map_err(|e| ChainGenError::Encoding(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Import a private key from PKCS#8 PEM, trying each supported algorithm.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        if let Ok(private) = RsaPrivateKey::from_pkcs8_pem(pem) {
            let public = RsaPublicKey::from(&private);
            return Ok(KeyPair::Rsa {
                private: Box::new(private),
                public,
            });
        }
        if let Ok(signing_key) = P256SigningKey::from_pkcs8_pem(pem) {
            return Ok(KeyPair::EcdsaP256 { signing_key });
        }
        if let Ok(signing_key) = P384SigningKey::from_pkcs8_pem(pem) {
            return Ok(KeyPair::EcdsaP384 { signing_key });
        }
        if let Ok(signing_key) = P521SigningKey::from_pkcs8_pem(pem) {
            return Ok(KeyPair::EcdsaP521 { signing_key });
        }
        Err(ChainGenError::Decoding(
            "not a PKCS#8 private key of a supported algorithm".to_string(),
        ))
    }
}

/// The signing capability consumed by the factory and writer.
///
/// Implementations produce the subject-public-key info for the to-be-signed
/// content, select the X.509 signature `AlgorithmIdentifier` for a digest
/// choice, and compute the signature over the encoded TBS bytes.
pub trait Signer {
    /// SPKI of the key, as embedded in certificates carrying it.
    fn public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned>;

    /// Signature algorithm identifier for signing with `digest`.
    ///
    /// Fails with [`ChainGenError::UnsupportedAlgorithm`] when the key cannot
    /// sign with the requested digest (e.g. a P-256 key asked for SHA-1).
    fn signature_algorithm(&self, digest: DigestAlgorithm) -> Result<AlgorithmIdentifierOwned>;

    /// Sign `message` (DER-encoded TBS content) using `digest`.
    ///
    /// Changing the digest changes the signature bytes even for identical
    /// input. All supported schemes (RSA PKCS#1 v1.5, RFC 6979 ECDSA) are
    /// deterministic, so re-signing identical content reproduces identical
    /// bytes.
    fn sign(&self, digest: DigestAlgorithm, message: &[u8]) -> Result<Vec<u8>>;
}

impl Signer for KeyPair {
    fn public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            KeyPair::Rsa { public, .. } => SubjectPublicKeyInfoOwned::from_key(public.clone()),
            KeyPair::EcdsaP256 { signing_key } => {
                SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key())
            }
            KeyPair::EcdsaP384 { signing_key } => {
                SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key())
            }
            KeyPair::EcdsaP521 { signing_key } => {
                SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key())
            }
        };
        spki.map_err(|e| ChainGenError::Encoding(e.to_string()))
    }

    fn signature_algorithm(&self, digest: DigestAlgorithm) -> Result<AlgorithmIdentifierOwned> {
        let unsupported = || {
            ChainGenError::UnsupportedAlgorithm(format!(
                "{} cannot sign with {}",
                self.algorithm_name(),
                digest
            ))
        };
        let id = match (self, digest) {
            // rsaEncryption signature OIDs carry an explicit NULL parameter.
            (KeyPair::Rsa { .. }, _) => AlgorithmIdentifierOwned {
                oid: match digest {
                    DigestAlgorithm::Sha1 => const_oid::db::rfc5912::SHA_1_WITH_RSA_ENCRYPTION,
                    DigestAlgorithm::Sha256 => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                    DigestAlgorithm::Sha384 => const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION,
                    DigestAlgorithm::Sha512 => const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
                },
                parameters: Some(der::asn1::Any::from(AnyRef::NULL)),
            },
            (KeyPair::EcdsaP256 { .. }, DigestAlgorithm::Sha256) => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            (KeyPair::EcdsaP384 { .. }, DigestAlgorithm::Sha384) => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
            (KeyPair::EcdsaP521 { .. }, DigestAlgorithm::Sha512) => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_512,
                parameters: None,
            },
            _ => return Err(unsupported()),
        };
        Ok(id)
    }

    fn sign(&self, digest: DigestAlgorithm, message: &[u8]) -> Result<Vec<u8>> {
        // Checked up front so RSA paths below can assume a valid pairing.
        self.signature_algorithm(digest)?;

        let signature = match (self, digest) {
            (KeyPair::Rsa { private, .. }, DigestAlgorithm::Sha1) => {
                let key = rsa::pkcs1v15::SigningKey::<Sha1>::new(private.as_ref().clone());
                key.sign(message).to_vec()
            }
            (KeyPair::Rsa { private, .. }, DigestAlgorithm::Sha256) => {
                let key = rsa::pkcs1v15::SigningKey::<Sha256>::new(private.as_ref().clone());
                key.sign(message).to_vec()
            }
            (KeyPair::Rsa { private, .. }, DigestAlgorithm::Sha384) => {
                let key = rsa::pkcs1v15::SigningKey::<Sha384>::new(private.as_ref().clone());
                key.sign(message).to_vec()
            }
            (KeyPair::Rsa { private, .. }, DigestAlgorithm::Sha512) => {
                let key = rsa::pkcs1v15::SigningKey::<Sha512>::new(private.as_ref().clone());
                key.sign(message).to_vec()
            }
            (KeyPair::EcdsaP256 { signing_key }, _) => {
                let sig: p256::ecdsa::Signature = signing_key.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
            (KeyPair::EcdsaP384 { signing_key }, _) => {
                let sig: p384::ecdsa::Signature = signing_key.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
            (KeyPair::EcdsaP521 { signing_key }, _) => {
                let sig: p521::ecdsa::Signature = signing_key.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
        };
        Ok(signature)
    }
}
