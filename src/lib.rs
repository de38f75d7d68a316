//! # ChainGen - X.509 Certificate Chain Fixtures in Pure Rust
//!
//! ChainGen builds certificate chain test fixtures for path-validation
//! harnesses, entirely with rustcrypto libraries and without dependencies on
//! ring or openssl. A [`factory::CertificateFactory`] wires nodes into an
//! issuance graph (self-signed root, intermediates, end-entities), the caller
//! tunes each node's digest algorithm, validity, and extensions, and a
//! [`writer::ChainWriter`] signs everything in dependency order and emits a
//! single annotated PEM file in whatever order the consuming harness expects.
//!
//! ## What it is not
//!
//! This is a fixture generator, not a certificate authority: there is no
//! revocation, no persistence beyond the written artifact, and no concurrent
//! issuance. Each factory is one independent generation run.
//!
//! ## Generating a chain
//!
//! ```rust,no_run
//! use chaingen::cert::DigestAlgorithm;
//! use chaingen::factory::{CertificateFactory, FactoryConfig};
//! use chaingen::writer::ChainWriter;
//!
//! # fn main() -> chaingen::error::Result<()> {
//! let mut factory = CertificateFactory::new(FactoryConfig::default());
//!
//! let root = factory.create_self_signed_root("Root")?;
//! let intermediate = factory.create_intermediate("Intermediate", root)?;
//! factory.set_digest_algorithm(intermediate, DigestAlgorithm::Sha1)?;
//! factory.extensions_mut(intermediate)?.set("extendedKeyUsage", "nsSGC");
//!
//! let target = factory.create_end_entity("Target", intermediate)?;
//! factory
//!     .extensions_mut(target)?
//!     .set("subjectAltName", "DNS:test.example");
//!
//! // The harness wants leaf-first order, the reverse of issuance order.
//! ChainWriter::new(&mut factory).write(
//!     "Chain whose intermediate was signed with SHA-1.",
//!     &[target, intermediate, root],
//!     ChainWriter::chain_file_name(DigestAlgorithm::Sha1),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuring a run
//!
//! Run-wide defaults are plain constructor data, not ambient state:
//!
//! ```rust,no_run
//! use chaingen::cert::params::Validity;
//! use chaingen::factory::{CertificateFactory, FactoryConfig};
//! use chaingen::key::KeySpec;
//!
//! let config = FactoryConfig::builder()
//!     .default_validity(Validity::for_days(730))
//!     .key_spec(KeySpec::EcdsaP256)
//!     .build();
//! let factory = CertificateFactory::new(config);
//! ```
//!
//! ## Extension configuration
//!
//! Extensions are an ordered identifier → value-specification mapping using
//! the OpenSSL config grammar (`critical,CA:true`, `serverAuth,clientAuth`,
//! `DNS:test.example`). The set records anything; unknown identifiers and
//! malformed values are rejected when the chain is encoded, not before.
//! Re-setting an identifier overwrites its value in place.
//!
//! ## Error handling
//!
//! Every failure is fatal to the generation call that produced it. See
//! [`error::ChainGenError`] for the taxonomy: configuration errors surface
//! immediately, unsupported key/digest pairings at signing time, and
//! encoding or I/O problems at write time. A failed write never leaves a
//! partial chain file behind.
//!
//! ## Module Organization
//!
//! - [`factory`]: issuance graph construction and node configuration
//! - [`cert`]: digest algorithms, signed certificates, validity, extensions
//! - [`key`]: key generation, PKCS#8 import/export, the signing capability
//! - [`writer`]: chain serialization and the output naming contract
//! - [`tbs_certificate`]: low-level to-be-signed structure assembly
//! - [`error`]: error types and handling

pub mod cert;
pub mod error;
pub mod factory;
pub mod key;
pub mod pem_utils;
pub mod tbs_certificate;
pub mod writer;
