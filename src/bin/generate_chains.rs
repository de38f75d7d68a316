//! Generates certificate chains where the intermediate certifies Netscape
//! Server Gated Crypto rather than serverAuth, once per digest algorithm.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chaingen::cert::DigestAlgorithm;
use chaingen::error::Result;
use chaingen::factory::{CertificateFactory, FactoryConfig};
use chaingen::writer::ChainWriter;

const DESCRIPTION: &str = "Certificate chains where the intermediate contains Netscape Server Gated \
Crypto rather than serverAuth in its extended key usage.";

fn generate_chain(intermediate_digest: DigestAlgorithm, out_dir: &Path) -> Result<()> {
    let mut factory = CertificateFactory::new(FactoryConfig::default());

    let root = factory.create_self_signed_root("Root")?;

    let intermediate = factory.create_intermediate("Intermediate", root)?;
    factory.set_digest_algorithm(intermediate, intermediate_digest)?;
    factory
        .extensions_mut(intermediate)?
        .set("extendedKeyUsage", "nsSGC");

    let target = factory.create_end_entity("Target", intermediate)?;
    factory
        .extensions_mut(target)?
        .set("extendedKeyUsage", "serverAuth,clientAuth");
    factory
        .extensions_mut(target)?
        .set("subjectAltName", "DNS:test.example");

    let path = out_dir.join(ChainWriter::chain_file_name(intermediate_digest));
    ChainWriter::new(&mut factory).write(DESCRIPTION, &[target, intermediate, root], path)
}

fn main() -> ExitCode {
    let out_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    // Two chains whose only difference is the digest algorithm used for the
    // intermediate's signature.
    for digest in [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256] {
        if let Err(err) = generate_chain(digest, &out_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
