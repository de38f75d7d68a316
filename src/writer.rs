use std::fs;
use std::path::Path;

use crate::cert::DigestAlgorithm;
use crate::error::{ChainGenError, Result};
use crate::factory::{CertificateFactory, NodeId};

/// Serializes an ordered sequence of nodes into one annotated PEM artifact.
///
/// Signing is triggered here for any node that still needs it, issuer first.
/// The emitted order is exactly the caller's order — the reference harness
/// writes target, intermediate, root, the reverse of issuance order.
pub struct ChainWriter<'a> {
    graph: &'a mut CertificateFactory,
}

impl<'a> ChainWriter<'a> {
    pub fn new(graph: &'a mut CertificateFactory) -> Self {
        ChainWriter { graph }
    }

    /// Output naming contract: `<digest-token>-chain.pem`.
    pub fn chain_file_name(digest: DigestAlgorithm) -> String {
        format!("{}-chain.pem", digest.token())
    }

    /// Render the chain artifact: the description as a leading comment
    /// block, then each node's annotated PEM block in the given order.
    pub fn render(&mut self, description: &str, chain: &[NodeId]) -> Result<String> {
        for &id in chain {
            self.graph.sign(id)?;
        }

        let mut out = String::new();
        for line in description.lines() {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        for &id in chain {
            let node = self.graph.node(id)?;
            let issuer = self.graph.node(node.issuer())?;
            out.push('\n');
            out.push_str(&format!(
                "Certificate: {} (serial {})\nIssued by: {}\n\n",
                node.name(),
                node.serial_number(),
                issuer.name(),
            ));
            out.push_str(&self.graph.certificate(id)?.to_pem()?);
        }
        Ok(out)
    }

    /// Sign outstanding nodes, then write the rendered chain to `path`.
    ///
    /// The content is committed through a temporary file and an atomic
    /// rename, so a failed write never leaves a truncated file that still
    /// parses as a valid chain.
    pub fn write(
        &mut self,
        description: &str,
        chain: &[NodeId],
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let rendered = self.render(description, chain)?;

        let io_err = |source| ChainGenError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| io_err(std::io::Error::other("path has no file name")))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        fs::write(&tmp, rendered.as_bytes()).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            io_err(source)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::FactoryConfig;
    use crate::key::KeySpec;

    #[test]
    fn file_names_follow_the_digest_token() {
        assert_eq!(
            ChainWriter::chain_file_name(DigestAlgorithm::Sha1),
            "sha1-chain.pem"
        );
        assert_eq!(
            ChainWriter::chain_file_name(DigestAlgorithm::Sha256),
            "sha256-chain.pem"
        );
    }

    #[test]
    fn description_leads_and_every_block_is_annotated() {
        let mut factory = CertificateFactory::new(
            FactoryConfig::builder().key_spec(KeySpec::EcdsaP256).build(),
        );
        let root = factory.create_self_signed_root("Root").unwrap();

        let rendered = ChainWriter::new(&mut factory)
            .render("A one-node chain.\nSecond line.", &[root])
            .unwrap();

        assert!(rendered.starts_with("A one-node chain.\nSecond line.\n"));
        assert!(rendered.contains("Certificate: Root (serial 1)\nIssued by: Root\n"));
        assert!(rendered.contains("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn unwritable_path_surfaces_an_io_error() {
        let mut factory = CertificateFactory::new(
            FactoryConfig::builder().key_spec(KeySpec::EcdsaP256).build(),
        );
        let root = factory.create_self_signed_root("Root").unwrap();

        let err = ChainWriter::new(&mut factory)
            .write("chain", &[root], "/nonexistent-dir/sha256-chain.pem")
            .unwrap_err();
        assert!(matches!(err, ChainGenError::Io { .. }));
    }
}
