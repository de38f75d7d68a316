use std::sync::atomic::{AtomicU64, Ordering};

use bon::Builder;
use der::Encode;
use der::asn1::BitString;
use x509_cert::certificate::CertificateInner;

use crate::cert::extensions::{EncodeContext, ExtensionSet, encode_set};
use crate::cert::params::{DistinguishedName, Validity};
use crate::cert::{Certificate, DigestAlgorithm};
use crate::error::{ChainGenError, Result};
use crate::key::{KeyPair, KeySpec, Signer};
use crate::tbs_certificate::{TbsCertificate, key_identifier};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handle to a node inside one factory's issuance graph.
///
/// Carries the generation-run tag alongside the arena index, so a handle
/// minted by one factory is rejected by every other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    run: u64,
    index: usize,
}

/// Run-wide defaults, fixed at factory construction time.
///
/// Nodes created later read these defaults; individual nodes may override
/// validity and digest algorithm until they are signed.
#[derive(Clone, Debug, Builder, Default)]
pub struct FactoryConfig {
    #[builder(default)]
    pub default_validity: Validity,
    #[builder(default)]
    pub default_digest: DigestAlgorithm,
    #[builder(default)]
    pub key_spec: KeySpec,
}

/// Which slot in a chain a node fills; decides its default extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRole {
    CertificateAuthority,
    EndEntity,
}

/// One not-yet-encoded certificate in the issuance graph.
///
/// Created by the factory with fresh key material, configured by the caller,
/// then signed at most once. After signing every field is frozen.
pub struct CertificateNode {
    name: String,
    issuer: NodeId,
    serial_number: u64,
    validity: Validity,
    digest_algorithm: DigestAlgorithm,
    extensions: ExtensionSet,
    key: KeyPair,
    certificate: Option<Certificate>,
}

impl CertificateNode {
    /// Human-readable subject label; also the certificate's common name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the issuing node. The root is its own issuer.
    pub fn issuer(&self) -> NodeId {
        self.issuer
    }

    pub fn serial_number(&self) -> u64 {
        self.serial_number
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn is_signed(&self) -> bool {
        self.certificate.is_some()
    }

    /// The signed certificate, once signing has happened.
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }
}

/// Builds certificate nodes wired into an issuance graph.
///
/// Each factory is one independent generation run: it owns its nodes in an
/// arena, hands out [`NodeId`] handles, and signs nodes in dependency order
/// (an issuer is always signed before any certificate it issues — enforced
/// here, not left as a caller convention).
pub struct CertificateFactory {
    run: u64,
    config: FactoryConfig,
    nodes: Vec<CertificateNode>,
}

impl CertificateFactory {
    pub fn new(config: FactoryConfig) -> Self {
        CertificateFactory {
            run: RUN_COUNTER.fetch_add(1, Ordering::Relaxed),
            config,
            nodes: Vec::new(),
        }
    }

    /// Creates the trust anchor: a node that is its own issuer.
    ///
    /// Key material is generated now; the self-signature is deferred until
    /// the first write or explicit [`sign`](Self::sign) that needs it.
    pub fn create_self_signed_root(&mut self, name: &str) -> Result<NodeId> {
        self.create_node(name, None, NodeRole::CertificateAuthority)
    }

    /// Creates an intermediate CA issued by a previously created node.
    pub fn create_intermediate(&mut self, name: &str, issuer: NodeId) -> Result<NodeId> {
        self.check_handle(issuer)?;
        self.create_node(name, Some(issuer), NodeRole::CertificateAuthority)
    }

    /// Creates an end-entity certificate issued by a previously created node.
    ///
    /// Nothing structurally prevents using the result as an issuer later;
    /// doing so is a caller error this library does not detect.
    pub fn create_end_entity(&mut self, name: &str, issuer: NodeId) -> Result<NodeId> {
        self.check_handle(issuer)?;
        self.create_node(name, Some(issuer), NodeRole::EndEntity)
    }

    fn create_node(
        &mut self,
        name: &str,
        issuer: Option<NodeId>,
        role: NodeRole,
    ) -> Result<NodeId> {
        let id = NodeId {
            run: self.run,
            index: self.nodes.len(),
        };
        let key = KeyPair::generate(self.config.key_spec)?;
        self.nodes.push(CertificateNode {
            name: name.to_string(),
            issuer: issuer.unwrap_or(id),
            serial_number: self.nodes.len() as u64 + 1,
            validity: self.config.default_validity,
            digest_algorithm: self.config.default_digest,
            extensions: default_extensions(role),
            key,
            certificate: None,
        });
        Ok(id)
    }

    /// Borrow a node by handle.
    pub fn node(&self, id: NodeId) -> Result<&CertificateNode> {
        self.check_handle(id)?;
        Ok(&self.nodes[id.index])
    }

    /// Override the digest algorithm used for this node's signature.
    pub fn set_digest_algorithm(
        &mut self,
        id: NodeId,
        algorithm: DigestAlgorithm,
    ) -> Result<()> {
        self.configurable(id)?.digest_algorithm = algorithm;
        Ok(())
    }

    /// Override the validity window for this node.
    pub fn set_validity(&mut self, id: NodeId, validity: Validity) -> Result<()> {
        self.configurable(id)?.validity = validity;
        Ok(())
    }

    /// Mutable access to a node's extensions, while it is still unsigned.
    pub fn extensions_mut(&mut self, id: NodeId) -> Result<&mut ExtensionSet> {
        Ok(&mut self.configurable(id)?.extensions)
    }

    /// Sign `id`, signing its issuer chain first.
    ///
    /// Idempotent: re-signing an already-signed node is a no-op. A node's
    /// configuration cannot have drifted since its signature was computed,
    /// because every mutator refuses signed nodes.
    pub fn sign(&mut self, id: NodeId) -> Result<()> {
        self.check_handle(id)?;
        if self.nodes[id.index].is_signed() {
            return Ok(());
        }
        let issuer_id = self.nodes[id.index].issuer;
        if issuer_id != id {
            self.sign(issuer_id)?;
        }

        let certificate = {
            let node = &self.nodes[id.index];
            let issuer = &self.nodes[issuer_id.index];
            issue(node, issuer)?
        };
        self.nodes[id.index].certificate = Some(certificate);
        Ok(())
    }

    /// The signed certificate for `id`.
    ///
    /// Fails with a configuration error if the node has not been signed yet;
    /// use [`sign`](Self::sign) or a chain write to trigger signing.
    pub fn certificate(&self, id: NodeId) -> Result<&Certificate> {
        let node = self.node(id)?;
        node.certificate().ok_or_else(|| {
            ChainGenError::Configuration(format!("node `{}` has not been signed", node.name))
        })
    }

    fn configurable(&mut self, id: NodeId) -> Result<&mut CertificateNode> {
        self.check_handle(id)?;
        let node = &mut self.nodes[id.index];
        if node.certificate.is_some() {
            return Err(ChainGenError::Configuration(format!(
                "attempted mutation of signed node `{}`",
                node.name
            )));
        }
        Ok(node)
    }

    fn check_handle(&self, id: NodeId) -> Result<()> {
        if id.run != self.run {
            return Err(ChainGenError::Configuration(
                "node handle belongs to a different generation run".to_string(),
            ));
        }
        if id.index >= self.nodes.len() {
            return Err(ChainGenError::Configuration(
                "node handle does not name a created node".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build and sign one certificate. `issuer` is `node` itself for the root.
fn issue(node: &CertificateNode, issuer: &CertificateNode) -> Result<Certificate> {
    let signature_algorithm = issuer.key.signature_algorithm(node.digest_algorithm)?;
    let subject_public_key = node.key.public_key_info()?;
    let ctx = EncodeContext {
        subject_key_id: key_identifier(&subject_public_key),
        authority_key_id: key_identifier(&issuer.key.public_key_info()?),
    };

    let tbs = TbsCertificate {
        serial_number: node.serial_number,
        signature_algorithm: signature_algorithm.clone(),
        issuer: DistinguishedName::from_label(&issuer.name),
        validity: node.validity,
        subject: DistinguishedName::from_label(&node.name),
        subject_public_key,
        extensions: encode_set(&node.extensions, &ctx)?,
    };

    let tbs_inner = tbs.to_tbs_certificate_inner()?;
    let signature = issuer.key.sign(node.digest_algorithm, &tbs_inner.to_der()?)?;

    Ok(Certificate {
        inner: CertificateInner {
            tbs_certificate: tbs_inner,
            signature_algorithm,
            signature: BitString::from_bytes(&signature)?,
        },
    })
}

/// Default extensions per role, overridable through the node's
/// [`ExtensionSet`] until signing.
fn default_extensions(role: NodeRole) -> ExtensionSet {
    let mut set = ExtensionSet::new();
    match role {
        NodeRole::CertificateAuthority => {
            set.set("basicConstraints", "critical,CA:true");
            set.set("keyUsage", "critical,keyCertSign,cRLSign");
        }
        NodeRole::EndEntity => {
            set.set("basicConstraints", "critical,CA:false");
            set.set("keyUsage", "critical,digitalSignature,keyEncipherment");
            set.set("extendedKeyUsage", "serverAuth,clientAuth");
        }
    }
    set.set("subjectKeyIdentifier", "hash");
    set.set("authorityKeyIdentifier", "keyid:always");
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_factory() -> CertificateFactory {
        CertificateFactory::new(
            FactoryConfig::builder().key_spec(KeySpec::EcdsaP256).build(),
        )
    }

    #[test]
    fn root_is_its_own_issuer() {
        let mut factory = fast_factory();
        let root = factory.create_self_signed_root("Root").unwrap();
        assert_eq!(factory.node(root).unwrap().issuer(), root);
    }

    #[test]
    fn serial_numbers_are_unique_and_assigned_at_creation() {
        let mut factory = fast_factory();
        let root = factory.create_self_signed_root("Root").unwrap();
        let mid = factory.create_intermediate("Intermediate", root).unwrap();
        let leaf = factory.create_end_entity("Target", mid).unwrap();
        assert_eq!(factory.node(root).unwrap().serial_number(), 1);
        assert_eq!(factory.node(mid).unwrap().serial_number(), 2);
        assert_eq!(factory.node(leaf).unwrap().serial_number(), 3);
    }

    #[test]
    fn handles_from_another_run_are_rejected() {
        let mut a = fast_factory();
        let mut b = fast_factory();
        let foreign_root = b.create_self_signed_root("Root").unwrap();
        let err = a.create_intermediate("Intermediate", foreign_root).unwrap_err();
        assert!(matches!(err, ChainGenError::Configuration(_)));
    }

    #[test]
    fn signing_is_dependency_ordered_and_idempotent() {
        let mut factory = fast_factory();
        let root = factory.create_self_signed_root("Root").unwrap();
        let leaf = factory.create_end_entity("Target", root).unwrap();

        // Signing the leaf must drag the unsigned root along first.
        factory.sign(leaf).unwrap();
        assert!(factory.node(root).unwrap().is_signed());

        let first = factory.certificate(leaf).unwrap().to_der().unwrap();
        factory.sign(leaf).unwrap();
        let second = factory.certificate(leaf).unwrap().to_der().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn signed_nodes_are_frozen() {
        let mut factory = fast_factory();
        let root = factory.create_self_signed_root("Root").unwrap();
        factory.sign(root).unwrap();

        let err = factory
            .set_digest_algorithm(root, DigestAlgorithm::Sha256)
            .unwrap_err();
        assert!(matches!(err, ChainGenError::Configuration(_)));
        assert!(factory.extensions_mut(root).is_err());
        assert!(factory.set_validity(root, Validity::default()).is_err());
    }

    #[test]
    fn per_node_overrides_are_recorded_as_data() {
        let mut factory = fast_factory();
        let root = factory.create_self_signed_root("Root").unwrap();

        let window = Validity::for_days(30);
        factory.set_validity(root, window).unwrap();
        factory
            .set_digest_algorithm(root, DigestAlgorithm::Sha384)
            .unwrap();

        let node = factory.node(root).unwrap();
        assert_eq!(node.name(), "Root");
        assert_eq!(node.validity(), window);
        assert_eq!(node.digest_algorithm(), DigestAlgorithm::Sha384);
        assert_eq!(node.key().algorithm_name(), "ECDSA P-256");
    }

    #[test]
    fn certificate_access_before_signing_is_an_error() {
        let mut factory = fast_factory();
        let root = factory.create_self_signed_root("Root").unwrap();
        assert!(factory.certificate(root).is_err());
        assert!(!factory.node(root).unwrap().is_signed());
    }

    #[test]
    fn end_entity_defaults_differ_from_ca_defaults() {
        let mut factory = fast_factory();
        let root = factory.create_self_signed_root("Root").unwrap();
        let leaf = factory.create_end_entity("Target", root).unwrap();

        let root_exts = factory.node(root).unwrap().extensions();
        assert_eq!(root_exts.get("basicConstraints"), Some("critical,CA:true"));
        assert_eq!(root_exts.get("extendedKeyUsage"), None);

        let leaf_exts = factory.node(leaf).unwrap().extensions();
        assert_eq!(leaf_exts.get("basicConstraints"), Some("critical,CA:false"));
        assert_eq!(leaf_exts.get("extendedKeyUsage"), Some("serverAuth,clientAuth"));
    }
}
