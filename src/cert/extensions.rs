use std::net::IpAddr;
use std::str::FromStr;

use const_oid::AssociatedOid;
use der::{
    Encode,
    asn1::{Ia5String, OctetString},
    flagset::FlagSet,
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{self, KeyUsages};

use crate::error::{ChainGenError, Result};

/// Netscape Server Gated Crypto, an extended-key-usage purpose predating
/// `serverAuth` that path-validation harnesses still exercise.
pub const NS_SERVER_GATED_CRYPTO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113730.4.1");

/// Microsoft Server Gated Crypto.
pub const MS_SERVER_GATED_CRYPTO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.10.3.3");

/// Identifier of a certificate extension.
///
/// The recognized set carries typed encoders; anything else is kept verbatim
/// as [`ExtensionId::Other`] so the encoder can reject it at write time rather
/// than at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionId {
    BasicConstraints,
    KeyUsage,
    ExtendedKeyUsage,
    SubjectAltName,
    SubjectKeyIdentifier,
    AuthorityKeyIdentifier,
    Other(String),
}

impl ExtensionId {
    /// The OpenSSL-config-style name of the extension.
    pub fn name(&self) -> &str {
        match self {
            ExtensionId::BasicConstraints => "basicConstraints",
            ExtensionId::KeyUsage => "keyUsage",
            ExtensionId::ExtendedKeyUsage => "extendedKeyUsage",
            ExtensionId::SubjectAltName => "subjectAltName",
            ExtensionId::SubjectKeyIdentifier => "subjectKeyIdentifier",
            ExtensionId::AuthorityKeyIdentifier => "authorityKeyIdentifier",
            ExtensionId::Other(name) => name,
        }
    }
}

impl From<&str> for ExtensionId {
    fn from(name: &str) -> Self {
        match name {
            "basicConstraints" => ExtensionId::BasicConstraints,
            "keyUsage" => ExtensionId::KeyUsage,
            "extendedKeyUsage" => ExtensionId::ExtendedKeyUsage,
            "subjectAltName" => ExtensionId::SubjectAltName,
            "subjectKeyIdentifier" => ExtensionId::SubjectKeyIdentifier,
            "authorityKeyIdentifier" => ExtensionId::AuthorityKeyIdentifier,
            other => ExtensionId::Other(other.to_string()),
        }
    }
}

/// One configured extension: identifier plus its value specification.
///
/// Value specifications use the OpenSSL config grammar: an optional
/// `critical,` prefix, then per-extension content such as `CA:true`,
/// `serverAuth,clientAuth`, `DNS:test.example`, `hash`, or `keyid:always`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionEntry {
    pub id: ExtensionId,
    pub value: String,
}

/// Ordered mapping from extension identifier to value specification.
///
/// Insertion order is preserved for deterministic encoding; a given
/// identifier appears at most once. No semantic interpretation happens here —
/// unknown names and malformed values are reported when the chain is encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    entries: Vec<ExtensionEntry>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `id`, or append a new one.
    ///
    /// Re-setting an existing identifier changes its value but keeps its
    /// first-seen position.
    pub fn set(&mut self, id: impl Into<ExtensionId>, value: impl Into<String>) {
        let id = id.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => entry.value = value,
            None => self.entries.push(ExtensionEntry { id, value }),
        }
    }

    /// Current value specification for `id`, if set.
    pub fn get(&self, id: impl Into<ExtensionId>) -> Option<&str> {
        let id = id.into();
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.value.as_str())
    }

    /// Remove the entry for `id`, if present.
    pub fn remove(&mut self, id: impl Into<ExtensionId>) {
        let id = id.into();
        self.entries.retain(|e| e.id != id);
    }

    /// All entries in insertion order, as consumed by the encoder.
    pub fn get_all(&self) -> impl Iterator<Item = &ExtensionEntry> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Key identifiers derived from the issuance graph, needed by the
/// `subjectKeyIdentifier` / `authorityKeyIdentifier` encoders.
pub(crate) struct EncodeContext {
    pub subject_key_id: Vec<u8>,
    pub authority_key_id: Vec<u8>,
}

/// Interpret every configured entry into a DER extension, in set order.
pub(crate) fn encode_set(
    set: &ExtensionSet,
    ctx: &EncodeContext,
) -> Result<Vec<x509_cert::ext::Extension>> {
    set.get_all().map(|entry| encode_entry(entry, ctx)).collect()
}

fn encode_entry(
    entry: &ExtensionEntry,
    ctx: &EncodeContext,
) -> Result<x509_cert::ext::Extension> {
    let (critical, spec) = split_critical(&entry.value);
    let (oid, value) = match &entry.id {
        ExtensionId::BasicConstraints => (
            pkix::BasicConstraints::OID,
            encode_basic_constraints(spec)?,
        ),
        ExtensionId::KeyUsage => (pkix::KeyUsage::OID, encode_key_usage(spec)?),
        ExtensionId::ExtendedKeyUsage => {
            (pkix::ExtendedKeyUsage::OID, encode_extended_key_usage(spec)?)
        }
        ExtensionId::SubjectAltName => (pkix::SubjectAltName::OID, encode_subject_alt_name(spec)?),
        ExtensionId::SubjectKeyIdentifier => (
            pkix::SubjectKeyIdentifier::OID,
            encode_subject_key_id(spec, ctx)?,
        ),
        ExtensionId::AuthorityKeyIdentifier => (
            pkix::AuthorityKeyIdentifier::OID,
            encode_authority_key_id(spec, ctx)?,
        ),
        ExtensionId::Other(name) => {
            return Err(ChainGenError::Encoding(format!(
                "unrecognized extension `{name}`"
            )));
        }
    };
    Ok(x509_cert::ext::Extension {
        extn_id: oid,
        critical,
        extn_value: OctetString::new(value)?,
    })
}

/// Strip the optional `critical,` marker off a value specification.
fn split_critical(value: &str) -> (bool, &str) {
    match value.trim().strip_prefix("critical,") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, value.trim()),
    }
}

fn encode_basic_constraints(spec: &str) -> Result<Vec<u8>> {
    let mut ca = false;
    let mut path_len_constraint = None;
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some(flag) = part.strip_prefix("CA:") {
            ca = match flag.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(ChainGenError::Encoding(format!(
                        "basicConstraints CA must be true or false, got `{other}`"
                    )));
                }
            };
        } else if let Some(len) = part.strip_prefix("pathlen:") {
            let len: u8 = len.parse().map_err(|_| {
                ChainGenError::Encoding(format!("invalid basicConstraints pathlen `{len}`"))
            })?;
            path_len_constraint = Some(len);
        } else {
            return Err(ChainGenError::Encoding(format!(
                "unrecognized basicConstraints part `{part}`"
            )));
        }
    }
    let bc = pkix::BasicConstraints {
        ca,
        path_len_constraint,
    };
    Ok(bc.to_der()?)
}

fn encode_key_usage(spec: &str) -> Result<Vec<u8>> {
    let mut flags: FlagSet<KeyUsages> = FlagSet::default();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        flags |= match token {
            "digitalSignature" => KeyUsages::DigitalSignature,
            "nonRepudiation" | "contentCommitment" => KeyUsages::NonRepudiation,
            "keyEncipherment" => KeyUsages::KeyEncipherment,
            "dataEncipherment" => KeyUsages::DataEncipherment,
            "keyAgreement" => KeyUsages::KeyAgreement,
            "keyCertSign" => KeyUsages::KeyCertSign,
            "cRLSign" => KeyUsages::CRLSign,
            "encipherOnly" => KeyUsages::EncipherOnly,
            "decipherOnly" => KeyUsages::DecipherOnly,
            other => {
                return Err(ChainGenError::Encoding(format!(
                    "unrecognized keyUsage purpose `{other}`"
                )));
            }
        };
    }
    Ok(pkix::KeyUsage(flags).to_der()?)
}

fn encode_extended_key_usage(spec: &str) -> Result<Vec<u8>> {
    let oids = spec
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| match token {
            "serverAuth" => Ok(const_oid::db::rfc5912::ID_KP_SERVER_AUTH),
            "clientAuth" => Ok(const_oid::db::rfc5912::ID_KP_CLIENT_AUTH),
            "codeSigning" => Ok(const_oid::db::rfc5912::ID_KP_CODE_SIGNING),
            "emailProtection" => Ok(const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION),
            "timeStamping" => Ok(const_oid::db::rfc5912::ID_KP_TIME_STAMPING),
            "OCSPSigning" => Ok(const_oid::db::rfc5912::ID_KP_OCSP_SIGNING),
            "nsSGC" => Ok(NS_SERVER_GATED_CRYPTO),
            "msSGC" => Ok(MS_SERVER_GATED_CRYPTO),
            other => Err(ChainGenError::Encoding(format!(
                "unrecognized extendedKeyUsage purpose `{other}`"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(pkix::ExtendedKeyUsage(oids).to_der()?)
}

fn encode_subject_alt_name(spec: &str) -> Result<Vec<u8>> {
    let names = spec
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(general_name)
        .collect::<Result<Vec<_>>>()?;
    Ok(pkix::SubjectAltName(names).to_der()?)
}

fn general_name(token: &str) -> Result<GeneralName> {
    let bad_ia5 =
        |e: der::Error| ChainGenError::Encoding(format!("invalid name `{token}`: {e}"));
    if let Some(dns) = token.strip_prefix("DNS:") {
        return Ok(GeneralName::DnsName(
            Ia5String::new(dns).map_err(bad_ia5)?,
        ));
    }
    if let Some(ip) = token.strip_prefix("IP:") {
        let addr = IpAddr::from_str(ip)
            .map_err(|_| ChainGenError::Encoding(format!("invalid IP address `{ip}`")))?;
        let octets = match addr {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        return Ok(GeneralName::IpAddress(OctetString::new(octets)?));
    }
    if let Some(email) = token.strip_prefix("email:") {
        return Ok(GeneralName::Rfc822Name(
            Ia5String::new(email).map_err(bad_ia5)?,
        ));
    }
    if let Some(uri) = token.strip_prefix("URI:") {
        return Ok(GeneralName::UniformResourceIdentifier(
            Ia5String::new(uri).map_err(bad_ia5)?,
        ));
    }
    Err(ChainGenError::Encoding(format!(
        "unrecognized subjectAltName entry `{token}`"
    )))
}

fn encode_subject_key_id(spec: &str, ctx: &EncodeContext) -> Result<Vec<u8>> {
    if spec != "hash" {
        return Err(ChainGenError::Encoding(format!(
            "unrecognized subjectKeyIdentifier spec `{spec}`"
        )));
    }
    let ski = pkix::SubjectKeyIdentifier(OctetString::new(ctx.subject_key_id.as_slice())?);
    Ok(ski.to_der()?)
}

fn encode_authority_key_id(spec: &str, ctx: &EncodeContext) -> Result<Vec<u8>> {
    if spec != "keyid" && spec != "keyid:always" {
        return Err(ChainGenError::Encoding(format!(
            "unrecognized authorityKeyIdentifier spec `{spec}`"
        )));
    }
    let aki = pkix::AuthorityKeyIdentifier {
        key_identifier: Some(OctetString::new(ctx.authority_key_id.as_slice())?),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    };
    Ok(aki.to_der()?)
}
