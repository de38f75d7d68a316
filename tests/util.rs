use std::path::{Path, PathBuf};

use der::Decode;
use der::oid::ObjectIdentifier;
use x509_cert::Certificate;
use x509_cert::ext::Extension;

/// Scratch directory for written chain files.
pub fn out_dir() -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Read a chain file back: raw text plus every decoded certificate block,
/// in file order. Annotation text between the PEM blocks is skipped.
pub fn decode_chain_file(path: &Path) -> (String, Vec<Certificate>) {
    let text = std::fs::read_to_string(path).unwrap();

    let mut armored = Vec::new();
    let mut current: Option<String> = None;
    for line in text.lines() {
        if line.starts_with("-----BEGIN ") {
            current = Some(String::new());
        }
        if let Some(block) = current.as_mut() {
            block.push_str(line);
            block.push('\n');
        }
        if line.starts_with("-----END ") {
            armored.push(current.take().unwrap());
        }
    }

    let certs = armored
        .iter()
        .map(|block| {
            let block = pem::parse(block).unwrap();
            assert_eq!(block.tag(), "CERTIFICATE");
            Certificate::from_der(block.contents()).unwrap()
        })
        .collect();
    (text, certs)
}

pub fn subject(cert: &Certificate) -> String {
    cert.tbs_certificate.subject.to_string()
}

pub fn issuer(cert: &Certificate) -> String {
    cert.tbs_certificate.issuer.to_string()
}

pub fn find_extension<'a>(cert: &'a Certificate, oid: &ObjectIdentifier) -> Option<&'a Extension> {
    cert.tbs_certificate
        .extensions
        .as_ref()
        .and_then(|exts| exts.iter().find(|ext| ext.extn_id == *oid))
}
