use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ChainGenError>;

/// Represents errors that can occur while building or writing a chain.
///
/// Every error is fatal to the generation call that produced it; a single-shot
/// fixture generator has no retry path.
#[derive(Debug, Error)]
pub enum ChainGenError {
    /// Invalid graph construction, or an attempt to reconfigure a node that
    /// has already been signed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The issuer's key cannot sign with the requested digest algorithm.
    /// Raised at signing time; configuration merely records the request.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// An extension or name the encoder cannot represent, or a DER-level
    /// encoding failure.
    #[error("failed to encode data: {0}")]
    Encoding(String),

    /// Error while decoding externally supplied key material.
    #[error("failed to decode data: {0}")]
    Decoding(String),

    /// Error during key generation.
    #[error("key generation error: {0}")]
    KeyGeneration(String),

    /// The output artifact could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<der::Error> for ChainGenError {
    fn from(err: der::Error) -> Self {
        ChainGenError::Encoding(err.to_string())
    }
}

impl From<rsa::Error> for ChainGenError {
    fn from(err: rsa::Error) -> Self {
        ChainGenError::KeyGeneration(err.to_string())
    }
}
