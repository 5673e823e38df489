//! Streaming content fingerprinting.
//!
//! # Overview
//! The walker is handed anything implementing [`FingerprintFn`]: given a
//! basename and a content stream it returns a [`FileFingerprint`]. The stock
//! implementation is [`Fingerprinter`], which streams content through a
//! fixed buffer into SHA-256 (default) or BLAKE3.
//!
//! Plain closures implement [`FingerprintFn`] too, which keeps tests free to
//! inject fake digests.
//!
//! # Example
//!
//! ```
//! use dupetree::scanner::{DigestAlgorithm, FingerprintFn, Fingerprinter};
//!
//! let fingerprinter = Fingerprinter::new(DigestAlgorithm::Sha256);
//! let print = fingerprinter.fingerprint("foo", &mut "foo".as_bytes()).unwrap();
//! assert_eq!(print.size, 3);
//! assert_eq!(
//!     print.digest_hex(),
//!     "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae"
//! );
//! ```

use std::fmt::Write as _;
use std::io::{self, Read};

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use super::{Digest, FileFingerprint};

/// Buffer size for streaming reads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Produces the fingerprint of one file from its basename and content.
///
/// Implementations must be deterministic and content-addressed: equal content
/// yields an equal digest regardless of the name.
pub trait FingerprintFn {
    /// Fingerprint `content`, recording `name` as the fingerprint's path.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while reading `content`.
    fn fingerprint(&self, name: &str, content: &mut dyn Read) -> io::Result<FileFingerprint>;
}

impl<F> FingerprintFn for F
where
    F: Fn(&str, &mut dyn Read) -> io::Result<FileFingerprint>,
{
    fn fingerprint(&self, name: &str, content: &mut dyn Read) -> io::Result<FileFingerprint> {
        self(name, content)
    }
}

/// Digest algorithm used by [`Fingerprinter`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

enum DigestState {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> Digest {
        match self {
            Self::Sha256(h) => h.finalize().into(),
            Self::Blake3(h) => *h.finalize().as_bytes(),
        }
    }
}

/// Streaming fingerprinter over a cryptographic digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter {
    algorithm: DigestAlgorithm,
}

impl Fingerprinter {
    /// Create a fingerprinter for the given algorithm.
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Digest an in-memory buffer.
    #[must_use]
    pub fn digest_bytes(&self, data: &[u8]) -> Digest {
        let mut state = DigestState::new(self.algorithm);
        state.update(data);
        state.finalize()
    }
}

impl FingerprintFn for Fingerprinter {
    fn fingerprint(&self, name: &str, content: &mut dyn Read) -> io::Result<FileFingerprint> {
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut size = 0u64;

        loop {
            let n = match content.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.update(&buffer[..n]);
            size += n as u64;
        }

        Ok(FileFingerprint::new(name, size, state.finalize()))
    }
}

/// Convert a digest to a lowercase hexadecimal string.
#[must_use]
pub fn digest_to_hex(digest: &Digest) -> String {
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Parse a 64 character hexadecimal string into a digest.
///
/// Returns `None` when the input has the wrong length or non-hex characters.
#[must_use]
pub fn hex_to_digest(hex: &str) -> Option<Digest> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut digest = [0u8; 32];
    for (i, byte) in digest.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(digest)
}
