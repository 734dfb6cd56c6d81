//! Content fingerprints for cache keys.

use std::fmt;

use sha2::{Digest, Sha256};

/// Hex characters kept from the SHA-256 digest.
const FINGERPRINT_HEX_LEN: usize = 16;

/// Truncated SHA-256 digest of a card's rendering inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_HEX_LEN / 2]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Fingerprint an ordered list of string fields.
///
/// Each field is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn fingerprint<I, S>(fields: I) -> Fingerprint
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for field in fields {
        let field = field.as_ref().as_bytes();
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; FINGERPRINT_HEX_LEN / 2];
    bytes.copy_from_slice(&digest[..FINGERPRINT_HEX_LEN / 2]);
    Fingerprint(bytes)
}
