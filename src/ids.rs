//! Content-addressed item identity.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::source::Source;

/// Hex length of an item id.
pub const ID_LEN: usize = 12;

/// Stable short id for `(source, native_key)`: first 6 bytes of
/// SHA-256 over `"<source>:<key>"`, hex encoded.
pub fn make_id(source: Source, native_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(native_key.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(ID_LEN);
    for b in digest.iter().take(ID_LEN / 2) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
