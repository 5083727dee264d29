//! Fast hashing utilities using xxHash3.
//!
//! Used for theme-cache invalidation, deterministic class-name suffixes and
//! the content-addressed substitute cache.

use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Compute a 64-bit hash of the given string using xxHash3.
#[inline]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Convert a hash to a hex string (16 characters).
#[inline]
pub fn hash_to_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Compute hash of a string and return as hex.
#[inline]
pub fn content_hash(content: &str) -> String {
    hash_to_hex(hash_str(content))
}

/// Hash several parts as one key.
///
/// Parts are length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn hash_parts<'a, I>(parts: I) -> u64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Xxh3::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.digest()
}

/// Short hash used inside generated class names.
///
/// Base-36 encoded and truncated to `len` characters (at most 13).
pub fn short_hash(data: &str, len: usize) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut value = hash_str(data);
    let mut out = Vec::with_capacity(13);
    while out.len() < 13 {
        out.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    out.truncate(len.min(13));
    // SAFETY: alphabet is ASCII
    unsafe { String::from_utf8_unchecked(out) }
}
