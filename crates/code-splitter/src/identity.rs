use sha2::{Digest, Sha256};

/// Text used for identity: surrounding whitespace removed
#[must_use]
pub fn normalize(text: &str) -> &str {
    text.trim()
}

fn hex_encode_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len().saturating_mul(2));
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Content-addressed chunk id: lowercase hex SHA-256 of the normalized text
#[must_use]
pub fn content_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    hex_encode_lower(&hasher.finalize())
}
