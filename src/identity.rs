//! Deterministic identifiers for graph entities.
//!
//! Every node and edge endpoint is named by a SHA-256 digest over its
//! identifying context, so an edge can reference a node before (or without)
//! that node being emitted, and re-running over unchanged input yields the
//! same candidate identifiers.

use sha2::{Digest, Sha256};

/// Separator placed between identity parts before hashing.
///
/// Paths, names and line numbers never contain it.
pub const PART_SEPARATOR: &str = "::";

/// Derive a stable identifier from an ordered sequence of context parts.
///
/// # Examples
///
/// ```
/// # use repograph::identity::stable_id;
/// let a = stable_id(&["src/app.py", "function", "main", "3"]);
/// let b = stable_id(&["src/app.py", "function", "main", "3"]);
/// assert_eq!(a, b);
/// assert_ne!(a, stable_id(&["src/app.py", "function", "main", "4"]));
/// ```
pub fn stable_id<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            hasher.update(PART_SEPARATOR.as_bytes());
        }
        hasher.update(part.as_ref().as_bytes());
    }
    hex(&hasher.finalize())
}

/// Hex digest of a complete text, used for file content fingerprints.
pub fn content_hash(text: &str) -> String {
    hex(&Sha256::digest(text.as_bytes()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
