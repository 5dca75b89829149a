//! Subresource integrity digests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha1::{Digest, Sha1};

/// Computes the `sha1-<base64>` digest of `content`.
///
/// ```
/// use pkgedge_packages::integrity::integrity;
///
/// assert_eq!(integrity(b""), "sha1-2jmj7l5rSw0yVb/vlWAYkK/YBwk=");
/// ```
pub fn integrity(content: &[u8]) -> String {
    let digest = Sha1::digest(content);
    format!("sha1-{}", STANDARD.encode(digest))
}

/// Quotes an integrity digest for use as an `ETag`.
pub fn etag(integrity: &str) -> String {
    format!("\"{integrity}\"")
}
