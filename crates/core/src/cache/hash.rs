//! Entry key generation.

use crate::RequestIdentity;
use sha2::{Digest, Sha256};

/// Compute the storage key for a request identity.
pub fn compute_entry_key(identity: &RequestIdentity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.method.as_bytes());
    hasher.update(b"\n");
    hasher.update(identity.url.as_bytes());
    hex::encode(hasher.finalize())
}
