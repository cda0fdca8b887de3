//! Salted patient identifier hashing
//!
//! Access grants can be stored against a hash of the patient identifier
//! rather than the identifier itself. The hash is the lower-case hex SHA-256
//! digest of the identifier's UTF-8 bytes followed by the pepper's.

use sha2::{Digest, Sha256};

/// Hash a patient identifier with the configured pepper
///
/// # Examples
///
/// ```
/// use fhirgate::core::access::hashing::hash_identifier;
///
/// let hash = hash_identifier("9434765919", "pepper");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash.to_lowercase());
/// ```
pub fn hash_identifier(identifier: &str, pepper: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    hasher.update(pepper.as_bytes());
    let result = hasher.finalize();

    format!("{result:x}")
}
