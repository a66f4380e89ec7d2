use sha2::{Digest, Sha256};

/// Compute a stable SHA-256 fingerprint for a finding.
///
/// Identity fields:
/// - kind id
/// - document URI
/// - finding name
pub fn fingerprint_for_finding(kind_id: &str, uri: &str, name: &str) -> String {
    let canonical = [kind_id, uri, name].join("|");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}
