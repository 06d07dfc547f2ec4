use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::UtilsError;

/// Emit a value as JCS-canonical JSON (RFC 8785).
///
/// This is the standard way to emit JSON for the store, the response
/// envelope, and the audit log: JCS ensures deterministic output regardless
/// of field ordering in the source struct.
pub fn emit_jcs<T: Serialize>(value: &T) -> Result<String, UtilsError> {
    let json_value = serde_json::to_value(value)?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .map_err(|e| UtilsError::Canonicalize(e.to_string()))?;
    Ok(String::from_utf8(json_bytes).expect("JCS output is always valid UTF-8"))
}

/// Checksum algorithm identifier recorded nowhere but implied by `checksum_hex`.
pub const CHECKSUM_ALGORITHM: &str = "sha256-16";

/// Compute the store checksum: the first 16 hex characters of the SHA-256
/// digest of the JCS-canonicalized value. Used for `_meta.checksum` over the
/// canonical task list.
pub fn checksum_hex<T: Serialize>(value: &T) -> Result<String, UtilsError> {
    let canonical = emit_jcs(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    Ok(digest.iter().take(8).map(|b| format!("{b:02x}")).collect())
}
