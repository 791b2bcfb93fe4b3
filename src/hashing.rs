//! Deferred artifact hashing.
//!
//! Files are written with empty hashes; hashing happens at the approval
//! gate for their stage, so that user edits made between generation and
//! approval are captured in the recorded digest.

use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 of a file's current contents, as lowercase hex.
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(hash_bytes(&bytes))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
