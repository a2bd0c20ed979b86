use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use log::warn;
use sha2::{Digest, Sha256};

use crate::config::AssetVerifier;
use crate::manifest::Asset;

/// Hex-encoded SHA-256 of a file.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verifier comparing a downloaded file against the asset's SHA-256 checksum.
/// Assets without a checksum pass.
pub fn sha256_verifier() -> AssetVerifier {
    Arc::new(|path: &Path, asset: &Asset| {
        let expected = asset.checksum.trim();
        if expected.is_empty() {
            return true;
        }
        match sha256_file(path) {
            Ok(actual) if actual.eq_ignore_ascii_case(expected) => true,
            Ok(actual) => {
                warn!(
                    "verify: checksum mismatch for {}: expected {}, got {}",
                    path.display(),
                    expected,
                    actual
                );
                false
            }
            Err(err) => {
                warn!("verify: unable to hash {}: {}", path.display(), err);
                false
            }
        }
    })
}
