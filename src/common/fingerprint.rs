//! Content fingerprints binding a model artifact to the preprocessor it was
//! trained against.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::common::error::{RiskError, RiskResult};

/// SHA-256 of raw bytes as a 64-character lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Fingerprint of a value's canonical (compact) JSON form.
pub fn of_json<T: Serialize>(value: &T) -> RiskResult<String> {
    let bytes = serde_json::to_vec(value).map_err(|err| RiskError::serialization("fingerprint", err))?;
    Ok(sha256_hex(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn json_fingerprint_tracks_content() {
        let a = of_json(&vec![1, 2, 3]).unwrap();
        let b = of_json(&vec![1, 2, 3]).unwrap();
        let c = of_json(&vec![1, 2, 4]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
