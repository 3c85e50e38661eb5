//! Security utilities for WeChat webhook verification
//!
//! Every request the WeChat platform makes to the webhook URL carries a
//! `signature` query parameter proving it originates from the platform.
//!
//! # Security Background
//!
//! The platform computes the signature over the shared token and the
//! request's `timestamp` and `nonce` parameters:
//! 1. Sort `token`, `timestamp`, `nonce` lexicographically
//! 2. Concatenate the three values and hash them with SHA-1
//! 3. Compare the lowercase hex digest with the `signature` parameter
//!
//! # Important Notes
//!
//! - The comparison must be constant-time to prevent timing attacks
//! - A failed check must short-circuit the request before any decryption

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Digest over lexically sorted parts, the platform's shared hash scheme.
/// Also used by the envelope codec, which signs a fourth part (the
/// ciphertext) with the same construction.
pub fn compute_digest(parts: &mut [&str]) -> String {
    parts.sort_unstable();

    hex::encode(Sha1::digest(parts.concat().as_bytes()))
}

/// Computes the handshake digest for a `(token, timestamp, nonce)` triple
pub fn compute_signature(token: &str, timestamp: &str, nonce: &str) -> String {
    compute_digest(&mut [token, timestamp, nonce])
}

/// Constant-time comparison of a provided hex signature against an
/// expected hex digest. Malformed hex rejects.
pub(crate) fn digest_matches(expected_hex: &str, provided_hex: &str) -> bool {
    let provided = match hex::decode(provided_hex) {
        Ok(sig) => sig,
        Err(e) => {
            log::warn!("failed to decode signature hex: {}", e);
            return false;
        }
    };

    let expected = match hex::decode(expected_hex) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    provided.len() == expected.len() && bool::from(provided.ct_eq(&expected))
}

/// Verifies the `signature` query parameter of a webhook request
///
/// # Arguments
///
/// * `token` - Shared token configured in the platform dashboard
/// * `signature` - The `signature` query parameter (lowercase hex)
/// * `timestamp` - The `timestamp` query parameter
/// * `nonce` - The `nonce` query parameter
///
/// # Returns
///
/// * `true` if the signature is valid
/// * `false` if the signature is invalid or not valid hex
pub fn verify_signature(token: &str, signature: &str, timestamp: &str, nonce: &str) -> bool {
    // Constant-time comparison to prevent timing attacks
    let is_valid = digest_matches(&compute_signature(token, timestamp, nonce), signature);

    if !is_valid {
        log::warn!("webhook signature verification failed: signatures do not match");
    }

    is_valid
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "spamtest";

    #[test]
    fn test_verify_signature_valid() {
        let timestamp = "1409735669";
        let nonce = "1320562132";
        let signature = compute_signature(TOKEN, timestamp, nonce);

        assert!(verify_signature(TOKEN, &signature, timestamp, nonce));
    }

    #[test]
    fn test_verify_signature_single_char_mutation() {
        let timestamp = "1409735669";
        let nonce = "1320562132";
        let signature = compute_signature(TOKEN, timestamp, nonce);

        for (i, _) in signature.char_indices() {
            let mut mutated = signature.clone().into_bytes();
            mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();

            assert!(
                !verify_signature(TOKEN, &mutated, timestamp, nonce),
                "mutated signature at index {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_verify_signature_wrong_token() {
        let timestamp = "1409735669";
        let nonce = "1320562132";
        let signature = compute_signature("other-token", timestamp, nonce);

        assert!(!verify_signature(TOKEN, &signature, timestamp, nonce));
    }

    #[test]
    fn test_verify_signature_invalid_hex() {
        assert!(!verify_signature(TOKEN, "zzzz", "1409735669", "1320562132"));
    }

    #[test]
    fn test_verify_signature_empty_params() {
        assert!(!verify_signature(TOKEN, "", "", ""));
    }
}
