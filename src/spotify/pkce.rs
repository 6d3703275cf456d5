//! PKCE (RFC 7636) verifier and challenge generation
//!
//! The verifier is drawn from the OS random source and mapped onto an
//! alphanumeric alphabet; the challenge is the unpadded base64url encoding
//! of its SHA-256 digest (method `S256`).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Length of the verifier used for every authorization attempt
pub const VERIFIER_LENGTH: usize = 128;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Verifier and challenge for a single authorization attempt
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh pair with a 128 character verifier
    pub fn generate() -> Self {
        let verifier = generate_verifier(VERIFIER_LENGTH);
        let challenge = derive_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// Generate `length` characters from `[A-Za-z0-9]`, one random byte each
pub fn generate_verifier(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect()
}

/// base64url(SHA-256(verifier)) without `=` padding
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_length_and_alphabet() {
        let verifier = generate_verifier(VERIFIER_LENGTH);
        assert_eq!(verifier.len(), 128);
        assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_verifiers_differ() {
        assert_ne!(generate_verifier(64), generate_verifier(64));
    }

    #[test]
    fn test_challenge_known_vector() {
        // Appendix B of RFC 7636
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            derive_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_challenge_is_deterministic_and_url_safe() {
        for _ in 0..32 {
            let pair = PkcePair::generate();
            assert_eq!(pair.challenge, derive_challenge(&pair.verifier));
            assert!(!pair.challenge.contains(['+', '/', '=']));
            // 32 byte digest -> 43 unpadded base64 characters
            assert_eq!(pair.challenge.len(), 43);
        }
    }
}
