//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 with the `S256` method. All randomness comes from the
//! operating system CSPRNG.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// Generate a cryptographically secure code verifier
///
/// Returns 32 random bytes encoded as unpadded base64url (43 characters),
/// inside the 43-128 character range RFC 7636 requires.
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate code challenge from verifier using SHA256
///
/// The challenge is `BASE64URL(SHA256(ASCII(code_verifier)))`: the hash is
/// taken over the encoded verifier string, not the raw random bytes.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state token for CSRF protection
///
/// Returns 16 random bytes as lowercase hex (32 characters).
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// PKCE parameters for a single authorization attempt.
///
/// A fresh value is minted per `authenticate` call and dropped once the code
/// exchange completes; neither the verifier nor the state is ever reused.
#[derive(Debug, Clone)]
pub struct PkceParameters {
    /// Random string sent only with the token exchange
    pub verifier: String,

    /// SHA256 hash of `verifier`, sent with the authorization request
    pub challenge: String,

    /// CSRF token that must round-trip through the redirect unchanged
    pub state: String,
}

impl PkceParameters {
    /// Generate a new verifier/challenge/state triple.
    ///
    /// # Examples
    /// ```
    /// use mailauth_common::auth::pkce::PkceParameters;
    ///
    /// let pkce = PkceParameters::generate();
    /// assert_eq!(pkce.verifier.len(), 43);
    /// assert_eq!(pkce.state.len(), 32);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        let state = generate_state();

        Self { verifier, challenge, state }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::pkce.
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate_pkce_parameters() {
        let pkce = PkceParameters::generate();

        // 32 bytes -> 43 unpadded base64url chars
        assert_eq!(pkce.verifier.len(), 43);
        // SHA-256 digest -> 43 unpadded base64url chars
        assert_eq!(pkce.challenge.len(), 43);
        // 16 bytes -> 32 hex chars
        assert_eq!(pkce.state.len(), 32);
        assert!(pkce.state.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(pkce.challenge_method(), "S256");
    }

    #[test]
    fn test_challenge_is_hash_of_verifier() {
        for _ in 0..50 {
            let pkce = PkceParameters::generate();
            let digest = Sha256::digest(pkce.verifier.as_bytes());
            assert_eq!(pkce.challenge, URL_SAFE_NO_PAD.encode(digest));
            assert!(!pkce.challenge.contains('='));
        }
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            generate_code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_base64url_alphabet() {
        let pkce = PkceParameters::generate();

        for value in [&pkce.verifier, &pkce.challenge] {
            assert!(!value.contains('='));
            assert!(!value.contains('+'));
            assert!(!value.contains('/'));
        }
    }

    #[test]
    fn test_thousand_generations_are_distinct() {
        let mut verifiers = HashSet::new();
        let mut states = HashSet::new();

        for _ in 0..1000 {
            let pkce = PkceParameters::generate();
            verifiers.insert(pkce.verifier);
            states.insert(pkce.state);
        }

        assert_eq!(verifiers.len(), 1000);
        assert_eq!(states.len(), 1000);
    }
}
