//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements the two RFC 7636 challenge methods:
//!
//! - `PLAIN`: the stored challenge equals the verifier
//! - `S256`: the stored challenge equals `BASE64URL(SHA256(ASCII(verifier)))`
//!
//! Method names are matched case-insensitively. Comparisons run in constant
//! time.
//!
//! # Example
//!
//! ```
//! use tollgate_auth::oauth::pkce::{PkceChallengeMethod, s256_challenge, verify_code_challenge};
//!
//! let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
//! let challenge = s256_challenge(verifier);
//!
//! assert!(verify_code_challenge(&challenge, "S256", verifier).is_ok());
//! assert_eq!(PkceChallengeMethod::parse("plain").unwrap(), PkceChallengeMethod::Plain);
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PkceError {
    /// The stored challenge method is not one we know.
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),

    /// The code has a challenge method but no challenge, or the request has no verifier.
    #[error("PKCE parameters missing: {0}")]
    MissingParameter(&'static str),

    /// The verifier does not match the challenge.
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

impl PkceError {
    /// Create an `UnsupportedMethod` error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod(method.into())
    }

    /// Returns `true` if this is a verification failure.
    #[must_use]
    pub fn is_verification_error(&self) -> bool {
        matches!(self, Self::VerificationFailed)
    }

    /// Get the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedMethod(_) | Self::MissingParameter(_) => "invalid_request",
            Self::VerificationFailed => "invalid_grant",
        }
    }
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkceChallengeMethod {
    /// Challenge is the verifier itself.
    Plain,
    /// SHA-256 hash of the verifier, base64url encoded.
    S256,
}

impl PkceChallengeMethod {
    /// Parse challenge method from string, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything but `PLAIN` or `S256`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        if method.eq_ignore_ascii_case("plain") {
            Ok(Self::Plain)
        } else if method.eq_ignore_ascii_case("s256") {
            Ok(Self::S256)
        } else {
            Err(PkceError::unsupported_method(method))
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::S256 => "S256",
        }
    }

    /// Computes the challenge this method expects for `verifier`.
    #[must_use]
    pub fn challenge_for(&self, verifier: &str) -> String {
        match self {
            Self::Plain => verifier.to_string(),
            Self::S256 => s256_challenge(verifier),
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PkceChallengeMethod {
    type Err = PkceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// Verification
// =============================================================================

/// Computes `BASE64URL(SHA256(ASCII(verifier)))`.
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Checks a presented verifier against a stored challenge.
///
/// # Errors
///
/// - `PkceError::UnsupportedMethod` if `method` is unknown
/// - `PkceError::VerificationFailed` if the verifier does not produce the challenge
pub fn verify_code_challenge(challenge: &str, method: &str, verifier: &str) -> Result<(), PkceError> {
    let method = PkceChallengeMethod::parse(method)?;
    let expected = method.challenge_for(verifier);

    if bool::from(expected.as_bytes().ct_eq(challenge.as_bytes())) {
        Ok(())
    } else {
        Err(PkceError::VerificationFailed)
    }
}

/// Checks the optional PKCE fields of a code against an optional verifier.
///
/// # Errors
///
/// Returns `PkceError::MissingParameter` when either side is absent, and the
/// errors of [`verify_code_challenge`] otherwise.
pub fn verify_stored_challenge(
    challenge: Option<&str>,
    method: Option<&str>,
    verifier: Option<&str>,
) -> Result<(), PkceError> {
    let challenge = challenge.ok_or(PkceError::MissingParameter("code_challenge"))?;
    let method = method.ok_or(PkceError::MissingParameter("code_challenge_method"))?;
    let verifier = verifier.ok_or(PkceError::MissingParameter("code_verifier"))?;
    verify_code_challenge(challenge, method, verifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B
    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    // -------------------------------------------------------------------------
    // Method Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_method_parse() {
        assert_eq!(PkceChallengeMethod::parse("S256").unwrap(), PkceChallengeMethod::S256);
        assert_eq!(PkceChallengeMethod::parse("s256").unwrap(), PkceChallengeMethod::S256);
        assert_eq!(PkceChallengeMethod::parse("PLAIN").unwrap(), PkceChallengeMethod::Plain);
        assert_eq!(PkceChallengeMethod::parse("plain").unwrap(), PkceChallengeMethod::Plain);
    }

    #[test]
    fn test_method_parse_unknown() {
        let err = PkceChallengeMethod::parse("S512").unwrap_err();
        assert_eq!(err, PkceError::UnsupportedMethod("S512".to_string()));
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[test]
    fn test_method_display() {
        assert_eq!(PkceChallengeMethod::Plain.to_string(), "PLAIN");
        assert_eq!(PkceChallengeMethod::S256.to_string(), "S256");
    }

    // -------------------------------------------------------------------------
    // Verification Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_s256_rfc_vector() {
        assert_eq!(s256_challenge(RFC_VERIFIER), RFC_CHALLENGE);
        assert!(verify_code_challenge(RFC_CHALLENGE, "S256", RFC_VERIFIER).is_ok());
    }

    #[test]
    fn test_s256_mismatch() {
        let err = verify_code_challenge(RFC_CHALLENGE, "S256", "another-verifier").unwrap_err();
        assert!(err.is_verification_error());
        assert_eq!(err.oauth_error_code(), "invalid_grant");

        let err = verify_code_challenge("not-the-challenge", "S256", RFC_VERIFIER).unwrap_err();
        assert!(err.is_verification_error());
    }

    #[test]
    fn test_s256_does_not_accept_plain_verifier() {
        // Sending the verifier as the challenge must not pass the hash method
        assert!(verify_code_challenge(RFC_VERIFIER, "S256", RFC_VERIFIER).is_err());
    }

    #[test]
    fn test_plain() {
        assert!(verify_code_challenge("same-value", "PLAIN", "same-value").is_ok());
        assert!(verify_code_challenge("same-value", "plain", "same-value").is_ok());
        assert!(verify_code_challenge("same-value", "PLAIN", "other-value").is_err());
    }

    #[test]
    fn test_unknown_method_fails() {
        assert!(matches!(
            verify_code_challenge(RFC_CHALLENGE, "md5", RFC_VERIFIER),
            Err(PkceError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_stored_challenge_missing_parts() {
        assert_eq!(
            verify_stored_challenge(None, Some("S256"), Some(RFC_VERIFIER)),
            Err(PkceError::MissingParameter("code_challenge"))
        );
        assert_eq!(
            verify_stored_challenge(Some(RFC_CHALLENGE), None, Some(RFC_VERIFIER)),
            Err(PkceError::MissingParameter("code_challenge_method"))
        );
        assert_eq!(
            verify_stored_challenge(Some(RFC_CHALLENGE), Some("S256"), None),
            Err(PkceError::MissingParameter("code_verifier"))
        );
        assert!(verify_stored_challenge(Some(RFC_CHALLENGE), Some("S256"), Some(RFC_VERIFIER)).is_ok());
    }
}
