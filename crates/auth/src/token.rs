//! Signed bearer tokens (JWS compact serialization, RSA-PSS / SHA-512).
//!
//! The token payload is the JSON of a [`Wrapped`] envelope. Validation stops
//! at the envelope: decoding into [`Claims`](crate::Claims) and the expiry
//! check happen in [`wrapped::unwrap_at`](crate::wrapped::unwrap_at), at the
//! point of use.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use thiserror::Error;

use crate::Claims;
use crate::wrapped::{self, WrapError, Wrapped};

/// The only algorithm tokens are signed or accepted with.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::PS512;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not a three-segment compact serialization, or an undecodable payload.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Tampered, truncated, forged or signed with another algorithm.
    #[error("invalid token signature")]
    SignatureInvalid,

    #[error(transparent)]
    Wrap(#[from] WrapError),

    #[error("signing token: {0}")]
    Signing(String),

    #[error("invalid key material: {0}")]
    Key(String),
}

/// An already-loaded RSA key pair.
///
/// Where the PEM bytes come from (files, a secret store) is the caller's
/// concern.
#[derive(Clone)]
pub struct RsaKeyPair {
    private: EncodingKey,
    public: DecodingKey,
}

impl RsaKeyPair {
    pub fn new(private: EncodingKey, public: DecodingKey) -> Self {
        Self { private, public }
    }

    /// Parse PKCS#1 or PKCS#8 PEM encoded keys.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, TokenError> {
        let private =
            EncodingKey::from_rsa_pem(private_pem).map_err(|e| TokenError::Key(e.to_string()))?;
        let public =
            DecodingKey::from_rsa_pem(public_pem).map_err(|e| TokenError::Key(e.to_string()))?;
        Ok(Self { private, public })
    }

    pub fn issuer(&self) -> TokenIssuer {
        TokenIssuer::new(self.private.clone())
    }

    pub fn validator(&self) -> TokenValidator {
        TokenValidator::new(self.public.clone())
    }
}

impl core::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RsaKeyPair").finish_non_exhaustive()
    }
}

/// Signs claims into tokens. Holds the private key.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(key: EncodingKey) -> Self {
        Self { key }
    }

    /// Wrap `claims`, sign the envelope, and return `header.payload.signature`.
    ///
    /// Tokens are not checked for expiry here; an already-expired claim signs
    /// fine and is rejected when it is used.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        let envelope = wrapped::wrap(claims)?;
        let token = jsonwebtoken::encode(&Header::new(SIGNING_ALGORITHM), &envelope, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        tracing::debug!(claims_kind = %claims.kind(), "issued token");
        Ok(token)
    }
}

impl core::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &SIGNING_ALGORITHM)
            .finish_non_exhaustive()
    }
}

/// Verifies tokens and recovers their envelopes. Holds the public key.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
}

impl TokenValidator {
    pub fn new(key: DecodingKey) -> Self {
        Self { key }
    }

    /// Verify `token` and return its envelope.
    ///
    /// The signature is checked over `header.payload` before anything in the
    /// token is parsed, and always with [`SIGNING_ALGORITHM`] regardless of
    /// what the header claims. Expiry is not inspected.
    pub fn validate(&self, token: &str) -> Result<Wrapped, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed(
                "expected three dot-separated segments".to_string(),
            ));
        };
        if header.is_empty() || payload.is_empty() {
            return Err(TokenError::Malformed("empty segment".to_string()));
        }
        if signature.is_empty() {
            return Err(TokenError::SignatureInvalid);
        }

        let message = &token[..header.len() + 1 + payload.len()];
        let verified = jsonwebtoken::crypto::verify(
            signature,
            message.as_bytes(),
            &self.key,
            SIGNING_ALGORITHM,
        )
        .map_err(|_| TokenError::SignatureInvalid)?;
        if !verified {
            return Err(TokenError::SignatureInvalid);
        }

        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| TokenError::Malformed(format!("header: {e}")))?;
        if header.alg != SIGNING_ALGORITHM {
            return Err(TokenError::SignatureInvalid);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::Malformed(format!("payload encoding: {e}")))?;
        serde_json::from_slice(&payload)
            .map_err(|e| TokenError::Malformed(format!("payload: {e}")))
    }
}

impl core::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &SIGNING_ALGORITHM)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use keystone_core::{PartyId, PartyScope, PartyType, UserId};

    use crate::SessionLogin;

    const PRIVATE_PEM: &[u8] = include_bytes!("../tests/fixtures/test_private_key.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("../tests/fixtures/test_public_key.pem");
    const OTHER_PUBLIC_PEM: &[u8] = include_bytes!("../tests/fixtures/other_public_key.pem");

    fn keys() -> RsaKeyPair {
        RsaKeyPair::from_pem(PRIVATE_PEM, PUBLIC_PEM).unwrap()
    }

    fn login() -> Claims {
        Claims::HumanUserLogin(SessionLogin::issue(
            UserId::new("U1"),
            PartyScope::new(PartyType::Company, PartyId::new("C1")),
            Utc::now(),
            Duration::minutes(90),
        ))
    }

    #[test]
    fn issued_token_is_compact_jws() {
        let token = keys().issuer().issue(&login()).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::PS512);
    }

    #[test]
    fn validate_recovers_envelope() {
        let keys = keys();
        let claims = login();
        let token = keys.issuer().issue(&claims).unwrap();

        let envelope = keys.validator().validate(&token).unwrap();
        assert_eq!(envelope, wrapped::wrap(&claims).unwrap());
    }

    #[test]
    fn validate_does_not_check_expiry() {
        let keys = keys();
        let stale = Claims::ResetPassword(crate::ResetPasswordGrant::issue(
            UserId::new("U1"),
            PartyScope::new(PartyType::Company, PartyId::new("C1")),
            Utc::now() - Duration::days(2),
            Duration::minutes(90),
        ));
        let token = keys.issuer().issue(&stale).unwrap();

        let envelope = keys.validator().validate(&token).unwrap();
        assert_eq!(
            wrapped::unwrap(&envelope),
            Err(crate::UnwrapError::Expired)
        );
    }

    #[test]
    fn wrong_public_key_is_rejected() {
        let token = keys().issuer().issue(&login()).unwrap();
        let other = TokenValidator::new(DecodingKey::from_rsa_pem(OTHER_PUBLIC_PEM).unwrap());

        assert_eq!(other.validate(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn malformed_serializations() {
        let validator = keys().validator();
        for token in ["", "abc", "a.b", "a.b.c.d", ".b.c", "a..c"] {
            assert!(
                matches!(validator.validate(token), Err(TokenError::Malformed(_))),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let keys = keys();
        let token = keys.issuer().issue(&login()).unwrap();

        let truncated = &token[..token.len() - 10];
        assert_eq!(keys.validator().validate(truncated), Err(TokenError::SignatureInvalid));

        let (signed, _) = token.rsplit_once('.').unwrap();
        assert_eq!(
            keys.validator().validate(&format!("{signed}.")),
            Err(TokenError::SignatureInvalid)
        );
    }

    #[test]
    fn unsigned_algorithm_swap_is_rejected() {
        let keys = keys();
        let token = keys.issuer().issue(&login()).unwrap();
        let (_, rest) = token.split_once('.').unwrap();

        let forged_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512","typ":"JWT"}"#);
        let forged = format!("{forged_header}.{rest}");
        assert_eq!(keys.validator().validate(&forged), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn bad_key_material() {
        assert!(matches!(
            RsaKeyPair::from_pem(b"not a key", PUBLIC_PEM),
            Err(TokenError::Key(_))
        ));
    }
}
