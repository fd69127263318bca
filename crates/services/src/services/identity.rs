use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// The caller a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Missing session token")]
    MissingToken,
    #[error("Invalid session token: {0}")]
    InvalidToken(String),
    #[error("Session verification is not configured")]
    NotConfigured,
}

/// Resolves a session token into an opaque user id.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, IdentityError>;
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, IdentityError> {
    let header = header.ok_or(IdentityError::MissingToken)?.trim();
    let (scheme, token) = header.split_once(' ').ok_or(IdentityError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(IdentityError::MissingToken);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(IdentityError::MissingToken);
    }
    Ok(token)
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    azp: Option<String>,
}

/// Networkless verification of Clerk session JWTs against the instance's
/// PEM public key.
pub struct ClerkJwtVerifier {
    key: Option<DecodingKey>,
    authorized_parties: Vec<String>,
}

impl ClerkJwtVerifier {
    pub fn from_pem(pem: &SecretString) -> Result<Self, IdentityError> {
        // Clerk dashboards hand the key out with literal "\n" sequences.
        let pem = pem.expose_secret().replace("\\n", "\n");
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| IdentityError::InvalidToken(format!("bad verification key: {e}")))?;
        Ok(Self {
            key: Some(key),
            authorized_parties: Vec::new(),
        })
    }

    /// A verifier that rejects every token. Used when no key is configured
    /// so the rest of the server can still start.
    pub fn unconfigured() -> Self {
        Self {
            key: None,
            authorized_parties: Vec::new(),
        }
    }

    pub fn with_authorized_parties(mut self, parties: Vec<String>) -> Self {
        self.authorized_parties = parties;
        self
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        // Session tokens carry no audience.
        validation.validate_aud = false;
        validation.leeway = 5;
        validation
    }
}

#[async_trait]
impl IdentityVerifier for ClerkJwtVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, IdentityError> {
        let key = self.key.as_ref().ok_or(IdentityError::NotConfigured)?;
        let data = decode::<SessionClaims>(token, key, &Self::validation())
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        if !self.authorized_parties.is_empty() {
            let allowed = claims
                .azp
                .as_ref()
                .is_some_and(|azp| self.authorized_parties.iter().any(|party| party == azp));
            if !allowed {
                return Err(IdentityError::InvalidToken(
                    "unexpected authorized party".to_string(),
                ));
            }
        }

        if claims.sub.trim().is_empty() {
            return Err(IdentityError::InvalidToken("empty subject".to_string()));
        }
        Ok(AuthenticatedUser { user_id: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;

    const PRIVATE_KEY: &str = include_str!("../../testdata/session_signing_key.pem");
    const PUBLIC_KEY: &str = include_str!("../../testdata/session_signing_key.pub.pem");

    fn sign(claims: serde_json::Value) -> String {
        let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).expect("signing key");
        encode(&Header::new(Algorithm::RS256), &claims, &key).expect("sign token")
    }

    fn verifier() -> ClerkJwtVerifier {
        ClerkJwtVerifier::from_pem(&SecretString::from(PUBLIC_KEY.to_string()))
            .expect("verification key")
    }

    fn exp_in(seconds: i64) -> i64 {
        Utc::now().timestamp() + seconds
    }

    #[tokio::test]
    async fn valid_token_yields_subject() {
        let token = sign(json!({"sub": "user_2abc", "exp": exp_in(300)}));
        let user = verifier().verify(&token).await.expect("verify");
        assert_eq!(user.user_id, "user_2abc");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let token = sign(json!({"sub": "user_2abc", "exp": exp_in(-600)}));
        assert!(matches!(
            verifier().verify(&token).await,
            Err(IdentityError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn token_without_subject_is_rejected() {
        let token = sign(json!({"exp": exp_in(300)}));
        assert!(verifier().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn authorized_party_must_match_when_configured() {
        let verifier = verifier().with_authorized_parties(vec!["https://app.example".to_string()]);

        let good = sign(json!({"sub": "u1", "exp": exp_in(300), "azp": "https://app.example"}));
        assert!(verifier.verify(&good).await.is_ok());

        let bad = sign(json!({"sub": "u1", "exp": exp_in(300), "azp": "https://evil.example"}));
        assert!(verifier.verify(&bad).await.is_err());
    }

    #[tokio::test]
    async fn garbage_and_unconfigured() {
        assert!(verifier().verify("not-a-jwt").await.is_err());
        assert!(matches!(
            ClerkJwtVerifier::unconfigured().verify("anything").await,
            Err(IdentityError::NotConfigured)
        ));
    }

    #[test]
    fn escaped_newlines_in_key_are_accepted() {
        let escaped = PUBLIC_KEY.replace('\n', "\\n");
        assert!(ClerkJwtVerifier::from_pem(&SecretString::from(escaped)).is_ok());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("bearer   abc")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(IdentityError::MissingToken)));
        assert!(bearer_token(Some("Basic abc")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
    }
}
