use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Authorization header scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Basic,
    Bearer,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Basic => "Basic",
            Scheme::Bearer => "Bearer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub authorized: bool,
    pub reason: String,
}

impl AuthResult {
    pub fn granted() -> Self {
        Self {
            authorized: true,
            reason: String::new(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            authorized: false,
            reason: reason.into(),
        }
    }
}

/// Decides whether a raw `Authorization` header value grants access.
#[async_trait]
pub trait AuthGate: Send + Sync {
    async fn authorize(&self, credential: Option<&str>, scheme: Scheme) -> AuthResult;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    WrongScheme(Scheme),
    Malformed,
    BadCredentials,
    Expired,
    Revoked,
    Invalid,
    Signing(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Missing => write!(f, "missing credential"),
            AuthError::WrongScheme(s) => write!(f, "expected {} credential", s.as_str()),
            AuthError::Malformed => write!(f, "malformed credential"),
            AuthError::BadCredentials => write!(f, "bad credentials"),
            AuthError::Expired | AuthError::Revoked => write!(f, "token expired"),
            AuthError::Invalid => write!(f, "unauthorized"),
            AuthError::Signing(e) => write!(f, "token signing failed: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Claims carried by admin tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminClaims {
    pub name: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token so revoking one never revokes another.
    #[serde(default)]
    pub jti: String,
}

/// Split `"<Scheme> <value>"`, requiring the expected scheme.
pub fn credential_value(credential: Option<&str>, scheme: Scheme) -> Result<&str, AuthError> {
    let credential = credential.ok_or(AuthError::Missing)?;
    let (kind, value) = credential.trim().split_once(' ').ok_or(AuthError::Malformed)?;
    if kind != scheme.as_str() {
        return Err(AuthError::WrongScheme(scheme));
    }
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(value)
}

/// Single admin account: Basic login against configured credentials, then
/// HS256 bearer tokens. Revoked tokens are remembered until they expire.
pub struct AdminGate {
    username: String,
    password: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    revoked: DashMap<String, i64>,
}

impl AdminGate {
    pub fn new(username: String, password: String, secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        Self {
            username,
            password,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            revoked: DashMap::new(),
        }
    }

    pub fn issue_token(&self) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AdminClaims {
            name: self.username.clone(),
            sub: "0".into(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: ulid::Ulid::new().to_string(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &AdminClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<AdminClaims, AuthError> {
        let data = decode::<AdminClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            }
        })?;
        if self.revoked.contains_key(token) {
            return Err(AuthError::Revoked);
        }
        if data.claims.name != self.username {
            return Err(AuthError::Invalid);
        }
        Ok(data.claims)
    }

    /// Check a Basic credential against the admin account.
    pub fn check_basic(&self, encoded: &str) -> Result<(), AuthError> {
        let decoded = BASE64.decode(encoded).map_err(|_| AuthError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
        let (user, pass) = decoded.split_once(':').ok_or(AuthError::Malformed)?;
        if user == self.username && pass == self.password {
            Ok(())
        } else {
            Err(AuthError::BadCredentials)
        }
    }

    /// Reject `token` from now on. Only valid tokens can be revoked.
    pub fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.verify(token)?;
        let now = Utc::now().timestamp();
        self.revoked.retain(|_, exp| *exp > now);
        self.revoked.insert(token.to_string(), claims.exp);
        Ok(())
    }

    pub fn check(&self, credential: Option<&str>, scheme: Scheme) -> Result<(), AuthError> {
        let value = credential_value(credential, scheme)?;
        match scheme {
            Scheme::Basic => self.check_basic(value),
            Scheme::Bearer => self.verify(value).map(|_| ()),
        }
    }
}

#[async_trait]
impl AuthGate for AdminGate {
    async fn authorize(&self, credential: Option<&str>, scheme: Scheme) -> AuthResult {
        match self.check(credential, scheme) {
            Ok(()) => AuthResult::granted(),
            Err(e) => AuthResult::denied(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AdminGate {
        AdminGate::new("admin".into(), "s3cret".into(), b"test-secret", Duration::days(30))
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{user}:{pass}")))
    }

    #[tokio::test]
    async fn basic_login() {
        let g = gate();
        assert!(g.authorize(Some(&basic("admin", "s3cret")), Scheme::Basic).await.authorized);
        let wrong = g.authorize(Some(&basic("admin", "nope")), Scheme::Basic).await;
        assert!(!wrong.authorized);
        assert_eq!(wrong.reason, "bad credentials");
    }

    #[tokio::test]
    async fn issued_token_authorizes_bearer_only() {
        let g = gate();
        let token = g.issue_token().unwrap();
        let header = format!("Bearer {token}");
        assert!(g.authorize(Some(&header), Scheme::Bearer).await.authorized);
        assert!(!g.authorize(Some(&header), Scheme::Basic).await.authorized);
        assert!(!g.authorize(Some(&basic("admin", "s3cret")), Scheme::Bearer).await.authorized);
    }

    #[tokio::test]
    async fn missing_and_garbage_credentials() {
        let g = gate();
        assert_eq!(g.authorize(None, Scheme::Bearer).await.reason, "missing credential");
        assert!(!g.authorize(Some("Bearer"), Scheme::Bearer).await.authorized);
        assert!(!g.authorize(Some("Bearer not.a.jwt"), Scheme::Bearer).await.authorized);
    }

    #[test]
    fn expired_token_rejected() {
        let g = gate();
        let now = Utc::now().timestamp();
        let token = g
            .sign(&AdminClaims {
                name: "admin".into(),
                sub: "0".into(),
                iat: now - 100,
                exp: now - 10,
                jti: String::new(),
            })
            .unwrap();
        assert_eq!(g.verify(&token), Err(AuthError::Expired));
        assert_eq!(AuthError::Expired.to_string(), "token expired");
    }

    #[test]
    fn token_for_other_name_rejected() {
        let g = gate();
        let now = Utc::now().timestamp();
        let token = g
            .sign(&AdminClaims {
                name: "mallory".into(),
                sub: "0".into(),
                iat: now,
                exp: now + 60,
                jti: String::new(),
            })
            .unwrap();
        assert_eq!(g.verify(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn token_from_other_secret_rejected() {
        let other = AdminGate::new("admin".into(), "s3cret".into(), b"another", Duration::days(1));
        let token = other.issue_token().unwrap();
        assert_eq!(gate().verify(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn revoked_token_rejected() {
        let g = gate();
        let token = g.issue_token().unwrap();
        g.revoke(&token).unwrap();
        assert_eq!(g.verify(&token), Err(AuthError::Revoked));
        // a revoked token cannot be revoked again
        assert!(g.revoke(&token).is_err());
        // a fresh login in the same second still works
        let next = g.issue_token().unwrap();
        assert!(g.verify(&next).is_ok());
    }
}
