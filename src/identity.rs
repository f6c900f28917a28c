//! Bearer credential resolution
//!
//! Access tokens are HS256 JWTs carrying the actor id in `sub` and the role in
//! `role`. Resolution never consults the record store: the credential alone
//! decides who is calling. Refresh tokens share the format but carry
//! `type: refresh` and are only accepted by [`Identity::verify_refresh`].
use super::error::{Error, Result};
use super::types::{Actor, Role};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const BEARER: &str = "Bearer ";
const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct Identity {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    refresh_ttl: Duration,
}

impl Identity {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::seconds(ttl_secs),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        }
    }

    pub fn with_refresh_ttl(mut self, ttl_secs: i64) -> Self {
        self.refresh_ttl = Duration::seconds(ttl_secs);
        self
    }

    /// Mint an access token for `actor`.
    pub fn issue(&self, actor: &Actor, username: Option<&str>) -> Result<String> {
        self.sign(actor, TokenKind::Access, username.map(str::to_string), self.ttl)
    }

    /// Mint a refresh token. Every call yields a distinct token.
    pub fn issue_refresh(&self, actor: &Actor) -> Result<String> {
        self.sign(actor, TokenKind::Refresh, None, self.refresh_ttl)
    }

    pub fn verify(&self, token: &str) -> Result<Actor> {
        self.verify_kind(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Actor> {
        self.verify_kind(token, TokenKind::Refresh)
    }

    /// Resolve the caller from an `Authorization` header value.
    pub fn resolve(&self, authorization: Option<&str>) -> Result<Actor> {
        let token = authorization
            .and_then(|header| header.strip_prefix(BEARER))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(Error::Unauthenticated)?;

        let actor = self.verify(token).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected bearer credential");
        })?;
        tracing::debug!(actor = %actor.id, role = %actor.role, "resolved caller");

        Ok(actor)
    }

    fn sign(
        &self,
        actor: &Actor,
        kind: TokenKind,
        username: Option<String>,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: actor.id.clone(),
            role: actor.role.as_str().to_string(),
            kind,
            username,
            jti: uuid7::uuid7().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("failed to sign token: {e}")))
    }

    fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Actor> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| Error::InvalidCredential(e.to_string()))?;
        if data.claims.kind != expected {
            return Err(Error::InvalidCredential(format!(
                "expected {} token",
                match expected {
                    TokenKind::Access => "an access",
                    TokenKind::Refresh => "a refresh",
                }
            )));
        }
        let role: Role = data.claims.role.parse()?;

        if data.claims.sub.is_empty() {
            return Err(Error::InvalidCredential("token has an empty subject".into()));
        }

        Ok(Actor::new(data.claims.sub, role))
    }
}

pub fn bearer(token: &str) -> String {
    format!("{BEARER}{token}")
}
