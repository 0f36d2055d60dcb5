//! Bearer token and CORS policy.
//!
//! The token is 32 random bytes, hex-encoded, generated on first start and kept in an
//! owner-only file. It is never rotated by the server; delete the file to get a new one.
//! Cross-origin access is limited to pages served from the loopback host.

use anyhow::{bail, Context, Result};
use axum::http::{header, HeaderMap, HeaderValue, Method};
use rand::RngCore;
use std::path::Path;
use subtle::ConstantTimeEq;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::util::write_private_atomic;

/// Raw token size before hex encoding.
pub const TOKEN_BYTES: usize = 32;

/// The process-wide shared secret.
#[derive(Clone)]
pub struct AuthToken(String);

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

impl AuthToken {
    /// A fresh random token from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap an existing token string after checking its shape.
    pub fn parse(raw: &str) -> Result<Self> {
        let token = raw.trim();
        if token.len() != TOKEN_BYTES * 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!("token must be {} hex characters", TOKEN_BYTES * 2);
        }
        Ok(Self(token.to_ascii_lowercase()))
    }

    /// Load the token at `path`, creating it on first run.
    ///
    /// A file that exists but does not hold a valid token is an error rather than
    /// silently replaced, so clients holding the old value find out.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let token = Self::parse(&contents)
                    .with_context(|| format!("invalid token file {}", path.display()))?;
                tracing::info!(path = %path.display(), "auth token loaded");
                Ok(token)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let token = Self::generate();
                write_private_atomic(path, token.0.as_bytes())
                    .with_context(|| format!("failed to write token file {}", path.display()))?;
                tracing::info!(path = %path.display(), "auth token generated");
                Ok(token)
            }
            Err(e) => {
                Err(e).with_context(|| format!("failed to read token file {}", path.display()))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare `presented` against the token without leaking where they differ.
    pub fn verify(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected.ct_eq(presented).into()
    }
}

/// The credential from an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Paths reachable without a bearer token.
pub fn is_public_path(path: &str) -> bool {
    matches!(path, "/health" | "/v1/health")
}

/// True when `origin` names the loopback host (`localhost`, `127.0.0.1`, `[::1]`).
pub fn is_loopback_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let Some((_scheme, rest)) = origin.split_once("://") else {
        return false;
    };
    let authority = rest.split('/').next().unwrap_or("");
    if authority.contains('@') {
        return false;
    }

    let host = if let Some(v6) = authority.strip_prefix('[') {
        match v6.split_once(']') {
            Some((host, _port)) => host,
            None => return false,
        }
    } else {
        authority.split(':').next().unwrap_or("")
    };

    host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1" || host == "::1"
}

/// CORS layer that only answers loopback origins. Other origins get no CORS headers,
/// so browsers block the response.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _parts| {
            is_loopback_origin(origin)
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
