//! HTTP Basic authentication for the upload route.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hlsforge_common::Error;

use crate::config::AuthConfig;
use crate::server::{AppContext, AppError};

/// Split an `Authorization: Basic ...` header value into username and password.
pub fn parse_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Check credentials against the configured username and bcrypt hash.
///
/// Always fails when no password hash is configured.
pub fn verify_credentials(auth_config: &AuthConfig, username: &str, password: &str) -> bool {
    let Some(ref password_hash) = auth_config.password_hash else {
        return false;
    };
    if username != auth_config.username {
        return false;
    }
    bcrypt::verify(password, password_hash).unwrap_or(false)
}

/// Middleware requiring valid Basic credentials.
pub async fn basic_auth_middleware(
    State(ctx): State<AppContext>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_credentials);

    let Some((username, password)) = credentials else {
        return Err(Error::Unauthorized.into());
    };

    // bcrypt is deliberately slow; keep it off the async workers.
    let auth_config = ctx.config.server.auth.clone();
    let valid = tokio::task::spawn_blocking(move || {
        verify_credentials(&auth_config, &username, &password)
    })
    .await
    .map_err(|e| Error::internal(format!("auth task failed: {e}")))?;

    if !valid {
        tracing::debug!("rejected upload credentials");
        return Err(Error::Unauthorized.into());
    }

    Ok(next.run(request).await)
}

/// Generate a bcrypt password hash
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(password: &str) -> AuthConfig {
        AuthConfig {
            username: "admin".to_string(),
            password_hash: Some(bcrypt::hash(password, 4).unwrap()),
        }
    }

    #[test]
    fn test_parse_basic_credentials() {
        let value = format!("Basic {}", STANDARD.encode("admin:s3cr:et"));
        assert_eq!(
            parse_basic_credentials(&value),
            Some(("admin".to_string(), "s3cr:et".to_string()))
        );

        let value = format!("basic {}", STANDARD.encode("u:p"));
        assert!(parse_basic_credentials(&value).is_some());
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(parse_basic_credentials("Bearer abc").is_none());
        assert!(parse_basic_credentials("Basic !!!not-base64").is_none());
        let no_colon = format!("Basic {}", STANDARD.encode("admin"));
        assert!(parse_basic_credentials(&no_colon).is_none());
        assert!(parse_basic_credentials("").is_none());
    }

    #[test]
    fn test_verify_credentials() {
        let config = config_with("secret");
        assert!(verify_credentials(&config, "admin", "secret"));
        assert!(!verify_credentials(&config, "admin", "wrong"));
        assert!(!verify_credentials(&config, "root", "secret"));
    }

    #[test]
    fn test_no_hash_rejects_everything() {
        let config = AuthConfig::default();
        assert!(!verify_credentials(&config, "admin", ""));
    }
}
