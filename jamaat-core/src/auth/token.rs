//! Access token inspection.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Reads the `exp` claim (Unix seconds) from a JWT without verifying it.
///
/// Returns `None` for anything that is not a three-part token with a
/// base64url JSON payload.
#[must_use]
pub fn jwt_expiry(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Claims>(&bytes).ok()?.exp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn reads_exp_claim() {
        let token = token_with(r#"{"sub":"u1","exp":1741400000,"role":"authenticated"}"#);
        assert_eq!(jwt_expiry(&token), Some(1_741_400_000));
    }

    #[test]
    fn missing_exp_is_none() {
        assert_eq!(jwt_expiry(&token_with(r#"{"sub":"u1"}"#)), None);
    }

    #[test]
    fn opaque_tokens_are_none() {
        assert_eq!(jwt_expiry("opaque"), None);
        assert_eq!(jwt_expiry("a.b.c"), None);
        assert_eq!(jwt_expiry("a.b.c.d"), None);
    }
}
