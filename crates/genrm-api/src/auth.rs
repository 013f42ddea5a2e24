use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Credentials for authenticating with a resource manager endpoint.
///
/// Token acquisition (service principals, managed identity, CLI login) is
/// owned by whoever builds these credentials; this crate only attaches them.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Pre-acquired OAuth bearer token, sent as `Authorization: Bearer …`.
    BearerToken(SecretString),
    /// No authentication header (local emulators, test servers).
    Anonymous,
}

impl Credentials {
    /// Default headers carrying these credentials.
    pub fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        if let Self::BearerToken(token) = self {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| Error::Authentication {
                    message: format!("invalid bearer token header value: {e}"),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_becomes_sensitive_header() {
        let creds = Credentials::BearerToken(SecretString::from("abc".to_string()));
        let headers = creds.headers().unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Bearer abc");
    }

    #[test]
    fn anonymous_has_no_headers() {
        assert!(Credentials::Anonymous.headers().unwrap().is_empty());
    }

    #[test]
    fn newline_in_token_is_rejected() {
        let creds = Credentials::BearerToken(SecretString::from("bad\ntoken".to_string()));
        assert!(matches!(
            creds.headers(),
            Err(Error::Authentication { .. })
        ));
    }
}
