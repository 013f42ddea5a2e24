// ── Resource identifier ──
//
// The stable, opaque key a managed resource is stored and imported under.
// It pairs the REST path with the API version the resource is addressed at:
//
//   /subscriptions/s1/resourceGroups/rg?api-version=2021-04-01
//
// The api version is percent-encoded, so the last `?api-version=` in an
// encoded identifier is always the separator, even if the path itself
// carries that text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const API_VERSION_SEPARATOR: &str = "?api-version=";

/// Composite `(url, api_version)` key of a managed resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceIdentifier {
    url: String,
    api_version: String,
}

impl ResourceIdentifier {
    /// Both parts must be non-empty; nothing else is checked.
    pub fn new(url: impl Into<String>, api_version: impl Into<String>) -> Result<Self, CoreError> {
        let url = url.into();
        let api_version = api_version.into();
        if url.is_empty() {
            return Err(CoreError::Validation {
                field: "url".into(),
                reason: "must not be empty".into(),
            });
        }
        if api_version.is_empty() {
            return Err(CoreError::Validation {
                field: "api_version".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(Self { url, api_version })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Render the identifier as a single string.
    pub fn encode(&self) -> String {
        format!(
            "{}{API_VERSION_SEPARATOR}{}",
            self.url,
            urlencoding::encode(&self.api_version)
        )
    }

    /// Parse an identifier produced by [`encode`](Self::encode).
    ///
    /// Unencoded api versions (`2021-04-01-preview`) decode unchanged, so
    /// hand-written identifiers work too.
    pub fn decode(input: &str) -> Result<Self, CoreError> {
        let malformed = |reason: &str| CoreError::MalformedIdentifier {
            input: input.to_owned(),
            reason: reason.to_owned(),
        };

        let (url, encoded_version) = input
            .rsplit_once(API_VERSION_SEPARATOR)
            .ok_or_else(|| malformed("expected `{url}?api-version={version}`"))?;
        if url.is_empty() {
            return Err(malformed("url part is empty"));
        }
        let api_version = urlencoding::decode(encoded_version)
            .map_err(|_| malformed("api-version is not valid percent-encoded UTF-8"))?;
        if api_version.is_empty() {
            return Err(malformed("api-version part is empty"));
        }

        Ok(Self {
            url: url.to_owned(),
            api_version: api_version.into_owned(),
        })
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ResourceIdentifier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for ResourceIdentifier {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

impl From<ResourceIdentifier> for String {
    fn from(id: ResourceIdentifier) -> Self {
        id.encode()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encodes_in_readable_form() {
        let id = ResourceIdentifier::new("/subscriptions/s1/resourceGroups/rg", "2021-04-01").unwrap();
        assert_eq!(
            id.encode(),
            "/subscriptions/s1/resourceGroups/rg?api-version=2021-04-01"
        );
        assert_eq!(id.to_string(), id.encode());
    }

    #[test]
    fn decodes_plain_identifier() {
        let id: ResourceIdentifier = "/things/a?api-version=2021-04-01-preview".parse().unwrap();
        assert_eq!(id.url(), "/things/a");
        assert_eq!(id.api_version(), "2021-04-01-preview");
    }

    #[test]
    fn url_containing_the_separator_round_trips() {
        let id = ResourceIdentifier::new("/weird?api-version=old/x", "2020-01-01").unwrap();
        assert_eq!(ResourceIdentifier::decode(&id.encode()).unwrap(), id);
    }

    #[test]
    fn api_version_with_reserved_characters_round_trips() {
        let id = ResourceIdentifier::new("/things/a%2Fb", "v1?beta=true&x=1").unwrap();
        let encoded = id.encode();
        assert_eq!(encoded.matches(API_VERSION_SEPARATOR).count(), 1);
        assert_eq!(ResourceIdentifier::decode(&encoded).unwrap(), id);
    }

    #[test]
    fn missing_separator_is_malformed() {
        let err = ResourceIdentifier::decode("/things/a").unwrap_err();
        assert!(matches!(err, CoreError::MalformedIdentifier { .. }));
    }

    #[test]
    fn empty_parts_are_malformed() {
        assert!(ResourceIdentifier::decode("?api-version=1.0").is_err());
        assert!(ResourceIdentifier::decode("/things/a?api-version=").is_err());
        assert!(ResourceIdentifier::new("", "1.0").is_err());
        assert!(ResourceIdentifier::new("/a", "").is_err());
    }

    #[test]
    fn serializes_as_encoded_string() {
        let id = ResourceIdentifier::new("/things/a", "1.0").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"/things/a?api-version=1.0\"");
        let back: ResourceIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ResourceIdentifier>("\"/things/a\"").is_err());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            url in "/[a-zA-Z0-9/%?=&._-]{0,40}",
            api_version in "[ -~]{1,24}",
        ) {
            let id = ResourceIdentifier::new(url, api_version).unwrap();
            prop_assert_eq!(ResourceIdentifier::decode(&id.encode()).unwrap(), id);
        }
    }
}
