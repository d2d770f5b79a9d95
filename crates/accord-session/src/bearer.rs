//! OAuth access-token extraction.
//!
//! Third-party clients pass the access token either as the `oauth_token`
//! query parameter or as an `Authorization: Bearer` header. The query
//! parameter wins when both are present.

use http::header::AUTHORIZATION;
use http::request::Parts;

/// Query parameter carrying the OAuth access token.
pub const OAUTH_TOKEN_PARAM: &str = "oauth_token";

/// Returns the OAuth access token carried by a request, if any.
pub fn access_token_from_parts(parts: &Parts) -> Option<String> {
    from_query(parts.uri.query()).or_else(|| from_authorization(parts))
}

fn from_query(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == OAUTH_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn from_authorization(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_owned())
}
