use std::future::Future;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::domain::types::TOKEN_MAX_RETRIES;
use crate::error::AccountServiceError;

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Opaque URL-safe random token.
pub fn generate_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; TOKEN_BYTES]>())
}

/// Draw tokens until `exists` reports one as unused.
///
/// The store's unique index stays the authoritative guard; this only keeps
/// the common path free of constraint violations.
pub async fn generate_unique_token<F, Fut>(mut exists: F) -> Result<String, AccountServiceError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, AccountServiceError>>,
{
    for _ in 0..TOKEN_MAX_RETRIES {
        let candidate = generate_token();
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }
    tracing::error!(
        retries = TOKEN_MAX_RETRIES,
        "token space exhausted: every candidate collided"
    );
    Err(AccountServiceError::TokenSpaceExhausted)
}
