//! Credential rotation on rate limits.
//!
//! [`invoke_with_rotation`] runs a unit of work with the pool's current key.
//! When the provider answers with a rate-limit signal (see
//! [`Error::is_rate_limit`]) the pool cursor moves to the next key and the
//! work is retried, at most once per key. Any other error is returned as is.
//!
//! The cursor is sticky: a later call starts from the key that last worked,
//! not from the first key in the pool. A single call walks the pool from the
//! position it started at, so concurrent calls moving the cursor never make
//! it repeat a key or skip one.

use std::future::Future;

use tracing::{debug, warn};

use crate::auth::{ApiKey, CredentialPool};
use crate::{Error, Result};

/// Run `work` against the pool, rotating keys on rate limits.
///
/// # Errors
///
/// - [`Error::NoCredentialsConfigured`] if the pool is empty (`work` is not called)
/// - [`Error::AllCredentialsExhausted`] if every key was rate limited
/// - any non-rate-limit error returned by `work`, unchanged
pub async fn invoke_with_rotation<T, F, Fut>(pool: &CredentialPool, mut work: F) -> Result<T>
where
    F: FnMut(ApiKey) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = pool.len();
    let start = pool.cursor();
    let mut last_rate_limit = None;

    for attempt in 1..=attempts {
        let index = (start + attempt - 1) % attempts;
        let Some(key) = pool.key_at(index).cloned() else {
            break;
        };
        debug!(provider = pool.provider(), attempt, index, "invoking provider");

        match work(key).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limit() => {
                let next = pool.advance_from(index);
                warn!(
                    provider = pool.provider(),
                    attempt,
                    attempts,
                    next,
                    "credential rate limited, rotating"
                );
                last_rate_limit = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    match last_rate_limit {
        Some(last) => Err(Error::AllCredentialsExhausted {
            provider: pool.provider().to_string(),
            attempts,
            last: last.to_string(),
        }),
        None => Err(Error::NoCredentialsConfigured {
            provider: pool.provider().to_string(),
            hint: pool.missing_hint(),
        }),
    }
}
