use chrono::{DateTime, Duration, Utc};

use crate::domain::repository::LoginRecordRepository;
use crate::domain::types::{
    LOCKOUT_THRESHOLD, LOCKOUT_WAIT_MINUTES, LOCKOUT_WINDOW_SECS, LoginRecord,
};
use crate::error::AccountServiceError;

/// Failures at the head of `records` (newest first) before the first success.
pub fn trailing_failures(records: &[LoginRecord]) -> usize {
    records.iter().take_while(|r| !r.success).count()
}

/// Reject with `TooManyFailures` when the user's trailing failures inside the
/// lockout window reach the threshold.
pub async fn ensure_not_locked_out<L: LoginRecordRepository>(
    records: &L,
    user_id: i32,
    now: DateTime<Utc>,
) -> Result<(), AccountServiceError> {
    let since = now - Duration::seconds(LOCKOUT_WINDOW_SECS);
    let recent = records.recent_for_user(user_id, since).await?;
    let failures = trailing_failures(&recent);
    if failures >= LOCKOUT_THRESHOLD {
        tracing::warn!(user_id, failures, "login locked out");
        return Err(AccountServiceError::TooManyFailures {
            wait_minutes: LOCKOUT_WAIT_MINUTES,
        });
    }
    Ok(())
}
