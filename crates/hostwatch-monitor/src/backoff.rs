//! Exponential notification backoff.

use chrono::{DateTime, Duration, Utc};

/// Largest exponent applied to the base interval. Past this the gap is
/// already decades long.
const MAX_EXPONENT: u32 = 20;

/// Minimum gap after `message_count` notifications have been sent:
/// `backoff_minutes * 2^(message_count - 1)`. `None` when the gap does not
/// fit in a [`Duration`].
pub fn notification_gap(message_count: u32, backoff_minutes: u32) -> Option<Duration> {
    if message_count == 0 {
        return Some(Duration::zero());
    }
    let exponent = (message_count - 1).min(MAX_EXPONENT);
    let minutes = i64::from(backoff_minutes).checked_mul(1i64 << exponent)?;
    Duration::try_minutes(minutes)
}

/// Whether another notification may be sent at `now`.
///
/// The first notification of a streak is always due. After that, `now`
/// must be strictly later than `last_sent` plus [`notification_gap`]. A
/// streak with messages but no recorded send time is treated as due. A gap
/// too large to represent is never due.
pub fn notification_due(
    message_count: u32,
    backoff_minutes: u32,
    last_sent: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if message_count == 0 {
        return true;
    }
    match last_sent {
        Some(last_sent) => notification_gap(message_count, backoff_minutes)
            .and_then(|gap| last_sent.checked_add_signed(gap))
            .is_some_and(|next| now > next),
        None => true,
    }
}
