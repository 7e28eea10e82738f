use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock seconds since the epoch, for the `created` field every chunk
/// on a stream shares.
pub fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Wall-clock microseconds since the epoch, the source of `chat_id`
/// (`chatcmpl-<hex(microseconds)>`, spec.md §4.4). Chat ids are derived
/// from this value and retried by the caller on a registry collision.
pub fn unix_micros() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0)
}
