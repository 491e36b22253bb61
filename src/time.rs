//! Platform-aware clock used for packet timestamps and vault records.
//!
//! On native platforms this is `chrono::Utc::now()`; on WASM,
//! `js_sys::Date::now()` since `std::time::SystemTime` is not available on
//! `wasm32-unknown-unknown`.

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_timestamp_millis_is_reasonable() {
        let ts = now_timestamp_millis();
        // After 2024-01-01 and before 2100-01-01, in millis
        assert!(ts > 1_704_067_200_000, "Timestamp {} is too old", ts);
        assert!(ts < 4_102_444_800_000, "Timestamp {} is too far in future", ts);
    }
}
