//! Timestamp helpers for record display and grouping.

use chrono::{DateTime, Local, TimeZone, Utc};

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Short numeric date (`M/D/YY`) in the local time zone.
///
/// Returns `None` when `epoch_ms` is outside the representable range.
pub fn short_date(epoch_ms: i64) -> Option<String> {
    short_date_in(epoch_ms, &Local)
}

/// Short numeric date (`M/D/YY`) in an explicit time zone.
pub fn short_date_in<Tz>(epoch_ms: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::<Utc>::from_timestamp_millis(epoch_ms)?;
    Some(utc.with_timezone(tz).format("%-m/%-d/%y").to_string())
}

/// UTC calendar day (`YYYY-MM-DD`), used as a stable section name.
pub fn day_key(epoch_ms: i64) -> Option<String> {
    let utc = DateTime::<Utc>::from_timestamp_millis(epoch_ms)?;
    Some(utc.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::{day_key, short_date_in};
    use chrono::{FixedOffset, Utc};

    // 2021-01-25T18:30:00Z
    const SAMPLE_MS: i64 = 1_611_599_400_000;

    #[test]
    fn short_date_uses_month_day_two_digit_year() {
        assert_eq!(short_date_in(SAMPLE_MS, &Utc).as_deref(), Some("1/25/21"));
    }

    #[test]
    fn short_date_respects_time_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(short_date_in(SAMPLE_MS, &tokyo).as_deref(), Some("1/26/21"));
    }

    #[test]
    fn day_key_is_sortable_utc_day() {
        assert_eq!(day_key(SAMPLE_MS).as_deref(), Some("2021-01-25"));
        assert_eq!(day_key(i64::MAX), None);
    }
}
