//! Chat-driven report intake: identity linking, intent routing and replies

pub mod identity;
pub mod intent;
pub mod replies;
pub mod router;

pub use router::IntakeRouter;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// Midnight of the business day containing `now`, expressed in UTC
pub fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let Some(local_midnight) = now.with_timezone(&offset).date_naive().and_hms_opt(0, 0, 0)
    else {
        return now;
    };

    offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_day_uses_business_offset() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();

        // 2026-10-19 20:00 UTC is 2026-10-20 05:00 JST
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap();
        assert_eq!(
            start_of_day(now, jst),
            Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()
        );

        // 2026-10-19 10:00 UTC is 2026-10-19 19:00 JST
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        assert_eq!(
            start_of_day(now, jst),
            Utc.with_ymd_and_hms(2026, 10, 18, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_start_of_day_in_utc() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            start_of_day(now, utc),
            Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()
        );
    }
}
