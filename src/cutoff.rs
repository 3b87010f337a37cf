//! Cutoff policy — is a date still bookable right now?
//!
//! Same-day web bookings close at a fixed local hour (10:00 by default, in
//! the restaurant's timezone). Past dates are never bookable, and the two
//! weekly closing days are rejected outright. All comparisons use the
//! injected server clock shifted into the restaurant's fixed UTC offset.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc, Weekday};

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct CutoffPolicy {
    tz_offset: FixedOffset,
    cutoff_hour: u32,
    closed_weekdays: Vec<Weekday>,
}

impl CutoffPolicy {
    pub fn new(tz_offset: FixedOffset, cutoff_hour: u32, closed_weekdays: Vec<Weekday>) -> Self {
        Self {
            tz_offset,
            cutoff_hour,
            closed_weekdays,
        }
    }

    /// JST, 10:00 cutoff, closed Sunday and Monday.
    pub fn standard() -> Self {
        Self::new(
            FixedOffset::east_opt(9 * 3600).expect("valid offset"),
            10,
            vec![Weekday::Sun, Weekday::Mon],
        )
    }

    /// Gate for the public booking path. `now_utc` comes from the server
    /// clock, never from the request.
    pub fn check(&self, date: NaiveDate, now_utc: DateTime<Utc>) -> Result<(), AppError> {
        if self.closed_weekdays.contains(&date.weekday()) {
            return Err(AppError::ClosedDay);
        }

        let local = now_utc.with_timezone(&self.tz_offset);
        let today = local.date_naive();

        if date < today {
            return Err(AppError::CutOff);
        }
        if date == today && local.hour() >= self.cutoff_hour {
            return Err(AppError::CutOff);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> CutoffPolicy {
        CutoffPolicy::standard()
    }

    /// Build a UTC instant whose JST reading is the given local date-time.
    fn jst(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_allowed_until_one_second_before_cutoff() {
        // 2025-07-04 is a Friday
        let now = jst(2025, 7, 4, 9, 59, 59);
        assert!(policy().check(date(2025, 7, 4), now).is_ok());
    }

    #[test]
    fn same_day_blocked_from_cutoff_hour() {
        let now = jst(2025, 7, 4, 10, 0, 0);
        assert!(matches!(
            policy().check(date(2025, 7, 4), now),
            Err(AppError::CutOff)
        ));
    }

    #[test]
    fn next_day_bookable_past_cutoff_hour() {
        // 10:05 local: today is closed for new bookings, tomorrow is not
        let now = jst(2025, 7, 4, 10, 5, 0);
        assert!(matches!(
            policy().check(date(2025, 7, 4), now),
            Err(AppError::CutOff)
        ));
        assert!(policy().check(date(2025, 7, 5), now).is_ok());
    }

    #[test]
    fn past_dates_are_never_bookable() {
        let now = jst(2025, 7, 4, 8, 0, 0);
        assert!(matches!(
            policy().check(date(2025, 7, 3), now),
            Err(AppError::CutOff)
        ));
    }

    #[test]
    fn closed_weekdays_rejected_regardless_of_time() {
        let now = jst(2025, 7, 1, 8, 0, 0);
        // 2025-07-06 Sunday, 2025-07-07 Monday
        assert!(matches!(
            policy().check(date(2025, 7, 6), now),
            Err(AppError::ClosedDay)
        ));
        assert!(matches!(
            policy().check(date(2025, 7, 7), now),
            Err(AppError::ClosedDay)
        ));
        // Tuesday is fine
        assert!(policy().check(date(2025, 7, 8), now).is_ok());
    }

    #[test]
    fn cutoff_compares_in_restaurant_timezone_not_utc() {
        // 01:30 UTC on the 4th is 10:30 JST — same-day bookings are closed
        // even though UTC still reads early morning.
        let now = Utc.with_ymd_and_hms(2025, 7, 4, 1, 30, 0).unwrap();
        assert!(matches!(
            policy().check(date(2025, 7, 4), now),
            Err(AppError::CutOff)
        ));
    }
}
