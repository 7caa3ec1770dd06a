use chrono::{Datelike, NaiveDate, Weekday};

/// Number of Mon-Fri days in the inclusive range. 0 when `end` precedes `start`.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reversed_range_counts_zero() {
        assert_eq!(business_days(date(2026, 3, 6), date(2026, 3, 2)), 0);
    }

    #[test]
    fn monday_to_friday_is_five() {
        // 2026-03-02 is a Monday
        assert_eq!(business_days(date(2026, 3, 2), date(2026, 3, 6)), 5);
    }

    #[test]
    fn weekend_only_range_is_zero() {
        // Saturday and Sunday of the same weekend
        assert_eq!(business_days(date(2026, 3, 7), date(2026, 3, 8)), 0);
    }

    #[test]
    fn full_week_still_counts_five() {
        // Monday through Sunday
        assert_eq!(business_days(date(2026, 3, 2), date(2026, 3, 8)), 5);
    }

    #[test]
    fn single_business_day() {
        assert_eq!(business_days(date(2026, 3, 4), date(2026, 3, 4)), 1);
    }

    #[test]
    fn range_spanning_two_weekends() {
        // Friday 2026-03-06 through Monday 2026-03-16: 7 business days
        assert_eq!(business_days(date(2026, 3, 6), date(2026, 3, 16)), 7);
    }

    #[test]
    fn any_range_within_one_week_is_at_most_five() {
        let monday = date(2026, 3, 2);
        for from in 0..7 {
            for to in from..7 {
                let n = business_days(
                    monday + chrono::Duration::days(from),
                    monday + chrono::Duration::days(to),
                );
                assert!(n <= 5);
            }
        }
    }
}
