use chrono::{Datelike, Duration, NaiveDate};

use crate::models::WeekBucket;

pub fn previous_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Monday-aligned weeks covering `start..=end`, the last one clipped to `end`.
pub fn make_weeks(start: NaiveDate, end: NaiveDate) -> Vec<WeekBucket> {
    let mut weeks = Vec::new();
    let mut week_start = previous_monday(start);
    while week_start < end {
        weeks.push(WeekBucket {
            start: week_start,
            end: (week_start + Duration::days(6)).min(end),
            resolved: 0,
            unresolved: 0,
        });
        week_start += Duration::days(7);
    }
    weeks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rewinds_to_monday() {
        assert_eq!(previous_monday(date(2019, 6, 23)), date(2019, 6, 17));
        assert_eq!(previous_monday(date(2019, 2, 25)), date(2019, 2, 25));
    }

    #[test]
    fn buckets_tile_the_range() {
        let weeks = make_weeks(date(2019, 2, 27), date(2019, 5, 8));
        assert_eq!(weeks.len(), 11);
        assert_eq!(weeks.first().unwrap().start, date(2019, 2, 25));
        assert_eq!(weeks.last().unwrap().end, date(2019, 5, 8));
        for pair in weeks.windows(2) {
            assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
        }
        assert!(weeks.iter().all(|w| w.resolved == 0 && w.unresolved == 0));
    }

    #[test]
    fn final_bucket_is_clipped() {
        let weeks = make_weeks(date(2019, 6, 23), date(2019, 7, 3));
        assert_eq!(
            weeks.iter().map(|w| (w.start, w.end)).collect::<Vec<_>>(),
            vec![
                (date(2019, 6, 17), date(2019, 6, 23)),
                (date(2019, 6, 24), date(2019, 6, 30)),
                (date(2019, 7, 1), date(2019, 7, 3)),
            ]
        );
    }

    #[test]
    fn monday_end_is_exclusive() {
        let weeks = make_weeks(date(2019, 2, 25), date(2019, 5, 6));
        assert_eq!(weeks.len(), 10);
        assert_eq!(weeks.last().unwrap().start, date(2019, 4, 29));
        assert_eq!(weeks.last().unwrap().end, date(2019, 5, 5));
    }

    #[test]
    fn empty_when_start_not_before_end() {
        assert!(make_weeks(date(2019, 7, 1), date(2019, 7, 1)).is_empty());
        assert!(make_weeks(date(2019, 7, 10), date(2019, 7, 1)).is_empty());
    }
}
