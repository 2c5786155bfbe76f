use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::config::LinkScheme;
use crate::history::ItemHistory;
use crate::models::{Burndown, BurndownLinks, WeekBucket};
use crate::weeks::make_weeks;

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Counts every history once per week, as of the week's last day.
pub fn fill_weeks(weeks: &mut [WeekBucket], histories: &[ItemHistory]) {
    for history in histories {
        for week in weeks.iter_mut() {
            match history.state_at(midnight(week.end)) {
                Some(true) => week.resolved += 1,
                Some(false) => week.unresolved += 1,
                None => {}
            }
        }
    }
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1).div_euclid(denominator)
}

/// Constant-velocity projection of the remaining work.
///
/// The per-week burn rate is re-planned whenever the weekly total moves,
/// spreading the new remainder over the weeks left.
pub fn forecast(totals: &[u64]) -> Vec<u64> {
    let periods = totals.len() as i64;
    let mut forecasted: Vec<i64> = Vec::with_capacity(totals.len());
    let mut todo: Option<i64> = None;

    for (n, &total) in totals.iter().enumerate() {
        let total = total as i64;
        let diff = if n == 0 {
            0
        } else {
            total - totals[n - 1] as i64
        };
        let last = match forecasted.last() {
            Some(previous) => previous + diff,
            None => total,
        };

        let periods_left = periods - n as i64;
        assert!(
            periods_left > 0,
            "forecast ran past its last period ({n} of {periods})"
        );
        if diff != 0 {
            todo = Some(ceil_div(last, periods_left));
        }
        let rate = *todo.get_or_insert_with(|| ceil_div(total, periods));
        forecasted.push((last - rate).max(0));
    }

    forecasted.into_iter().map(|value| value as u64).collect()
}

pub fn burndown(
    start: NaiveDate,
    end: NaiveDate,
    histories: &[ItemHistory],
    today: NaiveDate,
    links: Option<&LinkScheme>,
) -> Burndown {
    let mut weeks = make_weeks(start, end);
    fill_weeks(&mut weeks, histories);

    let tomorrow = today + Duration::days(1);
    let mut result = Burndown::default();
    let mut all_totals = Vec::with_capacity(weeks.len());

    for week in &weeks {
        let total = week.resolved + week.unresolved;
        result.labels.push(week.end.format("%m-%d").to_string());
        all_totals.push(total);
        if week.start < tomorrow {
            result.totals.push(Some(total));
            result.unresolved.push(Some(week.unresolved));
        } else {
            result.totals.push(None);
            result.unresolved.push(None);
        }
    }
    result.forecasted = forecast(&all_totals);

    result.links = links.map(|scheme| {
        let mut all: Vec<u64> = histories.iter().map(|h| h.id).collect();
        let mut open: Vec<u64> = histories
            .iter()
            .filter(|h| h.state_at(midnight(tomorrow)) == Some(false))
            .map(|h| h.id)
            .collect();
        all.sort_unstable();
        open.sort_unstable();
        BurndownLinks {
            all: scheme.bug_list(&all),
            unresolved: scheme.bug_list(&open),
        }
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransitionEvent;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scenario() -> Vec<ItemHistory> {
        vec![
            ItemHistory::new(
                1,
                midnight(date(2019, 6, 23)),
                [TransitionEvent {
                    at: midnight(date(2019, 7, 1)),
                    resolved: true,
                }],
            ),
            ItemHistory::new(2, midnight(date(2019, 6, 23)), []),
        ]
    }

    #[test]
    fn weekly_counts_follow_resolution() {
        let mut weeks = make_weeks(date(2019, 6, 23), date(2019, 7, 7));
        fill_weeks(&mut weeks, &scenario());

        let counts: Vec<_> = weeks.iter().map(|w| (w.resolved, w.unresolved)).collect();
        assert_eq!(counts, vec![(0, 2), (0, 2), (1, 1)]);
    }

    #[test]
    fn records_missing_at_week_end_are_not_counted() {
        let histories = vec![ItemHistory::new(5, midnight(date(2019, 7, 2)), [])];
        let mut weeks = make_weeks(date(2019, 6, 23), date(2019, 7, 7));
        fill_weeks(&mut weeks, &histories);

        let counts: Vec<_> = weeks.iter().map(|w| (w.resolved, w.unresolved)).collect();
        assert_eq!(counts, vec![(0, 0), (0, 0), (0, 1)]);
    }

    #[test]
    fn future_weeks_report_absent_values() {
        let result = burndown(
            date(2019, 6, 23),
            date(2019, 7, 7),
            &scenario(),
            date(2019, 6, 26),
            None,
        );

        assert_eq!(result.labels, vec!["06-23", "06-30", "07-07"]);
        assert_eq!(result.totals, vec![Some(2), Some(2), None]);
        assert_eq!(result.unresolved, vec![Some(2), Some(2), None]);
        assert_eq!(result.forecasted, vec![1, 0, 0]);
        assert!(result.links.is_none());
    }

    #[test]
    fn today_counts_as_known() {
        let result = burndown(
            date(2019, 6, 23),
            date(2019, 7, 7),
            &scenario(),
            date(2019, 7, 1),
            None,
        );
        assert_eq!(result.totals, vec![Some(2), Some(2), Some(2)]);
        assert_eq!(result.unresolved, vec![Some(2), Some(2), Some(1)]);
    }

    #[test]
    fn links_split_open_records() {
        let links = LinkScheme::new("https://bugzilla.example.org");
        let result = burndown(
            date(2019, 6, 23),
            date(2019, 7, 7),
            &scenario(),
            date(2019, 7, 10),
            Some(&links),
        );
        let links = result.links.unwrap();
        assert_eq!(links.all, "https://bugzilla.example.org/buglist.cgi?bug_id=1,2");
        assert_eq!(links.unresolved, "https://bugzilla.example.org/buglist.cgi?bug_id=2");
    }

    #[test]
    fn forecast_decays_at_constant_rate() {
        assert_eq!(forecast(&[10, 10, 10, 10, 10]), vec![8, 6, 4, 2, 0]);
    }

    #[test]
    fn forecast_stays_at_zero() {
        assert_eq!(forecast(&[2, 2, 2, 2, 2]), vec![1, 0, 0, 0, 0]);
    }

    #[test]
    fn forecast_replans_on_new_work() {
        assert_eq!(forecast(&[10, 10, 16, 16]), vec![7, 4, 5, 0]);
        assert_eq!(forecast(&[0, 0, 4, 4]), vec![0, 0, 2, 0]);
    }

    #[test]
    fn forecast_is_deterministic_and_non_negative() {
        let totals = [3, 9, 9, 14, 14, 14, 20, 21];
        let first = forecast(&totals);
        assert_eq!(first, forecast(&totals));
        assert_eq!(first.len(), totals.len());
        assert_eq!(first.last(), Some(&0));
    }

    #[test]
    fn empty_range_yields_empty_burndown() {
        let result = burndown(
            date(2019, 7, 1),
            date(2019, 7, 1),
            &scenario(),
            date(2019, 7, 1),
            None,
        );
        assert!(result.labels.is_empty());
        assert!(result.forecasted.is_empty());
    }
}
