use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::storage::entities::Entry;

/// Entry whose timestamp is closest to `target`. On a tie the entry that comes first in storage
/// order wins.
pub fn nearest(entries: &[Entry], target: DateTime<Utc>) -> Option<&Entry> {
    let mut best: Option<(&Entry, Duration)> = None;
    for entry in entries {
        let distance = (entry.timestamp - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((entry, distance)),
        }
    }
    best.map(|(entry, _)| entry)
}

/// Total time spent per category. Entries without a duration count their running time up to
/// `now`. Categories without entries are absent.
pub fn category_totals(entries: &[Entry], now: DateTime<Utc>) -> BTreeMap<String, Duration> {
    let mut totals = BTreeMap::<String, Duration>::new();
    for entry in entries {
        let duration = entry
            .duration
            .unwrap_or_else(|| (now - entry.timestamp).max(Duration::zero()));
        *totals
            .entry(entry.category.clone())
            .or_insert_with(Duration::zero) += duration;
    }
    totals
}

/// Number of logged entries per category.
pub fn category_counts(entries: &[Entry]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::<String, usize>::new();
    for entry in entries {
        *counts.entry(entry.category.clone()).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::storage::entities::Entry;

    use super::{category_counts, category_totals, nearest};

    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE) + Duration::minutes(minutes)
    }

    fn entry(id: i64, category: &str, minutes: i64, duration: Option<Duration>) -> Entry {
        Entry {
            id,
            activity: format!("activity {id}"),
            category: category.into(),
            timestamp: at(minutes),
            duration,
        }
    }

    fn half_hour_log() -> Vec<Entry> {
        vec![
            entry(1, "Work", 0, Some(Duration::minutes(30))),
            entry(2, "Personal", 30, Some(Duration::minutes(30))),
            entry(3, "Work", 60, None),
        ]
    }

    #[test]
    fn test_nearest_empty() {
        assert_eq!(nearest(&[], at(0)), None);
    }

    #[test]
    fn test_nearest_picks_closest() {
        let entries = half_hour_log();
        assert_eq!(nearest(&entries, at(40)).map(|e| e.id), Some(2));
        assert_eq!(nearest(&entries, at(-600)).map(|e| e.id), Some(1));
        assert_eq!(nearest(&entries, at(600)).map(|e| e.id), Some(3));
        assert_eq!(nearest(&entries, at(60)).map(|e| e.id), Some(3));
    }

    #[test]
    fn test_nearest_tie_goes_to_first_stored() {
        let entries = half_hour_log();
        assert_eq!(nearest(&entries, at(15)).map(|e| e.id), Some(1));
        assert_eq!(nearest(&entries, at(45)).map(|e| e.id), Some(2));

        // Storage order decides, not timestamp order.
        let same_moment = vec![
            entry(7, "Work", 10, Some(Duration::zero())),
            entry(8, "Personal", 10, None),
        ];
        assert_eq!(nearest(&same_moment, at(0)).map(|e| e.id), Some(7));
    }

    #[test]
    fn test_category_totals_closed_entries() {
        let entries = vec![
            entry(1, "Work", 0, Some(Duration::minutes(60))),
            entry(2, "Work", 60, Some(Duration::minutes(30))),
            entry(3, "Personal", 90, Some(Duration::minutes(15))),
        ];
        let totals = category_totals(&entries, at(105));
        assert_eq!(
            totals,
            BTreeMap::from([
                ("Personal".to_string(), Duration::minutes(15)),
                ("Work".to_string(), Duration::minutes(90)),
            ])
        );
        assert!(!totals.contains_key("Exercise"));
    }

    #[test]
    fn test_category_totals_counts_running_entry() {
        let totals = category_totals(&half_hour_log(), at(100));
        assert_eq!(totals["Work"], Duration::minutes(70));
        assert_eq!(totals["Personal"], Duration::minutes(30));
    }

    #[test]
    fn test_category_totals_empty() {
        assert!(category_totals(&[], at(0)).is_empty());
    }

    #[test]
    fn test_category_counts() {
        let counts = category_counts(&half_hour_log());
        assert_eq!(
            counts,
            BTreeMap::from([("Personal".to_string(), 1), ("Work".to_string(), 2)])
        );
    }
}
