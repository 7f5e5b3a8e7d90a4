//! Text rendering of the activity log for the terminal.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, Utc};

use crate::{
    activity::duration::{display_duration, format_duration, CurrentStatus},
    storage::entities::{Entry, EntryId},
};

const TIME_FORMAT: &str = "%x %H:%M:%S";

pub fn render_status(status: &CurrentStatus) -> String {
    match status {
        CurrentStatus::Unavailable => format!("Currently {}", status.activity()),
        CurrentStatus::Active { elapsed, .. } => format!(
            "Currently {} for {} hours {} minutes",
            status.activity(),
            elapsed.num_hours(),
            elapsed.num_minutes() % 60
        ),
    }
}

/// One tab separated line per entry: time, id, activity, category, duration.
pub fn render_entries(
    entries: &[Entry],
    latest_id: Option<EntryId>,
    now: DateTime<Utc>,
) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                entry.timestamp.with_timezone(&Local).format(TIME_FORMAT),
                entry.id,
                entry.activity,
                entry.category,
                display_duration(entry, latest_id, now)
            )
        })
        .collect()
}

/// Categories sorted by time spent, with their share of the total and the number of entries.
pub fn render_stats(
    totals: &BTreeMap<String, Duration>,
    counts: &BTreeMap<String, usize>,
) -> Vec<String> {
    let whole = totals.values().fold(Duration::zero(), |acc, v| acc + *v);
    let mut rows = totals.iter().collect::<Vec<_>>();
    rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    rows.into_iter()
        .map(|(category, duration)| {
            format!(
                "{}%\t{}\t{}\t{}",
                share(*duration, whole),
                format_duration(*duration),
                counts.get(category).copied().unwrap_or_default(),
                category
            )
        })
        .collect()
}

fn share(value: Duration, whole: Duration) -> i64 {
    if whole.num_seconds() <= 0 {
        return 0;
    }
    value.num_seconds() * 100 / whole.num_seconds()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone, Utc};

    use crate::{activity::duration::CurrentStatus, storage::entities::Entry};

    use super::{render_entries, render_stats, render_status};

    #[test]
    fn test_render_status() {
        assert_eq!(
            render_status(&CurrentStatus::Unavailable),
            "Currently unavailable"
        );
        let entry = Entry {
            id: 1,
            activity: "coding".into(),
            category: "Work".into(),
            timestamp: Utc.with_ymd_and_hms(2018, 7, 4, 10, 0, 0).unwrap(),
            duration: None,
        };
        assert_eq!(
            render_status(&CurrentStatus::Active {
                entry,
                elapsed: Duration::minutes(95)
            }),
            "Currently coding for 1 hours 35 minutes"
        );
    }

    #[test]
    fn test_render_entries_columns() {
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 10, 0, 0).unwrap();
        let entries = vec![
            Entry {
                id: 2,
                activity: "lunch".into(),
                category: "Personal".into(),
                timestamp: start + Duration::minutes(30),
                duration: None,
            },
            Entry {
                id: 1,
                activity: "coding".into(),
                category: "Work".into(),
                timestamp: start,
                duration: Some(Duration::minutes(30)),
            },
        ];
        let lines = render_entries(&entries, Some(2), start + Duration::minutes(100));
        let columns = lines
            .iter()
            .map(|line| line.split('\t').skip(1).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert_eq!(columns[0], vec!["2", "lunch", "Personal", "1h 10m"]);
        assert_eq!(columns[1], vec!["1", "coding", "Work", "30m"]);
    }

    #[test]
    fn test_render_stats_sorted_by_time() {
        let totals = BTreeMap::from([
            ("Personal".to_string(), Duration::minutes(15)),
            ("Work".to_string(), Duration::minutes(45)),
        ]);
        let counts = BTreeMap::from([("Personal".to_string(), 1), ("Work".to_string(), 2)]);
        assert_eq!(
            render_stats(&totals, &counts),
            vec!["75%\t45m\t2\tWork", "25%\t15m\t1\tPersonal"]
        );
        assert!(render_stats(&BTreeMap::new(), &BTreeMap::new()).is_empty());
    }
}
