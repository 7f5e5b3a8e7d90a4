//! Duration accounting. An entry's duration is the gap to the entry appended after it, so the only
//! entry without a stored duration is the latest one, whose running time is derived from the clock.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::storage::entities::{ClosePrevious, Entry, EntryId};

pub const UNAVAILABLE: &str = "unavailable";
pub const ONGOING: &str = "ongoing";

/// What the user is doing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentStatus {
    Unavailable,
    Active { entry: Entry, elapsed: Duration },
}

impl CurrentStatus {
    pub fn activity(&self) -> &str {
        match self {
            CurrentStatus::Unavailable => UNAVAILABLE,
            CurrentStatus::Active { entry, .. } => &entry.activity,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            CurrentStatus::Unavailable => Duration::zero(),
            CurrentStatus::Active { elapsed, .. } => *elapsed,
        }
    }
}

/// The entry a new append closes out. Only the latest entry qualifies: after the latest entry is
/// deleted its predecessor is already closed, and stray open entries further back are left alone.
pub fn latest_open(entries: &[Entry]) -> Option<&Entry> {
    entries.last().filter(|e| e.is_open())
}

/// Timestamp to give a new entry. Entries never go back in time: when the clock reports a moment
/// before the latest entry, the latest entry's timestamp is reused.
pub fn next_timestamp(latest: Option<&Entry>, now: DateTime<Utc>) -> DateTime<Utc> {
    match latest {
        Some(latest) if now < latest.timestamp => {
            warn!(
                "Clock reports {now} which is before the latest entry at {}, clamping",
                latest.timestamp
            );
            latest.timestamp
        }
        _ => now,
    }
}

/// Duration the currently open entry receives once an entry stamped `next_timestamp` is
/// appended after it.
pub fn close_out(open: Option<&Entry>, next_timestamp: DateTime<Utc>) -> Option<ClosePrevious> {
    open.map(|open| ClosePrevious {
        id: open.id,
        duration: non_negative(next_timestamp - open.timestamp),
    })
}

pub fn current_status(entries: &[Entry], now: DateTime<Utc>) -> CurrentStatus {
    match entries.last() {
        None => CurrentStatus::Unavailable,
        Some(latest) => CurrentStatus::Active {
            entry: latest.clone(),
            elapsed: non_negative(now - latest.timestamp),
        },
    }
}

/// Human readable duration of an entry. The latest entry is still running while it is open, so
/// its duration is measured against `now`. Closed entries always show their stored duration.
pub fn display_duration(entry: &Entry, latest_id: Option<EntryId>, now: DateTime<Utc>) -> String {
    if Some(entry.id) == latest_id && entry.is_open() {
        return format_duration(now - entry.timestamp);
    }
    match entry.duration {
        Some(duration) => format_duration(duration),
        None => ONGOING.to_string(),
    }
}

/// `"<H>h <M>m"` for at least an hour, `"<M>m"` otherwise. Seconds are dropped.
pub fn format_duration(v: Duration) -> String {
    let v = non_negative(v);
    let hours = v.num_hours();
    let minutes = v.num_minutes() % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

fn non_negative(v: Duration) -> Duration {
    v.max(Duration::zero())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::storage::entities::{ClosePrevious, Entry};

    use super::{
        close_out, current_status, display_duration, format_duration, latest_open,
        next_timestamp, CurrentStatus,
    };

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn start() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    fn entry(id: i64, offset: Duration, duration: Option<Duration>) -> Entry {
        Entry {
            id,
            activity: format!("activity {id}"),
            category: "Work".into(),
            timestamp: start() + offset,
            duration,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::zero()), "0m");
        assert_eq!(format_duration(Duration::seconds(59)), "0m");
        assert_eq!(format_duration(Duration::seconds(61)), "1m");
        assert_eq!(format_duration(Duration::minutes(59)), "59m");
        assert_eq!(format_duration(Duration::minutes(60)), "1h 0m");
        assert_eq!(
            format_duration(Duration::hours(26) + Duration::minutes(5) + Duration::seconds(30)),
            "26h 5m"
        );
        assert_eq!(format_duration(Duration::minutes(-5)), "0m");
    }

    #[test]
    fn test_display_duration_variants() {
        let now = start() + Duration::hours(3);
        let closed = entry(1, Duration::zero(), Some(Duration::minutes(90)));
        let stray = entry(2, Duration::minutes(90), None);
        let latest = entry(3, Duration::hours(2), None);

        assert_eq!(display_duration(&closed, Some(3), now), "1h 30m");
        assert_eq!(display_duration(&stray, Some(3), now), "ongoing");
        assert_eq!(display_duration(&latest, Some(3), now), "1h 0m");
    }

    #[test]
    fn test_display_duration_closed_latest_uses_stored_value() {
        // Happens once the entry logged after it has been deleted.
        let now = start() + Duration::minutes(100);
        let latest = entry(1, Duration::zero(), Some(Duration::minutes(10)));
        assert_eq!(display_duration(&latest, Some(1), now), "10m");
    }

    #[test]
    fn test_close_out() {
        let open = entry(4, Duration::minutes(10), None);
        assert_eq!(close_out(None, start()), None);
        assert_eq!(
            close_out(Some(&open), start() + Duration::minutes(25)),
            Some(ClosePrevious {
                id: 4,
                duration: Duration::minutes(15)
            })
        );
    }

    #[test]
    fn test_next_timestamp_never_goes_back() {
        let latest = entry(1, Duration::minutes(10), None);
        assert_eq!(next_timestamp(Some(&latest), start()), latest.timestamp);
        assert_eq!(
            next_timestamp(Some(&latest), start() + Duration::minutes(11)),
            start() + Duration::minutes(11)
        );
        assert_eq!(next_timestamp(None, start()), start());
    }

    #[test]
    fn test_current_status() {
        let status = current_status(&[], start());
        assert_eq!(status, CurrentStatus::Unavailable);
        assert_eq!(status.activity(), "unavailable");
        assert_eq!(status.elapsed(), Duration::zero());

        let entries = vec![
            entry(1, Duration::zero(), Some(Duration::minutes(10))),
            entry(2, Duration::minutes(10), None),
        ];
        let status = current_status(&entries, start() + Duration::minutes(75));
        assert_eq!(status.activity(), "activity 2");
        assert_eq!(status.elapsed(), Duration::minutes(65));
        assert_eq!(latest_open(&entries).map(|e| e.id), Some(2));
        assert_eq!(latest_open(&entries[..1]), None);
    }
}
