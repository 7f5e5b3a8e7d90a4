use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub type EntryId = i64;

/// A single logged activity. `duration` stays empty while the entry is the most recent one and is
/// filled in exactly once, when the next entry gets appended.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub activity: String,
    pub category: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "duration_ser", default)]
    pub duration: Option<Duration>,
}

impl Entry {
    pub fn is_open(&self) -> bool {
        self.duration.is_none()
    }

    /// Moment the entry stopped being active. Open entries don't have one yet.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.duration.map(|d| self.timestamp + d)
    }
}

/// An entry that hasn't been assigned an id by a backend yet.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NewEntry {
    pub activity: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
}

impl NewEntry {
    /// Timestamps are kept at second precision, the same precision durations are stored with.
    pub fn new(
        activity: impl Into<String>,
        category: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            activity: activity.into(),
            category: category.into(),
            timestamp: timestamp.trunc_subsecs(0),
        }
    }

    pub fn into_entry(self, id: EntryId) -> Entry {
        Entry {
            id,
            activity: self.activity,
            category: self.category,
            timestamp: self.timestamp,
            duration: None,
        }
    }
}

/// Closes out the currently open entry as part of an append.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct ClosePrevious {
    pub id: EntryId,
    pub duration: Duration,
}

pub(crate) mod duration_ser {
    use chrono::Duration;
    use serde::{self, de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<i64>::deserialize(deserializer)?;
        s.map(|v| {
            Duration::try_seconds(v)
                .ok_or_else(|| D::Error::custom(format!("duration {v} is out of range")))
        })
        .transpose()
    }
}
