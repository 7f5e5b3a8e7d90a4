use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use super::Args;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Parses the moment to search around. RFC 3339 timestamps are taken as is, anything else goes
/// through chrono-english relative to `now`, e.g. "yesterday 14:00", "2 hours ago", "15/03/2025".
pub fn parse_search_time(
    input: &str,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<DateTime<Utc>> {
    if let Ok(v) = DateTime::parse_from_rfc3339(input) {
        return Ok(v.with_timezone(&Utc));
    }
    match parse_date_string(input, now, date_style.into()) {
        Ok(v) => Ok(v.with_timezone(&Utc)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate search time \"{input}\": {e}"),
            )
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local, TimeZone, Utc};

    use super::{parse_search_time, DateStyle};

    #[test]
    fn test_parse_rfc3339() -> anyhow::Result<()> {
        let now = Local::now();
        let parsed = parse_search_time("2018-07-04T10:40:00Z", DateStyle::Uk, now)?;
        assert_eq!(parsed, Utc.with_ymd_and_hms(2018, 7, 4, 10, 40, 0).unwrap());
        Ok(())
    }

    #[test]
    fn test_parse_relative() -> anyhow::Result<()> {
        let now = Local.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap();
        let parsed = parse_search_time("2 hours ago", DateStyle::Uk, now)?;
        assert_eq!(parsed, (now - Duration::hours(2)).with_timezone(&Utc));
        Ok(())
    }

    #[test]
    fn test_parse_garbage_is_usage_error() {
        let result = parse_search_time("not a time at all", DateStyle::Us, Local::now());
        let error = result.unwrap_err();
        let error = error.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(error.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
