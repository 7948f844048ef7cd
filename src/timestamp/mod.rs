//! Zone-aware timestamps for labeling deployment runs.
//!
//! A timestamp is written either as the keyword `now` or as
//! `YYYY-MM-DD HH:MM:SS`, and is paired with an IANA zone name such as
//! `UTC` or `America/Chicago`. The written fields are wall-clock time in
//! that zone.
//!
//! ```
//! use deploy_docs::timestamp::localize;
//!
//! let at = localize("2023-09-15 09:04:03", "UTC").unwrap();
//! assert_eq!(at.utc().to_rfc3339(), "2023-09-15T09:04:03+00:00");
//! ```

use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})\s+(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})$",
    )
    .expect("valid regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("cannot parse timestamp '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("unknown time zone '{0}'")]
    UnknownZone(String),
}

impl TimestampError {
    fn parse(input: &str, reason: impl Into<String>) -> Self {
        TimestampError::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed timestamp, not yet tied to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSpec {
    Now,
    At(NaiveDateTime),
}

impl FromStr for TimestampSpec {
    type Err = TimestampError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.eq_ignore_ascii_case("now") {
            return Ok(TimestampSpec::Now);
        }

        let caps = TIMESTAMP_RE.captures(input).ok_or_else(|| {
            TimestampError::parse(input, "expected 'now' or 'YYYY-MM-DD HH:MM:SS'")
        })?;

        // \d also admits non-ASCII digits, which fail here.
        let field = |name: &str| -> Result<u32, TimestampError> {
            caps[name]
                .parse::<u32>()
                .map_err(|_| TimestampError::parse(input, format!("{} is not a number", name)))
        };

        let year = field("year")?;
        let month = field("month")?;
        let day = field("day")?;
        let hour = field("hour")?;
        let minute = field("minute")?;
        let second = field("second")?;

        let date = NaiveDate::from_ymd_opt(year as i32, month, day)
            .ok_or_else(|| TimestampError::parse(input, "no such calendar date"))?;
        let datetime = date
            .and_hms_opt(hour, minute, second)
            .ok_or_else(|| TimestampError::parse(input, "time of day out of range"))?;

        Ok(TimestampSpec::At(datetime))
    }
}

/// An absolute instant together with the zone it is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedInstant {
    instant: DateTime<Tz>,
}

impl LocalizedInstant {
    pub fn instant(&self) -> DateTime<Tz> {
        self.instant
    }

    pub fn zone(&self) -> Tz {
        self.instant.timezone()
    }

    pub fn zone_name(&self) -> &'static str {
        self.zone().name()
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.instant.with_timezone(&Utc)
    }
}

impl fmt::Display for LocalizedInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.instant.to_rfc3339(), self.zone_name())
    }
}

/// Looks a zone name up in the IANA registry.
pub fn parse_zone(name: &str) -> Result<Tz, TimestampError> {
    let name = name.trim();
    Tz::from_str(name).map_err(|_| TimestampError::UnknownZone(name.to_string()))
}

/// Resolves `spec` in `zone`, reading the clock from `now` for
/// [`TimestampSpec::Now`].
///
/// Ambiguous wall-clock times (DST fall-back) resolve to the earlier
/// instant; times that fall in a DST gap are rejected.
pub fn localize_spec(
    spec: TimestampSpec,
    zone: Tz,
    now: DateTime<Utc>,
) -> Result<LocalizedInstant, TimestampError> {
    let instant = match spec {
        TimestampSpec::Now => now.with_timezone(&zone),
        TimestampSpec::At(naive) => match zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                return Err(TimestampError::parse(
                    &naive.to_string(),
                    format!("does not exist in {}", zone.name()),
                ))
            }
        },
    };

    Ok(LocalizedInstant { instant })
}

/// Converts a timestamp string and zone name into a [`LocalizedInstant`].
///
/// The zone is resolved first, so an unknown zone is reported even when the
/// timestamp is also malformed.
pub fn localize(spec: &str, zone: &str) -> Result<LocalizedInstant, TimestampError> {
    let zone = parse_zone(zone)?;
    let spec = TimestampSpec::from_str(spec)?;
    localize_spec(spec, zone, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_now_keyword_any_case() {
        for input in ["now", "NOW", "Now"] {
            assert_eq!(TimestampSpec::from_str(input).unwrap(), TimestampSpec::Now);
        }
    }

    #[test]
    fn test_fields_parsed_in_order() {
        let spec = TimestampSpec::from_str("2023-09-15 09:04:03").unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 9, 15)
            .unwrap()
            .and_hms_opt(9, 4, 3)
            .unwrap();
        assert_eq!(spec, TimestampSpec::At(expected));
    }

    #[test]
    fn test_whitespace_between_date_and_time() {
        assert!(TimestampSpec::from_str("2023-09-15\t09:04:03").is_ok());
        assert!(TimestampSpec::from_str("2023-09-15   09:04:03").is_ok());
        assert!(TimestampSpec::from_str("2023-09-1509:04:03").is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        for input in [
            "2023-09-15",
            "2023-9-15 09:04:03",
            "2023-09-15T09:04:03",
            "2023-09-15 09:04:03.250",
            "2023-09-15 09:04:03+02:00",
            "  2023-09-15 09:04:03  ",
            "2023-09-15 09:04:03\n",
            " now",
            "yesterday",
            "",
        ] {
            assert!(
                matches!(TimestampSpec::from_str(input), Err(TimestampError::Parse { .. })),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        for input in [
            "2023-13-01 00:00:00",
            "2023-02-30 00:00:00",
            "2023-09-15 24:00:00",
            "2023-09-15 23:60:00",
        ] {
            assert!(matches!(
                TimestampSpec::from_str(input),
                Err(TimestampError::Parse { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_non_ascii_digits() {
        // Arabic-Indic digits match \d but are not base-10 ASCII numbers
        let input = "٢٠٢٣-09-15 09:04:03";
        assert!(matches!(
            TimestampSpec::from_str(input),
            Err(TimestampError::Parse { .. })
        ));
    }

    #[test]
    fn test_wall_clock_is_in_zone() {
        let at = localize("2023-09-15 09:04:03", "America/Chicago").unwrap();
        assert_eq!(at.zone_name(), "America/Chicago");
        assert_eq!(at.instant().hour(), 9);
        // CDT is UTC-5 in September
        assert_eq!(at.utc().to_rfc3339(), "2023-09-15T14:04:03+00:00");
    }

    #[test]
    fn test_ambiguous_time_takes_earlier_instant() {
        // 01:30 happens twice in Chicago on 2023-11-05
        let at = localize("2023-11-05 01:30:00", "America/Chicago").unwrap();
        assert_eq!(at.utc().to_rfc3339(), "2023-11-05T06:30:00+00:00");
    }

    #[test]
    fn test_dst_gap_rejected() {
        // 02:30 never happens in Chicago on 2023-03-12
        assert!(matches!(
            localize("2023-03-12 02:30:00", "America/Chicago"),
            Err(TimestampError::Parse { .. })
        ));
    }

    #[test]
    fn test_now_uses_supplied_clock() {
        let now = Utc::now();
        let at = localize_spec(TimestampSpec::Now, Tz::Asia__Tokyo, now).unwrap();
        assert_eq!(at.utc(), now);
        assert_eq!(at.zone(), Tz::Asia__Tokyo);
    }

    #[test]
    fn test_unknown_zone_reported_first() {
        assert_eq!(
            localize("garbage", "Mars/Phobos"),
            Err(TimestampError::UnknownZone("Mars/Phobos".to_string()))
        );
    }

    #[test]
    fn test_display() {
        let at = localize("2023-09-15 09:04:03", "UTC").unwrap();
        assert_eq!(at.to_string(), "2023-09-15T09:04:03+00:00 UTC");
    }
}
