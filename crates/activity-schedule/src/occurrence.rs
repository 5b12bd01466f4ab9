//! Candidate schedule entries and their conversion from raw store records.
//!
//! Records fetched from the document store carry dates in several shapes:
//! store timestamps (`{seconds, nanoseconds}`), RFC 3339 instants, or loose
//! ISO-like strings typed into an admin form. [`RawOccurrence`] accepts all of
//! them; [`Occurrence`] is the validated form the resolver works on. An
//! `Occurrence` always has a date, so "missing or unparseable date" can only
//! exist on the raw side and is filtered out by [`collect_occurrences`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ScheduleError};

/// Wall-clock layouts accepted without an offset, interpreted in the display timezone.
const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

// ── Raw values ──────────────────────────────────────────────────────────────

/// A date as it arrives from the data layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    /// Document-store timestamp (seconds since the Unix epoch plus nanoseconds).
    Timestamp {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    /// An already-converted instant.
    Instant(DateTime<Utc>),
    /// Free-form text, parsed with [`parse_date_text`].
    Text(String),
    /// Any other JSON shape; never converts to a date.
    Unrecognized(Value),
}

impl DateValue {
    /// Convert to a UTC instant, interpreting offset-less text in `tz`.
    pub fn to_utc(&self, tz: &Tz) -> Result<DateTime<Utc>> {
        match self {
            DateValue::Timestamp {
                seconds,
                nanoseconds,
            } => timestamp_to_utc(*seconds, *nanoseconds),
            DateValue::Instant(dt) => Ok(*dt),
            DateValue::Text(text) => parse_date_text(text, tz),
            DateValue::Unrecognized(value) => Err(ScheduleError::InvalidDatetime(format!(
                "unsupported date value: {value}"
            ))),
        }
    }
}

impl From<DateTime<Utc>> for DateValue {
    fn from(dt: DateTime<Utc>) -> Self {
        DateValue::Instant(dt)
    }
}

impl From<&str> for DateValue {
    fn from(s: &str) -> Self {
        DateValue::Text(s.to_string())
    }
}

/// A clock time as it arrives from the data layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    /// Document-store timestamp; only its local time of day is used.
    Timestamp {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    /// A short label such as `"14:30"`, used verbatim.
    Text(String),
    /// Any other JSON shape; never renders.
    Unrecognized(Value),
}

impl TimeValue {
    /// Render as a display label. Blank text means the activity has no fixed time.
    ///
    /// Timestamps render as 24-hour `HH:MM` in `tz`.
    pub fn to_label(&self, tz: &Tz) -> Result<Option<String>> {
        match self {
            TimeValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            TimeValue::Timestamp {
                seconds,
                nanoseconds,
            } => {
                let dt = timestamp_to_utc(*seconds, *nanoseconds)
                    .map_err(|e| ScheduleError::InvalidTime(e.to_string()))?;
                Ok(Some(dt.with_timezone(tz).format("%H:%M").to_string()))
            }
            TimeValue::Unrecognized(value) => Err(ScheduleError::InvalidTime(format!(
                "unsupported time value: {value}"
            ))),
        }
    }
}

impl From<&str> for TimeValue {
    fn from(s: &str) -> Self {
        TimeValue::Text(s.to_string())
    }
}

/// One entry of an activity's date collection, unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOccurrence {
    #[serde(default)]
    pub date: Option<DateValue>,
    #[serde(default)]
    pub time: Option<TimeValue>,
}

impl RawOccurrence {
    pub fn new(date: impl Into<DateValue>) -> Self {
        Self {
            date: Some(date.into()),
            time: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<TimeValue>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Validate into an [`Occurrence`].
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidDatetime`] if the date is missing or
    /// cannot be parsed. A time that cannot be rendered is not an error: the
    /// occurrence is kept without a time.
    pub fn to_occurrence(&self, tz: &Tz) -> Result<Occurrence> {
        let date = self
            .date
            .as_ref()
            .ok_or_else(|| ScheduleError::InvalidDatetime("missing date".to_string()))?
            .to_utc(tz)?;

        let time = match self.time.as_ref().map(|t| t.to_label(tz)).transpose() {
            Ok(time) => time.flatten(),
            Err(e) => {
                debug!(error = %e, "ignoring unrenderable occurrence time");
                None
            }
        };

        Ok(Occurrence { date, time })
    }
}

// ── Validated occurrence ────────────────────────────────────────────────────

/// A candidate date/time at which an activity is scheduled to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl Occurrence {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self { date, time: None }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}

/// Validate a batch of raw occurrences, silently dropping invalid entries.
///
/// Each dropped entry is logged at `debug` level. Input order is preserved.
pub fn collect_occurrences(raw: &[RawOccurrence], tz: &Tz) -> Vec<Occurrence> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry.to_occurrence(tz) {
            Ok(occurrence) => Some(occurrence),
            Err(e) => {
                debug!(index, error = %e, "dropping occurrence without a usable date");
                None
            }
        })
        .collect()
}

/// Deserialize records one by one, dropping those that do not fit `T`.
///
/// A record that is not even an object (a bare number, a string) cannot be
/// represented as `T`; it is logged at `debug` and skipped.
pub fn records_from_values<T: DeserializeOwned>(values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(index, error = %e, "dropping malformed record");
                None
            }
        })
        .collect()
}

/// `deserialize_with` adapter for a list that must survive malformed elements.
pub fn deserialize_lenient<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(records_from_values(values))
}

// ── Activity date collection ────────────────────────────────────────────────

/// The schedule data stored for one activity.
///
/// Newer activities keep a nested collection of dates; older ones only carry
/// a single `date` (and optionally `time`) on the activity itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDates {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub dates: Vec<RawOccurrence>,
    #[serde(default)]
    pub date: Option<DateValue>,
    #[serde(default)]
    pub time: Option<TimeValue>,
}

impl ActivityDates {
    /// The candidate set for this activity: the nested dates when present,
    /// otherwise the activity-level date as a single candidate.
    pub fn candidates(&self) -> Vec<RawOccurrence> {
        if !self.dates.is_empty() {
            return self.dates.clone();
        }
        match &self.date {
            Some(date) => vec![RawOccurrence {
                date: Some(date.clone()),
                time: self.time.clone(),
            }],
            None => Vec::new(),
        }
    }
}

// ── Parsing ─────────────────────────────────────────────────────────────────

/// Parse a date string into a UTC instant.
///
/// Accepted forms:
///
/// - RFC 3339 with offset (`"2024-01-10T10:00:00+01:00"`)
/// - Date only (`"2024-01-10"`), taken as midnight UTC
/// - Local date-time without offset (`"2024-01-10T10:00"`, `"2024-01-10 10:00:00"`),
///   taken as wall-clock time in `tz`
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidDatetime`] for blank or unrecognized input,
/// and for local times that do not exist in `tz` (DST gaps). Ambiguous local
/// times resolve to the earlier instant.
///
/// # Examples
///
/// ```
/// use activity_schedule::occurrence::parse_date_text;
///
/// let dt = parse_date_text("2024-01-10", &chrono_tz::Europe::Madrid).unwrap();
/// assert_eq!(dt.to_rfc3339(), "2024-01-10T00:00:00+00:00");
/// ```
pub fn parse_date_text(text: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let s = text.trim();
    if s.is_empty() {
        return Err(ScheduleError::InvalidDatetime("empty date".to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    for fmt in LOCAL_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| {
                    ScheduleError::InvalidDatetime(format!("'{s}' does not exist in {tz}"))
                });
        }
    }

    Err(ScheduleError::InvalidDatetime(format!(
        "cannot parse date: '{s}'"
    )))
}

fn timestamp_to_utc(seconds: i64, nanoseconds: u32) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, nanoseconds).ok_or_else(|| {
        ScheduleError::InvalidDatetime(format!("timestamp out of range: {seconds}s"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Madrid;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    // ── parse_date_text ─────────────────────────────────────────────────

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_date_text("2024-01-10T10:00:00+01:00", &Madrid).unwrap();
        assert_eq!(dt, utc("2024-01-10T09:00:00Z"));
    }

    #[test]
    fn test_parse_date_only_is_utc_midnight() {
        let dt = parse_date_text("2024-06-01", &Madrid).unwrap();
        assert_eq!(dt, utc("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn test_parse_local_datetime_uses_timezone() {
        // June is CEST (UTC+2)
        let dt = parse_date_text("2024-06-01 14:30", &Madrid).unwrap();
        assert_eq!(dt, utc("2024-06-01T12:30:00Z"));

        let dt = parse_date_text("2024-01-10T08:00:15", &Madrid).unwrap();
        assert_eq!(dt, utc("2024-01-10T07:00:15Z"));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(parse_date_text("  2024-06-01  ", &Madrid).is_ok());
    }

    #[test]
    fn test_parse_nonexistent_local_time_is_error() {
        // Spring forward in Madrid: 02:00 → 03:00 on 2024-03-31
        let err = parse_date_text("2024-03-31 02:30", &Madrid).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDatetime(_)));
    }

    #[test]
    fn test_parse_ambiguous_local_time_takes_earliest() {
        // Fall back in Madrid: 02:30 happens twice on 2024-10-27
        let dt = parse_date_text("2024-10-27 02:30", &Madrid).unwrap();
        assert_eq!(dt, utc("2024-10-27T00:30:00Z"));
    }

    #[test]
    fn test_parse_garbage_is_error() {
        for input in ["not-a-date", "", "   ", "2024-13-01", "10/01/2024"] {
            assert!(
                parse_date_text(input, &Madrid).is_err(),
                "expected error for {input:?}"
            );
        }
    }

    // ── DateValue / TimeValue ───────────────────────────────────────────

    #[test]
    fn test_timestamp_date_value() {
        let value = DateValue::Timestamp {
            seconds: 1_704_880_800,
            nanoseconds: 0,
        };
        assert_eq!(value.to_utc(&Madrid).unwrap(), utc("2024-01-10T10:00:00Z"));
    }

    #[test]
    fn test_timestamp_out_of_range_is_error() {
        let value = DateValue::Timestamp {
            seconds: i64::MAX,
            nanoseconds: 0,
        };
        assert!(value.to_utc(&Madrid).is_err());
    }

    #[test]
    fn test_time_text_is_trimmed_and_blank_is_none() {
        assert_eq!(
            TimeValue::from(" 14:30 ").to_label(&Madrid).unwrap(),
            Some("14:30".to_string())
        );
        assert_eq!(TimeValue::from("  ").to_label(&Madrid).unwrap(), None);
    }

    #[test]
    fn test_time_timestamp_renders_local_clock() {
        // 2024-01-10T09:15:00Z is 10:15 in Madrid (CET)
        let value = TimeValue::Timestamp {
            seconds: 1_704_878_100,
            nanoseconds: 0,
        };
        assert_eq!(value.to_label(&Madrid).unwrap(), Some("10:15".to_string()));
    }

    #[test]
    fn test_deserialize_raw_occurrence_shapes() {
        let raw: Vec<RawOccurrence> = serde_json::from_str(
            r#"[
                {"date": {"seconds": 1704880800, "nanoseconds": 0}, "time": "10:00"},
                {"date": {"_seconds": 1704880800}},
                {"date": "2024-01-10T10:00:00Z"},
                {"date": "2024-01-10"},
                {"date": "not-a-date"},
                {"time": "09:00"},
                {}
            ]"#,
        )
        .unwrap();

        assert!(matches!(raw[0].date, Some(DateValue::Timestamp { .. })));
        assert_eq!(raw[0].time, Some(TimeValue::Text("10:00".to_string())));
        assert!(matches!(raw[1].date, Some(DateValue::Timestamp { .. })));
        assert!(matches!(raw[2].date, Some(DateValue::Instant(_))));
        assert_eq!(raw[3].date, Some(DateValue::Text("2024-01-10".to_string())));
        assert_eq!(raw[4].date, Some(DateValue::Text("not-a-date".to_string())));
        assert_eq!(raw[5].date, None);
        assert_eq!(raw[6], RawOccurrence::default());
    }

    #[test]
    fn test_unexpected_json_types_become_unrecognized() {
        let raw: Vec<RawOccurrence> = serde_json::from_str(
            r#"[
                {"date": "2030-01-10", "time": "08:00"},
                {"date": 12345},
                {"date": true, "time": [1]},
                {"date": "2030-02-15", "time": 830}
            ]"#,
        )
        .unwrap();
        assert_eq!(raw.len(), 4);
        assert!(matches!(raw[1].date, Some(DateValue::Unrecognized(_))));
        assert!(matches!(raw[2].time, Some(TimeValue::Unrecognized(_))));
        assert!(matches!(
            raw[1].date.as_ref().unwrap().to_utc(&Madrid),
            Err(ScheduleError::InvalidDatetime(_))
        ));
        assert!(matches!(
            raw[3].time.as_ref().unwrap().to_label(&Madrid),
            Err(ScheduleError::InvalidTime(_))
        ));

        let occurrences = collect_occurrences(&raw, &Madrid);
        assert_eq!(
            occurrences,
            vec![
                Occurrence::new(utc("2030-01-10T00:00:00Z")).with_time("08:00"),
                Occurrence::new(utc("2030-02-15T00:00:00Z")),
            ]
        );
    }

    #[test]
    fn test_records_from_values_skips_non_objects() {
        let values: Vec<Value> =
            serde_json::from_str(r#"[1, {"date": "2030-01-10"}, "x", null, {"date": 5}]"#).unwrap();
        let raw: Vec<RawOccurrence> = records_from_values(values);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0], RawOccurrence::new("2030-01-10"));
    }

    #[test]
    fn test_activity_dates_survive_malformed_entries() {
        let activity: ActivityDates = serde_json::from_str(
            r#"{"dates": [42, {"date": "2030-01-10", "time": "08:00"}, {"date": false}]}"#,
        )
        .unwrap();
        assert_eq!(activity.dates.len(), 2);
        assert_eq!(
            collect_occurrences(&activity.candidates(), &Madrid),
            vec![Occurrence::new(utc("2030-01-10T00:00:00Z")).with_time("08:00")]
        );
    }

    // ── collect_occurrences ─────────────────────────────────────────────

    #[test]
    fn test_collect_drops_invalid_and_keeps_order() {
        let raw = vec![
            RawOccurrence::new("2030-02-15"),
            RawOccurrence::new("not-a-date").with_time("10:00"),
            RawOccurrence::default(),
            RawOccurrence::new("2030-01-10").with_time("08:00"),
        ];
        let occurrences = collect_occurrences(&raw, &Madrid);
        assert_eq!(
            occurrences,
            vec![
                Occurrence::new(utc("2030-02-15T00:00:00Z")),
                Occurrence::new(utc("2030-01-10T00:00:00Z")).with_time("08:00"),
            ]
        );
    }

    #[test]
    fn test_unrenderable_time_keeps_occurrence() {
        let raw = RawOccurrence {
            date: Some(DateValue::from("2030-01-10")),
            time: Some(TimeValue::Timestamp {
                seconds: i64::MIN,
                nanoseconds: 0,
            }),
        };
        let occurrence = raw.to_occurrence(&Madrid).unwrap();
        assert_eq!(occurrence.time, None);
    }

    // ── ActivityDates ───────────────────────────────────────────────────

    #[test]
    fn test_candidates_prefer_nested_dates() {
        let activity = ActivityDates {
            dates: vec![RawOccurrence::new("2030-01-10")],
            date: Some(DateValue::from("2020-01-01")),
            time: None,
        };
        assert_eq!(activity.candidates(), vec![RawOccurrence::new("2030-01-10")]);
    }

    #[test]
    fn test_candidates_fall_back_to_activity_date() {
        let activity = ActivityDates {
            dates: Vec::new(),
            date: Some(DateValue::from("2020-01-01")),
            time: Some(TimeValue::from("09:00")),
        };
        assert_eq!(
            activity.candidates(),
            vec![RawOccurrence::new("2020-01-01").with_time("09:00")]
        );
    }

    #[test]
    fn test_candidates_empty_without_any_date() {
        assert!(ActivityDates::default().candidates().is_empty());
    }
}
