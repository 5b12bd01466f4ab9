//! Display options and human-readable date labels.
//!
//! Dates render in a configured IANA timezone with localized weekday and
//! month names (default `es_ES`, `Europe/Madrid`). Rendering never fails:
//! if a localized format cannot be produced, the date degrades to a plain
//! `YYYY-MM-DD` string.

use std::fmt::Write;

use chrono::{DateTime, Datelike, Locale, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::error::{Result, ScheduleError};
use crate::occurrence::Occurrence;

/// Label shown when an activity has no schedule data at all.
pub const FLEXIBLE_DATES_LABEL: &str = "Fechas flexibles";
/// Prefix for labels of occurrences that already happened.
pub const FINISHED_PREFIX: &str = "Finalizado: ";
/// Joins the date and time parts of a label.
pub const TIME_SEPARATOR: &str = " a las ";
/// Shown in booking lists when a date is missing.
pub const UNAVAILABLE_DATE_LABEL: &str = "Fecha no disponible";
/// Shown in booking lists when a time is missing.
pub const UNSPECIFIED_TIME_LABEL: &str = "Hora no especificada";
/// Shown in booking lists when the activity has no name.
pub const UNTITLED_ACTIVITY_LABEL: &str = "Actividad sin nombre";

/// Long date layout: weekday, day, month, year.
pub const DEFAULT_DATE_FORMAT: &str = "%A, %-d de %B de %Y";
/// Booking list layout: day, month, year.
const BOOKING_DATE_FORMAT: &str = "%-d de %B de %Y";
const PLAIN_DATE_FORMAT: &str = "%Y-%m-%d";
const MONTH_ABBREVIATION_FORMAT: &str = "%b";

// ── Options ─────────────────────────────────────────────────────────────────

/// How dates are rendered into labels.
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    /// Timezone the calendar date is taken in.
    pub timezone: Tz,
    /// Locale for weekday and month names.
    pub locale: Locale,
    /// strftime-style layout for [`format_long_date`].
    pub date_format: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Madrid,
            locale: Locale::es_ES,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl DisplayOptions {
    /// Build options from an IANA timezone name and a POSIX locale name.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidTimezone`] or [`ScheduleError::InvalidLocale`]
    /// for unknown names.
    ///
    /// # Examples
    ///
    /// ```
    /// use activity_schedule::DisplayOptions;
    ///
    /// let opts = DisplayOptions::new("America/Mexico_City", "es_MX").unwrap();
    /// assert_eq!(opts.timezone.name(), "America/Mexico_City");
    /// assert!(DisplayOptions::new("Mars/Olympus", "es_ES").is_err());
    /// ```
    pub fn new(timezone: &str, locale: &str) -> Result<Self> {
        Ok(Self {
            timezone: parse_timezone(timezone)?,
            locale: parse_locale(locale)?,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        })
    }

    /// Replace the long date layout. A blank layout keeps [`DEFAULT_DATE_FORMAT`].
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        let date_format = date_format.into();
        self.date_format = if date_format.trim().is_empty() {
            DEFAULT_DATE_FORMAT.to_string()
        } else {
            date_format
        };
        self
    }
}

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.trim()
        .parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(format!("'{s}'")))
}

/// Parse a POSIX locale name such as `es_ES`.
pub fn parse_locale(s: &str) -> Result<Locale> {
    Locale::try_from(s.trim()).map_err(|_| ScheduleError::InvalidLocale(format!("'{s}'")))
}

// ── Labels ──────────────────────────────────────────────────────────────────

/// Render a date in the long localized form, e.g. `miércoles, 10 de enero de 2024`.
pub fn format_long_date(date: &DateTime<Utc>, opts: &DisplayOptions) -> String {
    render_or_plain(date, &opts.date_format, opts)
}

/// Render an occurrence as `<date>` or `<date> a las <time>`.
pub fn format_occurrence(occurrence: &Occurrence, opts: &DisplayOptions) -> String {
    let date = format_long_date(&occurrence.date, opts);
    match &occurrence.time {
        Some(time) => format!("{date}{TIME_SEPARATOR}{time}"),
        None => date,
    }
}

/// Render a booking date without the weekday, or the unavailable label.
pub fn format_booking_date(date: Option<&DateTime<Utc>>, opts: &DisplayOptions) -> String {
    match date {
        Some(date) => render_or_plain(date, BOOKING_DATE_FORMAT, opts),
        None => UNAVAILABLE_DATE_LABEL.to_string(),
    }
}

pub fn format_booking_time(time: Option<&str>) -> String {
    match time.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNSPECIFIED_TIME_LABEL.to_string(),
    }
}

/// Calendar-tile rendering of a date: abbreviated month over day of month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateBadge {
    /// Upper-cased abbreviated month name (e.g. `"ENE"`). Falls back to the
    /// unlocalized abbreviation (`"JAN"`) if the locale cannot render it.
    pub month: String,
    pub day: u32,
}

pub fn date_badge(date: &DateTime<Utc>, opts: &DisplayOptions) -> DateBadge {
    let local = date.with_timezone(&opts.timezone);
    let month = render_localized(date, MONTH_ABBREVIATION_FORMAT, opts)
        .unwrap_or_else(|| local.format(MONTH_ABBREVIATION_FORMAT).to_string())
        .trim_end_matches('.')
        .to_uppercase();
    DateBadge {
        month,
        day: local.day(),
    }
}

/// A rendered label split into the parts a card lays out on separate lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelParts<'a> {
    pub date: &'a str,
    pub time: Option<&'a str>,
}

impl<'a> LabelParts<'a> {
    /// Split on the first `" a las "`.
    ///
    /// ```
    /// use activity_schedule::format::LabelParts;
    ///
    /// let parts = LabelParts::split("jueves, 10 de enero de 2030 a las 08:00");
    /// assert_eq!(parts.date, "jueves, 10 de enero de 2030");
    /// assert_eq!(parts.time, Some("08:00"));
    /// ```
    pub fn split(label: &'a str) -> Self {
        match label.split_once(TIME_SEPARATOR) {
            Some((date, time)) => Self {
                date,
                time: Some(time),
            },
            None => Self {
                date: label,
                time: None,
            },
        }
    }
}

// ── Internal helpers ────────────────────────────────────────────────────────

fn render_or_plain(date: &DateTime<Utc>, fmt: &str, opts: &DisplayOptions) -> String {
    render_localized(date, fmt, opts).unwrap_or_else(|| {
        warn!(format = fmt, date = %date, "localized date rendering failed, using plain date");
        date.with_timezone(&opts.timezone)
            .format(PLAIN_DATE_FORMAT)
            .to_string()
    })
}

/// Render with the configured locale; `None` if the layout cannot be rendered.
fn render_localized(date: &DateTime<Utc>, fmt: &str, opts: &DisplayOptions) -> Option<String> {
    let local = date.with_timezone(&opts.timezone);
    let mut out = String::new();
    write!(out, "{}", local.format_localized(fmt, opts.locale)).ok()?;
    Some(out)
}
