//! A user's reservations split into active and past lists.
//!
//! Uses the same boundary as the resolver: a booking is active only while its
//! activity date is strictly after `now`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ScheduleError};
use crate::format::{
    date_badge, format_booking_date, format_booking_time, DateBadge, DisplayOptions,
    UNTITLED_ACTIVITY_LABEL,
};
use crate::occurrence::{records_from_values, DateValue, Occurrence, TimeValue};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Anything with a single scheduled instant.
pub trait Scheduled {
    fn scheduled_at(&self) -> DateTime<Utc>;
}

impl Scheduled for Occurrence {
    fn scheduled_at(&self) -> DateTime<Utc> {
        self.date
    }
}

// ── Partitioning ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingPartition<T> {
    /// Upcoming, closest first.
    pub active: Vec<T>,
    /// Finished, most recent first.
    pub past: Vec<T>,
}

/// Split bookings into active (`> now`) and past (`<= now`) lists.
///
/// Both sorts are stable, so bookings on the same instant keep input order.
pub fn partition_bookings<T, I>(items: I, now: DateTime<Utc>) -> BookingPartition<T>
where
    T: Scheduled,
    I: IntoIterator<Item = T>,
{
    let (mut active, mut past): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|b| b.scheduled_at() > now);

    active.sort_by_key(|b| b.scheduled_at());
    past.sort_by(|a, b| b.scheduled_at().cmp(&a.scheduled_at()));

    BookingPartition { active, past }
}

/// Whole days until `date`, rounded up; zero once the date has passed.
pub fn days_remaining(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (date - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }
}

// ── Windows ─────────────────────────────────────────────────────────────────

/// Time filter applied to active bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingWindow {
    #[default]
    All,
    /// Up to the same wall-clock time on the coming Sunday (a full week ahead on Sundays).
    ThisWeek,
    /// Up to the end of the current local month.
    ThisMonth,
}

impl BookingWindow {
    pub fn contains(self, date: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> bool {
        match self {
            BookingWindow::All => true,
            BookingWindow::ThisWeek => date <= end_of_week(now, tz),
            BookingWindow::ThisMonth => match start_of_next_month(now, tz) {
                Some(limit) => date < limit,
                None => true,
            },
        }
    }
}

impl FromStr for BookingWindow {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(BookingWindow::All),
            "this-week" => Ok(BookingWindow::ThisWeek),
            "this-month" => Ok(BookingWindow::ThisMonth),
            other => Err(ScheduleError::InvalidWindow(format!("'{other}'"))),
        }
    }
}

impl fmt::Display for BookingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingWindow::All => "all",
            BookingWindow::ThisWeek => "this-week",
            BookingWindow::ThisMonth => "this-month",
        };
        f.write_str(name)
    }
}

fn end_of_week(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = now.with_timezone(tz);
    let days = Duration::days(7 - i64::from(local.weekday().num_days_from_sunday()));
    tz.from_local_datetime(&(local.naive_local() + days))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now + days)
}

fn start_of_next_month(now: DateTime<Utc>, tz: &Tz) -> Option<DateTime<Utc>> {
    let local = now.with_timezone(tz);
    let (y, m) = if local.month() == 12 {
        (local.year() + 1, 1)
    } else {
        (local.year(), local.month() + 1)
    };
    let naive = NaiveDate::from_ymd_opt(y, m, 1)?.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

// ── Booking records ─────────────────────────────────────────────────────────

/// A reservation joined with its activity, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawBooking {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<DateValue>,
    #[serde(default)]
    pub time: Option<TimeValue>,
}

impl RawBooking {
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidDatetime`] if the activity date is
    /// missing or cannot be parsed. A time that cannot be rendered is dropped.
    pub fn into_booking(self, tz: &Tz) -> Result<Booking> {
        let scheduled_at = self
            .date
            .as_ref()
            .ok_or_else(|| ScheduleError::InvalidDatetime("missing activity date".to_string()))?
            .to_utc(tz)?;

        let time = match self.time.as_ref().map(|t| t.to_label(tz)).transpose() {
            Ok(time) => time.flatten(),
            Err(e) => {
                warn!(booking = %self.id, error = %e, "ignoring unrenderable booking time");
                None
            }
        };

        Ok(Booking {
            id: self.id,
            title: self.title,
            scheduled_at,
            time,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: String,
    pub title: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub time: Option<String>,
}

impl Scheduled for Booking {
    fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }
}

impl Booking {
    pub fn view(&self, now: DateTime<Utc>, opts: &DisplayOptions) -> BookingView {
        let title = match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => UNTITLED_ACTIVITY_LABEL.to_string(),
        };

        BookingView {
            id: self.id.clone(),
            title,
            date: format_booking_date(Some(&self.scheduled_at), opts),
            time: format_booking_time(self.time.as_deref()),
            badge: date_badge(&self.scheduled_at, opts),
            days_remaining: days_remaining(self.scheduled_at, now),
            is_active: self.scheduled_at > now,
        }
    }
}

/// Convert raw records, dropping (and logging) those without a usable date.
pub fn collect_bookings(raw: Vec<RawBooking>, tz: &Tz) -> Vec<Booking> {
    raw.into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            match record.into_booking(tz) {
                Ok(booking) => Some(booking),
                Err(e) => {
                    warn!(booking = %id, error = %e, "skipping booking");
                    None
                }
            }
        })
        .collect()
}

/// Convert untyped JSON records; entries that are not booking objects are
/// skipped the same way as entries without a usable date.
pub fn collect_booking_values(values: Vec<serde_json::Value>, tz: &Tz) -> Vec<Booking> {
    collect_bookings(records_from_values(values), tz)
}

/// The display record for one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: String,
    pub title: String,
    pub date: String,
    pub time: String,
    pub badge: DateBadge,
    pub days_remaining: i64,
    pub is_active: bool,
}
