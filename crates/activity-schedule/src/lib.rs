//! # activity-schedule
//!
//! Deterministic schedule resolution for guided activities.
//!
//! Every activity card shows one line describing when the activity runs:
//! the nearest upcoming date, or the most recent one prefixed with
//! "Finalizado" once all dates have passed, or "Fechas flexibles" when no
//! dates exist. This crate computes that line from the raw date records of
//! the document store, with the reference instant passed in explicitly.
//!
//! ## Modules
//!
//! - [`occurrence`] — Raw store records → validated [`Occurrence`]s
//! - [`format`] — Display options and localized date labels
//! - [`resolver`] — Next-occurrence selection ([`ScheduleResolver`])
//! - [`bookings`] — Active/past reservation lists and time windows
//! - [`error`] — Error types

pub mod bookings;
pub mod error;
pub mod format;
pub mod occurrence;
pub mod resolver;

pub use bookings::{
    collect_booking_values, collect_bookings, days_remaining, partition_bookings, Booking,
    BookingPartition, BookingView, BookingWindow, RawBooking, Scheduled,
};
pub use error::ScheduleError;
pub use format::{
    format_long_date, format_occurrence, DateBadge, DisplayOptions, LabelParts,
    FINISHED_PREFIX, FLEXIBLE_DATES_LABEL,
};
pub use occurrence::{
    collect_occurrences, parse_date_text, records_from_values, ActivityDates, DateValue,
    Occurrence, RawOccurrence, TimeValue,
};
pub use resolver::{resolve, ScheduleDecision, ScheduleResolver};
