//! Next-occurrence resolution for activity cards.
//!
//! Given every candidate date of an activity and a reference "now", pick the
//! single occurrence to show: the earliest upcoming one, or if none is
//! upcoming, the most recent finished one. All functions take `now`
//! explicitly; only [`ScheduleResolver::resolve_current`] reads the clock.
//!
//! # Boundary
//!
//! An occurrence is upcoming only if its date is strictly after `now`. An
//! occurrence at exactly `now` counts as finished.
//!
//! # Ties
//!
//! When several candidates share the selected date, the one that appears
//! first in the input wins, in both the upcoming and the finished branch.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::format::{format_occurrence, DisplayOptions, FINISHED_PREFIX, FLEXIBLE_DATES_LABEL};
use crate::occurrence::{collect_occurrences, ActivityDates, Occurrence, RawOccurrence};

/// The displayable outcome of resolving one activity's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDecision {
    /// Human-readable line for the activity card.
    pub label: String,
    /// `Some(true)` for an upcoming occurrence, `Some(false)` for a finished
    /// one, `None` when there was nothing to choose from.
    pub is_upcoming: Option<bool>,
    /// The chosen occurrence.
    pub selected: Option<Occurrence>,
}

impl ScheduleDecision {
    /// The decision for an activity without schedule data.
    pub fn flexible() -> Self {
        Self {
            label: FLEXIBLE_DATES_LABEL.to_string(),
            is_upcoming: None,
            selected: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.is_upcoming == Some(false)
    }
}

/// Resolves candidate sets into [`ScheduleDecision`]s with fixed display options.
#[derive(Debug, Clone, Default)]
pub struct ScheduleResolver {
    options: DisplayOptions,
}

impl ScheduleResolver {
    pub fn new(options: DisplayOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DisplayOptions {
        &self.options
    }

    /// Select and label the occurrence to display.
    ///
    /// # Examples
    ///
    /// ```
    /// use activity_schedule::{Occurrence, ScheduleResolver};
    /// use chrono::{TimeZone, Utc};
    ///
    /// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    /// let past = Occurrence::new(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap())
    ///     .with_time("10:00");
    ///
    /// let decision = ScheduleResolver::default().resolve(&[past], now);
    /// assert_eq!(decision.label, "Finalizado: miércoles, 10 de enero de 2024 a las 10:00");
    /// assert_eq!(decision.is_upcoming, Some(false));
    /// ```
    pub fn resolve(&self, occurrences: &[Occurrence], now: DateTime<Utc>) -> ScheduleDecision {
        let earliest_upcoming = occurrences
            .iter()
            .filter(|o| o.date > now)
            .min_by(|a, b| a.date.cmp(&b.date));

        let (selected, is_upcoming) = match earliest_upcoming {
            Some(occurrence) => (occurrence, true),
            None => {
                // Nothing upcoming: every candidate is at or before `now`.
                let most_recent = occurrences.iter().min_by(|a, b| latest_first(a, b));
                match most_recent {
                    Some(occurrence) => (occurrence, false),
                    None => return ScheduleDecision::flexible(),
                }
            }
        };

        let formatted = format_occurrence(selected, &self.options);
        let label = if is_upcoming {
            formatted
        } else {
            format!("{FINISHED_PREFIX}{formatted}")
        };

        trace!(
            candidates = occurrences.len(),
            is_upcoming,
            selected = %selected.date,
            "resolved schedule"
        );

        ScheduleDecision {
            label,
            is_upcoming: Some(is_upcoming),
            selected: Some(selected.clone()),
        }
    }

    /// Resolve unvalidated records; entries without a usable date are dropped first.
    pub fn resolve_raw(&self, raw: &[RawOccurrence], now: DateTime<Utc>) -> ScheduleDecision {
        let occurrences = collect_occurrences(raw, &self.options.timezone);
        self.resolve(&occurrences, now)
    }

    /// Resolve an activity's stored date collection.
    pub fn resolve_activity(
        &self,
        activity: &ActivityDates,
        now: DateTime<Utc>,
    ) -> ScheduleDecision {
        self.resolve_raw(&activity.candidates(), now)
    }

    /// Resolve against the current system clock.
    pub fn resolve_current(&self, raw: &[RawOccurrence]) -> ScheduleDecision {
        self.resolve_raw(raw, Utc::now())
    }
}

/// Resolve with the default display options (`es_ES`, `Europe/Madrid`).
pub fn resolve(occurrences: &[Occurrence], now: DateTime<Utc>) -> ScheduleDecision {
    ScheduleResolver::default().resolve(occurrences, now)
}

/// Ordering that puts later dates first, so `min_by` keeps the first of equal maxima.
fn latest_first(a: &Occurrence, b: &Occurrence) -> Ordering {
    b.date.cmp(&a.date)
}
