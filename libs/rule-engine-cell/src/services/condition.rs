use chrono::{Datelike, NaiveTime, Utc};
use tracing::trace;

use crate::models::{AppointmentContext, Condition, ConcurrentScope};
use crate::services::preload::PreloadedDayData;

/// Evaluate one leaf against a booking context.
///
/// Pure: every lookup is served from `preloaded`. A condition whose optional
/// input is absent from the context does not apply and yields `false`.
pub fn evaluate_condition(
    condition: &Condition,
    context: &AppointmentContext,
    preloaded: &PreloadedDayData,
) -> bool {
    match condition {
        Condition::AppointmentType(set) => set.matches(&context.appointment_type_id),
        Condition::Practitioner(set) => set.matches(&context.practitioner_id),
        Condition::Location(set) => match context.location_id.as_deref() {
            Some(location_id) => set.matches(location_id),
            None => missing_context("LOCATION", "location"),
        },
        Condition::ClientType(set) => match context.client_type.as_deref() {
            Some(client_type) => set.matches(client_type),
            None => missing_context("CLIENT_TYPE", "client type"),
        },
        Condition::PractitionerTag(set) => {
            let has_tag = preloaded
                .practitioner(&context.practitioner_id)
                .is_some_and(|practitioner| practitioner.has_any_tag(&set.ids));
            set.polarity.apply(has_tag)
        }
        Condition::DayOfWeek { comparator, day } => {
            let weekday = context.start.weekday().number_from_monday();
            comparator.compare(i64::from(weekday), i64::from(*day))
        }
        Condition::DateRange { polarity, start, end } => {
            let date = context.start.date_naive();
            polarity.apply(*start <= date && date <= *end)
        }
        Condition::TimeRange { polarity, start, end } => {
            polarity.apply(time_in_range(context.start.time(), *start, *end))
        }
        Condition::DaysAhead { comparator, days } => match &context.requested_at {
            Some(requested_at) => {
                let requested_date = requested_at.with_timezone(&context.start.timezone()).date_naive();
                let days_between = (context.start.date_naive() - requested_date).num_days();
                comparator.compare(days_between, *days)
            }
            None => missing_context("DAYS_AHEAD", "requested-at"),
        },
        Condition::DailyCapacity { comparator, limit } => {
            let booked = preloaded.daily_count(
                &context.appointment_type_id,
                &context.practitioner_id,
                context.location_id.as_deref(),
            );
            comparator.compare(booked as i64, *limit)
        }
        Condition::ConcurrentCount { comparator, limit, scope, appointment_type_ids } => {
            if *scope == ConcurrentScope::Location && context.location_id.is_none() {
                return missing_context("CONCURRENT_COUNT", "location");
            }

            let instant = context.start.with_timezone(&Utc);
            let existing = preloaded
                .appointments_at(instant)
                .iter()
                .filter(|appointment| match scope {
                    ConcurrentScope::Practice => true,
                    ConcurrentScope::Location => appointment.location_id == context.location_id,
                    ConcurrentScope::Practitioner => appointment.practitioner_id == context.practitioner_id,
                })
                .filter(|appointment| {
                    appointment_type_ids
                        .as_ref()
                        .map_or(true, |ids| ids.contains(&appointment.appointment_type_id))
                })
                .count();

            // The candidate itself is one of the concurrent bookings.
            comparator.compare(existing as i64 + 1, *limit)
        }
    }
}

fn time_in_range(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start < end {
        start <= time && time < end
    } else {
        time >= start || time < end
    }
}

fn missing_context(condition_type: &str, input: &str) -> bool {
    trace!("{} does not apply: no {} in context", condition_type, input);
    false
}
