use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{trace, warn};

use rule_engine_cell::resolve_local;

use crate::models::BaseSchedule;

/// One bookable start before rules and manual blocks are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSlot {
    pub practitioner_id: String,
    pub location_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    pub granularity_minutes: u32,
    pub duration_minutes: u32,
}

/// Walk each practitioner's working hours for `date` on a fixed grid.
///
/// A slot must end by the schedule's end and must not overlap a break. Local
/// times skipped by a DST transition produce no slot. Output keeps the order
/// in which practitioners first appear in `schedules`, then start time.
pub fn candidate_slots(schedules: &[BaseSchedule], date: NaiveDate, timezone: Tz, grid: SlotGrid) -> Vec<CandidateSlot> {
    let step = Duration::minutes(i64::from(grid.granularity_minutes.max(1)));
    let length = Duration::minutes(i64::from(grid.duration_minutes));

    let mut practitioner_order: Vec<&str> = Vec::new();
    let mut slots = Vec::new();

    for schedule in schedules {
        if schedule.end_time <= schedule.start_time {
            warn!(
                "Ignoring schedule {} for {}: end {} is not after start {}",
                schedule.id, schedule.practitioner_id, schedule.end_time, schedule.start_time
            );
            continue;
        }
        if !practitioner_order.contains(&schedule.practitioner_id.as_str()) {
            practitioner_order.push(&schedule.practitioner_id);
        }

        let close = date.and_time(schedule.end_time);
        let mut local_start = date.and_time(schedule.start_time);

        while local_start + length <= close {
            let local_end = local_start + length;
            let on_break = schedule
                .breaks
                .iter()
                .any(|interval| interval.overlaps(local_start.time(), local_end.time()));

            if !on_break {
                match resolve_local(local_start, timezone) {
                    Some(start) => slots.push(CandidateSlot {
                        practitioner_id: schedule.practitioner_id.clone(),
                        location_id: schedule.location_id.clone(),
                        start,
                        end: start + length,
                    }),
                    None => trace!("Skipping {} in {}: not a local time", local_start, timezone),
                }
            }
            local_start += step;
        }
    }

    let rank = |practitioner_id: &str| {
        practitioner_order
            .iter()
            .position(|id| *id == practitioner_id)
            .unwrap_or(usize::MAX)
    };
    slots.sort_by(|a, b| {
        rank(a.practitioner_id.as_str())
            .cmp(&rank(b.practitioner_id.as_str()))
            .then(a.start.cmp(&b.start))
    });
    slots.dedup_by(|a, b| a.practitioner_id == b.practitioner_id && a.start == b.start);
    slots
}
