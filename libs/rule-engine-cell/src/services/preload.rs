use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, Practitioner};

/// (appointment type, practitioner, location)
pub type CapacityKey = (String, String, Option<String>);

/// Read-only snapshot of one tenant's calendar day, built once per day-query
/// and shared by reference with every slot evaluation.
#[derive(Debug, Clone)]
pub struct PreloadedDayData {
    date: NaiveDate,
    timezone: Tz,
    by_start: HashMap<DateTime<Utc>, Vec<Appointment>>,
    daily_counts: HashMap<CapacityKey, usize>,
    practitioners: HashMap<String, Practitioner>,
    appointment_count: usize,
}

impl PreloadedDayData {
    pub fn build(
        tenant_id: Uuid,
        date: NaiveDate,
        timezone: Tz,
        appointments: Vec<Appointment>,
        practitioners: Vec<Practitioner>,
    ) -> Self {
        let (day_start, day_end) = day_bounds(date, timezone);
        let mut by_start: HashMap<DateTime<Utc>, Vec<Appointment>> = HashMap::new();
        let mut daily_counts: HashMap<CapacityKey, usize> = HashMap::new();
        let mut appointment_count = 0;

        for appointment in appointments {
            if appointment.tenant_id != tenant_id {
                warn!("Skipping appointment {} from another tenant", appointment.id);
                continue;
            }
            if !appointment.status.occupies_slot() {
                continue;
            }
            if appointment.start_time < day_start || appointment.start_time >= day_end {
                continue;
            }

            let key = (
                appointment.appointment_type_id.clone(),
                appointment.practitioner_id.clone(),
                appointment.location_id.clone(),
            );
            *daily_counts.entry(key).or_insert(0) += 1;
            by_start.entry(appointment.start_time).or_default().push(appointment);
            appointment_count += 1;
        }

        let practitioners = practitioners
            .into_iter()
            .filter(|practitioner| practitioner.tenant_id == tenant_id)
            .map(|practitioner| (practitioner.id.clone(), practitioner))
            .collect::<HashMap<_, _>>();

        debug!(
            "Preloaded {} appointments at {} distinct start times and {} practitioners for {}",
            appointment_count,
            by_start.len(),
            practitioners.len(),
            date
        );

        Self {
            date,
            timezone,
            by_start,
            daily_counts,
            practitioners,
            appointment_count,
        }
    }

    pub fn empty(date: NaiveDate, timezone: Tz) -> Self {
        Self {
            date,
            timezone,
            by_start: HashMap::new(),
            daily_counts: HashMap::new(),
            practitioners: HashMap::new(),
            appointment_count: 0,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn appointment_count(&self) -> usize {
        self.appointment_count
    }

    /// Appointments starting at exactly this instant.
    pub fn appointments_at(&self, instant: DateTime<Utc>) -> &[Appointment] {
        self.by_start.get(&instant).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn daily_count(&self, appointment_type_id: &str, practitioner_id: &str, location_id: Option<&str>) -> usize {
        let key = (
            appointment_type_id.to_string(),
            practitioner_id.to_string(),
            location_id.map(str::to_string),
        );
        self.daily_counts.get(&key).copied().unwrap_or(0)
    }

    pub fn practitioner(&self, practitioner_id: &str) -> Option<&Practitioner> {
        self.practitioners.get(practitioner_id)
    }
}

/// `[start, end)` of a local calendar day, as UTC instants.
pub fn day_bounds(date: NaiveDate, timezone: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_day_start(date, timezone);
    let end = match date.succ_opt() {
        Some(next) => local_day_start(next, timezone),
        None => start + Duration::days(1),
    };
    (start, end)
}

fn local_day_start(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    resolve_local(midnight, timezone)
        // Some zones skip midnight on DST changes; the day then starts an hour later.
        .or_else(|| resolve_local(midnight + Duration::hours(1), timezone))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Earliest instant carrying this wall-clock time, or `None` inside a DST gap.
pub fn resolve_local(local: NaiveDateTime, timezone: Tz) -> Option<DateTime<Utc>> {
    timezone
        .from_local_datetime(&local)
        .earliest()
        .map(|instant| instant.with_timezone(&Utc))
}
