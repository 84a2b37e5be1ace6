use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// READ MODELS
// ==============================================================================

/// Wall-clock interval within one day, half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeInterval {
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start < self.end && end > self.start
    }
}

/// A practitioner's recurring working hours for one ISO weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSchedule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub practitioner_id: String,
    /// ISO weekday, Monday = 1 ... Sunday = 7.
    pub day_of_week: u32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub breaks: Vec<TimeInterval>,
    pub location_id: Option<String>,
}

/// Ad-hoc closure. Without a practitioner it closes the whole practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualBlock {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub practitioner_id: Option<String>,
    pub reason: Option<String>,
}

impl ManualBlock {
    pub fn covers(&self, practitioner_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let practitioner_matches = self
            .practitioner_id
            .as_deref()
            .map_or(true, |blocked| blocked == practitioner_id);
        practitioner_matches && start < self.end_time && end > self.start_time
    }
}

// ==============================================================================
// SLOT OUTPUT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Available,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub practitioner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    pub status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by_rule_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by_manual_block_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

impl TimeSlot {
    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Day grid query. Field names double as query-string parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySlotsRequest {
    pub date: NaiveDate,
    pub appointment_type_id: String,
    /// Defaults to the configured slot granularity.
    pub duration_minutes: Option<u32>,
    pub location_id: Option<String>,
    pub client_type: Option<String>,
    pub practitioner_id: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
}

impl DaySlotsRequest {
    pub fn new(date: NaiveDate, appointment_type_id: impl Into<String>) -> Self {
        Self {
            date,
            appointment_type_id: appointment_type_id.into(),
            duration_minutes: None,
            location_id: None,
            client_type: None,
            practitioner_id: None,
            requested_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAppointmentRequest {
    pub appointment_type_id: String,
    pub practitioner_id: String,
    pub location_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub requested_at: Option<DateTime<Utc>>,
    pub client_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn practice_wide_block_covers_everyone() {
        let block = ManualBlock {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            start_time: utc(12, 0),
            end_time: utc(13, 0),
            practitioner_id: None,
            reason: Some("Staff meeting".to_string()),
        };

        assert!(block.covers("dr-a", utc(11, 55), utc(12, 5)));
        assert!(block.covers("dr-b", utc(12, 55), utc(13, 0)));
        assert!(!block.covers("dr-a", utc(13, 0), utc(13, 15)));
        assert!(!block.covers("dr-a", utc(11, 45), utc(12, 0)));
    }

    #[test]
    fn practitioner_block_ignores_colleagues() {
        let block = ManualBlock {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            start_time: utc(9, 0),
            end_time: utc(10, 0),
            practitioner_id: Some("dr-a".to_string()),
            reason: None,
        };

        assert!(block.covers("dr-a", utc(9, 30), utc(9, 45)));
        assert!(!block.covers("dr-b", utc(9, 30), utc(9, 45)));
    }

    #[test]
    fn slot_serializes_camel_case_and_omits_empty_fields() {
        let slot = TimeSlot {
            start_time: utc(9, 0),
            duration_minutes: 15,
            practitioner_id: "dr-a".to_string(),
            location_id: None,
            status: SlotStatus::Available,
            blocked_by_rule_id: None,
            blocked_by_manual_block_id: None,
            blocked_reason: None,
        };

        assert_eq!(
            serde_json::to_value(&slot).unwrap(),
            json!({
                "startTime": "2024-03-04T09:00:00Z",
                "durationMinutes": 15,
                "practitionerId": "dr-a",
                "status": "AVAILABLE"
            })
        );
    }

    #[test]
    fn base_schedule_decodes_postgrest_row() {
        let schedule: BaseSchedule = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "tenant_id": Uuid::new_v4(),
            "practitioner_id": "dr-a",
            "day_of_week": 1,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "breaks": [{ "start": "12:00:00", "end": "13:00:00" }],
            "location_id": null
        }))
        .unwrap();

        assert_eq!(schedule.breaks.len(), 1);
        assert!(schedule.breaks[0].overlaps(
            NaiveTime::from_hms_opt(12, 55, 0).unwrap(),
            NaiveTime::from_hms_opt(13, 10, 0).unwrap()
        ));
    }
}
