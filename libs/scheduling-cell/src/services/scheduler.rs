use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Datelike;
use chrono_tz::Tz;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use rule_engine_cell::services::classifier::partition_rules;
use rule_engine_cell::{
    check_rules, day_bounds, AppointmentContext, ConditionTree, DayRulePlan, PreloadedDayData, RuleCheckResult,
    TreeEvaluator,
};
use shared_config::AppConfig;

use crate::error::SchedulingError;
use crate::models::{CheckAppointmentRequest, DaySlotsRequest, ManualBlock, SlotStatus, TimeSlot};
use crate::services::reasons::{annotate_blocked_slots, BlockReasonProvider, RuleSummaryReasons};
use crate::services::slots::{candidate_slots, CandidateSlot, SlotGrid};
use crate::services::source::SchedulingDataSource;
use crate::services::supabase_source::SupabaseSchedulingSource;

/// Builds a practice's day grid and answers ad-hoc booking checks.
///
/// All reads for a query happen up front and concurrently; evaluation after
/// that is synchronous over the loaded snapshot.
pub struct SlotSchedulerService {
    source: Arc<dyn SchedulingDataSource>,
    reasons: Arc<dyn BlockReasonProvider>,
    timezone: Tz,
    granularity_minutes: u32,
}

impl std::fmt::Debug for SlotSchedulerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotSchedulerService")
            .field("timezone", &self.timezone)
            .field("granularity_minutes", &self.granularity_minutes)
            .finish_non_exhaustive()
    }
}

impl SlotSchedulerService {
    pub fn new(config: &AppConfig) -> Result<Self, SchedulingError> {
        Self::with_source(Arc::new(SupabaseSchedulingSource::new(config)), config)
    }

    pub fn with_source(source: Arc<dyn SchedulingDataSource>, config: &AppConfig) -> Result<Self, SchedulingError> {
        let timezone = config
            .clinic_timezone
            .parse::<Tz>()
            .map_err(|_| SchedulingError::Timezone(config.clinic_timezone.clone()))?;

        Ok(Self {
            source,
            reasons: Arc::new(RuleSummaryReasons),
            timezone,
            granularity_minutes: config.slot_granularity_minutes,
        })
    }

    pub fn with_reason_provider(mut self, reasons: Arc<dyn BlockReasonProvider>) -> Self {
        self.reasons = reasons;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Every candidate slot of the day, each marked AVAILABLE or BLOCKED.
    ///
    /// A blocked slot names the manual block or the first rule that blocks it.
    #[instrument(skip(self, request), fields(date = %request.date, appointment_type = %request.appointment_type_id))]
    pub async fn get_day_slots(
        &self,
        tenant_id: Uuid,
        rule_set_id: Uuid,
        request: &DaySlotsRequest,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        let duration_minutes = request.duration_minutes.unwrap_or(self.granularity_minutes);
        if duration_minutes == 0 {
            return Err(SchedulingError::InvalidRequest("duration_minutes must be positive".to_string()));
        }
        if request.appointment_type_id.trim().is_empty() {
            return Err(SchedulingError::InvalidRequest("appointment_type_id is required".to_string()));
        }

        let (day_start, day_end) = day_bounds(request.date, self.timezone);
        let iso_day = request.date.weekday().number_from_monday();

        let (rows, practitioners, appointments, mut schedules, manual_blocks) = tokio::try_join!(
            self.source.load_rule_tree(tenant_id, rule_set_id),
            self.source.load_practitioners(tenant_id, rule_set_id),
            self.source.load_appointments(tenant_id, day_start, day_end),
            self.source.load_base_schedules(tenant_id, iso_day),
            self.source.load_manual_blocks(tenant_id, day_start, day_end),
        )?;

        let tree = ConditionTree::from_rows(rows)?;
        let preloaded = PreloadedDayData::build(tenant_id, request.date, self.timezone, appointments, practitioners);

        schedules.retain(|schedule| {
            schedule.day_of_week == iso_day
                && request
                    .practitioner_id
                    .as_deref()
                    .map_or(true, |wanted| wanted == schedule.practitioner_id)
                && match (request.location_id.as_deref(), schedule.location_id.as_deref()) {
                    (Some(wanted), Some(actual)) => wanted == actual,
                    _ => true,
                }
        });

        let grid = SlotGrid {
            granularity_minutes: self.granularity_minutes,
            duration_minutes,
        };
        let candidates = candidate_slots(&schedules, request.date, self.timezone, grid);
        let Some(first) = candidates.first() else {
            info!("No working hours on {} for tenant {}", request.date, tenant_id);
            return Ok(Vec::new());
        };

        let base = self.base_context(request, first);
        let evaluator = TreeEvaluator::new(&tree, &preloaded);
        let partition = partition_rules(&tree)?;
        let mut plans: HashMap<Option<String>, DayRulePlan> = HashMap::new();

        let mut slots = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let location_id = candidate.location_id.clone().or_else(|| request.location_id.clone());
            let plan = match plans.entry(location_id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let representative = base.clone().at_location(location_id.clone());
                    entry.insert(DayRulePlan::with_partition(partition.clone(), &evaluator, &representative)?)
                }
            };
            slots.push(self.decide_slot(candidate, location_id, duration_minutes, &manual_blocks, plan, &evaluator, &base)?);
        }
        debug!("Day-invariant rules evaluated for {} location(s)", plans.len());

        annotate_blocked_slots(self.reasons.as_ref(), &tree, &mut slots);

        let available = slots.iter().filter(|slot| slot.is_available()).count();
        info!(
            "Built {} slots for {} ({} available, {} blocked)",
            slots.len(),
            request.date,
            available,
            slots.len() - available
        );
        Ok(slots)
    }

    /// Ad-hoc check of one booking against every enabled rule; lists all matches.
    #[instrument(skip(self, request), fields(start = %request.start_time))]
    pub async fn check_appointment(
        &self,
        tenant_id: Uuid,
        rule_set_id: Uuid,
        request: &CheckAppointmentRequest,
    ) -> Result<RuleCheckResult, SchedulingError> {
        let start = request.start_time.with_timezone(&self.timezone);
        let date = start.date_naive();
        let (day_start, day_end) = day_bounds(date, self.timezone);

        let (rows, practitioners, appointments) = tokio::try_join!(
            self.source.load_rule_tree(tenant_id, rule_set_id),
            self.source.load_practitioners(tenant_id, rule_set_id),
            self.source.load_appointments(tenant_id, day_start, day_end),
        )?;

        let tree = ConditionTree::from_rows(rows)?;
        let preloaded = PreloadedDayData::build(tenant_id, date, self.timezone, appointments, practitioners);

        let mut context = AppointmentContext::new(&request.appointment_type_id, &request.practitioner_id, start);
        if let Some(location_id) = &request.location_id {
            context = context.with_location(location_id);
        }
        if let Some(client_type) = &request.client_type {
            context = context.with_client_type(client_type);
        }
        if let Some(requested_at) = request.requested_at {
            context = context.with_requested_at(requested_at.with_timezone(&self.timezone));
        }

        let result = check_rules(&tree, &context, &preloaded)?;
        debug!("Booking check blocked={} by {:?}", result.is_blocked, result.blocked_by_rule_ids);
        Ok(result)
    }

    /// Request-wide inputs plus the first candidate's practitioner and start.
    ///
    /// The location is left out: each slot takes the one it is offered at.
    fn base_context(&self, request: &DaySlotsRequest, first: &CandidateSlot) -> AppointmentContext {
        let mut context = AppointmentContext::new(
            &request.appointment_type_id,
            &first.practitioner_id,
            first.start.with_timezone(&self.timezone),
        );
        if let Some(client_type) = &request.client_type {
            context = context.with_client_type(client_type);
        }
        if let Some(requested_at) = request.requested_at {
            context = context.with_requested_at(requested_at.with_timezone(&self.timezone));
        }
        context
    }

    #[allow(clippy::too_many_arguments)]
    fn decide_slot(
        &self,
        candidate: &CandidateSlot,
        location_id: Option<String>,
        duration_minutes: u32,
        manual_blocks: &[ManualBlock],
        plan: &DayRulePlan,
        evaluator: &TreeEvaluator<'_>,
        base: &AppointmentContext,
    ) -> Result<TimeSlot, SchedulingError> {
        let mut slot = TimeSlot {
            start_time: candidate.start,
            duration_minutes,
            practitioner_id: candidate.practitioner_id.clone(),
            location_id,
            status: SlotStatus::Available,
            blocked_by_rule_id: None,
            blocked_by_manual_block_id: None,
            blocked_reason: None,
        };

        if let Some(block) = manual_blocks
            .iter()
            .find(|block| block.covers(&candidate.practitioner_id, candidate.start, candidate.end))
        {
            slot.status = SlotStatus::Blocked;
            slot.blocked_by_manual_block_id = Some(block.id);
            slot.blocked_reason = block.reason.clone();
            return Ok(slot);
        }

        let context = base
            .for_slot(&candidate.practitioner_id, candidate.start.with_timezone(&self.timezone))
            .at_location(slot.location_id.clone());
        if let Some(rule_id) = plan.first_blocking_rule(evaluator, &context)? {
            slot.status = SlotStatus::Blocked;
            slot.blocked_by_rule_id = Some(rule_id);
        }
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::source::MockSchedulingDataSource;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use rule_engine_cell::services::builder::RuleNodeFactory;
    use rule_engine_cell::{Condition, IdSetMatch, RuleEngineError, RuleExpr};

    use crate::models::BaseSchedule;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn nine_to_ten(tenant_id: Uuid) -> BaseSchedule {
        BaseSchedule {
            id: Uuid::new_v4(),
            tenant_id,
            practitioner_id: "dr-a".to_string(),
            day_of_week: 1,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            breaks: vec![],
            location_id: None,
        }
    }

    fn quiet_source(tenant_id: Uuid) -> MockSchedulingDataSource {
        let mut source = MockSchedulingDataSource::new();
        source.expect_load_rule_tree().returning(|_, _| Ok(vec![]));
        source.expect_load_practitioners().returning(|_, _| Ok(vec![]));
        source.expect_load_manual_blocks().returning(|_, _, _| Ok(vec![]));
        source
            .expect_load_base_schedules()
            .returning(move |_, _| Ok(vec![nine_to_ten(tenant_id)]));
        source
    }

    #[tokio::test]
    async fn failed_appointment_read_is_not_reported_as_free_slots() {
        let tenant = Uuid::new_v4();
        let mut source = quiet_source(tenant);
        source
            .expect_load_appointments()
            .returning(|_, _, _| Err(SchedulingError::UpstreamUnavailable("appointments timed out".to_string())));

        let service = SlotSchedulerService::with_source(Arc::new(source), &AppConfig::default()).unwrap();
        let result = service
            .get_day_slots(tenant, Uuid::new_v4(), &DaySlotsRequest::new(monday(), "checkup"))
            .await;

        assert_matches!(result, Err(SchedulingError::UpstreamUnavailable(msg)) if msg.contains("timed out"));
    }

    #[tokio::test]
    async fn corrupted_rule_rows_fail_the_query() {
        let tenant = Uuid::new_v4();
        let rule_set = Uuid::new_v4();
        let factory = RuleNodeFactory::new(tenant, rule_set);
        let mut rows: Vec<_> = factory
            .rule(0, true, RuleExpr::leaf(Condition::Location(IdSetMatch::is(["main"]))))
            .iter()
            .map(|node| node.to_row())
            .collect();
        rows[1].operator = Some("CONTAINS".to_string());

        let mut source = MockSchedulingDataSource::new();
        source.expect_load_rule_tree().returning(move |_, _| Ok(rows.clone()));
        source.expect_load_practitioners().returning(|_, _| Ok(vec![]));
        source.expect_load_appointments().returning(|_, _, _| Ok(vec![]));

        let service = SlotSchedulerService::with_source(Arc::new(source), &AppConfig::default()).unwrap();
        let request = CheckAppointmentRequest {
            appointment_type_id: "checkup".to_string(),
            practitioner_id: "dr-a".to_string(),
            location_id: Some("main".to_string()),
            start_time: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
            requested_at: None,
            client_type: None,
        };

        assert_matches!(
            service.check_appointment(tenant, rule_set, &request).await,
            Err(SchedulingError::Rule(RuleEngineError::UnknownOperator { .. }))
        );
    }

    #[tokio::test]
    async fn zero_duration_is_rejected_before_any_read() {
        let service =
            SlotSchedulerService::with_source(Arc::new(MockSchedulingDataSource::new()), &AppConfig::default()).unwrap();
        let mut request = DaySlotsRequest::new(monday(), "checkup");
        request.duration_minutes = Some(0);

        assert_matches!(
            service.get_day_slots(Uuid::new_v4(), Uuid::new_v4(), &request).await,
            Err(SchedulingError::InvalidRequest(_))
        );
    }

    #[test]
    fn unknown_clinic_timezone_is_a_configuration_error() {
        let mut config = AppConfig::default();
        config.clinic_timezone = "Mars/Olympus_Mons".to_string();

        assert_matches!(
            SlotSchedulerService::with_source(Arc::new(MockSchedulingDataSource::new()), &config),
            Err(SchedulingError::Timezone(tz)) if tz == "Mars/Olympus_Mons"
        );
    }
}
