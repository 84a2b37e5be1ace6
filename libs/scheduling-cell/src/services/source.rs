use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use rule_engine_cell::{Appointment, ConditionTree, Practitioner, RuleCondition, RuleConditionRow, RuleEngineError};
use shared_config::AppConfig;

use crate::error::SchedulingError;
use crate::models::{BaseSchedule, ManualBlock};

/// Everything a day-query reads. Each call is made once per query, up front.
///
/// Time windows are half-open `[from, to)` in UTC.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchedulingDataSource: Send + Sync {
    /// Every node of the rule set, disabled rules included.
    async fn load_rule_tree(&self, tenant_id: Uuid, rule_set_id: Uuid) -> Result<Vec<RuleConditionRow>, SchedulingError>;

    async fn load_practitioners(&self, tenant_id: Uuid, rule_set_id: Uuid) -> Result<Vec<Practitioner>, SchedulingError>;

    async fn load_appointments(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn load_base_schedules(&self, tenant_id: Uuid, iso_day: u32) -> Result<Vec<BaseSchedule>, SchedulingError>;

    async fn load_manual_blocks(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ManualBlock>, SchedulingError>;
}

/// Process-local store for demos and tests. Rules are validated on insert.
#[derive(Debug, Clone)]
pub struct InMemorySchedulingSource {
    max_rule_depth: usize,
    rule_sets: HashMap<(Uuid, Uuid), ConditionTree>,
    practitioners: Vec<Practitioner>,
    appointments: Vec<Appointment>,
    schedules: Vec<BaseSchedule>,
    manual_blocks: Vec<ManualBlock>,
}

impl InMemorySchedulingSource {
    pub fn new(max_rule_depth: usize) -> Self {
        Self {
            max_rule_depth,
            rule_sets: HashMap::new(),
            practitioners: Vec::new(),
            appointments: Vec::new(),
            schedules: Vec::new(),
            manual_blocks: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.max_rule_depth)
    }

    /// Store one rule (root plus subtree). Rejected rules leave the store untouched.
    pub fn insert_rule(&mut self, nodes: Vec<RuleCondition>) -> Result<Uuid, SchedulingError> {
        let root = nodes
            .iter()
            .find(|node| node.is_root)
            .ok_or(RuleEngineError::MissingRoot)?;
        let key = (root.tenant_id, root.rule_set_id);

        let mut tree = self.rule_sets.get(&key).cloned().unwrap_or_default();
        let root_id = tree.insert_rule(nodes, self.max_rule_depth)?;
        self.rule_sets.insert(key, tree);

        debug!("Stored rule {} for tenant {} rule set {}", root_id, key.0, key.1);
        Ok(root_id)
    }

    pub fn add_practitioner(&mut self, practitioner: Practitioner) {
        self.practitioners.push(practitioner);
    }

    pub fn add_appointment(&mut self, appointment: Appointment) {
        self.appointments.push(appointment);
    }

    pub fn add_schedule(&mut self, schedule: BaseSchedule) {
        self.schedules.push(schedule);
    }

    pub fn add_manual_block(&mut self, block: ManualBlock) {
        self.manual_blocks.push(block);
    }
}

#[async_trait]
impl SchedulingDataSource for InMemorySchedulingSource {
    async fn load_rule_tree(&self, tenant_id: Uuid, rule_set_id: Uuid) -> Result<Vec<RuleConditionRow>, SchedulingError> {
        Ok(self
            .rule_sets
            .get(&(tenant_id, rule_set_id))
            .map(ConditionTree::to_rows)
            .unwrap_or_default())
    }

    async fn load_practitioners(&self, tenant_id: Uuid, _rule_set_id: Uuid) -> Result<Vec<Practitioner>, SchedulingError> {
        Ok(self
            .practitioners
            .iter()
            .filter(|practitioner| practitioner.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn load_appointments(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self
            .appointments
            .iter()
            .filter(|apt| apt.tenant_id == tenant_id && apt.start_time >= from && apt.start_time < to)
            .cloned()
            .collect())
    }

    async fn load_base_schedules(&self, tenant_id: Uuid, iso_day: u32) -> Result<Vec<BaseSchedule>, SchedulingError> {
        Ok(self
            .schedules
            .iter()
            .filter(|schedule| schedule.tenant_id == tenant_id && schedule.day_of_week == iso_day)
            .cloned()
            .collect())
    }

    async fn load_manual_blocks(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ManualBlock>, SchedulingError> {
        Ok(self
            .manual_blocks
            .iter()
            .filter(|block| block.tenant_id == tenant_id && block.start_time < to && block.end_time > from)
            .cloned()
            .collect())
    }
}
