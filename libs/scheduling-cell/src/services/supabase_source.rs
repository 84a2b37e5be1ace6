use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use rule_engine_cell::{Appointment, Practitioner, RuleConditionRow};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::SchedulingError;
use crate::models::{BaseSchedule, ManualBlock};
use crate::services::source::SchedulingDataSource;

/// Reads scheduling data from the clinic's PostgREST tables with the anon role.
pub struct SupabaseSchedulingSource {
    supabase: SupabaseClient,
}

impl SupabaseSchedulingSource {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn select<T>(&self, table: &str, query: &str) -> Result<Vec<T>, SchedulingError>
    where
        T: serde::de::DeserializeOwned,
    {
        let rows = self
            .supabase
            .select::<T>(table, query, None)
            .await
            .map_err(|e| SchedulingError::upstream(table, e))?;

        debug!("Loaded {} rows from {}", rows.len(), table);
        Ok(rows)
    }
}

fn timestamp(instant: DateTime<Utc>) -> String {
    urlencoding::encode(&instant.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

#[async_trait]
impl SchedulingDataSource for SupabaseSchedulingSource {
    #[instrument(skip(self))]
    async fn load_rule_tree(&self, tenant_id: Uuid, rule_set_id: Uuid) -> Result<Vec<RuleConditionRow>, SchedulingError> {
        let query = format!(
            "tenant_id=eq.{}&rule_set_id=eq.{}&order=sort_order.asc",
            tenant_id, rule_set_id
        );
        self.select("rule_conditions", &query).await
    }

    #[instrument(skip(self))]
    async fn load_practitioners(&self, tenant_id: Uuid, _rule_set_id: Uuid) -> Result<Vec<Practitioner>, SchedulingError> {
        // Practitioner rows are tenant-scoped; every rule-set version sees the same roster.
        let query = format!("tenant_id=eq.{}&order=id.asc", tenant_id);
        self.select("practitioners", &query).await
    }

    #[instrument(skip(self))]
    async fn load_appointments(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let query = format!(
            "tenant_id=eq.{}&start_time=gte.{}&start_time=lt.{}&status=neq.cancelled&order=start_time.asc",
            tenant_id,
            timestamp(from),
            timestamp(to)
        );
        self.select("appointments", &query).await
    }

    #[instrument(skip(self))]
    async fn load_base_schedules(&self, tenant_id: Uuid, iso_day: u32) -> Result<Vec<BaseSchedule>, SchedulingError> {
        let query = format!(
            "tenant_id=eq.{}&day_of_week=eq.{}&order=practitioner_id.asc,start_time.asc",
            tenant_id, iso_day
        );
        self.select("base_schedules", &query).await
    }

    #[instrument(skip(self))]
    async fn load_manual_blocks(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ManualBlock>, SchedulingError> {
        let query = format!(
            "tenant_id=eq.{}&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            tenant_id,
            timestamp(to),
            timestamp(from)
        );
        self.select("manual_blocks", &query).await
    }
}
