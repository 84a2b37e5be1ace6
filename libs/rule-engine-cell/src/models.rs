use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RuleEngineError, RuleResult};

// ==============================================================================
// CONDITION TREE ENUMS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    And,
    Not,
    Condition,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::And => "AND",
            NodeType::Not => "NOT",
            NodeType::Condition => "CONDITION",
        }
    }
}

impl FromStr for NodeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(NodeType::And),
            "NOT" => Ok(NodeType::Not),
            "CONDITION" => Ok(NodeType::Condition),
            _ => Err(()),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of leaf predicates a rule author can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionType {
    AppointmentType,
    Location,
    Practitioner,
    ClientType,
    PractitionerTag,
    DayOfWeek,
    DateRange,
    TimeRange,
    DaysAhead,
    DailyCapacity,
    ConcurrentCount,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::AppointmentType => "APPOINTMENT_TYPE",
            ConditionType::Location => "LOCATION",
            ConditionType::Practitioner => "PRACTITIONER",
            ConditionType::ClientType => "CLIENT_TYPE",
            ConditionType::PractitionerTag => "PRACTITIONER_TAG",
            ConditionType::DayOfWeek => "DAY_OF_WEEK",
            ConditionType::DateRange => "DATE_RANGE",
            ConditionType::TimeRange => "TIME_RANGE",
            ConditionType::DaysAhead => "DAYS_AHEAD",
            ConditionType::DailyCapacity => "DAILY_CAPACITY",
            ConditionType::ConcurrentCount => "CONCURRENT_COUNT",
        }
    }
}

impl FromStr for ConditionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPOINTMENT_TYPE" => Ok(ConditionType::AppointmentType),
            "LOCATION" => Ok(ConditionType::Location),
            "PRACTITIONER" => Ok(ConditionType::Practitioner),
            "CLIENT_TYPE" => Ok(ConditionType::ClientType),
            "PRACTITIONER_TAG" => Ok(ConditionType::PractitionerTag),
            "DAY_OF_WEEK" => Ok(ConditionType::DayOfWeek),
            "DATE_RANGE" => Ok(ConditionType::DateRange),
            "TIME_RANGE" => Ok(ConditionType::TimeRange),
            "DAYS_AHEAD" => Ok(ConditionType::DaysAhead),
            "DAILY_CAPACITY" => Ok(ConditionType::DailyCapacity),
            "CONCURRENT_COUNT" => Ok(ConditionType::ConcurrentCount),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Is,
    IsNot,
    Equals,
    GreaterOrEqual,
    LessOrEqual,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Is => "IS",
            Operator::IsNot => "IS_NOT",
            Operator::Equals => "EQUALS",
            Operator::GreaterOrEqual => "GREATER_OR_EQUAL",
            Operator::LessOrEqual => "LESS_OR_EQUAL",
        }
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IS" => Ok(Operator::Is),
            "IS_NOT" => Ok(Operator::IsNot),
            "EQUALS" => Ok(Operator::Equals),
            "GREATER_OR_EQUAL" => Ok(Operator::GreaterOrEqual),
            "LESS_OR_EQUAL" => Ok(Operator::LessOrEqual),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positive or negated membership test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Is,
    IsNot,
}

impl Polarity {
    pub fn apply(&self, hit: bool) -> bool {
        match self {
            Polarity::Is => hit,
            Polarity::IsNot => !hit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Equals,
    NotEquals,
    GreaterOrEqual,
    LessOrEqual,
}

impl Comparator {
    pub fn compare(&self, actual: i64, target: i64) -> bool {
        match self {
            Comparator::Equals => actual == target,
            Comparator::NotEquals => actual != target,
            Comparator::GreaterOrEqual => actual >= target,
            Comparator::LessOrEqual => actual <= target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConcurrentScope {
    Practice,
    Location,
    Practitioner,
}

impl ConcurrentScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrentScope::Practice => "practice",
            ConcurrentScope::Location => "location",
            ConcurrentScope::Practitioner => "practitioner",
        }
    }
}

impl FromStr for ConcurrentScope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "practice" => Ok(ConcurrentScope::Practice),
            "location" => Ok(ConcurrentScope::Location),
            "practitioner" => Ok(ConcurrentScope::Practitioner),
            _ => Err(()),
        }
    }
}

// ==============================================================================
// DECODED CONDITION TREE
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IdSetMatch {
    pub polarity: Polarity,
    pub ids: HashSet<String>,
}

impl IdSetMatch {
    pub fn is<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            polarity: Polarity::Is,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_not<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            polarity: Polarity::IsNot,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.polarity.apply(self.ids.contains(candidate))
    }
}

/// Leaf predicate with exactly the payload its type needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    AppointmentType(IdSetMatch),
    Location(IdSetMatch),
    Practitioner(IdSetMatch),
    ClientType(IdSetMatch),
    PractitionerTag(IdSetMatch),
    /// ISO day of week, Monday = 1 through Sunday = 7.
    DayOfWeek { comparator: Comparator, day: u32 },
    /// Inclusive on both ends.
    DateRange {
        polarity: Polarity,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Half-open `[start, end)`; wraps midnight when `end < start`.
    TimeRange {
        polarity: Polarity,
        start: NaiveTime,
        end: NaiveTime,
    },
    DaysAhead { comparator: Comparator, days: i64 },
    DailyCapacity { comparator: Comparator, limit: i64 },
    ConcurrentCount {
        comparator: Comparator,
        limit: i64,
        scope: ConcurrentScope,
        appointment_type_ids: Option<HashSet<String>>,
    },
}

impl Condition {
    pub fn condition_type(&self) -> ConditionType {
        match self {
            Condition::AppointmentType(_) => ConditionType::AppointmentType,
            Condition::Location(_) => ConditionType::Location,
            Condition::Practitioner(_) => ConditionType::Practitioner,
            Condition::ClientType(_) => ConditionType::ClientType,
            Condition::PractitionerTag(_) => ConditionType::PractitionerTag,
            Condition::DayOfWeek { .. } => ConditionType::DayOfWeek,
            Condition::DateRange { .. } => ConditionType::DateRange,
            Condition::TimeRange { .. } => ConditionType::TimeRange,
            Condition::DaysAhead { .. } => ConditionType::DaysAhead,
            Condition::DailyCapacity { .. } => ConditionType::DailyCapacity,
            Condition::ConcurrentCount { .. } => ConditionType::ConcurrentCount,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    And,
    Not,
    Condition(Condition),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::And => NodeType::And,
            NodeKind::Not => NodeType::Not,
            NodeKind::Condition(_) => NodeType::Condition,
        }
    }
}

/// One node of a rule's condition tree, stored flat with a parent link.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCondition {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub rule_set_id: Uuid,
    pub is_root: bool,
    /// Only meaningful on root nodes.
    pub enabled: bool,
    pub parent_id: Option<Uuid>,
    pub sort_order: i32,
    pub kind: NodeKind,
}

impl RuleCondition {
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn condition(&self) -> Option<&Condition> {
        match &self.kind {
            NodeKind::Condition(condition) => Some(condition),
            _ => None,
        }
    }

    pub fn to_row(&self) -> RuleConditionRow {
        let mut row = RuleConditionRow {
            id: self.id,
            tenant_id: self.tenant_id,
            rule_set_id: self.rule_set_id,
            is_root: self.is_root,
            enabled: self.enabled,
            parent_id: self.parent_id,
            sort_order: self.sort_order,
            node_type: self.node_type().as_str().to_string(),
            condition_type: None,
            operator: None,
            value_ids: None,
            value_number: None,
            value_scope: None,
        };

        if let NodeKind::Condition(condition) = &self.kind {
            row.condition_type = Some(condition.condition_type().as_str().to_string());
            encode_condition(condition, &mut row);
        }

        row
    }
}

// ==============================================================================
// PERSISTED ROW FORMAT
// ==============================================================================

/// `rule_conditions` table row as returned by the REST layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConditionRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub rule_set_id: Uuid,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub sort_order: i32,
    pub node_type: String,
    #[serde(default)]
    pub condition_type: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub value_ids: Option<Vec<String>>,
    #[serde(default)]
    pub value_number: Option<f64>,
    #[serde(default)]
    pub value_scope: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl TryFrom<RuleConditionRow> for RuleCondition {
    type Error = RuleEngineError;

    fn try_from(row: RuleConditionRow) -> RuleResult<Self> {
        let node_type: NodeType = row.node_type.parse().map_err(|_| {
            RuleEngineError::UnknownNodeType {
                node_id: row.id,
                value: row.node_type.clone(),
            }
        })?;

        let kind = match node_type {
            NodeType::And => NodeKind::And,
            NodeType::Not => NodeKind::Not,
            NodeType::Condition => NodeKind::Condition(RowDecoder::new(&row)?.decode()?),
        };

        Ok(RuleCondition {
            id: row.id,
            tenant_id: row.tenant_id,
            rule_set_id: row.rule_set_id,
            is_root: row.is_root,
            enabled: row.enabled,
            parent_id: row.parent_id,
            sort_order: row.sort_order,
            kind,
        })
    }
}

struct RowDecoder<'a> {
    row: &'a RuleConditionRow,
    condition_type: ConditionType,
    operator: Operator,
}

impl<'a> RowDecoder<'a> {
    fn new(row: &'a RuleConditionRow) -> RuleResult<Self> {
        let raw_type = row.condition_type.as_deref().ok_or(RuleEngineError::MissingField {
            node_id: row.id,
            field: "condition_type",
        })?;
        let condition_type = raw_type
            .parse()
            .map_err(|_| RuleEngineError::UnknownConditionType {
                node_id: row.id,
                value: raw_type.to_string(),
            })?;

        let raw_operator = row.operator.as_deref().ok_or(RuleEngineError::MissingField {
            node_id: row.id,
            field: "operator",
        })?;
        let operator = raw_operator
            .parse()
            .map_err(|_| RuleEngineError::UnknownOperator {
                node_id: row.id,
                value: raw_operator.to_string(),
            })?;

        Ok(Self { row, condition_type, operator })
    }

    fn decode(&self) -> RuleResult<Condition> {
        Ok(match self.condition_type {
            ConditionType::AppointmentType => Condition::AppointmentType(self.id_set()?),
            ConditionType::Location => Condition::Location(self.id_set()?),
            ConditionType::Practitioner => Condition::Practitioner(self.id_set()?),
            ConditionType::ClientType => Condition::ClientType(self.id_set()?),
            ConditionType::PractitionerTag => Condition::PractitionerTag(self.id_set()?),
            ConditionType::DayOfWeek => Condition::DayOfWeek {
                comparator: self.comparator()?,
                day: self.iso_day()?,
            },
            ConditionType::DateRange => {
                let [start, end] = self.bounds()?;
                let start = parse_date(start).ok_or_else(|| self.invalid(format!("bad start date '{}'", start)))?;
                let end = parse_date(end).ok_or_else(|| self.invalid(format!("bad end date '{}'", end)))?;
                if start > end {
                    return Err(self.invalid("date range starts after it ends".to_string()));
                }
                Condition::DateRange { polarity: self.polarity()?, start, end }
            }
            ConditionType::TimeRange => {
                let [start, end] = self.bounds()?;
                let start = parse_time(start).ok_or_else(|| self.invalid(format!("bad start time '{}'", start)))?;
                let end = parse_time(end).ok_or_else(|| self.invalid(format!("bad end time '{}'", end)))?;
                // end <= start wraps midnight, so equal bounds cover the whole day.
                Condition::TimeRange { polarity: self.polarity()?, start, end }
            }
            ConditionType::DaysAhead => Condition::DaysAhead {
                comparator: self.comparator()?,
                days: self.integer()?,
            },
            ConditionType::DailyCapacity => Condition::DailyCapacity {
                comparator: self.comparator()?,
                limit: self.integer()?,
            },
            ConditionType::ConcurrentCount => {
                let scope = match self.row.value_scope.as_deref() {
                    None => ConcurrentScope::Practice,
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| self.invalid(format!("unknown scope '{}'", raw)))?,
                };
                let appointment_type_ids = self
                    .row
                    .value_ids
                    .as_ref()
                    .filter(|ids| !ids.is_empty())
                    .map(|ids| ids.iter().cloned().collect());
                Condition::ConcurrentCount {
                    comparator: self.comparator()?,
                    limit: self.integer()?,
                    scope,
                    appointment_type_ids,
                }
            }
        })
    }

    fn unsupported(&self) -> RuleEngineError {
        RuleEngineError::UnsupportedOperator {
            node_id: self.row.id,
            condition_type: self.condition_type,
            operator: self.operator,
        }
    }

    fn invalid(&self, reason: String) -> RuleEngineError {
        RuleEngineError::InvalidValue { node_id: self.row.id, reason }
    }

    fn polarity(&self) -> RuleResult<Polarity> {
        match self.operator {
            Operator::Is | Operator::Equals => Ok(Polarity::Is),
            Operator::IsNot => Ok(Polarity::IsNot),
            Operator::GreaterOrEqual | Operator::LessOrEqual => Err(self.unsupported()),
        }
    }

    fn comparator(&self) -> RuleResult<Comparator> {
        Ok(match self.operator {
            Operator::Is | Operator::Equals => Comparator::Equals,
            Operator::IsNot => Comparator::NotEquals,
            Operator::GreaterOrEqual => Comparator::GreaterOrEqual,
            Operator::LessOrEqual => Comparator::LessOrEqual,
        })
    }

    fn id_set(&self) -> RuleResult<IdSetMatch> {
        let ids = self.row.value_ids.as_ref().ok_or(RuleEngineError::MissingField {
            node_id: self.row.id,
            field: "value_ids",
        })?;
        Ok(IdSetMatch {
            polarity: self.polarity()?,
            ids: ids.iter().cloned().collect(),
        })
    }

    fn integer(&self) -> RuleResult<i64> {
        let value = self.row.value_number.ok_or(RuleEngineError::MissingField {
            node_id: self.row.id,
            field: "value_number",
        })?;
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(self.invalid(format!("expected a whole number, got {}", value)));
        }
        Ok(value as i64)
    }

    fn bounds(&self) -> RuleResult<[&'a str; 2]> {
        match self.row.value_ids.as_deref() {
            Some([start, end]) => Ok([start.as_str(), end.as_str()]),
            Some(other) => Err(self.invalid(format!("expected [start, end], got {} values", other.len()))),
            None => Err(RuleEngineError::MissingField {
                node_id: self.row.id,
                field: "value_ids",
            }),
        }
    }

    /// Numeric ISO day, or the legacy encoding that stored a day name.
    fn iso_day(&self) -> RuleResult<u32> {
        let day = if self.row.value_number.is_some() {
            self.integer()?
        } else {
            let raw = self
                .row
                .value_ids
                .as_ref()
                .and_then(|ids| ids.first())
                .ok_or(RuleEngineError::MissingField {
                    node_id: self.row.id,
                    field: "value_number",
                })?;
            legacy_day_number(raw).ok_or_else(|| self.invalid(format!("unknown day '{}'", raw)))?
        };

        if !(1..=7).contains(&day) {
            return Err(self.invalid(format!("day of week {} outside 1..=7", day)));
        }
        Ok(day as u32)
    }
}

fn legacy_day_number(raw: &str) -> Option<i64> {
    let normalized = raw.trim().to_ascii_uppercase();
    if let Ok(number) = normalized.parse::<i64>() {
        return Some(number);
    }
    let day = match normalized.as_str() {
        "MONDAY" | "MON" => 1,
        "TUESDAY" | "TUE" | "TUES" => 2,
        "WEDNESDAY" | "WED" => 3,
        "THURSDAY" | "THU" | "THURS" => 4,
        "FRIDAY" | "FRI" => 5,
        "SATURDAY" | "SAT" => 6,
        "SUNDAY" | "SUN" => 7,
        _ => return None,
    };
    Some(day)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn polarity_operator(polarity: Polarity) -> Operator {
    match polarity {
        Polarity::Is => Operator::Is,
        Polarity::IsNot => Operator::IsNot,
    }
}

fn comparator_operator(comparator: Comparator) -> Operator {
    match comparator {
        Comparator::Equals => Operator::Equals,
        Comparator::NotEquals => Operator::IsNot,
        Comparator::GreaterOrEqual => Operator::GreaterOrEqual,
        Comparator::LessOrEqual => Operator::LessOrEqual,
    }
}

fn sorted_ids(ids: &HashSet<String>) -> Vec<String> {
    let mut ids: Vec<String> = ids.iter().cloned().collect();
    ids.sort();
    ids
}

fn encode_condition(condition: &Condition, row: &mut RuleConditionRow) {
    let operator = match condition {
        Condition::AppointmentType(set)
        | Condition::Location(set)
        | Condition::Practitioner(set)
        | Condition::ClientType(set)
        | Condition::PractitionerTag(set) => {
            row.value_ids = Some(sorted_ids(&set.ids));
            polarity_operator(set.polarity)
        }
        Condition::DayOfWeek { comparator, day } => {
            row.value_number = Some(f64::from(*day));
            comparator_operator(*comparator)
        }
        Condition::DateRange { polarity, start, end } => {
            row.value_ids = Some(vec![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
            ]);
            polarity_operator(*polarity)
        }
        Condition::TimeRange { polarity, start, end } => {
            row.value_ids = Some(vec![
                start.format("%H:%M:%S").to_string(),
                end.format("%H:%M:%S").to_string(),
            ]);
            polarity_operator(*polarity)
        }
        Condition::DaysAhead { comparator, days } => {
            row.value_number = Some(*days as f64);
            comparator_operator(*comparator)
        }
        Condition::DailyCapacity { comparator, limit } => {
            row.value_number = Some(*limit as f64);
            comparator_operator(*comparator)
        }
        Condition::ConcurrentCount { comparator, limit, scope, appointment_type_ids } => {
            row.value_number = Some(*limit as f64);
            row.value_scope = Some(scope.as_str().to_string());
            row.value_ids = appointment_type_ids.as_ref().map(sorted_ids);
            comparator_operator(*comparator)
        }
    };
    row.operator = Some(operator.as_str().to_string());
}

// ==============================================================================
// READ MODELS CONSUMED BY EVALUATION
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: String,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Practitioner {
    pub fn has_any_tag(&self, tags: &HashSet<String>) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
    NoShow,
    #[serde(other)]
    Other,
}

impl AppointmentStatus {
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

fn default_status() -> AppointmentStatus {
    AppointmentStatus::Scheduled
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub appointment_type_id: String,
    pub practitioner_id: String,
    #[serde(default)]
    pub location_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(default = "default_status")]
    pub status: AppointmentStatus,
}

/// Everything a rule may ask about one candidate booking.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentContext {
    pub appointment_type_id: String,
    pub practitioner_id: String,
    pub location_id: Option<String>,
    pub start: DateTime<Tz>,
    pub requested_at: Option<DateTime<Tz>>,
    pub client_type: Option<String>,
}

impl AppointmentContext {
    pub fn new(
        appointment_type_id: impl Into<String>,
        practitioner_id: impl Into<String>,
        start: DateTime<Tz>,
    ) -> Self {
        Self {
            appointment_type_id: appointment_type_id.into(),
            practitioner_id: practitioner_id.into(),
            location_id: None,
            start,
            requested_at: None,
            client_type: None,
        }
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn with_requested_at(mut self, requested_at: DateTime<Tz>) -> Self {
        self.requested_at = Some(requested_at);
        self
    }

    /// Replace the location, clearing it on `None`.
    pub fn at_location(mut self, location_id: Option<String>) -> Self {
        self.location_id = location_id;
        self
    }

    pub fn with_client_type(mut self, client_type: impl Into<String>) -> Self {
        self.client_type = Some(client_type.into());
        self
    }

    /// Same booking, different practitioner and slot.
    pub fn for_slot(&self, practitioner_id: &str, start: DateTime<Tz>) -> Self {
        Self {
            practitioner_id: practitioner_id.to_string(),
            start,
            ..self.clone()
        }
    }
}

/// Ad-hoc check outcome. Lists every matching rule, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCheckResult {
    pub is_blocked: bool,
    pub blocked_by_rule_ids: Vec<Uuid>,
}
