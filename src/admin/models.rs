use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::ServerTimestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub level: String,
    pub role: String,
    #[serde(default)]
    pub institution: Option<String>,
    pub created_at: ServerTimestamp,
    pub last_active: ServerTimestamp,
    #[serde(default)]
    pub total_cases: u32,
    #[serde(default)]
    pub completed_cases: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub summary: UserSummary,
    #[serde(default)]
    pub specialty_interest: Option<String>,
    #[serde(default)]
    pub unique_conditions: u32,
    #[serde(default)]
    pub avg_case_duration_minutes: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCaseSummary {
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    pub condition_display: String,
    pub patient_name: String,
    pub status: String,
    pub phase: String,
    pub started_at: ServerTimestamp,
    #[serde(default)]
    pub completed_at: Option<ServerTimestamp>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub hints_given: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformMetrics {
    pub total_users: u32,
    pub active_last_7_days: u32,
    pub active_last_30_days: u32,
    pub total_cases: u32,
    pub completed_cases: u32,
    pub active_cases: u32,
    pub avg_case_duration_minutes: Option<f64>,
    pub avg_hints_per_case: Option<f64>,
    pub completion_rate: Option<f64>,
    pub most_practiced_conditions: Vec<Map<String, Value>>,
    pub cases_by_day: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StruggleMetrics {
    pub common_stuck_phases: Vec<Map<String, Value>>,
    pub high_hint_conditions: Vec<Map<String, Value>>,
    pub avg_hints_by_level: Vec<Map<String, Value>>,
}
