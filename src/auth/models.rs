use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cases::models::LearnerLevel;
use crate::core::ServerTimestamp;

/// Returned by register, login, and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<User>,
}

fn default_token_type() -> String {
    String::from("bearer")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub level: LearnerLevel,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub specialty_interest: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub created_at: Option<ServerTimestamp>,
    #[serde(default)]
    pub last_active: Option<ServerTimestamp>,
    #[serde(default)]
    pub preferences: Map<String, Value>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub level: LearnerLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty_interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserLogin {
    pub email: String,
    pub password: String,
}

/// Partial profile update, unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LearnerLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty_interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    #[serde(default)]
    pub total_cases: u32,
    #[serde(default)]
    pub completed_cases: u32,
    #[serde(default)]
    pub unique_conditions: u32,
    #[serde(default)]
    pub avg_duration_seconds: Option<f64>,
    #[serde(default)]
    pub last_case_completed: Option<ServerTimestamp>,
}
