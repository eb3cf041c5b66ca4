use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::ServerTimestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub code_system: Option<String>,
    pub display: String,
    #[serde(default)]
    pub onset_date: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub code_system: Option<String>,
    pub display: String,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allergy {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub code_system: Option<String>,
    pub display: String,
    #[serde(default)]
    pub reaction: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Encounter {
    pub date: Option<NaiveDate>,
    pub r#type: Option<String>,
    pub reason: Option<String>,
    pub provider: Option<String>,
}

fn default_status() -> String {
    String::from("active")
}

/// A patient imported from a C-CDA record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedPatient {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age_months: Option<u32>,
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub allergies: Vec<Allergy>,
    #[serde(default)]
    pub encounters: Vec<Encounter>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub imported_at: Option<ServerTimestamp>,
}

impl ImportedPatient {
    pub fn active_problems(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| p.status == "active")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientList {
    pub patients: Vec<ImportedPatient>,
    pub total_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientImport {
    pub patient: ImportedPatient,
    #[serde(default)]
    pub parse_warnings: Vec<String>,
}

/// Outcome for one file of a bulk import. A bad file doesn't fail the
/// rest of the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkImportResult {
    pub filename: String,
    pub success: bool,
    #[serde(default)]
    pub patient: Option<ImportedPatient>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkImport {
    pub results: Vec<BulkImportResult>,
    pub total_files: u32,
    pub successful: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedPatient {
    pub message: String,
    pub patient_id: String,
}
