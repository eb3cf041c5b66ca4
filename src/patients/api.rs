use crate::client::{ApiClient, ApiError};

use super::models::{BulkImport, DeletedPatient, ImportedPatient, PatientImport, PatientList};

/// Most files the server takes in one bulk import.
pub const MAX_BULK_FILES: usize = 50;

impl ApiClient {
    pub async fn list_patients(&self) -> Result<PatientList, ApiError> {
        self.get("/patients").await
    }

    pub async fn get_patient(&self, patient_id: &str) -> Result<ImportedPatient, ApiError> {
        let endpoint = format!("/patients/{}", urlencoding::encode(patient_id));
        self.get(&endpoint).await
    }

    /// Upload a C-CDA XML document. Not retried on an expired token.
    pub async fn import_patient(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<PatientImport, ApiError> {
        self.upload("/patients/import", file_name, contents).await
    }

    /// Upload several C-CDA documents as `(file name, contents)` pairs.
    /// Each file gets its own result, see `BulkImport::results`.
    pub async fn import_patients(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<BulkImport, ApiError> {
        self.upload_many("/patients/import/bulk", files).await
    }

    pub async fn delete_patient(&self, patient_id: &str) -> Result<DeletedPatient, ApiError> {
        let endpoint = format!("/patients/{}", urlencoding::encode(patient_id));
        self.delete(&endpoint).await
    }
}
