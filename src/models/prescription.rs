use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A processed prescription upload. Doctor/patient columns are extracted
/// from the agent output; `structured_data` keeps the full JSON as backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub file_path: String,
    pub ocr_text: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_qualification: Option<String>,
    pub doctor_registration_number: Option<String>,
    pub hospital: Option<String>,
    pub doctor_contact_info: Option<String>,
    pub prescription_date: Option<String>,
    pub patient_name: Option<String>,
    pub patient_age: Option<String>,
    pub patient_gender: Option<String>,
    pub medicines: Vec<Value>,
    pub diagnosis: Option<String>,
    pub symptoms: Option<String>,
    pub advice: Option<String>,
    pub follow_up: Option<String>,
    pub prescription_summary: Option<String>,
    pub structured_data: Option<Value>,
}

/// Partial update payload. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionPatch {
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub doctor_qualification: Option<String>,
    #[serde(default)]
    pub doctor_registration_number: Option<String>,
    #[serde(default)]
    pub hospital: Option<String>,
    #[serde(default)]
    pub doctor_contact_info: Option<String>,
    #[serde(default)]
    pub prescription_date: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_age: Option<String>,
    #[serde(default)]
    pub patient_gender: Option<String>,
    #[serde(default)]
    pub medicines: Option<Vec<Value>>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub advice: Option<String>,
    #[serde(default)]
    pub follow_up: Option<String>,
    #[serde(default)]
    pub prescription_summary: Option<String>,
}

/// Insert payload. Also the create-endpoint body; every field except
/// `file_path` may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewPrescription {
    pub file_path: String,
    pub ocr_text: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_qualification: Option<String>,
    pub doctor_registration_number: Option<String>,
    pub hospital: Option<String>,
    pub doctor_contact_info: Option<String>,
    pub prescription_date: Option<String>,
    pub patient_name: Option<String>,
    pub patient_age: Option<String>,
    pub patient_gender: Option<String>,
    pub medicines: Vec<Value>,
    pub diagnosis: Option<String>,
    pub symptoms: Option<String>,
    pub advice: Option<String>,
    pub follow_up: Option<String>,
    pub prescription_summary: Option<String>,
    pub structured_data: Option<Value>,
}
