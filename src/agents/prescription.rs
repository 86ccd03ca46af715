//! Prescription extraction pipeline: OCR text in, structured
//! doctor/patient/medicine data out.

use serde::{Deserialize, Serialize};

use super::client::{run_expect_key, AgentRunner};
use super::AgentError;
use crate::models::NewPrescription;

pub const PRESCRIPTION_APP: &str = "prescription_agent";
const PRESCRIPTION_OUTPUT_KEY: &str = "prescription_data";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub hospital: Option<String>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Medicine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalSummary {
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub advice: Option<String>,
    #[serde(default)]
    pub follow_up: Option<String>,
}

/// Full structured output of the prescription agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionData {
    #[serde(default)]
    pub doctor_info: DoctorInfo,
    #[serde(default)]
    pub patient_info: PatientInfo,
    #[serde(default, deserialize_with = "crate::agents::events::lenient_vec")]
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub summary: ClinicalSummary,
    #[serde(default)]
    pub prescription_summary: Option<String>,
}

/// Extract structured prescription data from OCR text.
pub async fn extract_prescription(
    runner: &dyn AgentRunner,
    ocr_text: &str,
) -> Result<PrescriptionData, AgentError> {
    run_expect_key(runner, PRESCRIPTION_APP, PRESCRIPTION_OUTPUT_KEY, ocr_text).await
}

/// Build the insert payload: extracted columns plus the full JSON backup.
pub fn to_new_prescription(
    file_path: &str,
    ocr_text: &str,
    data: &PrescriptionData,
) -> NewPrescription {
    let medicines = data
        .medicines
        .iter()
        .filter_map(|m| serde_json::to_value(m).ok())
        .collect();
    NewPrescription {
        file_path: file_path.to_string(),
        ocr_text: Some(ocr_text.to_string()),
        doctor_name: data.doctor_info.name.clone(),
        doctor_qualification: data.doctor_info.qualification.clone(),
        doctor_registration_number: data.doctor_info.registration_number.clone(),
        hospital: data.doctor_info.hospital.clone(),
        doctor_contact_info: data.doctor_info.contact_info.clone(),
        prescription_date: data.doctor_info.date.clone(),
        patient_name: data.patient_info.name.clone(),
        patient_age: data.patient_info.age.clone(),
        patient_gender: data.patient_info.gender.clone(),
        medicines,
        diagnosis: data.summary.diagnosis.clone(),
        symptoms: data.summary.symptoms.clone(),
        advice: data.summary.advice.clone(),
        follow_up: data.summary.follow_up.clone(),
        prescription_summary: data.prescription_summary.clone(),
        structured_data: serde_json::to_value(data).ok(),
    }
}
