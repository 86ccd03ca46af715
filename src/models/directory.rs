use serde::{Deserialize, Serialize};

/// Hospital directory entry. Created and edited through the CRUD API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub speciality: String,
    pub location: String,
    pub reviews: Option<f64>,
    pub contact_info: Option<String>,
    pub description: Option<String>,
}

/// Create/update payload for a hospital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalInput {
    pub name: String,
    pub speciality: String,
    pub location: String,
    #[serde(default)]
    pub reviews: Option<f64>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Insurance plan directory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insurance {
    pub id: i64,
    pub name: String,
    pub coverage: String,
    pub premium: f64,
    pub key_features: Vec<String>,
    pub provider: String,
}

/// Create/update payload for an insurance plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceInput {
    pub name: String,
    pub coverage: String,
    pub premium: f64,
    #[serde(default)]
    pub key_features: Vec<String>,
    pub provider: String,
}
