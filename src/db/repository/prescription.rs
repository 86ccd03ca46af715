use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{json_column, opt_json_column, parse_value, parse_value_array};
use crate::db::DatabaseError;
use crate::models::{NewPrescription, Prescription, PrescriptionPatch};

pub fn insert_prescription(
    conn: &Connection,
    new: &NewPrescription,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (created_at, file_path, ocr_text, doctor_name,
         doctor_qualification, doctor_registration_number, hospital, doctor_contact_info,
         prescription_date, patient_name, patient_age, patient_gender, medicines, diagnosis,
         symptoms, advice, follow_up, prescription_summary, structured_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            Utc::now(),
            new.file_path,
            new.ocr_text,
            new.doctor_name,
            new.doctor_qualification,
            new.doctor_registration_number,
            new.hospital,
            new.doctor_contact_info,
            new.prescription_date,
            new.patient_name,
            new.patient_age,
            new.patient_gender,
            json_column(&new.medicines)?,
            new.diagnosis,
            new.symptoms,
            new.advice,
            new.follow_up,
            new.prescription_summary,
            opt_json_column(&new.structured_data)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_prescription(
    conn: &Connection,
    id: i64,
) -> Result<Option<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_PRESCRIPTION} WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], prescription_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Newest-first listing, capped at `limit`.
pub fn list_prescriptions(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_PRESCRIPTION} ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], prescription_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// All prescriptions, newest first (report workflow source data).
pub fn list_all_prescriptions(conn: &Connection) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("{SELECT_PRESCRIPTION} ORDER BY created_at DESC, id DESC"))?;
    let rows = stmt.query_map([], prescription_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Apply a partial update. Absent fields keep their stored value.
pub fn update_prescription(
    conn: &Connection,
    id: i64,
    patch: &PrescriptionPatch,
) -> Result<(), DatabaseError> {
    let medicines = patch.medicines.as_ref().map(|m| json_column(m)).transpose()?;
    let affected = conn.execute(
        "UPDATE prescriptions SET
            doctor_name = COALESCE(?2, doctor_name),
            doctor_qualification = COALESCE(?3, doctor_qualification),
            doctor_registration_number = COALESCE(?4, doctor_registration_number),
            hospital = COALESCE(?5, hospital),
            doctor_contact_info = COALESCE(?6, doctor_contact_info),
            prescription_date = COALESCE(?7, prescription_date),
            patient_name = COALESCE(?8, patient_name),
            patient_age = COALESCE(?9, patient_age),
            patient_gender = COALESCE(?10, patient_gender),
            medicines = COALESCE(?11, medicines),
            diagnosis = COALESCE(?12, diagnosis),
            symptoms = COALESCE(?13, symptoms),
            advice = COALESCE(?14, advice),
            follow_up = COALESCE(?15, follow_up),
            prescription_summary = COALESCE(?16, prescription_summary)
         WHERE id = ?1",
        params![
            id,
            patch.doctor_name,
            patch.doctor_qualification,
            patch.doctor_registration_number,
            patch.hospital,
            patch.doctor_contact_info,
            patch.prescription_date,
            patch.patient_name,
            patch.patient_age,
            patch.patient_gender,
            medicines,
            patch.diagnosis,
            patch.symptoms,
            patch.advice,
            patch.follow_up,
            patch.prescription_summary,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "prescription".into(), id });
    }
    Ok(())
}

pub fn delete_prescription(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM prescriptions WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "prescription".into(), id });
    }
    Ok(())
}

const SELECT_PRESCRIPTION: &str = "SELECT id, created_at, file_path, ocr_text, doctor_name,
    doctor_qualification, doctor_registration_number, hospital, doctor_contact_info,
    prescription_date, patient_name, patient_age, patient_gender, medicines, diagnosis,
    symptoms, advice, follow_up, prescription_summary, structured_data FROM prescriptions";

fn prescription_from_row(row: &Row<'_>) -> Result<Prescription, rusqlite::Error> {
    let created_at: DateTime<Utc> = row.get(1)?;
    Ok(Prescription {
        id: row.get(0)?,
        created_at,
        file_path: row.get(2)?,
        ocr_text: row.get(3)?,
        doctor_name: row.get(4)?,
        doctor_qualification: row.get(5)?,
        doctor_registration_number: row.get(6)?,
        hospital: row.get(7)?,
        doctor_contact_info: row.get(8)?,
        prescription_date: row.get(9)?,
        patient_name: row.get(10)?,
        patient_age: row.get(11)?,
        patient_gender: row.get(12)?,
        medicines: parse_value_array(row.get(13)?),
        diagnosis: row.get(14)?,
        symptoms: row.get(15)?,
        advice: row.get(16)?,
        follow_up: row.get(17)?,
        prescription_summary: row.get(18)?,
        structured_data: parse_value(row.get(19)?),
    })
}
