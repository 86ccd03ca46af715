use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{json_column, opt_json_column, parse_string_array, parse_value};
use crate::db::DatabaseError;
use crate::models::{CheckIn, NewCheckIn};

pub fn insert_checkin(conn: &Connection, new: &NewCheckIn) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO checkins (created_at, audio_path, transcript, summary, mood, symptoms,
         medications_taken, sleep_quality, energy_level, concerns, ai_insights, overall_score)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            Utc::now(),
            new.audio_path,
            opt_json_column(&new.transcript)?,
            new.summary,
            new.mood,
            json_column(&new.symptoms)?,
            json_column(&new.medications_taken)?,
            new.sleep_quality,
            new.energy_level,
            new.concerns,
            json_column(&new.ai_insights)?,
            new.overall_score,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_checkin(conn: &Connection, id: i64) -> Result<Option<CheckIn>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_CHECKIN} WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], checkin_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Newest-first listing, capped at `limit`.
pub fn list_checkins(conn: &Connection, limit: u32) -> Result<Vec<CheckIn>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("{SELECT_CHECKIN} ORDER BY created_at DESC, id DESC LIMIT ?1"))?;
    let rows = stmt.query_map(params![limit], checkin_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// All check-ins, newest first (report workflow source data).
pub fn list_all_checkins(conn: &Connection) -> Result<Vec<CheckIn>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_CHECKIN} ORDER BY created_at DESC, id DESC"))?;
    let rows = stmt.query_map([], checkin_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn delete_checkin(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM checkins WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "checkin".into(), id });
    }
    Ok(())
}

const SELECT_CHECKIN: &str = "SELECT id, created_at, audio_path, transcript, summary, mood,
    symptoms, medications_taken, sleep_quality, energy_level, concerns, ai_insights,
    overall_score FROM checkins";

fn checkin_from_row(row: &Row<'_>) -> Result<CheckIn, rusqlite::Error> {
    let created_at: DateTime<Utc> = row.get(1)?;
    Ok(CheckIn {
        id: row.get(0)?,
        created_at,
        audio_path: row.get(2)?,
        transcript: parse_value(row.get(3)?),
        summary: row.get(4)?,
        mood: row.get(5)?,
        symptoms: parse_string_array(row.get(6)?),
        medications_taken: parse_string_array(row.get(7)?),
        sleep_quality: row.get(8)?,
        energy_level: row.get(9)?,
        concerns: row.get(10)?,
        ai_insights: parse_string_array(row.get(11)?),
        overall_score: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use serde_json::json;

    fn sample() -> NewCheckIn {
        NewCheckIn {
            audio_path: "/uploads/checkins/audio/morning.wav".into(),
            transcript: Some(json!({"segments": [{"speaker": "SPEAKER_00", "text": "I slept badly"}]})),
            summary: Some("Patient reports poor sleep and mild fatigue.".into()),
            mood: Some("tired".into()),
            symptoms: vec!["fatigue".into(), "headache".into()],
            medications_taken: vec!["Amlodipine 5mg".into()],
            sleep_quality: Some("poor".into()),
            energy_level: Some("low".into()),
            concerns: Some("Worried about blood pressure".into()),
            ai_insights: vec!["Sleep quality declining over the week".into()],
            overall_score: Some("6/10".into()),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let id = insert_checkin(&conn, &sample()).unwrap();

        let checkin = get_checkin(&conn, id).unwrap().unwrap();
        assert_eq!(checkin.mood.as_deref(), Some("tired"));
        assert_eq!(checkin.symptoms, vec!["fatigue", "headache"]);
        assert_eq!(checkin.medications_taken.len(), 1);
        assert!(checkin.transcript.unwrap()["segments"].is_array());
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_checkin(&conn, 42).unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first_and_limited() {
        let conn = open_memory_database().unwrap();
        for i in 0..5 {
            let mut new = sample();
            new.summary = Some(format!("entry {i}"));
            insert_checkin(&conn, &new).unwrap();
        }

        let listed = list_checkins(&conn, 3).unwrap();
        assert_eq!(listed.len(), 3);
        // Same timestamp second — id DESC breaks the tie
        assert!(listed[0].id > listed[1].id);
        assert!(listed[1].id > listed[2].id);
    }

    #[test]
    fn delete_removes_row() {
        let conn = open_memory_database().unwrap();
        let id = insert_checkin(&conn, &sample()).unwrap();
        delete_checkin(&conn, id).unwrap();
        assert!(get_checkin(&conn, id).unwrap().is_none());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = delete_checkin(&conn, 99).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn corrupt_json_column_degrades_gracefully() {
        let conn = open_memory_database().unwrap();
        let id = insert_checkin(&conn, &sample()).unwrap();
        conn.execute(
            "UPDATE checkins SET symptoms = '{broken', transcript = 'also broken' WHERE id = ?1",
            params![id],
        )
        .unwrap();

        let checkin = get_checkin(&conn, id).unwrap().unwrap();
        assert!(checkin.symptoms.is_empty());
        assert!(checkin.transcript.is_none());
    }
}
