use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::{Hospital, HospitalInput};

pub fn insert_hospital(conn: &Connection, input: &HospitalInput) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO hospitals (name, speciality, location, reviews, contact_info, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.name,
            input.speciality,
            input.location,
            input.reviews,
            input.contact_info,
            input.description,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_hospital(conn: &Connection, id: i64) -> Result<Option<Hospital>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_HOSPITAL} WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], hospital_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn list_hospitals(conn: &Connection) -> Result<Vec<Hospital>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_HOSPITAL} ORDER BY id"))?;
    let rows = stmt.query_map([], hospital_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn update_hospital(
    conn: &Connection,
    id: i64,
    input: &HospitalInput,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE hospitals SET name = ?2, speciality = ?3, location = ?4, reviews = ?5,
         contact_info = ?6, description = ?7 WHERE id = ?1",
        params![
            id,
            input.name,
            input.speciality,
            input.location,
            input.reviews,
            input.contact_info,
            input.description,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "hospital".into(), id });
    }
    Ok(())
}

pub fn delete_hospital(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM hospitals WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "hospital".into(), id });
    }
    Ok(())
}

const SELECT_HOSPITAL: &str =
    "SELECT id, name, speciality, location, reviews, contact_info, description FROM hospitals";

fn hospital_from_row(row: &Row<'_>) -> Result<Hospital, rusqlite::Error> {
    Ok(Hospital {
        id: row.get(0)?,
        name: row.get(1)?,
        speciality: row.get(2)?,
        location: row.get(3)?,
        reviews: row.get(4)?,
        contact_info: row.get(5)?,
        description: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn sample() -> HospitalInput {
        HospitalInput {
            name: "City Hospital".into(),
            speciality: "Cardiology".into(),
            location: "Pune".into(),
            reviews: Some(4.3),
            contact_info: Some("+91 20 1234 5678".into()),
            description: Some("Tertiary care center".into()),
        }
    }

    #[test]
    fn crud_cycle() {
        let conn = open_memory_database().unwrap();
        let id = insert_hospital(&conn, &sample()).unwrap();

        let hospital = get_hospital(&conn, id).unwrap().unwrap();
        assert_eq!(hospital.name, "City Hospital");
        assert_eq!(hospital.reviews, Some(4.3));

        let mut updated = sample();
        updated.speciality = "Cardiology, Nephrology".into();
        update_hospital(&conn, id, &updated).unwrap();
        let hospital = get_hospital(&conn, id).unwrap().unwrap();
        assert_eq!(hospital.speciality, "Cardiology, Nephrology");

        assert_eq!(list_hospitals(&conn).unwrap().len(), 1);

        delete_hospital(&conn, id).unwrap();
        assert!(get_hospital(&conn, id).unwrap().is_none());
    }

    #[test]
    fn update_missing_is_not_found() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            update_hospital(&conn, 3, &sample()).unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }
}
