use rusqlite::{params, Connection, Row};

use super::{json_column, parse_string_array};
use crate::db::DatabaseError;
use crate::models::{Insurance, InsuranceInput};

pub fn insert_insurance(conn: &Connection, input: &InsuranceInput) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO insurances (name, coverage, premium, key_features, provider)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            input.name,
            input.coverage,
            input.premium,
            json_column(&input.key_features)?,
            input.provider,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_insurance(conn: &Connection, id: i64) -> Result<Option<Insurance>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_INSURANCE} WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], insurance_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn list_insurances(conn: &Connection) -> Result<Vec<Insurance>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_INSURANCE} ORDER BY id"))?;
    let rows = stmt.query_map([], insurance_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn update_insurance(
    conn: &Connection,
    id: i64,
    input: &InsuranceInput,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE insurances SET name = ?2, coverage = ?3, premium = ?4, key_features = ?5,
         provider = ?6 WHERE id = ?1",
        params![
            id,
            input.name,
            input.coverage,
            input.premium,
            json_column(&input.key_features)?,
            input.provider,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "insurance".into(), id });
    }
    Ok(())
}

pub fn delete_insurance(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM insurances WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound { entity_type: "insurance".into(), id });
    }
    Ok(())
}

const SELECT_INSURANCE: &str =
    "SELECT id, name, coverage, premium, key_features, provider FROM insurances";

fn insurance_from_row(row: &Row<'_>) -> Result<Insurance, rusqlite::Error> {
    Ok(Insurance {
        id: row.get(0)?,
        name: row.get(1)?,
        coverage: row.get(2)?,
        premium: row.get(3)?,
        key_features: parse_string_array(row.get(4)?),
        provider: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn sample() -> InsuranceInput {
        InsuranceInput {
            name: "Family Health Shield".into(),
            coverage: "5 lakh".into(),
            premium: 12500.0,
            key_features: vec!["Cashless network".into(), "Annual checkup".into()],
            provider: "Acme Assurance".into(),
        }
    }

    #[test]
    fn crud_cycle() {
        let conn = open_memory_database().unwrap();
        let id = insert_insurance(&conn, &sample()).unwrap();

        let plan = get_insurance(&conn, id).unwrap().unwrap();
        assert_eq!(plan.premium, 12500.0);
        assert_eq!(plan.key_features.len(), 2);

        let mut updated = sample();
        updated.premium = 13900.0;
        update_insurance(&conn, id, &updated).unwrap();
        assert_eq!(get_insurance(&conn, id).unwrap().unwrap().premium, 13900.0);

        delete_insurance(&conn, id).unwrap();
        assert!(matches!(
            delete_insurance(&conn, id).unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }
}
