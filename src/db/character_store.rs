use rusqlite::types::ValueRef;
use rusqlite::{params, Row};
use tokio_rusqlite::Connection;

use crate::error::{is_unique_violation, Result};
use crate::models::{Character, NewCharacter};

use super::open_store;
use super::schema::migrate_character_store;

/// Local store of characters fetched from the character API.
pub struct CharacterStore {
    conn: Connection,
}

impl CharacterStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = open_store(Some(db_path), migrate_character_store).await?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = open_store(None, migrate_character_store).await?;
        Ok(Self { conn })
    }

    pub async fn contains_name(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        let exists = self
            .conn
            .call(move |conn| Ok(contains_character(conn, &name)?))
            .await?;
        Ok(exists)
    }

    /// Returns false when a character with the same name is already stored.
    pub async fn insert_character(&self, character: NewCharacter) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| Ok(insert_character_row(conn, &character)?))
            .await?;
        Ok(inserted)
    }

    /// All named characters in insertion order.
    pub async fn all_characters(&self) -> Result<Vec<Character>> {
        let characters = self.conn.call(|conn| Ok(select_characters(conn)?)).await?;
        Ok(characters)
    }
}

pub(super) fn contains_character(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM characters WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub(super) fn insert_character_row(
    conn: &rusqlite::Connection,
    character: &NewCharacter,
) -> rusqlite::Result<bool> {
    let result = conn.execute(
        r#"INSERT INTO characters (name, house, species, role, patronus, gender, age, alternate_names)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        params![
            character.name,
            character.house,
            character.species,
            character.role,
            character.patronus,
            character.gender,
            character.age,
            character.alternate_names,
        ],
    );
    match result {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

pub(super) fn select_characters(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<Character>> {
    let mut stmt = conn.prepare(
        r#"SELECT id, name, house, species, role, patronus, gender, age, alternate_names
           FROM characters
           WHERE name IS NOT NULL
           ORDER BY id"#,
    )?;
    let characters = stmt
        .query_map([], character_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(characters)
}

fn character_from_row(row: &Row) -> rusqlite::Result<Character> {
    Ok(Character {
        id: row.get(0)?,
        name: row.get(1)?,
        house: row.get(2)?,
        species: row.get(3)?,
        role: row.get(4)?,
        patronus: row.get(5)?,
        gender: row.get(6)?,
        age: age_from_value(row.get_ref(7)?),
        alternate_names: row.get(8)?,
    })
}

// Older combined stores declare `age TEXT`, so the year may come back as text.
fn age_from_value(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(n) => Some(n),
        ValueRef::Real(f) if f.is_finite() => Some(f as i64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CharacterRecord, Role};

    fn hermione() -> NewCharacter {
        let mut record = CharacterRecord::named("Hermione Granger");
        record.house = Some("Gryffindor".into());
        record.role = Role::Student;
        NewCharacter::from_record(record).unwrap()
    }

    #[tokio::test]
    async fn duplicate_name_is_skipped() {
        let store = CharacterStore::open_in_memory().await.unwrap();

        assert!(store.insert_character(hermione()).await.unwrap());
        assert!(!store.insert_character(hermione()).await.unwrap());

        let all = store.all_characters().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].house.as_deref(), Some("Gryffindor"));
        assert!(store.contains_name("Hermione Granger").await.unwrap());
        assert!(!store.contains_name("hermione granger").await.unwrap());
    }
}
