use rusqlite::Connection;

pub const CHARACTER_SCHEMA_VERSION: i64 = 1;
pub const VIDEO_SCHEMA_VERSION: i64 = 1;
pub const COMBINED_SCHEMA_VERSION: i64 = 1;

pub const CHARACTER_SCHEMA: &str = r#"
-- characters fetched from the character API
CREATE TABLE IF NOT EXISTS characters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE,
    house TEXT,
    species TEXT,
    role TEXT,
    patronus TEXT,
    gender TEXT,
    age INTEGER,
    alternate_names TEXT
);
"#;

pub const VIDEO_SCHEMA: &str = r#"
-- channels, with the continuation token of the next page to fetch
CREATE TABLE IF NOT EXISTS channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id TEXT UNIQUE,
    title TEXT,
    subscriber_count INTEGER,
    next_page_token TEXT
);

-- videos with their statistics inline
CREATE TABLE IF NOT EXISTS videos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id TEXT UNIQUE,
    channel_ref INTEGER REFERENCES channels(id),
    title TEXT,
    duration_seconds INTEGER,
    view_count INTEGER,
    like_count INTEGER,
    view_like_ratio REAL,
    comment_count INTEGER,
    published_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_videos_channel_ref ON videos(channel_ref);
"#;

pub const COMBINED_SCHEMA: &str = r#"
-- channels table
CREATE TABLE IF NOT EXISTS channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id TEXT NOT NULL UNIQUE,
    title TEXT,
    subscriber_count INTEGER,
    next_page_token TEXT
);

-- videos table
CREATE TABLE IF NOT EXISTS videos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id TEXT NOT NULL UNIQUE,
    channel_ref INTEGER NOT NULL REFERENCES channels(id),
    title TEXT,
    duration_seconds INTEGER NOT NULL DEFAULT 0,
    published_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_videos_channel_ref ON videos(channel_ref);

-- video_stats table (1:1 with videos)
CREATE TABLE IF NOT EXISTS video_stats (
    video_ref INTEGER PRIMARY KEY REFERENCES videos(id) ON DELETE CASCADE,
    view_count INTEGER NOT NULL DEFAULT 0,
    like_count INTEGER NOT NULL DEFAULT 0,
    comment_count INTEGER NOT NULL DEFAULT 0,
    view_like_ratio REAL
);

-- characters table
CREATE TABLE IF NOT EXISTS characters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    house TEXT,
    species TEXT,
    role TEXT,
    patronus TEXT,
    gender TEXT,
    age INTEGER,
    alternate_names TEXT
);

-- character_mentions table
CREATE TABLE IF NOT EXISTS character_mentions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    character_ref INTEGER NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
    video_ref INTEGER NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    mention_count INTEGER NOT NULL DEFAULT 1
);
"#;

// Indexes over columns that may only exist after column reconciliation.
const COMBINED_INDEXES: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_character_mentions_pair
    ON character_mentions(character_ref, video_ref);
CREATE INDEX IF NOT EXISTS idx_character_mentions_video ON character_mentions(video_ref);
"#;

/// An expected column, with the name an older schema used for it.
struct ColumnSpec {
    name: &'static str,
    decl: &'static str,
    legacy: Option<&'static str>,
}

const fn column(name: &'static str, decl: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        decl,
        legacy: None,
    }
}

const fn renamed(name: &'static str, decl: &'static str, legacy: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        decl,
        legacy: Some(legacy),
    }
}

const CHARACTER_COLUMNS: &[ColumnSpec] = &[
    column("house", "TEXT"),
    column("species", "TEXT"),
    column("role", "TEXT"),
    column("patronus", "TEXT"),
    column("gender", "TEXT"),
    column("age", "INTEGER"),
    renamed("alternate_names", "TEXT", "alternative_names"),
];

const COMBINED_CHARACTER_COLUMNS: &[ColumnSpec] = &[
    column("house", "TEXT"),
    column("species", "TEXT"),
    column("role", "TEXT"),
    column("patronus", "TEXT"),
    column("gender", "TEXT"),
    column("age", "INTEGER"),
    renamed("alternate_names", "TEXT", "alt_names"),
];

const CHANNEL_COLUMNS: &[ColumnSpec] = &[
    column("title", "TEXT"),
    column("subscriber_count", "INTEGER"),
    renamed("next_page_token", "TEXT", "next_index"),
];

const SOURCE_VIDEO_COLUMNS: &[ColumnSpec] = &[
    column("title", "TEXT"),
    column("duration_seconds", "INTEGER"),
    column("view_count", "INTEGER"),
    column("like_count", "INTEGER"),
    column("view_like_ratio", "REAL"),
    column("comment_count", "INTEGER"),
    column("published_at", "TEXT"),
];

const COMBINED_VIDEO_COLUMNS: &[ColumnSpec] = &[
    column("title", "TEXT"),
    column("duration_seconds", "INTEGER"),
    column("published_at", "TEXT"),
];

const MENTION_COLUMNS: &[ColumnSpec] = &[
    renamed("video_ref", "INTEGER", "video_id"),
    column("mention_count", "INTEGER NOT NULL DEFAULT 1"),
];

pub fn schema_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

fn set_schema_version(conn: &Connection, version: i64) -> rusqlite::Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version}"))
}

pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Brings `table` in line with `specs`: legacy names are renamed, anything
/// still missing is added as a nullable column.
fn reconcile_columns(conn: &Connection, table: &str, specs: &[ColumnSpec]) -> rusqlite::Result<()> {
    let existing = table_columns(conn, table)?;
    let has = |name: &str| existing.iter().any(|c| c == name);

    for spec in specs {
        if has(spec.name) {
            continue;
        }
        match spec.legacy.filter(|legacy| has(*legacy)) {
            Some(legacy) => {
                tracing::warn!("{}: renaming legacy column {} to {}", table, legacy, spec.name);
                conn.execute_batch(&format!(
                    "ALTER TABLE {table} RENAME COLUMN {legacy} TO {}",
                    spec.name
                ))?;
            }
            None => {
                tracing::warn!("{}: column {} missing, adding it empty", table, spec.name);
                conn.execute_batch(&format!(
                    "ALTER TABLE {table} ADD COLUMN {} {}",
                    spec.name, spec.decl
                ))?;
            }
        }
    }
    Ok(())
}

fn migrate(
    conn: &Connection,
    target_version: i64,
    schema: &str,
    tables: &[(&str, &[ColumnSpec])],
    indexes: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON")?;

    let current = schema_version(conn)?;
    if current > target_version {
        tracing::warn!(
            "schema version {} is newer than supported version {}",
            current,
            target_version
        );
    }

    if current < target_version {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(schema)?;
        for (table, specs) in tables {
            reconcile_columns(&tx, table, specs)?;
        }
        set_schema_version(&tx, target_version)?;
        tx.commit()?;
    }

    if let Some(indexes) = indexes {
        conn.execute_batch(indexes)?;
    }
    Ok(())
}

pub fn migrate_character_store(conn: &Connection) -> rusqlite::Result<()> {
    migrate(
        conn,
        CHARACTER_SCHEMA_VERSION,
        CHARACTER_SCHEMA,
        &[("characters", CHARACTER_COLUMNS)],
        None,
    )
}

pub fn migrate_video_store(conn: &Connection) -> rusqlite::Result<()> {
    migrate(
        conn,
        VIDEO_SCHEMA_VERSION,
        VIDEO_SCHEMA,
        &[("channels", CHANNEL_COLUMNS), ("videos", SOURCE_VIDEO_COLUMNS)],
        None,
    )
}

pub fn migrate_combined_store(conn: &Connection) -> rusqlite::Result<()> {
    migrate(
        conn,
        COMBINED_SCHEMA_VERSION,
        COMBINED_SCHEMA,
        &[
            ("channels", CHANNEL_COLUMNS),
            ("videos", COMBINED_VIDEO_COLUMNS),
            ("characters", COMBINED_CHARACTER_COLUMNS),
            ("character_mentions", MENTION_COLUMNS),
        ],
        Some(COMBINED_INDEXES),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_gets_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_combined_store(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), COMBINED_SCHEMA_VERSION);

        // second open is a no-op
        migrate_combined_store(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), COMBINED_SCHEMA_VERSION);
    }

    #[test]
    fn legacy_token_column_is_renamed() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE channels (id INTEGER PRIMARY KEY AUTOINCREMENT, channel_id TEXT UNIQUE, title TEXT, next_index TEXT);
             INSERT INTO channels (channel_id, title, next_index) VALUES ('UC1', 'Wizarding', 'CAUQAA');",
        )
        .unwrap();

        migrate_video_store(&conn).unwrap();

        let columns = table_columns(&conn, "channels").unwrap();
        assert!(columns.contains(&"next_page_token".to_string()));
        assert!(columns.contains(&"subscriber_count".to_string()));
        assert!(!columns.contains(&"next_index".to_string()));

        let token: String = conn
            .query_row("SELECT next_page_token FROM channels WHERE channel_id = 'UC1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(token, "CAUQAA");
    }

    #[test]
    fn dropped_character_column_reads_as_null() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE characters (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT UNIQUE, house TEXT, alternative_names TEXT);
             INSERT INTO characters (name, house, alternative_names) VALUES ('Luna Lovegood', 'Ravenclaw', '[]');",
        )
        .unwrap();

        migrate_character_store(&conn).unwrap();

        let (patronus, alt): (Option<String>, Option<String>) = conn
            .query_row(
                "SELECT patronus, alternate_names FROM characters WHERE name = 'Luna Lovegood'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(patronus, None);
        assert_eq!(alt.as_deref(), Some("[]"));
    }
}
