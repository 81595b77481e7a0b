mod character_store;
mod combined;
pub mod schema;
mod video_store;

pub use character_store::CharacterStore;
pub use combined::{CombinedStore, ImportOutcome};
pub use video_store::VideoStore;

use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;

use crate::error::Result;

type Migration = fn(&rusqlite::Connection) -> rusqlite::Result<()>;

async fn open_store(db_path: Option<&str>, migrate: Migration) -> Result<Connection> {
    let conn = match db_path {
        Some(path) => Connection::open(path).await?,
        None => Connection::open_in_memory().await?,
    };

    conn.call(move |conn| {
        migrate(conn)?;
        Ok(())
    })
    .await?;

    Ok(conn)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339, as written by this crate and returned by the video API
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}
