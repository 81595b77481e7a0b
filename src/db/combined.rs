use std::collections::HashSet;

use rusqlite::params;
use tokio_rusqlite::Connection;

use crate::error::{is_unique_violation, Result};
use crate::models::{
    Character, CharacterPopularity, MentionPair, NewCharacter, SourceVideo, TableCounts,
    VideoTitle,
};

use super::character_store::{contains_character, insert_character_row, select_characters};
use super::open_store;
use super::schema::migrate_combined_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Inserted,
    Duplicate,
}

/// The merged store holding channels, videos, stats, characters and mentions.
pub struct CombinedStore {
    conn: Connection,
}

impl CombinedStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = open_store(Some(db_path), migrate_combined_store).await?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = open_store(None, migrate_combined_store).await?;
        Ok(Self { conn })
    }

    // Video operations

    pub async fn video_ids(&self) -> Result<HashSet<String>> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT video_id FROM videos")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<HashSet<_>>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    /// Upserts the owning channel, then inserts the video and its stats in one
    /// transaction. An existing video id rolls everything back.
    pub async fn import_video(&self, source: SourceVideo) -> Result<ImportOutcome> {
        let outcome = self
            .conn
            .call(move |conn| {
                let SourceVideo { video, channel } = source;
                let tx = conn.transaction()?;

                tx.execute(
                    r#"INSERT INTO channels (channel_id, title, subscriber_count)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(channel_id) DO UPDATE SET
                           title = excluded.title,
                           subscriber_count = excluded.subscriber_count"#,
                    params![channel.channel_id, channel.title, channel.subscriber_count],
                )?;
                let channel_ref: i64 = tx.query_row(
                    "SELECT id FROM channels WHERE channel_id = ?1",
                    params![channel.channel_id],
                    |row| row.get(0),
                )?;

                let inserted = tx.execute(
                    r#"INSERT INTO videos (video_id, channel_ref, title, duration_seconds, published_at)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    params![
                        video.video_id,
                        channel_ref,
                        video.title,
                        video.duration_seconds,
                        video.published_at.map(|dt| dt.to_rfc3339()),
                    ],
                );
                match inserted {
                    Ok(_) => {}
                    Err(e) if is_unique_violation(&e) => return Ok(ImportOutcome::Duplicate),
                    Err(e) => return Err(e.into()),
                }
                let video_ref = tx.last_insert_rowid();

                let stats = video.stats;
                if let Err(e) = tx.execute(
                    r#"INSERT OR REPLACE INTO video_stats (video_ref, view_count, like_count, comment_count, view_like_ratio)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    params![
                        video_ref,
                        stats.view_count,
                        stats.like_count,
                        stats.comment_count,
                        stats.view_like_ratio,
                    ],
                ) {
                    tracing::warn!("Stats insert failed for video {}, rolling back: {}", video.video_id, e);
                    return Err(e.into());
                }

                tx.commit()?;
                Ok(ImportOutcome::Inserted)
            })
            .await?;
        Ok(outcome)
    }

    #[cfg(test)]
    pub async fn video_stats(&self, video_id: &str) -> Result<Option<crate::models::VideoStats>> {
        let video_id = video_id.to_string();
        let stats = self
            .conn
            .call(move |conn| {
                use rusqlite::OptionalExtension;
                let stats = conn
                    .query_row(
                        r#"SELECT s.view_count, s.like_count, s.comment_count, s.view_like_ratio
                           FROM video_stats s
                           JOIN videos v ON v.id = s.video_ref
                           WHERE v.video_id = ?1"#,
                        params![video_id],
                        |row| {
                            Ok(crate::models::VideoStats {
                                view_count: row.get(0)?,
                                like_count: row.get(1)?,
                                comment_count: row.get(2)?,
                                view_like_ratio: row.get(3)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(stats)
            })
            .await?;
        Ok(stats)
    }

    pub async fn videos(&self) -> Result<Vec<VideoTitle>> {
        let videos = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, title FROM videos ORDER BY id")?;
                let videos = stmt
                    .query_map([], |row| {
                        Ok(VideoTitle {
                            id: row.get(0)?,
                            title: row.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(videos)
            })
            .await?;
        Ok(videos)
    }

    // Character operations

    pub async fn contains_character(&self, name: &str) -> Result<bool> {
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

    pub async fn characters(&self) -> Result<Vec<Character>> {
        let characters = self.conn.call(|conn| Ok(select_characters(conn)?)).await?;
        Ok(characters)
    }

    // Mention operations

    pub async fn mention_pairs(&self) -> Result<HashSet<MentionPair>> {
        let pairs = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT character_ref, video_ref FROM character_mentions")?;
                let pairs = stmt
                    .query_map([], |row| Ok(MentionPair::new(row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<HashSet<_>>>()?;
                Ok(pairs)
            })
            .await?;
        Ok(pairs)
    }

    /// Inserts each pair with a mention count of 1; existing pairs are left
    /// alone. Returns how many rows were added.
    pub async fn insert_mentions(&self, pairs: Vec<MentionPair>) -> Result<usize> {
        let added = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut added = 0;
                {
                    let mut stmt = tx.prepare(
                        r#"INSERT INTO character_mentions (character_ref, video_ref, mention_count)
                           VALUES (?1, ?2, 1)
                           ON CONFLICT(character_ref, video_ref) DO NOTHING"#,
                    )?;
                    for pair in &pairs {
                        added += stmt.execute(params![pair.character_ref, pair.video_ref])?;
                    }
                }
                tx.commit()?;
                Ok(added)
            })
            .await?;
        Ok(added)
    }

    // Aggregation

    /// Every character with its distinct mention count and the summed views of
    /// the mentioning videos, most mentioned first.
    pub async fn character_popularity(&self) -> Result<Vec<CharacterPopularity>> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT c.name,
                              COUNT(DISTINCT m.id) AS mention_count,
                              COALESCE(SUM(s.view_count), 0) AS total_views
                       FROM characters c
                       LEFT JOIN character_mentions m ON m.character_ref = c.id
                       LEFT JOIN videos v ON v.id = m.video_ref
                       LEFT JOIN video_stats s ON s.video_ref = v.id
                       GROUP BY c.id
                       ORDER BY mention_count DESC, c.name ASC"#,
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(CharacterPopularity {
                            name: row.get(0)?,
                            mention_count: row.get(1)?,
                            total_views: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    pub async fn table_counts(&self) -> Result<TableCounts> {
        let counts = self
            .conn
            .call(|conn| {
                let count = |table: &str| -> rusqlite::Result<i64> {
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                };
                Ok(TableCounts {
                    channels: count("channels")?,
                    videos: count("videos")?,
                    video_stats: count("video_stats")?,
                    characters: count("characters")?,
                    character_mentions: count("character_mentions")?,
                })
            })
            .await?;
        Ok(counts)
    }
}
