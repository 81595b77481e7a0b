use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{is_unique_violation, Result};
use crate::models::{Channel, ChannelInfo, SourceVideo, VideoRecord, VideoStats};

use super::schema::migrate_video_store;
use super::{open_store, parse_datetime};

/// Local store of channels and videos fetched from the video API.
pub struct VideoStore {
    conn: Connection,
}

impl VideoStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = open_store(Some(db_path), migrate_video_store).await?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = open_store(None, migrate_video_store).await?;
        Ok(Self { conn })
    }

    // Channel operations

    pub async fn channel(&self, channel_id: &str) -> Result<Option<Channel>> {
        let channel_id = channel_id.to_string();
        let channel = self
            .conn
            .call(move |conn| {
                let channel = conn
                    .query_row(
                        "SELECT id, channel_id, title, subscriber_count, next_page_token FROM channels WHERE channel_id = ?1",
                        params![channel_id],
                        channel_from_row,
                    )
                    .optional()?;
                Ok(channel)
            })
            .await?;
        Ok(channel)
    }

    /// Saved continuation token for the channel, if a previous run left one.
    pub async fn channel_token(&self, channel_id: &str) -> Result<Option<String>> {
        let token = self
            .channel(channel_id)
            .await?
            .and_then(|c| c.next_page_token)
            .filter(|t| !t.is_empty());
        Ok(token)
    }

    pub async fn upsert_channel(&self, info: ChannelInfo, next_page_token: Option<String>) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO channels (channel_id, title, subscriber_count, next_page_token)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(channel_id) DO UPDATE SET
                           title = excluded.title,
                           subscriber_count = excluded.subscriber_count,
                           next_page_token = excluded.next_page_token"#,
                    params![info.channel_id, info.title, info.subscriber_count, next_page_token],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM channels WHERE channel_id = ?1",
                    params![info.channel_id],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn save_channel_token(&self, channel_id: &str, token: Option<String>) -> Result<()> {
        let channel_id = channel_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE channels SET next_page_token = ?1 WHERE channel_id = ?2",
                    params![token, channel_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Video operations

    /// Returns false when the video id is already stored.
    pub async fn insert_video(&self, channel_ref: i64, video: VideoRecord) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    r#"INSERT INTO videos (video_id, channel_ref, title, duration_seconds, view_count,
                                           like_count, view_like_ratio, comment_count, published_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
                    params![
                        video.video_id,
                        channel_ref,
                        video.title,
                        video.duration_seconds,
                        video.stats.view_count,
                        video.stats.like_count,
                        video.stats.view_like_ratio,
                        video.stats.comment_count,
                        video.published_at.map(|dt| dt.to_rfc3339()),
                    ],
                );
                match result {
                    Ok(_) => Ok(true),
                    Err(e) if is_unique_violation(&e) => Ok(false),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        Ok(inserted)
    }

    /// Up to `limit` videos, oldest first, whose id is not in `known`.
    pub async fn videos_not_in(&self, known: HashSet<String>, limit: usize) -> Result<Vec<SourceVideo>> {
        let videos = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT v.video_id, v.title, v.duration_seconds, v.published_at,
                              v.view_count, v.like_count, v.comment_count,
                              c.channel_id, c.title, c.subscriber_count
                       FROM videos v
                       JOIN channels c ON v.channel_ref = c.id
                       WHERE v.video_id IS NOT NULL AND c.channel_id IS NOT NULL
                       ORDER BY v.id"#,
                )?;
                let mut rows = stmt.query([])?;
                let mut videos = Vec::new();
                while videos.len() < limit {
                    let Some(row) = rows.next()? else { break };
                    let video = source_video_from_row(row)?;
                    if !known.contains(&video.video.video_id) {
                        videos.push(video);
                    }
                }
                Ok(videos)
            })
            .await?;
        Ok(videos)
    }

    pub async fn video_count(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?))
            .await?;
        Ok(count)
    }
}

fn channel_from_row(row: &Row) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        title: row.get(2)?,
        subscriber_count: row.get(3)?,
        next_page_token: row.get(4)?,
    })
}

fn published_from_text(video_id: String, text: Option<String>) -> Option<DateTime<Utc>> {
    let text = text.filter(|s| !s.trim().is_empty())?;
    let parsed = parse_datetime(&text);
    if parsed.is_none() {
        tracing::debug!("video {}: dropping unreadable published_at {:?}", video_id, text);
    }
    parsed
}

fn source_video_from_row(row: &Row) -> rusqlite::Result<SourceVideo> {
    let stats = VideoStats::new(
        row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        row.get::<_, Option<i64>>(6)?.unwrap_or(0),
    );
    Ok(SourceVideo {
        video: VideoRecord {
            video_id: row.get(0)?,
            title: row.get(1)?,
            duration_seconds: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            published_at: published_from_text(row.get(0)?, row.get(3)?),
            stats,
        },
        channel: ChannelInfo {
            channel_id: row.get(7)?,
            title: row.get(8)?,
            subscriber_count: row.get(9)?,
        },
    })
}
