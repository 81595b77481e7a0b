use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub title: Option<String>,
    pub subscriber_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub channel_id: String,
    pub title: Option<String>,
    pub subscriber_count: Option<i64>,
    pub next_page_token: Option<String>,
}

/// One page of video ids from a channel listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoStats {
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub view_like_ratio: Option<f64>,
}

impl VideoStats {
    pub fn new(view_count: i64, like_count: i64, comment_count: i64) -> Self {
        Self {
            view_count,
            like_count,
            comment_count,
            view_like_ratio: view_like_ratio(view_count, like_count),
        }
    }
}

/// Absent when there are no likes, never zero or infinity.
pub fn view_like_ratio(view_count: i64, like_count: i64) -> Option<f64> {
    if like_count > 0 {
        Some(view_count as f64 / like_count as f64)
    } else {
        None
    }
}

/// Video metadata resolved from the video API.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: Option<String>,
    pub duration_seconds: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub stats: VideoStats,
}

/// A video read from the video source store, carrying its owning channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceVideo {
    pub video: VideoRecord,
    pub channel: ChannelInfo,
}

/// A video in the combined store, as seen by the mention linker.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTitle {
    pub id: i64,
    pub title: Option<String>,
}
