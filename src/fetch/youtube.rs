use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{ChannelInfo, VideoPage, VideoRecord, VideoStats};

use super::{parse_iso_duration, VideoSource};

const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<SearchItemId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

// The API returns counts as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
    subscriber_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

fn count(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}

impl VideoItem {
    fn into_record(self) -> VideoRecord {
        let stats = VideoStats::new(
            count(self.statistics.view_count.as_deref()).unwrap_or(0),
            count(self.statistics.like_count.as_deref()).unwrap_or(0),
            count(self.statistics.comment_count.as_deref()).unwrap_or(0),
        );
        VideoRecord {
            video_id: self.id,
            title: self.snippet.title,
            duration_seconds: self
                .content_details
                .duration
                .as_deref()
                .map(parse_iso_duration)
                .unwrap_or(0),
            published_at: self
                .snippet
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            stats,
        }
    }
}

fn search_page_from(response: SearchResponse) -> VideoPage {
    VideoPage {
        video_ids: response
            .items
            .into_iter()
            .filter_map(|item| item.id.and_then(|id| id.video_id))
            .collect(),
        next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
    }
}

fn videos_from(response: VideosResponse) -> Vec<VideoRecord> {
    response.items.into_iter().map(VideoItem::into_record).collect()
}

fn channel_from(channel_id: &str, response: ChannelsResponse) -> ChannelInfo {
    let item = response.items.into_iter().next();
    ChannelInfo {
        channel_id: channel_id.to_string(),
        title: item.as_ref().and_then(|i| i.snippet.title.clone()),
        subscriber_count: item.and_then(|i| count(i.statistics.subscriber_count.as_deref())),
    }
}

pub struct YoutubeClient {
    client: Client,
    api_key: String,
}

impl YoutubeClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, api_key })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(format!("{}/{}", YOUTUBE_API_URL, endpoint))
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VideoApi(format!("{} returned HTTP {}: {}", endpoint, status, body)));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl VideoSource for YoutubeClient {
    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
        let response = self
            .get("channels", &[("id", channel_id), ("part", "snippet,statistics")])
            .await?;
        Ok(channel_from(channel_id, response))
    }

    async fn search_page(
        &self,
        channel_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<VideoPage> {
        let page_size = page_size.to_string();
        let mut query = vec![
            ("channelId", channel_id),
            ("part", "id"),
            ("order", "date"),
            ("type", "video"),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        Ok(search_page_from(self.get("search", &query).await?))
    }

    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoRecord>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = video_ids.join(",");
        let response = self
            .get(
                "videos",
                &[("id", ids.as_str()), ("part", "snippet,contentDetails,statistics")],
            )
            .await?;
        Ok(videos_from(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<T: DeserializeOwned>(body: &str) -> T {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn search_page_collects_ids_and_token() {
        let body = r#"{
            "nextPageToken": "CAUQAA",
            "items": [
                {"id": {"kind": "youtube#video", "videoId": "abc"}},
                {"id": {"kind": "youtube#channel", "channelId": "UC1"}},
                {"id": {"kind": "youtube#video", "videoId": "def"}}
            ]
        }"#;
        let page = search_page_from(decode(body));
        assert_eq!(page.video_ids, vec!["abc", "def"]);
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));

        let last = search_page_from(decode(r#"{"items": []}"#));
        assert!(last.video_ids.is_empty());
        assert_eq!(last.next_page_token, None);
    }

    #[test]
    fn videos_default_missing_fields() {
        let body = r#"{"items": [
            {"id": "abc",
             "snippet": {"title": "Harry Potter Trailer", "publishedAt": "2024-05-01T12:00:00Z"},
             "contentDetails": {"duration": "PT2M30S"},
             "statistics": {"viewCount": "1000", "likeCount": "50", "commentCount": "7"}},
            {"id": "def",
             "snippet": {"title": "No stats"},
             "contentDetails": {"duration": "bogus"},
             "statistics": {"viewCount": "12"}}
        ]}"#;
        let videos = videos_from(decode(body));

        assert_eq!(videos[0].duration_seconds, 150);
        assert_eq!(videos[0].stats.view_like_ratio, Some(20.0));
        assert!(videos[0].published_at.is_some());

        assert_eq!(videos[1].duration_seconds, 0);
        assert_eq!(videos[1].stats.like_count, 0);
        assert_eq!(videos[1].stats.view_like_ratio, None);
        assert_eq!(videos[1].published_at, None);
    }

    #[test]
    fn hidden_subscriber_count_is_absent() {
        let body = r#"{"items": [{"snippet": {"title": "Wizarding World"}, "statistics": {"hiddenSubscriberCount": true}}]}"#;
        let channel = channel_from("UC1", decode(body));
        assert_eq!(channel.title.as_deref(), Some("Wizarding World"));
        assert_eq!(channel.subscriber_count, None);

        let missing = channel_from("UC2", decode(r#"{"items": []}"#));
        assert_eq!(missing.channel_id, "UC2");
        assert_eq!(missing.title, None);
    }
}
