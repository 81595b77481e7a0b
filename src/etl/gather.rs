use crate::config::BatchLimit;
use crate::db::{CharacterStore, VideoStore};
use crate::error::Result;
use crate::fetch::{CharacterSource, VideoSource};
use crate::models::{GatherSummary, NewCharacter};

/// Fetches the whole character catalog and stores at most `limit` characters
/// that are not stored yet. Run again to continue.
pub async fn gather_characters<S>(
    source: &S,
    store: &CharacterStore,
    limit: BatchLimit,
) -> Result<GatherSummary>
where
    S: CharacterSource + ?Sized,
{
    let records = source.fetch_characters().await?;
    let mut summary = GatherSummary {
        fetched: records.len(),
        ..Default::default()
    };

    for record in records {
        if summary.inserted >= limit.get() {
            break;
        }
        if store.contains_name(&record.name).await? {
            summary.skipped += 1;
            continue;
        }
        let name = record.name.clone();
        if store.insert_character(NewCharacter::from_record(record)?).await? {
            tracing::debug!("Stored character {}", name);
            summary.inserted += 1;
        } else {
            summary.skipped += 1;
        }
    }

    tracing::info!(
        "Characters: fetched {}, inserted {}, skipped {}",
        summary.fetched,
        summary.inserted,
        summary.skipped
    );
    Ok(summary)
}

/// Fetches one page of `limit` videos for the channel, resuming from the
/// continuation token saved by the previous run, and saves the next token.
pub async fn gather_videos<S>(
    source: &S,
    store: &VideoStore,
    channel_id: &str,
    limit: BatchLimit,
) -> Result<GatherSummary>
where
    S: VideoSource + ?Sized,
{
    let info = source.channel_info(channel_id).await?;
    let page_token = store.channel_token(channel_id).await?;
    let channel_ref = store.upsert_channel(info, page_token.clone()).await?;

    let page = source
        .search_page(channel_id, limit.get(), page_token.as_deref())
        .await?;

    if page.video_ids.is_empty() {
        tracing::info!("No video ids returned for {}, clearing progress token", channel_id);
        store.save_channel_token(channel_id, None).await?;
        return Ok(GatherSummary::default());
    }

    let mut summary = GatherSummary {
        fetched: page.video_ids.len(),
        ..Default::default()
    };

    for video in source.video_details(&page.video_ids).await? {
        let video_id = video.video_id.clone();
        if store.insert_video(channel_ref, video).await? {
            summary.inserted += 1;
        } else {
            tracing::debug!("Video {} already stored", video_id);
            summary.skipped += 1;
        }
    }

    store
        .save_channel_token(channel_id, page.next_page_token.clone())
        .await?;
    summary.next_page_token = page.next_page_token;

    tracing::info!(
        "Channel {}: {} ids, inserted {}, skipped {}",
        channel_id,
        summary.fetched,
        summary.inserted,
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::models::{ChannelInfo, CharacterRecord, VideoPage, VideoRecord, VideoStats};

    struct FixedCharacters(Vec<CharacterRecord>);

    #[async_trait]
    impl CharacterSource for FixedCharacters {
        async fn fetch_characters(&self) -> Result<Vec<CharacterRecord>> {
            Ok(self.0.clone())
        }
    }

    /// Serves `ids` in pages, using the index of the next id as the token.
    struct PagedChannel {
        ids: Vec<String>,
        tokens_seen: Mutex<Vec<Option<String>>>,
    }

    impl PagedChannel {
        fn new(count: usize) -> Self {
            Self {
                ids: (0..count).map(|i| format!("vid{i}")).collect(),
                tokens_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VideoSource for PagedChannel {
        async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
            Ok(ChannelInfo {
                channel_id: channel_id.to_string(),
                title: Some("Wizarding World".into()),
                subscriber_count: Some(42),
            })
        }

        async fn search_page(
            &self,
            _channel_id: &str,
            page_size: usize,
            page_token: Option<&str>,
        ) -> Result<VideoPage> {
            self.tokens_seen
                .lock()
                .unwrap()
                .push(page_token.map(str::to_string));
            let start: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let end = (start + page_size).min(self.ids.len());
            Ok(VideoPage {
                video_ids: self.ids[start.min(end)..end].to_vec(),
                next_page_token: (end < self.ids.len()).then(|| end.to_string()),
            })
        }

        async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoRecord>> {
            Ok(video_ids
                .iter()
                .map(|id| VideoRecord {
                    video_id: id.clone(),
                    title: Some(format!("Harry Potter clip {id}")),
                    duration_seconds: 30,
                    published_at: None,
                    stats: VideoStats::new(100, 4, 0),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn characters_are_stored_in_batches() {
        let names: Vec<CharacterRecord> = (0..30)
            .map(|i| CharacterRecord::named(&format!("Wizard {i}")))
            .collect();
        let source = FixedCharacters(names);
        let store = CharacterStore::open_in_memory().await.unwrap();

        let first = gather_characters(&source, &store, BatchLimit::clamped(25)).await.unwrap();
        assert_eq!(first.fetched, 30);
        assert_eq!(first.inserted, 25);

        let second = gather_characters(&source, &store, BatchLimit::clamped(25)).await.unwrap();
        assert_eq!(second.inserted, 5);
        assert_eq!(second.skipped, 25);

        let third = gather_characters(&source, &store, BatchLimit::clamped(25)).await.unwrap();
        assert_eq!(third.inserted, 0);

        let names: HashSet<String> = store
            .all_characters()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names.len(), 30);
    }

    #[tokio::test]
    async fn video_pagination_resumes_from_saved_token() {
        let source = PagedChannel::new(5);
        let store = VideoStore::open_in_memory().await.unwrap();
        let limit = BatchLimit::clamped(2);

        let first = gather_videos(&source, &store, "UC1", limit).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let second = gather_videos(&source, &store, "UC1", limit).await.unwrap();
        assert_eq!(second.inserted, 2);

        let third = gather_videos(&source, &store, "UC1", limit).await.unwrap();
        assert_eq!(third.inserted, 1);
        assert_eq!(third.next_page_token, None);
        assert_eq!(store.video_count().await.unwrap(), 5);

        // exhausted listing restarts from the newest page, which is all duplicates
        let fourth = gather_videos(&source, &store, "UC1", limit).await.unwrap();
        assert_eq!(fourth.inserted, 0);
        assert_eq!(fourth.skipped, 2);

        let seen = source.tokens_seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![None, Some("2".to_string()), Some("4".to_string()), None]
        );

        let channel = store.channel("UC1").await.unwrap().unwrap();
        assert_eq!(channel.subscriber_count, Some(42));
    }
}
