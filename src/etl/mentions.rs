use crate::config::BatchLimit;
use crate::db::CombinedStore;
use crate::error::Result;
use crate::models::{Character, LinkSummary, MentionPair, VideoTitle};

/// Lowercased video titles, computed once per scan.
pub(crate) struct TitleIndex {
    titles: Vec<(i64, String)>,
}

impl TitleIndex {
    /// Videos without a title are left out and never match.
    pub fn new(videos: &[VideoTitle]) -> Self {
        let titles = videos
            .iter()
            .filter_map(|v| v.title.as_ref().map(|t| (v.id, t.to_lowercase())))
            .collect();
        Self { titles }
    }

    /// Ids of the videos whose title contains `name`, ignoring case.
    /// An empty name matches nothing.
    pub fn videos_naming(&self, name: &str) -> Vec<i64> {
        let needle = name.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.titles
            .iter()
            .filter(|(_, title)| title.contains(&needle))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Every (character, video) pair where the title contains the name,
/// case-insensitively, in character then video order.
pub fn find_mentions(characters: &[Character], videos: &[VideoTitle]) -> Vec<MentionPair> {
    let index = TitleIndex::new(videos);
    characters
        .iter()
        .flat_map(|character| {
            index
                .videos_naming(&character.name)
                .into_iter()
                .map(move |video_ref| MentionPair::new(character.id, video_ref))
        })
        .collect()
}

/// Records up to `limit` new character mentions found in video titles.
/// Pairs that are already linked are never touched again.
pub async fn link_mentions(store: &CombinedStore, limit: BatchLimit) -> Result<LinkSummary> {
    let characters = store.characters().await?;
    let videos = store.videos().await?;
    let existing = store.mention_pairs().await?;

    let pending: Vec<MentionPair> = find_mentions(&characters, &videos)
        .into_iter()
        .filter(|pair| !existing.contains(pair))
        .take(limit.get())
        .collect();

    let added = store.insert_mentions(pending).await?;
    tracing::info!(
        "Linked {} new mentions across {} characters and {} videos",
        added,
        characters.len(),
        videos.len()
    );
    Ok(LinkSummary { added })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelInfo, SourceVideo, VideoRecord, VideoStats};

    fn character(id: i64, name: &str) -> Character {
        Character {
            id,
            name: name.into(),
            house: None,
            species: None,
            role: None,
            patronus: None,
            gender: None,
            age: None,
            alternate_names: None,
        }
    }

    fn video(id: i64, title: Option<&str>) -> VideoTitle {
        VideoTitle {
            id,
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn matches_are_case_insensitive_substrings() {
        let characters = vec![character(1, "Harry Potter"), character(2, "Dobby"), character(3, "")];
        let videos = vec![
            video(10, Some("HARRY POTTER and the Chamber Test")),
            video(11, Some("dobby is free")),
            video(12, None),
            video(13, Some("Harry Pott")),
        ];

        let pairs = find_mentions(&characters, &videos);
        assert_eq!(pairs, vec![MentionPair::new(1, 10), MentionPair::new(2, 11)]);
    }

    async fn seeded_store(titles: &[&str], names: &[&str]) -> CombinedStore {
        let store = CombinedStore::open_in_memory().await.unwrap();
        for (i, title) in titles.iter().enumerate() {
            store
                .import_video(SourceVideo {
                    video: VideoRecord {
                        video_id: format!("v{i}"),
                        title: Some(title.to_string()),
                        duration_seconds: 0,
                        published_at: None,
                        stats: VideoStats::new(10, 1, 0),
                    },
                    channel: ChannelInfo {
                        channel_id: "UC1".into(),
                        title: None,
                        subscriber_count: None,
                    },
                })
                .await
                .unwrap();
        }
        for name in names {
            let mut c = character(0, name).into_new();
            c.house = Some("Gryffindor".into());
            store.insert_character(c).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn linking_twice_adds_nothing_new() {
        let store = seeded_store(&["Harry Potter and the Chamber Test"], &["Harry Potter"]).await;

        let first = link_mentions(&store, BatchLimit::clamped(25)).await.unwrap();
        assert_eq!(first.added, 1);
        let second = link_mentions(&store, BatchLimit::clamped(25)).await.unwrap();
        assert_eq!(second.added, 0);

        let counts = store.table_counts().await.unwrap();
        assert_eq!(counts.character_mentions, 1);
    }

    #[tokio::test]
    async fn limit_caps_new_links_per_run() {
        let titles = ["Ron and Harry", "Ron's wand", "Hermione helps Ron"];
        let store = seeded_store(&titles, &["Ron", "Hermione"]).await;

        let first = link_mentions(&store, BatchLimit::clamped(2)).await.unwrap();
        assert_eq!(first.added, 2);
        let second = link_mentions(&store, BatchLimit::clamped(2)).await.unwrap();
        assert_eq!(second.added, 2);
        let third = link_mentions(&store, BatchLimit::clamped(2)).await.unwrap();
        assert_eq!(third.added, 0);

        assert_eq!(store.mention_pairs().await.unwrap().len(), 4);
    }
}
