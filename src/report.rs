use crate::db::CombinedStore;
use crate::error::Result;
use crate::etl::TitleIndex;
use crate::models::{Character, CharacterPopularity, TableCounts, TitleAppearance, VideoTitle};

/// Every character with mention count and summed views, most mentioned first.
/// Characters without mentions are included with zeros.
pub async fn character_popularity(store: &CombinedStore) -> Result<Vec<CharacterPopularity>> {
    store.character_popularity().await
}

/// For every character, the number of video titles containing its name,
/// recomputed from the titles rather than from stored mentions.
pub async fn title_appearance_counts(store: &CombinedStore) -> Result<Vec<TitleAppearance>> {
    let characters = store.characters().await?;
    let videos = store.videos().await?;
    Ok(appearance_counts(&characters, &videos))
}

pub fn appearance_counts(characters: &[Character], videos: &[VideoTitle]) -> Vec<TitleAppearance> {
    let index = TitleIndex::new(videos);
    let mut counts: Vec<TitleAppearance> = characters
        .iter()
        .map(|c| TitleAppearance {
            name: c.name.clone(),
            count: index.videos_naming(&c.name).len() as i64,
        })
        .collect();

    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(|n| n.chars().count()).max().unwrap_or(0).max(9)
}

pub fn render_popularity(rows: &[CharacterPopularity]) -> String {
    let width = name_width(rows.iter().map(|r| r.name.as_str()));
    let header = format!("{:<width$}  {:>8}  {:>14}\n", "Character", "Mentions", "Total views");
    std::iter::once(header)
        .chain(rows.iter().map(|row| {
            format!(
                "{:<width$}  {:>8}  {:>14}\n",
                row.name, row.mention_count, row.total_views
            )
        }))
        .collect()
}

pub fn render_appearances(rows: &[TitleAppearance]) -> String {
    let width = name_width(rows.iter().map(|r| r.name.as_str()));
    let header = format!("{:<width$}  {:>6}\n", "Character", "Titles");
    std::iter::once(header)
        .chain(rows.iter().map(|row| format!("{:<width$}  {:>6}\n", row.name, row.count)))
        .collect()
}

pub fn render_counts(counts: &TableCounts) -> String {
    [
        ("channels", counts.channels),
        ("videos", counts.videos),
        ("video_stats", counts.video_stats),
        ("characters", counts.characters),
        ("character_mentions", counts.character_mentions),
    ]
    .iter()
    .map(|(table, count)| format!("{table:<20}{count:>8}\n"))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchLimit;
    use crate::etl::link_mentions;
    use crate::models::{ChannelInfo, NewCharacter, SourceVideo, VideoRecord, VideoStats};

    fn named(name: &str) -> NewCharacter {
        NewCharacter {
            name: name.into(),
            house: None,
            species: None,
            role: Some("none".into()),
            patronus: None,
            gender: None,
            age: None,
            alternate_names: None,
        }
    }

    async fn store_with(videos: &[(&str, &str, i64)], names: &[&str]) -> CombinedStore {
        let store = CombinedStore::open_in_memory().await.unwrap();
        for (id, title, views) in videos {
            store
                .import_video(SourceVideo {
                    video: VideoRecord {
                        video_id: id.to_string(),
                        title: Some(title.to_string()),
                        duration_seconds: 60,
                        published_at: None,
                        stats: VideoStats::new(*views, 1, 0),
                    },
                    channel: ChannelInfo {
                        channel_id: "UC1".into(),
                        title: Some("Wizarding World".into()),
                        subscriber_count: Some(10),
                    },
                })
                .await
                .unwrap();
        }
        for name in names {
            store.insert_character(named(name)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn popularity_includes_unmentioned_characters() {
        let store = store_with(
            &[
                ("v1", "Harry Potter meets Dobby", 100),
                ("v2", "Harry Potter returns", 40),
            ],
            &["Harry Potter", "Dobby", "Nearly Headless Nick"],
        )
        .await;
        link_mentions(&store, BatchLimit::default()).await.unwrap();

        let rows = character_popularity(&store).await.unwrap();
        assert_eq!(
            rows,
            vec![
                CharacterPopularity { name: "Harry Potter".into(), mention_count: 2, total_views: 140 },
                CharacterPopularity { name: "Dobby".into(), mention_count: 1, total_views: 100 },
                CharacterPopularity { name: "Nearly Headless Nick".into(), mention_count: 0, total_views: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn appearances_ignore_mention_table() {
        let store = store_with(
            &[("v1", "DOBBY and harry potter", 1), ("v2", "dobby again", 1)],
            &["Harry Potter", "Dobby", "Hedwig"],
        )
        .await;

        // no link_mentions run: counts come straight from the titles
        let rows = title_appearance_counts(&store).await.unwrap();
        let pairs: Vec<(&str, i64)> = rows.iter().map(|r| (r.name.as_str(), r.count)).collect();
        assert_eq!(pairs, vec![("Dobby", 2), ("Harry Potter", 1), ("Hedwig", 0)]);
    }

    #[test]
    fn table_lists_every_row() {
        let rows = vec![
            CharacterPopularity { name: "Harry Potter".into(), mention_count: 2, total_views: 140 },
            CharacterPopularity { name: "Dobby".into(), mention_count: 0, total_views: 0 },
        ];
        let table = render_popularity(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Character"));
        assert!(lines[1].starts_with("Harry Potter"));
        assert!(lines[1].trim_end().ends_with("140"));
    }

    #[test]
    fn appearance_table_aligns_counts() {
        let rows = vec![
            TitleAppearance { name: "Dobby".into(), count: 2 },
            TitleAppearance { name: "Hedwig".into(), count: 0 },
        ];
        let table = render_appearances(&rows);
        assert_eq!(table, "Character  Titles\nDobby           2\nHedwig          0\n");
    }
}
