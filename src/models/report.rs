use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterPopularity {
    pub name: String,
    pub mention_count: i64,
    pub total_views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleAppearance {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub channels: i64,
    pub videos: i64,
    pub video_stats: i64,
    pub characters: i64,
    pub character_mentions: i64,
}

/// Outcome of a per-source fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherSummary {
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub next_page_token: Option<String>,
}

/// Outcome of an import run into the combined store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub added: usize,
}
