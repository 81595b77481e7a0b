mod gather;
mod import;
mod mentions;

pub use gather::{gather_characters, gather_videos};
pub use import::{import_characters, import_videos};
pub(crate) use mentions::TitleIndex;
pub use mentions::link_mentions;

use crate::config::BatchLimit;
use crate::db::{CharacterStore, CombinedStore, VideoStore};
use crate::error::Result;
use crate::models::{ImportSummary, LinkSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub videos: ImportSummary,
    pub characters: Option<ImportSummary>,
    pub mentions: LinkSummary,
}

/// One merge pass: videos, then characters when a character store is given,
/// then mention linking over whatever the combined store now holds.
pub async fn merge(
    videos: &VideoStore,
    characters: Option<&CharacterStore>,
    target: &CombinedStore,
    limit: BatchLimit,
) -> Result<MergeSummary> {
    let videos = import_videos(videos, target, limit).await?;
    let characters = match characters {
        Some(source) => Some(import_characters(source, target, limit).await?),
        None => None,
    };
    let mentions = link_mentions(target, limit).await?;

    Ok(MergeSummary {
        videos,
        characters,
        mentions,
    })
}
