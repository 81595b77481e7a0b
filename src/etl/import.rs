use crate::config::BatchLimit;
use crate::db::{CharacterStore, CombinedStore, ImportOutcome, VideoStore};
use crate::error::Result;
use crate::models::ImportSummary;

/// Copies up to `limit` videos the combined store does not have yet, creating
/// or refreshing their channels and writing their stats.
pub async fn import_videos(
    source: &VideoStore,
    target: &CombinedStore,
    limit: BatchLimit,
) -> Result<ImportSummary> {
    let known = target.video_ids().await?;
    let candidates = source.videos_not_in(known, limit.get()).await?;

    let mut summary = ImportSummary::default();
    for candidate in candidates {
        let video_id = candidate.video.video_id.clone();
        match target.import_video(candidate).await? {
            ImportOutcome::Inserted => summary.inserted += 1,
            ImportOutcome::Duplicate => {
                tracing::debug!("Video {} already imported, skipping", video_id);
                summary.skipped += 1;
            }
        }
    }

    tracing::info!(
        "Imported {} videos ({} skipped)",
        summary.inserted,
        summary.skipped
    );
    Ok(summary)
}

/// Copies characters whose name is not in the combined store yet, stopping
/// after `limit` insertions.
pub async fn import_characters(
    source: &CharacterStore,
    target: &CombinedStore,
    limit: BatchLimit,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for character in source.all_characters().await? {
        if summary.inserted >= limit.get() {
            break;
        }
        if target.contains_character(&character.name).await? {
            summary.skipped += 1;
            continue;
        }
        if target.insert_character(character.into_new()).await? {
            summary.inserted += 1;
        } else {
            summary.skipped += 1;
        }
    }

    tracing::info!(
        "Imported {} characters ({} skipped)",
        summary.inserted,
        summary.skipped
    );
    Ok(summary)
}
