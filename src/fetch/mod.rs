mod characters;
mod duration;
mod youtube;

pub use characters::HpApiClient;
pub use duration::parse_iso_duration;
pub use youtube::YoutubeClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChannelInfo, CharacterRecord, VideoPage, VideoRecord};

/// Returns the full character catalog on every call.
#[async_trait]
pub trait CharacterSource {
    async fn fetch_characters(&self) -> Result<Vec<CharacterRecord>>;
}

/// Paged access to a channel's videos.
#[async_trait]
pub trait VideoSource {
    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo>;

    /// One page of at most `page_size` video ids, newest first, resuming at
    /// `page_token`. An absent next token means the listing is exhausted.
    async fn search_page(
        &self,
        channel_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<VideoPage>;

    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoRecord>>;
}
