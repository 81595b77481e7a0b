/// A (character, video) pair whose title contains the character's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MentionPair {
    pub character_ref: i64,
    pub video_ref: i64,
}

impl MentionPair {
    pub fn new(character_ref: i64, video_ref: i64) -> Self {
        Self {
            character_ref,
            video_ref,
        }
    }
}
