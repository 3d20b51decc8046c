use serde::{Deserialize, Serialize};

/// A single page of an episode
pub trait MangaPage {
    /// Get the 1-based page number
    fn number(&self) -> u32;
}

/// An episode is a single chapter or a whole book
pub trait MangaEpisode {
    type Page: MangaPage;

    /// Get the title of the episode
    fn title(&self) -> Option<String>;

    /// Get the number of pages the content claims to have
    fn page_count(&self) -> usize;

    /// Get the pages of the episode
    fn pages(&self) -> Vec<Self::Page>;

    /// Get the reading direction
    fn direction(&self) -> ReadingDirection;
}

/// Reading direction enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadingDirection {
    #[default]
    #[serde(rename = "Right to Left")]
    RightToLeft,
    #[serde(rename = "Left to Right")]
    LeftToRight,
}
