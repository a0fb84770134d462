//! Records and messages exchanged between the fetch worker and the ECS world.
//!
//! A fetch cycle runs off the frame thread. When it settles it sends exactly
//! one [`FeedMessage`] back to the [`ItemProducer`] that started it.
//!
//! [`ItemProducer`]: crate::resources::itemproducer::ItemProducer

use std::path::PathBuf;

use crate::error::FeedError;

/// Author metadata of a remote item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Handle, without the leading `@`.
    pub screen_name: String,
}

/// One record fetched from the item source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub author: Author,
    /// Engagement count shown next to the author.
    pub favorite_count: u64,
    pub text: String,
    /// Remote image referenced by the item, before any URL transform.
    pub image_url: String,
}

impl RemoteItem {
    pub fn new(
        name: impl Into<String>,
        screen_name: impl Into<String>,
        text: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            author: Author {
                name: name.into(),
                screen_name: screen_name.into(),
            },
            favorite_count: 0,
            text: text.into(),
            image_url: image_url.into(),
        }
    }

    pub fn with_favorite_count(mut self, count: u64) -> Self {
        self.favorite_count = count;
        self
    }

    /// Text handed to the scene collaborator for this item's visual.
    pub fn display_text(&self) -> String {
        format!(
            "{} @{} (<3 {}):\n{}",
            self.author.name, self.author.screen_name, self.favorite_count, self.text
        )
    }
}

/// A remote item whose image has been cached locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyItem {
    pub item: RemoteItem,
    pub image_path: PathBuf,
}

/// Outcome of one fetch cycle, sent from the worker to the producer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// The feed answered. `items` holds every item whose asset resolved, in
    /// feed order; `dropped` counts items lost to asset failures.
    CycleFinished { items: Vec<ReadyItem>, dropped: usize },
    /// The feed request itself failed; the cycle contributes nothing.
    CycleFailed { error: FeedError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_includes_author_handle_and_count() {
        let item = RemoteItem::new("Ada", "ada", "hello world", "https://x/a_normal.png")
            .with_favorite_count(12);
        assert_eq!(item.display_text(), "Ada @ada (<3 12):\nhello world");
    }
}
