//! Observable editor state.
//!
//! The projection is what a UI binds to: the loaded post, its blocks in
//! display order, the taxonomy vocabularies, the attached tag set, the
//! tracker, derived analysis numbers, undo/redo availability, and the last
//! error message. It is a read model — commands write to storage, outcomes
//! are merged in here, and observers receive a reference after every change.

use serde::Serialize;

use inkstone_types::{Block, Category, Post, PostBundle, ProgressTracker, Tag};

use crate::commands::Outcome;
use crate::history::History;

/// Words an average reader covers per minute.
const READING_WPM: usize = 200;

/// Derived numbers recomputed from the block list on every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostAnalysis {
    /// Prose word count across all blocks.
    pub words: usize,
    /// Estimated reading time, ceil(words / 200), at least 1 when words > 0.
    pub reading_minutes: u32,
    pub block_count: usize,
}

impl PostAnalysis {
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let words: usize = blocks.iter().map(|b| b.word_count()).sum();
        Self {
            words,
            reading_minutes: words.div_ceil(READING_WPM) as u32,
            block_count: blocks.len(),
        }
    }
}

/// The session's observable state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Projection {
    pub post: Option<Post>,
    /// Sorted by `(position, created_at, id)`.
    pub blocks: Vec<Block>,
    /// Full category vocabulary.
    pub categories: Vec<Category>,
    /// Full tag vocabulary.
    pub tags: Vec<Tag>,
    /// Tags attached to the loaded post.
    pub post_tags: Vec<Tag>,
    pub tracker: Option<ProgressTracker>,
    pub analysis: PostAnalysis,
    pub can_undo: bool,
    pub can_redo: bool,
    /// Message of the most recent failed entry point; cleared on success.
    pub last_error: Option<String>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one outcome into the state. Single-block outcomes edit the
    /// sorted list in place; aggregate outcomes replace their collection.
    pub fn apply(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::BlockWritten(block) => {
                match self.blocks.iter_mut().find(|b| b.id == block.id) {
                    Some(slot) => *slot = block.clone(),
                    None => self.blocks.push(block.clone()),
                }
                self.sort_blocks();
                self.recompute_analysis();
            }
            Outcome::BlockRemoved(id) => {
                self.blocks.retain(|b| b.id != *id);
                self.recompute_analysis();
            }
            Outcome::BlocksMoved(blocks) => {
                self.blocks = blocks.clone();
                self.recompute_analysis();
            }
            Outcome::PostWritten(post) => {
                // Switching to a different post drops the old post's content
                // state; an in-place rewrite keeps it.
                if self.post.as_ref().map(|p| p.id) != Some(post.id) {
                    self.blocks.clear();
                    self.post_tags.clear();
                    self.tracker = None;
                    self.recompute_analysis();
                }
                self.post = Some(post.clone());
            }
            Outcome::PostRemoved(id) => {
                if self.post.as_ref().map(|p| p.id) == Some(*id) {
                    self.post = None;
                    self.blocks.clear();
                    self.post_tags.clear();
                    self.tracker = None;
                    self.recompute_analysis();
                }
            }
            Outcome::PostRestored(bundle) => self.hydrate(bundle.as_ref().clone()),
            Outcome::CategoriesChanged(categories) => {
                self.categories = categories.clone();
            }
            Outcome::TagsChanged(tags) => {
                self.tags = tags.clone();
            }
            Outcome::PostTagsSet(tags) => {
                self.post_tags = tags.clone();
            }
            Outcome::TrackerWritten(tracker) => {
                self.tracker = tracker.clone();
            }
        }
    }

    /// Seed the whole state from an aggregate read.
    pub fn hydrate(&mut self, bundle: PostBundle) {
        self.post = Some(bundle.post);
        self.blocks = bundle.blocks;
        self.categories = bundle.categories;
        self.tags = bundle.tags;
        self.post_tags = bundle.post_tags;
        self.tracker = bundle.tracker;
        self.last_error = None;
        self.sort_blocks();
        self.recompute_analysis();
    }

    /// Copy undo/redo availability from the history. Always copied, never
    /// cached independently.
    pub fn refresh_flags(&mut self, history: &History) {
        self.can_undo = history.can_undo();
        self.can_redo = history.can_redo();
    }

    fn sort_blocks(&mut self) {
        self.blocks
            .sort_by(|a, b| (a.position, a.created_at, a.id).cmp(&(b.position, b.created_at, b.id)));
    }

    fn recompute_analysis(&mut self) {
        self.analysis = PostAnalysis::from_blocks(&self.blocks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkstone_types::{AuthorId, Block, BlockBody, PostId};

    fn text_block(post: PostId, position: u32, body: &str) -> Block {
        Block::new(post, position, "Text", BlockBody::Text { body: body.into() })
    }

    #[test]
    fn test_block_written_inserts_sorted() {
        let post = PostId::new();
        let mut projection = Projection::new();
        let b1 = text_block(post, 1, "second");
        let b0 = text_block(post, 0, "first");
        projection.apply(&Outcome::BlockWritten(b1.clone()));
        projection.apply(&Outcome::BlockWritten(b0.clone()));

        let ids: Vec<_> = projection.blocks.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![b0.id, b1.id]);
        assert_eq!(projection.analysis.block_count, 2);
    }

    #[test]
    fn test_block_written_replaces_in_place() {
        let post = PostId::new();
        let mut projection = Projection::new();
        let block = text_block(post, 0, "one two");
        projection.apply(&Outcome::BlockWritten(block.clone()));

        let mut edited = block.clone();
        edited.body = BlockBody::Text { body: "one two three four".into() };
        projection.apply(&Outcome::BlockWritten(edited));

        assert_eq!(projection.blocks.len(), 1);
        assert_eq!(projection.analysis.words, 4);
    }

    #[test]
    fn test_block_removed_updates_analysis() {
        let post = PostId::new();
        let mut projection = Projection::new();
        let block = text_block(post, 0, "a b c");
        projection.apply(&Outcome::BlockWritten(block.clone()));
        projection.apply(&Outcome::BlockRemoved(block.id));
        assert!(projection.blocks.is_empty());
        assert_eq!(projection.analysis, PostAnalysis::default());
    }

    #[test]
    fn test_reading_minutes_rounds_up() {
        let post = PostId::new();
        let two_hundred = vec!["word"; 200].join(" ");
        let mut projection = Projection::new();
        projection.apply(&Outcome::BlockWritten(text_block(post, 0, &two_hundred)));
        assert_eq!(projection.analysis.reading_minutes, 1);

        projection.apply(&Outcome::BlockWritten(text_block(post, 1, "one more")));
        assert_eq!(projection.analysis.words, 202);
        assert_eq!(projection.analysis.reading_minutes, 2);
    }

    #[test]
    fn test_reading_minutes_short_post_is_one() {
        let post = PostId::new();
        let mut projection = Projection::new();
        projection.apply(&Outcome::BlockWritten(text_block(post, 0, "hi")));
        assert_eq!(projection.analysis.reading_minutes, 1);
    }

    #[test]
    fn test_empty_post_reads_zero_minutes() {
        let projection = Projection::new();
        assert_eq!(projection.analysis.reading_minutes, 0);
        assert_eq!(projection.analysis.words, 0);
    }

    #[test]
    fn test_post_switch_drops_content_state() {
        let mut projection = Projection::new();
        let first = Post::new(AuthorId::new(), "First");
        projection.apply(&Outcome::PostWritten(first.clone()));
        projection.apply(&Outcome::BlockWritten(text_block(first.id, 0, "x")));

        let second = Post::new(AuthorId::new(), "Second");
        projection.apply(&Outcome::PostWritten(second.clone()));
        assert!(projection.blocks.is_empty());
        assert_eq!(projection.post.as_ref().map(|p| p.id), Some(second.id));

        // In-place rewrite of the same post keeps the blocks.
        projection.apply(&Outcome::BlockWritten(text_block(second.id, 0, "y")));
        let mut renamed = second.clone();
        renamed.title = "Second, renamed".into();
        projection.apply(&Outcome::PostWritten(renamed));
        assert_eq!(projection.blocks.len(), 1);
    }

    #[test]
    fn test_post_removed_clears_only_matching() {
        let mut projection = Projection::new();
        let post = Post::new(AuthorId::new(), "P");
        projection.apply(&Outcome::PostWritten(post.clone()));
        projection.apply(&Outcome::PostRemoved(PostId::new())); // unrelated
        assert!(projection.post.is_some());
        projection.apply(&Outcome::PostRemoved(post.id));
        assert!(projection.post.is_none());
    }

    #[test]
    fn test_serializes_to_json() {
        let mut projection = Projection::new();
        projection.apply(&Outcome::PostWritten(Post::new(AuthorId::new(), "P")));
        let json = serde_json::to_value(&projection).unwrap();
        assert_eq!(json["analysis"]["block_count"], 0);
        assert_eq!(json["can_undo"], false);
    }
}
