//! Reversible editing commands.
//!
//! A command's constructor captures only its inputs. Persisted before-state
//! is captured lazily at the start of [`Command::execute`], against whatever
//! the database holds at that moment, so a command built early and run late
//! still inverts correctly.
//!
//! The execute/undo/redo contract:
//!
//! - `execute` must be safe to run again with the same captured inputs —
//!   `redo` is `execute` by default.
//! - `undo` is only meaningful after a successful `execute`; calling it
//!   without captured state fails with [`EditorError::NoCapturedState`],
//!   never a silent no-op.
//! - A failing `execute` or `undo` leaves storage unchanged (every multi-row
//!   write in the store is transactional), so the history cursor can stay
//!   where it was.
//!
//! [`EditorError::NoCapturedState`]: crate::EditorError::NoCapturedState

use inkstone_store::ContentDb;
use inkstone_types::{Block, BlockId, Category, Post, PostBundle, PostId, ProgressTracker, Tag};

use crate::Result;

mod block;
mod post;
mod taxonomy;
mod tracker;

pub use block::{CreateBlock, DeleteBlock, MoveBlocks, UpdateBlock};
pub use post::{CreatePost, DeletePost, PublishPost, SchedulePost, UpdatePost};
pub use taxonomy::{
    CreateCategory, CreateTag, DeleteCategory, DeleteTag, SetPostTags, UpdateCategory, UpdateTag,
};
pub use tracker::UpdateTracker;

/// One reversible editing operation. Object-safe; history holds these boxed.
pub trait Command: Send {
    /// Short human-readable label ("create block", "move blocks", ...).
    fn label(&self) -> &'static str;

    /// Whether a successful run invalidates the whole history instead of
    /// joining it. True for whole-post updates and bulk tag replacement,
    /// whose snapshots would make earlier entries unsound to replay.
    fn resets_history(&self) -> bool {
        false
    }

    /// Apply the operation, capturing any before-state it will need.
    fn execute(&mut self, db: &ContentDb) -> Result<Outcome>;

    /// Invert the last successful `execute`.
    fn undo(&mut self, db: &ContentDb) -> Result<Outcome>;

    /// Re-apply after an undo. Default: run `execute` again.
    fn redo(&mut self, db: &ContentDb) -> Result<Outcome> {
        self.execute(db)
    }
}

/// What a command changed — the projection merges these without re-reading
/// the whole aggregate.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A block was created, updated, or restored.
    BlockWritten(Block),
    /// A block was deleted.
    BlockRemoved(BlockId),
    /// A bulk reorder landed; carries the post's full block list in new order.
    BlocksMoved(Vec<Block>),
    /// The post row was created or rewritten.
    PostWritten(Post),
    /// The post was deleted (cascading its blocks, tag links, tracker).
    PostRemoved(PostId),
    /// A deleted post came back; the bundle re-hydrates the projection.
    PostRestored(Box<PostBundle>),
    /// The category vocabulary changed.
    CategoriesChanged(Vec<Category>),
    /// The tag vocabulary changed.
    TagsChanged(Vec<Tag>),
    /// The loaded post's attached tag set was replaced.
    PostTagsSet(Vec<Tag>),
    /// The post's tracker was written (or, on undo, removed).
    TrackerWritten(Option<ProgressTracker>),
}
