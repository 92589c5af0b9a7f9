//! The editing session: one open post, one history, one projection.
//!
//! Each session is an explicit instance over its own [`ContentDb`]. All entry
//! points funnel through the same run path: build a command, execute it,
//! record it in history (or clear the history for resetting commands), merge
//! the outcome into the projection, and notify observers — on failure the
//! error lands in `last_error` and observers are notified too, so a UI can
//! surface it without a separate channel.

use inkstone_store::ContentDb;
use inkstone_types::{
    Block, BlockDraft, BlockId, BlockKind, BlockMove, BlockPatch, CategoryDraft, CategoryId,
    CategoryPatch, Post, PostBundle, PostDraft, PostId, PostPatch, TagDraft, TagId, TagPatch,
    TrackerInput,
};
use tracing::{debug, warn};

use crate::commands::{
    Command, CreateBlock, CreateCategory, CreatePost, CreateTag, DeleteBlock, DeleteCategory,
    DeletePost, DeleteTag, MoveBlocks, Outcome, PublishPost, SchedulePost, SetPostTags,
    UpdateBlock, UpdateCategory, UpdatePost, UpdateTag, UpdateTracker,
};
use crate::error::EditorError;
use crate::history::History;
use crate::projection::Projection;
use crate::Result;

/// Handle for removing a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ObserverFn = Box<dyn FnMut(&Projection) + Send>;

/// One editing session over one database.
pub struct EditorSession {
    db: ContentDb,
    history: History,
    projection: Projection,
    observers: Vec<(SubscriptionId, ObserverFn)>,
    next_subscription: u64,
}

impl EditorSession {
    pub fn new(db: ContentDb) -> Self {
        Self {
            db,
            history: History::new(),
            projection: Projection::new(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// The current observable state.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Direct storage access, for reads outside the command flow.
    pub fn db(&self) -> &ContentDb {
        &self.db
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Register a callback invoked after every entry point, successful or
    /// failed, once the projection is up to date.
    pub fn subscribe(&mut self, callback: impl FnMut(&Projection) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.observers.retain(|(sub, _)| *sub != id);
    }

    fn notify(&mut self) {
        self.projection.refresh_flags(&self.history);
        let projection = &self.projection;
        for (_, callback) in self.observers.iter_mut() {
            callback(projection);
        }
    }

    // =========================================================================
    // Hydration
    // =========================================================================

    /// Seed the projection from server state. Never writes storage; resets
    /// the history, since its captured snapshots no longer describe anything.
    pub fn accept_server_state(&mut self, bundle: PostBundle) {
        debug!(post = %bundle.post.id, "hydrating from server state");
        self.projection.hydrate(bundle);
        self.history.clear();
        self.notify();
    }

    /// Load a post's full aggregate from storage and hydrate from it.
    pub fn open_post(&mut self, post_id: PostId) -> Result<()> {
        match self.db.load_bundle(post_id) {
            Ok(bundle) => {
                self.accept_server_state(bundle);
                Ok(())
            }
            Err(err) => self.fail(err.into()),
        }
    }

    // =========================================================================
    // Post entry points
    // =========================================================================

    /// Create a post and make it the session's loaded post.
    pub fn create_post(&mut self, draft: PostDraft) -> Result<Post> {
        match self.run(Box::new(CreatePost::new(draft)))? {
            Outcome::PostWritten(post) => Ok(post),
            _ => unreachable!("create post yields PostWritten"),
        }
    }

    /// Patch the loaded post. Resets history.
    pub fn update_post(&mut self, patch: PostPatch) -> Result<()> {
        let post_id = self.loaded_post_id()?;
        self.run(Box::new(UpdatePost::new(post_id, patch)))?;
        Ok(())
    }

    /// Delete the loaded post and everything it owns.
    pub fn delete_post(&mut self) -> Result<()> {
        let post_id = self.loaded_post_id()?;
        self.run(Box::new(DeletePost::new(post_id)))?;
        Ok(())
    }

    /// Publish the loaded post now.
    pub fn publish_post(&mut self) -> Result<()> {
        let post_id = self.loaded_post_id()?;
        self.run(Box::new(PublishPost::new(post_id)))?;
        Ok(())
    }

    /// Schedule the loaded post for future publication.
    pub fn schedule_post(&mut self, at: u64) -> Result<()> {
        let post_id = self.loaded_post_id()?;
        self.run(Box::new(SchedulePost::new(post_id, at)))?;
        Ok(())
    }

    // =========================================================================
    // Block entry points
    // =========================================================================

    /// Insert a block into the loaded post. The draft's `post_id` is
    /// overridden with the loaded post's.
    pub fn create_block(&mut self, mut draft: BlockDraft) -> Result<Block> {
        draft.post_id = self.loaded_post_id()?;
        match self.run(Box::new(CreateBlock::new(draft)))? {
            Outcome::BlockWritten(block) => Ok(block),
            _ => unreachable!("create block yields BlockWritten"),
        }
    }

    /// Patch a block of the loaded post.
    pub fn update_block(&mut self, id: BlockId, kind: BlockKind, patch: BlockPatch) -> Result<()> {
        self.loaded_post_id()?;
        self.run(Box::new(UpdateBlock::new(id, kind, patch)))?;
        Ok(())
    }

    /// Delete a block of the loaded post.
    pub fn delete_block(&mut self, id: BlockId, kind: BlockKind) -> Result<()> {
        self.loaded_post_id()?;
        self.run(Box::new(DeleteBlock::new(id, kind)))?;
        Ok(())
    }

    /// Bulk-reorder blocks of the loaded post.
    pub fn move_blocks(&mut self, moves: Vec<BlockMove>) -> Result<()> {
        self.loaded_post_id()?;
        self.run(Box::new(MoveBlocks::new(moves)))?;
        Ok(())
    }

    // =========================================================================
    // Taxonomy entry points
    // =========================================================================

    pub fn create_category(&mut self, draft: CategoryDraft) -> Result<()> {
        self.run(Box::new(CreateCategory::new(draft)))?;
        Ok(())
    }

    pub fn update_category(&mut self, id: CategoryId, patch: CategoryPatch) -> Result<()> {
        self.run(Box::new(UpdateCategory::new(id, patch)))?;
        Ok(())
    }

    pub fn delete_category(&mut self, id: CategoryId) -> Result<()> {
        self.run(Box::new(DeleteCategory::new(id)))?;
        Ok(())
    }

    pub fn create_tag(&mut self, draft: TagDraft) -> Result<()> {
        self.run(Box::new(CreateTag::new(draft)))?;
        Ok(())
    }

    pub fn update_tag(&mut self, id: TagId, patch: TagPatch) -> Result<()> {
        self.run(Box::new(UpdateTag::new(id, patch)))?;
        Ok(())
    }

    pub fn delete_tag(&mut self, id: TagId) -> Result<()> {
        self.run(Box::new(DeleteTag::new(id)))?;
        Ok(())
    }

    /// Replace the loaded post's attached tag set. Resets history.
    pub fn set_post_tags(&mut self, tag_ids: Vec<TagId>) -> Result<()> {
        let post_id = self.loaded_post_id()?;
        self.run(Box::new(SetPostTags::new(post_id, tag_ids)))?;
        Ok(())
    }

    /// Create-or-update the loaded post's tracker.
    pub fn update_tracker(&mut self, input: TrackerInput) -> Result<()> {
        let post_id = self.loaded_post_id()?;
        self.run(Box::new(UpdateTracker::new(post_id, input)))?;
        Ok(())
    }

    // =========================================================================
    // Undo / redo
    // =========================================================================

    pub fn undo(&mut self) -> Result<()> {
        let result = self.history.undo(&self.db);
        self.conclude(result)?;
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        let result = self.history.redo(&self.db);
        self.conclude(result)?;
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Label of the command an undo would invert, for menu items.
    pub fn undo_label(&self) -> Option<&'static str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&'static str> {
        self.history.redo_label()
    }

    // =========================================================================
    // Run path
    // =========================================================================

    fn loaded_post_id(&mut self) -> Result<PostId> {
        match self.projection.post.as_ref().map(|p| p.id) {
            Some(id) => Ok(id),
            None => self.fail(EditorError::NoPostLoaded),
        }
    }

    fn run(&mut self, mut command: Box<dyn Command>) -> Result<Outcome> {
        let label = command.label();
        let result = command.execute(&self.db);
        match &result {
            Ok(_) => {
                debug!(label, "command applied");
                if command.resets_history() {
                    self.history.clear();
                } else {
                    self.history.push(command);
                }
            }
            Err(err) => warn!(label, %err, "command rejected"),
        }
        self.conclude(result)
    }

    /// Common tail of run/undo/redo: merge the outcome (or record the error)
    /// and notify observers.
    fn conclude(&mut self, result: Result<Outcome>) -> Result<Outcome> {
        match result {
            Ok(outcome) => {
                self.projection.last_error = None;
                self.projection.apply(&outcome);
                if let Err(err) = self.refresh_after(&outcome) {
                    return self.fail(err);
                }
                self.notify();
                Ok(outcome)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Cross-collection effects the outcome alone cannot express: tag
    /// vocabulary changes may have unlinked the loaded post's tags, and a
    /// category delete may have detached the loaded post.
    fn refresh_after(&mut self, outcome: &Outcome) -> Result<()> {
        let loaded = self.projection.post.as_ref().map(|p| p.id);
        match outcome {
            Outcome::TagsChanged(_) => {
                if let Some(post_id) = loaded {
                    self.projection.post_tags = self.db.tags_for_post(post_id)?;
                }
            }
            Outcome::CategoriesChanged(_) => {
                if let Some(post_id) = loaded {
                    self.projection.post = Some(self.db.post(post_id)?);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn fail<T>(&mut self, err: EditorError) -> Result<T> {
        self.projection.last_error = Some(err.to_string());
        self.notify();
        Err(err)
    }
}
