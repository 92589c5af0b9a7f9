//! Post commands: create, update, delete, publish, schedule.

use inkstone_store::ContentDb;
use inkstone_types::{Block, Post, PostDraft, PostId, PostPatch, ProgressTracker, TagId};

use super::{Command, Outcome};
use crate::error::EditorError;
use crate::Result;

/// Insert a post from a draft.
pub struct CreatePost {
    draft: PostDraft,
    created: Option<PostId>,
}

impl CreatePost {
    pub fn new(draft: PostDraft) -> Self {
        Self { draft, created: None }
    }
}

impl Command for CreatePost {
    fn label(&self) -> &'static str {
        "create post"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        let post = db.create_post(&self.draft)?;
        self.created = Some(post.id);
        Ok(Outcome::PostWritten(post))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let id = self
            .created
            .ok_or(EditorError::NoCapturedState("create post"))?;
        db.delete_post(id)?;
        Ok(Outcome::PostRemoved(id))
    }
}

/// Patch the post row. Resets history: earlier block snapshots may refer to
/// a post state that no longer exists after a whole-post rewrite.
pub struct UpdatePost {
    post_id: PostId,
    patch: PostPatch,
    before: Option<Post>,
}

impl UpdatePost {
    pub fn new(post_id: PostId, patch: PostPatch) -> Self {
        Self {
            post_id,
            patch,
            before: None,
        }
    }
}

impl Command for UpdatePost {
    fn label(&self) -> &'static str {
        "update post"
    }

    fn resets_history(&self) -> bool {
        true
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        if self.before.is_none() {
            self.before = Some(db.post(self.post_id)?);
        }
        let post = db.update_post(self.post_id, &self.patch)?;
        Ok(Outcome::PostWritten(post))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let prior = self
            .before
            .clone()
            .ok_or(EditorError::NoCapturedState("update post"))?;
        db.put_post(&prior)?;
        Ok(Outcome::PostWritten(prior))
    }
}

/// Everything a deleted post takes down with it, captured for undo.
struct CapturedPost {
    post: Post,
    blocks: Vec<Block>,
    tag_ids: Vec<TagId>,
    tracker: Option<ProgressTracker>,
}

/// Delete the post and its whole aggregate; undo restores it with the
/// original ids.
pub struct DeletePost {
    post_id: PostId,
    captured: Option<CapturedPost>,
}

impl DeletePost {
    pub fn new(post_id: PostId) -> Self {
        Self {
            post_id,
            captured: None,
        }
    }
}

impl Command for DeletePost {
    fn label(&self) -> &'static str {
        "delete post"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        let post = db.post(self.post_id)?;
        let blocks = db.blocks_by_post(self.post_id)?;
        let tag_ids = db
            .tags_for_post(self.post_id)?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let tracker = db.tracker_for_post(self.post_id)?;
        self.captured = Some(CapturedPost {
            post,
            blocks,
            tag_ids,
            tracker,
        });
        db.delete_post(self.post_id)?;
        Ok(Outcome::PostRemoved(self.post_id))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let captured = self
            .captured
            .as_ref()
            .ok_or(EditorError::NoCapturedState("delete post"))?;
        db.put_post(&captured.post)?;
        for block in &captured.blocks {
            db.restore_block(block)?;
        }
        db.set_post_tags(self.post_id, &captured.tag_ids)?;
        if let Some(tracker) = &captured.tracker {
            db.put_tracker(tracker)?;
        }
        Ok(Outcome::PostRestored(Box::new(db.load_bundle(self.post_id)?)))
    }
}

/// Mark the post live now; undo puts the publication fields back.
pub struct PublishPost {
    post_id: PostId,
    before: Option<PublicationFields>,
}

#[derive(Clone, Copy)]
struct PublicationFields {
    published: bool,
    published_at: Option<u64>,
    scheduled_at: Option<u64>,
}

impl PublishPost {
    pub fn new(post_id: PostId) -> Self {
        Self {
            post_id,
            before: None,
        }
    }
}

impl Command for PublishPost {
    fn label(&self) -> &'static str {
        "publish post"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        if self.before.is_none() {
            let post = db.post(self.post_id)?;
            self.before = Some(PublicationFields {
                published: post.published,
                published_at: post.published_at,
                scheduled_at: post.scheduled_at,
            });
        }
        let post = db.publish_post(self.post_id)?;
        Ok(Outcome::PostWritten(post))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let fields = self
            .before
            .ok_or(EditorError::NoCapturedState("publish post"))?;
        let mut post = db.post(self.post_id)?;
        post.published = fields.published;
        post.published_at = fields.published_at;
        post.scheduled_at = fields.scheduled_at;
        db.put_post(&post)?;
        Ok(Outcome::PostWritten(post))
    }
}

/// Schedule a future publication; undo restores the whole prior post row.
pub struct SchedulePost {
    post_id: PostId,
    at: u64,
    before: Option<Post>,
}

impl SchedulePost {
    pub fn new(post_id: PostId, at: u64) -> Self {
        Self {
            post_id,
            at,
            before: None,
        }
    }
}

impl Command for SchedulePost {
    fn label(&self) -> &'static str {
        "schedule post"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        if self.before.is_none() {
            self.before = Some(db.post(self.post_id)?);
        }
        let post = db.schedule_post(self.post_id, self.at)?;
        Ok(Outcome::PostWritten(post))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let prior = self
            .before
            .clone()
            .ok_or(EditorError::NoCapturedState("schedule post"))?;
        db.put_post(&prior)?;
        Ok(Outcome::PostWritten(prior))
    }
}
