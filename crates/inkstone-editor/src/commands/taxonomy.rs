//! Category and tag commands, plus bulk tag replacement.

use inkstone_store::ContentDb;
use inkstone_types::{
    Category, CategoryDraft, CategoryId, CategoryPatch, PostId, PostPatch, Tag, TagDraft, TagId,
    TagPatch,
};

use super::{Command, Outcome};
use crate::error::EditorError;
use crate::Result;

/// Insert a category.
pub struct CreateCategory {
    draft: CategoryDraft,
    created: Option<CategoryId>,
}

impl CreateCategory {
    pub fn new(draft: CategoryDraft) -> Self {
        Self { draft, created: None }
    }
}

impl Command for CreateCategory {
    fn label(&self) -> &'static str {
        "create category"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        let category = db.create_category(&self.draft)?;
        self.created = Some(category.id);
        Ok(Outcome::CategoriesChanged(db.categories()?))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let id = self
            .created
            .ok_or(EditorError::NoCapturedState("create category"))?;
        db.delete_category(id)?;
        Ok(Outcome::CategoriesChanged(db.categories()?))
    }
}

/// Patch a category; undo is a full-row restore.
pub struct UpdateCategory {
    id: CategoryId,
    patch: CategoryPatch,
    before: Option<Category>,
}

impl UpdateCategory {
    pub fn new(id: CategoryId, patch: CategoryPatch) -> Self {
        Self {
            id,
            patch,
            before: None,
        }
    }
}

impl Command for UpdateCategory {
    fn label(&self) -> &'static str {
        "update category"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        if self.before.is_none() {
            self.before = Some(db.category(self.id)?);
        }
        db.update_category(self.id, &self.patch)?;
        Ok(Outcome::CategoriesChanged(db.categories()?))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let prior = self
            .before
            .as_ref()
            .ok_or(EditorError::NoCapturedState("update category"))?;
        db.put_category(prior)?;
        Ok(Outcome::CategoriesChanged(db.categories()?))
    }
}

/// Delete a category. Deleting detaches referencing posts; undo restores the
/// row and re-points those posts at it.
pub struct DeleteCategory {
    id: CategoryId,
    captured: Option<(Category, Vec<PostId>)>,
}

impl DeleteCategory {
    pub fn new(id: CategoryId) -> Self {
        Self { id, captured: None }
    }
}

impl Command for DeleteCategory {
    fn label(&self) -> &'static str {
        "delete category"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        let category = db.category(self.id)?;
        let posts = db.posts_with_category(self.id)?;
        self.captured = Some((category, posts));
        db.delete_category(self.id)?;
        Ok(Outcome::CategoriesChanged(db.categories()?))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let (category, posts) = self
            .captured
            .as_ref()
            .ok_or(EditorError::NoCapturedState("delete category"))?;
        db.put_category(category)?;
        for post_id in posts {
            db.update_post(*post_id, &PostPatch::set_category(Some(category.id)))?;
        }
        Ok(Outcome::CategoriesChanged(db.categories()?))
    }
}

/// Insert a tag.
pub struct CreateTag {
    draft: TagDraft,
    created: Option<TagId>,
}

impl CreateTag {
    pub fn new(draft: TagDraft) -> Self {
        Self { draft, created: None }
    }
}

impl Command for CreateTag {
    fn label(&self) -> &'static str {
        "create tag"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        let tag = db.create_tag(&self.draft)?;
        self.created = Some(tag.id);
        Ok(Outcome::TagsChanged(db.tags()?))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let id = self
            .created
            .ok_or(EditorError::NoCapturedState("create tag"))?;
        db.delete_tag(id)?;
        Ok(Outcome::TagsChanged(db.tags()?))
    }
}

/// Patch a tag; undo is a full-row restore.
pub struct UpdateTag {
    id: TagId,
    patch: TagPatch,
    before: Option<Tag>,
}

impl UpdateTag {
    pub fn new(id: TagId, patch: TagPatch) -> Self {
        Self {
            id,
            patch,
            before: None,
        }
    }
}

impl Command for UpdateTag {
    fn label(&self) -> &'static str {
        "update tag"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        if self.before.is_none() {
            self.before = Some(db.tag(self.id)?);
        }
        db.update_tag(self.id, &self.patch)?;
        Ok(Outcome::TagsChanged(db.tags()?))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let prior = self
            .before
            .as_ref()
            .ok_or(EditorError::NoCapturedState("update tag"))?;
        db.put_tag(prior)?;
        Ok(Outcome::TagsChanged(db.tags()?))
    }
}

/// Delete a tag. Its post links cascade away; undo restores the row and
/// re-links the posts that carried it.
pub struct DeleteTag {
    id: TagId,
    captured: Option<(Tag, Vec<PostId>)>,
}

impl DeleteTag {
    pub fn new(id: TagId) -> Self {
        Self { id, captured: None }
    }
}

impl Command for DeleteTag {
    fn label(&self) -> &'static str {
        "delete tag"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        let tag = db.tag(self.id)?;
        let posts = db.posts_with_tag(self.id)?;
        self.captured = Some((tag, posts));
        db.delete_tag(self.id)?;
        Ok(Outcome::TagsChanged(db.tags()?))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let (tag, posts) = self
            .captured
            .as_ref()
            .ok_or(EditorError::NoCapturedState("delete tag"))?;
        db.put_tag(tag)?;
        for post_id in posts {
            db.link_post_tag(*post_id, tag.id)?;
        }
        Ok(Outcome::TagsChanged(db.tags()?))
    }
}

/// Replace the post's whole attached tag set. Resets history: the bulk
/// replacement invalidates earlier per-edit snapshots of the tag links.
pub struct SetPostTags {
    post_id: PostId,
    tag_ids: Vec<TagId>,
    before: Option<Vec<TagId>>,
}

impl SetPostTags {
    pub fn new(post_id: PostId, tag_ids: Vec<TagId>) -> Self {
        Self {
            post_id,
            tag_ids,
            before: None,
        }
    }
}

impl Command for SetPostTags {
    fn label(&self) -> &'static str {
        "set post tags"
    }

    fn resets_history(&self) -> bool {
        true
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        if self.before.is_none() {
            self.before = Some(
                db.tags_for_post(self.post_id)?
                    .into_iter()
                    .map(|t| t.id)
                    .collect(),
            );
        }
        let tags = db.set_post_tags(self.post_id, &self.tag_ids)?;
        Ok(Outcome::PostTagsSet(tags))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let prior = self
            .before
            .as_ref()
            .ok_or(EditorError::NoCapturedState("set post tags"))?;
        let tags = db.set_post_tags(self.post_id, prior)?;
        Ok(Outcome::PostTagsSet(tags))
    }
}
