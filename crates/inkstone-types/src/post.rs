//! Post aggregate: the publication envelope that owns blocks.
//!
//! A `Post` is the metadata row — title, slug, category, publication state.
//! Its content lives in blocks; its tag links in the join table; the optional
//! progress tracker in its own row. [`PostBundle`] is the full aggregate read
//! used to hydrate an editing session.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::ids::{AuthorId, CategoryId, PostId};
use crate::now_millis;
use crate::taxonomy::{Category, Tag};
use crate::tracker::ProgressTracker;

/// Publication metadata for one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    /// Account that owns the post. Accounts live outside this system.
    pub author: AuthorId,
    pub title: String,
    /// URL slug, unique per platform. Derived from the title unless given.
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    pub featured: bool,
    pub published: bool,
    /// Unix millis of the moment the post went live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<u64>,
    /// Unix millis of a pending scheduled publication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Post {
    /// Create an unpublished draft post.
    pub fn new(author: AuthorId, title: impl Into<String>) -> Self {
        let title = title.into();
        let slug = slugify(&title);
        let now = now_millis();
        Self {
            id: PostId::new(),
            author,
            title,
            slug,
            excerpt: None,
            category_id: None,
            featured: false,
            published: false,
            published_at: None,
            scheduled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Materialize a draft input.
    pub fn from_draft(draft: &PostDraft) -> Self {
        let mut post = Self::new(draft.author, draft.title.clone());
        if let Some(slug) = &draft.slug {
            post.slug = slug.clone();
        }
        post.excerpt = draft.excerpt.clone();
        post.category_id = draft.category_id;
        post.featured = draft.featured;
        post
    }

    /// Whether a future publication is pending.
    pub fn is_scheduled(&self) -> bool {
        !self.published && self.scheduled_at.is_some()
    }
}

/// Input for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub author: AuthorId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub featured: bool,
}

impl PostDraft {
    pub fn new(author: AuthorId, title: impl Into<String>) -> Self {
        Self {
            author,
            title: title.into(),
            slug: None,
            excerpt: None,
            category_id: None,
            featured: false,
        }
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }
}

/// Input for updating a post. Empty fields are left untouched.
///
/// Two-level options distinguish "leave alone" (`None`) from "clear"
/// (`Some(None)`) for nullable columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl PostPatch {
    pub fn retitle(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn set_category(category_id: Option<CategoryId>) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.excerpt.is_none()
            && self.category_id.is_none()
            && self.featured.is_none()
    }
}

/// The full aggregate for one post, as read in one shot.
///
/// This is the hydration payload: an editing session seeds its projection
/// from one of these and starts a fresh history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostBundle {
    pub post: Post,
    /// Sorted by position.
    pub blocks: Vec<Block>,
    /// The full category vocabulary.
    pub categories: Vec<Category>,
    /// The full tag vocabulary.
    pub tags: Vec<Tag>,
    /// Tags attached to this post.
    pub post_tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<ProgressTracker>,
}

/// Derive a URL slug: lowercase, alphanumerics kept, runs of anything else
/// collapsed to single hyphens.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_is_unpublished_draft() {
        let post = Post::new(AuthorId::new(), "Hello World");
        assert!(!post.published);
        assert!(post.published_at.is_none());
        assert!(post.scheduled_at.is_none());
        assert!(!post.is_scheduled());
        assert_eq!(post.slug, "hello-world");
    }

    #[test]
    fn test_from_draft_applies_overrides() {
        let category = CategoryId::new();
        let draft = PostDraft::new(AuthorId::new(), "A Title")
            .with_category(category)
            .with_excerpt("teaser");
        let post = Post::from_draft(&draft);
        assert_eq!(post.title, "A Title");
        assert_eq!(post.category_id, Some(category));
        assert_eq!(post.excerpt.as_deref(), Some("teaser"));
    }

    #[test]
    fn test_from_draft_explicit_slug_wins() {
        let mut draft = PostDraft::new(AuthorId::new(), "Original Title");
        draft.slug = Some("custom-slug".into());
        let post = Post::from_draft(&draft);
        assert_eq!(post.slug, "custom-slug");
    }

    #[test]
    fn test_is_scheduled() {
        let mut post = Post::new(AuthorId::new(), "p");
        post.scheduled_at = Some(crate::now_millis() + 86_400_000);
        assert!(post.is_scheduled());
        post.published = true;
        assert!(!post.is_scheduled());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(PostPatch::default().is_empty());
        assert!(!PostPatch::retitle("t").is_empty());
        assert!(!PostPatch::set_category(None).is_empty());
    }

    #[test]
    fn test_post_serde_roundtrip() {
        let post = Post::new(AuthorId::new(), "Roundtrip");
        let json = serde_json::to_string(&post).unwrap();
        let parsed: Post = serde_json::from_str(&json).unwrap();
        assert_eq!(post, parsed);
    }

    // ── slugify ─────────────────────────────────────────────────────────

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Rust & SQLite: a love story!"), "rust-sqlite-a-love-story");
    }

    #[test]
    fn test_slugify_no_leading_or_trailing_dash() {
        assert_eq!(slugify("  spaced out  "), "spaced-out");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_unicode_lowercase() {
        assert_eq!(slugify("Überraschung"), "überraschung");
    }
}
