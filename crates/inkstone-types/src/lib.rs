//! Shared identity and content types for Inkstone.
//!
//! This crate is the relational foundation: typed IDs, the block tagged
//! union, posts, taxonomy, and trackers. It has **no internal inkstone
//! dependencies** — a pure leaf crate that other crates build on.
//!
//! # Entity-Relationship Overview
//!
//! ```text
//! Post (PostId) ← the publication aggregate
//!     └── authored by Author (AuthorId, external account system)
//!     └── belongs to Category (CategoryId, optional)
//!     └── tagged with Tag (TagId, many-to-many)
//!     └── owns ProgressTracker (TrackerId, at most one)
//!     └── owns Block (BlockId, ordered by position)
//!
//! Block (BlockId) ← one content unit, 13 payload shapes
//!     └── composite payloads own child rows (ItemId):
//!         gallery images, instagram embeds, poll options, list items
//! ```
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`Post`]          | Publication envelope (title, slug, state)    |
//! | [`Block`]         | Content unit: envelope + [`BlockBody`]       |
//! | [`BlockKind`]     | Discriminant / storage-table selector        |
//! | [`BlockDraft`]    | Creation input (optional target position)    |
//! | [`BlockPatch`]    | Update input (child rows upserted by id)     |
//! | [`BlockMove`]     | One entry of a bulk reorder                  |
//! | [`Category`]      | Post category (one per post, optional)       |
//! | [`Tag`]           | Post tag (many-to-many)                      |
//! | [`ProgressTracker`] | Per-post goal widget                       |
//! | [`PostBundle`]    | Full aggregate read for session hydration    |
//! |-------------------|----------------------------------------------|

pub mod ids;
pub mod block;
pub mod post;
pub mod taxonomy;
pub mod tracker;

// Re-export primary types at crate root for convenience.
pub use ids::{AuthorId, BlockId, CategoryId, ItemId, PostId, TagId, TrackerId};
pub use block::{
    draft_from_block, Block, BlockBody, BlockDraft, BlockKind, BlockMove, BlockPatch, ChartPoint,
    ChartStyle, GalleryImage, InstagramEmbed, ListItem, PollOption,
};
pub use post::{slugify, Post, PostBundle, PostDraft, PostPatch};
pub use taxonomy::{Category, CategoryDraft, CategoryPatch, Tag, TagDraft, TagPatch};
pub use tracker::{ProgressTracker, TrackerInput};

/// Current time as Unix milliseconds. Used by constructors throughout the crate.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
