//! Error types for storage operations.

use thiserror::Error;

use inkstone_types::{BlockId, BlockKind, CategoryId, PostId, TagId};

/// Errors that can occur while reading or writing content.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No block with this id exists in any of the 13 block tables.
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// The block exists, but under a different kind than the caller named.
    #[error("block {id:?} is not a {requested} block (stored as {actual})")]
    KindMismatch {
        id: BlockId,
        requested: BlockKind,
        actual: BlockKind,
    },

    /// No post with this id.
    #[error("post not found: {0:?}")]
    PostNotFound(PostId),

    /// No category with this id.
    #[error("category not found: {0:?}")]
    CategoryNotFound(CategoryId),

    /// No tag with this id.
    #[error("tag not found: {0:?}")]
    TagNotFound(TagId),

    /// The post has no progress tracker.
    #[error("post {0:?} has no progress tracker")]
    TrackerNotFound(PostId),

    /// A stored column failed to parse back into its model type. This means
    /// the database was written by something else or corrupted on disk.
    #[error("corrupt column data: {0}")]
    Corrupt(String),

    /// Anything surfaced by SQLite itself.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

impl From<uuid::Error> for StoreError {
    fn from(e: uuid::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}
