//! SQLite persistence for Inkstone.
//!
//! One [`ContentDb`] wraps a single `rusqlite::Connection` and owns the whole
//! schema: posts, the 13 per-kind block tables (plus 4 child-row tables for
//! composite payloads), categories, tags, the `post_tags` join table, and
//! progress trackers.
//!
//! The interesting parts live in the block repository:
//!
//! - **Position shift**: inserting at an explicit position bumps every block
//!   of the post at that position or later by +1 — across all 13 tables,
//!   inside one transaction, before the insert lands.
//! - **Fan-out reads**: a post's blocks are read from 13 tables and merged
//!   in memory into one sequence sorted by `(position, created_at, id)`.
//! - **Bulk move**: [`ContentDb::move_blocks`] rewrites positions for blocks
//!   of any mix of kinds in one transaction; a single bad id rolls back the
//!   whole batch.
//!
//! Every multi-row mutation runs under `unchecked_transaction()`; callers
//! never observe a partial write.

pub mod content_db;
pub mod error;

pub use content_db::ContentDb;
pub use error::StoreError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
