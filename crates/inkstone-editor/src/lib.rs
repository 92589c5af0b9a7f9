//! The Inkstone command engine.
//!
//! Every edit is a [`Command`]: a reversible operation that captures whatever
//! before-state it needs at execution time, writes through [`ContentDb`], and
//! reports an [`Outcome`] describing what changed. Executed commands are
//! pushed onto a linear [`History`]; undo and redo walk its cursor, calling
//! back into the same command objects.
//!
//! An [`EditorSession`] ties it together for one open post: it runs commands,
//! maintains the observable [`Projection`] (post, sorted blocks, taxonomy,
//! tracker, derived analysis, undo/redo flags, last error), and notifies
//! registered observers after every entry point — successful or not.
//!
//! History is in-memory only and resets whenever the session hydrates from
//! server state or a whole-post command (post update, bulk tag replacement)
//! invalidates the captured snapshots behind it.
//!
//! [`ContentDb`]: inkstone_store::ContentDb

pub mod commands;
pub mod error;
pub mod history;
pub mod projection;
pub mod session;

pub use commands::{
    Command, CreateBlock, CreateCategory, CreatePost, CreateTag, DeleteBlock, DeleteCategory,
    DeletePost, DeleteTag, MoveBlocks, Outcome, PublishPost, SchedulePost, SetPostTags,
    UpdateBlock, UpdateCategory, UpdatePost, UpdateTag, UpdateTracker,
};
pub use error::EditorError;
pub use history::History;
pub use projection::{PostAnalysis, Projection};
pub use session::{EditorSession, SubscriptionId};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Current time as Unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
