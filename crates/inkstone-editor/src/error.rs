//! Error types for the command engine.

use thiserror::Error;

use inkstone_store::StoreError;

/// Errors surfaced by sessions, history, and commands.
#[derive(Error, Debug)]
pub enum EditorError {
    /// The operation needs a loaded post and the session has none.
    #[error("no post loaded in this session")]
    NoPostLoaded,

    /// Undo requested with the history cursor at the bottom.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Redo requested with no undone entries ahead of the cursor.
    #[error("nothing to redo")]
    NothingToRedo,

    /// A command was asked to invert itself before it ever executed. This is
    /// a bug in the calling sequence, not a user error.
    #[error("cannot invert {0}: no captured state")]
    NoCapturedState(&'static str),

    /// Anything the storage layer rejected or failed on.
    #[error(transparent)]
    Store(#[from] StoreError),
}
