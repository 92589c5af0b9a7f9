//! Block commands: create, update, delete, bulk move.

use inkstone_store::ContentDb;
use inkstone_types::{
    draft_from_block, Block, BlockDraft, BlockId, BlockKind, BlockMove, BlockPatch,
};

use super::{Command, Outcome};
use crate::error::EditorError;
use crate::Result;

/// Insert a block from a draft.
pub struct CreateBlock {
    draft: BlockDraft,
    created: Option<BlockId>,
}

impl CreateBlock {
    pub fn new(draft: BlockDraft) -> Self {
        Self { draft, created: None }
    }
}

impl Command for CreateBlock {
    fn label(&self) -> &'static str {
        "create block"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        let block = db.create_block(&self.draft)?;
        self.created = Some(block.id);
        Ok(Outcome::BlockWritten(block))
    }

    // Redo re-runs execute, minting a fresh id; `created` tracks the live row.
    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let id = self
            .created
            .ok_or(EditorError::NoCapturedState("create block"))?;
        db.delete_block(id, self.draft.body.kind())?;
        Ok(Outcome::BlockRemoved(id))
    }
}

/// Patch a block, restoring the pre-patch row on undo.
pub struct UpdateBlock {
    id: BlockId,
    kind: BlockKind,
    patch: BlockPatch,
    before: Option<Block>,
}

impl UpdateBlock {
    pub fn new(id: BlockId, kind: BlockKind, patch: BlockPatch) -> Self {
        Self {
            id,
            kind,
            patch,
            before: None,
        }
    }
}

impl Command for UpdateBlock {
    fn label(&self) -> &'static str {
        "update block"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        // Captured once: redo after undo re-applies the patch to the same
        // restored state, so the first snapshot stays valid.
        if self.before.is_none() {
            self.before = Some(db.block(self.id, self.kind)?);
        }
        let block = db.update_block(self.id, self.kind, &self.patch)?;
        Ok(Outcome::BlockWritten(block))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let prior = self
            .before
            .clone()
            .ok_or(EditorError::NoCapturedState("update block"))?;
        let restored = db.restore_block(&prior)?;
        Ok(Outcome::BlockWritten(restored))
    }
}

/// Delete a block, re-creating it from the captured snapshot on undo.
pub struct DeleteBlock {
    id: BlockId,
    kind: BlockKind,
    captured: Option<Block>,
}

impl DeleteBlock {
    pub fn new(id: BlockId, kind: BlockKind) -> Self {
        Self {
            id,
            kind,
            captured: None,
        }
    }
}

impl Command for DeleteBlock {
    fn label(&self) -> &'static str {
        "delete block"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        // Recaptured on every run: after undo re-created the block under a
        // fresh id, redo must snapshot and delete that row, not the original.
        let block = db.block(self.id, self.kind)?;
        self.captured = Some(block);
        db.delete_block(self.id, self.kind)?;
        Ok(Outcome::BlockRemoved(self.id))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let captured = self
            .captured
            .clone()
            .ok_or(EditorError::NoCapturedState("delete block"))?;
        // Creation mints a fresh id; the draft targets the original position,
        // shifting later blocks so the sequence order comes back intact.
        let created = db.create_block(&draft_from_block(&captured))?;
        self.id = created.id;
        Ok(Outcome::BlockWritten(created))
    }
}

/// Bulk reorder across any mix of block kinds.
pub struct MoveBlocks {
    moves: Vec<BlockMove>,
    before: Option<Vec<BlockMove>>,
}

impl MoveBlocks {
    pub fn new(moves: Vec<BlockMove>) -> Self {
        Self { moves, before: None }
    }
}

impl Command for MoveBlocks {
    fn label(&self) -> &'static str {
        "move blocks"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        if self.before.is_none() {
            // Snapshot current positions of exactly the named blocks. A bad
            // id fails here, before any position is written.
            let mut prior = Vec::with_capacity(self.moves.len());
            for mv in &self.moves {
                let block = db.block(mv.id, mv.kind)?;
                prior.push(BlockMove::new(mv.id, mv.kind, block.position));
            }
            self.before = Some(prior);
        }
        let blocks = db.move_blocks(&self.moves)?;
        Ok(Outcome::BlocksMoved(blocks))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let prior = self
            .before
            .clone()
            .ok_or(EditorError::NoCapturedState("move blocks"))?;
        let blocks = db.move_blocks(&prior)?;
        Ok(Outcome::BlocksMoved(blocks))
    }
}
