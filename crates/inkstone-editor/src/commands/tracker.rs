//! Progress-tracker command.

use inkstone_store::ContentDb;
use inkstone_types::{PostId, ProgressTracker, TrackerInput};

use super::{Command, Outcome};
use crate::error::EditorError;
use crate::Result;

/// Create-or-update the post's tracker. Undo restores the prior tracker, or
/// removes it entirely if the post had none.
pub struct UpdateTracker {
    post_id: PostId,
    input: TrackerInput,
    before: Option<Option<ProgressTracker>>,
}

impl UpdateTracker {
    pub fn new(post_id: PostId, input: TrackerInput) -> Self {
        Self {
            post_id,
            input,
            before: None,
        }
    }
}

impl Command for UpdateTracker {
    fn label(&self) -> &'static str {
        "update tracker"
    }

    fn execute(&mut self, db: &ContentDb) -> Result<Outcome> {
        if self.before.is_none() {
            self.before = Some(db.tracker_for_post(self.post_id)?);
        }
        let tracker = db.upsert_tracker(self.post_id, &self.input)?;
        Ok(Outcome::TrackerWritten(Some(tracker)))
    }

    fn undo(&mut self, db: &ContentDb) -> Result<Outcome> {
        let prior = self
            .before
            .as_ref()
            .ok_or(EditorError::NoCapturedState("update tracker"))?;
        match prior {
            Some(tracker) => {
                db.put_tracker(tracker)?;
                Ok(Outcome::TrackerWritten(Some(tracker.clone())))
            }
            None => {
                db.delete_tracker(self.post_id)?;
                Ok(Outcome::TrackerWritten(None))
            }
        }
    }
}
