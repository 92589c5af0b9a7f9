//! Progress tracker: an optional per-post goal widget.
//!
//! Campaign-style posts show a progress bar (donations collected, signatures
//! gathered, chapters written). At most one tracker exists per post, with
//! create-or-update semantics: writing a tracker for a post that has none
//! creates it, otherwise the existing row is updated in place.

use serde::{Deserialize, Serialize};

use crate::ids::{PostId, TrackerId};
use crate::now_millis;

/// The tracker row for one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTracker {
    pub id: TrackerId,
    pub post_id: PostId,
    /// What is being counted ("raised", "signatures", ...).
    pub label: String,
    pub goal: u32,
    pub progress: u32,
    pub created_at: u64,
    pub updated_at: u64,
}

impl ProgressTracker {
    pub fn new(post_id: PostId, input: &TrackerInput) -> Self {
        let now = now_millis();
        Self {
            id: TrackerId::new(),
            post_id,
            label: input.label.clone(),
            goal: input.goal,
            progress: input.progress,
            created_at: now,
            updated_at: now,
        }
    }

    /// Completion percentage, clamped to 0..=100. A zero goal reads as 100.
    pub fn percent(&self) -> u32 {
        if self.goal == 0 {
            return 100;
        }
        ((self.progress as u64 * 100) / self.goal as u64).min(100) as u32
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.goal
    }
}

/// Input for the create-or-update write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerInput {
    pub label: String,
    pub goal: u32,
    pub progress: u32,
}

impl TrackerInput {
    pub fn new(label: impl Into<String>, goal: u32, progress: u32) -> Self {
        Self {
            label: label.into(),
            goal,
            progress,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
