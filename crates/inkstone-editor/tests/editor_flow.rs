//! End-to-end session flows: commands, undo/redo, projection, observers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;

use inkstone_editor::{EditorError, EditorSession};
use inkstone_store::{ContentDb, StoreError};
use inkstone_types::{
    AuthorId, BlockDraft, BlockKind, BlockMove, BlockPatch, BlockBody, CategoryDraft, GalleryImage,
    PostDraft, PostPatch, TagDraft, TrackerInput,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Session with one freshly created, loaded post.
fn session_with_post() -> EditorSession {
    init_tracing();
    let db = ContentDb::in_memory().unwrap();
    let mut session = EditorSession::new(db);
    session
        .create_post(PostDraft::new(AuthorId::new(), "Test Post"))
        .unwrap();
    session
}

// ── Undo inverts execute ────────────────────────────────────────────────────

#[test]
fn undo_inverts_create_block() {
    let mut session = session_with_post();
    let block = session.create_block(BlockDraft::text(
        session.projection().post.as_ref().unwrap().id,
        "hello world",
    ))
    .unwrap();
    assert_eq!(session.projection().blocks.len(), 1);

    session.undo().unwrap();
    assert!(session.projection().blocks.is_empty());
    assert!(matches!(
        session.db().block(block.id, BlockKind::Text),
        Err(StoreError::BlockNotFound(_))
    ));
}

#[test]
fn undo_inverts_update_block() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let block = session
        .create_block(BlockDraft::quote(post_id, "original"))
        .unwrap();

    session
        .update_block(
            block.id,
            BlockKind::Quote,
            BlockPatch::with_body(BlockBody::Quote {
                quote: "edited".into(),
                attribution: Some("me".into()),
            }),
        )
        .unwrap();

    session.undo().unwrap();
    let restored = session.db().block(block.id, BlockKind::Quote).unwrap();
    assert_eq!(restored, block);
    assert_eq!(session.projection().blocks[0], block);
}

#[test]
fn undo_of_delete_recreates_with_fresh_id() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let block = session
        .create_block(BlockDraft::gallery(
            post_id,
            vec![GalleryImage::new("https://a.jpg", 0).with_caption("cap")],
        ))
        .unwrap();

    session.delete_block(block.id, BlockKind::Gallery).unwrap();
    assert!(session.projection().blocks.is_empty());

    session.undo().unwrap();
    let restored = &session.projection().blocks[0];
    assert_ne!(restored.id, block.id);
    assert!(restored.content_eq(&block));

    // Redo must delete the re-created row, not the original id.
    let restored_id = restored.id;
    session.redo().unwrap();
    assert!(session.projection().blocks.is_empty());
    assert!(matches!(
        session.db().block(restored_id, BlockKind::Gallery),
        Err(StoreError::BlockNotFound(_))
    ));
}

// ── Redo reproduces execute ─────────────────────────────────────────────────

#[test]
fn redo_reproduces_create() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let block = session
        .create_block(BlockDraft::text(post_id, "alpha beta"))
        .unwrap();

    session.undo().unwrap();
    session.redo().unwrap();

    let redone = &session.projection().blocks[0];
    // Fresh id, same content and position.
    assert_ne!(redone.id, block.id);
    assert!(redone.content_eq(&block));
    assert_eq!(redone.position, block.position);
}

// ── History truncation ──────────────────────────────────────────────────────

#[test]
fn truncation_after_undo_discards_redo_tail() {
    // [A, B, C] → undo ×2 → D → effective history [A, D].
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    session.create_block(BlockDraft::text(post_id, "A")).unwrap();
    session.create_block(BlockDraft::text(post_id, "B")).unwrap();
    session.create_block(BlockDraft::text(post_id, "C")).unwrap();

    session.undo().unwrap();
    session.undo().unwrap();
    session.create_block(BlockDraft::text(post_id, "D")).unwrap();

    assert!(!session.can_redo());
    let bodies: Vec<String> = session
        .projection()
        .blocks
        .iter()
        .map(|b| match &b.body {
            BlockBody::Text { body } => body.clone(),
            other => panic!("expected text, got {other:?}"),
        })
        .collect();
    assert_eq!(bodies, vec!["A", "D"]);

    session.undo().unwrap(); // removes D
    session.undo().unwrap(); // removes A
    assert!(session.projection().blocks.is_empty());
    // Only the post creation itself is left to undo.
    assert_eq!(session.undo_label(), Some("create post"));
}

// ── Position order ──────────────────────────────────────────────────────────

#[test]
fn explicit_position_insert_keeps_total_order() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    session.create_block(BlockDraft::text(post_id, "first")).unwrap();
    session.create_block(BlockDraft::quote(post_id, "second")).unwrap();
    session
        .create_block(BlockDraft::code(post_id, "fn x() {}").at_position(1))
        .unwrap();

    let positions: Vec<u32> = session.projection().blocks.iter().map(|b| b.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    let kinds: Vec<BlockKind> = session.projection().blocks.iter().map(|b| b.kind()).collect();
    assert_eq!(kinds, vec![BlockKind::Text, BlockKind::Code, BlockKind::Quote]);
}

// ── Bulk move ───────────────────────────────────────────────────────────────

#[test]
fn move_scenario_and_exact_undo() -> Result<()> {
    // [T@0, I@1, Q@2] → [I@0, Q@1, T@2], then undo restores exactly.
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let t = session.create_block(BlockDraft::text(post_id, "T"))?;
    let i = session.create_block(BlockDraft::gallery(
        post_id,
        vec![GalleryImage::new("https://i.jpg", 0)],
    ))?;
    let q = session.create_block(BlockDraft::quote(post_id, "Q"))?;

    session.move_blocks(vec![
        BlockMove::new(t.id, BlockKind::Text, 2),
        BlockMove::new(i.id, BlockKind::Gallery, 0),
        BlockMove::new(q.id, BlockKind::Quote, 1),
    ])?;
    let order: Vec<_> = session.projection().blocks.iter().map(|b| b.id).collect();
    assert_eq!(order, vec![i.id, q.id, t.id]);

    session.undo()?;
    let blocks = &session.projection().blocks;
    assert_eq!(blocks.iter().map(|b| b.id).collect::<Vec<_>>(), vec![t.id, i.id, q.id]);
    assert_eq!(blocks.iter().map(|b| b.position).collect::<Vec<_>>(), vec![0, 1, 2]);
    Ok(())
}

#[test]
fn failed_bulk_move_changes_nothing() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let t = session.create_block(BlockDraft::text(post_id, "T")).unwrap();
    let q = session.create_block(BlockDraft::quote(post_id, "Q")).unwrap();
    let undo_depth_before = session.can_undo();

    let err = session
        .move_blocks(vec![
            BlockMove::new(t.id, BlockKind::Text, 1),
            // Wrong kind for an existing block: whole batch must fail.
            BlockMove::new(q.id, BlockKind::Video, 0),
        ])
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Store(StoreError::KindMismatch { .. })
    ));

    // Nothing moved, history untouched, error surfaced on the projection.
    let positions: Vec<u32> = session.projection().blocks.iter().map(|b| b.position).collect();
    assert_eq!(positions, vec![0, 1]);
    assert_eq!(session.can_undo(), undo_depth_before);
    assert!(session.projection().last_error.is_some());

    // The next successful entry point clears the error.
    session.create_block(BlockDraft::text(post_id, "ok")).unwrap();
    assert!(session.projection().last_error.is_none());
}

// ── Guards ──────────────────────────────────────────────────────────────────

#[test]
fn operations_without_loaded_post_are_rejected() {
    init_tracing();
    let mut session = EditorSession::new(ContentDb::in_memory().unwrap());
    let err = session.update_post(PostPatch::retitle("nope")).unwrap_err();
    assert!(matches!(err, EditorError::NoPostLoaded));
    assert!(session.projection().last_error.is_some());

    assert!(matches!(
        session.publish_post(),
        Err(EditorError::NoPostLoaded)
    ));
    assert!(matches!(
        session.update_tracker(TrackerInput::new("x", 1, 0)),
        Err(EditorError::NoPostLoaded)
    ));
}

#[test]
fn undo_redo_guards() {
    let mut session = session_with_post();
    // create_post is undoable, so drain it first.
    session.undo().unwrap();
    assert!(matches!(session.undo(), Err(EditorError::NothingToUndo)));
    session.redo().unwrap();
    assert!(matches!(session.redo(), Err(EditorError::NothingToRedo)));
}

// ── History resets ──────────────────────────────────────────────────────────

#[test]
fn whole_post_update_resets_history() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    session.create_block(BlockDraft::text(post_id, "x")).unwrap();
    assert!(session.can_undo());

    session.update_post(PostPatch::retitle("Renamed")).unwrap();
    assert!(!session.can_undo());
    assert!(!session.can_redo());
    assert_eq!(
        session.projection().post.as_ref().unwrap().title,
        "Renamed"
    );
}

#[test]
fn bulk_tag_replacement_resets_history() {
    let mut session = session_with_post();
    session.create_tag(TagDraft::new("rust")).unwrap();
    let tag_id = session.projection().tags[0].id;
    assert!(session.can_undo());

    session.set_post_tags(vec![tag_id]).unwrap();
    assert!(!session.can_undo());
    assert_eq!(session.projection().post_tags.len(), 1);
}

#[test]
fn accept_server_state_resets_history_and_hydrates() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    session.create_block(BlockDraft::text(post_id, "one two three")).unwrap();
    assert!(session.can_undo());

    let bundle = session.db().load_bundle(post_id).unwrap();
    session.accept_server_state(bundle);
    assert!(!session.can_undo());
    assert!(!session.can_redo());
    assert_eq!(session.projection().blocks.len(), 1);
    assert_eq!(session.projection().analysis.words, 3);
}

// ── Post aggregate commands ─────────────────────────────────────────────────

#[test]
fn delete_post_undo_restores_aggregate_with_original_ids() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let block = session.create_block(BlockDraft::text(post_id, "body")).unwrap();
    session.create_tag(TagDraft::new("keep")).unwrap();
    let tag_id = session.projection().tags[0].id;
    session.db().set_post_tags(post_id, &[tag_id]).unwrap();
    session.update_tracker(TrackerInput::new("raised", 100, 40)).unwrap();
    let tracker_id = session.projection().tracker.as_ref().unwrap().id;

    session.delete_post().unwrap();
    assert!(session.projection().post.is_none());
    assert!(session.projection().blocks.is_empty());

    session.undo().unwrap();
    let projection = session.projection();
    assert_eq!(projection.post.as_ref().map(|p| p.id), Some(post_id));
    assert_eq!(projection.blocks.iter().map(|b| b.id).collect::<Vec<_>>(), vec![block.id]);
    assert_eq!(projection.post_tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![tag_id]);
    assert_eq!(projection.tracker.as_ref().map(|t| t.id), Some(tracker_id));
}

#[test]
fn publish_and_undo() {
    let mut session = session_with_post();
    session.publish_post().unwrap();
    let post = session.projection().post.as_ref().unwrap();
    assert!(post.published);
    assert!(post.published_at.is_some());

    session.undo().unwrap();
    let post = session.projection().post.as_ref().unwrap();
    assert!(!post.published);
    assert!(post.published_at.is_none());
}

#[test]
fn schedule_clears_on_undo_and_publish_clears_schedule() {
    let mut session = session_with_post();
    session.schedule_post(4_102_444_800_000).unwrap();
    assert!(session.projection().post.as_ref().unwrap().is_scheduled());

    session.publish_post().unwrap();
    let post = session.projection().post.as_ref().unwrap();
    assert!(post.published);
    assert!(post.scheduled_at.is_none());

    session.undo().unwrap(); // back to scheduled
    assert!(session.projection().post.as_ref().unwrap().is_scheduled());
    session.undo().unwrap(); // back to plain draft
    let post = session.projection().post.as_ref().unwrap();
    assert!(!post.is_scheduled());
    assert!(post.scheduled_at.is_none());
}

// ── Taxonomy commands ───────────────────────────────────────────────────────

#[test]
fn delete_category_undo_repoints_posts() {
    let mut session = session_with_post();
    session.create_category(CategoryDraft::new("News")).unwrap();
    let category_id = session.projection().categories[0].id;
    session.update_post(PostPatch::set_category(Some(category_id))).unwrap();
    assert_eq!(
        session.projection().post.as_ref().unwrap().category_id,
        Some(category_id)
    );

    session.delete_category(category_id).unwrap();
    // Post detached, vocabulary updated.
    assert!(session.projection().categories.is_empty());
    assert_eq!(session.projection().post.as_ref().unwrap().category_id, None);

    session.undo().unwrap();
    assert_eq!(session.projection().categories.len(), 1);
    assert_eq!(
        session.projection().post.as_ref().unwrap().category_id,
        Some(category_id)
    );
}

#[test]
fn delete_tag_undo_relinks_posts() {
    let mut session = session_with_post();
    session.create_tag(TagDraft::new("rust")).unwrap();
    let tag_id = session.projection().tags[0].id;
    session.set_post_tags(vec![tag_id]).unwrap();

    session.delete_tag(tag_id).unwrap();
    assert!(session.projection().tags.is_empty());
    assert!(session.projection().post_tags.is_empty());

    session.undo().unwrap();
    assert_eq!(session.projection().tags.len(), 1);
    assert_eq!(
        session.projection().post_tags.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![tag_id]
    );
}

// ── Tracker command ─────────────────────────────────────────────────────────

#[test]
fn tracker_undo_removes_when_none_existed() {
    let mut session = session_with_post();
    session.update_tracker(TrackerInput::new("signatures", 500, 10)).unwrap();
    assert!(session.projection().tracker.is_some());

    session.undo().unwrap();
    assert!(session.projection().tracker.is_none());

    session.redo().unwrap();
    assert_eq!(session.projection().tracker.as_ref().unwrap().progress, 10);
}

#[test]
fn tracker_undo_restores_prior_values() {
    let mut session = session_with_post();
    session.update_tracker(TrackerInput::new("raised", 100, 20)).unwrap();
    session.update_tracker(TrackerInput::new("raised", 100, 80)).unwrap();

    session.undo().unwrap();
    assert_eq!(session.projection().tracker.as_ref().unwrap().progress, 20);
}

// ── Analysis ────────────────────────────────────────────────────────────────

#[test]
fn analysis_tracks_block_edits() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let long = vec!["word"; 250].join(" ");
    session.create_block(BlockDraft::text(post_id, long)).unwrap();
    session.create_block(BlockDraft::twitter(post_id, "https://t")).unwrap();

    let analysis = session.projection().analysis;
    assert_eq!(analysis.words, 250);
    assert_eq!(analysis.reading_minutes, 2); // ceil(250 / 200)
    assert_eq!(analysis.block_count, 2);

    session.undo().unwrap(); // remove the twitter embed
    session.undo().unwrap(); // remove the text
    let analysis = session.projection().analysis;
    assert_eq!(analysis.words, 0);
    assert_eq!(analysis.reading_minutes, 0);
    assert_eq!(analysis.block_count, 0);
}

// ── Observers ───────────────────────────────────────────────────────────────

#[test]
fn observers_fire_on_success_and_failure() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let calls = Arc::new(AtomicUsize::new(0));
    let seen_error = Arc::new(AtomicUsize::new(0));

    let calls_inner = calls.clone();
    let errors_inner = seen_error.clone();
    let subscription = session.subscribe(move |projection| {
        calls_inner.fetch_add(1, Ordering::SeqCst);
        if projection.last_error.is_some() {
            errors_inner.fetch_add(1, Ordering::SeqCst);
        }
    });

    session.create_block(BlockDraft::text(post_id, "x")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Failing entry point still notifies, with the error visible.
    let bogus = BlockMove::new(inkstone_types::BlockId::new(), BlockKind::Text, 0);
    assert!(session.move_blocks(vec![bogus]).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(seen_error.load(Ordering::SeqCst), 1);

    session.unsubscribe(subscription);
    session.undo().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn observer_sees_fresh_undo_flags() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    let last_flags = Arc::new(std::sync::Mutex::new((false, false)));

    let flags_inner = last_flags.clone();
    session.subscribe(move |projection| {
        *flags_inner.lock().unwrap() = (projection.can_undo, projection.can_redo);
    });

    session.create_block(BlockDraft::text(post_id, "x")).unwrap();
    assert_eq!(*last_flags.lock().unwrap(), (true, false));

    session.undo().unwrap();
    assert_eq!(*last_flags.lock().unwrap(), (true, true)); // create_post still undoable
    session.undo().unwrap();
    assert_eq!(*last_flags.lock().unwrap(), (false, true));
}

// ── Open / hydrate from storage ─────────────────────────────────────────────

#[test]
fn open_post_loads_full_aggregate() {
    init_tracing();
    let db = ContentDb::in_memory().unwrap();
    let post = db.create_post(&PostDraft::new(AuthorId::new(), "Stored")).unwrap();
    db.create_block(&BlockDraft::text(post.id, "a b c d")).unwrap();
    let tag = db.create_tag(&TagDraft::new("stored")).unwrap();
    db.set_post_tags(post.id, &[tag.id]).unwrap();

    let mut session = EditorSession::new(db);
    session.open_post(post.id).unwrap();

    let projection = session.projection();
    assert_eq!(projection.post.as_ref().map(|p| p.id), Some(post.id));
    assert_eq!(projection.blocks.len(), 1);
    assert_eq!(projection.post_tags.len(), 1);
    assert_eq!(projection.analysis.words, 4);
    assert!(!session.can_undo());
}

#[test]
fn undo_labels_name_the_operations() {
    let mut session = session_with_post();
    let post_id = session.projection().post.as_ref().unwrap().id;
    session.create_block(BlockDraft::text(post_id, "x")).unwrap();
    assert_eq!(session.undo_label(), Some("create block"));
    session.undo().unwrap();
    assert_eq!(session.redo_label(), Some("create block"));
    assert_eq!(session.undo_label(), Some("create post"));
}
