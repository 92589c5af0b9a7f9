//! SQLite persistence for posts, blocks, taxonomy, and trackers.
//!
//! Each of the 13 block kinds gets its own table with the common envelope
//! columns (id, post_id, position, name, timestamps) plus that kind's payload
//! columns. Composite kinds (gallery, instagram, poll, list) store child rows
//! in separate tables keyed by the parent block, deleted by FK cascade.
//!
//! All multi-row operations — position shifting on insert, bulk moves,
//! composite child writes, tag-set replacement — run inside one transaction.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use inkstone_types::{
    Block, BlockBody, BlockDraft, BlockId, BlockKind, BlockMove, BlockPatch, Category,
    CategoryDraft, CategoryId, CategoryPatch, ChartPoint, ChartStyle, GalleryImage,
    InstagramEmbed, ItemId, ListItem, PollOption, Post, PostBundle, PostDraft, PostId, PostPatch,
    ProgressTracker, Tag, TagDraft, TagId, TagPatch, TrackerInput,
};

use crate::error::StoreError;
use crate::Result;

/// Database handle for all content persistence.
pub struct ContentDb {
    conn: Connection,
}

const SCHEMA: &str = r#"
-- Posts (publication envelope)
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    author TEXT NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    excerpt TEXT,
    category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    featured INTEGER NOT NULL DEFAULT 0,
    published INTEGER NOT NULL DEFAULT 0,
    published_at INTEGER,
    scheduled_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_posts_updated ON posts(updated_at DESC);

-- Taxonomy
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS post_tags (
    post_id TEXT NOT NULL,
    tag_id TEXT NOT NULL,
    PRIMARY KEY (post_id, tag_id),
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

-- Progress trackers (at most one per post)
CREATE TABLE IF NOT EXISTS progress_trackers (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL UNIQUE,
    label TEXT NOT NULL,
    goal INTEGER NOT NULL,
    progress INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

-- Block tables: one per kind, common envelope + payload columns
CREATE TABLE IF NOT EXISTS text_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    body TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_text_blocks_pos ON text_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS gallery_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_gallery_blocks_pos ON gallery_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS video_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    url TEXT NOT NULL,
    caption TEXT,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_video_blocks_pos ON video_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS quote_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    quote TEXT NOT NULL,
    attribution TEXT,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_quote_blocks_pos ON quote_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS callout_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    body TEXT NOT NULL,
    icon TEXT,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_callout_blocks_pos ON callout_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS code_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    code TEXT NOT NULL,
    language TEXT,
    caption TEXT,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_code_blocks_pos ON code_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS table_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    columns_json TEXT NOT NULL,
    rows_json TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_table_blocks_pos ON table_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS twitter_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    url TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_twitter_blocks_pos ON twitter_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS instagram_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_instagram_blocks_pos ON instagram_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS chart_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    title TEXT,
    style TEXT NOT NULL,
    points_json TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_chart_blocks_pos ON chart_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS poll_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    question TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_poll_blocks_pos ON poll_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS heading_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    text TEXT NOT NULL,
    level INTEGER NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_heading_blocks_pos ON heading_blocks(post_id, position);

CREATE TABLE IF NOT EXISTS list_blocks (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    ordered INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_list_blocks_pos ON list_blocks(post_id, position);

-- Child rows for composite payloads
CREATE TABLE IF NOT EXISTS gallery_images (
    id TEXT PRIMARY KEY,
    block_id TEXT NOT NULL,
    url TEXT NOT NULL,
    caption TEXT,
    alt_text TEXT,
    position INTEGER NOT NULL,
    FOREIGN KEY (block_id) REFERENCES gallery_blocks(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_gallery_images_block ON gallery_images(block_id, position);

CREATE TABLE IF NOT EXISTS instagram_embeds (
    id TEXT PRIMARY KEY,
    block_id TEXT NOT NULL,
    url TEXT NOT NULL,
    caption TEXT,
    position INTEGER NOT NULL,
    FOREIGN KEY (block_id) REFERENCES instagram_blocks(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_instagram_embeds_block ON instagram_embeds(block_id, position);

CREATE TABLE IF NOT EXISTS poll_options (
    id TEXT PRIMARY KEY,
    block_id TEXT NOT NULL,
    label TEXT NOT NULL,
    votes INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL,
    FOREIGN KEY (block_id) REFERENCES poll_blocks(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_poll_options_block ON poll_options(block_id, position);

CREATE TABLE IF NOT EXISTS list_items (
    id TEXT PRIMARY KEY,
    block_id TEXT NOT NULL,
    text TEXT NOT NULL,
    position INTEGER NOT NULL,
    FOREIGN KEY (block_id) REFERENCES list_blocks(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_list_items_block ON list_items(block_id, position);
"#;

/// Table name for a block kind.
fn table(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Text => "text_blocks",
        BlockKind::Gallery => "gallery_blocks",
        BlockKind::Video => "video_blocks",
        BlockKind::Quote => "quote_blocks",
        BlockKind::Callout => "callout_blocks",
        BlockKind::Code => "code_blocks",
        BlockKind::Table => "table_blocks",
        BlockKind::Twitter => "twitter_blocks",
        BlockKind::Instagram => "instagram_blocks",
        BlockKind::Chart => "chart_blocks",
        BlockKind::Poll => "poll_blocks",
        BlockKind::Heading => "heading_blocks",
        BlockKind::List => "list_blocks",
    }
}

/// Payload columns appended to the common envelope in SELECTs, per kind.
fn payload_columns(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Text => ", body",
        BlockKind::Gallery => "",
        BlockKind::Video => ", url, caption",
        BlockKind::Quote => ", quote, attribution",
        BlockKind::Callout => ", body, icon",
        BlockKind::Code => ", code, language, caption",
        BlockKind::Table => ", columns_json, rows_json",
        BlockKind::Twitter => ", url",
        BlockKind::Instagram => "",
        BlockKind::Chart => ", title, style, points_json",
        BlockKind::Poll => ", question",
        BlockKind::Heading => ", text, level",
        BlockKind::List => ", ordered",
    }
}

// =============================================================================
// Row Structs (module-private helpers)
// =============================================================================

/// Common envelope columns of every block table, as read.
#[derive(Debug)]
struct RawEnvelope {
    id: String,
    post_id: String,
    position: i64,
    name: String,
    created_at: i64,
    updated_at: i64,
}

/// Payload columns of one block table, as read — JSON columns and child rows
/// are resolved later, outside the row-mapping closure.
#[derive(Debug)]
enum RawPayload {
    Text { body: String },
    Gallery,
    Video { url: String, caption: Option<String> },
    Quote { quote: String, attribution: Option<String> },
    Callout { body: String, icon: Option<String> },
    Code { code: String, language: Option<String>, caption: Option<String> },
    Table { columns: String, rows: String },
    Twitter { url: String },
    Instagram,
    Chart { title: Option<String>, style: String, points: String },
    Poll { question: String },
    Heading { text: String, level: i64 },
    List { ordered: bool },
}

/// Map one row of a block table: envelope at columns 0..=5, payload after.
fn map_block_row(
    kind: BlockKind,
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(RawEnvelope, RawPayload)> {
    let envelope = RawEnvelope {
        id: row.get(0)?,
        post_id: row.get(1)?,
        position: row.get(2)?,
        name: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    };
    let payload = match kind {
        BlockKind::Text => RawPayload::Text { body: row.get(6)? },
        BlockKind::Gallery => RawPayload::Gallery,
        BlockKind::Video => RawPayload::Video {
            url: row.get(6)?,
            caption: row.get(7)?,
        },
        BlockKind::Quote => RawPayload::Quote {
            quote: row.get(6)?,
            attribution: row.get(7)?,
        },
        BlockKind::Callout => RawPayload::Callout {
            body: row.get(6)?,
            icon: row.get(7)?,
        },
        BlockKind::Code => RawPayload::Code {
            code: row.get(6)?,
            language: row.get(7)?,
            caption: row.get(8)?,
        },
        BlockKind::Table => RawPayload::Table {
            columns: row.get(6)?,
            rows: row.get(7)?,
        },
        BlockKind::Twitter => RawPayload::Twitter { url: row.get(6)? },
        BlockKind::Instagram => RawPayload::Instagram,
        BlockKind::Chart => RawPayload::Chart {
            title: row.get(6)?,
            style: row.get(7)?,
            points: row.get(8)?,
        },
        BlockKind::Poll => RawPayload::Poll { question: row.get(6)? },
        BlockKind::Heading => RawPayload::Heading {
            text: row.get(6)?,
            level: row.get(7)?,
        },
        BlockKind::List => RawPayload::List {
            ordered: row.get::<_, i64>(6)? != 0,
        },
    };
    Ok((envelope, payload))
}

/// Turn a raw row into a [`Block`], parsing ids and JSON and fetching child
/// rows for composite kinds.
fn finish_block(conn: &Connection, envelope: RawEnvelope, payload: RawPayload) -> Result<Block> {
    let id = BlockId::parse(&envelope.id)?;
    let post_id = PostId::parse(&envelope.post_id)?;

    let body = match payload {
        RawPayload::Text { body } => BlockBody::Text { body },
        RawPayload::Gallery => BlockBody::Gallery {
            images: load_gallery_images(conn, id)?,
        },
        RawPayload::Video { url, caption } => BlockBody::Video { url, caption },
        RawPayload::Quote { quote, attribution } => BlockBody::Quote { quote, attribution },
        RawPayload::Callout { body, icon } => BlockBody::Callout { body, icon },
        RawPayload::Code { code, language, caption } => BlockBody::Code { code, language, caption },
        RawPayload::Table { columns, rows } => BlockBody::Table {
            columns: serde_json::from_str(&columns)?,
            rows: serde_json::from_str(&rows)?,
        },
        RawPayload::Twitter { url } => BlockBody::Twitter { url },
        RawPayload::Instagram => BlockBody::Instagram {
            embeds: load_instagram_embeds(conn, id)?,
        },
        RawPayload::Chart { title, style, points } => BlockBody::Chart {
            title,
            style: ChartStyle::from_str(&style)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown chart style: {style}")))?,
            points: serde_json::from_str::<Vec<ChartPoint>>(&points)?,
        },
        RawPayload::Poll { question } => BlockBody::Poll {
            question,
            options: load_poll_options(conn, id)?,
        },
        RawPayload::Heading { text, level } => BlockBody::Heading {
            text,
            level: level.clamp(1, 6) as u8,
        },
        RawPayload::List { ordered } => BlockBody::List {
            ordered,
            items: load_list_items(conn, id)?,
        },
    };

    Ok(Block {
        id,
        post_id,
        position: envelope.position.max(0) as u32,
        name: envelope.name,
        created_at: envelope.created_at as u64,
        updated_at: envelope.updated_at as u64,
        body,
    })
}

// =============================================================================
// Block row I/O (free functions taking &Connection so they compose under a
// Transaction, which derefs to Connection)
// =============================================================================

/// Insert a block's row(s): envelope + payload columns, plus child rows for
/// composite kinds. Ids and timestamps are written exactly as given, so this
/// doubles as the restore path.
fn insert_block_rows(conn: &Connection, block: &Block) -> Result<()> {
    let id = block.id.to_string();
    let post_id = block.post_id.to_string();
    let common = params![
        id,
        post_id,
        block.position as i64,
        block.name,
        block.created_at as i64,
        block.updated_at as i64,
    ];

    match &block.body {
        BlockBody::Text { body } => {
            conn.execute(
                "INSERT INTO text_blocks (id, post_id, position, name, created_at, updated_at, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, body],
            )?;
        }
        BlockBody::Gallery { images } => {
            conn.execute(
                "INSERT INTO gallery_blocks (id, post_id, position, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                common,
            )?;
            for image in images {
                insert_gallery_image(conn, block.id, image)?;
            }
        }
        BlockBody::Video { url, caption } => {
            conn.execute(
                "INSERT INTO video_blocks (id, post_id, position, name, created_at, updated_at, url, caption)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, url, caption],
            )?;
        }
        BlockBody::Quote { quote, attribution } => {
            conn.execute(
                "INSERT INTO quote_blocks (id, post_id, position, name, created_at, updated_at, quote, attribution)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, quote, attribution],
            )?;
        }
        BlockBody::Callout { body, icon } => {
            conn.execute(
                "INSERT INTO callout_blocks (id, post_id, position, name, created_at, updated_at, body, icon)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, body, icon],
            )?;
        }
        BlockBody::Code { code, language, caption } => {
            conn.execute(
                "INSERT INTO code_blocks (id, post_id, position, name, created_at, updated_at, code, language, caption)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, code, language, caption],
            )?;
        }
        BlockBody::Table { columns, rows } => {
            conn.execute(
                "INSERT INTO table_blocks (id, post_id, position, name, created_at, updated_at, columns_json, rows_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64,
                        serde_json::to_string(columns)?, serde_json::to_string(rows)?],
            )?;
        }
        BlockBody::Twitter { url } => {
            conn.execute(
                "INSERT INTO twitter_blocks (id, post_id, position, name, created_at, updated_at, url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, url],
            )?;
        }
        BlockBody::Instagram { embeds } => {
            conn.execute(
                "INSERT INTO instagram_blocks (id, post_id, position, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                common,
            )?;
            for embed in embeds {
                insert_instagram_embed(conn, block.id, embed)?;
            }
        }
        BlockBody::Chart { title, style, points } => {
            conn.execute(
                "INSERT INTO chart_blocks (id, post_id, position, name, created_at, updated_at, title, style, points_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64,
                        title, style.as_str(), serde_json::to_string(points)?],
            )?;
        }
        BlockBody::Poll { question, options } => {
            conn.execute(
                "INSERT INTO poll_blocks (id, post_id, position, name, created_at, updated_at, question)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, question],
            )?;
            for option in options {
                insert_poll_option(conn, block.id, option)?;
            }
        }
        BlockBody::Heading { text, level } => {
            conn.execute(
                "INSERT INTO heading_blocks (id, post_id, position, name, created_at, updated_at, text, level)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, text, *level as i64],
            )?;
        }
        BlockBody::List { ordered, items } => {
            conn.execute(
                "INSERT INTO list_blocks (id, post_id, position, name, created_at, updated_at, ordered)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, post_id, block.position as i64, block.name,
                        block.created_at as i64, block.updated_at as i64, *ordered as i64],
            )?;
            for item in items {
                insert_list_item(conn, block.id, item)?;
            }
        }
    }
    Ok(())
}

/// Read one block from its kind's table. `Ok(None)` means not in that table.
fn read_block(conn: &Connection, id: BlockId, kind: BlockKind) -> Result<Option<Block>> {
    let sql = format!(
        "SELECT id, post_id, position, name, created_at, updated_at{} FROM {} WHERE id = ?1",
        payload_columns(kind),
        table(kind)
    );
    let raw = conn
        .query_row(&sql, params![id.to_string()], |row| map_block_row(kind, row))
        .optional()?;
    match raw {
        Some((envelope, payload)) => Ok(Some(finish_block(conn, envelope, payload)?)),
        None => Ok(None),
    }
}

/// Read every block of one kind for one post.
fn read_blocks_of_kind(conn: &Connection, post_id: PostId, kind: BlockKind) -> Result<Vec<Block>> {
    let sql = format!(
        "SELECT id, post_id, position, name, created_at, updated_at{} FROM {} WHERE post_id = ?1 ORDER BY position",
        payload_columns(kind),
        table(kind)
    );
    let mut stmt = conn.prepare(&sql)?;
    let raws: Vec<(RawEnvelope, RawPayload)> = stmt
        .query_map(params![post_id.to_string()], |row| map_block_row(kind, row))?
        .collect::<rusqlite::Result<_>>()?;

    let mut blocks = Vec::with_capacity(raws.len());
    for (envelope, payload) in raws {
        blocks.push(finish_block(conn, envelope, payload)?);
    }
    Ok(blocks)
}

/// Fan-out read: all blocks for a post, merged across the 13 tables and
/// sorted by `(position, created_at, id)`.
fn read_blocks_by_post(conn: &Connection, post_id: PostId) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    for kind in BlockKind::ALL {
        blocks.extend(read_blocks_of_kind(conn, post_id, kind)?);
    }
    blocks.sort_by(|a, b| {
        (a.position, a.created_at, a.id).cmp(&(b.position, b.created_at, b.id))
    });
    Ok(blocks)
}

/// Which kind's table holds this id, if any. Used to tell a kind mismatch
/// from a plain not-found.
fn find_kind(conn: &Connection, id: BlockId) -> Result<Option<BlockKind>> {
    let id = id.to_string();
    for kind in BlockKind::ALL {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table(kind));
        let hit: Option<i64> = conn.query_row(&sql, params![id], |row| row.get(0)).optional()?;
        if hit.is_some() {
            return Ok(Some(kind));
        }
    }
    Ok(None)
}

/// The error for a block miss under `kind`: mismatch if it lives elsewhere,
/// not-found otherwise.
fn classify_block_miss(conn: &Connection, id: BlockId, kind: BlockKind) -> Result<StoreError> {
    Ok(match find_kind(conn, id)? {
        Some(actual) => StoreError::KindMismatch { id, requested: kind, actual },
        None => StoreError::BlockNotFound(id),
    })
}

/// Bump `position` by +1 for every block of the post at `from` or later,
/// across all 13 tables. Must run inside the caller's transaction, before
/// the insert it makes room for.
fn shift_positions_from(conn: &Connection, post_id: PostId, from: u32) -> Result<()> {
    let post_id = post_id.to_string();
    for kind in BlockKind::ALL {
        let sql = format!(
            "UPDATE {} SET position = position + 1 WHERE post_id = ?1 AND position >= ?2",
            table(kind)
        );
        conn.execute(&sql, params![post_id, from as i64])?;
    }
    Ok(())
}

/// `max(position) + 1` across all 13 tables, or 0 for a post with no blocks.
fn next_position(conn: &Connection, post_id: PostId) -> Result<u32> {
    let post_id = post_id.to_string();
    let mut max: Option<i64> = None;
    for kind in BlockKind::ALL {
        let sql = format!("SELECT MAX(position) FROM {} WHERE post_id = ?1", table(kind));
        let kind_max: Option<i64> = conn.query_row(&sql, params![post_id], |row| row.get(0))?;
        max = match (max, kind_max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
    Ok(max.map(|m| (m + 1).max(0) as u32).unwrap_or(0))
}

fn post_exists(conn: &Connection, post_id: PostId) -> Result<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM posts WHERE id = ?1",
            params![post_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

// ── Child-row helpers ───────────────────────────────────────────────────────

fn insert_gallery_image(conn: &Connection, block_id: BlockId, image: &GalleryImage) -> Result<()> {
    conn.execute(
        "INSERT INTO gallery_images (id, block_id, url, caption, alt_text, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            image.id.to_string(),
            block_id.to_string(),
            image.url,
            image.caption,
            image.alt_text,
            image.position as i64,
        ],
    )?;
    Ok(())
}

fn update_gallery_image(conn: &Connection, image: &GalleryImage) -> Result<()> {
    conn.execute(
        "UPDATE gallery_images SET url = ?2, caption = ?3, alt_text = ?4, position = ?5 WHERE id = ?1",
        params![
            image.id.to_string(),
            image.url,
            image.caption,
            image.alt_text,
            image.position as i64,
        ],
    )?;
    Ok(())
}

fn load_gallery_images(conn: &Connection, block_id: BlockId) -> Result<Vec<GalleryImage>> {
    let mut stmt = conn.prepare(
        "SELECT id, url, caption, alt_text, position FROM gallery_images
         WHERE block_id = ?1 ORDER BY position",
    )?;
    let rows: Vec<(String, String, Option<String>, Option<String>, i64)> = stmt
        .query_map(params![block_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<rusqlite::Result<_>>()?;

    let mut images = Vec::with_capacity(rows.len());
    for (id, url, caption, alt_text, position) in rows {
        images.push(GalleryImage {
            id: ItemId::parse(&id)?,
            url,
            caption,
            alt_text,
            position: position.max(0) as u32,
        });
    }
    Ok(images)
}

fn insert_instagram_embed(conn: &Connection, block_id: BlockId, embed: &InstagramEmbed) -> Result<()> {
    conn.execute(
        "INSERT INTO instagram_embeds (id, block_id, url, caption, position)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            embed.id.to_string(),
            block_id.to_string(),
            embed.url,
            embed.caption,
            embed.position as i64,
        ],
    )?;
    Ok(())
}

fn update_instagram_embed(conn: &Connection, embed: &InstagramEmbed) -> Result<()> {
    conn.execute(
        "UPDATE instagram_embeds SET url = ?2, caption = ?3, position = ?4 WHERE id = ?1",
        params![embed.id.to_string(), embed.url, embed.caption, embed.position as i64],
    )?;
    Ok(())
}

fn load_instagram_embeds(conn: &Connection, block_id: BlockId) -> Result<Vec<InstagramEmbed>> {
    let mut stmt = conn.prepare(
        "SELECT id, url, caption, position FROM instagram_embeds
         WHERE block_id = ?1 ORDER BY position",
    )?;
    let rows: Vec<(String, String, Option<String>, i64)> = stmt
        .query_map(params![block_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<rusqlite::Result<_>>()?;

    let mut embeds = Vec::with_capacity(rows.len());
    for (id, url, caption, position) in rows {
        embeds.push(InstagramEmbed {
            id: ItemId::parse(&id)?,
            url,
            caption,
            position: position.max(0) as u32,
        });
    }
    Ok(embeds)
}

fn insert_poll_option(conn: &Connection, block_id: BlockId, option: &PollOption) -> Result<()> {
    conn.execute(
        "INSERT INTO poll_options (id, block_id, label, votes, position)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            option.id.to_string(),
            block_id.to_string(),
            option.label,
            option.votes as i64,
            option.position as i64,
        ],
    )?;
    Ok(())
}

fn update_poll_option(conn: &Connection, option: &PollOption) -> Result<()> {
    conn.execute(
        "UPDATE poll_options SET label = ?2, votes = ?3, position = ?4 WHERE id = ?1",
        params![option.id.to_string(), option.label, option.votes as i64, option.position as i64],
    )?;
    Ok(())
}

fn load_poll_options(conn: &Connection, block_id: BlockId) -> Result<Vec<PollOption>> {
    let mut stmt = conn.prepare(
        "SELECT id, label, votes, position FROM poll_options
         WHERE block_id = ?1 ORDER BY position",
    )?;
    let rows: Vec<(String, String, i64, i64)> = stmt
        .query_map(params![block_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<rusqlite::Result<_>>()?;

    let mut options = Vec::with_capacity(rows.len());
    for (id, label, votes, position) in rows {
        options.push(PollOption {
            id: ItemId::parse(&id)?,
            label,
            votes: votes.max(0) as u32,
            position: position.max(0) as u32,
        });
    }
    Ok(options)
}

fn insert_list_item(conn: &Connection, block_id: BlockId, item: &ListItem) -> Result<()> {
    conn.execute(
        "INSERT INTO list_items (id, block_id, text, position) VALUES (?1, ?2, ?3, ?4)",
        params![
            item.id.to_string(),
            block_id.to_string(),
            item.text,
            item.position as i64,
        ],
    )?;
    Ok(())
}

fn update_list_item(conn: &Connection, item: &ListItem) -> Result<()> {
    conn.execute(
        "UPDATE list_items SET text = ?2, position = ?3 WHERE id = ?1",
        params![item.id.to_string(), item.text, item.position as i64],
    )?;
    Ok(())
}

fn load_list_items(conn: &Connection, block_id: BlockId) -> Result<Vec<ListItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, text, position FROM list_items WHERE block_id = ?1 ORDER BY position",
    )?;
    let rows: Vec<(String, String, i64)> = stmt
        .query_map(params![block_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<rusqlite::Result<_>>()?;

    let mut items = Vec::with_capacity(rows.len());
    for (id, text, position) in rows {
        items.push(ListItem {
            id: ItemId::parse(&id)?,
            text,
            position: position.max(0) as u32,
        });
    }
    Ok(items)
}

// =============================================================================
// Post / taxonomy / tracker row I/O
// =============================================================================

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author: row.get(1)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        excerpt: row.get(4)?,
        category_id: row.get(5)?,
        featured: row.get::<_, i64>(6)? != 0,
        published: row.get::<_, i64>(7)? != 0,
        published_at: row.get(8)?,
        scheduled_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[derive(Debug)]
struct PostRow {
    id: String,
    author: String,
    title: String,
    slug: String,
    excerpt: Option<String>,
    category_id: Option<String>,
    featured: bool,
    published: bool,
    published_at: Option<i64>,
    scheduled_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl PostRow {
    fn into_post(self) -> Result<Post> {
        Ok(Post {
            id: PostId::parse(&self.id)?,
            author: inkstone_types::AuthorId::parse(&self.author)?,
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            category_id: self.category_id.as_deref().map(CategoryId::parse).transpose()?,
            featured: self.featured,
            published: self.published,
            published_at: self.published_at.map(|t| t as u64),
            scheduled_at: self.scheduled_at.map(|t| t as u64),
            created_at: self.created_at as u64,
            updated_at: self.updated_at as u64,
        })
    }
}

const POST_COLUMNS: &str = "id, author, title, slug, excerpt, category_id, featured, published, \
                            published_at, scheduled_at, created_at, updated_at";

fn read_post(conn: &Connection, id: PostId) -> Result<Option<Post>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], map_post_row)
        .optional()?;
    row.map(PostRow::into_post).transpose()
}

/// Full-row write, insert-or-update. Used both by the normal update path and
/// by undo restores; never deletes, so FK cascades cannot fire.
fn upsert_post(conn: &Connection, post: &Post) -> Result<()> {
    conn.execute(
        "INSERT INTO posts (id, author, title, slug, excerpt, category_id, featured, published,
                            published_at, scheduled_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
            author = excluded.author, title = excluded.title, slug = excluded.slug,
            excerpt = excluded.excerpt, category_id = excluded.category_id,
            featured = excluded.featured, published = excluded.published,
            published_at = excluded.published_at, scheduled_at = excluded.scheduled_at,
            created_at = excluded.created_at, updated_at = excluded.updated_at",
        params![
            post.id.to_string(),
            post.author.to_string(),
            post.title,
            post.slug,
            post.excerpt,
            post.category_id.map(|c| c.to_string()),
            post.featured as i64,
            post.published as i64,
            post.published_at.map(|t| t as i64),
            post.scheduled_at.map(|t| t as i64),
            post.created_at as i64,
            post.updated_at as i64,
        ],
    )?;
    Ok(())
}

fn read_category(conn: &Connection, id: CategoryId) -> Result<Option<Category>> {
    let row: Option<(String, String, String, Option<String>)> = conn
        .query_row(
            "SELECT id, name, slug, description FROM categories WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;
    match row {
        Some((id, name, slug, description)) => Ok(Some(Category {
            id: CategoryId::parse(&id)?,
            name,
            slug,
            description,
        })),
        None => Ok(None),
    }
}

fn upsert_category(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories (id, name, slug, description) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name, slug = excluded.slug, description = excluded.description",
        params![category.id.to_string(), category.name, category.slug, category.description],
    )?;
    Ok(())
}

fn read_tag(conn: &Connection, id: TagId) -> Result<Option<Tag>> {
    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT id, name, slug FROM tags WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    match row {
        Some((id, name, slug)) => Ok(Some(Tag { id: TagId::parse(&id)?, name, slug })),
        None => Ok(None),
    }
}

fn upsert_tag(conn: &Connection, tag: &Tag) -> Result<()> {
    conn.execute(
        "INSERT INTO tags (id, name, slug) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, slug = excluded.slug",
        params![tag.id.to_string(), tag.name, tag.slug],
    )?;
    Ok(())
}

fn read_tags_for_post(conn: &Connection, post_id: PostId) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.slug FROM tags t
         JOIN post_tags pt ON pt.tag_id = t.id
         WHERE pt.post_id = ?1 ORDER BY t.name",
    )?;
    let rows: Vec<(String, String, String)> = stmt
        .query_map(params![post_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<rusqlite::Result<_>>()?;

    let mut tags = Vec::with_capacity(rows.len());
    for (id, name, slug) in rows {
        tags.push(Tag { id: TagId::parse(&id)?, name, slug });
    }
    Ok(tags)
}

fn read_tracker(conn: &Connection, post_id: PostId) -> Result<Option<ProgressTracker>> {
    let row: Option<(String, String, String, i64, i64, i64, i64)> = conn
        .query_row(
            "SELECT id, post_id, label, goal, progress, created_at, updated_at
             FROM progress_trackers WHERE post_id = ?1",
            params![post_id.to_string()],
            |row| {
                Ok((
                    row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?,
                    row.get(4)?, row.get(5)?, row.get(6)?,
                ))
            },
        )
        .optional()?;
    match row {
        Some((id, post_id, label, goal, progress, created_at, updated_at)) => {
            Ok(Some(ProgressTracker {
                id: inkstone_types::TrackerId::parse(&id)?,
                post_id: PostId::parse(&post_id)?,
                label,
                goal: goal.max(0) as u32,
                progress: progress.max(0) as u32,
                created_at: created_at as u64,
                updated_at: updated_at as u64,
            }))
        }
        None => Ok(None),
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// =============================================================================
// ContentDb
// =============================================================================

impl ContentDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // =========================================================================
    // Block repository
    // =========================================================================

    /// Insert a block from a draft.
    ///
    /// With an explicit target position, every existing block of the post at
    /// that position or later is shifted +1 first — across all 13 tables,
    /// inside the same transaction. Without one, the block appends at
    /// `max(position) + 1` (0 for an empty post). Composite child rows land
    /// in the same transaction.
    pub fn create_block(&self, draft: &BlockDraft) -> Result<Block> {
        let tx = self.conn.unchecked_transaction()?;
        if !post_exists(&tx, draft.post_id)? {
            return Err(StoreError::PostNotFound(draft.post_id));
        }
        let position = match draft.position {
            Some(target) => {
                shift_positions_from(&tx, draft.post_id, target)?;
                target
            }
            None => next_position(&tx, draft.post_id)?,
        };
        let block = Block::from_draft(draft, position);
        insert_block_rows(&tx, &block)?;
        tx.commit()?;
        debug!(block = %block.id, kind = %block.kind(), position, "created block");
        Ok(block)
    }

    /// Read one block by id and kind.
    pub fn block(&self, id: BlockId, kind: BlockKind) -> Result<Block> {
        match read_block(&self.conn, id, kind)? {
            Some(block) => Ok(block),
            None => Err(classify_block_miss(&self.conn, id, kind)?),
        }
    }

    /// Apply a patch to a block.
    ///
    /// A composite payload in the patch upserts child rows by id: matched
    /// children are updated in place, unmatched ones are inserted with fresh
    /// ids. Children absent from the patch are kept — an update never deletes
    /// a child implicitly. Bumps `updated_at`.
    pub fn update_block(&self, id: BlockId, kind: BlockKind, patch: &BlockPatch) -> Result<Block> {
        let tx = self.conn.unchecked_transaction()?;
        let mut block = match read_block(&tx, id, kind)? {
            Some(block) => block,
            None => return Err(classify_block_miss(&tx, id, kind)?),
        };

        if let Some(name) = &patch.name {
            block.name = name.clone();
        }
        if let Some(body) = &patch.body {
            if body.kind() != kind {
                return Err(StoreError::KindMismatch {
                    id,
                    requested: body.kind(),
                    actual: kind,
                });
            }
            block.body = merge_body(&tx, id, block.body, body)?;
        }
        block.updated_at = now_millis();
        write_block_update(&tx, &block)?;
        tx.commit()?;
        debug!(block = %id, kind = %kind, "updated block");
        Ok(block)
    }

    /// Write a captured block back, exactly as captured.
    ///
    /// Replaces the row and its whole child set, keeping the captured ids,
    /// positions, and timestamps. This is the undo path: inversion must be
    /// exact, so it does not go through the upsert-merging update.
    pub fn restore_block(&self, block: &Block) -> Result<Block> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table(block.kind())),
            params![block.id.to_string()],
        )?;
        insert_block_rows(&tx, block)?;
        tx.commit()?;
        debug!(block = %block.id, kind = %block.kind(), "restored block");
        Ok(block.clone())
    }

    /// Delete a block. Child rows cascade.
    pub fn delete_block(&self, id: BlockId, kind: BlockKind) -> Result<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table(kind)),
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(classify_block_miss(&self.conn, id, kind)?);
        }
        debug!(block = %id, kind = %kind, "deleted block");
        Ok(())
    }

    /// All blocks for a post, merged across the 13 tables and sorted by
    /// `(position, created_at, id)`.
    pub fn blocks_by_post(&self, post_id: PostId) -> Result<Vec<Block>> {
        read_blocks_by_post(&self.conn, post_id)
    }

    /// Bulk reorder: apply every position write in one transaction.
    ///
    /// Each entry is validated before anything is written; one unknown id or
    /// wrong kind fails the whole batch with no positions changed. Returns
    /// the post's blocks re-read in the new order. This is the primitive the
    /// reorder UI uses, and undo of a reorder replays the previous positions
    /// through it.
    pub fn move_blocks(&self, moves: &[BlockMove]) -> Result<Vec<Block>> {
        if moves.is_empty() {
            return Ok(Vec::new());
        }
        let tx = self.conn.unchecked_transaction()?;

        // Validate first: the batch is all-or-nothing.
        let mut post_id = None;
        for mv in moves {
            let sql = format!("SELECT post_id FROM {} WHERE id = ?1", table(mv.kind));
            let owner: Option<String> = tx
                .query_row(&sql, params![mv.id.to_string()], |row| row.get(0))
                .optional()?;
            match owner {
                Some(owner) => {
                    if post_id.is_none() {
                        post_id = Some(PostId::parse(&owner)?);
                    }
                }
                None => {
                    let err = classify_block_miss(&tx, mv.id, mv.kind)?;
                    warn!(block = %mv.id, kind = %mv.kind, %err, "bulk move rejected");
                    return Err(err);
                }
            }
        }

        let now = now_millis() as i64;
        for mv in moves {
            let sql = format!(
                "UPDATE {} SET position = ?2, updated_at = ?3 WHERE id = ?1",
                table(mv.kind)
            );
            tx.execute(&sql, params![mv.id.to_string(), mv.position as i64, now])?;
        }

        // Non-empty batch: the first validated entry resolved the post.
        let Some(post_id) = post_id else {
            return Ok(Vec::new());
        };
        let blocks = read_blocks_by_post(&tx, post_id)?;
        tx.commit()?;
        debug!(post = %post_id, count = moves.len(), "moved blocks");
        Ok(blocks)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post from a draft.
    pub fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        let post = Post::from_draft(draft);
        upsert_post(&self.conn, &post)?;
        debug!(post = %post.id, slug = %post.slug, "created post");
        Ok(post)
    }

    /// Read one post.
    pub fn post(&self, id: PostId) -> Result<Post> {
        read_post(&self.conn, id)?.ok_or(StoreError::PostNotFound(id))
    }

    /// Apply a patch to a post. Bumps `updated_at`.
    pub fn update_post(&self, id: PostId, patch: &PostPatch) -> Result<Post> {
        let mut post = self.post(id)?;
        if let Some(title) = &patch.title {
            post.title = title.clone();
        }
        if let Some(slug) = &patch.slug {
            post.slug = slug.clone();
        }
        if let Some(excerpt) = &patch.excerpt {
            post.excerpt = excerpt.clone();
        }
        if let Some(category_id) = patch.category_id {
            post.category_id = category_id;
        }
        if let Some(featured) = patch.featured {
            post.featured = featured;
        }
        post.updated_at = now_millis();
        upsert_post(&self.conn, &post)?;
        debug!(post = %id, "updated post");
        Ok(post)
    }

    /// Full-row write-back of a captured post. Used by undo restores.
    pub fn put_post(&self, post: &Post) -> Result<()> {
        upsert_post(&self.conn, post)
    }

    /// Delete a post. Blocks (and their children), tag links, and the
    /// tracker cascade.
    pub fn delete_post(&self, id: PostId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::PostNotFound(id));
        }
        debug!(post = %id, "deleted post");
        Ok(())
    }

    /// Mark a post live: `published = true`, stamp `published_at`, clear any
    /// pending schedule.
    pub fn publish_post(&self, id: PostId) -> Result<Post> {
        let mut post = self.post(id)?;
        let now = now_millis();
        post.published = true;
        post.published_at = Some(now);
        post.scheduled_at = None;
        post.updated_at = now;
        upsert_post(&self.conn, &post)?;
        debug!(post = %id, "published post");
        Ok(post)
    }

    /// Schedule a future publication: set `scheduled_at`, unset published.
    pub fn schedule_post(&self, id: PostId, at: u64) -> Result<Post> {
        let mut post = self.post(id)?;
        post.scheduled_at = Some(at);
        post.published = false;
        post.published_at = None;
        post.updated_at = now_millis();
        upsert_post(&self.conn, &post)?;
        debug!(post = %id, at, "scheduled post");
        Ok(post)
    }

    /// Ids of posts in a category.
    pub fn posts_with_category(&self, category_id: CategoryId) -> Result<Vec<PostId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM posts WHERE category_id = ?1")?;
        let ids: Vec<String> = stmt
            .query_map(params![category_id.to_string()], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        ids.iter().map(|s| Ok(PostId::parse(s)?)).collect()
    }

    /// Ids of posts carrying a tag.
    pub fn posts_with_tag(&self, tag_id: TagId) -> Result<Vec<PostId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT post_id FROM post_tags WHERE tag_id = ?1")?;
        let ids: Vec<String> = stmt
            .query_map(params![tag_id.to_string()], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        ids.iter().map(|s| Ok(PostId::parse(s)?)).collect()
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
        let category = Category::from_draft(draft);
        upsert_category(&self.conn, &category)?;
        debug!(category = %category.id, name = %category.name, "created category");
        Ok(category)
    }

    pub fn category(&self, id: CategoryId) -> Result<Category> {
        read_category(&self.conn, id)?.ok_or(StoreError::CategoryNotFound(id))
    }

    /// All categories, by name.
    pub fn categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, slug, description FROM categories ORDER BY name")?;
        let rows: Vec<(String, String, String, Option<String>)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<rusqlite::Result<_>>()?;

        let mut categories = Vec::with_capacity(rows.len());
        for (id, name, slug, description) in rows {
            categories.push(Category {
                id: CategoryId::parse(&id)?,
                name,
                slug,
                description,
            });
        }
        Ok(categories)
    }

    pub fn update_category(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category> {
        let mut category = self.category(id)?;
        if let Some(name) = &patch.name {
            category.name = name.clone();
        }
        if let Some(slug) = &patch.slug {
            category.slug = slug.clone();
        }
        if let Some(description) = &patch.description {
            category.description = description.clone();
        }
        upsert_category(&self.conn, &category)?;
        Ok(category)
    }

    /// Full-row write-back of a captured category. Used by undo restores.
    pub fn put_category(&self, category: &Category) -> Result<()> {
        upsert_category(&self.conn, category)
    }

    /// Delete a category. Posts referencing it are detached (`category_id`
    /// set to NULL), not deleted.
    pub fn delete_category(&self, id: CategoryId) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM categories WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::CategoryNotFound(id));
        }
        debug!(category = %id, "deleted category");
        Ok(())
    }

    // =========================================================================
    // Tags
    // =========================================================================

    pub fn create_tag(&self, draft: &TagDraft) -> Result<Tag> {
        let tag = Tag::from_draft(draft);
        upsert_tag(&self.conn, &tag)?;
        debug!(tag = %tag.id, name = %tag.name, "created tag");
        Ok(tag)
    }

    pub fn tag(&self, id: TagId) -> Result<Tag> {
        read_tag(&self.conn, id)?.ok_or(StoreError::TagNotFound(id))
    }

    /// All tags, by name.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, slug FROM tags ORDER BY name")?;
        let rows: Vec<(String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut tags = Vec::with_capacity(rows.len());
        for (id, name, slug) in rows {
            tags.push(Tag { id: TagId::parse(&id)?, name, slug });
        }
        Ok(tags)
    }

    pub fn update_tag(&self, id: TagId, patch: &TagPatch) -> Result<Tag> {
        let mut tag = self.tag(id)?;
        if let Some(name) = &patch.name {
            tag.name = name.clone();
        }
        if let Some(slug) = &patch.slug {
            tag.slug = slug.clone();
        }
        upsert_tag(&self.conn, &tag)?;
        Ok(tag)
    }

    /// Full-row write-back of a captured tag. Used by undo restores.
    pub fn put_tag(&self, tag: &Tag) -> Result<()> {
        upsert_tag(&self.conn, tag)
    }

    /// Delete a tag. Its post links cascade away.
    pub fn delete_tag(&self, id: TagId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?1", params![id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::TagNotFound(id));
        }
        debug!(tag = %id, "deleted tag");
        Ok(())
    }

    /// Replace a post's tag set in one transaction. Every tag id must exist.
    /// Returns the post's tags after the write.
    pub fn set_post_tags(&self, post_id: PostId, tag_ids: &[TagId]) -> Result<Vec<Tag>> {
        let tx = self.conn.unchecked_transaction()?;
        if !post_exists(&tx, post_id)? {
            return Err(StoreError::PostNotFound(post_id));
        }
        for tag_id in tag_ids {
            if read_tag(&tx, *tag_id)?.is_none() {
                warn!(tag = %tag_id, "tag-set replacement rejected, unknown tag");
                return Err(StoreError::TagNotFound(*tag_id));
            }
        }
        tx.execute(
            "DELETE FROM post_tags WHERE post_id = ?1",
            params![post_id.to_string()],
        )?;
        for tag_id in tag_ids {
            tx.execute(
                "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
                params![post_id.to_string(), tag_id.to_string()],
            )?;
        }
        let tags = read_tags_for_post(&tx, post_id)?;
        tx.commit()?;
        debug!(post = %post_id, count = tags.len(), "replaced post tags");
        Ok(tags)
    }

    /// Tags attached to a post, by name.
    pub fn tags_for_post(&self, post_id: PostId) -> Result<Vec<Tag>> {
        read_tags_for_post(&self.conn, post_id)
    }

    /// Attach one tag to one post, keeping any existing links. Used when
    /// undoing a tag deletion re-links the posts that carried it.
    pub fn link_post_tag(&self, post_id: PostId, tag_id: TagId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
            params![post_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    }

    // =========================================================================
    // Progress trackers
    // =========================================================================

    /// The post's tracker, if it has one.
    pub fn tracker_for_post(&self, post_id: PostId) -> Result<Option<ProgressTracker>> {
        read_tracker(&self.conn, post_id)
    }

    /// Create-or-update the post's tracker. An existing row keeps its id and
    /// `created_at`.
    pub fn upsert_tracker(&self, post_id: PostId, input: &TrackerInput) -> Result<ProgressTracker> {
        match read_tracker(&self.conn, post_id)? {
            Some(mut tracker) => {
                tracker.label = input.label.clone();
                tracker.goal = input.goal;
                tracker.progress = input.progress;
                tracker.updated_at = now_millis();
                self.conn.execute(
                    "UPDATE progress_trackers SET label = ?2, goal = ?3, progress = ?4, updated_at = ?5
                     WHERE post_id = ?1",
                    params![
                        post_id.to_string(),
                        tracker.label,
                        tracker.goal as i64,
                        tracker.progress as i64,
                        tracker.updated_at as i64,
                    ],
                )?;
                debug!(post = %post_id, "updated tracker");
                Ok(tracker)
            }
            None => {
                if !post_exists(&self.conn, post_id)? {
                    return Err(StoreError::PostNotFound(post_id));
                }
                let tracker = ProgressTracker::new(post_id, input);
                self.conn.execute(
                    "INSERT INTO progress_trackers (id, post_id, label, goal, progress, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        tracker.id.to_string(),
                        post_id.to_string(),
                        tracker.label,
                        tracker.goal as i64,
                        tracker.progress as i64,
                        tracker.created_at as i64,
                        tracker.updated_at as i64,
                    ],
                )?;
                debug!(post = %post_id, "created tracker");
                Ok(tracker)
            }
        }
    }

    /// Full-row write-back of a captured tracker. Used by undo restores.
    pub fn put_tracker(&self, tracker: &ProgressTracker) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM progress_trackers WHERE post_id = ?1",
            params![tracker.post_id.to_string()],
        )?;
        tx.execute(
            "INSERT INTO progress_trackers (id, post_id, label, goal, progress, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tracker.id.to_string(),
                tracker.post_id.to_string(),
                tracker.label,
                tracker.goal as i64,
                tracker.progress as i64,
                tracker.created_at as i64,
                tracker.updated_at as i64,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove a post's tracker.
    pub fn delete_tracker(&self, post_id: PostId) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM progress_trackers WHERE post_id = ?1",
            params![post_id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::TrackerNotFound(post_id));
        }
        debug!(post = %post_id, "deleted tracker");
        Ok(())
    }

    // =========================================================================
    // Aggregate reads
    // =========================================================================

    /// Everything an editing session needs to hydrate for one post.
    pub fn load_bundle(&self, post_id: PostId) -> Result<PostBundle> {
        Ok(PostBundle {
            post: self.post(post_id)?,
            blocks: self.blocks_by_post(post_id)?,
            categories: self.categories()?,
            tags: self.tags()?,
            post_tags: self.tags_for_post(post_id)?,
            tracker: self.tracker_for_post(post_id)?,
        })
    }
}

/// Merge a patch body into the stored one.
///
/// Scalar kinds replace wholesale. Composite kinds upsert children by id:
/// an id matching a stored child updates that row in place; anything else
/// (nil or unknown id) inserts with a fresh id. Stored children missing from
/// the patch stay.
fn merge_body(
    conn: &Connection,
    block_id: BlockId,
    current: BlockBody,
    patch: &BlockBody,
) -> Result<BlockBody> {
    Ok(match (current, patch) {
        (BlockBody::Gallery { images: existing }, BlockBody::Gallery { images: patched }) => {
            let mut merged = existing;
            for image in patched {
                if let Some(slot) = merged.iter_mut().find(|e| e.id == image.id) {
                    *slot = image.clone();
                    update_gallery_image(conn, slot)?;
                } else {
                    let mut fresh = image.clone();
                    fresh.id = ItemId::new();
                    insert_gallery_image(conn, block_id, &fresh)?;
                    merged.push(fresh);
                }
            }
            merged.sort_by_key(|i| i.position);
            BlockBody::Gallery { images: merged }
        }
        (BlockBody::Instagram { embeds: existing }, BlockBody::Instagram { embeds: patched }) => {
            let mut merged = existing;
            for embed in patched {
                if let Some(slot) = merged.iter_mut().find(|e| e.id == embed.id) {
                    *slot = embed.clone();
                    update_instagram_embed(conn, slot)?;
                } else {
                    let mut fresh = embed.clone();
                    fresh.id = ItemId::new();
                    insert_instagram_embed(conn, block_id, &fresh)?;
                    merged.push(fresh);
                }
            }
            merged.sort_by_key(|e| e.position);
            BlockBody::Instagram { embeds: merged }
        }
        (
            BlockBody::Poll { options: existing, .. },
            BlockBody::Poll { question, options: patched },
        ) => {
            let mut merged = existing;
            for option in patched {
                if let Some(slot) = merged.iter_mut().find(|e| e.id == option.id) {
                    *slot = option.clone();
                    update_poll_option(conn, slot)?;
                } else {
                    let mut fresh = option.clone();
                    fresh.id = ItemId::new();
                    insert_poll_option(conn, block_id, &fresh)?;
                    merged.push(fresh);
                }
            }
            merged.sort_by_key(|o| o.position);
            BlockBody::Poll {
                question: question.clone(),
                options: merged,
            }
        }
        (BlockBody::List { items: existing, .. }, BlockBody::List { ordered, items: patched }) => {
            let mut merged = existing;
            for item in patched {
                if let Some(slot) = merged.iter_mut().find(|e| e.id == item.id) {
                    *slot = item.clone();
                    update_list_item(conn, slot)?;
                } else {
                    let mut fresh = item.clone();
                    fresh.id = ItemId::new();
                    insert_list_item(conn, block_id, &fresh)?;
                    merged.push(fresh);
                }
            }
            merged.sort_by_key(|i| i.position);
            BlockBody::List {
                ordered: *ordered,
                items: merged,
            }
        }
        // Same-kind scalar payloads replace wholesale. The kind check in
        // update_block guarantees the variants match.
        (_, patched) => patched.clone(),
    })
}

/// Write the mutable columns of an already-validated block row. Child rows
/// were already written by [`merge_body`]; this covers envelope + scalar
/// payload columns.
fn write_block_update(conn: &Connection, block: &Block) -> Result<()> {
    let id = block.id.to_string();
    let name = &block.name;
    let updated = block.updated_at as i64;
    match &block.body {
        BlockBody::Text { body } => {
            conn.execute(
                "UPDATE text_blocks SET name = ?2, updated_at = ?3, body = ?4 WHERE id = ?1",
                params![id, name, updated, body],
            )?;
        }
        BlockBody::Gallery { .. } => {
            conn.execute(
                "UPDATE gallery_blocks SET name = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, name, updated],
            )?;
        }
        BlockBody::Video { url, caption } => {
            conn.execute(
                "UPDATE video_blocks SET name = ?2, updated_at = ?3, url = ?4, caption = ?5 WHERE id = ?1",
                params![id, name, updated, url, caption],
            )?;
        }
        BlockBody::Quote { quote, attribution } => {
            conn.execute(
                "UPDATE quote_blocks SET name = ?2, updated_at = ?3, quote = ?4, attribution = ?5 WHERE id = ?1",
                params![id, name, updated, quote, attribution],
            )?;
        }
        BlockBody::Callout { body, icon } => {
            conn.execute(
                "UPDATE callout_blocks SET name = ?2, updated_at = ?3, body = ?4, icon = ?5 WHERE id = ?1",
                params![id, name, updated, body, icon],
            )?;
        }
        BlockBody::Code { code, language, caption } => {
            conn.execute(
                "UPDATE code_blocks SET name = ?2, updated_at = ?3, code = ?4, language = ?5, caption = ?6 WHERE id = ?1",
                params![id, name, updated, code, language, caption],
            )?;
        }
        BlockBody::Table { columns, rows } => {
            conn.execute(
                "UPDATE table_blocks SET name = ?2, updated_at = ?3, columns_json = ?4, rows_json = ?5 WHERE id = ?1",
                params![id, name, updated, serde_json::to_string(columns)?, serde_json::to_string(rows)?],
            )?;
        }
        BlockBody::Twitter { url } => {
            conn.execute(
                "UPDATE twitter_blocks SET name = ?2, updated_at = ?3, url = ?4 WHERE id = ?1",
                params![id, name, updated, url],
            )?;
        }
        BlockBody::Instagram { .. } => {
            conn.execute(
                "UPDATE instagram_blocks SET name = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, name, updated],
            )?;
        }
        BlockBody::Chart { title, style, points } => {
            conn.execute(
                "UPDATE chart_blocks SET name = ?2, updated_at = ?3, title = ?4, style = ?5, points_json = ?6 WHERE id = ?1",
                params![id, name, updated, title, style.as_str(), serde_json::to_string(points)?],
            )?;
        }
        BlockBody::Poll { question, .. } => {
            conn.execute(
                "UPDATE poll_blocks SET name = ?2, updated_at = ?3, question = ?4 WHERE id = ?1",
                params![id, name, updated, question],
            )?;
        }
        BlockBody::Heading { text, level } => {
            conn.execute(
                "UPDATE heading_blocks SET name = ?2, updated_at = ?3, text = ?4, level = ?5 WHERE id = ?1",
                params![id, name, updated, text, *level as i64],
            )?;
        }
        BlockBody::List { ordered, .. } => {
            conn.execute(
                "UPDATE list_blocks SET name = ?2, updated_at = ?3, ordered = ?4 WHERE id = ?1",
                params![id, name, updated, *ordered as i64],
            )?;
        }
    }
    Ok(())
}
