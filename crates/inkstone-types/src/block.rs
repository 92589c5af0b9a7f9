//! Block model: the tagged union of content units that make up a post.
//!
//! A post is an ordered sequence of heterogeneous blocks. Every block carries
//! the same envelope (id, owning post, integer `position`, display name,
//! timestamps) and one of 13 payload shapes ([`BlockBody`]). Each shape is
//! persisted in its own table; [`BlockKind`] is the discriminant used to pick
//! the table and to fan out reads.
//!
//! Composite kinds (gallery, instagram, poll, list) embed child rows that are
//! written and deleted together with the parent block.
//!
//! # Ordering
//!
//! `position` is a non-negative integer defining the block's place within its
//! post. The order is dense-enough, not dense: deletes leave gaps, ties are
//! broken by `created_at` then id. Sorting by `(position, created_at, id)`
//! always yields the author-intended sequence.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{BlockId, ItemId, PostId};
use crate::now_millis;

// ============================================================================
// BlockKind
// ============================================================================

/// Discriminant for the 13 block payload shapes.
///
/// Doubles as the storage-table selector: every kind has its own table, and
/// fan-out reads iterate [`BlockKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlockKind {
    Text,
    Gallery,
    Video,
    Quote,
    Callout,
    Code,
    Table,
    Twitter,
    Instagram,
    Chart,
    Poll,
    Heading,
    List,
}

impl BlockKind {
    /// Every kind, in a stable order. Fan-out reads and the position-shift
    /// algorithm iterate this.
    pub const ALL: [BlockKind; 13] = [
        BlockKind::Text,
        BlockKind::Gallery,
        BlockKind::Video,
        BlockKind::Quote,
        BlockKind::Callout,
        BlockKind::Code,
        BlockKind::Table,
        BlockKind::Twitter,
        BlockKind::Instagram,
        BlockKind::Chart,
        BlockKind::Poll,
        BlockKind::Heading,
        BlockKind::List,
    ];

    /// String form for storage keys and wire formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Gallery => "gallery",
            BlockKind::Video => "video",
            BlockKind::Quote => "quote",
            BlockKind::Callout => "callout",
            BlockKind::Code => "code",
            BlockKind::Table => "table",
            BlockKind::Twitter => "twitter",
            BlockKind::Instagram => "instagram",
            BlockKind::Chart => "chart",
            BlockKind::Poll => "poll",
            BlockKind::Heading => "heading",
            BlockKind::List => "list",
        }
    }

    /// Parse from the string form. Returns `None` for unknown kinds.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(BlockKind::Text),
            "gallery" => Some(BlockKind::Gallery),
            "video" => Some(BlockKind::Video),
            "quote" => Some(BlockKind::Quote),
            "callout" => Some(BlockKind::Callout),
            "code" => Some(BlockKind::Code),
            "table" => Some(BlockKind::Table),
            "twitter" => Some(BlockKind::Twitter),
            "instagram" => Some(BlockKind::Instagram),
            "chart" => Some(BlockKind::Chart),
            "poll" => Some(BlockKind::Poll),
            "heading" => Some(BlockKind::Heading),
            "list" => Some(BlockKind::List),
            _ => None,
        }
    }

    /// Human-facing label, used as the default block name.
    pub fn display_name(&self) -> &'static str {
        match self {
            BlockKind::Text => "Text",
            BlockKind::Gallery => "Gallery",
            BlockKind::Video => "Video",
            BlockKind::Quote => "Quote",
            BlockKind::Callout => "Callout",
            BlockKind::Code => "Code",
            BlockKind::Table => "Table",
            BlockKind::Twitter => "Twitter",
            BlockKind::Instagram => "Instagram",
            BlockKind::Chart => "Chart",
            BlockKind::Poll => "Poll",
            BlockKind::Heading => "Heading",
            BlockKind::List => "List",
        }
    }

    /// Whether this kind embeds child rows (written with the parent).
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            BlockKind::Gallery | BlockKind::Instagram | BlockKind::Poll | BlockKind::List
        )
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chart rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChartStyle {
    Bar,
    Line,
    Pie,
}

impl ChartStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartStyle::Bar => "bar",
            ChartStyle::Line => "line",
            ChartStyle::Pie => "pie",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bar" => Some(ChartStyle::Bar),
            "line" => Some(ChartStyle::Line),
            "pie" => Some(ChartStyle::Pie),
            _ => None,
        }
    }
}

impl fmt::Display for ChartStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Child rows (composite payloads)
// ============================================================================

/// One image in a gallery block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: ItemId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    /// Order within the gallery (independent of the block's own position).
    pub position: u32,
}

impl GalleryImage {
    pub fn new(url: impl Into<String>, position: u32) -> Self {
        Self {
            id: ItemId::new(),
            url: url.into(),
            caption: None,
            alt_text: None,
            position,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// One embedded post in an instagram block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstagramEmbed {
    pub id: ItemId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub position: u32,
}

impl InstagramEmbed {
    pub fn new(url: impl Into<String>, position: u32) -> Self {
        Self {
            id: ItemId::new(),
            url: url.into(),
            caption: None,
            position,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// One option in a poll block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: ItemId,
    pub label: String,
    pub votes: u32,
    pub position: u32,
}

impl PollOption {
    pub fn new(label: impl Into<String>, position: u32) -> Self {
        Self {
            id: ItemId::new(),
            label: label.into(),
            votes: 0,
            position,
        }
    }
}

/// One entry in a list block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ItemId,
    pub text: String,
    pub position: u32,
}

impl ListItem {
    pub fn new(text: impl Into<String>, position: u32) -> Self {
        Self {
            id: ItemId::new(),
            text: text.into(),
            position,
        }
    }
}

/// One data point in a chart block. Stored as JSON with the block row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

// ============================================================================
// BlockBody
// ============================================================================

/// The payload of a block — one variant per [`BlockKind`].
///
/// Serialized with an internal `kind` tag, so JSON of any variant is
/// self-describing: `{"kind":"quote","quote":"...","attribution":null}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockBody {
    Text {
        /// Markdown source.
        body: String,
    },
    Gallery {
        images: Vec<GalleryImage>,
    },
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Quote {
        quote: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribution: Option<String>,
    },
    Callout {
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    Code {
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Twitter {
        url: String,
    },
    Instagram {
        embeds: Vec<InstagramEmbed>,
    },
    Chart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        style: ChartStyle,
        points: Vec<ChartPoint>,
    },
    Poll {
        question: String,
        options: Vec<PollOption>,
    },
    Heading {
        text: String,
        /// 1..=6. Constructors clamp; direct construction is on the caller.
        level: u8,
    },
    List {
        ordered: bool,
        items: Vec<ListItem>,
    },
}

impl BlockBody {
    /// The discriminant for this payload.
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockBody::Text { .. } => BlockKind::Text,
            BlockBody::Gallery { .. } => BlockKind::Gallery,
            BlockBody::Video { .. } => BlockKind::Video,
            BlockBody::Quote { .. } => BlockKind::Quote,
            BlockBody::Callout { .. } => BlockKind::Callout,
            BlockBody::Code { .. } => BlockKind::Code,
            BlockBody::Table { .. } => BlockKind::Table,
            BlockBody::Twitter { .. } => BlockKind::Twitter,
            BlockBody::Instagram { .. } => BlockKind::Instagram,
            BlockBody::Chart { .. } => BlockKind::Chart,
            BlockBody::Poll { .. } => BlockKind::Poll,
            BlockBody::Heading { .. } => BlockKind::Heading,
            BlockBody::List { .. } => BlockKind::List,
        }
    }

    /// Prose word count, for reading-time analysis.
    ///
    /// Counts what a reader actually reads: body text, captions, questions,
    /// labels, cells. Code and embed URLs count zero.
    pub fn word_count(&self) -> usize {
        match self {
            BlockBody::Text { body } => words(body),
            BlockBody::Gallery { images } => {
                images.iter().map(|i| opt_words(i.caption.as_deref())).sum()
            }
            BlockBody::Video { caption, .. } => opt_words(caption.as_deref()),
            BlockBody::Quote { quote, attribution } => {
                words(quote) + opt_words(attribution.as_deref())
            }
            BlockBody::Callout { body, .. } => words(body),
            BlockBody::Code { caption, .. } => opt_words(caption.as_deref()),
            BlockBody::Table { columns, rows } => {
                let header: usize = columns.iter().map(|c| words(c)).sum();
                let cells: usize = rows
                    .iter()
                    .flat_map(|r| r.iter())
                    .map(|c| words(c))
                    .sum();
                header + cells
            }
            BlockBody::Twitter { .. } => 0,
            BlockBody::Instagram { embeds } => {
                embeds.iter().map(|e| opt_words(e.caption.as_deref())).sum()
            }
            BlockBody::Chart { title, .. } => opt_words(title.as_deref()),
            BlockBody::Poll { question, options } => {
                words(question) + options.iter().map(|o| words(&o.label)).sum::<usize>()
            }
            BlockBody::Heading { text, .. } => words(text),
            BlockBody::List { items, .. } => items.iter().map(|i| words(&i.text)).sum(),
        }
    }
}

fn words(s: &str) -> usize {
    s.split_whitespace().count()
}

fn opt_words(s: Option<&str>) -> usize {
    s.map(words).unwrap_or(0)
}

// ============================================================================
// Block
// ============================================================================

/// One content unit of a post: common envelope + typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub post_id: PostId,
    /// Place within the post's sequence. See the module docs on ordering.
    pub position: u32,
    /// Display label shown in the editor outline.
    pub name: String,
    pub created_at: u64,
    pub updated_at: u64,
    pub body: BlockBody,
}

impl Block {
    /// Create a block with a fresh id and current timestamps.
    pub fn new(post_id: PostId, position: u32, name: impl Into<String>, body: BlockBody) -> Self {
        let now = now_millis();
        Self {
            id: BlockId::new(),
            post_id,
            position,
            name: name.into(),
            created_at: now,
            updated_at: now,
            body,
        }
    }

    /// Materialize a draft at a resolved position. The repository decides the
    /// position (explicit target or append) and calls this.
    pub fn from_draft(draft: &BlockDraft, position: u32) -> Self {
        Self::new(draft.post_id, position, draft.name.clone(), draft.body.clone())
    }

    pub fn kind(&self) -> BlockKind {
        self.body.kind()
    }

    pub fn word_count(&self) -> usize {
        self.body.word_count()
    }

    /// Compare authored content, ignoring identity, position, and timestamps.
    ///
    /// Undo of a delete re-creates a block with a fresh id and possibly a
    /// shifted position; this is the equality that still must hold.
    pub fn content_eq(&self, other: &Block) -> bool {
        self.post_id == other.post_id && self.name == other.name && self.body == other.body
    }
}

/// Map a captured block back to the input that would create it.
///
/// Keyed by the payload tag: the returned draft targets the block's original
/// position and carries the payload (including child rows and their ids)
/// unchanged. Used by undo-of-delete and any path that re-creates from a
/// snapshot. The block id itself is not carried — creation always mints a
/// fresh one.
pub fn draft_from_block(block: &Block) -> BlockDraft {
    BlockDraft {
        post_id: block.post_id,
        name: block.name.clone(),
        position: Some(block.position),
        body: block.body.clone(),
    }
}

// ============================================================================
// Inputs: draft, patch, move
// ============================================================================

/// Input for creating a block.
///
/// `position: None` appends at the end; `Some(p)` inserts at `p`, shifting
/// every block at `p` or later down by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDraft {
    pub post_id: PostId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    pub body: BlockBody,
}

impl BlockDraft {
    /// Draft with an explicit payload. Name defaults to the kind's label.
    pub fn new(post_id: PostId, body: BlockBody) -> Self {
        Self {
            post_id,
            name: body.kind().display_name().to_string(),
            position: None,
            body,
        }
    }

    /// Set an explicit target position.
    pub fn at_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Override the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    // ── Per-kind conveniences ───────────────────────────────────────────

    pub fn text(post_id: PostId, body: impl Into<String>) -> Self {
        Self::new(post_id, BlockBody::Text { body: body.into() })
    }

    pub fn gallery(post_id: PostId, images: Vec<GalleryImage>) -> Self {
        Self::new(post_id, BlockBody::Gallery { images })
    }

    pub fn video(post_id: PostId, url: impl Into<String>) -> Self {
        Self::new(
            post_id,
            BlockBody::Video {
                url: url.into(),
                caption: None,
            },
        )
    }

    pub fn quote(post_id: PostId, quote: impl Into<String>) -> Self {
        Self::new(
            post_id,
            BlockBody::Quote {
                quote: quote.into(),
                attribution: None,
            },
        )
    }

    pub fn callout(post_id: PostId, body: impl Into<String>) -> Self {
        Self::new(
            post_id,
            BlockBody::Callout {
                body: body.into(),
                icon: None,
            },
        )
    }

    pub fn code(post_id: PostId, code: impl Into<String>) -> Self {
        Self::new(
            post_id,
            BlockBody::Code {
                code: code.into(),
                language: None,
                caption: None,
            },
        )
    }

    pub fn table(post_id: PostId, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self::new(post_id, BlockBody::Table { columns, rows })
    }

    pub fn twitter(post_id: PostId, url: impl Into<String>) -> Self {
        Self::new(post_id, BlockBody::Twitter { url: url.into() })
    }

    pub fn instagram(post_id: PostId, embeds: Vec<InstagramEmbed>) -> Self {
        Self::new(post_id, BlockBody::Instagram { embeds })
    }

    pub fn chart(post_id: PostId, style: ChartStyle, points: Vec<ChartPoint>) -> Self {
        Self::new(
            post_id,
            BlockBody::Chart {
                title: None,
                style,
                points,
            },
        )
    }

    pub fn poll(post_id: PostId, question: impl Into<String>, options: Vec<PollOption>) -> Self {
        Self::new(
            post_id,
            BlockBody::Poll {
                question: question.into(),
                options,
            },
        )
    }

    pub fn heading(post_id: PostId, level: u8, text: impl Into<String>) -> Self {
        Self::new(
            post_id,
            BlockBody::Heading {
                text: text.into(),
                level: level.clamp(1, 6),
            },
        )
    }

    pub fn list(post_id: PostId, ordered: bool, items: Vec<ListItem>) -> Self {
        Self::new(post_id, BlockBody::List { ordered, items })
    }
}

/// Input for updating a block. Empty fields are left untouched.
///
/// When `body` is set on a composite kind, its child rows are matched to the
/// stored ones by id: matched children are updated, unmatched ones inserted.
/// Children missing from the patch are kept — an update never deletes a child
/// implicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BlockBody>,
}

impl BlockPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            body: None,
        }
    }

    pub fn with_body(body: BlockBody) -> Self {
        Self {
            name: None,
            body: Some(body),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.body.is_none()
    }
}

/// One entry of a bulk reorder: which block (by id + kind) moves where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMove {
    pub id: BlockId,
    pub kind: BlockKind,
    pub position: u32,
}

impl BlockMove {
    pub fn new(id: BlockId, kind: BlockKind, position: u32) -> Self {
        Self { id, kind, position }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> PostId {
        PostId::new()
    }

    // ── BlockKind ───────────────────────────────────────────────────────

    #[test]
    fn test_kind_str_roundtrip() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_kind_from_unknown_str() {
        assert_eq!(BlockKind::from_str("hologram"), None);
    }

    #[test]
    fn test_kind_all_covers_13() {
        assert_eq!(BlockKind::ALL.len(), 13);
    }

    #[test]
    fn test_composite_kinds() {
        let composite: Vec<BlockKind> = BlockKind::ALL
            .into_iter()
            .filter(|k| k.is_composite())
            .collect();
        assert_eq!(
            composite,
            vec![
                BlockKind::Gallery,
                BlockKind::Instagram,
                BlockKind::Poll,
                BlockKind::List
            ]
        );
    }

    #[test]
    fn test_kind_display_matches_as_str() {
        assert_eq!(BlockKind::Gallery.to_string(), "gallery");
        assert_eq!(ChartStyle::Pie.to_string(), "pie");
    }

    // ── Body ↔ kind mapping ─────────────────────────────────────────────

    #[test]
    fn test_body_kind_mapping() {
        let draft_bodies = vec![
            BlockDraft::text(pid(), "hi").body,
            BlockDraft::gallery(pid(), vec![]).body,
            BlockDraft::video(pid(), "https://v").body,
            BlockDraft::quote(pid(), "q").body,
            BlockDraft::callout(pid(), "c").body,
            BlockDraft::code(pid(), "fn main() {}").body,
            BlockDraft::table(pid(), vec![], vec![]).body,
            BlockDraft::twitter(pid(), "https://t").body,
            BlockDraft::instagram(pid(), vec![]).body,
            BlockDraft::chart(pid(), ChartStyle::Bar, vec![]).body,
            BlockDraft::poll(pid(), "q?", vec![]).body,
            BlockDraft::heading(pid(), 2, "h").body,
            BlockDraft::list(pid(), true, vec![]).body,
        ];
        let kinds: Vec<BlockKind> = draft_bodies.iter().map(|b| b.kind()).collect();
        assert_eq!(kinds, BlockKind::ALL.to_vec());
    }

    #[test]
    fn test_heading_level_clamped() {
        let draft = BlockDraft::heading(pid(), 9, "too deep");
        match draft.body {
            BlockBody::Heading { level, .. } => assert_eq!(level, 6),
            _ => panic!("expected heading"),
        }
        let draft = BlockDraft::heading(pid(), 0, "too shallow");
        match draft.body {
            BlockBody::Heading { level, .. } => assert_eq!(level, 1),
            _ => panic!("expected heading"),
        }
    }

    // ── Serde ───────────────────────────────────────────────────────────

    #[test]
    fn test_body_json_is_kind_tagged() {
        let body = BlockBody::Quote {
            quote: "Fear is the mind-killer.".into(),
            attribution: Some("Herbert".into()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "quote");
        assert_eq!(json["quote"], "Fear is the mind-killer.");
    }

    #[test]
    fn test_block_serde_roundtrip() {
        let block = Block::new(
            pid(),
            3,
            "Intro",
            BlockBody::Chart {
                title: Some("Traffic".into()),
                style: ChartStyle::Line,
                points: vec![ChartPoint::new("Jan", 120.0), ChartPoint::new("Feb", 340.5)],
            },
        );
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, back);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let body = BlockBody::Video {
            url: "https://example.com/v.mp4".into(),
            caption: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("caption"));
    }

    // ── Word counts ─────────────────────────────────────────────────────

    #[test]
    fn test_word_count_text() {
        let body = BlockBody::Text {
            body: "one two  three\nfour".into(),
        };
        assert_eq!(body.word_count(), 4);
    }

    #[test]
    fn test_word_count_code_counts_caption_only() {
        let body = BlockBody::Code {
            code: "let x = 1; let y = 2;".into(),
            language: Some("rust".into()),
            caption: Some("two words".into()),
        };
        assert_eq!(body.word_count(), 2);
    }

    #[test]
    fn test_word_count_poll() {
        let body = BlockBody::Poll {
            question: "best editor block".into(),
            options: vec![PollOption::new("text", 0), PollOption::new("code block", 1)],
        };
        assert_eq!(body.word_count(), 3 + 1 + 2);
    }

    #[test]
    fn test_word_count_table() {
        let body = BlockBody::Table {
            columns: vec!["name".into(), "release year".into()],
            rows: vec![vec!["sqlite".into(), "2000".into()]],
        };
        assert_eq!(body.word_count(), 1 + 2 + 1 + 1);
    }

    #[test]
    fn test_word_count_twitter_is_zero() {
        let body = BlockBody::Twitter {
            url: "https://twitter.com/x/status/1".into(),
        };
        assert_eq!(body.word_count(), 0);
    }

    // ── Draft / patch / snapshot mapping ────────────────────────────────

    #[test]
    fn test_draft_default_name_is_kind_label() {
        assert_eq!(BlockDraft::text(pid(), "x").name, "Text");
        assert_eq!(BlockDraft::gallery(pid(), vec![]).name, "Gallery");
    }

    #[test]
    fn test_draft_chainers() {
        let draft = BlockDraft::text(pid(), "x").named("Lede").at_position(2);
        assert_eq!(draft.name, "Lede");
        assert_eq!(draft.position, Some(2));
    }

    #[test]
    fn test_draft_from_block_preserves_payload_and_position() {
        let images = vec![
            GalleryImage::new("https://a.jpg", 0).with_caption("first"),
            GalleryImage::new("https://b.jpg", 1),
        ];
        let block = Block::new(pid(), 5, "Shots", BlockBody::Gallery { images: images.clone() });

        let draft = draft_from_block(&block);
        assert_eq!(draft.post_id, block.post_id);
        assert_eq!(draft.name, "Shots");
        assert_eq!(draft.position, Some(5));
        assert_eq!(draft.body, BlockBody::Gallery { images });
    }

    #[test]
    fn test_from_draft_mints_fresh_identity() {
        let original = Block::new(pid(), 0, "Text", BlockBody::Text { body: "hi".into() });
        let draft = draft_from_block(&original);
        let recreated = Block::from_draft(&draft, original.position);

        assert_ne!(recreated.id, original.id);
        assert!(recreated.content_eq(&original));
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(BlockPatch::default().is_empty());
        assert!(!BlockPatch::rename("x").is_empty());
        assert!(!BlockPatch::with_body(BlockBody::Text { body: "b".into() }).is_empty());
    }

    // ── content_eq ──────────────────────────────────────────────────────

    #[test]
    fn test_content_eq_ignores_identity_and_position() {
        let post = pid();
        let a = Block::new(post, 0, "Q", BlockBody::Quote { quote: "q".into(), attribution: None });
        let mut b = a.clone();
        b.id = BlockId::new();
        b.position = 7;
        b.created_at += 1000;
        assert!(a.content_eq(&b));
    }

    #[test]
    fn test_content_eq_detects_payload_change() {
        let post = pid();
        let a = Block::new(post, 0, "Q", BlockBody::Quote { quote: "q".into(), attribution: None });
        let mut b = a.clone();
        b.body = BlockBody::Quote {
            quote: "q".into(),
            attribution: Some("someone".into()),
        };
        assert!(!a.content_eq(&b));
    }
}
