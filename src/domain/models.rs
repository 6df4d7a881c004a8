//! Domain models for exported channel messages.
//!
//! These models represent messages as fetched from a channel source and the
//! Markdown documents produced from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Style or link carried by an [`Entity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    Bold,
    Italic,
    Code,
    /// Preformatted block.
    Pre,
    Strikethrough,
    /// Text hyperlink with an explicit target.
    TextLink { url: String },
    /// `@username` mention; the span itself names the target.
    Mention,
    /// Mention of a user without a public username.
    MentionName { user_id: i64 },
    /// Any annotation this exporter does not know how to style.
    #[serde(other)]
    Unknown,
}

/// A formatting annotation over a span of message text.
///
/// `offset` and `length` are UTF-16 code units, as sent by the source protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub offset: usize,
    pub length: usize,
    #[serde(flatten)]
    pub kind: EntityKind,
}

impl Entity {
    /// Create an entity.
    #[must_use]
    pub const fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            kind,
        }
    }
}

/// Attribute attached to a document or video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttribute {
    /// Alternative text (stickers, custom emoji).
    #[serde(default)]
    pub alt: Option<String>,
    /// Original file name, when known.
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Media attached to a message. At most one per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Media {
    Document {
        #[serde(default)]
        attributes: Vec<MediaAttribute>,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        caption_entities: Vec<Entity>,
    },
    Video {
        #[serde(default)]
        attributes: Vec<MediaAttribute>,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        caption_entities: Vec<Entity>,
    },
    File {
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        caption_entities: Vec<Entity>,
    },
}

impl Media {
    /// Non-empty caption together with its own entity list.
    #[must_use]
    pub fn caption(&self) -> Option<(&str, &[Entity])> {
        let (caption, entities) = match self {
            Self::Document {
                caption,
                caption_entities,
                ..
            }
            | Self::Video {
                caption,
                caption_entities,
                ..
            }
            | Self::File {
                caption,
                caption_entities,
            } => (caption.as_deref(), caption_entities.as_slice()),
        };

        caption
            .filter(|c| !c.is_empty())
            .map(|c| (c, entities))
    }

    /// Attributes of the document or video (empty for generic files).
    #[must_use]
    pub fn attributes(&self) -> &[MediaAttribute] {
        match self {
            Self::Document { attributes, .. } | Self::Video { attributes, .. } => attributes,
            Self::File { .. } => &[],
        }
    }

    /// Every non-empty alt text, in attribute order.
    pub fn alt_texts(&self) -> impl Iterator<Item = &str> {
        self.attributes()
            .iter()
            .filter_map(|a| a.alt.as_deref())
            .filter(|alt| !alt.is_empty())
    }
}

/// Inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub url: String,
}

/// One row of inline keyboard buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonRow {
    #[serde(default)]
    pub buttons: Vec<Button>,
}

/// Inline keyboard attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMarkup {
    #[serde(default)]
    pub rows: Vec<ButtonRow>,
}

impl ReplyMarkup {
    /// Buttons in row-then-column order.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flat_map(|row| row.buttons.iter())
    }
}

/// Count of one reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    #[serde(default)]
    pub reaction: String,
    pub count: u64,
}

/// A message as fetched from the channel source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Source-assigned identifier, unique and increasing with time.
    pub id: i64,
    /// Author-entered text, possibly empty.
    #[serde(default)]
    pub text: String,
    /// Formatting entities over `text`, sorted by offset.
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(default)]
    pub reply_markup: Option<ReplyMarkup>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub forwards: Option<u64>,
    #[serde(default)]
    pub reactions: Vec<ReactionCount>,
}

impl RawMessage {
    /// Create a plain text message.
    #[must_use]
    pub fn new(id: i64, text: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            entities: Vec::new(),
            media: None,
            reply_markup: None,
            date,
            views: None,
            forwards: None,
            reactions: Vec::new(),
        }
    }

    /// Whether the message carries anything worth exporting.
    ///
    /// Messages without text and media (service messages, deleted posts) get
    /// no document, so a missing `{id}.md` can mean either "never exported" or
    /// "nothing to export"; the run summary counts the latter as `empty`.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.text.is_empty() || self.media.is_some()
    }

    /// Sum of all reaction counts.
    #[must_use]
    pub fn total_reactions(&self) -> u64 {
        self.reactions.iter().map(|r| r.count).sum()
    }

    /// Text used to describe this message in listings.
    ///
    /// Alt text of a document or video wins over the body; a generic file's
    /// caption wins over the body. Empty when nothing describes the message.
    #[must_use]
    pub fn excerpt_source(&self) -> &str {
        match &self.media {
            Some(media @ (Media::Document { .. } | Media::Video { .. })) => {
                media.alt_texts().last().unwrap_or(self.text.as_str())
            }
            Some(media @ Media::File { .. }) => {
                media.caption().map_or(self.text.as_str(), |(c, _)| c)
            }
            None => &self.text,
        }
    }

    /// First line of [`Self::excerpt_source`], capped at `max_chars` characters.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.excerpt_source()
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(max_chars)
            .collect()
    }
}

/// Final Markdown for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub message_id: i64,
    pub content: String,
}

impl RenderedDocument {
    /// Stable file name for a message id.
    #[must_use]
    pub fn file_name_for(message_id: i64) -> String {
        format!("{message_id}.md")
    }

    /// Stable file name for this document.
    #[must_use]
    pub fn file_name(&self) -> String {
        Self::file_name_for(self.message_id)
    }
}

/// A message that was fetched but not exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMessage {
    pub message_id: i64,
    pub reason: String,
}

/// Outcome of an export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    /// Pages fetched with at least one message.
    pub pages: usize,
    /// Messages fetched and examined.
    pub processed: usize,
    /// Documents written.
    pub documents_written: usize,
    /// Index entries written.
    pub index_entries: usize,
    /// Statistics rows written.
    pub stats_rows: usize,
    /// Messages without text or media.
    pub empty: usize,
    /// Messages that failed to render.
    pub skipped: Vec<SkippedMessage>,
    /// Whether the run stopped early on request.
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    #[test]
    fn test_entity_kind_deserializes_unknown_types() {
        let json = r#"[
            {"type": "bold", "offset": 0, "length": 5},
            {"type": "text_link", "offset": 6, "length": 4, "url": "https://example.com"},
            {"type": "spoiler", "offset": 11, "length": 2}
        ]"#;
        let entities: Vec<Entity> = serde_json::from_str(json).unwrap();

        assert_eq!(entities[0], Entity::new(EntityKind::Bold, 0, 5));
        assert_eq!(
            entities[1].kind,
            EntityKind::TextLink {
                url: "https://example.com".into()
            }
        );
        assert_eq!(entities[2].kind, EntityKind::Unknown);
    }

    #[test]
    fn test_media_caption_ignores_empty() {
        let media = Media::File {
            caption: Some(String::new()),
            caption_entities: Vec::new(),
        };
        assert!(media.caption().is_none());
    }

    #[test]
    fn test_excerpt_prefers_alt_text() {
        let mut msg = RawMessage::new(1, "body text", date());
        msg.media = Some(Media::Document {
            attributes: vec![
                MediaAttribute::default(),
                MediaAttribute {
                    alt: Some("😀".into()),
                    file_name: None,
                },
            ],
            caption: None,
            caption_entities: Vec::new(),
        });
        assert_eq!(msg.excerpt(200), "😀");
    }

    #[test]
    fn test_excerpt_takes_first_line_and_caps_chars() {
        let long = format!("{}\nsecond line", "é".repeat(300));
        let msg = RawMessage::new(1, long, date());
        let excerpt = msg.excerpt(200);
        assert_eq!(excerpt.chars().count(), 200);
        assert!(!excerpt.contains('\n'));
    }

    #[test]
    fn test_total_reactions() {
        let mut msg = RawMessage::new(1, "x", date());
        msg.reactions = vec![
            ReactionCount {
                reaction: "👍".into(),
                count: 3,
            },
            ReactionCount {
                reaction: "🔥".into(),
                count: 4,
            },
        ];
        assert_eq!(msg.total_reactions(), 7);
    }

    #[test]
    fn test_file_name_is_stable() {
        assert_eq!(RenderedDocument::file_name_for(42), "42.md");
    }
}
