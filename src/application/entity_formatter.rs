//! Conversion of message text plus formatting entities into Markdown.

use std::collections::HashMap;

use url::Url;

use crate::domain::{Entity, EntityError, EntityKind, RenderedDocument};

use super::offsets::Utf16Index;

/// Placeholder emitted for messages without any text.
pub const NO_TEXT_PLACEHOLDER: &str = "[No text content]";

/// Hosts serving public channel permalinks.
const PERMALINK_HOSTS: [&str; 3] = ["t.me", "telegram.me", "www.t.me"];

/// Channel-wide information needed to turn entities into links.
#[derive(Debug, Clone, Default)]
pub struct LinkContext {
    /// Exported channel name, without `@`.
    pub channel: String,
    /// Profile URLs for `MentionName` targets, keyed by user id.
    pub mention_urls: HashMap<i64, String>,
}

impl LinkContext {
    /// Context for a channel with no resolved mentions.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            mention_urls: HashMap::new(),
        }
    }

    /// Public permalink of a message in the exported channel.
    #[must_use]
    pub fn permalink(&self, message_id: i64) -> String {
        format!("https://t.me/{}/{message_id}", self.channel)
    }

    /// Message id if `url` is a permalink into the exported channel.
    #[must_use]
    pub fn local_message_id(&self, url: &str) -> Option<i64> {
        if self.channel.is_empty() {
            return None;
        }

        let parsed = Url::parse(url)
            .or_else(|_| Url::parse(&format!("https://{url}")))
            .ok()?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?;
        if !PERMALINK_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)) {
            return None;
        }

        let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
        let channel = segments.next()?;
        let id = segments.next()?;
        if segments.next().is_some() || !channel.eq_ignore_ascii_case(&self.channel) {
            return None;
        }
        if !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        id.parse().ok()
    }

    /// Link target for a `TextLink` entity.
    fn link_target(&self, url: &str) -> String {
        self.local_message_id(url)
            .map_or_else(|| url.to_string(), RenderedDocument::file_name_for)
    }

    /// Profile URL of a user mentioned by id.
    fn mention_target(&self, user_id: i64) -> String {
        self.mention_urls
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| user_id_link(user_id))
    }
}

/// Client link to a user known only by id.
#[must_use]
pub fn user_id_link(user_id: i64) -> String {
    format!("tg://user?id={user_id}")
}

/// Markdown produced from one text, plus the entities that could not be applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedText {
    pub markdown: String,
    pub malformed: Vec<EntityError>,
}

/// Format `text` with its entities as Markdown.
///
/// `text` must already be normalized; entity offsets are resolved against it as
/// UTF-16 code units. Entities are applied in the given order. One that is out of
/// bounds, splits a character or overlaps the previous one is skipped and its
/// span is left unstyled. Empty text yields [`NO_TEXT_PLACEHOLDER`].
#[must_use]
pub fn format_entities(text: &str, entities: &[Entity], ctx: &LinkContext) -> FormattedText {
    if text.is_empty() {
        return FormattedText {
            markdown: NO_TEXT_PLACEHOLDER.to_string(),
            malformed: Vec::new(),
        };
    }

    let index = Utf16Index::new(text);
    let mut out = String::with_capacity(text.len() + entities.len() * 8);
    let mut malformed = Vec::new();
    let mut cursor = 0;
    let mut previous_end = 0;

    for entity in entities {
        let range = match index.resolve(entity.offset, entity.length) {
            Ok(range) if range.start < cursor => Err(EntityError::Overlapping {
                offset: entity.offset,
                previous_end,
            }),
            other => other,
        };

        let range = match range {
            Ok(range) => range,
            Err(e) => {
                malformed.push(e);
                continue;
            }
        };

        out.push_str(&text[cursor..range.start]);
        push_styled(&mut out, &text[range.clone()], &entity.kind, ctx);

        cursor = range.end;
        previous_end = entity.offset + entity.length;
    }

    out.push_str(&text[cursor..]);

    FormattedText {
        markdown: out,
        malformed,
    }
}

/// Append `span` wrapped according to `kind`.
fn push_styled(out: &mut String, span: &str, kind: &EntityKind, ctx: &LinkContext) {
    match kind {
        EntityKind::Bold => wrap(out, "**", span, "**"),
        EntityKind::Italic => wrap(out, "*", span, "*"),
        EntityKind::Code => wrap(out, "`", span, "`"),
        EntityKind::Pre => wrap(out, "```", span, "```"),
        EntityKind::Strikethrough => wrap(out, "~~", span, "~~"),
        EntityKind::TextLink { url } => push_link(out, span, &ctx.link_target(url)),
        EntityKind::Mention => {
            let username = span.trim_start_matches('@');
            push_link(out, span, &format!("https://t.me/{username}"));
        }
        EntityKind::MentionName { user_id } => {
            push_link(out, span, &ctx.mention_target(*user_id));
        }
        EntityKind::Unknown => out.push_str(span),
    }
}

fn wrap(out: &mut String, open: &str, span: &str, close: &str) {
    out.push_str(open);
    out.push_str(span);
    out.push_str(close);
}

fn push_link(out: &mut String, span: &str, target: &str) {
    out.push('[');
    out.push_str(span);
    out.push_str("](");
    out.push_str(target);
    out.push(')');
}
