//! Assembly of the full Markdown document for one message.

use std::fmt::Write as _;

use crate::domain::{AppError, Entity, RawMessage, RenderedDocument, Result};

use super::entity_formatter::{format_entities, LinkContext, NO_TEXT_PLACEHOLDER};
use super::offsets::normalize;

/// Render a message as a standalone Markdown document.
///
/// Layout: formatted body, media caption, alt texts, one link per inline
/// button, then a footer with the permalink and the message date.
///
/// # Errors
/// Returns `AppError::Render` if the message id cannot name a document or the
/// document cannot be assembled.
pub fn render_message(message: &RawMessage, ctx: &LinkContext) -> Result<RenderedDocument> {
    if message.id <= 0 {
        return Err(AppError::Render {
            message_id: message.id,
            message: "message id is not positive".into(),
        });
    }

    let mut body = format_text(message.id, &message.text, &message.entities, ctx);

    if let Some(media) = &message.media {
        if let Some((caption, entities)) = media.caption() {
            let caption = format_text(message.id, caption, entities, ctx);
            body.push_str("\n\n*Media Caption:* ");
            body.push_str(&caption);
        }

        for alt in media.alt_texts() {
            body.push_str("\n\n*Alt Text:* ");
            body.push_str(alt);
        }
    }

    if body.trim().is_empty() {
        body = NO_TEXT_PLACEHOLDER.to_string();
    }

    let mut content = body;
    content.push('\n');

    if let Some(markup) = &message.reply_markup {
        for button in markup.buttons() {
            writeln!(content, "[{}]({})", button.text, button.url)
                .map_err(|e| render_fault(message, e))?;
        }
    }

    content.push_str("\n---\n");
    writeln!(content, "[Original Post]({})", ctx.permalink(message.id))
        .map_err(|e| render_fault(message, e))?;
    writeln!(content, "Date: {}", message.date.format("%Y-%m-%d"))
        .map_err(|e| render_fault(message, e))?;

    Ok(RenderedDocument {
        message_id: message.id,
        content,
    })
}

/// Normalize once, then format. Malformed entities are logged and left unstyled.
fn format_text(message_id: i64, text: &str, entities: &[Entity], ctx: &LinkContext) -> String {
    let normalized = normalize(text);
    let formatted = format_entities(&normalized, entities, ctx);

    for error in &formatted.malformed {
        tracing::warn!(message_id, error = %error, "Skipping malformed entity");
    }

    formatted.markdown
}

fn render_fault(message: &RawMessage, err: std::fmt::Error) -> AppError {
    AppError::Render {
        message_id: message.id,
        message: err.to_string(),
    }
}
