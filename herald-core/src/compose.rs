#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_PREVIEW_LIMIT;
use crate::model::MessageKind;
use crate::push::NotificationPayload;

const ELLIPSIS: &str = "...";

/// How a one-to-one notification is worded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectPhrasing {
    /// Title carries the message, body names the sender.
    MessageAsTitle,
    /// Title names the sender, body carries the message preview.
    SenderAsTitle,
}

#[derive(Debug, Clone)]
pub struct NotificationComposer {
    preview_limit: usize,
    direct_phrasing: DirectPhrasing,
}

impl Default for NotificationComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationComposer {
    pub fn new() -> Self {
        Self {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            direct_phrasing: DirectPhrasing::SenderAsTitle,
        }
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    pub fn with_direct_phrasing(mut self, phrasing: DirectPhrasing) -> Self {
        self.direct_phrasing = phrasing;
        self
    }

    pub fn direct_phrasing(&self) -> DirectPhrasing {
        self.direct_phrasing
    }

    /// Body text for a message: a truncated preview for text, a fixed phrase
    /// for everything else.
    pub fn preview(&self, kind: &MessageKind, text: Option<&str>) -> String {
        match kind {
            MessageKind::Text => truncate(text.unwrap_or_default(), self.preview_limit),
            MessageKind::Image => "sent an image".to_string(),
            MessageKind::Video => "sent a video".to_string(),
            MessageKind::Audio => "sent a voice message".to_string(),
            MessageKind::Gif => "sent a GIF".to_string(),
            MessageKind::Other(_) => "sent an attachment".to_string(),
        }
    }

    /// Builds the title and body. `group_name` selects the group wording;
    /// without it the configured direct phrasing applies. The data map is
    /// left for the caller to fill.
    pub fn compose(
        &self,
        sender_name: &str,
        group_name: Option<&str>,
        kind: &MessageKind,
        text: Option<&str>,
    ) -> NotificationPayload {
        let preview = self.preview(kind, text);

        if let Some(group_name) = group_name {
            return NotificationPayload::new(format!("{} in {}", sender_name, group_name), preview);
        }

        match self.direct_phrasing {
            DirectPhrasing::MessageAsTitle => {
                let title = match (kind, text) {
                    (MessageKind::Text, Some(text)) => text.to_string(),
                    _ => preview,
                };
                NotificationPayload::new(
                    title,
                    format!("You received a new message from {}!", sender_name),
                )
            }
            DirectPhrasing::SenderAsTitle => {
                NotificationPayload::new(format!("New message from {}", sender_name), preview)
            }
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
