//! Classification of inbound chat messages into [`ParsedContent`].
//!
//! Lengths are measured in characters, so Thai text truncates on character
//! boundaries rather than bytes.

use crate::extract::{extract_hashtags, extract_urls, strip_urls_and_hashtags};
use crate::models::{ContentType, InboundMessage, MessageKind, ParsedContent};

/// A message is a link when its first URL is longer than this fraction of the
/// whole trimmed message.
pub const LINK_DOMINANCE_RATIO: f64 = 0.5;

/// Maximum generated title length, ellipsis included.
pub const MAX_TITLE_CHARS: usize = 50;

/// Title given to every image item.
pub const IMAGE_TITLE: &str = "รูปภาพ";

const ELLIPSIS: &str = "...";

/// Derive a short title from free text.
///
/// Hashtags and URLs are removed first; when nothing is left the original
/// text is used instead. Long titles are cut and suffixed with `...`.
pub fn generate_title(content: &str) -> String {
    let stripped = strip_urls_and_hashtags(content);
    let cleaned = match stripped.trim() {
        "" => content,
        s => s,
    };

    if cleaned.chars().count() > MAX_TITLE_CHARS {
        let keep = MAX_TITLE_CHARS - ELLIPSIS.len();
        let mut title: String = cleaned.chars().take(keep).collect();
        title.push_str(ELLIPSIS);
        title
    } else {
        cleaned.to_string()
    }
}

/// Classify a text message as `text` or `link`.
pub fn parse_text_message(text: &str) -> ParsedContent {
    let trimmed = text.trim();
    let urls = extract_urls(trimmed);
    let tags = extract_hashtags(trimmed);
    let title = Some(generate_title(trimmed));

    let link_url = urls.into_iter().next().filter(|url| {
        url.chars().count() as f64 > trimmed.chars().count() as f64 * LINK_DOMINANCE_RATIO
    });

    ParsedContent {
        content_type: if link_url.is_some() {
            ContentType::Link
        } else {
            ContentType::Text
        },
        content: trimmed.to_string(),
        title,
        tags,
        link_url,
        message_id: None,
    }
}

/// Build the placeholder record for an image message.
pub fn parse_image_message(message_id: &str) -> ParsedContent {
    ParsedContent {
        content_type: ContentType::Image,
        content: format!("Image: {}", message_id),
        title: Some(IMAGE_TITLE.to_string()),
        tags: Vec::new(),
        link_url: None,
        message_id: Some(message_id.to_string()),
    }
}

/// Dispatch on the declared message type.
///
/// Returns `None` for unsupported kinds and for text messages without text.
pub fn parse_message(message: &InboundMessage) -> Option<ParsedContent> {
    match message.kind {
        MessageKind::Text => message.text.as_deref().map(parse_text_message),
        MessageKind::Image => Some(parse_image_message(&message.id)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::detect_category;

    fn msg(kind: MessageKind, text: Option<&str>) -> InboundMessage {
        InboundMessage {
            id: "m1".to_string(),
            kind,
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_plain_text_with_tags() {
        let parsed = parse_text_message("  Buy milk #todo #home  ");
        assert_eq!(parsed.content_type, ContentType::Text);
        assert_eq!(parsed.content, "Buy milk #todo #home");
        assert_eq!(parsed.tags, vec!["todo", "home"]);
        assert_eq!(parsed.title.as_deref(), Some("Buy milk"));
        assert!(parsed.link_url.is_none());
    }

    #[test]
    fn test_url_dominant_message_is_link() {
        let parsed = parse_text_message("https://example.com/article #read");
        assert_eq!(parsed.content_type, ContentType::Link);
        assert_eq!(parsed.link_url.as_deref(), Some("https://example.com/article"));
        assert_eq!(parsed.tags, vec!["read"]);
    }

    #[test]
    fn test_thai_note_with_trailing_link_stays_text() {
        let text = "อ่านหนังสือเล่มนี้ #learning https://example.com/book";
        assert_eq!(text.chars().count(), 53);

        let parsed = parse_text_message(text);
        assert_eq!(parsed.content_type, ContentType::Text);
        assert!(parsed.link_url.is_none());
        assert_eq!(parsed.tags, vec!["learning"]);
        assert_eq!(detect_category(&parsed.content, &parsed.tags), Some("learning"));
    }

    #[test]
    fn test_link_first_note_is_link() {
        let parsed = parse_text_message("https://example.com/book #learning");
        assert_eq!(parsed.content_type, ContentType::Link);
        assert_eq!(parsed.link_url.as_deref(), Some("https://example.com/book"));
        assert_eq!(parsed.tags, vec!["learning"]);
        assert_eq!(detect_category(&parsed.content, &parsed.tags), Some("learning"));
    }

    #[test]
    fn test_url_in_long_text_is_text() {
        let parsed = parse_text_message(
            "I found this really interesting article about cooking https://x.io/a today",
        );
        assert_eq!(parsed.content_type, ContentType::Text);
        assert!(parsed.link_url.is_none());
    }

    #[test]
    fn test_link_threshold_is_strict() {
        // 20-char URL in a 40-char message: exactly half is not enough
        let url = "https://abcdefghi.io";
        assert_eq!(url.chars().count(), 20);
        let text = format!("{} {}", url, "x".repeat(19));
        assert_eq!(text.chars().count(), 40);
        assert_eq!(parse_text_message(&text).content_type, ContentType::Text);

        let text = format!("{} {}", url, "x".repeat(18));
        assert_eq!(parse_text_message(&text).content_type, ContentType::Link);
    }

    #[test]
    fn test_title_falls_back_to_content_when_only_url() {
        let parsed = parse_text_message("https://example.com");
        assert_eq!(parsed.title.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_title_truncation() {
        let long = "a".repeat(60);
        let title = generate_title(&long);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
        assert_eq!(&title[..47], &long[..47]);

        let exact = "b".repeat(50);
        assert_eq!(generate_title(&exact), exact);
    }

    #[test]
    fn test_title_truncation_counts_thai_characters() {
        let thai = "ก".repeat(55);
        let title = generate_title(&thai);
        assert_eq!(title.chars().count(), 50);
        assert!(title.starts_with(&"ก".repeat(47)));
    }

    #[test]
    fn test_image_message() {
        let parsed = parse_image_message("12345");
        assert_eq!(parsed.content_type, ContentType::Image);
        assert_eq!(parsed.content, "Image: 12345");
        assert_eq!(parsed.title.as_deref(), Some(IMAGE_TITLE));
        assert!(parsed.tags.is_empty());
        assert_eq!(parsed.message_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_parse_message_dispatch() {
        assert!(parse_message(&msg(MessageKind::Text, Some("hi"))).is_some());
        assert!(parse_message(&msg(MessageKind::Text, None)).is_none());
        assert_eq!(
            parse_message(&msg(MessageKind::Image, None))
                .map(|p| p.content_type),
            Some(ContentType::Image)
        );
        assert!(parse_message(&msg(MessageKind::Sticker, None)).is_none());
        assert!(parse_message(&msg(MessageKind::Video, None)).is_none());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse_text_message("งานประชุม https://meet.example.com #งาน");
        let b = parse_text_message("งานประชุม https://meet.example.com #งาน");
        assert_eq!(a, b);
    }
}
