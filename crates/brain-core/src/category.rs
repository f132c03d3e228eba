//! Keyword-based category detection.

/// Ordered category table. Earlier rows win when several match.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("work", &["งาน", "work", "project", "โปรเจค", "meeting", "ประชุม"]),
    (
        "learning",
        &["เรียน", "learn", "study", "อ่าน", "read", "book", "หนังสือ", "course"],
    ),
    ("idea", &["idea", "ไอเดีย", "คิด", "think", "concept"]),
    ("todo", &["todo", "ทำ", "task", "รายการ"]),
    ("quote", &["quote", "คำคม", "saying"]),
    ("recipe", &["recipe", "สูตร", "อาหาร", "food", "cook"]),
    ("travel", &["travel", "เที่ยว", "trip", "ไป"]),
    ("finance", &["finance", "เงิน", "money", "invest", "ลงทุน"]),
];

/// Categories the summarizer may suggest. A superset of the keyword table.
pub const SUGGESTED_CATEGORIES: &[&str] = &[
    "work", "learning", "idea", "todo", "quote", "recipe", "travel", "finance", "health", "other",
];

/// Pick the first category whose keyword appears in `content` (substring) or
/// equals one of `tags`. Both sides are lower-cased before comparison.
///
/// ```
/// use brain_core::category::detect_category;
///
/// assert_eq!(detect_category("Team meeting at 10", &[]), Some("work"));
/// assert_eq!(detect_category("hello", &["Money".to_string()]), Some("finance"));
/// assert_eq!(detect_category("hello", &[]), None);
/// ```
pub fn detect_category(content: &str, tags: &[String]) -> Option<&'static str> {
    let content = content.to_lowercase();
    let tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|kw| content.contains(kw) || tags.iter().any(|t| t == kw))
        })
        .map(|(category, _)| *category)
}

/// True when `category` belongs to the summarizer vocabulary.
pub fn is_suggested_category(category: &str) -> bool {
    SUGGESTED_CATEGORIES.contains(&category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detects_from_content_substring() {
        assert_eq!(detect_category("Booking a TRIP next week", &[]), Some("travel"));
        assert_eq!(detect_category("สูตรต้มยำ", &[]), Some("recipe"));
    }

    #[test]
    fn test_table_order_wins() {
        // "work" (row 1) and "book" (learning, row 2) both present
        assert_eq!(detect_category("work book", &[]), Some("work"));
    }

    #[test]
    fn test_tag_must_match_exactly() {
        assert_eq!(detect_category("nothing here", &tags(&["Quote"])), Some("quote"));
        assert_eq!(detect_category("nothing here", &tags(&["quotes"])), None);
    }

    #[test]
    fn test_substring_inside_longer_word() {
        // "read" inside "bread"
        assert_eq!(detect_category("bread", &[]), Some("learning"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(detect_category("hello world", &tags(&["misc"])), None);
        assert_eq!(detect_category("", &[]), None);
    }

    #[test]
    fn test_detected_categories_are_suggestable() {
        for (category, _) in CATEGORY_KEYWORDS {
            assert!(is_suggested_category(category));
        }
        assert!(is_suggested_category("health"));
        assert!(!is_suggested_category("sports"));
    }
}
