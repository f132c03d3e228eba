//! AI summarization and tag suggestion for captured items.
//!
//! Both operations are best-effort: any failure (missing key, network error,
//! unusable model output) is logged and turned into an empty result.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, warn};

use brain_core::{is_suggested_category, merge_tags, ContentType, GenerationBackend, LinkPreview};

use crate::anthropic::AnthropicConfig;

/// System prompt for [`Summarizer::summarize`].
pub const SUMMARY_SYSTEM_PROMPT: &str = "คุณเป็น AI ช่วยจัดการข้อมูลส่วนตัว (Second Brain)
ภารกิจ: สรุปเนื้อหาให้กระชับ และแนะนำ tags และหมวดหมู่

ตอบเป็น JSON format:
{
  \"summary\": \"สรุปสั้นๆ 1-2 ประโยค\",
  \"suggestedTags\": [\"tag1\", \"tag2\"],
  \"suggestedCategory\": \"หมวดหมู่\"
}

หมวดหมู่ที่เป็นไปได้: work, learning, idea, todo, quote, recipe, travel, finance, health, other";

/// System prompt for [`Summarizer::suggest_tags`].
pub const TAGGING_SYSTEM_PROMPT: &str = "คุณเป็น AI ช่วยจัด tags สำหรับข้อมูล
แนะนำ 2-5 tags ที่เหมาะสม และหมวดหมู่

ตอบเป็น JSON format:
{
  \"tags\": [\"tag1\", \"tag2\"],
  \"category\": \"หมวดหมู่\"
}

หมวดหมู่: work, learning, idea, todo, quote, recipe, travel, finance, health, other
Tags ควรเป็นคำสั้นๆ ภาษาไทยหรืออังกฤษ";

/// Input to summarization.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub content: String,
    pub content_type: ContentType,
    pub title: Option<String>,
    pub link_preview: Option<LinkPreview>,
}

/// Summarizer output. All fields empty means "nothing to apply".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryResponse {
    pub summary: String,
    pub suggested_tags: Vec<String>,
    pub suggested_category: Option<String>,
}

impl SummaryResponse {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.suggested_tags.is_empty() && self.suggested_category.is_none()
    }
}

/// Input to tag suggestion.
#[derive(Debug, Clone)]
pub struct TaggingRequest {
    pub content: String,
    pub content_type: ContentType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggingResponse {
    pub tags: Vec<String>,
    pub category: Option<String>,
}

/// True when enrichment can run with this configuration.
pub fn is_ai_available(config: &AnthropicConfig) -> bool {
    config.has_api_key()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    summary: Option<String>,
    suggested_tags: Option<Vec<String>>,
    suggested_category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTagging {
    tags: Option<Vec<String>>,
    category: Option<String>,
}

/// Generates summaries and tag suggestions through a text-generation backend.
pub struct Summarizer {
    backend: Arc<dyn GenerationBackend>,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Summarize an item and suggest tags and a category.
    pub async fn summarize(&self, req: &SummaryRequest) -> SummaryResponse {
        let start = Instant::now();
        let prompt = build_summary_prompt(req);

        let reply = match self
            .backend
            .generate_with_system(SUMMARY_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "summarizer",
                    op = "summarize",
                    error = %e,
                    "Summarization request failed, using empty result"
                );
                return SummaryResponse::default();
            }
        };

        let Some(raw) = parse_reply::<RawSummary>(&reply).filter(|r| {
            r.summary.is_some() || r.suggested_tags.is_some() || r.suggested_category.is_some()
        }) else {
            warn!(
                subsystem = "inference",
                component = "summarizer",
                op = "summarize",
                reply_len = reply.len(),
                "Model reply had no usable JSON object, using empty result"
            );
            return SummaryResponse::default();
        };

        let response = SummaryResponse {
            summary: raw.summary.map(|s| s.trim().to_string()).unwrap_or_default(),
            suggested_tags: clean_tags(raw.suggested_tags.unwrap_or_default()),
            suggested_category: clean_category(raw.suggested_category),
        };

        debug!(
            subsystem = "inference",
            component = "summarizer",
            op = "summarize",
            model = self.backend.model_name(),
            tag_count = response.suggested_tags.len(),
            category = response.suggested_category.as_deref().unwrap_or(""),
            duration_ms = start.elapsed().as_millis() as u64,
            "Summarization complete"
        );
        response
    }

    /// Suggest 2-5 tags and a category without producing a summary.
    pub async fn suggest_tags(&self, req: &TaggingRequest) -> TaggingResponse {
        let prompt = format!("ประเภท: {}\nเนื้อหา:\n{}", req.content_type, req.content);

        let reply = match self
            .backend
            .generate_with_system(TAGGING_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "summarizer",
                    op = "suggest_tags",
                    error = %e,
                    "Tag suggestion request failed, using empty result"
                );
                return TaggingResponse::default();
            }
        };

        match parse_reply::<RawTagging>(&reply).filter(|r| r.tags.is_some() || r.category.is_some())
        {
            Some(raw) => TaggingResponse {
                tags: clean_tags(raw.tags.unwrap_or_default()),
                category: clean_category(raw.category),
            },
            None => {
                warn!(
                    subsystem = "inference",
                    component = "summarizer",
                    op = "suggest_tags",
                    "Model reply had no usable JSON object, using empty result"
                );
                TaggingResponse::default()
            }
        }
    }
}

/// Build the user message: type, optional title, optional link metadata, content.
pub fn build_summary_prompt(req: &SummaryRequest) -> String {
    let mut prompt = format!("ประเภท: {}\n", req.content_type);

    if let Some(title) = req.title.as_deref().filter(|t| !t.is_empty()) {
        prompt.push_str(&format!("หัวข้อ: {}\n", title));
    }

    if let Some(preview) = &req.link_preview {
        prompt.push_str(&format!("Link Title: {}\n", preview.title));
        prompt.push_str(&format!("Link Description: {}\n", preview.description));
    }

    prompt.push_str(&format!("\nเนื้อหา:\n{}", req.content));
    prompt
}

/// Locate the first balanced `{...}` object in free-form text.
///
/// Braces inside JSON strings (including escaped quotes) do not count toward
/// nesting. Returns `None` when no object closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_reply<T: serde::de::DeserializeOwned>(reply: &str) -> Option<T> {
    let object = extract_json_object(reply)?;
    serde_json::from_str(object).ok()
}

/// Trim, drop a leading `#`, drop blanks, deduplicate.
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let cleaned = tags
        .into_iter()
        .map(|t| t.trim().trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty());
    merge_tags(cleaned, Vec::<String>::new())
}

/// Keep the category only when it belongs to the suggestion vocabulary.
fn clean_category(category: Option<String>) -> Option<String> {
    let category = category?.trim().to_lowercase();
    if is_suggested_category(&category) {
        Some(category)
    } else {
        debug!(
            subsystem = "inference",
            component = "summarizer",
            category = %category,
            "Dropping category outside vocabulary"
        );
        None
    }
}
