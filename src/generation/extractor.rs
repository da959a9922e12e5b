//! Recovers source code from raw model output.

/// Markdown code fence marker.
pub const CODE_FENCE: &str = "```";

/// Language tag expected on the opening fence of generated solutions.
pub const DEFAULT_LANGUAGE_TAG: &str = "python";

/// Strips markdown fencing from model output.
///
/// Preference order: the first fence tagged with the language, then the
/// first untagged fence pair, then the whole text. The result is always
/// trimmed and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExtractor {
    language_tag: String,
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE_TAG)
    }
}

impl CodeExtractor {
    pub fn new(language_tag: impl Into<String>) -> Self {
        Self {
            language_tag: language_tag.into(),
        }
    }

    pub fn language_tag(&self) -> &str {
        &self.language_tag
    }

    /// Return the best-guess source code contained in `text`.
    pub fn extract(&self, text: &str) -> String {
        if !self.language_tag.is_empty() {
            let tagged_fence = format!("{}{}", CODE_FENCE, self.language_tag);
            if let Some(start) = text.find(&tagged_fence) {
                return until_closing_fence(&text[start + tagged_fence.len()..])
                    .trim()
                    .to_string();
            }
        }

        if let Some(start) = text.find(CODE_FENCE) {
            return until_closing_fence(&text[start + CODE_FENCE.len()..])
                .trim()
                .to_string();
        }

        text.trim().to_string()
    }
}

/// Text up to the next fence, or all of it when the block is never closed.
fn until_closing_fence(body: &str) -> &str {
    match body.find(CODE_FENCE) {
        Some(end) => &body[..end],
        None => body,
    }
}

/// Extract code using the default `python` tag.
pub fn extract_code(text: &str) -> String {
    CodeExtractor::default().extract(text)
}
