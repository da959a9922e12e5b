//! Provider routing: logical model names to technical identifiers and
//! backend invocation paths.
//!
//! Resolution walks [`ROUTING_ORDER`] and picks the first family whose marker
//! is a case-sensitive substring of the logical name. Names that match no
//! family resolve to [`ResolvedModel::Passthrough`]: the name itself is used
//! as the technical identifier and no backend is implied, so new backends can
//! be reached without touching the family table as long as the caller picks
//! the invocation path.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::types::LlmProvider;

/// Invocation path of a generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Chat-style request (Ollama `/api/chat`).
    Chat,
    /// Single prompt text generation (Gemini `generateContent`).
    TextGeneration,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Chat => "chat",
            BackendKind::TextGeneration => "text-generation",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "ollama" => Ok(BackendKind::Chat),
            "text-generation" | "text" | "gemini" => Ok(BackendKind::TextGeneration),
            other => Err(format!(
                "unknown backend '{}': expected 'chat' or 'text-generation'",
                other
            )),
        }
    }
}

/// Known model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    Gemini,
    DeepSeek,
    Gpt,
    Llama,
}

/// Order in which families are tried; first match wins.
pub const ROUTING_ORDER: [ModelFamily; 4] = [
    ModelFamily::Gemini,
    ModelFamily::DeepSeek,
    ModelFamily::Gpt,
    ModelFamily::Llama,
];

impl ModelFamily {
    /// Substring that selects this family in a logical model name.
    pub fn marker(&self) -> &'static str {
        match self {
            ModelFamily::Gemini => "Gemini",
            ModelFamily::DeepSeek => "deepseek",
            ModelFamily::Gpt => "GPT",
            ModelFamily::Llama => "LLAMA",
        }
    }

    /// Technical identifier used when no override is configured.
    pub fn default_technical_id(&self) -> &'static str {
        match self {
            ModelFamily::Gemini => "gemini-3-flash-preview",
            ModelFamily::DeepSeek => "deepseek-v3.2:cloud",
            ModelFamily::Gpt => "gpt-oss-safeguard:latest",
            ModelFamily::Llama => "compcj/llama4-scout-ud-q2-k-xl:latest",
        }
    }

    /// Backend serving this family.
    pub fn backend(&self) -> BackendKind {
        match self {
            ModelFamily::Gemini => BackendKind::TextGeneration,
            ModelFamily::DeepSeek | ModelFamily::Gpt | ModelFamily::Llama => BackendKind::Chat,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Outcome of resolving a logical model name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum ResolvedModel {
    /// The name matched a known family.
    Known {
        family: ModelFamily,
        technical_id: String,
        backend: BackendKind,
    },
    /// No family matched; the logical name is the technical identifier and
    /// the invocation path must come from the caller.
    Passthrough { technical_id: String },
}

impl ResolvedModel {
    pub fn technical_id(&self) -> &str {
        match self {
            ResolvedModel::Known { technical_id, .. } => technical_id,
            ResolvedModel::Passthrough { technical_id } => technical_id,
        }
    }

    /// Backend implied by the resolution, if any.
    pub fn backend(&self) -> Option<BackendKind> {
        match self {
            ResolvedModel::Known { backend, .. } => Some(*backend),
            ResolvedModel::Passthrough { .. } => None,
        }
    }

    pub fn family(&self) -> Option<ModelFamily> {
        match self {
            ResolvedModel::Known { family, .. } => Some(*family),
            ResolvedModel::Passthrough { .. } => None,
        }
    }
}

/// Pure mapping from logical model names to [`ResolvedModel`].
#[derive(Debug, Clone, Default)]
pub struct ProviderRouter {
    overrides: HashMap<ModelFamily, String>,
}

impl ProviderRouter {
    /// Create a router using the default technical identifiers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the technical identifier of one family.
    pub fn with_technical_id(mut self, family: ModelFamily, technical_id: impl Into<String>) -> Self {
        self.overrides.insert(family, technical_id.into());
        self
    }

    /// Technical identifier currently used for `family`.
    pub fn technical_id(&self, family: ModelFamily) -> &str {
        self.overrides
            .get(&family)
            .map(String::as_str)
            .unwrap_or_else(|| family.default_technical_id())
    }

    /// Resolve a logical model name.
    pub fn resolve(&self, logical_name: &str) -> ResolvedModel {
        ROUTING_ORDER
            .iter()
            .find(|family| logical_name.contains(family.marker()))
            .map(|family| ResolvedModel::Known {
                family: *family,
                technical_id: self.technical_id(*family).to_string(),
                backend: family.backend(),
            })
            .unwrap_or_else(|| ResolvedModel::Passthrough {
                technical_id: logical_name.to_string(),
            })
    }
}

/// The backend integrations available to the orchestrator, keyed by
/// invocation path.
#[derive(Clone, Default)]
pub struct BackendSet {
    providers: HashMap<BackendKind, Arc<dyn LlmProvider>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for a backend kind.
    pub fn with_backend(mut self, kind: BackendKind, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn LlmProvider>> {
        self.providers.get(&kind)
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<BackendKind> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

impl fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSet")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpt_resolves_to_chat() {
        let router = ProviderRouter::new();
        let resolved = router.resolve("GPT-x");

        assert_eq!(resolved.family(), Some(ModelFamily::Gpt));
        assert_eq!(resolved.technical_id(), "gpt-oss-safeguard:latest");
        assert_eq!(resolved.backend(), Some(BackendKind::Chat));
    }

    #[test]
    fn test_unknown_name_is_passthrough() {
        let resolved = ProviderRouter::new().resolve("unknown-model-123");

        assert_eq!(
            resolved,
            ResolvedModel::Passthrough {
                technical_id: "unknown-model-123".to_string()
            }
        );
        assert_eq!(resolved.backend(), None);
    }

    #[test]
    fn test_each_family_resolves() {
        let router = ProviderRouter::new();
        assert_eq!(
            router.resolve("Gemini").backend(),
            Some(BackendKind::TextGeneration)
        );
        assert_eq!(
            router.resolve("deepseek").technical_id(),
            "deepseek-v3.2:cloud"
        );
        assert_eq!(
            router.resolve("LLAMA").technical_id(),
            "compcj/llama4-scout-ud-q2-k-xl:latest"
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let router = ProviderRouter::new();
        assert_eq!(router.resolve("gemini").family(), None);
        assert_eq!(router.resolve("gpt-4o").family(), None);
        assert_eq!(router.resolve("Llama").family(), None);
    }

    #[test]
    fn test_first_match_wins_in_routing_order() {
        // Contains both the Gemini and GPT markers; Gemini comes first.
        let resolved = ProviderRouter::new().resolve("GPT-vs-Gemini");
        assert_eq!(resolved.family(), Some(ModelFamily::Gemini));

        let resolved = ProviderRouter::new().resolve("deepseek-LLAMA-distill");
        assert_eq!(resolved.family(), Some(ModelFamily::DeepSeek));
    }

    #[test]
    fn test_technical_id_override() {
        let router = ProviderRouter::new().with_technical_id(ModelFamily::Llama, "llama3.2:3b");
        assert_eq!(router.resolve("LLAMA").technical_id(), "llama3.2:3b");
        assert_eq!(router.resolve("GPT").technical_id(), "gpt-oss-safeguard:latest");
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("chat".parse::<BackendKind>(), Ok(BackendKind::Chat));
        assert_eq!(
            "Text-Generation".parse::<BackendKind>(),
            Ok(BackendKind::TextGeneration)
        );
        assert!("smoke-signals".parse::<BackendKind>().is_err());
    }
}
