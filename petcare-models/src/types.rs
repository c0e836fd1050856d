//! Core types for model routing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Canonical identifier for an analyzer variant.
///
/// Every alias a caller may send resolves to exactly one of these.
///
/// # Examples
///
/// ```
/// use petcare_models::ModelId;
///
/// let id: ModelId = "HF".parse().unwrap();
/// assert_eq!(id, ModelId::Llama);
/// assert_eq!(id.to_string(), "llama");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    /// Gemini (image, audio, video, activity).
    Gemini,
    /// Llama 3.2 11B Vision Instruct via Hugging Face (image).
    LlamaVision,
    /// Llama 3.2 1B Instruct via Hugging Face (text).
    Llama,
}

/// Static alias table: normalized alias to canonical id.
const ALIASES: &[(&str, ModelId)] = &[
    ("gemini", ModelId::Gemini),
    ("gemini-1.5-flash", ModelId::Gemini),
    ("gemini-1.5", ModelId::Gemini),
    ("llama_vision", ModelId::LlamaVision),
    ("llama-vision", ModelId::LlamaVision),
    ("llama3.2-11b-vision", ModelId::LlamaVision),
    ("llama 11b vision", ModelId::LlamaVision),
    ("llama", ModelId::Llama),
    ("llama3.2", ModelId::Llama),
    ("llama3.2:1b", ModelId::Llama),
    ("huggingface", ModelId::Llama),
    ("hf", ModelId::Llama),
];

impl ModelId {
    /// All canonical ids, in listing order.
    pub const ALL: [ModelId; 3] = [ModelId::Gemini, ModelId::LlamaVision, ModelId::Llama];

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gemini => "gemini",
            ModelId::LlamaVision => "llama_vision",
            ModelId::Llama => "llama",
        }
    }

    /// Label shown in model listings.
    pub fn label(&self) -> &'static str {
        match self {
            ModelId::Gemini => "Gemini (image + audio)",
            ModelId::LlamaVision => {
                "Llama 3.2 11B Vision Instruct (Hugging Face, image; alternative to Gemini)"
            }
            ModelId::Llama => "Llama 3.2 1B Instruct (Hugging Face, text-only)",
        }
    }

    /// Short display name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelId::Gemini => "Gemini",
            ModelId::LlamaVision => "Llama 3.2 11B Vision",
            ModelId::Llama => "Llama 3.2 1B Instruct",
        }
    }

    /// What this variant can do.
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            ModelId::Gemini => CapabilitySet::of(&[
                Capability::Image,
                Capability::Audio,
                Capability::Video,
                Capability::Activity,
            ]),
            ModelId::LlamaVision => CapabilitySet::of(&[Capability::Image]),
            ModelId::Llama => CapabilitySet::of(&[Capability::Text]),
        }
    }

    /// Canonical ids (other than `self`) that support `capability`.
    pub fn alternatives_for(&self, capability: Capability) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|id| *id != self && id.capabilities().contains(capability))
            .map(ModelId::as_str)
            .collect()
    }

    /// Valid canonical ids, sorted, for error messages.
    pub fn valid_ids() -> Vec<&'static str> {
        let mut ids: Vec<_> = Self::ALL.iter().map(ModelId::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve a caller-supplied id or alias.
    ///
    /// Matching ignores case and surrounding whitespace.
    pub fn resolve(input: &str) -> crate::Result<Self> {
        let normalized = input.trim().to_lowercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, id)| *id)
            .ok_or_else(|| Error::UnknownModel {
                requested: input.to_string(),
                valid: Self::valid_ids(),
            })
    }

    /// Aliases that map to this id (including the canonical form).
    pub fn aliases(&self) -> impl Iterator<Item = &'static str> + '_ {
        ALIASES
            .iter()
            .filter(move |(_, id)| id == self)
            .map(|(alias, _)| *alias)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

/// One operation an analyzer may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Species/breed analysis from an image.
    Image,
    /// Mood/species analysis from audio.
    Audio,
    /// Activity/sleep/eating analysis from a video.
    Video,
    /// Sleep/meals/activity inference from a single frame.
    Activity,
    /// Free-form text generation.
    Text,
}

impl Capability {
    /// All capabilities, in a stable order.
    pub const ALL: [Capability; 5] = [
        Capability::Image,
        Capability::Audio,
        Capability::Video,
        Capability::Activity,
        Capability::Text,
    ];

    /// Short name, matching the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Image => "image",
            Capability::Audio => "audio",
            Capability::Video => "video",
            Capability::Activity => "activity",
            Capability::Text => "text",
        }
    }

    /// Human-readable operation name.
    pub fn operation(&self) -> &'static str {
        match self {
            Capability::Image => "image analysis",
            Capability::Audio => "audio analysis",
            Capability::Video => "video analysis",
            Capability::Activity => "activity analysis",
            Capability::Text => "text generation",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Capability::Image => 1,
            Capability::Audio => 1 << 1,
            Capability::Video => 1 << 2,
            Capability::Activity => 1 << 3,
            Capability::Text => 1 << 4,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// Set of capabilities attached to a model variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// Build a set from a list of capabilities.
    pub fn of(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().fold(0, |acc, c| acc | c.bit()))
    }

    /// Check membership.
    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Iterate the contained capabilities in stable order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Information about a registered model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    /// Canonical id.
    pub id: ModelId,
    /// Human-readable label.
    pub label: &'static str,
    /// Provider name ("gemini" or "huggingface").
    pub provider: &'static str,
    /// Provider-side model name (e.g. "gemini-1.5-flash").
    pub model: String,
    /// Supported operations.
    pub capabilities: CapabilitySet,
    /// Number of credentials in the provider's pool.
    pub credentials: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ids_resolve_to_themselves() {
        for id in ModelId::ALL {
            assert_eq!(ModelId::resolve(id.as_str()).unwrap(), id);
        }
    }

    #[test]
    fn every_alias_resolves_like_its_canonical_id() {
        for (alias, expected) in ALIASES {
            assert_eq!(ModelId::resolve(alias).unwrap(), *expected, "alias {alias}");
            assert_eq!(
                ModelId::resolve(alias).unwrap(),
                ModelId::resolve(expected.as_str()).unwrap()
            );
        }
    }

    #[test]
    fn resolve_ignores_case_and_whitespace() {
        assert_eq!(ModelId::resolve("  Gemini-1.5-Flash ").unwrap(), ModelId::Gemini);
        assert_eq!(ModelId::resolve("LLAMA 11B VISION").unwrap(), ModelId::LlamaVision);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let err = ModelId::resolve("gpt-4o").unwrap_err();
        assert!(matches!(err, Error::UnknownModel { .. }));
        let message = err.to_string();
        assert!(message.contains("gpt-4o"));
        assert!(message.contains("gemini"));
        assert!(message.contains("llama_vision"));
    }

    #[test]
    fn empty_id_is_rejected() {
        assert!(ModelId::resolve("").is_err());
    }

    #[test]
    fn model_id_serializes_as_snake_case() {
        let json = serde_json::to_string(&ModelId::LlamaVision).unwrap();
        assert_eq!(json, "\"llama_vision\"");
    }

    #[test]
    fn capability_sets_match_variants() {
        let gemini = ModelId::Gemini.capabilities();
        assert!(gemini.contains(Capability::Audio));
        assert!(gemini.contains(Capability::Video));
        assert!(!gemini.contains(Capability::Text));

        let llama = ModelId::Llama.capabilities();
        assert_eq!(llama.iter().collect::<Vec<_>>(), vec![Capability::Text]);
    }

    #[test]
    fn alternatives_exclude_self() {
        assert_eq!(
            ModelId::Llama.alternatives_for(Capability::Image),
            vec!["gemini", "llama_vision"]
        );
        assert_eq!(ModelId::Gemini.alternatives_for(Capability::Text), vec!["llama"]);
        assert!(ModelId::Gemini.alternatives_for(Capability::Video).is_empty());
    }

    #[test]
    fn capability_set_serializes_as_list() {
        let json = serde_json::to_string(&ModelId::LlamaVision.capabilities()).unwrap();
        assert_eq!(json, "[\"image\"]");
    }

    #[test]
    fn aliases_include_canonical_form() {
        let aliases: Vec<_> = ModelId::Llama.aliases().collect();
        assert!(aliases.contains(&"llama"));
        assert!(aliases.contains(&"hf"));
    }
}
