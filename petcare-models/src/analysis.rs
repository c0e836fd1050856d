//! Normalized analysis results.
//!
//! Providers return loosely-shaped JSON. Everything here maps that JSON onto
//! fixed response types so HTTP consumers never see provider-specific shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A possible species with confidence percentage (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesGuess {
    /// Species name (e.g. dog, cat, bird).
    pub species: String,
    /// Confidence percentage.
    pub percentage: f64,
}

/// A possible breed with confidence percentage (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedGuess {
    /// Breed name.
    pub breed: String,
    /// Confidence percentage.
    pub percentage: f64,
}

/// Species and breed analysis of a pet image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PetAnalysis {
    /// Species predictions with percentages.
    pub species: Vec<SpeciesGuess>,
    /// Breed predictions with percentages, when applicable.
    pub breeds: Vec<BreedGuess>,
    /// Single display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_breed_or_species: Option<String>,
    /// Overall match score (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    /// Short description of traits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Trait keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PetAnalysis {
    /// Result used when a model produced nothing usable.
    pub fn unknown() -> Self {
        Self {
            species: vec![SpeciesGuess {
                species: "unknown".to_string(),
                percentage: 100.0,
            }],
            ..Self::default()
        }
    }
}

/// Mood and species analysis of pet audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAnalysis {
    /// Inferred mood or state.
    pub mood: String,
    /// Confidence in the analysis, 0.0-1.0.
    pub confidence: f64,
    /// Species predictions.
    pub species: Vec<SpeciesGuess>,
    /// Breed predictions.
    pub breeds: Vec<BreedGuess>,
    /// Short description of the sound.
    pub description: Option<String>,
}

/// Activity inferred from a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityAnalysis {
    /// Estimated sleep or rest minutes so far today.
    pub sleep_minutes: u32,
    /// Estimated number of meals today.
    pub meals_count: u32,
    /// Low, Normal, High, or Unknown.
    pub activity: String,
}

/// Daily habits inferred from a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    /// What the pet did in the video.
    pub activity_summary: String,
    /// Estimated hours slept per day (0-24).
    pub hours_slept_per_day: f64,
    /// Estimated active hours per day (0-24).
    pub hours_active: f64,
    /// Observed or inferred eating habits.
    pub eating_habits: String,
}

/// Output of a text generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    /// Model id the caller asked for.
    pub model: String,
    /// Generated text.
    pub generated_text: String,
}

/// Parse model output as a JSON object, stripping Markdown code fences.
pub fn parse_model_json(text: &str) -> Result<Map<String, Value>> {
    let mut raw = text.trim();
    if let Some(rest) = raw.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        raw = rest.trim_start();
        if let Some(body) = raw.trim_end().strip_suffix("```") {
            raw = body.trim_end();
        }
    }

    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn as_f64(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn guesses(raw: &Map<String, Value>, list_key: &str, name_key: &str) -> Vec<(String, f64)> {
    let Some(Value::Array(items)) = raw.get(list_key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| {
            let name = item
                .get(name_key)
                .or_else(|| item.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let percentage = as_f64(item.get("percentage")).unwrap_or(0.0);
            (name, percentage.clamp(0.0, 100.0))
        })
        .collect()
}

fn species_guesses(raw: &Map<String, Value>) -> Vec<SpeciesGuess> {
    guesses(raw, "species", "species")
        .into_iter()
        .map(|(species, percentage)| SpeciesGuess {
            species,
            percentage,
        })
        .collect()
}

fn breed_guesses(raw: &Map<String, Value>) -> Vec<BreedGuess> {
    guesses(raw, "breeds", "breed")
        .into_iter()
        .map(|(breed, percentage)| BreedGuess { breed, percentage })
        .collect()
}

/// Map raw image-analysis JSON to [`PetAnalysis`].
pub fn normalize_pet(raw: &Map<String, Value>) -> PetAnalysis {
    let tags = match raw.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    PetAnalysis {
        species: species_guesses(raw),
        breeds: breed_guesses(raw),
        primary_breed_or_species: as_string(raw.get("primary_breed_or_species")),
        match_score: as_f64(raw.get("match_score")).map(|s| s.clamp(0.0, 100.0)),
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        tags,
    }
}

/// Map raw audio-analysis JSON to [`AudioAnalysis`].
///
/// Confidence falls back to the first species percentage; values above 1
/// are read as percentages.
pub fn normalize_audio(raw: &Map<String, Value>) -> AudioAnalysis {
    let species = species_guesses(raw);
    let mood = as_string(raw.get("mood"))
        .filter(|m| !m.is_empty())
        .or_else(|| as_string(raw.get("description")))
        .unwrap_or_default();

    let confidence = match as_f64(raw.get("confidence")) {
        Some(c) if c > 1.0 => c / 100.0,
        Some(c) => c,
        None => species.first().map_or(0.0, |s| s.percentage / 100.0),
    };

    AudioAnalysis {
        mood,
        confidence: confidence.clamp(0.0, 1.0),
        species,
        breeds: breed_guesses(raw),
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn count(raw: &Map<String, Value>, key: &str, fallback_key: &str) -> u32 {
    let value = raw.get(key).filter(|v| !v.is_null()).or_else(|| raw.get(fallback_key));
    as_f64(value).map_or(0, |n| n.max(0.0).trunc() as u32)
}

/// Map raw activity JSON to [`ActivityAnalysis`].
pub fn normalize_activity(raw: &Map<String, Value>) -> ActivityAnalysis {
    let activity = as_string(raw.get("activity"))
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    ActivityAnalysis {
        sleep_minutes: count(raw, "sleep_minutes", "sleep"),
        meals_count: count(raw, "meals_count", "meals"),
        activity,
    }
}

/// Map raw video-analysis JSON to [`VideoAnalysis`].
pub fn normalize_video(raw: &Map<String, Value>) -> VideoAnalysis {
    let hours = |key: &str| as_f64(raw.get(key)).map_or(0.0, |h| h.clamp(0.0, 24.0));
    let text = |key: &str| {
        as_string(raw.get(key))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    VideoAnalysis {
        activity_summary: text("activity_summary"),
        hours_slept_per_day: hours("hours_slept_per_day"),
        hours_active: hours("hours_active"),
        eating_habits: text("eating_habits"),
    }
}
