//! Remix generation output
//!
//! No audio is rendered anywhere: `audio_url` is always a placeholder.

use serde::{Deserialize, Serialize};

/// Placeholder output location assigned to every remix result
pub const PLACEHOLDER_AUDIO_URL: &str = "/remix-output.wav";

/// Duration used when the remix function omits one
pub const DEFAULT_REMIX_DURATION_SECS: f64 = 360.0;

/// Generated remix plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixResult {
    pub id: String,
    pub audio_url: String,
    /// Sections ordered by start time, inside [0, duration]
    pub timeline: Vec<RemixSection>,
    /// Edits applied, timestamps inside [0, duration]
    pub changes: Vec<RemixChange>,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_adjustment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm_adjustment: Option<String>,
}

/// One segment of the generated remix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixSection {
    /// Free-form label (intro, buildup, drop, breakdown, ...)
    #[serde(rename = "type")]
    pub section_type: String,
    pub start_time: f64,
    pub end_time: f64,
    pub source: SectionSource,
    pub description: String,
}

/// Where a remix section's material comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionSource {
    Track1,
    Track2,
    Generated,
}

impl SectionSource {
    /// Parse a source label; unrecognized labels are `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace([' ', '_', '-'], "").as_str() {
            "track1" => Some(SectionSource::Track1),
            "track2" => Some(SectionSource::Track2),
            "generated" => Some(SectionSource::Generated),
            _ => None,
        }
    }
}

/// One atomic edit applied during generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixChange {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub description: String,
    pub timestamp: f64,
}

/// Kind of edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Cut,
    Extend,
    Add,
    Remove,
    Transform,
}

impl ChangeType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cut" => Some(ChangeType::Cut),
            "extend" => Some(ChangeType::Extend),
            "add" => Some(ChangeType::Add),
            "remove" => Some(ChangeType::Remove),
            "transform" => Some(ChangeType::Transform),
            _ => None,
        }
    }
}

/// Stage label shown while a remix is generating
///
/// Purely presentational: derived from the simulated progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemixStage {
    AnalyzingStructure,
    DetectingStems,
    ApplyingTransformations,
    BuildingArrangement,
    FinalizingMix,
}

impl RemixStage {
    /// Stage active at `progress` (0-100)
    pub fn from_progress(progress: f64) -> Self {
        if progress <= 20.0 {
            RemixStage::AnalyzingStructure
        } else if progress <= 40.0 {
            RemixStage::DetectingStems
        } else if progress <= 60.0 {
            RemixStage::ApplyingTransformations
        } else if progress <= 80.0 {
            RemixStage::BuildingArrangement
        } else {
            RemixStage::FinalizingMix
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RemixStage::AnalyzingStructure => "Analyzing structure",
            RemixStage::DetectingStems => "Detecting stems",
            RemixStage::ApplyingTransformations => "Applying transformations",
            RemixStage::BuildingArrangement => "Building arrangement",
            RemixStage::FinalizingMix => "Finalizing mix",
        }
    }
}
