//! Track analysis model
//!
//! Analyses are produced by the remote analysis function and normalized by
//! [`crate::services::analysis_client::normalize_analysis`] before they reach
//! the session, so every value here already satisfies its declared range.

use serde::{Deserialize, Serialize};

/// Result of analyzing one selected track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAnalysis {
    /// Client-generated identifier
    pub id: String,
    /// Name of the analyzed file
    pub file_name: String,
    /// Estimated tempo in beats per minute
    pub bpm: f64,
    /// Tempo instability (0 = rock solid)
    pub bpm_drift: f64,
    /// Musical key (e.g. "Am", "F#m", "G")
    pub key: String,
    /// Camelot wheel position (e.g. "8A")
    pub camelot_key: String,
    /// Major or minor
    pub mode: KeyMode,
    /// Overall energy (0-1)
    pub energy: f64,
    /// Energy over time, each value 0-1
    pub energy_curve: Vec<f64>,
    /// Ordered, non-overlapping sections inside [0, duration]
    pub structure: Vec<SongSection>,
    /// Duration in seconds
    pub duration: f64,
    /// Display waveform, each value 0-1
    pub waveform_data: Vec<f64>,
}

/// Key quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    Major,
    Minor,
}

impl KeyMode {
    /// Parse "major"/"minor" (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "major" | "maj" => Some(KeyMode::Major),
            "minor" | "min" => Some(KeyMode::Minor),
            _ => None,
        }
    }

    /// Derive the quality from a key name ("Am" → minor, "C" → major)
    pub fn from_key(key: &str) -> Self {
        match parse_key(key) {
            Some((_, true)) => KeyMode::Minor,
            _ => KeyMode::Major,
        }
    }
}

/// Structural segment type of an analyzed track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Intro,
    Verse,
    Buildup,
    Drop,
    Break,
    Outro,
}

impl SectionType {
    /// Map a section label from the AI service onto a known type
    ///
    /// Accepts the canonical names plus common aliases; anything else is `None`.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "intro" => Some(SectionType::Intro),
            "verse" => Some(SectionType::Verse),
            "buildup" | "build" | "riser" => Some(SectionType::Buildup),
            "drop" => Some(SectionType::Drop),
            "break" | "breakdown" => Some(SectionType::Break),
            "outro" => Some(SectionType::Outro),
            _ => None,
        }
    }
}

/// One structural segment of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongSection {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub start_time: f64,
    pub end_time: f64,
    pub energy: f64,
}

/// Relative presence of instrument groups, each 0-1
///
/// Levels are independent; they do not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StemAnalysis {
    pub vocals: f64,
    pub drums: f64,
    pub bass: f64,
    pub synths: f64,
    pub other: f64,
}

/// An analysis together with its optional stem breakdown
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedTrack {
    pub analysis: TrackAnalysis,
    pub stems: Option<StemAnalysis>,
}

/// Camelot wheel: (root, is_minor, position), enharmonic spellings included
const CAMELOT_WHEEL: &[(&str, bool, &str)] = &[
    ("G#", true, "1A"),
    ("Ab", true, "1A"),
    ("D#", true, "2A"),
    ("Eb", true, "2A"),
    ("A#", true, "3A"),
    ("Bb", true, "3A"),
    ("F", true, "4A"),
    ("C", true, "5A"),
    ("G", true, "6A"),
    ("D", true, "7A"),
    ("A", true, "8A"),
    ("E", true, "9A"),
    ("B", true, "10A"),
    ("F#", true, "11A"),
    ("Gb", true, "11A"),
    ("C#", true, "12A"),
    ("Db", true, "12A"),
    ("B", false, "1B"),
    ("F#", false, "2B"),
    ("Gb", false, "2B"),
    ("C#", false, "3B"),
    ("Db", false, "3B"),
    ("G#", false, "4B"),
    ("Ab", false, "4B"),
    ("D#", false, "5B"),
    ("Eb", false, "5B"),
    ("A#", false, "6B"),
    ("Bb", false, "6B"),
    ("F", false, "7B"),
    ("C", false, "8B"),
    ("G", false, "9B"),
    ("D", false, "10B"),
    ("A", false, "11B"),
    ("E", false, "12B"),
];

/// Split a key name into (root, is_minor)
///
/// Accepts "Am", "a minor", "F#m", "Ebmaj", "C". Returns `None` when the
/// first character is not a note letter.
fn parse_key(key: &str) -> Option<(String, bool)> {
    let trimmed = key.trim();
    let mut chars = trimmed.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if !('A'..='G').contains(&letter) {
        return None;
    }

    let rest = chars.as_str();
    let (accidental, quality) = match rest.chars().next() {
        Some('#') => ("#", &rest[1..]),
        Some('b') => ("b", &rest[1..]),
        _ => ("", rest),
    };

    let quality = quality.trim().to_ascii_lowercase();
    let minor = quality.starts_with('m') && !quality.starts_with("maj");
    Some((format!("{}{}", letter, accidental), minor))
}

/// Camelot wheel position for a key name, if the key is recognized
pub fn camelot_key_for(key: &str) -> Option<&'static str> {
    let (root, minor) = parse_key(key)?;
    CAMELOT_WHEEL
        .iter()
        .find(|(r, m, _)| *r == root && *m == minor)
        .map(|(_, _, position)| *position)
}
