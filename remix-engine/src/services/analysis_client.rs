//! Analysis function client
//!
//! Turns a selected file into a [`TrackAnalysis`]. Only the file name and
//! size leave the machine; the remote function estimates everything else.
//!
//! The reply is decoded into [`RawAnalysis`] (every field optional) and then
//! repaired by [`normalize_analysis`], which owns the whole defaulting policy:
//!
//! | Field          | When missing                                   |
//! |----------------|------------------------------------------------|
//! | energyCurve    | 20 placeholder values in [0.2, 1.0]            |
//! | waveformData   | 100 placeholder values in [0.2, 1.0]           |
//! | structure      | empty                                          |
//! | duration       | the estimate that was sent                     |
//! | fileName       | the selected file's name                       |
//! | bpmDrift       | 0                                              |
//! | energy         | mean of the energy curve                       |
//! | camelotKey     | looked up from `key` ("8A" if unknown)         |
//! | mode           | derived from `key`                             |
//! | bpm, key       | required: malformed response                   |

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::functions::{FunctionsClient, ServiceError, ANALYZE_AUDIO};
use super::{AnalysisError, TrackAnalyzer};
use crate::models::{
    camelot_key_for, AnalyzedTrack, KeyMode, SectionType, SongSection, StemAnalysis, TrackAnalysis,
    TrackFile,
};

/// Bytes treated as one minute of audio by the duration heuristic
pub const BYTES_PER_MINUTE: u64 = 1024 * 1024;

/// Shortest duration the heuristic reports (3 minutes)
pub const MIN_ESTIMATED_DURATION_SECS: f64 = 180.0;

/// Longest duration the heuristic reports (10 minutes)
pub const MAX_ESTIMATED_DURATION_SECS: f64 = 600.0;

/// Placeholder energy curve length
pub const ENERGY_CURVE_POINTS: usize = 20;

/// Placeholder waveform length
pub const WAVEFORM_POINTS: usize = 100;

const CAMELOT_FALLBACK: &str = "8A";
const DEFAULT_SECTION_ENERGY: f64 = 0.5;

/// Estimate duration from file size: one minute per MiB, clamped to 3-10 minutes
pub fn estimate_duration(size_bytes: u64) -> f64 {
    let minutes = size_bytes as f64 / BYTES_PER_MINUTE as f64;
    (minutes * 60.0).clamp(MIN_ESTIMATED_DURATION_SECS, MAX_ESTIMATED_DURATION_SECS)
}

/// Request body of the analysis function
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest<'a> {
    pub file_name: &'a str,
    pub file_size: u64,
    pub duration: f64,
}

/// Analysis reply as sent by the function, nothing guaranteed
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    pub bpm: Option<f64>,
    pub bpm_drift: Option<f64>,
    pub key: Option<String>,
    pub camelot_key: Option<String>,
    pub mode: Option<String>,
    pub energy: Option<f64>,
    pub energy_curve: Option<Vec<f64>>,
    pub structure: Option<Vec<RawSection>>,
    pub stem_analysis: Option<RawStems>,
    pub waveform_data: Option<Vec<f64>>,
    pub duration: Option<f64>,
    pub file_name: Option<String>,
}

/// Structure entry as sent by the function
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSection {
    #[serde(rename = "type")]
    pub section_type: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub energy: Option<f64>,
}

/// Stem levels as sent by the function
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStems {
    pub vocals: Option<f64>,
    pub drums: Option<f64>,
    pub bass: Option<f64>,
    pub synths: Option<f64>,
    pub other: Option<f64>,
}

/// Values the client already knows, used to fill gaps in a reply
#[derive(Debug, Clone)]
pub struct AnalysisFallback {
    pub file_name: String,
    pub duration: f64,
}

/// Clamp into [0, 1]; NaN and infinities become 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `len` pseudo-random values in [0.2, 1.0]
pub fn placeholder_series<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(0.2..=1.0)).collect()
}

fn unit_series<R: Rng + ?Sized>(values: Option<Vec<f64>>, len: usize, rng: &mut R) -> Vec<f64> {
    match values {
        Some(values) if !values.is_empty() => values.into_iter().map(clamp_unit).collect(),
        _ => placeholder_series(rng, len),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Repair a raw reply into an analysis that satisfies every model invariant
///
/// Fails only when `bpm` or `key` is missing or unusable.
pub fn normalize_analysis<R: Rng + ?Sized>(
    raw: RawAnalysis,
    fallback: &AnalysisFallback,
    rng: &mut R,
) -> Result<AnalyzedTrack, ServiceError> {
    let bpm = raw
        .bpm
        .filter(|b| b.is_finite() && *b > 0.0)
        .ok_or_else(|| ServiceError::MalformedResponse("analysis is missing a valid bpm".to_string()))?;

    let key = non_blank(raw.key)
        .ok_or_else(|| ServiceError::MalformedResponse("analysis is missing a key".to_string()))?;

    let duration = raw
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(fallback.duration);

    let energy_curve = unit_series(raw.energy_curve, ENERGY_CURVE_POINTS, rng);
    let waveform_data = unit_series(raw.waveform_data, WAVEFORM_POINTS, rng);

    let energy = match raw.energy {
        Some(energy) => clamp_unit(energy),
        None => energy_curve.iter().sum::<f64>() / energy_curve.len() as f64,
    };

    let camelot_key = non_blank(raw.camelot_key).unwrap_or_else(|| {
        let looked_up = camelot_key_for(&key).unwrap_or(CAMELOT_FALLBACK);
        debug!(key = %key, camelot = %looked_up, "Camelot key missing, derived from key");
        looked_up.to_string()
    });

    let mode = raw
        .mode
        .as_deref()
        .and_then(KeyMode::parse)
        .unwrap_or_else(|| KeyMode::from_key(&key));

    let structure = normalize_structure(raw.structure.unwrap_or_default(), duration);

    let stems = raw.stem_analysis.map(|s| StemAnalysis {
        vocals: clamp_unit(s.vocals.unwrap_or(0.0)),
        drums: clamp_unit(s.drums.unwrap_or(0.0)),
        bass: clamp_unit(s.bass.unwrap_or(0.0)),
        synths: clamp_unit(s.synths.unwrap_or(0.0)),
        other: clamp_unit(s.other.unwrap_or(0.0)),
    });

    let analysis = TrackAnalysis {
        id: Uuid::new_v4().to_string(),
        file_name: non_blank(raw.file_name).unwrap_or_else(|| fallback.file_name.clone()),
        bpm,
        bpm_drift: raw.bpm_drift.filter(|d| d.is_finite()).unwrap_or(0.0).max(0.0),
        key,
        camelot_key,
        mode,
        energy,
        energy_curve,
        structure,
        duration,
        waveform_data,
    };

    Ok(AnalyzedTrack { analysis, stems })
}

/// Make sections ordered, non-overlapping and inside [0, duration]
///
/// Unknown section types and sections without times are dropped; overlaps
/// are resolved by starting a section where the previous one ended.
pub fn normalize_structure(raw: Vec<RawSection>, duration: f64) -> Vec<SongSection> {
    let mut sections: Vec<SongSection> = raw
        .into_iter()
        .filter_map(|section| {
            let label = section.section_type.unwrap_or_default();
            let Some(section_type) = SectionType::parse_lenient(&label) else {
                warn!(section_type = %label, "Dropping section with unknown type");
                return None;
            };
            let start = section.start_time.filter(|t| t.is_finite())?;
            let end = section.end_time.filter(|t| t.is_finite())?;

            Some(SongSection {
                section_type,
                start_time: start.clamp(0.0, duration),
                end_time: end.clamp(0.0, duration),
                energy: clamp_unit(section.energy.unwrap_or(DEFAULT_SECTION_ENERGY)),
            })
        })
        .collect();

    sections.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut previous_end = 0.0_f64;
    sections.retain_mut(|section| {
        section.start_time = section.start_time.max(previous_end);
        if section.end_time <= section.start_time {
            return false;
        }
        previous_end = section.end_time;
        true
    });

    sections
}

/// Analysis client backed by the `analyze-audio` function
pub struct AnalysisClient {
    functions: FunctionsClient,
}

impl AnalysisClient {
    pub fn new(functions: FunctionsClient) -> Self {
        Self { functions }
    }
}

#[async_trait]
impl TrackAnalyzer for AnalysisClient {
    async fn analyze(&self, file: &TrackFile) -> Result<AnalyzedTrack, AnalysisError> {
        let duration = estimate_duration(file.size);
        let request = AnalyzeRequest {
            file_name: &file.name,
            file_size: file.size,
            duration,
        };

        info!(file = %file.name, size = file.size, duration, "Requesting track analysis");

        let raw: RawAnalysis = self.functions.invoke(ANALYZE_AUDIO, &request).await?;
        let fallback = AnalysisFallback {
            file_name: file.name.clone(),
            duration,
        };
        let analyzed = normalize_analysis(raw, &fallback, &mut rand::thread_rng())?;

        info!(
            file = %analyzed.analysis.file_name,
            bpm = analyzed.analysis.bpm,
            key = %analyzed.analysis.key,
            sections = analyzed.analysis.structure.len(),
            "Track analysis received"
        );

        Ok(analyzed)
    }
}
