//! Remix function client
//!
//! Sends one or two analyses plus the user's settings and returns a remix
//! plan. The result id and placeholder audio URL are assigned here, not by
//! the function.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::functions::{FunctionsClient, ServiceError, GENERATE_REMIX};
use super::{RemixError, RemixGenerator};
use crate::models::{
    ChangeType, RemixChange, RemixResult, RemixSection, RemixSettings, SectionSource,
    TrackAnalysis, DEFAULT_REMIX_DURATION_SECS, PLACEHOLDER_AUDIO_URL,
};

/// Request body of the remix function
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRemixRequest<'a> {
    pub analysis1: &'a TrackAnalysis,
    pub analysis2: Option<&'a TrackAnalysis>,
    pub settings: &'a RemixSettings,
}

/// Remix plan as sent by the function
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRemixPlan {
    pub timeline: Option<Vec<RawRemixSection>>,
    pub changes: Option<Vec<RawRemixChange>>,
    pub duration: Option<f64>,
    pub key_adjustment: Option<String>,
    pub bpm_adjustment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRemixSection {
    #[serde(rename = "type", default)]
    pub section_type: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub source: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRemixChange {
    #[serde(rename = "type")]
    pub change_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub timestamp: Option<f64>,
}

/// Repair a raw plan into a [`RemixResult`]
///
/// - missing `timeline` is a malformed response; missing `changes` is empty
/// - `duration` defaults to 360 s
/// - unknown section sources become `generated`
/// - unknown change types are dropped
/// - section and change times are clamped into [0, duration]
/// - sections are ordered by start and trimmed so none overlaps its
///   predecessor; sections that end up empty are dropped
pub fn normalize_remix(raw: RawRemixPlan, id: String) -> Result<RemixResult, ServiceError> {
    let timeline = raw.timeline.ok_or_else(|| {
        ServiceError::MalformedResponse("remix plan is missing a timeline".to_string())
    })?;

    let duration = raw
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(DEFAULT_REMIX_DURATION_SECS);

    let mut timeline: Vec<RemixSection> = timeline
        .into_iter()
        .filter_map(|section| {
            let start = section.start_time.filter(|t| t.is_finite())?.clamp(0.0, duration);
            let end = section.end_time.filter(|t| t.is_finite())?.clamp(0.0, duration);
            if end <= start {
                return None;
            }

            let source_label = section.source.unwrap_or_default();
            let source = SectionSource::parse(&source_label).unwrap_or_else(|| {
                warn!(source = %source_label, "Unknown remix section source, using generated");
                SectionSource::Generated
            });

            Some(RemixSection {
                section_type: section.section_type.unwrap_or_else(|| "section".to_string()),
                start_time: start,
                end_time: end,
                source,
                description: section.description.unwrap_or_default(),
            })
        })
        .collect();
    timeline.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut previous_end = 0.0_f64;
    timeline.retain_mut(|section| {
        section.start_time = section.start_time.max(previous_end);
        if section.end_time <= section.start_time {
            return false;
        }
        previous_end = section.end_time;
        true
    });

    let changes = raw
        .changes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|change| {
            let label = change.change_type.unwrap_or_default();
            let Some(change_type) = ChangeType::parse(&label) else {
                warn!(change_type = %label, "Dropping remix change with unknown type");
                return None;
            };
            let timestamp = change.timestamp.filter(|t| t.is_finite()).unwrap_or(0.0);

            Some(RemixChange {
                change_type,
                description: change.description.unwrap_or_default(),
                timestamp: timestamp.clamp(0.0, duration),
            })
        })
        .collect();

    Ok(RemixResult {
        id,
        audio_url: PLACEHOLDER_AUDIO_URL.to_string(),
        timeline,
        changes,
        duration,
        key_adjustment: raw.key_adjustment,
        bpm_adjustment: raw.bpm_adjustment,
    })
}

/// Remix client backed by the `generate-remix` function
pub struct RemixClient {
    functions: FunctionsClient,
}

impl RemixClient {
    pub fn new(functions: FunctionsClient) -> Self {
        Self { functions }
    }
}

#[async_trait]
impl RemixGenerator for RemixClient {
    async fn generate_remix(
        &self,
        analysis1: &TrackAnalysis,
        analysis2: Option<&TrackAnalysis>,
        settings: &RemixSettings,
    ) -> Result<RemixResult, RemixError> {
        let request = GenerateRemixRequest {
            analysis1,
            analysis2,
            settings,
        };

        info!(
            track1 = %analysis1.file_name,
            track2 = analysis2.map(|a| a.file_name.as_str()).unwrap_or("none"),
            style = settings.style.as_str(),
            target_bpm = settings.target_bpm,
            "Requesting remix plan"
        );

        let raw: RawRemixPlan = self.functions.invoke(GENERATE_REMIX, &request).await?;
        let result = normalize_remix(raw, format!("remix-{}", Utc::now().timestamp_millis()))?;

        info!(
            remix_id = %result.id,
            sections = result.timeline.len(),
            changes = result.changes.len(),
            duration = result.duration,
            "Remix plan received"
        );

        Ok(result)
    }
}
