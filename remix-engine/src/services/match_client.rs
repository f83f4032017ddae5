//! Match function client
//!
//! Sends the current analysis (or nothing, for discovery) and returns
//! compatible tracks ordered by descending compatibility.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::functions::{FunctionsClient, FIND_MATCHES};
use super::{MatchError, MatchFinder};
use crate::models::{sort_by_compatibility, MatchSearchMode, SongMatch, TrackAnalysis};

/// Request body of the match function
#[derive(Debug, Clone, Serialize)]
pub struct FindMatchesRequest<'a> {
    pub analysis: Option<&'a TrackAnalysis>,
    pub mode: MatchSearchMode,
}

/// Reply of the match function
#[derive(Debug, Clone, Deserialize)]
pub struct FindMatchesResponse {
    pub matches: Vec<RawMatch>,
}

/// Match entry as sent by the function; `id` is usually absent
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub bpm: f64,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub camelot_key: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub sub_genre: String,
    #[serde(default)]
    pub energy_level: f64,
    #[serde(default)]
    pub compatibility_score: f64,
    #[serde(default)]
    pub match_reason: String,
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Give every match an id and order the list by compatibility
///
/// Missing ids become `match-<unix-ms>-<index>`, index being the position in
/// the reply. Scores are clamped into 0-100.
pub fn assign_match_ids(raw: Vec<RawMatch>, now_millis: i64) -> Vec<SongMatch> {
    let mut matches: Vec<SongMatch> = raw
        .into_iter()
        .enumerate()
        .map(|(index, m)| SongMatch {
            id: m
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("match-{}-{}", now_millis, index)),
            title: m.title,
            artist: m.artist,
            bpm: m.bpm,
            key: m.key,
            camelot_key: m.camelot_key,
            genre: m.genre,
            sub_genre: m.sub_genre,
            energy_level: clamp_percent(m.energy_level),
            compatibility_score: clamp_percent(m.compatibility_score),
            match_reason: m.match_reason,
        })
        .collect();

    sort_by_compatibility(&mut matches);
    matches
}

/// Match client backed by the `find-matches` function
pub struct MatchClient {
    functions: FunctionsClient,
}

impl MatchClient {
    pub fn new(functions: FunctionsClient) -> Self {
        Self { functions }
    }
}

#[async_trait]
impl MatchFinder for MatchClient {
    async fn find_matches(
        &self,
        analysis: Option<&TrackAnalysis>,
    ) -> Result<Vec<SongMatch>, MatchError> {
        let request = FindMatchesRequest {
            analysis,
            mode: MatchSearchMode::for_analysis(analysis),
        };

        info!(mode = ?request.mode, "Requesting song matches");

        let response: FindMatchesResponse = self.functions.invoke(FIND_MATCHES, &request).await?;
        let matches = assign_match_ids(response.matches, Utc::now().timestamp_millis());

        info!(count = matches.len(), "Song matches received");
        Ok(matches)
    }
}
