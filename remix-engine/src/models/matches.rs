//! Song match suggestions

use serde::{Deserialize, Serialize};

use super::TrackAnalysis;

/// A suggested compatible track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMatch {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub bpm: f64,
    pub key: String,
    pub camelot_key: String,
    pub genre: String,
    pub sub_genre: String,
    /// Energy level, 0-100
    pub energy_level: f64,
    /// Compatibility with the analyzed track, 0-100
    pub compatibility_score: f64,
    /// Free-text explanation from the AI service
    pub match_reason: String,
}

/// Search mode sent to the match function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSearchMode {
    /// Suggest tracks compatible with one analyzed track
    Single,
    /// No analysis yet: suggest a pair of tracks that remix well together
    Discovery,
}

impl MatchSearchMode {
    /// `single` when an analysis is supplied, `discovery` otherwise
    pub fn for_analysis(analysis: Option<&TrackAnalysis>) -> Self {
        if analysis.is_some() {
            MatchSearchMode::Single
        } else {
            MatchSearchMode::Discovery
        }
    }
}

/// Matcher panel mode derived from which tracks are selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherMode {
    Single,
    Discovery,
    None,
}

impl MatcherMode {
    /// `discovery` with no tracks, `single` when track 1 is selected, else `none`
    pub fn derive(track1_selected: bool, track2_selected: bool) -> Self {
        match (track1_selected, track2_selected) {
            (false, false) => MatcherMode::Discovery,
            (true, _) => MatcherMode::Single,
            (false, true) => MatcherMode::None,
        }
    }
}

/// Order matches by descending compatibility score
///
/// The sort is stable, so a list the service already ordered is left as is.
pub fn sort_by_compatibility(matches: &mut [SongMatch]) {
    matches.sort_by(|a, b| b.compatibility_score.total_cmp(&a.compatibility_score));
}
