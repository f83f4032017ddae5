//! Offline demo backend
//!
//! Stands in for all three AI functions when no functions URL is configured
//! (`--demo`). Results are random but shaped like real replies, so the whole
//! session flow can be exercised without network access.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use super::analysis_client::{placeholder_series, ENERGY_CURVE_POINTS, WAVEFORM_POINTS};
use super::{
    AnalysisError, MatchError, MatchFinder, RemixError, RemixGenerator, TrackAnalyzer,
};
use crate::models::{
    camelot_key_for, sort_by_compatibility, AnalyzedTrack, ChangeType, KeyMode, RemixChange,
    RemixResult, RemixSection, RemixSettings, SectionSource, SectionType, SongMatch, SongSection,
    StemAnalysis, TrackAnalysis, TrackFile, PLACEHOLDER_AUDIO_URL,
};

const KEYS: [&str; 14] = [
    "Am", "Bm", "Cm", "Dm", "Em", "Fm", "Gm", "C", "D", "E", "F", "G", "A", "B",
];

const ARTISTS: [&str; 8] = [
    "Amelie Lens",
    "Charlotte de Witte",
    "Adam Beyer",
    "Enrico Sangiuliano",
    "Kobosil",
    "ANNA",
    "Blawan",
    "Paula Temple",
];

const GENRES: [&str; 4] = ["Techno", "Hard Techno", "Industrial Techno", "Melodic Techno"];
const SUB_GENRES: [&str; 6] = ["Peak Time", "Dark", "Hypnotic", "Driving", "Acid", "Raw"];
const TITLE_FIRST: [&str; 7] = ["Dark", "Night", "Pulse", "Machine", "System", "Control", "Movement"];
const TITLE_SECOND: [&str; 6] = ["Runner", "Driver", "Code", "Shift", "State", "Zone"];

const MATCH_REASONS: [&str; 4] = [
    "Harmonic compatibility, similar BPM range, complementary energy curve with strong drops",
    "Perfect key match for mixing, driving percussion pattern matches your track's groove",
    "Compatible Camelot wheel position, similar breakdown structure, energy levels align",
    "Bass frequencies complement your track, matching tempo allows seamless transitions",
];

/// Section layout as (type, start fraction, end fraction, energy)
const STRUCTURE_LAYOUT: [(SectionType, f64, f64, f64); 7] = [
    (SectionType::Intro, 0.0, 0.1, 0.4),
    (SectionType::Buildup, 0.1, 0.2, 0.7),
    (SectionType::Drop, 0.2, 0.4, 1.0),
    (SectionType::Break, 0.4, 0.55, 0.5),
    (SectionType::Buildup, 0.55, 0.65, 0.8),
    (SectionType::Drop, 0.65, 0.85, 1.0),
    (SectionType::Outro, 0.85, 1.0, 0.3),
];

/// Remix length relative to the first track
const REMIX_LENGTH_FACTOR: f64 = 0.8;

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Build-up, drop, build again: a fixed energy shape of 20 points
pub fn demo_energy_curve() -> Vec<f64> {
    (0..ENERGY_CURVE_POINTS)
        .map(|i| {
            let phase = i as f64 / ENERGY_CURVE_POINTS as f64;
            let value = if phase < 0.15 {
                0.3 + phase * 2.0
            } else if phase < 0.35 {
                0.6 + (phase - 0.15) * 2.0
            } else if phase < 0.45 {
                1.0 - (phase - 0.35) * 3.0
            } else if phase < 0.55 {
                0.7
            } else if phase < 0.75 {
                0.7 + (phase - 0.55) * 1.5
            } else {
                1.0 - (phase - 0.75) * 2.0
            };
            value.clamp(0.0, 1.0)
        })
        .collect()
}

/// Random analysis for `file_name` with a 3-6 minute duration
pub fn demo_analysis<R: Rng + ?Sized>(rng: &mut R, file_name: &str) -> AnalyzedTrack {
    let bpm = rng.gen_range(125..155_u32) as f64;
    let key = pick(rng, &KEYS);
    let duration = rng.gen_range(180..360_u32) as f64;

    let structure = STRUCTURE_LAYOUT
        .iter()
        .map(|&(section_type, start, end, energy)| SongSection {
            section_type,
            start_time: duration * start,
            end_time: duration * end,
            energy,
        })
        .collect();

    let analysis = TrackAnalysis {
        id: Uuid::new_v4().to_string(),
        file_name: file_name.to_string(),
        bpm,
        bpm_drift: rng.gen_range(0.0..1.5),
        key: key.to_string(),
        camelot_key: camelot_key_for(key).unwrap_or("8A").to_string(),
        mode: KeyMode::from_key(key),
        energy: rng.gen_range(0.6..1.0),
        energy_curve: demo_energy_curve(),
        structure,
        duration,
        waveform_data: placeholder_series(rng, WAVEFORM_POINTS),
    };

    let stems = StemAnalysis {
        vocals: rng.gen_range(0.1..0.7),
        drums: rng.gen_range(0.7..1.0),
        bass: rng.gen_range(0.6..0.9),
        synths: rng.gen_range(0.3..0.8),
        other: rng.gen_range(0.0..0.3),
    };

    AnalyzedTrack {
        analysis,
        stems: Some(stems),
    }
}

/// 3-5 random matches, near the analyzed tempo when there is one
pub fn demo_matches<R: Rng + ?Sized>(
    rng: &mut R,
    analysis: Option<&TrackAnalysis>,
    now_millis: i64,
) -> Vec<SongMatch> {
    let count: usize = rng.gen_range(3..=5);

    let mut matches: Vec<SongMatch> = (0..count)
        .map(|i| {
            let key = pick(rng, &KEYS);
            let bpm = match analysis {
                Some(a) => a.bpm + rng.gen_range(-3..3_i32) as f64,
                None => rng.gen_range(130..150_u32) as f64,
            };
            let score = (rng.gen_range(0..25) + 75 - (i as i32) * 5) as f64;

            SongMatch {
                id: format!("match-{}-{}", now_millis, i),
                title: format!("{} {}", pick(rng, &TITLE_FIRST), pick(rng, &TITLE_SECOND)),
                artist: pick(rng, &ARTISTS).to_string(),
                bpm,
                key: key.to_string(),
                camelot_key: camelot_key_for(key).unwrap_or("8A").to_string(),
                genre: pick(rng, &GENRES).to_string(),
                sub_genre: pick(rng, &SUB_GENRES).to_string(),
                energy_level: rng.gen_range(60..100_u32) as f64,
                compatibility_score: score.clamp(0.0, 100.0),
                match_reason: MATCH_REASONS[i % MATCH_REASONS.len()].to_string(),
            }
        })
        .collect();

    sort_by_compatibility(&mut matches);
    matches
}

/// Fixed seven-part arrangement, drawing on track 2 when there is one
pub fn demo_remix(analysis1: &TrackAnalysis, has_second_track: bool, id: String) -> RemixResult {
    let duration = (analysis1.duration * REMIX_LENGTH_FACTOR).max(1.0);
    let second = if has_second_track {
        SectionSource::Track2
    } else {
        SectionSource::Generated
    };
    let second_drop = if has_second_track {
        SectionSource::Track2
    } else {
        SectionSource::Track1
    };

    let layout = [
        ("intro", 0.0, 16.0, SectionSource::Generated, "Techno intro with rolling kick"),
        ("buildup", 16.0, 32.0, SectionSource::Track1, "Tension buildup with filtered elements"),
        ("drop", 32.0, 64.0, SectionSource::Track1, "Main drop with full energy"),
        ("breakdown", 64.0, 80.0, SectionSource::Generated, "Atmospheric break"),
        ("buildup", 80.0, 96.0, second, "Second tension build"),
        ("drop", 96.0, 144.0, second_drop, "Extended drop section"),
        ("outro", 144.0, duration, SectionSource::Generated, "DJ-friendly outro"),
    ];

    let timeline = layout
        .into_iter()
        .filter_map(|(kind, start, end, source, description)| {
            let end = f64::min(end, duration);
            (end > start).then(|| RemixSection {
                section_type: kind.to_string(),
                start_time: start,
                end_time: end,
                source,
                description: description.to_string(),
            })
        })
        .collect();

    let changes = [
        (ChangeType::Add, "Added techno-style kick pattern", 0.0),
        (ChangeType::Transform, "Pitch-shifted to match target key", 8.0),
        (ChangeType::Cut, "Removed weak verse section", 24.0),
        (ChangeType::Add, "Inserted tension riser before drop", 28.0),
        (ChangeType::Extend, "Extended drop section by 16 bars", 32.0),
        (ChangeType::Transform, "Applied sidechain compression to bass", 48.0),
        (ChangeType::Remove, "Cleaned cluttered mid frequencies", 56.0),
        (ChangeType::Add, "Added atmospheric breakdown elements", 64.0),
        (ChangeType::Extend, "Extended final drop for club play", 96.0),
    ]
    .into_iter()
    .map(|(change_type, description, timestamp)| RemixChange {
        change_type,
        description: description.to_string(),
        timestamp: f64::min(timestamp, duration),
    })
    .collect();

    RemixResult {
        id,
        audio_url: PLACEHOLDER_AUDIO_URL.to_string(),
        timeline,
        changes,
        duration,
        key_adjustment: None,
        bpm_adjustment: None,
    }
}

/// Offline implementation of every service seam
pub struct DemoBackend {
    delay: Duration,
}

impl DemoBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl TrackAnalyzer for DemoBackend {
    async fn analyze(&self, file: &TrackFile) -> Result<AnalyzedTrack, AnalysisError> {
        self.simulate_latency().await;
        let analyzed = demo_analysis(&mut rand::thread_rng(), &file.name);
        info!(file = %file.name, bpm = analyzed.analysis.bpm, "Demo analysis generated");
        Ok(analyzed)
    }
}

#[async_trait]
impl MatchFinder for DemoBackend {
    async fn find_matches(
        &self,
        analysis: Option<&TrackAnalysis>,
    ) -> Result<Vec<SongMatch>, MatchError> {
        self.simulate_latency().await;
        let matches = demo_matches(&mut rand::thread_rng(), analysis, Utc::now().timestamp_millis());
        info!(count = matches.len(), "Demo matches generated");
        Ok(matches)
    }
}

#[async_trait]
impl RemixGenerator for DemoBackend {
    async fn generate_remix(
        &self,
        analysis1: &TrackAnalysis,
        analysis2: Option<&TrackAnalysis>,
        _settings: &RemixSettings,
    ) -> Result<RemixResult, RemixError> {
        // Remix generation takes noticeably longer than the other calls
        self.simulate_latency().await;
        self.simulate_latency().await;

        let result = demo_remix(
            analysis1,
            analysis2.is_some(),
            format!("remix-{}", Utc::now().timestamp_millis()),
        );
        info!(remix_id = %result.id, duration = result.duration, "Demo remix generated");
        Ok(result)
    }
}
