//! Scripted backend for engine tests
//!
//! Analyses are keyed by file name: each file can be given its own delay,
//! tempo or failure. Match search and remix generation have one scripted
//! outcome each.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use remix_common::events::{EventBus, RemixEvent};
use tokio::sync::broadcast;

use remix_engine::engine::RemixEngine;
use remix_engine::models::{
    AnalyzedTrack, KeyMode, RemixResult, RemixSection, RemixSettings, SectionSource, SectionType,
    SongMatch, SongSection, StemAnalysis, TrackAnalysis, TrackFile, PLACEHOLDER_AUDIO_URL,
};
use remix_engine::services::{
    AnalysisError, Backend, MatchError, MatchFinder, RemixError, RemixGenerator, ServiceError,
    TrackAnalyzer,
};

/// Progress tick interval used by engine tests
pub const TEST_PROGRESS_INTERVAL: Duration = Duration::from_millis(20);

/// Analysis for `file_name` with the given tempo and a simple structure
pub fn sample_analysis(file_name: &str, bpm: f64) -> TrackAnalysis {
    TrackAnalysis {
        id: format!("analysis-{}", file_name),
        file_name: file_name.to_string(),
        bpm,
        bpm_drift: 0.2,
        key: "Am".to_string(),
        camelot_key: "8A".to_string(),
        mode: KeyMode::Minor,
        energy: 0.8,
        energy_curve: vec![0.6; 20],
        structure: vec![
            SongSection {
                section_type: SectionType::Intro,
                start_time: 0.0,
                end_time: 60.0,
                energy: 0.4,
            },
            SongSection {
                section_type: SectionType::Drop,
                start_time: 60.0,
                end_time: 300.0,
                energy: 1.0,
            },
        ],
        duration: 300.0,
        waveform_data: vec![0.5; 100],
    }
}

pub fn sample_match(title: &str, score: f64) -> SongMatch {
    SongMatch {
        id: format!("match-{}", title),
        title: title.to_string(),
        artist: "Paula Temple".to_string(),
        bpm: 138.0,
        key: "Am".to_string(),
        camelot_key: "8A".to_string(),
        genre: "Techno".to_string(),
        sub_genre: "Raw".to_string(),
        energy_level: 85.0,
        compatibility_score: score,
        match_reason: "Same key".to_string(),
    }
}

fn sample_remix(duration: f64) -> RemixResult {
    RemixResult {
        id: "remix-test".to_string(),
        audio_url: PLACEHOLDER_AUDIO_URL.to_string(),
        timeline: vec![RemixSection {
            section_type: "drop".to_string(),
            start_time: 0.0,
            end_time: duration,
            source: SectionSource::Track1,
            description: "Full drop".to_string(),
        }],
        changes: Vec::new(),
        duration,
        key_adjustment: None,
        bpm_adjustment: None,
    }
}

/// Backend whose answers are set up by the test
#[derive(Default)]
pub struct FakeBackend {
    analysis_delays: Mutex<HashMap<String, Duration>>,
    analysis_bpm: Mutex<HashMap<String, f64>>,
    analysis_failures: Mutex<HashMap<String, ServiceError>>,
    match_delay: Mutex<Duration>,
    match_outcome: Mutex<Option<Result<Vec<SongMatch>, ServiceError>>>,
    remix_delay: Mutex<Duration>,
    remix_failure: Mutex<Option<ServiceError>>,
    pub match_calls: AtomicUsize,
    pub remix_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn analysis_delay(&self, file_name: &str, delay: Duration) {
        self.analysis_delays
            .lock()
            .unwrap()
            .insert(file_name.to_string(), delay);
    }

    pub fn analysis_bpm(&self, file_name: &str, bpm: f64) {
        self.analysis_bpm.lock().unwrap().insert(file_name.to_string(), bpm);
    }

    pub fn fail_analysis(&self, file_name: &str, error: ServiceError) {
        self.analysis_failures
            .lock()
            .unwrap()
            .insert(file_name.to_string(), error);
    }

    pub fn match_delay(&self, delay: Duration) {
        *self.match_delay.lock().unwrap() = delay;
    }

    pub fn match_outcome(&self, outcome: Result<Vec<SongMatch>, ServiceError>) {
        *self.match_outcome.lock().unwrap() = Some(outcome);
    }

    pub fn remix_delay(&self, delay: Duration) {
        *self.remix_delay.lock().unwrap() = delay;
    }

    pub fn fail_remix(&self, error: ServiceError) {
        *self.remix_failure.lock().unwrap() = Some(error);
    }

    pub fn backend(self: &Arc<Self>) -> Backend {
        Backend::new(self.clone(), self.clone(), self.clone())
    }
}

#[async_trait]
impl TrackAnalyzer for FakeBackend {
    async fn analyze(&self, file: &TrackFile) -> Result<AnalyzedTrack, AnalysisError> {
        let delay = self
            .analysis_delays
            .lock()
            .unwrap()
            .get(&file.name)
            .copied()
            .unwrap_or(Duration::ZERO);
        tokio::time::sleep(delay).await;

        if let Some(error) = self.analysis_failures.lock().unwrap().get(&file.name).cloned() {
            return Err(error.into());
        }

        let bpm = self
            .analysis_bpm
            .lock()
            .unwrap()
            .get(&file.name)
            .copied()
            .unwrap_or(138.0);

        Ok(AnalyzedTrack {
            analysis: sample_analysis(&file.name, bpm),
            stems: Some(StemAnalysis {
                vocals: 0.2,
                drums: 0.9,
                bass: 0.8,
                synths: 0.6,
                other: 0.1,
            }),
        })
    }
}

#[async_trait]
impl MatchFinder for FakeBackend {
    async fn find_matches(
        &self,
        _analysis: Option<&TrackAnalysis>,
    ) -> Result<Vec<SongMatch>, MatchError> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.match_delay.lock().unwrap();
        tokio::time::sleep(delay).await;

        let outcome = self
            .match_outcome
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(vec![sample_match("Pulse Zone", 91.0), sample_match("Night Code", 84.0)]));
        outcome.map_err(MatchError::from)
    }
}

#[async_trait]
impl RemixGenerator for FakeBackend {
    async fn generate_remix(
        &self,
        analysis1: &TrackAnalysis,
        _analysis2: Option<&TrackAnalysis>,
        _settings: &RemixSettings,
    ) -> Result<RemixResult, RemixError> {
        self.remix_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.remix_delay.lock().unwrap();
        tokio::time::sleep(delay).await;

        if let Some(error) = self.remix_failure.lock().unwrap().clone() {
            return Err(error.into());
        }
        Ok(sample_remix(analysis1.duration * 0.8))
    }
}

/// Engine over `fake` plus a receiver subscribed before any action
pub fn test_engine(fake: &Arc<FakeBackend>) -> (RemixEngine, broadcast::Receiver<RemixEvent>) {
    let engine = RemixEngine::new(fake.backend(), EventBus::new(1024), TEST_PROGRESS_INTERVAL);
    let rx = engine.event_bus().subscribe();
    (engine, rx)
}

/// Everything currently buffered on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<RemixEvent>) -> Vec<RemixEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn error_notifications(events: &[RemixEvent]) -> Vec<&RemixEvent> {
    events.iter().filter(|e| e.is_error_notification()).collect()
}
