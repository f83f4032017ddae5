//! Remix session orchestration
//!
//! [`RemixEngine`] owns the session, sequences calls to the three service
//! seams and turns every outcome into state updates plus events. Nothing
//! fails out of the engine: remote errors become one error notification.
//!
//! Each user action is split in two:
//! - `begin_*` validates the action, applies the mode change and returns a
//!   job. Rejections emit exactly one error notification.
//! - `run_*` performs the remote call without holding the lock and applies
//!   the outcome in a single write.
//!
//! The HTTP layer calls `begin_*` inline and spawns `run_*`; the combined
//! helpers (`select_track`, `find_matches`, `start_remix`) do both in order.

pub mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use remix_common::events::{EventBus, RemixEvent};
use remix_common::human_time::format_megabytes;

use crate::models::{RemixSettings, RemixStage, TrackAnalysis, TrackFile, TrackSlot};
use crate::services::{Backend, ProgressTicker};

pub use state::{ModeChange, Rejection, SessionSnapshot, SessionState, Trigger};

/// Why the engine refused an action
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("{0}")]
    InvalidInput(String),
}

impl EngineError {
    fn title(&self) -> &'static str {
        match self {
            EngineError::Rejected(rejection) => rejection.title(),
            EngineError::InvalidInput(_) => "Invalid input",
        }
    }
}

/// Analysis request accepted by [`RemixEngine::begin_track`]
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub slot: TrackSlot,
    pub file: TrackFile,
    generation: u64,
}

/// Match search accepted by [`RemixEngine::begin_matches`]
#[derive(Debug, Clone)]
pub struct MatchJob {
    pub analysis: Option<TrackAnalysis>,
    generation: u64,
}

/// Remix run accepted by [`RemixEngine::begin_remix`]
#[derive(Debug, Clone)]
pub struct RemixJob {
    pub analysis1: TrackAnalysis,
    pub analysis2: Option<TrackAnalysis>,
    pub settings: RemixSettings,
    generation: u64,
}

fn mode_event(change: ModeChange) -> RemixEvent {
    RemixEvent::ModeChanged {
        old_mode: change.from,
        new_mode: change.to,
        timestamp: Utc::now(),
    }
}

fn progress_event(progress: f64) -> RemixEvent {
    RemixEvent::RemixProgress {
        progress,
        stage: RemixStage::from_progress(progress).label().to_string(),
        timestamp: Utc::now(),
    }
}

/// Session orchestrator
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct RemixEngine {
    state: Arc<RwLock<SessionState>>,
    backend: Backend,
    event_bus: EventBus,
    progress_interval: Duration,
}

impl RemixEngine {
    pub fn new(backend: Backend, event_bus: EventBus, progress_interval: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::new())),
            backend,
            event_bus,
            progress_interval,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Current session with derived values
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    fn emit_all(&self, events: Vec<RemixEvent>) {
        for event in events {
            self.event_bus.emit_lossy(event);
        }
    }

    fn reject(&self, error: EngineError) -> EngineError {
        warn!(error = %error, "Action rejected");
        self.event_bus
            .emit_lossy(RemixEvent::error(error.title(), error.to_string()));
        error
    }

    /// Record `file` for `slot` and enter analyzing mode
    pub async fn begin_track(&self, slot: TrackSlot, file: TrackFile) -> Result<AnalysisJob, EngineError> {
        if let Err(e) = file.validate() {
            return Err(self.reject(EngineError::InvalidInput(e.to_string())));
        }

        let (generation, change) = {
            let mut state = self.state.write().await;
            state.select_track(slot, file.clone())
        };

        info!(
            slot = %slot,
            file = %file.name,
            size = %format_megabytes(file.size),
            "Track selected"
        );
        self.emit_all(change.map(mode_event).into_iter().collect());

        Ok(AnalysisJob {
            slot,
            file,
            generation,
        })
    }

    /// Analyze the job's file and apply the outcome unless a newer selection won
    pub async fn run_analysis(&self, job: AnalysisJob) {
        let outcome = self.backend.analyzer.analyze(&job.file).await;

        let mut events = Vec::new();
        {
            let mut state = self.state.write().await;
            if !state.is_current(job.slot, job.generation) {
                debug!(slot = %job.slot, file = %job.file.name, "Discarding stale analysis result");
                return;
            }

            match outcome {
                Ok(analyzed) => {
                    let analysis = &analyzed.analysis;
                    info!(
                        slot = %job.slot,
                        bpm = analysis.bpm,
                        key = %analysis.key,
                        "Track analysis applied"
                    );
                    events.push(RemixEvent::AnalysisCompleted {
                        slot: job.slot,
                        analysis_id: analysis.id.clone(),
                        file_name: analysis.file_name.clone(),
                        bpm: analysis.bpm,
                        key: analysis.key.clone(),
                        timestamp: Utc::now(),
                    });
                    let message = format!(
                        "{}: {:.0} BPM in {} ({})",
                        analysis.file_name, analysis.bpm, analysis.key, analysis.camelot_key
                    );

                    let change = state.complete_analysis(job.slot, analyzed);
                    events.extend(change.map(mode_event));
                    events.push(RemixEvent::success("Analysis complete", message));
                }
                Err(e) => {
                    warn!(slot = %job.slot, file = %job.file.name, error = %e, "Track analysis failed");
                    let change = state.fail_analysis(job.slot);
                    events.extend(change.map(mode_event));

                    let title = if e.is_rate_limited() {
                        "Rate limited"
                    } else {
                        "Analysis failed"
                    };
                    events.push(RemixEvent::error(title, e.to_string()));
                }
            }
        }

        self.emit_all(events);
    }

    /// Select and analyze a track, returning once the outcome is applied
    pub async fn select_track(&self, slot: TrackSlot, file: TrackFile) -> Result<(), EngineError> {
        let job = self.begin_track(slot, file).await?;
        self.run_analysis(job).await;
        Ok(())
    }

    /// Forget a track; clearing track 1 returns to upload mode
    pub async fn clear_track(&self, slot: TrackSlot) {
        let change = {
            let mut state = self.state.write().await;
            state.clear_track(slot)
        };

        info!(slot = %slot, "Track cleared");

        let mut events: Vec<RemixEvent> = change.map(mode_event).into_iter().collect();
        events.push(RemixEvent::TrackCleared {
            slot,
            timestamp: Utc::now(),
        });
        self.emit_all(events);
    }

    /// Replace the remix settings after validating them
    pub async fn update_settings(&self, settings: RemixSettings) -> Result<(), EngineError> {
        if let Err(e) = settings.validate() {
            return Err(self.reject(EngineError::InvalidInput(e.to_string())));
        }

        debug!(?settings, "Remix settings updated");
        self.state.write().await.settings = settings;
        Ok(())
    }

    /// Enter matching mode, capturing the analysis to search with
    pub async fn begin_matches(&self) -> Result<MatchJob, EngineError> {
        let result = {
            let mut state = self.state.write().await;
            state
                .begin_match_search()
                .map(|(generation, change)| (generation, change, state.primary_analysis().cloned()))
        };

        match result {
            Ok((generation, change, analysis)) => {
                info!(with_analysis = analysis.is_some(), generation, "Match search started");
                self.emit_all(change.map(mode_event).into_iter().collect());
                Ok(MatchJob { analysis, generation })
            }
            Err(rejection) => Err(self.reject(rejection.into())),
        }
    }

    /// Run the search; the match list is only replaced on success
    ///
    /// Only the most recently started search may resolve; older outcomes are dropped.
    pub async fn run_matches(&self, job: MatchJob) {
        let outcome = self.backend.matcher.find_matches(job.analysis.as_ref()).await;

        let mut events = Vec::new();
        {
            let mut state = self.state.write().await;
            if !state.is_current_match(job.generation) {
                debug!(generation = job.generation, "Discarding stale match results");
                return;
            }
            match outcome {
                Ok(matches) => {
                    let count = matches.len();
                    info!(count, "Match search applied");
                    let change = state.resolve_match_search(Some(matches));
                    events.extend(change.map(mode_event));
                    events.push(RemixEvent::MatchesUpdated {
                        count,
                        timestamp: Utc::now(),
                    });
                    events.push(RemixEvent::success(
                        "Matches found",
                        format!("Found {} compatible tracks", count),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "Match search failed");
                    let change = state.resolve_match_search(None);
                    events.extend(change.map(mode_event));

                    let title = if e.is_rate_limited() {
                        "Rate limited"
                    } else {
                        "Match search failed"
                    };
                    events.push(RemixEvent::error(title, e.to_string()));
                }
            }
        }

        self.emit_all(events);
    }

    /// Search for matches, returning once the outcome is applied
    pub async fn find_matches(&self) -> Result<(), EngineError> {
        let job = self.begin_matches().await?;
        self.run_matches(job).await;
        Ok(())
    }

    /// Enter remixing mode; needs track 1 analyzed
    pub async fn begin_remix(&self) -> Result<RemixJob, EngineError> {
        let result = {
            let mut state = self.state.write().await;
            match state.begin_remix() {
                Ok((generation, change)) => match state.primary_analysis().cloned() {
                    Some(analysis1) => Ok((
                        RemixJob {
                            analysis1,
                            analysis2: state.track(TrackSlot::Track2).analysis.clone(),
                            settings: state.settings.clone(),
                            generation,
                        },
                        change,
                    )),
                    None => Err(Rejection::MissingPrimaryAnalysis),
                },
                Err(rejection) => Err(rejection),
            }
        };

        match result {
            Ok((job, change)) => {
                info!(
                    track1 = %job.analysis1.file_name,
                    with_track2 = job.analysis2.is_some(),
                    style = job.settings.style.as_str(),
                    "Remix started"
                );
                let mut events: Vec<RemixEvent> = change.map(mode_event).into_iter().collect();
                events.push(progress_event(0.0));
                self.emit_all(events);
                Ok(job)
            }
            Err(rejection) => Err(self.reject(rejection.into())),
        }
    }

    fn start_ticker(&self, generation: u64) -> ProgressTicker {
        let engine = self.clone();
        ProgressTicker::start(self.progress_interval, move |progress| {
            let engine = engine.clone();
            async move {
                engine.apply_progress(generation, progress).await;
            }
        })
    }

    async fn apply_progress(&self, generation: u64, progress: f64) {
        let mut state = self.state.write().await;
        if !state.is_current_remix(generation) {
            return;
        }
        state.progress = progress;
        self.event_bus.emit_lossy(progress_event(progress));
    }

    /// Generate the remix while simulating progress
    ///
    /// The ticker is stopped before the outcome is applied, so 100 is always
    /// the last progress value after a success.
    pub async fn run_remix(&self, job: RemixJob) {
        let ticker = self.start_ticker(job.generation);
        let outcome = self
            .backend
            .remixer
            .generate_remix(&job.analysis1, job.analysis2.as_ref(), &job.settings)
            .await;
        ticker.stop().await;

        let mut events = Vec::new();
        {
            let mut state = self.state.write().await;
            if !state.is_current_remix(job.generation) {
                debug!(generation = job.generation, "Discarding superseded remix result");
                return;
            }

            match outcome {
                Ok(result) => {
                    info!(remix_id = %result.id, duration = result.duration, "Remix applied");
                    events.push(progress_event(100.0));
                    events.push(RemixEvent::RemixCompleted {
                        remix_id: result.id.clone(),
                        duration: result.duration,
                        timestamp: Utc::now(),
                    });
                    let change = state.complete_remix(result);
                    events.extend(change.map(mode_event));
                    events.push(RemixEvent::success("Remix complete", "Your techno remix is ready"));
                }
                Err(e) => {
                    warn!(error = %e, "Remix generation failed");
                    let change = state.fail_remix();
                    events.push(progress_event(0.0));
                    events.extend(change.map(mode_event));

                    let title = if e.is_rate_limited() {
                        "Rate limited"
                    } else {
                        "Remix failed"
                    };
                    events.push(RemixEvent::error(title, e.to_string()));
                }
            }
        }

        self.emit_all(events);
    }

    /// Generate a remix, returning once the outcome is applied
    pub async fn start_remix(&self) -> Result<(), EngineError> {
        let job = self.begin_remix().await?;
        self.run_remix(job).await;
        Ok(())
    }
}
