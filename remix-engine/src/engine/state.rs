//! Session state and mode transitions
//!
//! [`transition`] decides the next mode for a trigger without touching any
//! state. [`SessionState`] applies those decisions together with the data
//! updates that belong to them, so one call leaves the session consistent.
//! The engine is the only writer.

use serde::Serialize;
use thiserror::Error;

use remix_common::human_time::format_clock;

use crate::models::{
    AnalyzedTrack, AppMode, MatcherMode, RemixResult, RemixSettings, RemixStage, SongMatch,
    StemAnalysis, TrackAnalysis, TrackFile, TrackSlot,
};

/// Something that may move the session to another mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    TrackSelected(TrackSlot),
    TrackCleared(TrackSlot),
    AnalysisSucceeded,
    AnalysisFailed {
        slot: TrackSlot,
        primary_available: bool,
    },
    FindMatches,
    MatchesResolved,
    StartRemix {
        primary_available: bool,
    },
    RemixSucceeded,
    RemixFailed,
}

/// Why a user action was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Please upload and analyze at least one track first")]
    MissingPrimaryAnalysis,

    #[error("A match search is already running")]
    MatchSearchInProgress,

    #[error("A remix is already being generated")]
    RemixInProgress,

    #[error("Cannot {action} while {mode}")]
    Busy { mode: AppMode, action: &'static str },
}

impl Rejection {
    /// Notification title for this rejection
    pub fn title(&self) -> &'static str {
        match self {
            Rejection::MissingPrimaryAnalysis => "No track analyzed",
            _ => "Please wait",
        }
    }
}

/// Next mode for `trigger` in `mode`
///
/// Only user actions can be rejected. Completions that arrive in a mode they
/// do not expect leave the mode unchanged.
pub fn transition(mode: AppMode, trigger: Trigger) -> Result<AppMode, Rejection> {
    use AppMode::*;

    let next = match trigger {
        Trigger::TrackSelected(_) => Analyzing,

        Trigger::TrackCleared(TrackSlot::Track1) => Upload,
        Trigger::TrackCleared(TrackSlot::Track2) => mode,

        Trigger::AnalysisSucceeded => match mode {
            Analyzing | Upload => Analyzed,
            other => other,
        },

        Trigger::AnalysisFailed {
            slot,
            primary_available,
        } => match (mode, slot) {
            (Analyzing, TrackSlot::Track1) => Upload,
            (Analyzing, TrackSlot::Track2) if primary_available => Analyzed,
            (Analyzing, TrackSlot::Track2) => Upload,
            (other, _) => other,
        },

        Trigger::FindMatches => match mode {
            Upload | Analyzed | Complete => Matching,
            Matching => return Err(Rejection::MatchSearchInProgress),
            other => {
                return Err(Rejection::Busy {
                    mode: other,
                    action: "search for matches",
                })
            }
        },

        Trigger::MatchesResolved => match mode {
            Matching => Analyzed,
            other => other,
        },

        Trigger::StartRemix { primary_available } => {
            if !primary_available {
                return Err(Rejection::MissingPrimaryAnalysis);
            }
            match mode {
                Analyzed | Complete => Remixing,
                Remixing => return Err(Rejection::RemixInProgress),
                other => {
                    return Err(Rejection::Busy {
                        mode: other,
                        action: "start a remix",
                    })
                }
            }
        }

        Trigger::RemixSucceeded => match mode {
            Remixing => Complete,
            other => other,
        },

        Trigger::RemixFailed => match mode {
            Remixing => Analyzed,
            other => other,
        },
    };

    Ok(next)
}

/// A mode change produced by applying a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: AppMode,
    pub to: AppMode,
}

/// Per-slot state
#[derive(Debug, Clone, Default)]
pub struct TrackState {
    pub file: Option<TrackFile>,
    pub analysis: Option<TrackAnalysis>,
    pub stems: Option<StemAnalysis>,
    /// Bumped on every select and clear; results from older requests are stale
    pub generation: u64,
    /// An analysis for the current generation is in flight
    pub pending: bool,
}

/// Everything the session knows
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub mode: AppMode,
    pub tracks: [TrackState; 2],
    pub matches: Vec<SongMatch>,
    pub settings: RemixSettings,
    pub remix_result: Option<RemixResult>,
    /// Remix progress, 0-100
    pub progress: f64,
    /// Bumped whenever a remix run starts or is superseded
    pub remix_generation: u64,
    /// Bumped whenever a match search starts; only the latest may resolve
    pub match_generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, slot: TrackSlot) -> &TrackState {
        &self.tracks[slot.position()]
    }

    pub fn track_mut(&mut self, slot: TrackSlot) -> &mut TrackState {
        &mut self.tracks[slot.position()]
    }

    pub fn primary_analysis(&self) -> Option<&TrackAnalysis> {
        self.track(TrackSlot::Track1).analysis.as_ref()
    }

    fn set_mode(&mut self, to: AppMode) -> Option<ModeChange> {
        let from = self.mode;
        if from == to {
            return None;
        }
        self.mode = to;
        Some(ModeChange { from, to })
    }

    /// Run `trigger` through [`transition`] and store the resulting mode
    pub fn apply(&mut self, trigger: Trigger) -> Result<Option<ModeChange>, Rejection> {
        let next = transition(self.mode, trigger)?;
        Ok(self.set_mode(next))
    }

    /// Drop an in-flight remix run so its result and ticks are ignored
    fn supersede_remix(&mut self) {
        if self.mode == AppMode::Remixing {
            self.remix_generation += 1;
            self.progress = 0.0;
        }
    }

    /// Record a new file for `slot`; returns the generation its analysis must carry
    pub fn select_track(&mut self, slot: TrackSlot, file: TrackFile) -> (u64, Option<ModeChange>) {
        self.supersede_remix();

        let track = self.track_mut(slot);
        track.file = Some(file);
        track.generation += 1;
        track.pending = true;
        let generation = track.generation;

        // Selection is never rejected
        let change = self.apply(Trigger::TrackSelected(slot)).unwrap_or(None);
        (generation, change)
    }

    /// Forget the file, analysis and stems of `slot`
    ///
    /// Clearing track 2 while its analysis is the only one in flight settles
    /// the mode as if that analysis had failed.
    pub fn clear_track(&mut self, slot: TrackSlot) -> Option<ModeChange> {
        if slot == TrackSlot::Track1 {
            self.supersede_remix();
        }

        let track = self.track_mut(slot);
        let was_pending = track.pending;
        track.file = None;
        track.analysis = None;
        track.stems = None;
        track.pending = false;
        track.generation += 1;

        let mut change = self.apply(Trigger::TrackCleared(slot)).unwrap_or(None);

        let other_pending = self.tracks.iter().any(|t| t.pending);
        if slot == TrackSlot::Track2 && was_pending && self.mode == AppMode::Analyzing && !other_pending {
            let trigger = Trigger::AnalysisFailed {
                slot,
                primary_available: self.primary_analysis().is_some(),
            };
            change = self.apply(trigger).unwrap_or(None).or(change);
        }

        change
    }

    /// True when `generation` is still the latest request for `slot`
    pub fn is_current(&self, slot: TrackSlot, generation: u64) -> bool {
        self.track(slot).generation == generation
    }

    /// An analysis result leaves the mode alone while the other slot is still analyzing
    fn awaiting_other_analysis(&self) -> bool {
        self.mode == AppMode::Analyzing && self.tracks.iter().any(|t| t.pending)
    }

    /// Apply a successful analysis; track 1 also retargets the remix tempo
    pub fn complete_analysis(&mut self, slot: TrackSlot, analyzed: AnalyzedTrack) -> Option<ModeChange> {
        if slot == TrackSlot::Track1 {
            self.settings.follow_bpm(analyzed.analysis.bpm);
        }

        let track = self.track_mut(slot);
        track.pending = false;
        track.analysis = Some(analyzed.analysis);
        track.stems = analyzed.stems;

        if self.awaiting_other_analysis() {
            return None;
        }
        self.apply(Trigger::AnalysisSucceeded).unwrap_or(None)
    }

    /// Apply a failed analysis; previous analysis data is kept
    pub fn fail_analysis(&mut self, slot: TrackSlot) -> Option<ModeChange> {
        self.track_mut(slot).pending = false;
        if self.awaiting_other_analysis() {
            return None;
        }
        let trigger = Trigger::AnalysisFailed {
            slot,
            primary_available: self.primary_analysis().is_some(),
        };
        self.apply(trigger).unwrap_or(None)
    }

    /// Enter matching mode; returns the search's generation
    pub fn begin_match_search(&mut self) -> Result<(u64, Option<ModeChange>), Rejection> {
        let change = self.apply(Trigger::FindMatches)?;
        self.match_generation += 1;
        Ok((self.match_generation, change))
    }

    /// True while search `generation` is the one the session is waiting on
    pub fn is_current_match(&self, generation: u64) -> bool {
        self.mode == AppMode::Matching && self.match_generation == generation
    }

    /// Finish a match search; the list is replaced only on success
    pub fn resolve_match_search(&mut self, matches: Option<Vec<SongMatch>>) -> Option<ModeChange> {
        if let Some(matches) = matches {
            self.matches = matches;
        }
        self.apply(Trigger::MatchesResolved).unwrap_or(None)
    }

    /// Enter remixing mode; returns the run's generation
    pub fn begin_remix(&mut self) -> Result<(u64, Option<ModeChange>), Rejection> {
        let change = self.apply(Trigger::StartRemix {
            primary_available: self.primary_analysis().is_some(),
        })?;

        self.remix_generation += 1;
        self.progress = 0.0;
        self.remix_result = None;
        Ok((self.remix_generation, change))
    }

    /// True while run `generation` is the active remix
    pub fn is_current_remix(&self, generation: u64) -> bool {
        self.mode == AppMode::Remixing && self.remix_generation == generation
    }

    pub fn complete_remix(&mut self, result: RemixResult) -> Option<ModeChange> {
        self.progress = 100.0;
        self.remix_result = Some(result);
        self.apply(Trigger::RemixSucceeded).unwrap_or(None)
    }

    pub fn fail_remix(&mut self) -> Option<ModeChange> {
        self.progress = 0.0;
        self.apply(Trigger::RemixFailed).unwrap_or(None)
    }

    /// Read-only view with derived values
    pub fn snapshot(&self) -> SessionSnapshot {
        let track1 = self.track(TrackSlot::Track1);
        let track2 = self.track(TrackSlot::Track2);
        let is_remixing = self.mode == AppMode::Remixing;
        let stage = is_remixing.then(|| RemixStage::from_progress(self.progress));

        SessionSnapshot {
            mode: self.mode,
            track1: track1.file.clone(),
            track2: track2.file.clone(),
            analysis1: track1.analysis.clone(),
            analysis2: track2.analysis.clone(),
            stems1: track1.stems,
            stems2: track2.stems,
            matches: self.matches.clone(),
            settings: self.settings.clone(),
            remix_result: self.remix_result.clone(),
            progress: self.progress,
            remix_stage: stage,
            remix_stage_label: stage.map(|s| s.label().to_string()),
            matcher_mode: MatcherMode::derive(track1.file.is_some(), track2.file.is_some()),
            can_remix: track1.analysis.is_some(),
            is_analyzing: self.mode == AppMode::Analyzing,
            is_remixing,
            is_searching: self.mode == AppMode::Matching,
            track1_duration: track1.analysis.as_ref().map(|a| format_clock(a.duration)),
            remix_duration: self.remix_result.as_ref().map(|r| format_clock(r.duration)),
        }
    }
}

/// Session as seen by the presentation layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub mode: AppMode,
    pub track1: Option<TrackFile>,
    pub track2: Option<TrackFile>,
    pub analysis1: Option<TrackAnalysis>,
    pub analysis2: Option<TrackAnalysis>,
    pub stems1: Option<StemAnalysis>,
    pub stems2: Option<StemAnalysis>,
    pub matches: Vec<SongMatch>,
    pub settings: RemixSettings,
    pub remix_result: Option<RemixResult>,
    pub progress: f64,
    pub remix_stage: Option<RemixStage>,
    pub remix_stage_label: Option<String>,
    pub matcher_mode: MatcherMode,
    pub can_remix: bool,
    pub is_analyzing: bool,
    pub is_remixing: bool,
    pub is_searching: bool,
    /// Track 1 duration as M:SS
    pub track1_duration: Option<String>,
    /// Remix duration as M:SS
    pub remix_duration: Option<String>,
}
