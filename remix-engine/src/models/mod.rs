//! Domain model for the remix session
//!
//! Plain data: the service clients produce these types and the engine owns
//! the instances.

pub mod analysis;
pub mod matches;
pub mod remix;
pub mod settings;
pub mod track;

pub use analysis::{
    camelot_key_for, AnalyzedTrack, KeyMode, SectionType, SongSection, StemAnalysis, TrackAnalysis,
};
pub use matches::{sort_by_compatibility, MatchSearchMode, MatcherMode, SongMatch};
pub use remix::{
    ChangeType, RemixChange, RemixResult, RemixSection, RemixStage, SectionSource,
    DEFAULT_REMIX_DURATION_SECS, PLACEHOLDER_AUDIO_URL,
};
pub use settings::{RemixSettings, RemixStyle, VocalPresence};
pub use track::TrackFile;

pub use remix_common::{AppMode, TrackSlot};
