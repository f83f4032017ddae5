//! User-chosen remix generation parameters

use remix_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Allowed target tempo range (inclusive)
pub const TARGET_BPM_RANGE: (f64, f64) = (120.0, 160.0);

/// Allowed drop length range in bars (inclusive)
pub const DROP_LENGTH_RANGE: (u32, u32) = (16, 64);

/// Drop length step in bars
pub const DROP_LENGTH_STEP: u32 = 8;

/// Remix generation settings
///
/// All fields are required; [`Default`] gives the initial session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixSettings {
    /// Target tempo, 120-160
    pub target_bpm: f64,
    /// Energy intensity, 0-1
    pub energy_intensity: f64,
    /// Darkness/aggression, 0-1
    pub darkness: f64,
    /// Drop length, 16-64 in steps of 8
    pub drop_length: u32,
    pub vocal_presence: VocalPresence,
    pub style: RemixStyle,
}

impl Default for RemixSettings {
    fn default() -> Self {
        Self {
            target_bpm: 138.0,
            energy_intensity: 0.8,
            darkness: 0.6,
            drop_length: 32,
            vocal_presence: VocalPresence::Minimal,
            style: RemixStyle::PeakTime,
        }
    }
}

impl RemixSettings {
    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<()> {
        let (min_bpm, max_bpm) = TARGET_BPM_RANGE;
        if !(min_bpm..=max_bpm).contains(&self.target_bpm) {
            return Err(Error::InvalidInput(format!(
                "targetBpm must be between {} and {}, got {}",
                min_bpm, max_bpm, self.target_bpm
            )));
        }

        for (name, value) in [
            ("energyIntensity", self.energy_intensity),
            ("darkness", self.darkness),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        let (min_drop, max_drop) = DROP_LENGTH_RANGE;
        if !(min_drop..=max_drop).contains(&self.drop_length)
            || (self.drop_length - min_drop) % DROP_LENGTH_STEP != 0
        {
            return Err(Error::InvalidInput(format!(
                "dropLength must be {}-{} in steps of {}, got {}",
                min_drop, max_drop, DROP_LENGTH_STEP, self.drop_length
            )));
        }

        Ok(())
    }

    /// Follow an analyzed tempo, rounded and kept inside the allowed range
    pub fn follow_bpm(&mut self, bpm: f64) {
        let (min_bpm, max_bpm) = TARGET_BPM_RANGE;
        self.target_bpm = bpm.round().clamp(min_bpm, max_bpm);
    }
}

/// How prominent vocals should be in the remix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocalPresence {
    None,
    Minimal,
    Featured,
}

/// Techno flavor preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemixStyle {
    PeakTime,
    HardTechno,
    Industrial,
    Melodic,
}

impl RemixStyle {
    pub const ALL: [RemixStyle; 4] = [
        RemixStyle::PeakTime,
        RemixStyle::HardTechno,
        RemixStyle::Industrial,
        RemixStyle::Melodic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RemixStyle::PeakTime => "peak-time",
            RemixStyle::HardTechno => "hard-techno",
            RemixStyle::Industrial => "industrial",
            RemixStyle::Melodic => "melodic",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            RemixStyle::PeakTime => "Peak Time",
            RemixStyle::HardTechno => "Hard Techno",
            RemixStyle::Industrial => "Industrial",
            RemixStyle::Melodic => "Melodic",
        }
    }

    /// One-line description shown under the label
    pub fn description(&self) -> &'static str {
        match self {
            RemixStyle::PeakTime => "High-energy club bangers",
            RemixStyle::HardTechno => "Aggressive, driving beats",
            RemixStyle::Industrial => "Dark, metallic sounds",
            RemixStyle::Melodic => "Emotional, atmospheric",
        }
    }
}
