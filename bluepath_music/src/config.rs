// Data-driven composition configuration.
//
// Every tunable generation parameter lives in `ComposeConfig`, loaded from a
// JSON file (camelCase keys) or built in code. Missing keys take the defaults
// below, so a config file only needs to name what it changes. Percent-style
// fields (density, preferences, probabilities, cadence strength) are 0-100 and
// are clamped when converted to generator settings.
//
// `chordPattern`, `tempo` and `strumMs` are playback parameters. Generation
// copies `chordPattern` into the progression and otherwise ignores them; the
// MIDI adapter (midi.rs) reads them through `PlaybackOptions`.
//
// See also: composition.rs, which consumes the config; main.rs, which layers
// command-line overrides on top of a loaded file.

use crate::diatonic::HarmonicStyle;
use crate::error::{ComposeError, ComposeResult};
use crate::melody::MelodySettings;
use crate::midi::PlaybackOptions;
use crate::mode::Mode;
use crate::pitch::AccidentalPreference;
use crate::rhythm::RhythmStyle;
use crate::slots::SlotPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest supported octave shift for the melody.
pub const MAX_MELODY_OCTAVE_SHIFT: i32 = 2;

/// Highest chord octave plus melody shift whose melody pool, cadence moves
/// included, still fits under MIDI 127.
pub const MAX_MELODY_REGISTER: i32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeConfig {
    /// Tonic name, e.g. `"Eb"`.
    pub key: String,
    pub mode: Mode,
    pub bars: u32,
    pub chords_per_bar: u32,
    /// Length of the generated numeral sequence before slot mapping.
    pub progression_length: u32,
    pub slot_mapping_policy: SlotPolicy,
    /// Chord articulation name, used only by playback.
    pub chord_pattern: String,
    /// Octave of the chord roots (C4 = MIDI 60).
    pub octave: i32,
    pub accidental_preference: AccidentalPreference,
    pub rhythm_style: String,
    pub melody_density: f64,
    pub chord_tone_preference: f64,
    /// Largest melodic interval in semitones.
    pub max_leap: u32,
    pub phrase_length_bars: u32,
    pub motif_reuse_probability: f64,
    pub cadence_strength: f64,
    pub harmonic_style: HarmonicStyle,
    pub deceptive_cadence: bool,
    /// Use the raised leading tone in minor keys.
    pub harmonic_minor_dominant: bool,
    /// Whole octaves added to the finished melody (0-2).
    pub melody_octave_shift: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Beats per minute, used only by playback.
    pub tempo: f64,
    /// Delay between successive chord voices, used only by playback.
    pub strum_ms: f64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        ComposeConfig {
            key: "C".to_string(),
            mode: Mode::Major,
            bars: 8,
            chords_per_bar: 1,
            progression_length: 4,
            slot_mapping_policy: SlotPolicy::Default,
            chord_pattern: "sustain".to_string(),
            octave: 3,
            accidental_preference: AccidentalPreference::Sharps,
            rhythm_style: "pop".to_string(),
            melody_density: 60.0,
            chord_tone_preference: 60.0,
            max_leap: 7,
            phrase_length_bars: 2,
            motif_reuse_probability: 50.0,
            cadence_strength: 60.0,
            harmonic_style: HarmonicStyle::Complex,
            deceptive_cadence: false,
            harmonic_minor_dominant: true,
            melody_octave_shift: 1,
            seed: None,
            tempo: 96.0,
            strum_ms: 18.0,
        }
    }
}

fn percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0) / 100.0
}

impl ComposeConfig {
    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> ComposeResult<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: ComposeConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Reject values the generator cannot work with.
    pub fn validate(&self) -> ComposeResult<()> {
        let positive = [
            ("bars", self.bars),
            ("chordsPerBar", self.chords_per_bar),
            ("progressionLength", self.progression_length),
            ("phraseLengthBars", self.phrase_length_bars),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ComposeError::InvalidParameter {
                    name,
                    message: "must be at least 1".to_string(),
                });
            }
        }
        if !(-1..=MAX_MELODY_REGISTER).contains(&self.octave) {
            return Err(ComposeError::InvalidParameter {
                name: "octave",
                message: format!("{} is outside -1..={MAX_MELODY_REGISTER}", self.octave),
            });
        }
        let shift = self.clamped_octave_shift();
        if self.octave + shift > MAX_MELODY_REGISTER {
            return Err(ComposeError::InvalidParameter {
                name: "melodyOctaveShift",
                message: format!(
                    "octave {} shifted up {shift} puts the melody above MIDI 127",
                    self.octave
                ),
            });
        }
        if !(self.tempo.is_finite() && self.tempo > 0.0) {
            return Err(ComposeError::InvalidParameter {
                name: "tempo",
                message: format!("{} is not a positive BPM", self.tempo),
            });
        }
        Ok(())
    }

    /// Number of chord slots in the piece.
    pub fn total_slots(&self) -> usize {
        self.bars as usize * self.chords_per_bar as usize
    }

    pub fn melody_settings(&self, accidentals: AccidentalPreference) -> MelodySettings {
        MelodySettings {
            octave: self.octave,
            rhythm: RhythmStyle::resolve(&self.rhythm_style),
            density: percent(self.melody_density),
            chord_tone_preference: percent(self.chord_tone_preference),
            max_leap: self.max_leap,
            phrase_bars: self.phrase_length_bars,
            motif_reuse: percent(self.motif_reuse_probability),
            cadence_strength: percent(self.cadence_strength),
            accidentals,
        }
    }

    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            tempo_bpm: self.tempo,
            strum_ms: self.strum_ms.max(0.0),
        }
    }

    /// Melody octave shift clamped to the supported range.
    pub fn clamped_octave_shift(&self) -> i32 {
        self.melody_octave_shift.clamp(0, MAX_MELODY_OCTAVE_SHIFT)
    }
}
