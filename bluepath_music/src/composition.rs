// Composition assembly: the end-to-end generation pipeline.
//
// `compose` runs every stage in order against one injected random source:
// numerals (progression.rs) → chord slots (slots.rs) → chords (chord.rs) →
// voicings (voicing.rs) → timeline → melody (melody.rs) → octave shift.
// The result is an immutable `Composition` that serializes to the JSON
// document consumers read. Nothing here touches the filesystem; exporting is
// the caller's job (main.rs, midi.rs).
//
// Generation is all-or-nothing. Config validation and key lookup happen
// before any chord is built, so an error never leaves a partial result.

use crate::chord::{ChordSpec, build_chord};
use crate::config::ComposeConfig;
use crate::error::ComposeResult;
use crate::melody::{Motif, Note, generate_melody, transpose_melody};
use crate::mode::{Mode, Tonality};
use crate::pitch::{AccidentalPreference, Key, midi_to_pitch};
use crate::progression::generate_numerals;
use crate::slots::map_to_slots;
use crate::structure::BEATS_PER_BAR;
use crate::voicing::{VoicedChord, voice_lead};
use bluepath_prng::SeededRng;
use serde::Serialize;

/// The harmonic half of a composition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progression {
    pub key: String,
    pub mode: Mode,
    pub bars: u32,
    pub chords_per_bar: u32,
    pub chord_pattern: String,
    pub octave: i32,
    pub chords: Vec<VoicedChord>,
}

impl Progression {
    pub fn total_beats(&self) -> f64 {
        self.bars as f64 * BEATS_PER_BAR
    }
}

/// A generated piece: progression, melody and phrase layout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub progression: Progression,
    pub melody: Vec<Note>,
    pub phrase_markers: Vec<f64>,
    pub total_beats: f64,
    /// The motif captured during generation, if any phrase produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motif: Option<Motif>,
    /// Indices of phrases that replayed the motif.
    pub reused_phrases: Vec<usize>,
}

impl Composition {
    pub fn to_json(&self) -> ComposeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Place voiced chords end to end, `4 / chords_per_bar` beats each.
///
/// Durations are taken between slot edges so the final chord ends exactly on
/// the bar line.
pub fn assign_durations(
    specs: Vec<ChordSpec>,
    voicings: Vec<Vec<u8>>,
    chords_per_bar: u32,
    pref: AccidentalPreference,
) -> Vec<VoicedChord> {
    let per_bar = chords_per_bar.max(1) as f64;
    let edge = |i: usize| i as f64 * BEATS_PER_BAR / per_bar;
    specs
        .into_iter()
        .zip(voicings)
        .enumerate()
        .map(|(i, (spec, voicing))| VoicedChord {
            notes: voicing.iter().map(|&p| midi_to_pitch(p, pref)).collect(),
            spec,
            voicing,
            start_beat: edge(i),
            duration_beats: edge(i + 1) - edge(i),
        })
        .collect()
}

/// Generate a composition from `config`.
pub fn compose(config: &ComposeConfig, rng: &mut SeededRng) -> ComposeResult<Composition> {
    config.validate()?;
    let key = Key::parse(&config.key)?;
    let tonality = Tonality::new(key, config.mode, config.harmonic_minor_dominant);
    let pref = tonality.key.effective_preference(config.accidental_preference);

    let numerals = generate_numerals(config.progression_length as usize, config.deceptive_cadence, rng);
    let slots = map_to_slots(&numerals, config.total_slots(), config.slot_mapping_policy);
    log::debug!(
        "numerals {:?} mapped onto {} slots ({:?})",
        numerals.iter().map(|d| d.number()).collect::<Vec<_>>(),
        slots.len(),
        config.slot_mapping_policy
    );

    let specs: Vec<ChordSpec> = slots
        .iter()
        .map(|&degree| {
            build_chord(
                &tonality,
                degree,
                config.octave,
                config.harmonic_style,
                config.accidental_preference,
                rng,
            )
        })
        .collect();
    let voicings = voice_lead(&specs);
    let chords = assign_durations(specs, voicings, config.chords_per_bar, pref);

    let melody = generate_melody(&chords, &tonality, &config.melody_settings(pref), rng);
    let notes = transpose_melody(&melody.notes, &chords, config.clamped_octave_shift(), pref);
    log::debug!(
        "composed {} chords and {} melody events over {} beats",
        chords.len(),
        notes.len(),
        melody.total_beats
    );

    Ok(Composition {
        phrase_markers: melody.phrase_markers(),
        total_beats: melody.total_beats,
        progression: Progression {
            key: config.key.clone(),
            mode: config.mode,
            bars: config.bars,
            chords_per_bar: config.chords_per_bar,
            chord_pattern: config.chord_pattern.clone(),
            octave: config.octave,
            chords,
        },
        melody: notes,
        motif: melody.motif,
        reused_phrases: melody.reused_phrases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposeError;
    use crate::mode::ScaleDegree;

    #[test]
    fn test_unknown_key_fails_before_generation() {
        let config = ComposeConfig {
            key: "H".to_string(),
            ..ComposeConfig::default()
        };
        let mut rng = SeededRng::new(1);
        assert!(matches!(compose(&config, &mut rng), Err(ComposeError::UnknownKey(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ComposeConfig {
            chords_per_bar: 0,
            ..ComposeConfig::default()
        };
        let mut rng = SeededRng::new(1);
        assert!(matches!(
            compose(&config, &mut rng),
            Err(ComposeError::InvalidParameter { name: "chordsPerBar", .. })
        ));
    }

    #[test]
    fn test_chords_tile_timeline() {
        for cpb in 1..=4 {
            let config = ComposeConfig {
                bars: 4,
                chords_per_bar: cpb,
                ..ComposeConfig::default()
            };
            let mut rng = SeededRng::new(cpb as u64);
            let comp = compose(&config, &mut rng).unwrap();
            let chords = &comp.progression.chords;
            assert_eq!(chords.len(), 4 * cpb as usize);
            assert_eq!(chords[0].start_beat, 0.0);
            for pair in chords.windows(2) {
                assert!((pair[0].end_beat() - pair[1].start_beat).abs() < 1e-9);
            }
            assert!((comp.progression.total_beats() - 16.0).abs() < 1e-9);
            assert_eq!(comp.total_beats, chords.last().unwrap().end_beat());
        }
    }

    #[test]
    fn test_total_beats_exact_with_three_chords_per_bar() {
        for bars in 1..=9 {
            let config = ComposeConfig {
                bars,
                chords_per_bar: 3,
                ..ComposeConfig::default()
            };
            let comp = compose(&config, &mut SeededRng::new(bars as u64)).unwrap();
            let expected = bars as f64 * 4.0;
            assert_eq!(comp.progression.total_beats(), expected);
            assert_eq!(comp.total_beats, expected);
            assert_eq!(comp.progression.chords.last().unwrap().end_beat(), expected);
        }
    }

    #[test]
    fn test_same_seed_same_composition() {
        let config = ComposeConfig::default();
        let a = compose(&config, &mut SeededRng::new(99)).unwrap().to_json().unwrap();
        let b = compose(&config, &mut SeededRng::new(99)).unwrap().to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_json_shape() {
        let config = ComposeConfig {
            bars: 2,
            ..ComposeConfig::default()
        };
        let comp = compose(&config, &mut SeededRng::new(3)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&comp.to_json().unwrap()).unwrap();
        assert_eq!(value["totalBeats"], 8.0);
        assert_eq!(value["progression"]["chordsPerBar"], 1);
        let chord = &value["progression"]["chords"][0];
        assert!(chord["roman"].is_string());
        assert!(chord["voicing"].is_array());
        assert!(chord["durationBeats"].is_number());
        let numeral = chord["numeral"].as_str().unwrap();
        assert!(ScaleDegree::from_number(numeral.parse().unwrap()).is_some());
        assert!(value["melody"].is_array());
        assert!(value["phraseMarkers"].is_array());
    }

    #[test]
    fn test_flat_key_note_names() {
        let config = ComposeConfig {
            key: "Bb".to_string(),
            bars: 4,
            ..ComposeConfig::default()
        };
        let comp = compose(&config, &mut SeededRng::new(8)).unwrap();
        for chord in &comp.progression.chords {
            for name in &chord.notes {
                assert!(!name.contains('#'), "{name} in a flat key");
            }
        }
        for note in comp.melody.iter().filter_map(|n| n.pitch.as_ref()) {
            assert!(!note.contains('#'), "{note} in a flat key");
        }
    }
}
