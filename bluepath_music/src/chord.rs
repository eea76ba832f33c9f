// Chord construction.
//
// Turns a scale degree into a `ChordSpec`: roman label, quality, a randomly
// selected chord type (diatonic.rs), the unvoiced absolute pitch stack and
// letter-correct spellings. Base pitches follow the chord type's recipe order
// above a root anchored at the configured octave; voicing.rs later decides
// inversion and register.

use crate::diatonic::{
    ChordQuality, ChordType, HarmonicStyle, diatonic_entry, roman_numeral, select_chord_type,
};
use crate::mode::{ScaleDegree, Tonality};
use crate::pitch::{AccidentalPreference, Spelling, midi_to_pitch, spell_required};
use bluepath_prng::SeededRng;
use serde::Serialize;

/// A chord before voicing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordSpec {
    pub numeral: ScaleDegree,
    pub roman: &'static str,
    pub quality: ChordQuality,
    pub chord_type: ChordType,
    pub root_pc: u8,
    /// Root as a pitch name in the chord's octave, e.g. "G3".
    pub root: String,
    /// Root position stack in recipe order.
    pub base_pitches: Vec<u8>,
    pub spelled_root: Spelling,
    pub spelled_tones: Vec<Spelling>,
}

impl ChordSpec {
    /// Pitch classes of the chord's first three recipe tones (root, third
    /// or suspension, fifth).
    pub fn cadence_tones(&self) -> Vec<u8> {
        self.base_pitches.iter().take(3).map(|&p| p % 12).collect()
    }
}

/// Build a chord on `degree` of `tonality` with its root in `octave`.
pub fn build_chord(
    tonality: &Tonality,
    degree: ScaleDegree,
    octave: i32,
    style: HarmonicStyle,
    pref: AccidentalPreference,
    rng: &mut SeededRng,
) -> ChordSpec {
    let entry = diatonic_entry(tonality.mode, degree);
    let chord_type = select_chord_type(tonality.mode, degree, style, rng);

    let root_pc = tonality.degree_pc(degree);
    let spelled_root = tonality.degree_spelling(degree);
    let root_letter = tonality.degree_letter(degree);
    let root_midi = (root_pc as i32 + (octave + 1) * 12).clamp(0, 127);

    let recipe = chord_type.recipe();
    let base_pitches = recipe
        .iter()
        .map(|tone| (root_midi + tone.semitones as i32).min(127) as u8)
        .collect();
    let spelled_tones = recipe
        .iter()
        .map(|tone| {
            let pc = (root_pc + tone.semitones) % 12;
            let letter = root_letter.offset(tone.steps as usize);
            tonality.key.cosmetic(spell_required(pc, letter))
        })
        .collect();

    ChordSpec {
        numeral: degree,
        roman: roman_numeral(tonality.mode, degree),
        quality: entry.quality,
        chord_type,
        root_pc,
        root: midi_to_pitch(root_midi as u8, tonality.key.effective_preference(pref)),
        base_pitches,
        spelled_root,
        spelled_tones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use crate::pitch::Key;

    fn tonality(key: &str, mode: Mode) -> Tonality {
        Tonality::new(Key::parse(key).unwrap(), mode, true)
    }

    #[test]
    fn test_base_pitches_follow_recipe() {
        let t = tonality("C", Mode::Major);
        let mut rng = SeededRng::new(10);
        for _ in 0..200 {
            for degree in ScaleDegree::ALL {
                let chord = build_chord(&t, degree, 3, HarmonicStyle::Complex, AccidentalPreference::Sharps, &mut rng);
                let root_midi = chord.root_pc + 48;
                assert_eq!(chord.base_pitches[0], root_midi);
                let expected: Vec<u8> = chord
                    .chord_type
                    .recipe()
                    .iter()
                    .map(|tone| root_midi + tone.semitones)
                    .collect();
                assert_eq!(chord.base_pitches, expected);
                assert_eq!(chord.spelled_tones.len(), expected.len());
            }
        }
    }

    #[test]
    fn test_dominant_in_g_major_spelling() {
        let t = tonality("G", Mode::Major);
        let mut rng = SeededRng::new(1);
        let chord = build_chord(&t, ScaleDegree::V, 3, HarmonicStyle::Simple, AccidentalPreference::Sharps, &mut rng);
        assert_eq!(chord.roman, "V");
        assert_eq!(chord.spelled_root.to_string(), "D");
        assert_eq!(chord.root, "D3");
        assert_eq!(chord.spelled_tones[0].to_string(), "D");
        if chord.chord_type == ChordType::MajorTriad {
            let names: Vec<String> = chord.spelled_tones.iter().map(|s| s.to_string()).collect();
            assert_eq!(names, ["D", "F#", "A"]);
        }
    }

    #[test]
    fn test_spelled_tones_match_pitch_classes() {
        let t = tonality("Eb", Mode::Minor);
        let mut rng = SeededRng::new(4);
        for _ in 0..100 {
            for degree in ScaleDegree::ALL {
                let chord = build_chord(&t, degree, 3, HarmonicStyle::Complex, AccidentalPreference::Flats, &mut rng);
                for (tone, &pitch) in chord.spelled_tones.iter().zip(&chord.base_pitches) {
                    assert_eq!(tone.pitch_class(), pitch % 12, "{tone} in {}", chord.roman);
                }
            }
        }
    }

    #[test]
    fn test_cadence_tones() {
        let t = tonality("C", Mode::Major);
        let mut rng = SeededRng::new(2);
        let chord = build_chord(&t, ScaleDegree::I, 3, HarmonicStyle::Complex, AccidentalPreference::Sharps, &mut rng);
        let tones = chord.cadence_tones();
        assert_eq!(tones.len(), 3);
        assert_eq!(tones[0], 0);
    }
}
