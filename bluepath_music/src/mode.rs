// Major/minor scale support.
//
// A `Tonality` is a key plus a mode. It derives the seven scale pitch classes
// from a fixed interval pattern, spells them so each letter appears exactly
// once, and provides the pitch pools the melody generator draws from.
//
// Minor uses the harmonic-minor pattern by default (raised 7th, so V is major
// and vii is diminished); natural minor is available behind the
// `harmonic_minor_dominant` flag.
//
// `ScaleDegree` is an exhaustive enum, so every table keyed by degree in
// diatonic.rs and progression.rs is total by construction.
//
// Used by diatonic.rs / chord.rs for chord roots and spellings and by
// melody.rs for the scale pool.

use crate::pitch::{Key, Letter, Spelling, spell_required};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Major,
    Minor,
}

const MAJOR: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const NATURAL_MINOR: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];
const HARMONIC_MINOR: [u8; 7] = [0, 2, 3, 5, 7, 8, 11];

/// One of the seven diatonic scale degrees. Serializes as its numeral
/// ("1" through "7").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ScaleDegree {
    #[serde(rename = "1")]
    I,
    #[serde(rename = "2")]
    II,
    #[serde(rename = "3")]
    III,
    #[serde(rename = "4")]
    IV,
    #[serde(rename = "5")]
    V,
    #[serde(rename = "6")]
    VI,
    #[serde(rename = "7")]
    VII,
}

impl ScaleDegree {
    pub const ALL: [ScaleDegree; 7] = [
        ScaleDegree::I,
        ScaleDegree::II,
        ScaleDegree::III,
        ScaleDegree::IV,
        ScaleDegree::V,
        ScaleDegree::VI,
        ScaleDegree::VII,
    ];

    /// Zero-based position in the scale.
    pub fn index(self) -> usize {
        self as usize
    }

    /// One-based numeral (1-7).
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(n: u8) -> Option<ScaleDegree> {
        match n {
            1..=7 => Some(ScaleDegree::ALL[(n - 1) as usize]),
            _ => None,
        }
    }

    /// Degrees with dominant function (V and vii).
    pub fn is_dominant(self) -> bool {
        matches!(self, ScaleDegree::V | ScaleDegree::VII)
    }
}

impl fmt::Display for ScaleDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A key and mode: the harmonic frame of one composition.
#[derive(Debug, Clone)]
pub struct Tonality {
    pub key: Key,
    pub mode: Mode,
    /// Use harmonic minor (raised 7th) for minor keys.
    pub harmonic_minor_dominant: bool,
}

impl Tonality {
    pub fn new(key: Key, mode: Mode, harmonic_minor_dominant: bool) -> Self {
        Tonality {
            key,
            mode,
            harmonic_minor_dominant,
        }
    }

    /// Semitone offsets from the tonic for degrees 1-7.
    pub fn intervals(&self) -> [u8; 7] {
        match self.mode {
            Mode::Major => MAJOR,
            Mode::Minor if self.harmonic_minor_dominant => HARMONIC_MINOR,
            Mode::Minor => NATURAL_MINOR,
        }
    }

    /// Pitch class of a scale degree.
    pub fn degree_pc(&self, degree: ScaleDegree) -> u8 {
        (self.key.pc + self.intervals()[degree.index()]) % 12
    }

    /// The letter a scale degree must be spelled with.
    pub fn degree_letter(&self, degree: ScaleDegree) -> Letter {
        self.key.spelling.letter.offset(degree.index())
    }

    /// Letter-correct spelling of a scale degree, after the key's cosmetic
    /// accidental override.
    pub fn degree_spelling(&self, degree: ScaleDegree) -> Spelling {
        let spelled = spell_required(self.degree_pc(degree), self.degree_letter(degree));
        self.key.cosmetic(spelled)
    }

    /// The spelled scale, degree 1 first.
    pub fn spelled_scale(&self) -> [Spelling; 7] {
        ScaleDegree::ALL.map(|d| self.degree_spelling(d))
    }

    /// Scale pitches built from each octave number in `low..=high`
    /// (MIDI octave numbering, C4 = 60), deduplicated and ascending.
    pub fn scale_pitches(&self, low_octave: i32, high_octave: i32) -> Vec<u8> {
        let mut pool: Vec<u8> = (low_octave..=high_octave)
            .flat_map(|octave| ScaleDegree::ALL.into_iter().map(move |d| (d, octave)))
            .filter_map(|(d, octave)| {
                let midi = self.degree_pc(d) as i32 + (octave + 1) * 12;
                u8::try_from(midi).ok().filter(|&m| m <= 127)
            })
            .collect();
        pool.sort_unstable();
        pool.dedup();
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tonality(key: &str, mode: Mode) -> Tonality {
        Tonality::new(Key::parse(key).unwrap(), mode, true)
    }

    fn names(t: &Tonality) -> Vec<String> {
        t.spelled_scale().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_c_major_pitches() {
        let t = tonality("C", Mode::Major);
        // C4=60 D4=62 E4=64 F4=65 G4=67 A4=69 B4=71
        assert_eq!(t.scale_pitches(4, 4), vec![60, 62, 64, 65, 67, 69, 71]);
        let pool = t.scale_pitches(3, 5);
        assert!(!pool.contains(&61));
        assert!(!pool.contains(&66));
    }

    #[test]
    fn test_harmonic_minor_raises_seventh() {
        let t = tonality("A", Mode::Minor);
        assert_eq!(t.degree_pc(ScaleDegree::VII), 8); // G#
        let natural = Tonality::new(Key::parse("A").unwrap(), Mode::Minor, false);
        assert_eq!(natural.degree_pc(ScaleDegree::VII), 7); // G
    }

    #[test]
    fn test_spelled_scales_use_each_letter_once() {
        assert_eq!(names(&tonality("D", Mode::Major)), ["D", "E", "F#", "G", "A", "B", "C#"]);
        assert_eq!(names(&tonality("F", Mode::Major)), ["F", "G", "A", "Bb", "C", "D", "E"]);
        assert_eq!(names(&tonality("Eb", Mode::Major)), ["Eb", "F", "G", "Ab", "Bb", "C", "D"]);
        assert_eq!(names(&tonality("C", Mode::Minor)), ["C", "D", "Eb", "F", "G", "Ab", "B"]);
    }

    #[test]
    fn test_scale_degree_numbers() {
        assert_eq!(ScaleDegree::from_number(1), Some(ScaleDegree::I));
        assert_eq!(ScaleDegree::from_number(7), Some(ScaleDegree::VII));
        assert_eq!(ScaleDegree::from_number(0), None);
        assert_eq!(ScaleDegree::from_number(8), None);
        assert_eq!(ScaleDegree::VI.to_string(), "6");
        assert!(ScaleDegree::V.is_dominant());
        assert!(!ScaleDegree::IV.is_dominant());
    }

    #[test]
    fn test_scale_pitches_three_octaves() {
        let t = tonality("C", Mode::Major);
        let pool = t.scale_pitches(3, 5);
        assert_eq!(pool.len(), 21);
        assert_eq!(pool.first(), Some(&48));
        assert_eq!(pool.last(), Some(&83));
        assert!(pool.windows(2).all(|w| w[0] < w[1]));
    }
}
