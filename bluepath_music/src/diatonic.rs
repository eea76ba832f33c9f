// Diatonic chord table and chord-type selection.
//
// Each scale degree of a major or minor key has a fixed harmonic function,
// a triad quality and three increasingly rich structures (triad, seventh,
// ninth). `ChordType` carries the interval recipe for every chord the
// selector can produce: each tone is a semitone offset from the root plus the
// diatonic step it occupies, so chord.rs can spell it with the right letter.
//
// Selection is stochastic. Independent draws decide which base structures
// are available (probabilities depend on the `HarmonicStyle`), then rarer
// draws add colour chords (sus, add9, 7sus4 on V, sixths). One candidate is
// picked uniformly; nothing available means the plain triad. Degrees whose
// triad is diminished as a seventh-bearing chord (vii in major, ii in minor)
// always resolve a seventh choice to half-diminished.

use crate::mode::{Mode, ScaleDegree};
use bluepath_prng::SeededRng;
use serde::{Deserialize, Serialize};

/// Triad quality of a diatonic degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChordQuality {
    Major,
    #[serde(rename = "minor")]
    Minor,
    Diminished,
}

impl ChordQuality {
    /// Minor and diminished degrees take the minor colour variants.
    pub fn is_minorish(self) -> bool {
        matches!(self, ChordQuality::Minor | ChordQuality::Diminished)
    }
}

/// Harmonic function label of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmonicFunction {
    Tonic,
    Subdominant,
    Dominant,
    #[serde(rename = "Tonic/Subdominant")]
    TonicSubdominant,
    #[serde(rename = "Tonic/Mediant")]
    TonicMediant,
}

/// Every chord structure the selector can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordType {
    MajorTriad,
    MinorTriad,
    DiminishedTriad,
    Sus2,
    Sus4,
    Major6,
    Minor6,
    Major7,
    Minor7,
    Dominant7,
    HalfDiminished7,
    Dominant7Sus4,
    Major9,
    Minor9,
    Dominant9,
    HalfDiminished9,
    Add9,
    MinorAdd9,
}

/// One chord tone: semitones above the root and diatonic steps above the
/// root's letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeTone {
    pub semitones: u8,
    pub steps: u8,
}

const fn t(semitones: u8, steps: u8) -> RecipeTone {
    RecipeTone { semitones, steps }
}

const MAJOR_TRIAD: [RecipeTone; 3] = [t(0, 0), t(4, 2), t(7, 4)];
const MINOR_TRIAD: [RecipeTone; 3] = [t(0, 0), t(3, 2), t(7, 4)];
const DIMINISHED_TRIAD: [RecipeTone; 3] = [t(0, 0), t(3, 2), t(6, 4)];
const SUS2: [RecipeTone; 3] = [t(0, 0), t(2, 1), t(7, 4)];
const SUS4: [RecipeTone; 3] = [t(0, 0), t(5, 3), t(7, 4)];
const MAJOR6: [RecipeTone; 4] = [t(0, 0), t(4, 2), t(7, 4), t(9, 5)];
const MINOR6: [RecipeTone; 4] = [t(0, 0), t(3, 2), t(7, 4), t(9, 5)];
const MAJOR7: [RecipeTone; 4] = [t(0, 0), t(4, 2), t(7, 4), t(11, 6)];
const MINOR7: [RecipeTone; 4] = [t(0, 0), t(3, 2), t(7, 4), t(10, 6)];
const DOMINANT7: [RecipeTone; 4] = [t(0, 0), t(4, 2), t(7, 4), t(10, 6)];
const HALF_DIMINISHED7: [RecipeTone; 4] = [t(0, 0), t(3, 2), t(6, 4), t(10, 6)];
const DOMINANT7_SUS4: [RecipeTone; 4] = [t(0, 0), t(5, 3), t(7, 4), t(10, 6)];
const MAJOR9: [RecipeTone; 5] = [t(0, 0), t(4, 2), t(7, 4), t(11, 6), t(2, 1)];
const MINOR9: [RecipeTone; 5] = [t(0, 0), t(3, 2), t(7, 4), t(10, 6), t(2, 1)];
const DOMINANT9: [RecipeTone; 5] = [t(0, 0), t(4, 2), t(7, 4), t(10, 6), t(2, 1)];
const HALF_DIMINISHED9: [RecipeTone; 5] = [t(0, 0), t(3, 2), t(6, 4), t(10, 6), t(2, 1)];
const ADD9: [RecipeTone; 4] = [t(0, 0), t(4, 2), t(7, 4), t(2, 1)];
const MINOR_ADD9: [RecipeTone; 4] = [t(0, 0), t(3, 2), t(7, 4), t(2, 1)];

impl ChordType {
    /// Interval recipe, in the order tones are stacked.
    pub fn recipe(self) -> &'static [RecipeTone] {
        match self {
            ChordType::MajorTriad => &MAJOR_TRIAD,
            ChordType::MinorTriad => &MINOR_TRIAD,
            ChordType::DiminishedTriad => &DIMINISHED_TRIAD,
            ChordType::Sus2 => &SUS2,
            ChordType::Sus4 => &SUS4,
            ChordType::Major6 => &MAJOR6,
            ChordType::Minor6 => &MINOR6,
            ChordType::Major7 => &MAJOR7,
            ChordType::Minor7 => &MINOR7,
            ChordType::Dominant7 => &DOMINANT7,
            ChordType::HalfDiminished7 => &HALF_DIMINISHED7,
            ChordType::Dominant7Sus4 => &DOMINANT7_SUS4,
            ChordType::Major9 => &MAJOR9,
            ChordType::Minor9 => &MINOR9,
            ChordType::Dominant9 => &DOMINANT9,
            ChordType::HalfDiminished9 => &HALF_DIMINISHED9,
            ChordType::Add9 => &ADD9,
            ChordType::MinorAdd9 => &MINOR_ADD9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChordType::MajorTriad => "Triad (Major)",
            ChordType::MinorTriad => "Triad (minor)",
            ChordType::DiminishedTriad => "Triad (Diminished)",
            ChordType::Sus2 => "sus2",
            ChordType::Sus4 => "sus4",
            ChordType::Major6 => "6",
            ChordType::Minor6 => "m6",
            ChordType::Major7 => "Major 7",
            ChordType::Minor7 => "minor 7",
            ChordType::Dominant7 => "Dominant 7",
            ChordType::HalfDiminished7 => "Half-Diminished 7",
            ChordType::Dominant7Sus4 => "Dominant 7sus4",
            ChordType::Major9 => "Major 9",
            ChordType::Minor9 => "minor 9",
            ChordType::Dominant9 => "Dominant 9",
            ChordType::HalfDiminished9 => "Half-Diminished 9",
            ChordType::Add9 => "add9",
            ChordType::MinorAdd9 => "madd9",
        }
    }

    /// Seventh chords without upper extensions.
    pub fn is_seventh(self) -> bool {
        matches!(
            self,
            ChordType::Major7
                | ChordType::Minor7
                | ChordType::Dominant7
                | ChordType::HalfDiminished7
                | ChordType::Dominant7Sus4
        )
    }
}

impl Serialize for ChordType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Table row for one degree.
#[derive(Debug, Clone, Copy)]
pub struct DiatonicEntry {
    pub quality: ChordQuality,
    pub function: HarmonicFunction,
    /// Triad, seventh and ninth structures, simplest first.
    pub structures: [ChordType; 3],
}

const fn entry(
    quality: ChordQuality,
    function: HarmonicFunction,
    structures: [ChordType; 3],
) -> DiatonicEntry {
    DiatonicEntry {
        quality,
        function,
        structures,
    }
}

use ChordQuality as Q;
use ChordType as CT;
use HarmonicFunction as HF;

const MAJOR_STRUCTURES: [ChordType; 3] = [CT::MajorTriad, CT::Major7, CT::Major9];
const MINOR_STRUCTURES: [ChordType; 3] = [CT::MinorTriad, CT::Minor7, CT::Minor9];
const DOMINANT_STRUCTURES: [ChordType; 3] = [CT::MajorTriad, CT::Dominant7, CT::Dominant9];
const HALF_DIM_STRUCTURES: [ChordType; 3] =
    [CT::DiminishedTriad, CT::HalfDiminished7, CT::HalfDiminished9];

const MAJOR_TABLE: [DiatonicEntry; 7] = [
    entry(Q::Major, HF::Tonic, MAJOR_STRUCTURES),
    entry(Q::Minor, HF::Subdominant, MINOR_STRUCTURES),
    entry(Q::Minor, HF::Tonic, MINOR_STRUCTURES),
    entry(Q::Major, HF::Subdominant, MAJOR_STRUCTURES),
    entry(Q::Major, HF::Dominant, DOMINANT_STRUCTURES),
    entry(Q::Minor, HF::TonicSubdominant, MINOR_STRUCTURES),
    entry(Q::Diminished, HF::Dominant, HALF_DIM_STRUCTURES),
];

const MINOR_TABLE: [DiatonicEntry; 7] = [
    entry(Q::Minor, HF::Tonic, MINOR_STRUCTURES),
    entry(Q::Diminished, HF::Subdominant, HALF_DIM_STRUCTURES),
    entry(Q::Major, HF::TonicMediant, MAJOR_STRUCTURES),
    entry(Q::Minor, HF::Subdominant, MINOR_STRUCTURES),
    entry(Q::Major, HF::Dominant, DOMINANT_STRUCTURES),
    entry(Q::Major, HF::Subdominant, MAJOR_STRUCTURES),
    entry(Q::Diminished, HF::Dominant, HALF_DIM_STRUCTURES),
];

const MAJOR_ROMAN: [&str; 7] = ["I", "ii", "iii", "IV", "V", "vi", "vii°"];
const MINOR_ROMAN: [&str; 7] = ["i", "ii°", "III", "iv", "V", "VI", "vii°"];

/// Look up the table row for a degree.
pub fn diatonic_entry(mode: Mode, degree: ScaleDegree) -> DiatonicEntry {
    match mode {
        Mode::Major => MAJOR_TABLE[degree.index()],
        Mode::Minor => MINOR_TABLE[degree.index()],
    }
}

/// Roman-numeral label for a degree.
pub fn roman_numeral(mode: Mode, degree: ScaleDegree) -> &'static str {
    match mode {
        Mode::Major => MAJOR_ROMAN[degree.index()],
        Mode::Minor => MINOR_ROMAN[degree.index()],
    }
}

/// How adventurous the base structure draws are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarmonicStyle {
    /// Mostly triads, occasional sevenths.
    Simple,
    /// Sevenths and ninths are more likely than plain triads.
    #[default]
    Complex,
}

impl HarmonicStyle {
    /// Availability probabilities for triad, seventh and ninth.
    fn structure_odds(self) -> [f64; 3] {
        match self {
            HarmonicStyle::Simple => [0.7, 0.3, 0.0],
            HarmonicStyle::Complex => [0.4, 0.6, 0.5],
        }
    }
}

/// Draw a chord type for `degree`.
pub fn select_chord_type(
    mode: Mode,
    degree: ScaleDegree,
    style: HarmonicStyle,
    rng: &mut SeededRng,
) -> ChordType {
    let entry = diatonic_entry(mode, degree);
    let minorish = entry.quality.is_minorish();
    let mut available: Vec<ChordType> = Vec::with_capacity(6);

    for (structure, odds) in entry.structures.iter().zip(style.structure_odds()) {
        if odds > 0.0 && rng.random_bool(odds) {
            available.push(*structure);
        }
    }

    let colour_allowed = degree != ScaleDegree::VII;
    if colour_allowed && rng.random_bool(0.2) {
        let sus = if rng.random_bool(0.5) { CT::Sus2 } else { CT::Sus4 };
        available.push(sus);
    }
    if colour_allowed && rng.random_bool(0.15) {
        available.push(if minorish { CT::MinorAdd9 } else { CT::Add9 });
    }
    if degree == ScaleDegree::V && rng.random_bool(0.1) {
        available.push(CT::Dominant7Sus4);
    }
    if colour_allowed && rng.random_bool(0.05) {
        available.push(if minorish { CT::Minor6 } else { CT::Major6 });
    }

    let chosen = rng
        .choose(&available)
        .copied()
        .unwrap_or(entry.structures[0]);

    let half_diminished_degree = matches!(
        (mode, degree),
        (Mode::Major, ScaleDegree::VII) | (Mode::Minor, ScaleDegree::II)
    );
    if half_diminished_degree && chosen.is_seventh() {
        return CT::HalfDiminished7;
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_qualities() {
        let q = |mode, d| diatonic_entry(mode, d).quality;
        assert_eq!(q(Mode::Major, ScaleDegree::I), ChordQuality::Major);
        assert_eq!(q(Mode::Major, ScaleDegree::II), ChordQuality::Minor);
        assert_eq!(q(Mode::Major, ScaleDegree::VII), ChordQuality::Diminished);
        assert_eq!(q(Mode::Minor, ScaleDegree::II), ChordQuality::Diminished);
        assert_eq!(q(Mode::Minor, ScaleDegree::V), ChordQuality::Major);
        assert_eq!(
            diatonic_entry(Mode::Major, ScaleDegree::V).structures[1],
            ChordType::Dominant7
        );
    }

    #[test]
    fn test_roman_numerals() {
        assert_eq!(roman_numeral(Mode::Major, ScaleDegree::VII), "vii°");
        assert_eq!(roman_numeral(Mode::Minor, ScaleDegree::III), "III");
    }

    #[test]
    fn test_recipes_start_on_root_and_spell_within_octave() {
        let all = [
            CT::MajorTriad, CT::MinorTriad, CT::DiminishedTriad, CT::Sus2, CT::Sus4,
            CT::Major6, CT::Minor6, CT::Major7, CT::Minor7, CT::Dominant7,
            CT::HalfDiminished7, CT::Dominant7Sus4, CT::Major9, CT::Minor9,
            CT::Dominant9, CT::HalfDiminished9, CT::Add9, CT::MinorAdd9,
        ];
        for ct in all {
            let recipe = ct.recipe();
            assert_eq!(recipe[0], RecipeTone { semitones: 0, steps: 0 }, "{}", ct.name());
            assert!(recipe.len() >= 3);
            assert!(recipe.iter().all(|tone| tone.semitones < 12 && tone.steps < 7));
        }
    }

    #[test]
    fn test_selection_stays_in_known_set() {
        let mut rng = SeededRng::new(5);
        for _ in 0..500 {
            for degree in ScaleDegree::ALL {
                let ct = select_chord_type(Mode::Major, degree, HarmonicStyle::Complex, &mut rng);
                let entry = diatonic_entry(Mode::Major, degree);
                let colour = [CT::Sus2, CT::Sus4, CT::Add9, CT::MinorAdd9, CT::Major6, CT::Minor6];
                assert!(
                    entry.structures.contains(&ct)
                        || colour.contains(&ct)
                        || ct == CT::Dominant7Sus4
                        || ct == CT::HalfDiminished7,
                    "unexpected {} on {degree}",
                    ct.name()
                );
                if ct == CT::Dominant7Sus4 {
                    assert_eq!(degree, ScaleDegree::V);
                }
            }
        }
    }

    #[test]
    fn test_diminished_sevenths_resolve_half_diminished() {
        let mut rng = SeededRng::new(77);
        for _ in 0..2000 {
            let vii = select_chord_type(Mode::Major, ScaleDegree::VII, HarmonicStyle::Complex, &mut rng);
            if vii.is_seventh() {
                assert_eq!(vii, CT::HalfDiminished7);
            }
            let ii = select_chord_type(Mode::Minor, ScaleDegree::II, HarmonicStyle::Complex, &mut rng);
            if ii.is_seventh() {
                assert_eq!(ii, CT::HalfDiminished7);
            }
        }
    }

    #[test]
    fn test_vii_never_gets_colour() {
        let mut rng = SeededRng::new(3);
        for _ in 0..2000 {
            let ct = select_chord_type(Mode::Major, ScaleDegree::VII, HarmonicStyle::Complex, &mut rng);
            assert!(HALF_DIM_STRUCTURES.contains(&ct), "{}", ct.name());
        }
    }

    #[test]
    fn test_simple_style_never_picks_ninths() {
        let mut rng = SeededRng::new(8);
        for _ in 0..2000 {
            let ct = select_chord_type(Mode::Major, ScaleDegree::I, HarmonicStyle::Simple, &mut rng);
            assert_ne!(ct, CT::Major9);
        }
    }
}
