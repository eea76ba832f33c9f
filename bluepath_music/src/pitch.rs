// Pitch-class arithmetic and enharmonic spelling.
//
// Pitches are MIDI numbers (`u8`, middle C = 60 = "C4") and pitch classes are
// 0-11 with C = 0. Names come in two flavours:
// - Context-free display names (`pc_to_name`), chosen from a sharp or flat
//   table according to the accidental preference.
// - Letter-resolved spellings (`spell_required`), where the caller says which
//   diatonic letter the note must use so a 7-note scale uses each letter once
//   (pitch class 1 is "C#" under letter C and "Db" under letter D).
//
// Double accidentals survive inside `Spelling` so spelling a pitch class and
// parsing it back is lossless. The collapse of "##" to "x" and "bb" to "b"
// happens only in `Spelling::display_name`, which is purely cosmetic.
//
// Keys conventionally written in flats (F, Db, Eb, Gb, Ab, Bb) override the
// global accidental preference; see `Key::effective_preference`.

use crate::error::{ComposeError, ComposeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Note names accepted as keys and inside pitch strings, with their classes.
const NOTE_NAMES: [(&str, u8); 17] = [
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

/// Keys whose accidentals are always rendered as flats.
const FLAT_KEYS: [&str; 6] = ["F", "Db", "Eb", "Gb", "Ab", "Bb"];

/// Reduce any integer to a pitch class 0-11.
pub fn pitch_class(pitch: i32) -> u8 {
    pitch.rem_euclid(12) as u8
}

/// Global preference for rendering black-key pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccidentalPreference {
    #[default]
    Sharps,
    Flats,
}

/// Context-free display name for a pitch class.
pub fn pc_to_name(pc: u8, pref: AccidentalPreference) -> &'static str {
    let table = match pref {
        AccidentalPreference::Sharps => &SHARP_NAMES,
        AccidentalPreference::Flats => &FLAT_NAMES,
    };
    table[(pc % 12) as usize]
}

/// Look up a plain note name ("C", "F#", "Bb", ...) in the pitch-class table.
pub fn note_name_pc(name: &str) -> Option<u8> {
    NOTE_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, pc)| pc)
}

/// Convert a pitch string like `"C#4"` or `"Bb-1"` to a MIDI number.
pub fn pitch_to_midi(pitch: &str) -> ComposeResult<u8> {
    let invalid = || ComposeError::InvalidPitchName(pitch.to_string());

    let split = pitch
        .find(|c: char| c == '-' || c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (name, octave) = pitch.split_at(split);
    let pc = note_name_pc(name).ok_or_else(invalid)?;
    let octave: i32 = octave.parse().map_err(|_| invalid())?;

    let midi = pc as i32 + (octave + 1) * 12;
    u8::try_from(midi)
        .ok()
        .filter(|&m| m <= 127)
        .ok_or_else(invalid)
}

/// Convert a MIDI number to a pitch string like `"C#4"`.
pub fn midi_to_pitch(midi: u8, pref: AccidentalPreference) -> String {
    let octave = midi as i32 / 12 - 1;
    format!("{}{}", pc_to_name(midi % 12, pref), octave)
}

// ---------------------------------------------------------------------------
// Letter-resolved spelling
// ---------------------------------------------------------------------------

/// The seven diatonic letters, in scale order from C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Pitch class of the unaltered letter.
    pub fn natural_pc(self) -> u8 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    /// The letter `steps` diatonic steps above this one (wrapping at B).
    pub fn offset(self, steps: usize) -> Letter {
        Letter::ALL[(self.index() + steps) % 7]
    }

    fn from_char(c: char) -> Option<Letter> {
        match c {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

/// Accidental attached to a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    pub fn semitones(self) -> i32 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "bb",
            Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
        }
    }

    /// Display form: double sharps read "x", double flats collapse to "b".
    fn display_symbol(self) -> &'static str {
        match self {
            Accidental::DoubleFlat | Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "x",
        }
    }
}

/// A letter plus accidental, e.g. `F#` or `Ebb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Spelling {
    pub letter: Letter,
    pub accidental: Accidental,
}

impl Spelling {
    pub const fn new(letter: Letter, accidental: Accidental) -> Self {
        Spelling { letter, accidental }
    }

    pub fn pitch_class(self) -> u8 {
        pitch_class(self.letter.natural_pc() as i32 + self.accidental.semitones())
    }

    /// Cosmetic name for display; not guaranteed to parse back to the same
    /// pitch class.
    pub fn display_name(self) -> String {
        format!("{}{}", self.letter.as_char(), self.accidental.display_symbol())
    }

    /// Rewrite a single sharp on C, D, F, G or A as its flat enharmonic.
    /// Used for keys conventionally notated in flats.
    pub fn with_flat_cosmetic(self) -> Spelling {
        if self.accidental != Accidental::Sharp {
            return self;
        }
        match self.letter {
            Letter::C | Letter::D | Letter::F | Letter::G | Letter::A => {
                Spelling::new(self.letter.offset(1), Accidental::Flat)
            }
            Letter::E | Letter::B => self,
        }
    }
}

impl fmt::Display for Spelling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter.as_char(), self.accidental.symbol())
    }
}

impl FromStr for Spelling {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ComposeError::InvalidPitchName(s.to_string());
        let mut chars = s.chars();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
        let accidental = match chars.as_str() {
            "" => Accidental::Natural,
            "#" => Accidental::Sharp,
            "##" | "x" => Accidental::DoubleSharp,
            "b" => Accidental::Flat,
            "bb" => Accidental::DoubleFlat,
            _ => return Err(invalid()),
        };
        Ok(Spelling::new(letter, accidental))
    }
}

impl Serialize for Spelling {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display_name())
    }
}

use Accidental::{DoubleFlat as Dbl, DoubleSharp as Dsh, Flat, Natural as Nat, Sharp};
use Letter::{A, B, C, D, E, F, G};

/// Allowed (letter, accidental) spellings for each pitch class.
const SPELLING_TABLE: [&[(Letter, Accidental)]; 12] = [
    &[(C, Nat), (B, Sharp), (D, Dbl)],
    &[(C, Sharp), (D, Flat)],
    &[(D, Nat), (C, Dsh), (E, Dbl)],
    &[(D, Sharp), (E, Flat), (F, Dbl)],
    &[(E, Nat), (F, Flat)],
    &[(F, Nat), (E, Sharp), (G, Dbl)],
    &[(F, Sharp), (G, Flat)],
    &[(G, Nat), (F, Dsh), (A, Dbl)],
    &[(G, Sharp), (A, Flat)],
    &[(A, Nat), (G, Dsh), (B, Dbl)],
    &[(A, Sharp), (B, Flat), (C, Dbl)],
    &[(B, Nat), (C, Flat)],
];

/// Table lookup for a pitch class spelled with a required letter.
pub fn spell_with_letter(pc: u8, letter: Letter) -> Option<Spelling> {
    SPELLING_TABLE[(pc % 12) as usize]
        .iter()
        .find(|(l, _)| *l == letter)
        .map(|&(l, acc)| Spelling::new(l, acc))
}

/// Plain sharp-based spelling of a pitch class.
pub fn sharp_spelling(pc: u8) -> Spelling {
    // The first natural-or-sharp entry of each row is the sharp-table name.
    let &(letter, accidental) = SPELLING_TABLE[(pc % 12) as usize]
        .iter()
        .find(|(_, acc)| matches!(acc, Nat | Sharp))
        .unwrap_or(&SPELLING_TABLE[0][0]);
    Spelling::new(letter, accidental)
}

/// Spell `pc` with `letter`, falling back to the sharp-based name when the
/// table has no entry for that pair.
pub fn spell_required(pc: u8, letter: Letter) -> Spelling {
    spell_with_letter(pc, letter).unwrap_or_else(|| sharp_spelling(pc))
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A parsed tonic: its name as written, pitch class and spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub name: String,
    pub pc: u8,
    pub spelling: Spelling,
}

impl Key {
    /// Resolve a key name from the pitch-class table.
    pub fn parse(name: &str) -> ComposeResult<Key> {
        let pc = note_name_pc(name).ok_or_else(|| ComposeError::UnknownKey(name.to_string()))?;
        let spelling: Spelling = name.parse()?;
        Ok(Key {
            name: name.to_string(),
            pc,
            spelling,
        })
    }

    /// Whether this key is conventionally notated in flats.
    pub fn is_flat_key(&self) -> bool {
        FLAT_KEYS.contains(&self.name.as_str())
    }

    /// Accidental preference after the per-key flat override.
    pub fn effective_preference(&self, pref: AccidentalPreference) -> AccidentalPreference {
        if self.is_flat_key() {
            AccidentalPreference::Flats
        } else {
            pref
        }
    }

    /// Apply the key's cosmetic accidental override to a spelling.
    pub fn cosmetic(&self, spelling: Spelling) -> Spelling {
        if self.is_flat_key() {
            spelling.with_flat_cosmetic()
        } else {
            spelling
        }
    }
}
