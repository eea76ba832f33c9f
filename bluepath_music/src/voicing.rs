// Greedy voice-leading optimizer.
//
// For each chord, nine candidate voicings are generated: three rotations of
// the base stack (root position, first and second inversion), each walked
// upward so every pitch sits above its predecessor, times three octave
// shifts (-12, 0, +12). The first chord is placed in root position, raised an
// octave if it sits too low. Every later chord takes the candidate with the
// smallest total per-voice motion from the previous chosen voicing.
//
// Distance pairs voices after sorting both sets ascending. When the voice
// counts differ (a triad followed by a seventh chord, say) the smaller set is
// padded by doubling its own pitches an octave up, lowest first, so every
// voice of the larger chord has a partner.
//
// The result is locally optimal per step, not globally over the progression.

use crate::chord::ChordSpec;
use serde::Serialize;

/// Mean pitch below which the opening chord is raised an octave (F#3).
const OPENING_REGISTER_FLOOR: f64 = 54.0;

const OCTAVE_SHIFTS: [i32; 3] = [-12, 0, 12];
const ROTATIONS: usize = 3;

/// A chord with its resolved voicing and place on the timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicedChord {
    #[serde(flatten)]
    pub spec: ChordSpec,
    /// Absolute pitches actually sounded, ascending.
    pub voicing: Vec<u8>,
    /// Pitch names of `voicing`.
    pub notes: Vec<String>,
    pub start_beat: f64,
    pub duration_beats: f64,
}

impl VoicedChord {
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beats
    }

    /// Whether `pitch` shares a pitch class with any voiced tone.
    pub fn contains_pitch_class(&self, pitch: u8) -> bool {
        self.voicing.iter().any(|&v| v % 12 == pitch % 12)
    }

    /// Mean of the voiced pitches.
    pub fn center(&self) -> f64 {
        if self.voicing.is_empty() {
            return 60.0;
        }
        self.voicing.iter().map(|&p| p as f64).sum::<f64>() / self.voicing.len() as f64
    }
}

/// Walk `pitches` in order, raising each by octaves until it is above the
/// previous one.
pub fn normalize_ascending(pitches: &[i32]) -> Vec<i32> {
    let mut out: Vec<i32> = Vec::with_capacity(pitches.len());
    for &p in pitches {
        let mut p = p;
        if let Some(&prev) = out.last() {
            while p <= prev {
                p += 12;
            }
        }
        out.push(p);
    }
    out
}

/// The nine rotation x octave-shift candidates for a base stack, in
/// rotation-major order.
pub fn voicing_candidates(base: &[u8]) -> Vec<Vec<i32>> {
    let base: Vec<i32> = base.iter().map(|&p| p as i32).collect();
    let mut candidates = Vec::with_capacity(ROTATIONS * OCTAVE_SHIFTS.len());
    for inversion in 0..ROTATIONS {
        let mut rotated = base.clone();
        if !rotated.is_empty() {
            rotated.rotate_left(inversion % base.len());
        }
        let ascending = normalize_ascending(&rotated);
        for shift in OCTAVE_SHIFTS {
            candidates.push(ascending.iter().map(|p| p + shift).collect());
        }
    }
    candidates
}

/// Pad a sorted set to `len` voices by octave-doubling its own pitches.
fn pad_by_doubling(set: &[i32], len: usize) -> Vec<i32> {
    let mut out = set.to_vec();
    if set.is_empty() {
        return out;
    }
    let mut k = 0;
    while out.len() < len {
        let octaves = 1 + (k / set.len()) as i32;
        out.push(set[k % set.len()] + 12 * octaves);
        k += 1;
    }
    out.sort_unstable();
    out
}

/// Total absolute per-voice motion between two voicings.
pub fn voice_distance(prev: &[i32], next: &[i32]) -> i32 {
    let mut a = prev.to_vec();
    let mut b = next.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    let len = a.len().max(b.len());
    let a = pad_by_doubling(&a, len);
    let b = pad_by_doubling(&b, len);
    a.iter().zip(&b).map(|(x, y)| (x - y).abs()).sum()
}

/// Voicing for the opening chord: root position, lifted if too low.
fn opening_voicing(base: &[u8]) -> Vec<i32> {
    let base: Vec<i32> = base.iter().map(|&p| p as i32).collect();
    let ascending = normalize_ascending(&base);
    if ascending.is_empty() {
        return ascending;
    }
    let avg = ascending.iter().sum::<i32>() as f64 / ascending.len() as f64;
    if avg < OPENING_REGISTER_FLOOR {
        ascending.iter().map(|p| p + 12).collect()
    } else {
        ascending
    }
}

/// Pick the candidate nearest to `prev`; ties go to the earliest candidate.
pub fn best_candidate(prev: &[i32], base: &[u8]) -> Vec<i32> {
    let mut best: Option<(i32, Vec<i32>)> = None;
    for candidate in voicing_candidates(base) {
        let score = voice_distance(prev, &candidate);
        if best.as_ref().is_none_or(|(s, _)| score < *s) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, v)| v).unwrap_or_default()
}

/// Choose a voicing for every chord in order.
pub fn voice_lead(chords: &[ChordSpec]) -> Vec<Vec<u8>> {
    let mut prev: Option<Vec<i32>> = None;
    chords
        .iter()
        .map(|chord| {
            let chosen = match &prev {
                None => opening_voicing(&chord.base_pitches),
                Some(p) => best_candidate(p, &chord.base_pitches),
            };
            let voiced = chosen.iter().map(|&p| p.clamp(0, 127) as u8).collect();
            prev = Some(chosen);
            voiced
        })
        .collect()
}
