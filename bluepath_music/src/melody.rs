// Melody generation over a voiced progression.
//
// The melody is built phrase by phrase (structure.rs). Each phrase is either
// generated freely or, once a motif has been captured, may replay that motif
// transposed to the current harmony:
//
// - Free generation walks the phrase on a quarter-beat grid. A density gate
//   decides whether a note starts at each step; a started note draws its
//   length from the rhythm style (rhythm.rs), becomes a rest some of the time,
//   and otherwise picks a pitch near the previous one, favouring chord tones.
// - Reuse re-anchors the motif's first pitch near the phrase's opening chord
//   and replays its intervals (each clamped to the leap limit) with freshly
//   drawn durations, placed back to back from the motif's first offset.
//
// The first freely generated phrase with at least three pitched notes donates
// its opening run as the motif. That state lives in a `MelodySession` owned by
// the caller, never in a global.
//
// Every phrase ends with cadence shaping: a phrase with no pitched note gets a
// closing note (exempt from the density gate), and the final pitched note is
// pulled toward the root, third or fifth of the closing chord and lengthened.
//
// An optional pass (`transpose_melody`) shifts the finished melody up whole
// octaves and recomputes chord-tone flags at each note's start beat.

use crate::mode::Tonality;
use crate::pitch::{AccidentalPreference, midi_to_pitch, pitch_class};
use crate::rhythm::{DurationContext, MELODY_STEP, RhythmStyle, draw_duration, snap_beats};
use crate::structure::{BEATS_PER_BAR, Phrase, plan_phrases};
use crate::voicing::VoicedChord;
use bluepath_prng::SeededRng;
use serde::Serialize;

/// Chance that a placed slot becomes a rest.
pub const REST_CHANCE: f64 = 0.18;

/// Longest motif captured from a phrase, in pitched notes.
pub const MAX_MOTIF_NOTES: usize = 8;

/// Fewest pitched notes a phrase needs before it can donate a motif.
pub const MIN_MOTIF_NOTES: usize = 3;

/// How many nearest candidates the pitch chooser considers.
const NEAREST_CANDIDATES: usize = 10;
/// Candidates considered for a varied (non-nearest) pick.
const VARIED_CANDIDATES: usize = 4;
/// Chance of taking the single nearest candidate when a previous pitch exists.
const NEAREST_CHANCE: f64 = 0.6;

const STRONG_BEAT_VELOCITY: f64 = 0.85;
const WEAK_BEAT_VELOCITY: f64 = 0.72;
const VELOCITY_JITTER: f64 = 0.04;
const MIN_VELOCITY: f64 = 0.35;
const MAX_VELOCITY: f64 = 0.95;

/// Relative pull toward root, third and fifth at a cadence.
const CADENCE_WEIGHTS: [f64; 3] = [3.0, 2.0, 1.0];
const MAX_CADENCE_DURATION: f64 = 2.5;

const EPSILON: f64 = 1e-9;

/// One melody event. Rests carry no pitch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi: Option<u8>,
    pub start_beat: f64,
    pub duration_beats: f64,
    pub velocity: f64,
    pub is_rest: bool,
    pub is_chord_tone: bool,
}

impl Note {
    pub fn rest(start_beat: f64, duration_beats: f64) -> Self {
        Note {
            pitch: None,
            midi: None,
            start_beat,
            duration_beats,
            velocity: 0.0,
            is_rest: true,
            is_chord_tone: false,
        }
    }

    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beats
    }
}

/// A captured melodic cell: where its notes started within the phrase and
/// the semitone steps between consecutive notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Motif {
    pub offsets: Vec<f64>,
    pub deltas: Vec<i32>,
}

impl Motif {
    /// Capture a motif from the pitched notes of a phrase.
    ///
    /// Returns `None` when there are fewer than `MIN_MOTIF_NOTES` of them.
    pub fn capture(notes: &[Note], phrase_start: f64) -> Option<Motif> {
        let pitched: Vec<(f64, u8)> = notes
            .iter()
            .filter_map(|n| n.midi.map(|m| (n.start_beat, m)))
            .take(MAX_MOTIF_NOTES)
            .collect();
        if pitched.len() < MIN_MOTIF_NOTES {
            return None;
        }
        Some(Motif {
            offsets: pitched.iter().map(|&(start, _)| start - phrase_start).collect(),
            deltas: pitched
                .windows(2)
                .map(|w| w[1].1 as i32 - w[0].1 as i32)
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// State carried across the phrases of one generation run.
#[derive(Debug, Clone, Default)]
pub struct MelodySession {
    pub motif: Option<Motif>,
    pub prev_pitch: Option<u8>,
    pub last_duration: Option<f64>,
}

impl MelodySession {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Generation parameters, with percentages already scaled to 0-1.
#[derive(Debug, Clone)]
pub struct MelodySettings {
    /// Chord register anchor; the melody pool centres one octave above it.
    pub octave: i32,
    pub rhythm: RhythmStyle,
    pub density: f64,
    pub chord_tone_preference: f64,
    pub max_leap: u32,
    pub phrase_bars: u32,
    pub motif_reuse: f64,
    pub cadence_strength: f64,
    pub accidentals: AccidentalPreference,
}

/// A finished melody with its phrase layout.
#[derive(Debug, Clone)]
pub struct MelodyOutput {
    pub notes: Vec<Note>,
    pub phrases: Vec<Phrase>,
    pub total_beats: f64,
    pub motif: Option<Motif>,
    /// Indices of phrases that replayed the motif.
    pub reused_phrases: Vec<usize>,
}

impl MelodyOutput {
    pub fn phrase_markers(&self) -> Vec<f64> {
        self.phrases.iter().map(|p| p.start_beat).collect()
    }
}

// ---------------------------------------------------------------------------
// Chord timeline
// ---------------------------------------------------------------------------

/// Beat-indexed view of a non-empty voiced progression.
#[derive(Debug, Clone, Copy)]
pub struct ChordTimeline<'a> {
    chords: &'a [VoicedChord],
    last: &'a VoicedChord,
}

impl<'a> ChordTimeline<'a> {
    /// Returns `None` for an empty progression.
    pub fn new(chords: &'a [VoicedChord]) -> Option<Self> {
        chords.last().map(|last| ChordTimeline { chords, last })
    }

    /// The chord sounding at `beat`, or the final chord past the end.
    pub fn chord_at(&self, beat: f64) -> &'a VoicedChord {
        self.chords
            .iter()
            .find(|c| beat >= c.start_beat && beat < c.end_beat())
            .unwrap_or(self.last)
    }

    pub fn total_beats(&self) -> f64 {
        self.last.end_beat()
    }

    /// Whether `pitch` is a chord tone of the chord sounding at `beat`.
    pub fn is_chord_tone(&self, beat: f64, pitch: u8) -> bool {
        self.chord_at(beat).contains_pitch_class(pitch)
    }
}

// ---------------------------------------------------------------------------
// Pitch choice
// ---------------------------------------------------------------------------

/// Every pitch in the scale pool's span whose pitch class is in the chord.
pub fn chord_tone_pool(chord: &VoicedChord, scale_pool: &[u8]) -> Vec<u8> {
    let (Some(&low), Some(&high)) = (scale_pool.first(), scale_pool.last()) else {
        return chord.voicing.clone();
    };
    (low..=high).filter(|&p| chord.contains_pitch_class(p)).collect()
}

/// The up-to-`n` pool pitches closest to `target`, nearest first.
fn nearest(pool: &[u8], target: f64, n: usize) -> Vec<u8> {
    let mut sorted = pool.to_vec();
    sorted.sort_by(|a, b| {
        let da = (*a as f64 - target).abs();
        let db = (*b as f64 - target).abs();
        da.total_cmp(&db)
    });
    sorted.truncate(n);
    sorted
}

/// Inputs to a single pitch choice.
#[derive(Debug, Clone, Copy)]
pub struct PitchChoice<'a> {
    pub chord_pool: &'a [u8],
    pub scale_pool: &'a [u8],
    /// Mean pitch of the current chord, used as the target with no history.
    pub center: f64,
    pub prev: Option<u8>,
    pub chord_tone_preference: f64,
    pub max_leap: u32,
}

/// Pick a melody pitch near the previous one.
pub fn choose_melody_pitch(choice: &PitchChoice, rng: &mut SeededRng) -> Option<u8> {
    let target = choice.prev.map_or(choice.center, |p| p as f64);
    let prefer_chord = rng.random_bool(choice.chord_tone_preference);
    let pool = if prefer_chord && !choice.chord_pool.is_empty() {
        choice.chord_pool
    } else {
        choice.scale_pool
    };
    let mut candidates = nearest(pool, target, NEAREST_CANDIDATES);

    if let Some(prev) = choice.prev {
        let within: Vec<u8> = candidates
            .iter()
            .copied()
            .filter(|&m| m.abs_diff(prev) as u32 <= choice.max_leap)
            .collect();
        if !within.is_empty() {
            candidates = within;
        }
        if rng.random_bool(NEAREST_CHANCE) {
            return candidates.iter().copied().min_by_key(|&m| m.abs_diff(prev));
        }
    }

    let top = &candidates[..candidates.len().min(VARIED_CANDIDATES)];
    rng.choose(top).copied()
}

fn note_velocity(beat_in_bar: f64, rng: &mut SeededRng) -> f64 {
    let base = if beat_in_bar == 0.0 || beat_in_bar == 2.0 {
        STRONG_BEAT_VELOCITY
    } else {
        WEAK_BEAT_VELOCITY
    };
    let jitter = rng.range_f64(-VELOCITY_JITTER, VELOCITY_JITTER);
    (base + jitter).clamp(MIN_VELOCITY, MAX_VELOCITY)
}

/// The octave of pitch class `pc` nearest to `pitch`; ties go down.
pub fn nearest_with_pitch_class(pitch: u8, pc: u8) -> u8 {
    let below = pitch as i32 - pitch_class(pitch as i32 - pc as i32) as i32;
    let above = below + 12;
    let chosen = if above <= 127 && above - (pitch as i32) < (pitch as i32) - below {
        above
    } else if below < 0 {
        above
    } else {
        below
    };
    chosen.clamp(0, 127) as u8
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

struct PhraseWriter<'a> {
    timeline: ChordTimeline<'a>,
    scale_pool: Vec<u8>,
    settings: &'a MelodySettings,
    weights: [f64; 6],
}

impl PhraseWriter<'_> {
    /// Choose a pitch for the chord sounding at `beat`.
    fn choose_at(&self, beat: f64, prev: Option<u8>, rng: &mut SeededRng) -> Option<u8> {
        let chord = self.timeline.chord_at(beat);
        let chord_pool = chord_tone_pool(chord, &self.scale_pool);
        let choice = PitchChoice {
            chord_pool: &chord_pool,
            scale_pool: &self.scale_pool,
            center: chord.center(),
            prev,
            chord_tone_preference: self.settings.chord_tone_preference,
            max_leap: self.settings.max_leap,
        };
        choose_melody_pitch(&choice, rng)
    }

    fn duration(&self, start: f64, remaining: f64, session: &MelodySession, rng: &mut SeededRng) -> f64 {
        let ctx = DurationContext {
            remaining,
            beat_in_bar: start % BEATS_PER_BAR,
            last_duration: session.last_duration,
            density_percent: self.settings.density * 100.0,
        };
        draw_duration(&self.weights, &ctx, rng)
    }

    fn pitched_note(&self, pitch: u8, start: f64, duration: f64, rng: &mut SeededRng) -> Note {
        Note {
            pitch: Some(midi_to_pitch(pitch, self.settings.accidentals)),
            midi: Some(pitch),
            start_beat: start,
            duration_beats: duration,
            velocity: note_velocity(start % BEATS_PER_BAR, rng),
            is_rest: false,
            is_chord_tone: self.timeline.is_chord_tone(start, pitch),
        }
    }

    fn free_phrase(&self, phrase: &Phrase, session: &mut MelodySession, rng: &mut SeededRng) -> Vec<Note> {
        let mut notes = Vec::new();
        let len = phrase.len_beats();
        let mut s = 0.0;
        while s < len - EPSILON {
            s = snap_beats(s);
            let start = phrase.start_beat + s;
            let remaining = phrase.end_beat - start;

            if !rng.random_bool(self.settings.density) {
                s = snap_beats(s + MELODY_STEP);
                continue;
            }

            let duration = self.duration(start, remaining, session, rng);
            if rng.random_bool(REST_CHANCE) {
                notes.push(Note::rest(start, duration));
                s = snap_beats(s + duration);
                continue;
            }

            if let Some(pitch) = self.choose_at(start, session.prev_pitch, rng) {
                notes.push(self.pitched_note(pitch, start, duration, rng));
                session.prev_pitch = Some(pitch);
                session.last_duration = Some(duration);
            }
            s = snap_beats(s + duration);
        }
        notes
    }

    fn reuse_phrase(
        &self,
        phrase: &Phrase,
        motif: &Motif,
        session: &mut MelodySession,
        rng: &mut SeededRng,
    ) -> Vec<Note> {
        let mut notes = Vec::new();
        let Some(&first_offset) = motif.offsets.first() else {
            return notes;
        };

        let opening = self.timeline.chord_at(phrase.start_beat);
        let anchor_prev = session
            .prev_pitch
            .unwrap_or_else(|| opening.center().round().clamp(0.0, 127.0) as u8);
        let Some(mut pitch) = self.choose_at(phrase.start_beat, Some(anchor_prev), rng) else {
            return notes;
        };

        let leap = i32::try_from(self.settings.max_leap).unwrap_or(i32::MAX);
        let len = phrase.len_beats();
        let mut s = snap_beats(first_offset);
        for i in 0..motif.len() {
            if s >= len - EPSILON {
                break;
            }
            if i > 0 {
                let step = motif.deltas.get(i - 1).copied().unwrap_or(0).clamp(-leap, leap);
                pitch = (pitch as i32 + step).clamp(0, 127) as u8;
            }
            let start = phrase.start_beat + s;
            let duration = self.duration(start, phrase.end_beat - start, session, rng);
            notes.push(self.pitched_note(pitch, start, duration, rng));
            session.prev_pitch = Some(pitch);
            session.last_duration = Some(duration);
            s = snap_beats(s + duration);
        }
        notes
    }

    /// Give a phrase with no pitched note a closing note on its last beat.
    fn ensure_cadence_note(
        &self,
        phrase: &Phrase,
        notes: &mut Vec<Note>,
        session: &mut MelodySession,
        rng: &mut SeededRng,
    ) {
        if notes.iter().any(|n| !n.is_rest) {
            return;
        }
        let last_end = notes.last().map_or(phrase.start_beat, Note::end_beat);
        let start = snap_beats(last_end.max(phrase.end_beat - 1.0).max(phrase.start_beat));
        let room = phrase.end_beat - start >= MELODY_STEP - EPSILON;

        // No room after the trailing rest: the rest itself becomes the note.
        let (start, duration) = if room {
            (start, phrase.end_beat - start)
        } else {
            match notes.pop() {
                Some(rest) => (rest.start_beat, rest.duration_beats),
                None => return,
            }
        };

        if let Some(pitch) = self.choose_at(start, session.prev_pitch, rng) {
            notes.push(self.pitched_note(pitch, start, duration, rng));
            session.prev_pitch = Some(pitch);
            session.last_duration = Some(duration);
        }
    }

    /// Pull the phrase's last pitched note toward the closing chord.
    fn apply_cadence(&self, phrase: &Phrase, notes: &mut [Note], session: &mut MelodySession, rng: &mut SeededRng) {
        let strength = self.settings.cadence_strength.clamp(0.0, 1.0);
        let Some(last) = notes.last_mut() else {
            return;
        };
        let Some(mut pitch) = last.midi else {
            return;
        };

        if rng.random_bool(strength) {
            let closing = self.timeline.chord_at((phrase.end_beat - 0.001).max(0.0));
            let tones = closing.spec.cadence_tones();
            let index = if strength >= 1.0 {
                Some(0)
            } else {
                rng.weighted_index(&CADENCE_WEIGHTS[..tones.len().min(CADENCE_WEIGHTS.len())])
            };
            if let Some(&pc) = index.and_then(|i| tones.get(i)) {
                pitch = nearest_with_pitch_class(pitch, pc);
            }
        }

        let lengthened = last.duration_beats.max(0.5 + 1.5 * strength).min(MAX_CADENCE_DURATION);
        let room = phrase.end_beat - last.start_beat;
        last.duration_beats = snap_beats(lengthened).min(room).max(MELODY_STEP.min(room));
        last.velocity = (last.velocity + 0.12 * strength).min(MAX_VELOCITY);
        last.midi = Some(pitch);
        last.pitch = Some(midi_to_pitch(pitch, self.settings.accidentals));
        last.is_chord_tone = self.timeline.is_chord_tone(last.start_beat, pitch);

        session.prev_pitch = Some(pitch);
        session.last_duration = Some(last.duration_beats);
    }
}

/// Generate a melody with a fresh session.
pub fn generate_melody(
    chords: &[VoicedChord],
    tonality: &Tonality,
    settings: &MelodySettings,
    rng: &mut SeededRng,
) -> MelodyOutput {
    let mut session = MelodySession::new();
    generate_melody_with_session(chords, tonality, settings, &mut session, rng)
}

/// Generate a melody, reading and updating `session`.
pub fn generate_melody_with_session(
    chords: &[VoicedChord],
    tonality: &Tonality,
    settings: &MelodySettings,
    session: &mut MelodySession,
    rng: &mut SeededRng,
) -> MelodyOutput {
    let Some(timeline) = ChordTimeline::new(chords) else {
        return MelodyOutput {
            notes: Vec::new(),
            phrases: Vec::new(),
            total_beats: 0.0,
            motif: session.motif.clone(),
            reused_phrases: Vec::new(),
        };
    };

    let register = settings.octave + 1;
    let writer = PhraseWriter {
        timeline,
        scale_pool: tonality.scale_pitches(register - 1, register + 1),
        settings,
        weights: settings.rhythm.weights(),
    };

    let total_beats = timeline.total_beats();
    let phrases = plan_phrases(total_beats, settings.phrase_bars);
    let mut notes = Vec::new();
    let mut reused_phrases = Vec::new();

    for phrase in &phrases {
        let reused_motif = session
            .motif
            .clone()
            .filter(|_| rng.random_bool(settings.motif_reuse));
        let mut phrase_notes = match reused_motif {
            Some(motif) => {
                reused_phrases.push(phrase.index);
                writer.reuse_phrase(phrase, &motif, session, rng)
            }
            None => {
                let generated = writer.free_phrase(phrase, session, rng);
                if session.motif.is_none() {
                    session.motif = Motif::capture(&generated, phrase.start_beat);
                    if session.motif.is_some() {
                        log::debug!("captured motif from phrase {}", phrase.index);
                    }
                }
                generated
            }
        };

        writer.ensure_cadence_note(phrase, &mut phrase_notes, session, rng);
        writer.apply_cadence(phrase, &mut phrase_notes, session, rng);
        notes.extend(phrase_notes);
    }

    notes.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));
    log::debug!(
        "melody: {} notes over {} phrases, {} reused",
        notes.len(),
        phrases.len(),
        reused_phrases.len()
    );

    MelodyOutput {
        notes,
        phrases,
        total_beats,
        motif: session.motif.clone(),
        reused_phrases,
    }
}

/// Shift pitched notes up by `octaves` (clamped to 0-2), recomputing
/// chord-tone flags at each note's start beat.
pub fn transpose_melody(
    notes: &[Note],
    chords: &[VoicedChord],
    octaves: i32,
    accidentals: AccidentalPreference,
) -> Vec<Note> {
    let shift = octaves.clamp(0, 2) * 12;
    let timeline = match ChordTimeline::new(chords) {
        Some(t) if shift > 0 => t,
        _ => return notes.to_vec(),
    };
    notes
        .iter()
        .map(|note| {
            let Some(midi) = note.midi else {
                return note.clone();
            };
            let shifted = (midi as i32 + shift).min(127) as u8;
            Note {
                pitch: Some(midi_to_pitch(shifted, accidentals)),
                midi: Some(shifted),
                is_chord_tone: timeline.is_chord_tone(note.start_beat, shifted),
                ..note.clone()
            }
        })
        .collect()
}
