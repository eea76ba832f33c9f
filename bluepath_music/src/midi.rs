// MIDI output from compositions.
//
// Renders a finished `Composition` as a Standard MIDI File (SMF format 1):
// a tempo track, a chord track and a melody track. This is the only place
// where beats meet wall-clock time. Tempo converts the strum offset from
// milliseconds into ticks, and the chord pattern decides how each chord is
// articulated within its span.
//
// Chord articulation follows the named pattern: onset offsets relative to the
// chord start (negative offsets anticipate the chord from the previous one),
// a gate that is either a fraction of the chord length or a fixed number of
// beats, and an optional accent on the downbeat. Voices are strummed upward
// and get slightly softer as they rise; bar downbeats and beat 3 are
// accented. Melody notes are gated at 98% of their length.
//
// Uses the `midly` crate for MIDI writing.

use crate::composition::Composition;
use crate::error::{ComposeError, ComposeResult};
use crate::structure::BEATS_PER_BAR;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note (one beat) in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

const CHORD_CHANNEL: u8 = 0;
const MELODY_CHANNEL: u8 = 1;
/// General MIDI acoustic grand piano.
const PIANO_PROGRAM: u8 = 0;

const SUSTAIN_GATE: f64 = 0.95;
const PULSE_GATE_SCALE: f64 = 0.9;
const MIN_GATE_BEATS: f64 = 0.05;
const MELODY_GATE: f64 = 0.98;

/// Playback-only parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    pub tempo_bpm: f64,
    /// Delay between successive chord voices.
    pub strum_ms: f64,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        PlaybackOptions {
            tempo_bpm: 96.0,
            strum_ms: 18.0,
        }
    }
}

impl PlaybackOptions {
    fn strum_beats(&self) -> f64 {
        self.strum_ms.max(0.0) / 1000.0 * self.tempo_bpm / 60.0
    }
}

/// How long each chord hit sounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    /// A fixed fraction of the chord's length.
    Sustain,
    /// At most this many beats.
    Beats(f64),
}

/// Named chord articulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordPattern {
    Sustain,
    SustainAccent,
    Hits13,
    Hits24,
    QuarterPulse,
    EighthPulse,
    AnticipationInto,
    AnticipateHold,
}

impl ChordPattern {
    pub const ALL: [ChordPattern; 8] = [
        ChordPattern::Sustain,
        ChordPattern::SustainAccent,
        ChordPattern::Hits13,
        ChordPattern::Hits24,
        ChordPattern::QuarterPulse,
        ChordPattern::EighthPulse,
        ChordPattern::AnticipationInto,
        ChordPattern::AnticipateHold,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChordPattern::Sustain => "sustain",
            ChordPattern::SustainAccent => "sustainAccent",
            ChordPattern::Hits13 => "hits13",
            ChordPattern::Hits24 => "hits24",
            ChordPattern::QuarterPulse => "quarterPulse",
            ChordPattern::EighthPulse => "eighthPulse",
            ChordPattern::AnticipationInto => "anticipationInto",
            ChordPattern::AnticipateHold => "anticipateHold",
        }
    }

    pub fn from_name(name: &str) -> Option<ChordPattern> {
        ChordPattern::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Resolve a pattern name, falling back to sustain for unknown names.
    pub fn resolve(name: &str) -> ChordPattern {
        ChordPattern::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown chord pattern {name:?}, using sustain");
            ChordPattern::Sustain
        })
    }

    /// Onset offsets in beats from the chord's start.
    pub fn offsets(self) -> &'static [f64] {
        match self {
            ChordPattern::Sustain | ChordPattern::SustainAccent => &[0.0],
            ChordPattern::Hits13 => &[0.0, 2.0],
            ChordPattern::Hits24 => &[1.0, 3.0],
            ChordPattern::QuarterPulse => &[0.0, 1.0, 2.0, 3.0],
            ChordPattern::EighthPulse => &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5],
            ChordPattern::AnticipationInto => &[-0.5, 0.0],
            ChordPattern::AnticipateHold => &[-0.5],
        }
    }

    pub fn gate(self) -> Gate {
        match self {
            ChordPattern::Sustain | ChordPattern::SustainAccent | ChordPattern::AnticipateHold => {
                Gate::Sustain
            }
            ChordPattern::Hits13 | ChordPattern::AnticipationInto => Gate::Beats(0.55),
            ChordPattern::Hits24 => Gate::Beats(0.50),
            ChordPattern::QuarterPulse => Gate::Beats(0.40),
            ChordPattern::EighthPulse => Gate::Beats(0.28),
        }
    }

    pub fn accent_on_one(self) -> bool {
        self == ChordPattern::SustainAccent
    }
}

/// One sounding note on the beat timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub start_beat: f64,
    pub end_beat: f64,
    pub key: u8,
    /// Loudness 0-1.
    pub velocity: f64,
}

fn bar_accent(beat_in_bar: f64) -> f64 {
    if beat_in_bar == 0.0 {
        1.18
    } else if beat_in_bar == 2.0 {
        1.08
    } else {
        1.0
    }
}

/// Expand every chord into pattern hits with strummed voices.
pub fn schedule_chords(composition: &Composition, options: &PlaybackOptions) -> Vec<ScheduledNote> {
    let pattern = ChordPattern::resolve(&composition.progression.chord_pattern);
    let strum = options.strum_beats();
    let mut out = Vec::new();

    for chord in &composition.progression.chords {
        let duration = chord.duration_beats;
        let gate = match pattern.gate() {
            Gate::Sustain => duration * SUSTAIN_GATE,
            Gate::Beats(beats) => (duration * PULSE_GATE_SCALE).min(beats),
        };

        for &offset in pattern.offsets() {
            if offset >= duration {
                continue;
            }
            let hit = chord.start_beat + offset;
            let length = gate.min(duration - offset.max(0.0)).max(MIN_GATE_BEATS);
            let beat_in_bar = hit.rem_euclid(BEATS_PER_BAR);
            let accent = bar_accent(beat_in_bar);

            for (idx, &key) in chord.voicing.iter().enumerate() {
                let mut velocity = (0.72 - idx as f64 * 0.06).max(0.35);
                if pattern.accent_on_one() && beat_in_bar == 0.0 {
                    velocity *= 1.12;
                }
                let start = hit + idx as f64 * strum;
                out.push(ScheduledNote {
                    start_beat: start.max(0.0),
                    end_beat: (start + length).max(start.max(0.0) + MIN_GATE_BEATS),
                    key,
                    velocity: (velocity * accent).min(0.95),
                });
            }
        }
    }
    out
}

/// Pitched melody notes with their playback gate applied.
pub fn schedule_melody(composition: &Composition) -> Vec<ScheduledNote> {
    composition
        .melody
        .iter()
        .filter_map(|note| {
            note.midi.map(|key| ScheduledNote {
                start_beat: note.start_beat,
                end_beat: note.start_beat + note.duration_beats * MELODY_GATE,
                key,
                velocity: note.velocity,
            })
        })
        .collect()
}

fn beats_to_ticks(beats: f64) -> u32 {
    (beats.max(0.0) * TICKS_PER_QUARTER as f64).round() as u32
}

fn midi_velocity(velocity: f64) -> u8 {
    (velocity * 127.0).round().clamp(1.0, 127.0) as u8
}

/// Build one instrument track from scheduled notes.
fn notes_to_track(name: &'static str, channel: u8, notes: &[ScheduledNote]) -> Track<'static> {
    let channel = u4::new(channel);
    let mut track: Track<'static> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(PIANO_PROGRAM),
            },
        },
    });

    // (tick, is_on, key, velocity); offs sort before ons at the same tick.
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let on = beats_to_ticks(note.start_beat);
        let off = beats_to_ticks(note.end_beat).max(on + 1);
        let key = note.key.min(127);
        events.push((on, true, key, midi_velocity(note.velocity)));
        events.push((off, false, key, 0));
    }
    events.sort_by_key(|&(tick, is_on, key, _)| (tick, is_on, key));

    let mut last_tick = 0;
    for (tick, is_on, key, vel) in events {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

/// Convert a composition to an in-memory SMF.
pub fn composition_to_smf(composition: &Composition, options: &PlaybackOptions) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let micros_per_beat = (60_000_000.0 / options.tempo_bpm.max(4.0)).round() as u32;
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros_per_beat.min(0xFF_FFFF)))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    let chords = schedule_chords(composition, options);
    let melody = schedule_melody(composition);
    smf.tracks.push(notes_to_track("Chords", CHORD_CHANNEL, &chords));
    smf.tracks.push(notes_to_track("Melody", MELODY_CHANNEL, &melody));
    smf
}

/// Convert a composition to MIDI and write it to `path`.
pub fn write_midi(composition: &Composition, options: &PlaybackOptions, path: &Path) -> ComposeResult<()> {
    let smf = composition_to_smf(composition, options);
    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| ComposeError::Midi(e.to_string()))?;
    std::fs::write(path, &buf)?;
    log::info!("wrote {} bytes of MIDI to {}", buf.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::compose;
    use crate::config::ComposeConfig;
    use bluepath_prng::SeededRng;

    fn composition(pattern: &str, cpb: u32) -> Composition {
        let config = ComposeConfig {
            bars: 2,
            chords_per_bar: cpb,
            chord_pattern: pattern.to_string(),
            ..ComposeConfig::default()
        };
        compose(&config, &mut SeededRng::new(21)).unwrap()
    }

    fn note_ons(track: &Track) -> usize {
        track
            .iter()
            .filter(|e| matches!(e.kind, TrackEventKind::Midi { message: MidiMessage::NoteOn { .. }, .. }))
            .count()
    }

    #[test]
    fn test_pattern_names_roundtrip() {
        for pattern in ChordPattern::ALL {
            assert_eq!(ChordPattern::from_name(pattern.name()), Some(pattern));
        }
        assert_eq!(ChordPattern::resolve("waltz"), ChordPattern::Sustain);
    }

    #[test]
    fn test_smf_layout() {
        let comp = composition("sustain", 1);
        let smf = composition_to_smf(&comp, &PlaybackOptions::default());
        assert_eq!(smf.tracks.len(), 3);
        let voices: usize = comp.progression.chords.iter().map(|c| c.voicing.len()).sum();
        assert_eq!(note_ons(&smf.tracks[1]), voices);
        let pitched = comp.melody.iter().filter(|n| !n.is_rest).count();
        assert_eq!(note_ons(&smf.tracks[2]), pitched);
    }

    #[test]
    fn test_quarter_pulse_skips_offsets_past_chord() {
        // Two chords per bar last two beats: only offsets 0 and 1 fit.
        let comp = composition("quarterPulse", 2);
        let chords = schedule_chords(&comp, &PlaybackOptions::default());
        let voices: usize = comp.progression.chords.iter().map(|c| c.voicing.len()).sum();
        assert_eq!(chords.len(), voices * 2);
        for note in &chords {
            assert!(note.end_beat - note.start_beat <= 0.40 + 1e-9);
        }
    }

    #[test]
    fn test_strum_and_accent() {
        let comp = composition("sustainAccent", 1);
        let options = PlaybackOptions {
            tempo_bpm: 120.0,
            strum_ms: 50.0,
        };
        let chords = schedule_chords(&comp, &options);
        let first = &comp.progression.chords[0];
        let hits = &chords[..first.voicing.len()];
        // 50 ms at 120 BPM is a tenth of a beat.
        assert!((hits[1].start_beat - hits[0].start_beat - 0.1).abs() < 1e-9);
        assert_eq!(hits[0].velocity, 0.95);
        assert!(hits.windows(2).all(|w| w[0].velocity >= w[1].velocity));
    }

    #[test]
    fn test_anticipation_clamps_first_chord() {
        let comp = composition("anticipateHold", 1);
        let chords = schedule_chords(&comp, &PlaybackOptions::default());
        assert!(chords.iter().all(|n| n.start_beat >= 0.0 && n.end_beat > n.start_beat));
        let second = &comp.progression.chords[1];
        assert!(chords.iter().any(|n| (n.start_beat - (second.start_beat - 0.5)).abs() < 1e-9));
    }

    #[test]
    fn test_write_midi_roundtrip() {
        let comp = composition("eighthPulse", 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mid");
        write_midi(&comp, &PlaybackOptions::default(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.tracks.len(), 3);
    }
}
