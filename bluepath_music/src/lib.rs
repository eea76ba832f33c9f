// Bluepath Music Generator
//
// A procedural composition engine that produces a diatonic chord progression
// with smooth voice leading, paired with a phrase-structured melody that
// captures a motif and reuses it transposed. Harmony comes from a random walk
// over a degree transition graph with forced cadences; the melody comes from
// rhythm-weighted duration draws and chord-tone-aware pitch choice.
//
// Architecture:
// - error.rs: `ComposeError` and the crate `ComposeResult` alias
// - pitch.rs: Pitch classes, pitch names <-> MIDI, letter-resolved spelling
// - mode.rs: Major/minor scales, scale degrees, spelled scales, pitch pools
// - diatonic.rs: Per-degree quality/function table, chord-type recipes and
//   probabilistic chord-type selection
// - progression.rs: Degree transition graph walk with cadence forcing
// - slots.rs: Loop/stretch/default projection of numerals onto chord slots
// - chord.rs: Degree -> `ChordSpec` (unvoiced stack, roman label, spelling)
// - voicing.rs: Greedy nine-candidate voice-leading optimizer
// - rhythm.rs: Rhythm-style duration weights and duration draws
// - structure.rs: Phrase planning over the beat timeline
// - melody.rs: Phrase loop, motif capture/reuse, cadence shaping, octave shift
// - config.rs: `ComposeConfig`, loaded from JSON
// - composition.rs: End-to-end pipeline producing the `Composition` record
// - midi.rs: Standard MIDI File rendering of a finished composition
//
// The generator is deterministic given a seed: every stochastic function takes
// an explicit `SeededRng`, and no state outlives a single `compose` call.

pub mod chord;
pub mod composition;
pub mod config;
pub mod diatonic;
pub mod error;
pub mod melody;
pub mod midi;
pub mod mode;
pub mod pitch;
pub mod progression;
pub mod rhythm;
pub mod slots;
pub mod structure;
pub mod voicing;
