// Duration weighting for melody notes.
//
// A rhythm style is a table of relative weights over six note lengths
// (sixteenth through dotted half, in beats). Each draw filters the table to
// lengths that fit the phrase and the density cap, biases long notes toward
// downbeats and short notes toward offbeats, discourages two long notes in a
// row, then makes a weighted draw and snaps it onto the quarter-beat grid.

use bluepath_prng::SeededRng;

/// Smallest melody step, in beats.
pub const MELODY_STEP: f64 = 0.25;

/// Candidate note lengths, in beats.
pub const DURATIONS: [f64; 6] = [0.25, 0.5, 1.0, 1.5, 2.0, 3.0];

/// Named duration-weight presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhythmStyle {
    Pop,
    Ballad,
    Syncopated,
    Sparse,
    Latin,
    Jazz,
    Minimalist,
    Flowing,
    Dramatic,
    Funky,
}

impl RhythmStyle {
    pub const ALL: [RhythmStyle; 10] = [
        RhythmStyle::Pop,
        RhythmStyle::Ballad,
        RhythmStyle::Syncopated,
        RhythmStyle::Sparse,
        RhythmStyle::Latin,
        RhythmStyle::Jazz,
        RhythmStyle::Minimalist,
        RhythmStyle::Flowing,
        RhythmStyle::Dramatic,
        RhythmStyle::Funky,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RhythmStyle::Pop => "pop",
            RhythmStyle::Ballad => "ballad",
            RhythmStyle::Syncopated => "syncopated",
            RhythmStyle::Sparse => "sparse",
            RhythmStyle::Latin => "latin",
            RhythmStyle::Jazz => "jazz",
            RhythmStyle::Minimalist => "minimalist",
            RhythmStyle::Flowing => "flowing",
            RhythmStyle::Dramatic => "dramatic",
            RhythmStyle::Funky => "funky",
        }
    }

    pub fn from_name(name: &str) -> Option<RhythmStyle> {
        RhythmStyle::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Resolve a style name, falling back to pop for unknown names.
    pub fn resolve(name: &str) -> RhythmStyle {
        RhythmStyle::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown rhythm style {name:?}, using pop");
            RhythmStyle::Pop
        })
    }

    /// Weights aligned with `DURATIONS`.
    pub fn weights(self) -> [f64; 6] {
        match self {
            RhythmStyle::Pop => [0.6, 3.0, 2.5, 0.8, 0.4, 0.1],
            RhythmStyle::Ballad => [0.2, 1.0, 2.5, 1.8, 2.0, 1.0],
            RhythmStyle::Syncopated => [1.0, 2.5, 1.5, 2.5, 0.6, 0.2],
            RhythmStyle::Sparse => [0.1, 0.8, 2.0, 1.5, 2.5, 1.5],
            RhythmStyle::Latin => [0.4, 3.5, 1.2, 1.8, 0.3, 0.1],
            RhythmStyle::Jazz => [1.5, 2.0, 2.2, 2.5, 1.0, 0.5],
            RhythmStyle::Minimalist => [0.1, 0.3, 4.0, 0.2, 1.5, 0.1],
            RhythmStyle::Flowing => [2.5, 3.0, 0.8, 0.2, 0.1, 0.05],
            RhythmStyle::Dramatic => [1.5, 0.5, 0.8, 0.3, 3.0, 2.5],
            RhythmStyle::Funky => [2.5, 2.8, 1.5, 0.4, 0.2, 0.1],
        }
    }
}

/// Round to the nearest quarter beat.
pub fn snap_beats(beats: f64) -> f64 {
    (beats / MELODY_STEP).round() * MELODY_STEP
}

/// Clamp into `[MELODY_STEP, remaining]` and snap to the grid.
pub fn clamp_snap_duration(duration: f64, remaining: f64) -> f64 {
    snap_beats(duration.min(remaining).max(MELODY_STEP))
}

/// Longest allowed note for a density percentage.
fn density_cap(density_percent: f64) -> f64 {
    if density_percent > 70.0 {
        1.0
    } else if density_percent > 50.0 {
        1.5
    } else {
        3.0
    }
}

/// Inputs for one duration draw.
#[derive(Debug, Clone, Copy)]
pub struct DurationContext {
    /// Beats left before the phrase ends.
    pub remaining: f64,
    /// Position within the 4-beat bar.
    pub beat_in_bar: f64,
    /// Duration of the previous pitched note, if any.
    pub last_duration: Option<f64>,
    /// Melody density, 0-100.
    pub density_percent: f64,
}

/// Draw a raw duration (before grid clamping) from a weight table.
pub fn pick_duration(weights: &[f64; 6], ctx: &DurationContext, rng: &mut SeededRng) -> f64 {
    let fitting: Vec<(f64, f64)> = DURATIONS
        .iter()
        .zip(weights)
        .filter(|&(&d, &w)| d <= ctx.remaining + 1e-9 && w > 0.0)
        .map(|(&d, &w)| (d, w))
        .collect();
    if fitting.is_empty() {
        return ctx.remaining.max(MELODY_STEP);
    }

    let cap = density_cap(ctx.density_percent);
    let mut candidates: Vec<(f64, f64)> = fitting.into_iter().filter(|&(d, _)| d <= cap).collect();
    if candidates.is_empty() {
        return cap.min(ctx.remaining).max(MELODY_STEP);
    }

    let on_downbeat = ctx.beat_in_bar % 2.0 < 0.1;
    for (d, w) in candidates.iter_mut() {
        if *d >= 2.0 {
            *w *= if on_downbeat { 3.0 } else { 0.2 };
        }
        if *d <= 0.5 && !on_downbeat {
            *w *= 1.5;
        }
    }

    // Breather: after a long note, favour short ones.
    if ctx.last_duration.is_some_and(|last| last >= 2.0) {
        for (d, w) in candidates.iter_mut() {
            *w *= if *d <= 1.0 { 2.0 } else { 0.3 };
        }
    }

    let weights: Vec<f64> = candidates.iter().map(|&(_, w)| w).collect();
    let index = rng.weighted_index(&weights).unwrap_or(candidates.len() - 1);
    candidates[index].0
}

/// Draw a duration and fit it to the grid and the phrase.
pub fn draw_duration(weights: &[f64; 6], ctx: &DurationContext, rng: &mut SeededRng) -> f64 {
    clamp_snap_duration(pick_duration(weights, ctx, rng), ctx.remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(remaining: f64, beat_in_bar: f64, last: Option<f64>, density: f64) -> DurationContext {
        DurationContext {
            remaining,
            beat_in_bar,
            last_duration: last,
            density_percent: density,
        }
    }

    #[test]
    fn test_style_names_roundtrip() {
        for style in RhythmStyle::ALL {
            assert_eq!(RhythmStyle::from_name(style.name()), Some(style));
        }
        assert_eq!(RhythmStyle::resolve("polka"), RhythmStyle::Pop);
    }

    #[test]
    fn test_snap_and_clamp() {
        assert_eq!(snap_beats(0.6), 0.5);
        assert_eq!(snap_beats(0.9), 1.0);
        assert_eq!(clamp_snap_duration(3.0, 1.25), 1.25);
        assert_eq!(clamp_snap_duration(0.1, 4.0), 0.25);
    }

    #[test]
    fn test_durations_fit_remaining() {
        let mut rng = SeededRng::new(1);
        for style in RhythmStyle::ALL {
            for _ in 0..200 {
                let d = draw_duration(&style.weights(), &ctx(0.75, 1.0, None, 40.0), &mut rng);
                assert!((0.25..=0.75).contains(&d), "{} drew {d}", style.name());
            }
        }
    }

    #[test]
    fn test_density_caps_length() {
        let mut rng = SeededRng::new(2);
        for _ in 0..500 {
            let d = draw_duration(&RhythmStyle::Dramatic.weights(), &ctx(8.0, 0.0, None, 80.0), &mut rng);
            assert!(d <= 1.0, "dense melody drew {d}");
            let d = draw_duration(&RhythmStyle::Dramatic.weights(), &ctx(8.0, 0.0, None, 60.0), &mut rng);
            assert!(d <= 1.5, "medium melody drew {d}");
        }
    }

    #[test]
    fn test_long_notes_prefer_downbeats() {
        let mut rng = SeededRng::new(3);
        let weights = RhythmStyle::Sparse.weights();
        let n = 4000;
        let long_on = (0..n)
            .filter(|_| pick_duration(&weights, &ctx(8.0, 0.0, None, 0.0), &mut rng) >= 2.0)
            .count();
        let long_off = (0..n)
            .filter(|_| pick_duration(&weights, &ctx(8.0, 1.0, None, 0.0), &mut rng) >= 2.0)
            .count();
        assert!(long_on > long_off * 3, "on={long_on} off={long_off}");
    }

    #[test]
    fn test_breather_after_long_note() {
        let mut rng = SeededRng::new(4);
        let weights = RhythmStyle::Ballad.weights();
        let n = 4000;
        let fresh = (0..n)
            .filter(|_| pick_duration(&weights, &ctx(8.0, 0.0, None, 0.0), &mut rng) <= 1.0)
            .count();
        let after_long = (0..n)
            .filter(|_| pick_duration(&weights, &ctx(8.0, 0.0, Some(3.0), 0.0), &mut rng) <= 1.0)
            .count();
        assert!(after_long > fresh, "fresh={fresh} after_long={after_long}");
    }
}
