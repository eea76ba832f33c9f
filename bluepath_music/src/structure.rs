// Phrase planning: high-level form for the melody.
//
// Before any melody note is placed, the timeline is cut into fixed-length
// phrases of `phrase_bars * 4` beats. The last phrase is truncated at the end
// of the piece. Phrase starts are reported as markers in the composition and
// are the boundaries over which motifs are captured, reused and cadenced.
//
// Consumed by melody.rs.

use serde::Serialize;

/// Beats in one 4/4 bar.
pub const BEATS_PER_BAR: f64 = 4.0;

/// One phrase of the melody, as a half-open beat range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    pub index: usize,
    pub start_beat: f64,
    pub end_beat: f64,
}

impl Phrase {
    pub fn len_beats(&self) -> f64 {
        self.end_beat - self.start_beat
    }

    pub fn contains(&self, beat: f64) -> bool {
        beat >= self.start_beat && beat < self.end_beat
    }
}

/// Partition `total_beats` into phrases of `phrase_bars` bars.
///
/// Returns an empty plan when either argument is zero.
pub fn plan_phrases(total_beats: f64, phrase_bars: u32) -> Vec<Phrase> {
    let phrase_beats = phrase_bars as f64 * BEATS_PER_BAR;
    if phrase_beats <= 0.0 || total_beats <= 0.0 {
        return Vec::new();
    }
    let count = (total_beats / phrase_beats).ceil() as usize;
    (0..count)
        .map(|index| {
            let start_beat = index as f64 * phrase_beats;
            Phrase {
                index,
                start_beat,
                end_beat: (start_beat + phrase_beats).min(total_beats),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_partition() {
        let phrases = plan_phrases(16.0, 2);
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].start_beat, 0.0);
        assert_eq!(phrases[0].end_beat, 8.0);
        assert_eq!(phrases[1].start_beat, 8.0);
        assert_eq!(phrases[1].end_beat, 16.0);
    }

    #[test]
    fn test_last_phrase_truncated() {
        let phrases = plan_phrases(12.0, 2);
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[1].len_beats(), 4.0);
        assert!(phrases[1].contains(11.75));
        assert!(!phrases[1].contains(12.0));
    }

    #[test]
    fn test_phrases_tile_the_piece() {
        for bars in 1..10u32 {
            let total = bars as f64 * BEATS_PER_BAR;
            for phrase_bars in 1..5 {
                let phrases = plan_phrases(total, phrase_bars);
                assert_eq!(phrases[0].start_beat, 0.0);
                assert_eq!(phrases.last().map(|p| p.end_beat), Some(total));
                for pair in phrases.windows(2) {
                    assert_eq!(pair[0].end_beat, pair[1].start_beat);
                }
            }
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(plan_phrases(0.0, 2).is_empty());
        assert!(plan_phrases(8.0, 0).is_empty());
    }
}
