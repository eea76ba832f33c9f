// Rule-based progression generation.
//
// A random walk over a fixed transition graph of scale degrees. Each degree
// has a short allow-list of legal successors; the walk starts in the tonic
// family (I, iii, vi) and the final step is bent into a cadence:
// - after a dominant-functioning degree (V or vii): resolve to I, or to vi
//   when a deceptive cadence is requested;
// - otherwise: land on I or vi.
//
// The output is a bare sequence of degrees. slots.rs stretches it onto the
// bar grid and chord.rs turns each degree into a chord.

use crate::mode::ScaleDegree;
use bluepath_prng::SeededRng;

use ScaleDegree::{I, II, III, IV, V, VI, VII};

const TONIC_STARTS: [ScaleDegree; 3] = [I, III, VI];
const CADENCE_TARGETS: [ScaleDegree; 2] = [I, VI];

/// Legal successors of each degree.
pub fn successors(degree: ScaleDegree) -> &'static [ScaleDegree] {
    match degree {
        I => &[IV, V, VI, II, III],
        II => &[V, VII, IV],
        III => &[VI, IV, II],
        IV => &[V, VII, II, VI, I],
        V => &[I, VI, IV],
        VI => &[II, IV, V],
        VII => &[I, VI, V],
    }
}

/// Generate `length` degrees by walking the transition graph.
pub fn generate_numerals(
    length: usize,
    deceptive_cadence: bool,
    rng: &mut SeededRng,
) -> Vec<ScaleDegree> {
    let mut out = Vec::with_capacity(length);
    if length == 0 {
        return out;
    }

    let mut current = *rng.choose(&TONIC_STARTS).unwrap_or(&I);
    out.push(current);

    while out.len() < length {
        let possible = successors(current);
        let mut next = *rng.choose(possible).unwrap_or(&I);
        if next == current {
            let others: Vec<ScaleDegree> =
                possible.iter().copied().filter(|&d| d != current).collect();
            if let Some(&other) = rng.choose(&others) {
                next = other;
            }
        }

        if out.len() == length - 1 {
            next = if current.is_dominant() {
                if deceptive_cadence { VI } else { I }
            } else if CADENCE_TARGETS.contains(&next) {
                next
            } else {
                *rng.choose(&CADENCE_TARGETS).unwrap_or(&I)
            };
        }

        current = next;
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_start() {
        let mut rng = SeededRng::new(1);
        for length in 1..12 {
            let seq = generate_numerals(length, false, &mut rng);
            assert_eq!(seq.len(), length);
            assert!(TONIC_STARTS.contains(&seq[0]));
        }
        assert!(generate_numerals(0, false, &mut rng).is_empty());
    }

    #[test]
    fn test_walk_follows_graph() {
        let mut rng = SeededRng::new(2);
        for _ in 0..200 {
            let seq = generate_numerals(8, false, &mut rng);
            // All but the forced final step follow the allow-lists.
            for pair in seq[..seq.len() - 1].windows(2) {
                assert!(
                    successors(pair[0]).contains(&pair[1]),
                    "{} -> {} is not a legal step",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn test_final_step_cadences() {
        let mut rng = SeededRng::new(3);
        for _ in 0..500 {
            let seq = generate_numerals(5, false, &mut rng);
            let (penult, last) = (seq[3], seq[4]);
            if penult.is_dominant() {
                assert_eq!(last, I);
            } else {
                assert!(CADENCE_TARGETS.contains(&last));
            }
        }
    }

    #[test]
    fn test_deceptive_cadence_lands_on_vi() {
        let mut rng = SeededRng::new(4);
        let mut saw_dominant = false;
        for _ in 0..500 {
            let seq = generate_numerals(4, true, &mut rng);
            if seq[2].is_dominant() {
                saw_dominant = true;
                assert_eq!(seq[3], VI);
            }
        }
        assert!(saw_dominant, "expected at least one dominant penultimate chord");
    }

    #[test]
    fn test_two_chord_progression_ends_on_i_or_vi() {
        for seed in 0..100 {
            let mut rng = SeededRng::new(seed);
            let seq = generate_numerals(2, false, &mut rng);
            assert!(CADENCE_TARGETS.contains(&seq[1]));
        }
    }
}
