// Mapping a generated progression onto the bar grid.
//
// The progression generator produces `progressionLength` degrees, but the
// piece needs `bars * chordsPerBar` chord slots. The mapping policy decides
// how the short sequence fills them:
// - Loop: repeat the sequence cyclically.
// - Stretch: nearest-neighbour resample by proportional position.
// - Default: pad with the final degree when short; when long, keep the
//   first and last degrees and resample the interior.

use crate::mode::ScaleDegree;
use serde::{Deserialize, Serialize};

/// How a numeral sequence is projected onto chord slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotPolicy {
    Loop,
    Stretch,
    #[default]
    Default,
}

/// Project `seq` onto `slots` chord slots.
pub fn map_to_slots(seq: &[ScaleDegree], slots: usize, policy: SlotPolicy) -> Vec<ScaleDegree> {
    let len = seq.len();
    if slots == 0 {
        return Vec::new();
    }
    if len == 0 {
        return vec![ScaleDegree::I; slots];
    }
    let last = seq[len - 1];

    match policy {
        SlotPolicy::Loop => (0..slots).map(|i| seq[i % len]).collect(),
        SlotPolicy::Stretch => {
            if slots == 1 {
                return vec![seq[0]];
            }
            (0..slots)
                .map(|i| {
                    let t = i as f64 / (slots - 1) as f64;
                    let idx = (t * (len - 1) as f64).round() as usize;
                    seq[idx.min(len - 1)]
                })
                .collect()
        }
        SlotPolicy::Default => {
            if len == slots {
                return seq.to_vec();
            }
            if len < slots {
                let mut out = seq.to_vec();
                out.resize(slots, last);
                return out;
            }
            if slots == 1 {
                return vec![last];
            }

            let inner_slots = slots - 2;
            let inner_len = len - 2;
            let mut out = Vec::with_capacity(slots);
            out.push(seq[0]);
            for s in 1..=inner_slots {
                let t = s as f64 / (inner_slots + 1) as f64;
                let idx = 1 + (t * inner_len as f64).floor() as usize;
                out.push(seq[idx.clamp(1, len - 2)]);
            }
            out.push(last);
            out
        }
    }
}
