use itertools::Itertools;

use super::{
    fft::{FftCorrelator, Mode},
    CorrelateStrategy, MatchResult,
};
use crate::{
    errors::LocateError,
    signal::{SampleType, Signal},
};

/// denominators below this flag the result as degenerate
const NORM_FLOOR: f64 = 1e-6;

/// valid-mode cross-correlation on raw samples, scored like a cosine
/// similarity against the overlapped reference window
pub struct TimeDomain {
    correlator: FftCorrelator,
}

impl TimeDomain {
    pub fn new() -> Self {
        Self {
            correlator: FftCorrelator::new(),
        }
    }
}
impl Default for TimeDomain {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelateStrategy for TimeDomain {
    fn evaluate(&self, reference: &Signal, query: &Signal) -> Result<MatchResult, LocateError> {
        let alignment = correlate_sequences(&self.correlator, reference.samples(), query.samples())?;
        Ok(alignment.into())
    }
}

pub(crate) struct Alignment {
    pub best: usize,
    pub score: SampleType,
    pub curve: Vec<SampleType>,
    pub degenerate: bool,
}
impl From<Alignment> for MatchResult {
    fn from(alignment: Alignment) -> Self {
        Self {
            offset_samples: alignment.best,
            score: alignment.score,
            curve: Some(alignment.curve),
            degenerate: alignment.degenerate,
        }
    }
}

/// correlates two sample sequences in valid mode, rearranging so the longer
/// one is searched. Each offset is normalized by
/// `sqrt(energy(window) * energy(shorter))`, which bounds the curve to
/// [-1, 1] and makes a perfect amplitude-matched overlap score 1.0.
pub(crate) fn correlate_sequences(
    correlator: &FftCorrelator,
    a: &[SampleType],
    b: &[SampleType],
) -> Result<Alignment, LocateError> {
    let (longer, shorter) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let correlation = correlator.correlate(longer, shorter, Mode::Valid)?;

    let shorter_energy: f64 = shorter.iter().map(|s| f64::from(*s) * f64::from(*s)).sum();
    // running window energies from one prefix-sum pass
    let mut prefix = Vec::with_capacity(longer.len() + 1);
    prefix.push(0.0f64);
    for s in longer {
        prefix.push(prefix.last().copied().unwrap_or_default() + f64::from(*s) * f64::from(*s));
    }
    let window_energy = |k: usize| prefix[k + shorter.len()] - prefix[k];

    let curve = correlation
        .iter()
        .enumerate()
        .map(|(k, c)| {
            let norm = (window_energy(k) * shorter_energy).sqrt();
            if norm < NORM_FLOOR {
                0.0
            } else {
                (f64::from(*c) / norm) as SampleType
            }
        })
        .collect_vec();

    let best = curve
        .iter()
        .position_max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0);
    let degenerate = (window_energy(best) * shorter_energy).sqrt() < NORM_FLOOR;
    Ok(Alignment {
        best,
        score: curve[best],
        curve,
        degenerate,
    })
}
