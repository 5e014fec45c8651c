use ndarray::{s, Array2};
use rayon::prelude::*;
use realfft::RealFftPlanner;

use super::{time_domain::Alignment, CorrelateStrategy, MatchResult};
use crate::{
    errors::LocateError,
    signal::{SampleType, Signal},
};

const NORM_FLOOR: f64 = 1e-6;

/// correlates short-time spectral magnitudes instead of raw samples. Less
/// precise than [`super::time_domain::TimeDomain`] (offsets quantize to one
/// hop), more robust to noise and lossy re-encoding.
pub struct Stft {
    nperseg: usize,
    stride: usize,
}

impl Stft {
    pub const DEFAULT_NPERSEG: usize = 512;
    pub const DEFAULT_STRIDE: usize = 64;

    pub fn new(nperseg: usize, stride: usize) -> Self {
        let nperseg = nperseg.max(2);
        Self {
            nperseg,
            // hop larger than the window would skip samples entirely
            stride: stride.clamp(1, nperseg),
        }
    }
}
impl Default for Stft {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NPERSEG, Self::DEFAULT_STRIDE)
    }
}

impl CorrelateStrategy for Stft {
    fn evaluate(&self, reference: &Signal, query: &Signal) -> Result<MatchResult, LocateError> {
        let reference = reference.clone().normalize();
        let query = query.clone().normalize();
        let z_reference = spectrogram(reference.samples(), self.nperseg, self.stride)?;
        let z_query = spectrogram(query.samples(), self.nperseg, self.stride)?;

        let alignment = correlate_frames(&z_reference, &z_query);
        Ok(MatchResult {
            offset_samples: alignment.best * self.stride,
            score: alignment.score,
            curve: Some(alignment.curve),
            degenerate: alignment.degenerate,
        })
    }
}

fn hann_window(n: usize) -> Vec<SampleType> {
    (0..n)
        .map(|i| {
            let t = (std::f32::consts::PI * i as SampleType) / n as SampleType;
            t.sin() * t.sin()
        })
        .collect()
}

/// magnitude frames, time rows by frequency columns. Input shorter than one
/// window is zero-padded to a single frame.
pub(crate) fn spectrogram(
    samples: &[SampleType],
    nperseg: usize,
    stride: usize,
) -> Result<Array2<SampleType>, LocateError> {
    let padded;
    let samples = if samples.len() < nperseg {
        padded = [samples, &vec![0.0; nperseg - samples.len()]].concat();
        &padded
    } else {
        samples
    };
    let frames = (samples.len() - nperseg) / stride + 1;
    let bins = nperseg / 2 + 1;
    let window = hann_window(nperseg);
    let r2c = RealFftPlanner::<SampleType>::new().plan_fft_forward(nperseg);

    let rows = (0..frames)
        .into_par_iter()
        .map(|frame| {
            let start = frame * stride;
            let mut input: Vec<SampleType> = samples[start..start + nperseg]
                .iter()
                .zip(&window)
                .map(|(s, w)| s * w)
                .collect();
            let mut spectrum = r2c.make_output_vec();
            r2c.process(&mut input, &mut spectrum)?;
            Ok(spectrum.iter().map(|c| c.norm()).collect::<Vec<_>>())
        })
        .collect::<Result<Vec<_>, realfft::FftError>>()?;

    Ok(Array2::from_shape_vec((frames, bins), rows.concat())
        .expect("every frame yields one row of bins"))
}

/// valid-mode 2-D correlation over frame offsets, summed across the
/// frequency axis, with the same energy normalization as the time-domain
/// strategy
fn correlate_frames(a: &Array2<SampleType>, b: &Array2<SampleType>) -> Alignment {
    let (longer, shorter) = if a.nrows() >= b.nrows() { (a, b) } else { (b, a) };
    let m = shorter.nrows();
    let offsets = longer.nrows() - m + 1;

    let shorter_energy: f64 = shorter.iter().map(|v| f64::from(*v) * f64::from(*v)).sum();
    let mut prefix = Vec::with_capacity(longer.nrows() + 1);
    prefix.push(0.0f64);
    for row in longer.rows() {
        let row_energy: f64 = row.iter().map(|v| f64::from(*v) * f64::from(*v)).sum();
        prefix.push(prefix.last().copied().unwrap_or_default() + row_energy);
    }

    let curve: Vec<SampleType> = (0..offsets)
        .into_par_iter()
        .map(|k| {
            let window = longer.slice(s![k..k + m, ..]);
            let correlation: f64 = window
                .iter()
                .zip(shorter.iter())
                .map(|(x, y)| f64::from(*x) * f64::from(*y))
                .sum();
            let norm = ((prefix[k + m] - prefix[k]) * shorter_energy).sqrt();
            if norm < NORM_FLOOR {
                0.0
            } else {
                (correlation / norm) as SampleType
            }
        })
        .collect();

    let best = curve
        .iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal))
        .map_or(0, |(i, _)| i);
    let degenerate = ((prefix[best + m] - prefix[best]) * shorter_energy).sqrt() < NORM_FLOOR;
    Alignment {
        best,
        score: curve[best],
        curve,
        degenerate,
    }
}
