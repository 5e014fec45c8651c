use ndarray::Array2;

use super::{
    fft::FftCorrelator,
    stft::spectrogram,
    time_domain::correlate_sequences,
    CorrelateStrategy, MatchResult,
};
use crate::{
    errors::LocateError,
    signal::{SampleType, Signal},
};

const CENTROID_FLOOR: f64 = 1e-6;

/// reduces each signal to one spectral-centroid value per analysis frame and
/// correlates the two fingerprint sequences. Alignment coarsens to roughly
/// one hop of granularity, the correlation shrinks by the same factor.
pub struct Fingerprint {
    nperseg: usize,
    stride: usize,
    correlator: FftCorrelator,
}

impl Fingerprint {
    pub fn new(nperseg: usize, stride: usize) -> Self {
        let nperseg = nperseg.max(2);
        Self {
            nperseg,
            stride: stride.clamp(1, nperseg),
            correlator: FftCorrelator::new(),
        }
    }

    fn fingerprint(&self, signal: &Signal) -> Result<Signal, LocateError> {
        let frames = spectrogram(signal.samples(), self.nperseg, self.stride)?;
        let frame_rate = (signal.sample_rate() / self.stride as u32).max(1);
        Ok(Signal::new(spectral_centroids(&frames), frame_rate).normalize())
    }
}

impl CorrelateStrategy for Fingerprint {
    fn evaluate(&self, reference: &Signal, query: &Signal) -> Result<MatchResult, LocateError> {
        let fp_reference = self.fingerprint(reference)?;
        let fp_query = self.fingerprint(query)?;

        let alignment =
            correlate_sequences(&self.correlator, fp_reference.samples(), fp_query.samples())?;
        // frame offset back into sample units of the searched signal
        let longer_len = reference.len().max(query.len());
        let ratio = longer_len as f64 / fp_reference.len().max(fp_query.len()) as f64;
        Ok(MatchResult {
            offset_samples: (alignment.best as f64 * ratio).round() as usize,
            score: alignment.score,
            curve: Some(alignment.curve),
            degenerate: alignment.degenerate,
        })
    }
}

/// energy-weighted mean bin index per frame, 0.0 for silent frames
fn spectral_centroids(frames: &Array2<SampleType>) -> Vec<SampleType> {
    frames
        .rows()
        .into_iter()
        .map(|row| {
            let mut energy = 0.0f64;
            let mut weighted = 0.0f64;
            for (bin, magnitude) in row.iter().enumerate() {
                let power = f64::from(*magnitude) * f64::from(*magnitude);
                energy += power;
                weighted += bin as f64 * power;
            }
            (weighted / energy.max(CENTROID_FLOOR)) as SampleType
        })
        .collect()
}
