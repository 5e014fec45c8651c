use std::sync::{Arc, Mutex};

use realfft::{num_complex::Complex, ComplexToReal, FftError, RealFftPlanner, RealToComplex};

use crate::signal::SampleType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Full,
    Same,
    Valid,
}

/// FFT-based cross-correlation. The planner cache is behind a mutex so one
/// correlator can serve parallel chunk workers.
pub struct FftCorrelator {
    planner: Mutex<RealFftPlanner<SampleType>>,
}

struct R2C2R(
    Arc<dyn RealToComplex<SampleType>>,
    Arc<dyn ComplexToReal<SampleType>>,
);
impl R2C2R {
    fn new(planner: &mut RealFftPlanner<SampleType>, len: usize) -> Self {
        Self(planner.plan_fft_forward(len), planner.plan_fft_inverse(len))
    }
    fn fft(&self, data: &mut [SampleType]) -> Result<Vec<Complex<SampleType>>, FftError> {
        let mut spectrum = self.0.make_output_vec();
        self.0.process(data, &mut spectrum)?;
        Ok(spectrum)
    }
    fn ifft(&self, spectrum: &mut [Complex<SampleType>]) -> Result<Vec<SampleType>, FftError> {
        let mut out = self.1.make_output_vec();
        self.1.process(spectrum, &mut out)?;
        Ok(out)
    }
}

impl FftCorrelator {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(RealFftPlanner::new()),
        }
    }

    /// cross-correlates `within` with `sample` at every overlap allowed by
    /// `mode`. The lag-zero term sits at index 0 of the `Valid` result.
    pub fn correlate(
        &self,
        within: &[SampleType],
        sample: &[SampleType],
        mode: Mode,
    ) -> Result<Vec<SampleType>, FftError> {
        let pad_len = within.len() + sample.len() - 1;
        // front-padding `within` lines the full correlation up with lags
        // -(m-1)..n, which `centered` then slices per mode
        let mut within_and_zeros = zero_pad(within, pad_len, true);
        let mut sample_and_zeros = zero_pad(sample, pad_len, false);

        let r2c2r = R2C2R::new(&mut self.planner.lock().unwrap(), pad_len);
        let mut spectrum = r2c2r.fft(&mut within_and_zeros)?;
        let spectrum_sample = r2c2r.fft(&mut sample_and_zeros)?;
        for (a, b) in spectrum.iter_mut().zip(&spectrum_sample) {
            *a *= b.conj();
        }
        let mut out = r2c2r.ifft(&mut spectrum)?;

        let scale = 1.0 / out.len() as SampleType;
        for value in &mut out {
            *value *= scale;
        }
        Ok(match mode {
            Mode::Full => out,
            Mode::Same => centered(&out, within.len()).to_vec(),
            Mode::Valid => {
                centered(&out, within.len().saturating_sub(sample.len()) + 1).to_vec()
            }
        })
    }
}
impl Default for FftCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

/// returns a slice with a length `len` centered in the middle of `arr`
fn centered(arr: &[SampleType], len: usize) -> &[SampleType] {
    let start = (arr.len() - len) / 2;
    &arr[start..start + len]
}

fn zero_pad(data: &[SampleType], len: usize, front: bool) -> Vec<SampleType> {
    let zeros = vec![0.0; len - data.len()];
    if front { [&zeros, data] } else { [data, &zeros] }.concat()
}
