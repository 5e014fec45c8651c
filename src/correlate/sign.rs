use super::{
    fft::FftCorrelator,
    time_domain::correlate_sequences,
    CorrelateStrategy, MatchResult,
};
use crate::{errors::LocateError, signal::Signal};

/// time-domain correlation on sign-reduced samples. Amplitude is discarded,
/// so heavy compression, clipping or limiting in the recording chain stops
/// mattering as long as zero-crossings survive.
pub struct SignReduced {
    correlator: FftCorrelator,
}

impl SignReduced {
    pub fn new() -> Self {
        Self {
            correlator: FftCorrelator::new(),
        }
    }
}
impl Default for SignReduced {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelateStrategy for SignReduced {
    fn evaluate(&self, reference: &Signal, query: &Signal) -> Result<MatchResult, LocateError> {
        let reference = reference.sign_reduced();
        let query = query.sign_reduced();
        let alignment =
            correlate_sequences(&self.correlator, reference.samples(), query.samples())?;
        Ok(alignment.into())
    }
}
