pub mod fft;
pub mod fingerprint;
pub mod sign;
pub mod stft;
pub mod time_domain;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    errors::LocateError,
    signal::{SampleType, Signal},
};

/// outcome of one strategy evaluation. `score` is in the strategy's own
/// units and is only comparable within that strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// index into the reference at which the query's first sample aligns.
    /// `offset_samples + query.len()` may exceed the reference length near
    /// the tail, consumers clamp when slicing
    pub offset_samples: usize,
    pub score: SampleType,
    /// energy-normalized correlation over all evaluated offsets, kept for
    /// inspection
    pub curve: Option<Vec<SampleType>>,
    /// set when a silent operand forced the epsilon guard, the score is then
    /// meaningless
    pub degenerate: bool,
}

/// one interchangeable correlation algorithm
pub trait CorrelateStrategy: Send + Sync {
    fn evaluate(&self, reference: &Signal, query: &Signal) -> Result<MatchResult, LocateError>;
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// raw-sample cross-correlation, highest resolution
    #[default]
    TimeDomain,
    /// short-time spectral magnitude correlation, robust to re-encoding
    Stft,
    /// sign-reduced correlation, robust to clipping and limiting
    Sign,
    /// spectral-centroid fingerprints, cheap on very long references
    Fingerprint,
}

impl StrategyKind {
    pub fn build(self, nperseg: usize, stride: usize) -> Box<dyn CorrelateStrategy> {
        match self {
            Self::TimeDomain => Box::new(time_domain::TimeDomain::new()),
            Self::Stft => Box::new(stft::Stft::new(nperseg, stride)),
            Self::Sign => Box::new(sign::SignReduced::new()),
            Self::Fingerprint => Box::new(fingerprint::Fingerprint::new(nperseg, stride)),
        }
    }
}
