use std::{path::PathBuf, time::Duration};

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{
    correlate::StrategyKind,
    errors::LocateError,
    scan::ScanConfig,
    signal::SampleType,
};

pub const APP_NAME: &str = "audio-locator";

/// persisted engine settings, every field overridable from the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateConfig {
    pub strategy: StrategyKind,
    /// target rate the decoder resamples everything to
    pub sample_rate: u32,
    /// analysis window of the spectral strategies
    pub nperseg: usize,
    /// hop between analysis windows
    pub stride: usize,
    /// minimum peak prominence for occurrence scans, 0..1
    pub prominence: SampleType,
    /// minimum seconds between scan matches
    pub distance_s: u64,
    /// seconds of reference per scan chunk
    pub chunk_size_s: u64,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            sample_rate: 22_050,
            nperseg: 512,
            stride: 64,
            prominence: 0.15,
            distance_s: 8 * 60,
            chunk_size_s: 60,
        }
    }
}

impl LocateConfig {
    pub const fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            chunk_size: Duration::from_secs(self.chunk_size_s),
            distance: Duration::from_secs(self.distance_s),
            prominence: self.prominence,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    #[clap(long, short, value_name = "FILE", help = "use this config file")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn try_load_config(&self) -> Result<LocateConfig, LocateError> {
        Ok(self.config.as_ref().map_or_else(
            || confy::load(APP_NAME, Some("locate")),
            |config_path| confy::load_path(config_path),
        )?)
    }
}
