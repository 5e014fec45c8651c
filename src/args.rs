use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser};
use regex::Regex;
use thiserror::Error;

use crate::{
    config::{ConfigArgs, LocateConfig},
    correlate::StrategyKind,
    errors::LocateError,
};

#[derive(Debug, Parser, Clone)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Arguments {
    #[clap(value_name = "FILE", required = true, help = "file(s) in which the clip is searched")]
    pub within: Vec<PathBuf>,

    #[clap(long, value_name = "FILE", help = "clip to be found in the file(s)")]
    pub clip: PathBuf,

    #[clap(long, value_enum, help = "correlation strategy to run")]
    pub strategy: Option<StrategyKind>,

    #[clap(long, help = "list every occurrence instead of only the best match")]
    pub all: bool,

    #[clap(
        short,
        long,
        help = "minimum prominence of scan peaks, between 0 and 1"
    )]
    pub prominence: Option<f32>,
    #[clap(
        long,
        value_name = "SECONDS",
        help = "minimum distance between matches in seconds"
    )]
    #[arg(value_parser = parse_duration)]
    pub distance: Option<Duration>,
    #[clap(
        long,
        value_name = "SECONDS",
        help = "length in seconds of chunks to be processed"
    )]
    #[arg(value_parser = parse_duration)]
    pub chunk_size: Option<Duration>,

    #[command(flatten)]
    pub config: ConfigArgs,
    #[command(flatten)]
    pub output_level: OutputLevel,
}

impl Arguments {
    /// stored config with the command line layered on top
    pub fn locate_config(&self) -> Result<LocateConfig, LocateError> {
        let mut config = self.config.try_load_config()?;
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(prominence) = self.prominence {
            config.prominence = prominence;
        }
        if let Some(distance) = self.distance {
            config.distance_s = distance.as_secs();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size_s = chunk_size.as_secs();
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
#[allow(clippy::struct_excessive_bools)]
pub struct OutputLevel {
    #[clap(short, long, help = "print maximum info")]
    debug: bool,
    #[clap(short, long, help = "print more info")]
    verbose: bool,
    #[clap(short, long, help = "print sligtly more info")]
    warn: bool,
    #[clap(short, long, help = "print almost no info")]
    silent: bool,
}

impl OutputLevel {
    pub fn init_logger(&self) {
        let level = log::Level::from(*self);
        let env = env_logger::Env::default().default_filter_or(level.as_str());

        let mut builder = env_logger::Builder::from_env(env);
        builder.format_timestamp(None);
        builder.format_target(false);
        builder.format_level(level < log::Level::Info);
        builder.init();
    }
}

impl From<OutputLevel> for log::Level {
    fn from(val: OutputLevel) -> Self {
        if val.silent {
            Self::Error
        } else if val.verbose {
            Self::Trace
        } else if val.debug {
            Self::Debug
        } else if val.warn {
            Self::Warn
        } else {
            Self::Info
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("couldn't find duration in {0:?}")]
pub struct NoMatch(String);
impl NoMatch {
    /// only used for doctest
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self(s.to_owned())
    }
}
/// parses a duration from `arg`, which can be just seconds, or somthing like `"3h5m17s"` or `"3hours6min1sec"`
/// # Example
/// ```
/// use std::time::Duration;
/// use audio_locator::args::{NoMatch, parse_duration};
///
/// assert_eq!(Ok(Duration::from_secs(17)), parse_duration("17"), "blank seconds");
/// assert_eq!(Ok(Duration::from_secs(58)), parse_duration("58sec"), "seconds with identifier");
/// assert_eq!(Ok(Duration::from_secs(60)), parse_duration("1m"), "minutes without seconds");
/// assert_eq!(Ok(Duration::from_millis(100)), parse_duration("100ms"), "milliseconds");
/// assert_eq!(Ok(Duration::from_secs(3661)), parse_duration("1hour1m1s"), "hours, minutes and seconds");
///
/// assert_eq!(Err(NoMatch::new("")), parse_duration(""), "fail the empty string");
/// assert_eq!(Err(NoMatch::new("3abc")), parse_duration("3abc"), "fail random letters");
/// assert_eq!(Err(NoMatch::new("3s5m")), parse_duration("3s5m"), "fail wrong order");
/// ```
pub fn parse_duration(arg: &str) -> Result<Duration, NoMatch> {
    lazy_static::lazy_static! {
        static ref RE: Regex = Regex::new("^(?:(?:(?P<hour>\\d+)h(?:ours?)?)?(?:(?P<min>\\d+)m(?:in)?)?(?:(?P<sec>\\d+)s(?:ec)?)?)(?:(?P<msec>\\d+)ms(?:ec)?)?$").unwrap();
    }
    if arg.is_empty() {
        // special case, so one seconds capture group is enough
        return Err(NoMatch(arg.to_owned()));
    }
    if let Ok(seconds) = arg.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    let captures = RE.captures(arg).ok_or_else(|| NoMatch(arg.to_owned()))?;
    let mut milliseconds = 0;
    if let Some(hours) = captures.name("hour") {
        milliseconds += hours
            .as_str()
            .parse::<u64>()
            .unwrap_or_else(|_| unreachable!());
    }
    milliseconds *= 60;
    if let Some(min) = captures.name("min") {
        milliseconds += min
            .as_str()
            .parse::<u64>()
            .unwrap_or_else(|_| unreachable!());
    }
    milliseconds *= 60;
    if let Some(sec) = captures.name("sec") {
        milliseconds += sec
            .as_str()
            .parse::<u64>()
            .unwrap_or_else(|_| unreachable!());
    }
    milliseconds *= 1000;
    if let Some(msec) = captures.name("msec") {
        milliseconds += msec
            .as_str()
            .parse::<u64>()
            .unwrap_or_else(|_| unreachable!());
    }
    Ok(Duration::from_millis(milliseconds))
}
