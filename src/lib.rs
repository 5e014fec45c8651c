#![warn(
    clippy::nursery,
    clippy::pedantic,
    clippy::empty_structs_with_brackets,
    clippy::format_push_string,
    clippy::if_then_some_else_none,
    clippy::impl_trait_in_params,
    clippy::missing_assert_message,
    clippy::multiple_inherent_impl,
    clippy::non_ascii_literal,
    clippy::self_named_module_files,
    clippy::semicolon_inside_block,
    clippy::separated_literal_suffix,
    clippy::str_to_string,
    clippy::string_to_string
)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod args;
pub mod config;
pub mod correlate;
pub mod decode;
pub mod errors;
pub mod matcher;
pub mod scan;
pub mod signal;

use log::{debug, info, log, trace, warn};

use correlate::MatchResult;
use decode::{Decode, FfmpegDecoder};
use errors::LocateError;
use scan::Occurrence;
use std::time::Duration;

#[inline]
pub const fn split_duration(duration: &Duration) -> (usize, usize, usize) {
    let elapsed = duration.as_secs() as usize;
    let seconds = elapsed % 60;
    let minutes = (elapsed / 60) % 60;
    let hours = elapsed / 3600;
    (hours, minutes, seconds)
}

fn as_duration(offset_samples: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(offset_samples as f64 / f64::from(sample_rate))
}

pub fn run(args: &args::Arguments) -> Result<(), LocateError> {
    debug!("{args:#?}");
    let config = args.locate_config()?;
    debug!("{config:#?}");

    trace!("collecting clip data");
    let decoder = FfmpegDecoder::new(config.sample_rate);
    let query = decoder.decode(&args.clip)?.normalize();
    if query.is_silent() {
        warn!("clip '{}' is silent, every score will be meaningless", args.clip.display());
    }
    trace!("preparing strategy");
    let strategy = config.strategy.build(config.nperseg, config.stride);
    let level = if args.within.len() == 1 {
        // log the per-file header only if more than one file is processed
        log::Level::Trace
    } else {
        log::Level::Info
    };

    for main_file in &args.within {
        log!(level, "preparing data of '{}'", main_file.display());
        let reference = decoder.decode(main_file)?.normalize();

        if args.all {
            trace!("scanning for occurrences");
            let occurrences = scan::find_occurrences(&reference, &query, &config.scan_config())?;
            print_occurrences(&occurrences, reference.sample_rate());
        } else {
            trace!("locating best match");
            let result = strategy.evaluate(&reference, &query)?;
            print_match(&result, reference.sample_rate());
        }
    }

    Ok(())
}

fn print_match(result: &MatchResult, sample_rate: u32) {
    let (hours, minutes, seconds) =
        split_duration(&as_duration(result.offset_samples, sample_rate));
    info!(
        "Offset {hours:0>2}:{minutes:0>2}:{seconds:0>2} with score {:.3}",
        result.score
    );
    if result.degenerate {
        warn!("a silent signal was involved, the score is unreliable");
    }
}

fn print_occurrences(occurrences: &[Occurrence], sample_rate: u32) {
    if occurrences.is_empty() {
        info!("no occurrences found");
    }
    for (i, occurrence) in occurrences.iter().enumerate() {
        let (hours, minutes, seconds) =
            split_duration(&as_duration(occurrence.offset_samples, sample_rate));
        info!(
            "Occurrence {}: {hours:0>2}:{minutes:0>2}:{seconds:0>2} with prominence {:.3}",
            i + 1,
            occurrence.prominence
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_duration_examples() {
        assert_eq!(split_duration(&Duration::from_secs(0)), (0, 0, 0));
        assert_eq!(split_duration(&Duration::from_secs(61)), (0, 1, 1));
        assert_eq!(split_duration(&Duration::from_secs(3 * 3600 + 5 * 60 + 9)), (3, 5, 9));
    }

    #[test]
    fn offset_to_duration_uses_the_sample_rate() {
        assert_eq!(as_duration(160_000, 16_000), Duration::from_secs(10));
        assert_eq!(as_duration(11_025, 22_050), Duration::from_millis(500));
    }
}
