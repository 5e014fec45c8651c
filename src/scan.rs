use std::time::Duration;

use itertools::Itertools;
use log::debug;
use rayon::prelude::*;

use crate::{
    correlate::{fft::FftCorrelator, time_domain::correlate_sequences},
    errors::LocateError,
    signal::{SampleType, Signal},
};

#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// reference is processed in windows of this length plus one query of
    /// overlap
    pub chunk_size: Duration,
    /// matches closer than this collapse onto the more prominent one
    pub distance: Duration,
    /// minimum prominence on the energy-normalized curve, 0..1
    pub prominence: SampleType,
}
impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: Duration::from_secs(60),
            distance: Duration::from_secs(8 * 60),
            prominence: 0.15,
        }
    }
}

/// one place the query was found in the reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occurrence {
    pub offset_samples: usize,
    pub score: SampleType,
    pub prominence: SampleType,
}

/// finds every occurrence of `query` in `reference`. Chunks are correlated
/// in parallel, peaks merged and deduplicated across the chunk overlaps.
pub fn find_occurrences(
    reference: &Signal,
    query: &Signal,
    config: &ScanConfig,
) -> Result<Vec<Occurrence>, LocateError> {
    let sample_rate = reference.sample_rate();
    let chunk_len = ((config.chunk_size.as_secs_f64() * f64::from(sample_rate)).round() as usize)
        .max(query.len());
    let distance_samples =
        (config.distance.as_secs_f64() * f64::from(sample_rate)).round() as usize;
    let correlator = FftCorrelator::new();

    let mut occurrences = (0..reference.len())
        .step_by(chunk_len)
        .collect_vec()
        .into_par_iter()
        .map(|start| {
            let end = (start + chunk_len + query.len()).min(reference.len());
            if end - start < query.len() {
                return Ok(Vec::new());
            }
            let window = &reference.samples()[start..end];
            let alignment = correlate_sequences(&correlator, window, query.samples())?;
            Ok(peaks_in_curve(&alignment.curve, distance_samples, config.prominence)
                .into_iter()
                .map(|(position, prominence)| Occurrence {
                    offset_samples: start + position,
                    score: alignment.curve[position],
                    prominence,
                })
                .collect())
        })
        .collect::<Result<Vec<Vec<Occurrence>>, LocateError>>()?
        .into_iter()
        .flatten()
        .sorted_by_key(|occurrence| occurrence.offset_samples)
        .collect_vec();
    occurrences.dedup_by_key(|occurrence| occurrence.offset_samples);
    debug!("scan produced {} raw peaks", occurrences.len());

    Ok(drop_overshadowed(occurrences, distance_samples))
}

fn peaks_in_curve(
    curve: &[SampleType],
    distance_samples: usize,
    prominence: SampleType,
) -> Vec<(usize, SampleType)> {
    let mut finder = find_peaks::PeakFinder::new(curve);
    finder.with_min_prominence(prominence);
    finder.with_min_distance(distance_samples);
    finder
        .find_peaks()
        .into_iter()
        .map(|peak| (peak.position.start, peak.prominence.unwrap_or_default()))
        .collect()
}

/// a peak close to a more prominent neighbour is an echo of it, not its own
/// occurrence
fn drop_overshadowed(occurrences: Vec<Occurrence>, distance_samples: usize) -> Vec<Occurrence> {
    (0..occurrences.len())
        .filter(|&i| {
            let before = i.checked_sub(1).map(|b| &occurrences[b]);
            let after = occurrences.get(i + 1);
            !(is_overshadowed(&occurrences[i], before, distance_samples)
                || is_overshadowed(&occurrences[i], after, distance_samples))
        })
        .map(|i| occurrences[i])
        .collect()
}

fn is_overshadowed(
    occurrence: &Occurrence,
    other: Option<&Occurrence>,
    distance_samples: usize,
) -> bool {
    other.is_some_and(|other| {
        occurrence.offset_samples.abs_diff(other.offset_samples) < distance_samples
            && other.prominence > occurrence.prominence
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::pseudo_noise;

    fn occurrence(offset_samples: usize, prominence: SampleType) -> Occurrence {
        Occurrence {
            offset_samples,
            score: prominence,
            prominence,
        }
    }

    #[test]
    fn finds_both_planted_occurrences() {
        let clip = pseudo_noise(1000, 51);
        let mut samples = vec![0.0; 40_000];
        samples[5_000..6_000].copy_from_slice(&clip);
        samples[30_000..31_000].copy_from_slice(&clip);
        let reference = Signal::new(samples, 8_000);
        let query = Signal::new(clip, 8_000);

        let config = ScanConfig {
            chunk_size: Duration::from_secs(2),
            distance: Duration::from_millis(250),
            prominence: 0.5,
        };
        let occurrences = find_occurrences(&reference, &query, &config).unwrap();

        let offsets = occurrences
            .iter()
            .map(|occurrence| occurrence.offset_samples)
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![5_000, 30_000], "got {occurrences:?}");
        assert!(
            occurrences.iter().all(|occurrence| occurrence.score > 0.9),
            "got {occurrences:?}"
        );
    }

    #[test]
    fn no_occurrences_in_unrelated_noise() {
        let reference = Signal::new(pseudo_noise(30_000, 52), 8_000);
        let query = Signal::new(pseudo_noise(1_000, 53), 8_000);

        let config = ScanConfig {
            chunk_size: Duration::from_secs(2),
            distance: Duration::from_millis(250),
            prominence: 0.5,
        };
        assert_eq!(find_occurrences(&reference, &query, &config).unwrap(), vec![]);
    }

    #[test]
    fn overshadowed_neighbours_are_dropped() {
        let kept = vec![occurrence(100, 0.3), occurrence(5_000, 0.9)];
        assert_eq!(drop_overshadowed(kept.clone(), 1_000), kept);

        let close = vec![occurrence(100, 0.3), occurrence(600, 0.9)];
        assert_eq!(drop_overshadowed(close, 1_000), vec![occurrence(600, 0.9)]);
    }

    #[test]
    fn nothing_is_overshadowed_by_none() {
        assert!(!is_overshadowed(&occurrence(0, 0.1), None, 1_000));
    }

    #[test]
    fn equal_prominence_keeps_both() {
        let pair = vec![occurrence(100, 0.5), occurrence(200, 0.5)];
        assert_eq!(drop_overshadowed(pair.clone(), 1_000), pair);
    }
}
