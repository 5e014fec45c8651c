use std::path::Path;

use log::{debug, trace, warn};

use crate::{
    config::LocateConfig,
    correlate::{CorrelateStrategy, MatchResult},
    decode::{Decode, FfmpegDecoder},
    errors::{LocateError, MissingPart},
    signal::Signal,
};

enum State {
    Empty,
    ReferenceLoaded(Signal),
    Ready { reference: Signal, query: Signal },
}

/// owns one reference and one query at a time and runs the configured
/// strategy over them. All calls block; embedders run them off their
/// interactive thread and serialize access per instance.
pub struct Matcher {
    decoder: Box<dyn Decode>,
    strategy: Box<dyn CorrelateStrategy>,
    state: State,
    last: Option<MatchResult>,
}

impl Matcher {
    pub fn new(decoder: Box<dyn Decode>, strategy: Box<dyn CorrelateStrategy>) -> Self {
        Self {
            decoder,
            strategy,
            state: State::Empty,
            last: None,
        }
    }

    pub fn with_config(config: &LocateConfig) -> Self {
        Self::new(
            Box::new(FfmpegDecoder::new(config.sample_rate)),
            config.strategy.build(config.nperseg, config.stride),
        )
    }

    pub fn set_strategy(&mut self, strategy: Box<dyn CorrelateStrategy>) {
        self.strategy = strategy;
        self.last = None;
    }

    /// loads a new reference, discarding any query. On failure the previous
    /// state stays untouched.
    pub fn load_reference(&mut self, path: &Path) -> Result<(), LocateError> {
        let reference = self.load(path)?;
        self.state = State::ReferenceLoaded(reference);
        self.last = None;
        Ok(())
    }

    /// loads or replaces the query. Requires a reference, the query is only
    /// meaningful relative to its sample rate.
    pub fn load_query(&mut self, path: &Path) -> Result<(), LocateError> {
        let reference_rate = match &self.state {
            State::Empty => return Err(LocateError::NotReady(MissingPart::Reference)),
            State::ReferenceLoaded(reference) | State::Ready { reference, .. } => {
                reference.sample_rate()
            }
        };
        let query = self.load(path)?;
        if query.sample_rate() != reference_rate {
            return Err(LocateError::SampleRateMismatch(
                reference_rate,
                query.sample_rate(),
            ));
        }
        self.state = match std::mem::replace(&mut self.state, State::Empty) {
            State::Empty => unreachable!("checked above"),
            State::ReferenceLoaded(reference) | State::Ready { reference, .. } => {
                State::Ready { reference, query }
            }
        };
        self.last = None;
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<Signal, LocateError> {
        trace!("decoding '{}'", path.display());
        let signal = self.decoder.decode(path)?.normalize();
        if signal.is_silent() {
            warn!("'{}' is silent, scores against it are unreliable", path.display());
        }
        Ok(signal)
    }

    /// runs the strategy. Only valid with both signals loaded, anything else
    /// is a caller bug reported as [`LocateError::NotReady`].
    pub fn correlate(&mut self) -> Result<&MatchResult, LocateError> {
        match &self.state {
            State::Empty => Err(LocateError::NotReady(MissingPart::Reference)),
            State::ReferenceLoaded(_) => Err(LocateError::NotReady(MissingPart::Query)),
            State::Ready { reference, query } => {
                let result = self.strategy.evaluate(reference, query)?;
                debug!(
                    "matched at sample {} with score {}",
                    result.offset_samples, result.score
                );
                Ok(self.last.insert(result))
            }
        }
    }

    pub fn last_match(&self) -> Option<&MatchResult> {
        self.last.as_ref()
    }

    /// offset of the last match converted with the reference sample rate
    pub fn offset_seconds(&self) -> Option<f64> {
        let result = self.last.as_ref()?;
        let rate = match &self.state {
            State::Empty => return None,
            State::ReferenceLoaded(reference) | State::Ready { reference, .. } => {
                reference.sample_rate()
            }
        };
        Some(result.offset_samples as f64 / f64::from(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        correlate::{time_domain::TimeDomain, StrategyKind},
        decode::tests::MemoryDecoder,
        signal::pseudo_noise,
    };

    fn planted_decoder() -> MemoryDecoder {
        let clip = pseudo_noise(800, 61);
        let mut reference = vec![0.0; 8_000];
        reference[4_000..4_800].copy_from_slice(&clip);
        MemoryDecoder::new(16_000)
            .insert("reference", reference)
            .insert("clip", clip)
            .insert("silence", vec![0.0; 100])
    }

    fn matcher() -> Matcher {
        Matcher::new(Box::new(planted_decoder()), Box::new(TimeDomain::new()))
    }

    #[test]
    fn full_session_finds_the_clip() {
        let mut matcher = matcher();
        matcher.load_reference(Path::new("reference")).unwrap();
        matcher.load_query(Path::new("clip")).unwrap();

        let result = matcher.correlate().unwrap();
        assert_eq!(result.offset_samples, 4_000);
        assert!(result.score > 0.99, "score was {}", result.score);
        assert!((matcher.offset_seconds().unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn correlate_needs_both_signals() {
        let mut matcher = matcher();
        assert!(
            matches!(
                matcher.correlate(),
                Err(LocateError::NotReady(MissingPart::Reference))
            ),
            "empty matcher must name the missing reference"
        );

        matcher.load_reference(Path::new("reference")).unwrap();
        assert!(
            matches!(
                matcher.correlate(),
                Err(LocateError::NotReady(MissingPart::Query))
            ),
            "matcher without query must name the missing query"
        );
    }

    #[test]
    fn query_needs_a_reference_first() {
        let mut matcher = matcher();
        assert!(matches!(
            matcher.load_query(Path::new("clip")),
            Err(LocateError::NotReady(MissingPart::Reference))
        ));
    }

    #[test]
    fn new_reference_discards_the_query() {
        let mut matcher = matcher();
        matcher.load_reference(Path::new("reference")).unwrap();
        matcher.load_query(Path::new("clip")).unwrap();
        matcher.correlate().unwrap();

        matcher.load_reference(Path::new("reference")).unwrap();
        assert!(matcher.last_match().is_none(), "stale result survived a reload");
        assert!(matches!(
            matcher.correlate(),
            Err(LocateError::NotReady(MissingPart::Query))
        ));
    }

    #[test]
    fn failed_load_keeps_existing_state() {
        let mut matcher = matcher();
        matcher.load_reference(Path::new("reference")).unwrap();
        matcher.load_query(Path::new("clip")).unwrap();

        assert!(matcher.load_reference(Path::new("missing")).is_err());
        assert!(matcher.load_query(Path::new("missing")).is_err());
        // the old pair must still correlate
        assert_eq!(matcher.correlate().unwrap().offset_samples, 4_000);
    }

    #[test]
    fn silent_query_yields_degenerate_result() {
        let mut matcher = matcher();
        matcher.load_reference(Path::new("reference")).unwrap();
        matcher.load_query(Path::new("silence")).unwrap();

        let result = matcher.correlate().unwrap();
        assert!(result.degenerate, "silent query must be flagged");
        assert!(result.score.is_finite());
    }

    #[test]
    fn with_config_builds_the_configured_strategy() {
        let config = LocateConfig {
            strategy: StrategyKind::Sign,
            ..LocateConfig::default()
        };
        let mut matcher = Matcher::with_config(&config);
        // nothing loaded, but the state machine must behave the same
        assert!(matcher.correlate().is_err());
    }
}
