use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("couldn't decode '{path}': {reason}")]
    Decode { path: PathWrap, reason: String },

    #[error("no samples decoded from '{0}'")]
    EmptySignal(PathWrap),

    #[error("signals have different samplerates ({0}, {1}), and resampling is up to the decoder")]
    SampleRateMismatch(u32, u32),

    #[error("no {0} loaded, load one before correlating")]
    NotReady(MissingPart),

    #[error("couldn't load config: {0}")]
    Config(#[from] confy::ConfyError),

    #[error(transparent)]
    Fft(#[from] realfft::FftError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPart {
    Reference,
    Query,
}
impl core::fmt::Display for MissingPart {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Query => write!(f, "query"),
        }
    }
}

// a wrapper for paths, that has display
#[derive(Clone)]
pub struct PathWrap(std::path::PathBuf);

impl<A: AsRef<Path>> From<A> for PathWrap {
    fn from(value: A) -> Self {
        Self(value.as_ref().to_path_buf())
    }
}

impl core::fmt::Debug for PathWrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", &self.0)
    }
}
impl core::fmt::Display for PathWrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", &self.0.display())
    }
}
