use std::{
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, trace};

use crate::{
    errors::LocateError,
    signal::{SampleType, Signal},
};

/// boundary to the external media decoder. Implementations produce mono PCM
/// at their own fixed target rate; failures must surface, never an empty
/// signal.
pub trait Decode: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Signal, LocateError>;
}

/// shells out to ffmpeg to down-mix and resample any container/codec to a
/// mono WAV, then reads that back in
pub struct FfmpegDecoder {
    sample_rate: u32,
}

impl FfmpegDecoder {
    pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

    pub const fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    fn temp_wav(path: &Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map_or_else(|| "decode".to_owned(), |s| s.to_string_lossy().into_owned());
        std::env::temp_dir().join(format!("audio-locator-{}-{stem}.wav", std::process::id()))
    }
}
impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLE_RATE)
    }
}

impl Decode for FfmpegDecoder {
    fn decode(&self, path: &Path) -> Result<Signal, LocateError> {
        let temp = Self::temp_wav(path);
        trace!("converting '{}' to '{}'", path.display(), temp.display());
        // the subprocess is fully waited on, a nonzero exit is a decode error
        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(path)
            .args(["-ac", "1", "-ar", &self.sample_rate.to_string(), "-vn"])
            .arg(&temp)
            .output()
            .map_err(|err| LocateError::Decode {
                path: path.into(),
                reason: format!("couldn't run ffmpeg: {err}"),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LocateError::Decode {
                path: path.into(),
                reason: format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    stderr.lines().last().unwrap_or_default()
                ),
            });
        }
        let signal = read_wav(&temp, path);
        let _ = std::fs::remove_file(&temp);
        signal
    }
}

/// direct WAV ingestion without a subprocess, for input that is already mono
pub struct WavDecoder;

impl Decode for WavDecoder {
    fn decode(&self, path: &Path) -> Result<Signal, LocateError> {
        read_wav(path, path)
    }
}

/// `origin` is the file the caller asked for, `path` may be a temp product
fn read_wav(path: &Path, origin: &Path) -> Result<Signal, LocateError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| LocateError::Decode {
        path: origin.into(),
        reason: err.to_string(),
    })?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(LocateError::Decode {
            path: origin.into(),
            reason: format!("expected mono audio, got {} channels", spec.channels),
        });
    }
    let samples: Result<Vec<SampleType>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as SampleType;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as SampleType * scale))
                .collect()
        }
    };
    let samples = samples.map_err(|err| LocateError::Decode {
        path: origin.into(),
        reason: err.to_string(),
    })?;
    if samples.is_empty() {
        return Err(LocateError::EmptySignal(origin.into()));
    }
    debug!(
        "decoded {} samples at {} Hz from '{}'",
        samples.len(),
        spec.sample_rate,
        origin.display()
    );
    Ok(Signal::new(samples, spec.sample_rate))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// in-memory decoder, stands in for the ffmpeg collaborator
    pub(crate) struct MemoryDecoder {
        sample_rate: u32,
        files: HashMap<PathBuf, Vec<SampleType>>,
    }
    impl MemoryDecoder {
        pub(crate) fn new(sample_rate: u32) -> Self {
            Self {
                sample_rate,
                files: HashMap::new(),
            }
        }
        pub(crate) fn insert(mut self, path: &str, samples: Vec<SampleType>) -> Self {
            self.files.insert(PathBuf::from(path), samples);
            self
        }
    }
    impl Decode for MemoryDecoder {
        fn decode(&self, path: &Path) -> Result<Signal, LocateError> {
            let samples = self.files.get(path).ok_or_else(|| LocateError::Decode {
                path: path.into(),
                reason: "unknown file".to_owned(),
            })?;
            if samples.is_empty() {
                return Err(LocateError::EmptySignal(path.into()));
            }
            Ok(Signal::new(samples.clone(), self.sample_rate))
        }
    }

    fn write_wav(name: &str, spec: hound::WavSpec, samples: &[i16]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("audio-locator-test-{}-{name}", std::process::id()));
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    const MONO_SPEC: hound::WavSpec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    #[test]
    fn reads_mono_wav() {
        let path = write_wav("mono.wav", MONO_SPEC, &[0, i16::MAX, i16::MIN / 2]);
        let signal = WavDecoder.decode(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(signal.sample_rate(), 8_000);
        assert_eq!(signal.len(), 3);
        assert!((signal.samples()[1] - 0.999_97).abs() < 1e-4);
        assert!((signal.samples()[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn rejects_stereo_wav() {
        let spec = hound::WavSpec {
            channels: 2,
            ..MONO_SPEC
        };
        let path = write_wav("stereo.wav", spec, &[1, 2, 3, 4]);
        let result = WavDecoder.decode(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(
            matches!(&result, Err(LocateError::Decode { .. })),
            "stereo input must be refused, got {result:?}"
        );
    }

    #[test]
    fn empty_wav_is_an_empty_signal_error() {
        let path = write_wav("empty.wav", MONO_SPEC, &[]);
        let result = WavDecoder.decode(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(
            matches!(&result, Err(LocateError::EmptySignal(_))),
            "expected EmptySignal, got {result:?}"
        );
    }

    #[test]
    fn ffmpeg_failure_propagates() {
        let result = FfmpegDecoder::default().decode(Path::new("/definitely/not/there.mp3"));
        assert!(
            matches!(&result, Err(LocateError::Decode { .. })),
            "missing input must fail the load, got {:?}",
            result.as_ref().map(crate::signal::Signal::len)
        );
    }

    #[test]
    fn memory_decoder_round_trips() {
        let decoder = MemoryDecoder::new(16_000).insert("a", vec![0.25, -0.5]);
        let signal = decoder.decode(Path::new("a")).unwrap();
        assert_eq!(signal.samples(), &[0.25, -0.5]);
        assert!(decoder.decode(Path::new("b")).is_err(), "unknown path must fail");
    }
}
