//! WAV input/output for the processing strategies.

use std::path::Path;

use crate::error::WorkerError;

/// Decoded audio: interleaved f32 samples plus the source format.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioClip {
    /// Read a WAV file, normalising integer formats to f32 in [-1, 1].
    pub fn load_wav(path: &Path) -> Result<Self, WorkerError> {
        let mut reader = hound::WavReader::open(path).map_err(|e| {
            WorkerError::BadInput(format!("cannot read `{}`: {e}", path.display()))
        })?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .filter_map(|s| s.ok())
                    .map(|s| s as f32 / max_val)
                    .collect()
            }
            hound::SampleFormat::Float => reader.samples::<f32>().filter_map(|s| s.ok()).collect(),
        };

        if samples.is_empty() {
            return Err(WorkerError::BadInput(format!(
                "`{}` contains no audio frames",
                path.display()
            )));
        }

        Ok(Self { samples, channels: spec.channels, sample_rate: spec.sample_rate })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Downmix to mono by averaging channels.
    pub fn mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Write interleaved f32 samples as 16-bit PCM.
pub fn write_wav(
    path: &Path,
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<(), WorkerError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| {
        WorkerError::Internal(format!("cannot create `{}`: {e}", path.display()))
    })?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer
            .write_sample(value)
            .map_err(|e| WorkerError::Internal(format!("write `{}`: {e}", path.display())))?;
    }
    writer
        .finalize()
        .map_err(|e| WorkerError::Internal(format!("finalize `{}`: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stem_studio_proto::WorkerErrorKind;

    fn scratch_file(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("stem-studio-audio-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_wav_round_trip_preserves_shape() {
        let path = scratch_file("round_trip.wav");
        let samples: Vec<f32> = (0..2048)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        write_wav(&path, &samples, 2, 44_100).unwrap();

        let clip = AudioClip::load_wav(&path).unwrap();
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.sample_rate, 44_100);
        assert_eq!(clip.frames(), 1024);
        // 16-bit quantisation stays well under 1e-3.
        for (a, b) in clip.samples.iter().zip(&samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_mono_downmix_averages_channels() {
        let clip = AudioClip {
            samples: vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0],
            channels: 2,
            sample_rate: 8_000,
        };
        assert_eq!(clip.mono(), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_missing_file_is_bad_input() {
        let err = AudioClip::load_wav(Path::new("/nonexistent/input.wav")).unwrap_err();
        assert_eq!(err.kind(), WorkerErrorKind::BadInput);
    }
}
