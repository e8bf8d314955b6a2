//! Sound data decoding.
//!
//! Only WAV is decoded. OGG, FLAC and MP3 are recognised but reported as
//! [`LoadOutcome::Unsupported`] so callers do not mistake them for silence.
//! Playing sounds is up to the audio device owner; this module only produces
//! sample data and the volume mapping it uses.

use std::{io::Cursor, path::Path};

use crate::resources::{LoadOutcome, extension, load_binary};

#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("[{path}] could not decode wav data: {source}")]
    Decode {
        path: String,
        #[source]
        source: hound::Error,
    },
}

/// Sample layout a device buffer needs to be created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundFormat {
    Mono8,
    Mono16,
    Stereo8,
    Stereo16,
}

impl SoundFormat {
    pub fn from_layout(channels: u16, bits_per_sample: u16) -> Option<Self> {
        match (channels, bits_per_sample) {
            (1, 8) => Some(SoundFormat::Mono8),
            (1, 16) => Some(SoundFormat::Mono16),
            (2, 8) => Some(SoundFormat::Stereo8),
            (2, 16) => Some(SoundFormat::Stereo16),
            (1 | 2, bits) => {
                log::warn!("Sample size not supported: {}", bits);
                None
            }
            _ => {
                log::warn!("Only MONO and STEREO channels are supported.");
                None
            }
        }
    }
}

/// Decoded, interleaved samples normalised to `-1.0..=1.0`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoundData {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub samples: Vec<f32>,
}

impl SoundData {
    /// Samples per channel.
    pub fn frame_count(&self) -> usize {
        match self.channels {
            0 => 0,
            channels => self.samples.len() / channels as usize,
        }
    }

    pub fn format(&self) -> Option<SoundFormat> {
        SoundFormat::from_layout(self.channels, self.bits_per_sample)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Decode a complete WAV file held in memory.
    pub fn from_wav_bytes(bytes: &[u8], label: &str) -> Result<Self, SoundError> {
        let decode = |source| SoundError::Decode {
            path: label.to_string(),
            source,
        };
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(decode)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let max_value = (1i64 << spec.bits_per_sample.saturating_sub(1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|s| s as f32 / max_value))
                    .collect::<Result<Vec<_>, _>>()
            }
        }
        .map_err(decode)?;

        Ok(Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            samples,
        })
    }
}

/// An 8-bit volume, mapped linearly onto a `0.0..=1.0` gain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(pub u8);

impl Volume {
    pub const MUTE: Volume = Volume(0);
    pub const MAX: Volume = Volume(u8::MAX);

    pub fn gain(self) -> f32 {
        self.0 as f32 / 255.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::MAX
    }
}

/// Load sound data by extension.
///
/// A missing WAV file is logged and yields empty data.
pub fn load_sound_data(path: impl AsRef<Path>) -> Result<LoadOutcome<SoundData>, SoundError> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("wav") => {
            let label = path.display().to_string();
            let bytes = match load_binary(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("[{}] Could not open .wav file: {}", label, e);
                    return Ok(LoadOutcome::Loaded(SoundData::default()));
                }
            };
            let data = SoundData::from_wav_bytes(&bytes, &label)?;
            if data.format().is_none() {
                log::warn!("[{}] No device format matches this sound", label);
            }
            Ok(LoadOutcome::Loaded(data))
        }
        _ => Ok(LoadOutcome::unsupported(path)),
    }
}
