//! Recording sessions and the recordings they produce

use super::recorder::AudioChunk;
use crate::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, info, warn};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// MIME type of every produced recording
pub const RECORDING_MIME: &str = "audio/wav";

/// File name a recording is saved under
pub const RECORDING_FILE_NAME: &str = "recording.wav";

/// Format used when a session captured nothing
const FALLBACK_SAMPLE_RATE: u32 = 44_100;
const FALLBACK_CHANNELS: u16 = 1;

/// Chunks accumulated between recorder start and stop
#[derive(Debug, Default)]
pub struct RecordingSession {
    chunks: Vec<AudioChunk>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Append a chunk; empty chunks are dropped
    pub fn push(&mut self, chunk: AudioChunk) {
        if chunk.is_empty() {
            return;
        }
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drain the chunks into one recording
    ///
    /// The session is empty afterwards, even if encoding fails.
    pub fn finish(&mut self) -> Result<Recording> {
        let chunks = std::mem::take(&mut self.chunks);
        debug!("Assembling recording from {} chunks", chunks.len());
        Recording::from_chunks(&chunks)
    }
}

/// An assembled, immutable recording
#[derive(Debug, Clone)]
pub struct Recording {
    wav: Arc<[u8]>,
    sample_rate: u32,
    channels: u16,
    frames: usize,
}

impl Recording {
    /// Encode chunks as 16-bit PCM WAV
    ///
    /// The first chunk decides the format; chunks in a different format are
    /// skipped.
    pub fn from_chunks(chunks: &[AudioChunk]) -> Result<Self> {
        let (sample_rate, channels) = chunks
            .first()
            .map(|c| (c.sample_rate, c.channels.max(1)))
            .unwrap_or((FALLBACK_SAMPLE_RATE, FALLBACK_CHANNELS));

        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut samples = 0usize;
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for chunk in chunks {
                if chunk.sample_rate != sample_rate || chunk.channels.max(1) != channels {
                    warn!(
                        "Skipping chunk in {} Hz/{} ch, recording is {} Hz/{} ch",
                        chunk.sample_rate, chunk.channels, sample_rate, channels
                    );
                    continue;
                }
                for &sample in &chunk.samples {
                    writer.write_sample(to_i16(sample))?;
                }
                samples += chunk.samples.len();
            }
            writer.finalize()?;
        }

        Ok(Self {
            wav: cursor.into_inner().into(),
            sample_rate,
            channels,
            frames: samples / channels as usize,
        })
    }

    /// The complete WAV file
    pub fn bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn mime_type(&self) -> &'static str {
        RECORDING_MIME
    }

    pub fn file_name(&self) -> &'static str {
        RECORDING_FILE_NAME
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate.max(1) as f64)
    }

    /// Write the recording into `dir`, replacing a previous one
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(RECORDING_FILE_NAME);
        std::fs::write(&path, self.bytes())?;
        info!("Saved {} bytes to {:?}", self.wav.len(), path);
        Ok(path)
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
