//! 16-bit PCM WAV encoding.
//!
//! Channels are interleaved frame by frame. Samples are clamped to
//! [-1.0, 1.0]; negative values scale by 0x8000 and positive ones by 0x7FFF,
//! so -1.0 maps to -32768 and 1.0 to 32767.

use crate::engine::SampleBuffer;
use crate::error::PlayerError;
use std::fs;
use std::path::Path;

pub const HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;
const PCM_FORMAT: u16 = 1;

/// Convert one sample to a signed 16-bit value.
pub fn to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode a buffer as a complete WAV file.
///
/// # Example
/// ```
/// use jianpu::engine::SampleBuffer;
/// use jianpu::wav;
///
/// let buffer = SampleBuffer::new(2, 100, 44100);
/// let bytes = wav::encode(&buffer);
/// assert_eq!(bytes.len(), 44 + 100 * 2 * 2);
/// assert_eq!(&bytes[0..4], b"RIFF");
/// ```
pub fn encode(buffer: &SampleBuffer) -> Vec<u8> {
    let channels = buffer.num_channels() as u16;
    let frames = buffer.len();
    let sample_rate = buffer.sample_rate();
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_size = (frames * block_align as usize) as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data_size as usize);

    // RIFF chunk
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt subchunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data subchunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    for frame in 0..frames {
        for channel in 0..channels as usize {
            out.extend_from_slice(&to_i16(buffer.channel(channel)[frame]).to_le_bytes());
        }
    }

    out
}

/// Encode `buffer` and write it to `path`.
pub fn write<P: AsRef<Path>>(path: P, buffer: &SampleBuffer) -> Result<(), PlayerError> {
    fs::write(path.as_ref(), encode(buffer))?;
    log::info!(
        "wrote {} ({:.2}s, {} channel(s))",
        path.as_ref().display(),
        buffer.duration_seconds(),
        buffer.num_channels()
    );
    Ok(())
}
