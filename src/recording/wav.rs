//! In-memory WAV packaging of captured samples.
//!
//! The capture buffer is concatenated into a single mono 16-bit PCM WAV
//! payload for upload. No on-disk intermediate is used.

use anyhow::Result;
use std::io::Cursor;

/// Encodes mono i16 PCM samples as a WAV payload.
///
/// An empty sample buffer still produces a well-formed (header-only) WAV,
/// so stopping immediately after starting a recording uploads cleanly.
///
/// # Errors
/// - If the WAV writer fails (not expected for in-memory writes)
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut payload = Vec::new();
    {
        let cursor = Cursor::new(&mut payload);
        let mut writer = hound::WavWriter::new(cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_produces_well_formed_wav() {
        let payload = encode_wav(&[], 16000).unwrap();

        let reader = hound::WavReader::new(Cursor::new(payload)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_samples_roundtrip() {
        let samples = vec![0i16, 100, -100, i16::MAX, i16::MIN];
        let payload = encode_wav(&samples, 44100).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(payload)).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }
}
