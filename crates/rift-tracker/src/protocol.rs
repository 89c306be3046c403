use crate::types::RawImuSample;
use glam::Vec3;
use std::collections::VecDeque;
use thiserror::Error;

/// Frame marker emitted by the sensor bridge ahead of every sample.
pub const FRAME_MAGIC: [u8; 4] = *b"RIMU";
/// magic + sequence (u32) + gyro xyz (3 x f32) + accel xyz (3 x f32).
pub const FRAME_LEN: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Skipped {0} bytes while searching for a frame marker")]
    Resync(usize),
    #[error("Sample {0} contains non-finite values")]
    NonFinite(u32),
}

/// Streaming parser for the sensor bridge byte stream.
///
/// Feed raw TCP bytes via `push_data`, then drain parsed samples via `next_sample`.
pub struct ProtocolParser {
    buffer: VecDeque<u8>,
    last_sequence: Option<u32>,
    dropped: u64,
}

impl ProtocolParser {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(4096),
            last_sequence: None,
            dropped: 0,
        }
    }

    /// Append received bytes to the internal buffer.
    pub fn push_data(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Number of samples missing from the sequence so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Try to extract the next complete sample from the buffer.
    /// Returns `None` if no complete frame is available yet.
    pub fn next_sample(&mut self) -> Option<Result<RawImuSample, ProtocolError>> {
        let buf = self.buffer.make_contiguous();

        let Some(start) = find_pattern(buf, &FRAME_MAGIC) else {
            // Keep a possible partial marker at the tail.
            let keep = FRAME_MAGIC.len() - 1;
            if buf.len() > keep {
                let skipped = buf.len() - keep;
                self.buffer.drain(..skipped);
                return Some(Err(ProtocolError::Resync(skipped)));
            }
            return None;
        };

        if start > 0 {
            self.buffer.drain(..start);
            return Some(Err(ProtocolError::Resync(start)));
        }

        if buf.len() < FRAME_LEN {
            return None;
        }

        let frame: [u8; FRAME_LEN] = buf[..FRAME_LEN].try_into().ok()?;
        self.buffer.drain(..FRAME_LEN);

        let sample = parse_frame(&frame);
        if let Some(last) = self.last_sequence {
            let gap = sample.sequence.wrapping_sub(last).wrapping_sub(1);
            if gap > 0 && gap < u32::MAX / 2 {
                self.dropped += gap as u64;
            }
        }
        self.last_sequence = Some(sample.sequence);

        if !(sample.gyro.is_finite() && sample.accel.is_finite()) {
            return Some(Err(ProtocolError::NonFinite(sample.sequence)));
        }
        Some(Ok(sample))
    }
}

impl Default for ProtocolParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one complete frame (marker included).
fn parse_frame(frame: &[u8; FRAME_LEN]) -> RawImuSample {
    let word = |offset: usize| -> [u8; 4] {
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    };
    let f = |offset: usize| f32::from_le_bytes(word(offset));

    RawImuSample {
        sequence: u32::from_le_bytes(word(4)),
        gyro: Vec3::new(f(8), f(12), f(16)),
        accel: Vec3::new(f(20), f(24), f(28)),
    }
}

/// Find the first occurrence of `pattern` in `data`.
fn find_pattern(data: &[u8], pattern: &[u8]) -> Option<usize> {
    data.windows(pattern.len())
        .position(|window| window == pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a synthetic frame for testing.
    fn make_frame(sequence: u32, gyro: [f32; 3], accel: [f32; 3]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(FRAME_LEN);
        frame.extend_from_slice(&FRAME_MAGIC);
        frame.extend_from_slice(&sequence.to_le_bytes());
        for v in gyro.iter().chain(accel.iter()) {
            frame.extend_from_slice(&v.to_le_bytes());
        }
        frame
    }

    #[test]
    fn parse_single_frame() {
        let mut parser = ProtocolParser::new();
        parser.push_data(&make_frame(7, [1.0, 2.0, 3.0], [4.0, 5.0, 6.0]));

        let sample = parser.next_sample().unwrap().unwrap();
        assert_eq!(sample.sequence, 7);
        assert!((sample.gyro - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
        assert!((sample.accel - Vec3::new(4.0, 5.0, 6.0)).length() < 1e-6);

        // No more frames.
        assert!(parser.next_sample().is_none());
    }

    #[test]
    fn parse_fragmented_data() {
        let frame = make_frame(0, [0.5, -0.5, 0.1], [0.0, 0.0, 9.8]);
        let mid = frame.len() / 2;

        let mut parser = ProtocolParser::new();
        parser.push_data(&frame[..mid]);
        assert!(parser.next_sample().is_none());

        parser.push_data(&frame[mid..]);
        let sample = parser.next_sample().unwrap().unwrap();
        assert!((sample.gyro.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn resyncs_after_garbage() {
        let mut parser = ProtocolParser::new();
        parser.push_data(&[0xde, 0xad, 0xbe]);
        parser.push_data(&make_frame(1, [1.0, 0.0, 0.0], [0.0; 3]));

        assert!(matches!(
            parser.next_sample(),
            Some(Err(ProtocolError::Resync(3)))
        ));
        let sample = parser.next_sample().unwrap().unwrap();
        assert_eq!(sample.sequence, 1);
    }

    #[test]
    fn counts_sequence_gaps() {
        let mut parser = ProtocolParser::new();
        parser.push_data(&make_frame(10, [0.0; 3], [0.0; 3]));
        parser.push_data(&make_frame(11, [0.0; 3], [0.0; 3]));
        parser.push_data(&make_frame(15, [0.0; 3], [0.0; 3]));
        while let Some(result) = parser.next_sample() {
            result.unwrap();
        }
        assert_eq!(parser.dropped(), 3);
    }

    #[test]
    fn rejects_non_finite_samples() {
        let mut parser = ProtocolParser::new();
        parser.push_data(&make_frame(3, [f32::NAN, 0.0, 0.0], [0.0; 3]));
        assert!(matches!(
            parser.next_sample(),
            Some(Err(ProtocolError::NonFinite(3)))
        ));
    }
}
