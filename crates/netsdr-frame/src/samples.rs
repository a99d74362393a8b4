//! IQ sample extraction from data-item bodies.

use crate::error::{FrameError, Result};

/// Sample width the device streams in 16-bit FIFO capture mode.
pub const IQ_SAMPLE_BITS: u16 = 16;

/// Lazy, restartable iterator over little-endian unsigned samples.
///
/// Borrows the body; clone it before consuming to walk the same samples again.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    body: &'a [u8],
    stride: usize,
}

impl Samples<'_> {
    /// Bytes per sample.
    pub fn stride(&self) -> usize {
        self.stride
    }
}

impl Iterator for Samples<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.body.len() < self.stride {
            return None;
        }
        let (chunk, rest) = self.body.split_at(self.stride);
        self.body = rest;
        Some(
            chunk
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, byte)| acc | (u32::from(*byte) << (8 * i))),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.body.len() / self.stride;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Samples<'_> {}

/// Decode `body` into samples of `bits` width.
///
/// `bits / 8` must be between 1 and 4. A trailing partial sample is dropped.
/// No sign extension is performed.
pub fn decode_samples(bits: u16, body: &[u8]) -> Result<Samples<'_>> {
    let stride = usize::from(bits / 8);
    if !(1..=4).contains(&stride) {
        return Err(FrameError::InvalidSampleWidth(bits));
    }
    Ok(Samples { body, stride })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_bit_samples() {
        let samples: Vec<u32> = decode_samples(16, &[0x01, 0x00, 0x02, 0x00, 0x03, 0x00])
            .unwrap()
            .collect();
        assert_eq!(samples, vec![1, 2, 3]);
    }

    #[test]
    fn trailing_partial_sample_dropped() {
        let samples: Vec<u32> = decode_samples(16, &[0x01, 0x00, 0x02, 0x00, 0x03])
            .unwrap()
            .collect();
        assert_eq!(samples, vec![1, 2]);
    }

    #[test]
    fn empty_body_yields_nothing() {
        assert_eq!(decode_samples(8, &[]).unwrap().count(), 0);
    }

    #[test]
    fn eight_bit_samples() {
        let samples: Vec<u32> = decode_samples(8, &[0x01, 0x02, 0xFF]).unwrap().collect();
        assert_eq!(samples, vec![1, 2, 255]);
    }

    #[test]
    fn twenty_four_bit_samples_little_endian() {
        let samples: Vec<u32> = decode_samples(24, &[0x01, 0x02, 0x03, 0xFF, 0xFF, 0xFF])
            .unwrap()
            .collect();
        assert_eq!(samples, vec![0x030201, 0xFFFFFF]);
    }

    #[test]
    fn thirty_two_bit_samples_are_not_sign_extended() {
        let samples: Vec<u32> = decode_samples(32, &[0xFF, 0xFF, 0xFF, 0xFF, 0x78, 0x56, 0x34, 0x12])
            .unwrap()
            .collect();
        assert_eq!(samples, vec![0xFFFF_FFFF, 0x1234_5678]);
    }

    #[test]
    fn high_bit_sixteen_bit_sample_stays_positive() {
        let samples: Vec<u32> = decode_samples(16, &[0x00, 0x80]).unwrap().collect();
        assert_eq!(samples, vec![0x8000]);
    }

    #[test]
    fn width_out_of_range_rejected() {
        for bits in [0u16, 7, 40, 64] {
            let err = decode_samples(bits, &[0x00; 8]).unwrap_err();
            assert!(matches!(err, FrameError::InvalidSampleWidth(b) if b == bits));
        }
    }

    #[test]
    fn iterator_can_be_walked_twice() {
        let body = [0x0A, 0x00, 0x0B, 0x00];
        let samples = decode_samples(IQ_SAMPLE_BITS, &body).unwrap();
        assert_eq!(samples.len(), 2);

        let first: Vec<u32> = samples.clone().collect();
        let second: Vec<u32> = samples.collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![10, 11]);
    }
}
