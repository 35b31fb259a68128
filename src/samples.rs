//! Reconstruction of complex baseband samples from raw receive buffers.
//!
//! The receive path delivers one flat buffer of real-valued components per
//! refill: interleaved I/Q pairs, one pair per enabled complex channel per
//! frame. This module pairs those components back into [`Complex`] samples
//! and splits them per channel.

use num_complex::Complex;

use crate::error::{Error, Result};

/// Assembled complex samples for one buffer refill.
///
/// A single-channel configuration yields one flat sequence; a multi-channel
/// configuration yields one sequence per channel. The bifurcation is part of
/// the public contract so single-channel callers never pay for (or unwrap) a
/// one-element outer vector.
#[derive(Debug, Clone, PartialEq)]
pub enum ComplexSampleSet {
    /// Samples of the only configured channel.
    Single(Vec<Complex<f32>>),
    /// Samples per channel, in channel order.
    Multi(Vec<Vec<Complex<f32>>>),
}

impl ComplexSampleSet {
    /// Total number of complex samples across all channels.
    pub fn len(&self) -> usize {
        match self {
            ComplexSampleSet::Single(samples) => samples.len(),
            ComplexSampleSet::Multi(channels) => channels.iter().map(Vec::len).sum(),
        }
    }

    /// Whether the set contains no samples at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pair up a raw interleaved buffer into complex samples.
///
/// Consecutive elements form one sample: `(raw[2i], raw[2i+1])`. With a
/// single configured channel the pairs are returned as one sequence; with
/// `channels > 1` pair *i* belongs to channel *i mod channels* (the frame
/// layout of an interleaved multi-channel buffer) and the pair count must
/// divide evenly by the channel count.
///
/// The channel count is an explicit input rather than something inferred
/// from the buffer length; buffer length alone cannot distinguish "two
/// channels" from "two samples".
///
/// # Errors
///
/// - [`Error::DataIntegrity`] if the buffer length is odd, or if the pairs
///   do not divide evenly across a multi-channel configuration. No partial
///   result is produced.
/// - [`Error::InvalidParameter`] if `channels` is zero.
///
/// # Example
///
/// ```
/// use rs_pluto::samples::{assemble_complex_samples, ComplexSampleSet};
/// use num_complex::Complex;
///
/// let set = assemble_complex_samples(&[1.0, 2.0, 3.0, 4.0], 1).unwrap();
/// assert_eq!(
///     set,
///     ComplexSampleSet::Single(vec![Complex::new(1.0, 2.0), Complex::new(3.0, 4.0)])
/// );
/// ```
pub fn assemble_complex_samples(raw: &[f32], channels: usize) -> Result<ComplexSampleSet> {
    if channels == 0 {
        return Err(Error::invalid_parameter("channel count must be at least 1"));
    }
    if raw.len() % 2 != 0 {
        return Err(Error::data(format!(
            "complex data needs an even number of components, got {}",
            raw.len()
        )));
    }

    let pairs = raw.len() / 2;
    if channels == 1 {
        let samples = raw
            .chunks_exact(2)
            .map(|c| Complex::new(c[0], c[1]))
            .collect();
        return Ok(ComplexSampleSet::Single(samples));
    }

    if pairs % channels != 0 {
        return Err(Error::data(format!(
            "{} samples do not divide across {} channels",
            pairs, channels
        )));
    }

    let per_channel = pairs / channels;
    let mut out = vec![Vec::with_capacity(per_channel); channels];
    for (i, c) in raw.chunks_exact(2).enumerate() {
        out[i % channels].push(Complex::new(c[0], c[1]));
    }
    Ok(ComplexSampleSet::Multi(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_channel_pairs() {
        let set = assemble_complex_samples(&[1.0, 2.0, 3.0, 4.0], 1).unwrap();
        assert_eq!(
            set,
            ComplexSampleSet::Single(vec![Complex::new(1.0, 2.0), Complex::new(3.0, 4.0)])
        );
    }

    #[test]
    fn test_pairing_preserves_order() {
        let raw: Vec<f32> = (0..64).map(|i| i as f32).collect();
        let set = assemble_complex_samples(&raw, 1).unwrap();
        let ComplexSampleSet::Single(samples) = set else {
            panic!("expected single-channel set");
        };
        assert_eq!(samples.len(), 32);
        for (i, s) in samples.iter().enumerate() {
            assert_eq!(s.re, (2 * i) as f32);
            assert_eq!(s.im, (2 * i + 1) as f32);
        }
    }

    #[test]
    fn test_odd_length_rejected() {
        let err = assemble_complex_samples(&[1.0, 2.0, 3.0], 1).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }

    #[test]
    fn test_zero_channels_rejected() {
        let err = assemble_complex_samples(&[1.0, 2.0], 0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_empty_buffer() {
        let set = assemble_complex_samples(&[], 1).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_two_channels_round_robin() {
        // Two frames of two channels: (1,2)(3,4) then (5,6)(7,8).
        let raw = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let set = assemble_complex_samples(&raw, 2).unwrap();
        assert_eq!(
            set,
            ComplexSampleSet::Multi(vec![
                vec![Complex::new(1.0, 2.0), Complex::new(5.0, 6.0)],
                vec![Complex::new(3.0, 4.0), Complex::new(7.0, 8.0)],
            ])
        );
    }

    #[test]
    fn test_uneven_channel_split_rejected() {
        // Three pairs cannot split across two channels.
        let raw = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let err = assemble_complex_samples(&raw, 2).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }

    #[test]
    fn test_sample_set_len() {
        let single = assemble_complex_samples(&[1.0, 2.0, 3.0, 4.0], 1).unwrap();
        assert_eq!(single.len(), 2);
        let multi = assemble_complex_samples(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(multi.len(), 2);
    }
}
