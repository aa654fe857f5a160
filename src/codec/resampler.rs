//! Streaming capture-rate to codec-rate resampler
//!
//! Wraps Rubato's `SincFixedOut`, which produces a fixed number of output
//! frames per call and reports how many input samples the next call will
//! consume. That matches the frame-emission loop exactly: ask for the
//! input count, wait until that many samples are buffered, then convert
//! one 10 ms frame. Phase state is internal; restarting a stream means
//! constructing a new resampler.

use rubato::{
    Resampler, SincFixedOut, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::CodecError;

/// Stateful mono resampler emitting fixed-size output frames.
pub struct StreamResampler {
    inner: SincFixedOut<f32>,
    in_rate: u32,
    out_rate: u32,
    output_frames: usize,
    /// Per-call input staging, reused to avoid allocations.
    scratch_in: Vec<Vec<f32>>,
    scratch_out: Vec<Vec<f32>>,
}

impl StreamResampler {
    /// Create a resampler converting `in_rate` to `out_rate`, producing
    /// exactly `output_frames` samples per [`Self::resample`] call.
    pub fn new(in_rate: u32, out_rate: u32, output_frames: usize) -> Result<Self, CodecError> {
        let params = SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 128,
            window: WindowFunction::Blackman2,
        };

        let inner = SincFixedOut::<f32>::new(
            out_rate as f64 / in_rate as f64,
            1.0,
            params,
            output_frames,
            1,
        )
        .map_err(|e| CodecError::ResamplerInit(e.to_string()))?;

        let max_in = inner.input_frames_max();
        Ok(Self {
            inner,
            in_rate,
            out_rate,
            output_frames,
            scratch_in: vec![Vec::with_capacity(max_in)],
            scratch_out: vec![vec![0.0; output_frames]],
        })
    }

    /// Number of input samples the next [`Self::resample`] call will
    /// consume. Deterministic for the current internal phase.
    pub fn samples_needed(&self) -> usize {
        self.inner.input_frames_next()
    }

    /// Convert exactly [`Self::samples_needed`] source samples into
    /// `dest`, which must hold `output_frames` samples. Internal phase
    /// advances so subsequent calls stay aligned.
    pub fn resample(&mut self, dest: &mut [f32], src: &[f32]) -> Result<(), CodecError> {
        debug_assert_eq!(src.len(), self.samples_needed());
        debug_assert_eq!(dest.len(), self.output_frames);

        self.scratch_in[0].clear();
        self.scratch_in[0].extend_from_slice(src);

        let (consumed, produced) = self
            .inner
            .process_into_buffer(&self.scratch_in, &mut self.scratch_out, None)
            .map_err(|e| CodecError::ResampleFailed(e.to_string()))?;
        debug_assert_eq!(consumed, src.len());
        debug_assert_eq!(produced, self.output_frames);

        dest.copy_from_slice(&self.scratch_out[0][..self.output_frames]);
        Ok(())
    }

    pub fn input_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.out_rate
    }
}
