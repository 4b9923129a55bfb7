//! Analysis configuration.

use crate::{Error, Result};

/// Immutable parameter bundle handed to every analyzer at registration.
///
/// Analyzers keep a copy and never mutate it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Number of samples per analysis frame.
    pub frame_size: usize,
}

impl AnalysisConfig {
    pub fn new(sample_rate: f32, frame_size: usize) -> Self {
        Self {
            sample_rate,
            frame_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} must be a positive finite value",
                self.sample_rate
            )));
        }
        if self.frame_size == 0 {
            return Err(Error::InvalidConfig(
                "frame_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Duration of one frame in seconds.
    #[inline]
    pub fn frame_duration(&self) -> f32 {
        self.frame_size as f32 / self.sample_rate
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            frame_size: 2048,
        }
    }
}
