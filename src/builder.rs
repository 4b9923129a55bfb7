//! Builder for a diagnostics session.

use crate::input::AudioInput;
use crate::{Fretscope, Result};
use fretscope_analysis::{
    AnalysisConfig, AnalysisEngine, FretBuzzAnalyzer, IntonationAnalyzer, StringHealthAnalyzer,
};
use fretscope_core::SampleRing;
use std::sync::Arc;

/// Builder for [`Fretscope`].
///
/// # Example
///
/// ```ignore
/// use fretscope::Fretscope;
///
/// let mut session = Fretscope::builder()
///     .frame_size(2048)
///     .build()?;
/// session.start()?;
///
/// let buzz = session.fret_buzz().latest();
/// ```
pub struct FretscopeBuilder {
    sample_rate: f32,
    frame_size: usize,
    ring_capacity: usize,
    live_input: bool,
}

impl Default for FretscopeBuilder {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            frame_size: 2048,
            ring_capacity: 16_384,
            live_input: true,
        }
    }
}

impl FretscopeBuilder {
    /// Sample rate used when no live input overrides it (default 48 kHz).
    pub fn sample_rate(mut self, rate: f32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Samples per analysis frame (default 2048).
    pub fn frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    /// Ring capacity in samples (default 16384).
    pub fn ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    /// Disable the capture device; callers feed the ring themselves.
    pub fn without_input(mut self) -> Self {
        self.live_input = false;
        self
    }

    /// Builds the session: ring, engine, the three analyzers, and (unless
    /// disabled) the default capture device.
    pub fn build(self) -> Result<Fretscope> {
        let ring = Arc::new(SampleRing::new(self.ring_capacity));

        let (input, sample_rate) = if self.live_input {
            let input = AudioInput::open_default(Arc::clone(&ring))?;
            let rate = input.sample_rate();
            (Some(input), rate)
        } else {
            (None, self.sample_rate)
        };

        let config = AnalysisConfig::new(sample_rate, self.frame_size);
        let mut engine = AnalysisEngine::new(Arc::clone(&ring), config)?;

        let fret_buzz = FretBuzzAnalyzer::new();
        let fret_buzz_results = fret_buzz.results();
        engine.register(fret_buzz)?;

        let intonation = IntonationAnalyzer::new();
        let intonation_results = intonation.results();
        engine.register(intonation)?;

        let string_health = StringHealthAnalyzer::new();
        let string_health_results = string_health.results();
        engine.register(string_health)?;

        Ok(Fretscope::assemble(
            ring,
            engine,
            input,
            fret_buzz_results,
            intonation_results,
            string_health_results,
        ))
    }
}
