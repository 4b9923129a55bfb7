//! The top-level diagnostics session.

use crate::input::AudioInput;
use crate::{Error, Result};
use fretscope_analysis::{
    AnalysisConfig, AnalysisEngine, FretBuzzResult, IntonationResult, ResultSlot,
    StringHealthResult,
};
use fretscope_core::SampleRing;
use std::sync::Arc;

/// A running guitar-diagnostics session.
///
/// Owns the sample ring, the analysis engine with its three analyzers, and
/// (optionally) the live capture device. Renderers read results through the
/// per-analyzer [`ResultSlot`] handles; each `latest()` call returns an
/// immutable snapshot that may be held for any duration.
pub struct Fretscope {
    ring: Arc<SampleRing>,
    engine: AnalysisEngine,
    input: Option<AudioInput>,

    fret_buzz: ResultSlot<FretBuzzResult>,
    intonation: ResultSlot<IntonationResult>,
    string_health: ResultSlot<StringHealthResult>,
}

impl Fretscope {
    /// Creates a session builder.
    pub fn builder() -> crate::FretscopeBuilder {
        crate::FretscopeBuilder::default()
    }

    pub(crate) fn assemble(
        ring: Arc<SampleRing>,
        engine: AnalysisEngine,
        input: Option<AudioInput>,
        fret_buzz: ResultSlot<FretBuzzResult>,
        intonation: ResultSlot<IntonationResult>,
        string_health: ResultSlot<StringHealthResult>,
    ) -> Self {
        Self {
            ring,
            engine,
            input,
            fret_buzz,
            intonation,
            string_health,
        }
    }

    /// Starts the analysis worker, then the capture stream.
    pub fn start(&mut self) -> Result<()> {
        if !self.engine.start() {
            return Err(Error::AlreadyRunning);
        }

        if let Some(input) = &self.input {
            if let Err(err) = input.start() {
                self.engine.stop();
                return Err(err);
            }
        }

        tracing::debug!("diagnostics session started");
        Ok(())
    }

    /// Stops the capture stream, then the analysis worker. Idempotent.
    pub fn stop(&mut self) {
        if let Some(input) = &self.input {
            if let Err(err) = input.stop() {
                tracing::warn!(%err, "failed to pause input stream");
            }
        }

        self.engine.stop();
        tracing::debug!("diagnostics session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Resets all three analyzers.
    pub fn reset(&self) {
        self.engine.reset();
    }

    /// Fret-buzz results handle.
    pub fn fret_buzz(&self) -> ResultSlot<FretBuzzResult> {
        self.fret_buzz.clone()
    }

    /// Intonation results handle.
    pub fn intonation(&self) -> ResultSlot<IntonationResult> {
        self.intonation.clone()
    }

    /// String-health results handle.
    pub fn string_health(&self) -> ResultSlot<StringHealthResult> {
        self.string_health.clone()
    }

    /// RMS of the most recent captured block, or 0.0 without live input.
    pub fn input_level(&self) -> f32 {
        self.input.as_ref().map_or(0.0, AudioInput::peak_level)
    }

    /// The sample ring. With live input disabled this is how callers feed
    /// audio into the session.
    pub fn ring(&self) -> &Arc<SampleRing> {
        &self.ring
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.engine.config()
    }

    /// Direct access to the analysis engine.
    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }
}

impl Drop for Fretscope {
    fn drop(&mut self) {
        self.stop();
    }
}
