//! The analyzer abstraction driven by the analysis engine.

use fretscope_core::AnalysisConfig;
use std::any::Any;

/// A frame-based diagnostic driven exclusively by the engine worker.
///
/// Lifecycle: the engine calls `configure` once at registration, then
/// `process_frame` once per frame in registration order until it stops.
/// `reset` may arrive from another thread; the engine serializes it against
/// frame processing. An analyzer that has not been configured must treat
/// `process_frame` as a no-op.
///
/// Results are not part of this trait: each concrete analyzer hands out a
/// typed [`crate::result::ResultSlot`] for readers.
pub trait Analyzer: Send {
    fn configure(&mut self, config: &AnalysisConfig);

    fn process_frame(&mut self, frame: &[f32]);

    fn reset(&mut self);

    /// Downcasting support for [`crate::engine::AnalysisEngine::with_analyzer`].
    fn as_any(&self) -> &dyn Any;
}
