//! # Fretscope - Live Guitar Diagnostics
//!
//! Continuously analyzes a mono guitar signal and publishes three verdicts:
//!
//! - **Fret buzz**: likelihood in `[0, 1]` from transient and spectral
//!   anomalies
//! - **Intonation**: cent deviation between the open string and the twelfth
//!   fret, driven by a calibration state machine
//! - **String health**: a `[0, 1]` score fusing harmonic decay, brightness,
//!   and inharmonicity
//!
//! ## Architecture
//!
//! Data flows one way through three contexts:
//!
//! ```text
//! audio callback ──▶ SPSC sample ring ──▶ analysis engine ──▶ result slots
//!  (hard real-time)     (pre-sized)         (worker thread)     (lock-free)
//! ```
//!
//! - **fretscope-core** — the lock-free sample ring, atomics, configuration
//! - **fretscope-analysis** — spectrum/pitch DSP, the three analyzers, and
//!   the frame-dispatching engine
//! - **fretscope** (this crate) — capture-device glue and session wiring
//!
//! ## Quick start
//!
//! ```ignore
//! use fretscope::Fretscope;
//!
//! let mut session = Fretscope::builder().build()?;
//! session.start()?;
//!
//! let intonation = session.intonation();
//! loop {
//!     let snapshot = intonation.latest();
//!     println!("{:?}: {:.1} cents", snapshot.state, snapshot.cent_deviation);
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! ```

/// Re-export of fretscope-core for direct access.
pub use fretscope_core as core;

/// Re-export of fretscope-analysis for direct access.
pub use fretscope_analysis as analysis;

pub use fretscope_core::{AnalysisConfig, LevelMeter, RingBuffer, RunFlag, SampleRing};

pub use fretscope_analysis::{
    AnalysisEngine, Analyzer, FretBuzzAnalyzer, FretBuzzResult, IntonationAnalyzer,
    IntonationResult, IntonationState, Pitch, PitchDetector, ResultSlot, SpectrumAnalyzer,
    StringHealthAnalyzer, StringHealthResult, StringInfo,
};

mod builder;
mod engine;
mod error;
pub mod input;

pub use builder::FretscopeBuilder;
pub use engine::Fretscope;
pub use error::{Error, Result};
pub use input::AudioInput;

/// Convenience prelude for common imports.
pub mod prelude {
    pub use crate::{Fretscope, FretscopeBuilder};

    pub use crate::{
        AnalysisConfig, FretBuzzResult, IntonationResult, IntonationState, SampleRing,
        StringHealthResult,
    };
}
