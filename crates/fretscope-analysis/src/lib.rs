//! # fretscope-analysis
//!
//! Frame-based diagnostics for a live guitar signal:
//!
//! - **Fret buzz**: transient sharpness + high-frequency noise + harmonic
//!   deviation blended into a buzz likelihood ([`FretBuzzAnalyzer`])
//! - **Intonation**: a guided open-string / twelfth-fret comparison reporting
//!   cent deviation ([`IntonationAnalyzer`])
//! - **String health**: harmonic decay, brightness, and inharmonicity fused
//!   into a health score ([`StringHealthAnalyzer`])
//!
//! Analyzers implement the [`Analyzer`] trait and are driven by the
//! [`AnalysisEngine`], which pulls fixed-size frames from a
//! [`fretscope_core::SampleRing`] on a dedicated worker thread. Each analyzer
//! publishes its latest result through a lock-free [`ResultSlot`] that any
//! thread may read.
//!
//! The DSP building blocks — a Hann-windowed magnitude spectrum
//! ([`SpectrumAnalyzer`]) and a YIN pitch detector ([`PitchDetector`]) — are
//! exposed for reuse.

pub mod analyzer;
pub mod engine;
pub mod error;
pub mod fret_buzz;
pub mod intonation;
pub mod pitch;
pub mod result;
pub mod spectrum;
pub mod string_health;
pub mod strings;

pub use analyzer::Analyzer;
pub use engine::AnalysisEngine;
pub use error::{Error, Result};
pub use fret_buzz::FretBuzzAnalyzer;
pub use intonation::IntonationAnalyzer;
pub use pitch::{Pitch, PitchDetector};
pub use result::{
    FretBuzzResult, IntonationResult, IntonationState, ResultSlot, StringHealthResult,
};
pub use spectrum::SpectrumAnalyzer;
pub use string_health::StringHealthAnalyzer;
pub use strings::{StringInfo, STANDARD_TUNING, STRING_NAMES};

pub use fretscope_core::AnalysisConfig;
