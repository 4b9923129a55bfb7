//! # fretscope-core
//!
//! Shared primitives for the fretscope diagnostics engine:
//!
//! - **SPSC sample ring**: wait-free conduit from the audio callback to the
//!   analysis worker ([`ring::SampleRing`])
//! - **Lock-free cells**: the engine run flag and the capture-side level
//!   meter ([`lockfree`])
//! - **Configuration**: the immutable parameter bundle handed to every
//!   analyzer ([`config::AnalysisConfig`])
//!
//! This crate is headless and free of any audio-device or DSP dependencies.

pub mod config;
pub mod error;
pub mod lockfree;
pub mod ring;

pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use lockfree::{LevelMeter, RunFlag};
pub use ring::{RingBuffer, SampleRing};
