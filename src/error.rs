//! Error types for the fretscope facade.

use thiserror::Error;

/// Error type for fretscope operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] fretscope_core::Error),

    #[error(transparent)]
    Analysis(#[from] fretscope_analysis::Error),

    #[error("Session is already running")]
    AlreadyRunning,

    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Unsupported input sample format: {0:?}")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[error("Failed to query the default input format")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build the audio input stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start the audio input stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Failed to pause the audio input stream")]
    PauseStream(#[from] cpal::PauseStreamError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
