//! Live audio input: default capture device → sample ring.
//!
//! The capture callback is the hard real-time producer context: it forwards
//! each block straight to [`SampleRing::write`] (dropping the block on
//! backpressure) and publishes the block's RMS for meters. Nothing on this
//! path blocks, allocates, or copies the block.

use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use fretscope_core::{LevelMeter, SampleRing};
use std::sync::Arc;

/// Mono input stream feeding a [`SampleRing`].
pub struct AudioInput {
    stream: cpal::Stream,
    sample_rate: f32,
    peak_level: Arc<LevelMeter>,
}

impl AudioInput {
    /// Opens the default input device at its native sample rate, requesting
    /// a single capture channel.
    pub fn open_default(ring: Arc<SampleRing>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(Error::NoInputDevice)?;
        let default_config = device.default_input_config()?;

        if default_config.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::UnsupportedSampleFormat(default_config.sample_format()));
        }

        let sample_rate = default_config.sample_rate().0 as f32;
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: default_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        tracing::debug!(sample_rate, "opening default input device (mono)");

        let peak_level = Arc::new(LevelMeter::new());
        let callback_peak = Arc::clone(&peak_level);

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if data.is_empty() {
                    return;
                }

                // Backpressure: a full ring drops the block silently.
                ring.write(data);

                let sum_squares: f32 = data.iter().map(|s| s * s).sum();
                callback_peak.update((sum_squares / data.len() as f32).sqrt());
            },
            move |err| {
                tracing::error!(%err, "audio input stream error");
            },
            None,
        )?;

        Ok(Self {
            stream,
            sample_rate,
            peak_level,
        })
    }

    /// Actual device sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn start(&self) -> Result<()> {
        self.stream.play()?;
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.stream.pause()?;
        Ok(())
    }

    /// RMS of the most recent captured block.
    pub fn peak_level(&self) -> f32 {
        self.peak_level.level()
    }

    /// Shared handle to the level meter for UI threads.
    pub fn peak_handle(&self) -> Arc<LevelMeter> {
        Arc::clone(&self.peak_level)
    }
}
