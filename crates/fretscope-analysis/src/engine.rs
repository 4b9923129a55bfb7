//! The worker-driven analysis engine.
//!
//! Pulls fixed-size frames from the sample ring on a dedicated thread and
//! dispatches each frame to every registered analyzer in registration order.

use crate::analyzer::Analyzer;
use crate::{Error, Result};
use fretscope_core::{AnalysisConfig, RunFlag, SampleRing};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Polling sleep when the ring holds less than one frame.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

type SharedAnalyzer = Arc<Mutex<dyn Analyzer>>;

/// Owns the worker thread and the registered analyzers.
///
/// Frames are delivered in the exact order they were written to the ring;
/// within a frame, analyzers run in registration order, never concurrently
/// with each other. Dropping the engine stops the worker.
pub struct AnalysisEngine {
    ring: Arc<SampleRing>,
    config: AnalysisConfig,
    analyzers: Vec<SharedAnalyzer>,
    running: Arc<RunFlag>,
    worker: Option<JoinHandle<()>>,
}

impl AnalysisEngine {
    /// Creates an engine reading `config.frame_size`-sample frames from
    /// `ring`. Not yet running.
    pub fn new(ring: Arc<SampleRing>, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            ring,
            config,
            analyzers: Vec::new(),
            running: Arc::new(RunFlag::new()),
            worker: None,
        })
    }

    /// Configures `analyzer` immediately and appends it to the dispatch list.
    ///
    /// Registration is only allowed before [`start`](Self::start); the
    /// analyzer list must be immutable while the worker runs.
    pub fn register(&mut self, mut analyzer: impl Analyzer + 'static) -> Result<()> {
        if self.is_running() {
            return Err(Error::RegisterWhileRunning);
        }

        analyzer.configure(&self.config);
        self.analyzers.push(Arc::new(Mutex::new(analyzer)));
        Ok(())
    }

    /// Spawns the worker thread. Returns `false` without effect when the
    /// engine is already running.
    pub fn start(&mut self) -> bool {
        if !self.running.begin() {
            return false;
        }

        let ring = Arc::clone(&self.ring);
        let analyzers = self.analyzers.clone();
        let running = Arc::clone(&self.running);
        let frame_size = self.config.frame_size;

        match thread::Builder::new()
            .name("fretscope-analysis".into())
            .spawn(move || worker_loop(&ring, &analyzers, &running, frame_size))
        {
            Ok(handle) => {
                self.worker = Some(handle);
                true
            }
            Err(err) => {
                tracing::error!(%err, "failed to spawn analysis worker");
                self.running.end();
                false
            }
        }
    }

    /// Signals the worker to stop and joins it. Idempotent.
    pub fn stop(&mut self) {
        self.running.end();

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("analysis worker terminated abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_running()
    }

    /// Resets every registered analyzer.
    ///
    /// Safe while running: each analyzer's lock serializes the reset against
    /// frame processing, though ordering relative to in-flight frames is
    /// unspecified.
    pub fn reset(&self) {
        for analyzer in &self.analyzers {
            analyzer.lock().reset();
        }
    }

    /// Runs `f` against the registered analyzer of concrete type `T`, if one
    /// exists. The analyzer's lock is held for the duration of the call.
    pub fn with_analyzer<T, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R>
    where
        T: Analyzer + 'static,
    {
        for analyzer in &self.analyzers {
            let guard = analyzer.lock();
            if let Some(typed) = guard.as_any().downcast_ref::<T>() {
                return Some(f(typed));
            }
        }
        None
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
}

impl Drop for AnalysisEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    ring: &SampleRing,
    analyzers: &[SharedAnalyzer],
    running: &RunFlag,
    frame_size: usize,
) {
    let mut frame = vec![0.0f32; frame_size];
    tracing::debug!(frame_size, "analysis worker started");

    while running.is_running() {
        if ring.available_read() >= frame_size {
            let samples_read = ring.read(&mut frame);
            if samples_read == 0 {
                continue;
            }

            for analyzer in analyzers {
                let mut guard = analyzer.lock();
                let outcome =
                    catch_unwind(AssertUnwindSafe(|| guard.process_frame(&frame[..samples_read])));
                if outcome.is_err() {
                    tracing::warn!("analyzer panicked on a frame; skipping it for this frame");
                }
            }
        } else {
            thread::sleep(POLL_INTERVAL);
        }
    }

    tracing::debug!("analysis worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every frame it sees into a shared counter/log.
    struct ProbeAnalyzer {
        configured: Option<AnalysisConfig>,
        frames: Arc<AtomicUsize>,
        first_samples: Arc<Mutex<Vec<f32>>>,
        resets: Arc<AtomicUsize>,
    }

    impl ProbeAnalyzer {
        fn new() -> Self {
            Self {
                configured: None,
                frames: Arc::new(AtomicUsize::new(0)),
                first_samples: Arc::new(Mutex::new(Vec::new())),
                resets: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Analyzer for ProbeAnalyzer {
        fn configure(&mut self, config: &AnalysisConfig) {
            self.configured = Some(*config);
        }

        fn process_frame(&mut self, frame: &[f32]) {
            self.frames.fetch_add(1, Ordering::SeqCst);
            self.first_samples.lock().push(frame[0]);
        }

        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn engine_with_ring(frame_size: usize) -> (AnalysisEngine, Arc<SampleRing>) {
        let ring = Arc::new(SampleRing::new(frame_size * 8));
        let config = AnalysisConfig::new(48_000.0, frame_size);
        let engine = AnalysisEngine::new(Arc::clone(&ring), config).unwrap();
        (engine, ring)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let ring = Arc::new(SampleRing::new(1024));
        assert!(AnalysisEngine::new(ring, AnalysisConfig::new(0.0, 2048)).is_err());
    }

    #[test]
    fn test_start_twice_returns_false() {
        let (mut engine, _ring) = engine_with_ring(256);
        assert!(engine.start());
        assert!(!engine.start());
        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut engine, _ring) = engine_with_ring(256);
        assert!(engine.start());
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_register_configures_immediately() {
        let (mut engine, _ring) = engine_with_ring(256);
        let probe = ProbeAnalyzer::new();
        engine.register(probe).unwrap();

        let configured =
            engine.with_analyzer::<ProbeAnalyzer, _>(|probe| probe.configured.unwrap());
        assert_eq!(configured.unwrap().frame_size, 256);
    }

    #[test]
    fn test_register_while_running_is_rejected() {
        let (mut engine, _ring) = engine_with_ring(256);
        assert!(engine.start());

        let result = engine.register(ProbeAnalyzer::new());
        assert!(matches!(result, Err(Error::RegisterWhileRunning)));
        engine.stop();
    }

    #[test]
    fn test_frames_dispatched_in_write_order() {
        let (mut engine, ring) = engine_with_ring(64);
        let probe = ProbeAnalyzer::new();
        let frames = Arc::clone(&probe.frames);
        let first_samples = Arc::clone(&probe.first_samples);
        engine.register(probe).unwrap();

        assert!(engine.start());

        for i in 0..10 {
            let mut frame = vec![0.0f32; 64];
            frame[0] = i as f32;
            while !ring.write(&frame) {
                thread::sleep(Duration::from_millis(1));
            }
        }

        // Wait for all frames to drain through the worker.
        for _ in 0..500 {
            if frames.load(Ordering::SeqCst) >= 10 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        engine.stop();

        let seen = first_samples.lock().clone();
        assert_eq!(seen.len(), 10, "saw {} frames", seen.len());
        for (i, &first) in seen.iter().enumerate() {
            assert_eq!(first, i as f32, "frame {} out of order", i);
        }
    }

    #[test]
    fn test_reset_reaches_every_analyzer() {
        let (mut engine, _ring) = engine_with_ring(256);
        let probe_a = ProbeAnalyzer::new();
        let probe_b = ProbeAnalyzer::new();
        let resets_a = Arc::clone(&probe_a.resets);
        let resets_b = Arc::clone(&probe_b.resets);
        engine.register(probe_a).unwrap();
        engine.register(probe_b).unwrap();

        engine.reset();
        assert_eq!(resets_a.load(Ordering::SeqCst), 1);
        assert_eq!(resets_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_analyzer_miss_returns_none() {
        let (engine, _ring) = engine_with_ring(256);
        assert!(engine.with_analyzer::<ProbeAnalyzer, _>(|_| ()).is_none());
    }

    /// Panics on every frame.
    struct FaultyAnalyzer;

    impl Analyzer for FaultyAnalyzer {
        fn configure(&mut self, _config: &AnalysisConfig) {}

        fn process_frame(&mut self, _frame: &[f32]) {
            panic!("injected analyzer fault");
        }

        fn reset(&mut self) {}

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_analyzer_panic_is_contained() {
        let (mut engine, ring) = engine_with_ring(64);

        // Faulty analyzer first; the probe behind it must still see frames.
        engine.register(FaultyAnalyzer).unwrap();
        let probe = ProbeAnalyzer::new();
        let frames = Arc::clone(&probe.frames);
        engine.register(probe).unwrap();

        assert!(engine.start());

        let frame = vec![0.25f32; 64];
        for _ in 0..3 {
            while !ring.write(&frame) {
                thread::sleep(Duration::from_millis(1));
            }
        }

        for _ in 0..500 {
            if frames.load(Ordering::SeqCst) >= 3 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        engine.stop();

        assert!(
            frames.load(Ordering::SeqCst) >= 3,
            "worker died with the faulty analyzer"
        );
    }

    #[test]
    fn test_drop_stops_worker() {
        let (mut engine, ring) = engine_with_ring(64);
        assert!(engine.start());
        drop(engine);

        // The worker is gone; nothing should drain the ring anymore.
        let frame = vec![0.0f32; 64];
        assert!(ring.write(&frame));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ring.available_read(), 64);
    }
}
