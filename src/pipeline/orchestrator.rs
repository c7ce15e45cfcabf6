//! Pipeline orchestration
//!
//! Drives one submission through upload, processing and completion on a
//! dedicated worker thread. Every delay is a cancellable wait; progress goes
//! out over an unbounded channel so the worker never blocks on a slow reader.
//! The analyzer itself runs on a detached helper thread, so neither a cancel
//! nor the phase ceiling has to wait for it to return.

use crate::analysis::Analyzer;
use crate::error::{BatcallError, Result};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::phase::{PhaseKind, PipelinePhase, PROCESSING_STEPS};
use crate::types::{AnalysisResult, UploadCandidate};
use crossbeam_channel::{at, bounded, never, select, unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Upload progress increment in percent
const UPLOAD_INCREMENT: usize = 10;

/// Delays and ceilings of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineTiming {
    /// Pause after each upload progress reading
    pub upload_step: Duration,
    /// Pause after each processing sub-step
    pub processing_step: Duration,
    /// Pause between reaching `Complete` and delivering the result
    pub finalize_delay: Duration,
    /// Wall-clock limit per phase; `None` disables the check
    pub phase_ceiling: Option<Duration>,
}

impl Default for PipelineTiming {
    fn default() -> Self {
        Self {
            upload_step: Duration::from_millis(200),
            processing_step: Duration::from_millis(1000),
            finalize_delay: Duration::from_millis(1000),
            phase_ceiling: Some(Duration::from_secs(60)),
        }
    }
}

impl PipelineTiming {
    /// No delays at all; the ceiling still applies
    pub fn immediate() -> Self {
        Self::default().scaled(0.0)
    }

    /// Multiply every delay by `factor`; the ceiling is left alone
    pub fn scaled(self, factor: f64) -> Self {
        let factor = if factor.is_finite() { factor.max(0.0) } else { 1.0 };
        Self {
            upload_step: self.upload_step.mul_f64(factor),
            processing_step: self.processing_step.mul_f64(factor),
            finalize_delay: self.finalize_delay.mul_f64(factor),
            phase_ceiling: self.phase_ceiling,
        }
    }
}

/// Something the caller can observe while a run advances
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A new phase became active
    PhaseEntered(PhaseKind),
    /// Progress reading within the active phase
    Progress {
        phase: PhaseKind,
        percent: f64,
        /// Processing sub-step label
        step: Option<&'static str>,
    },
    /// The run finished; sent exactly once, after the finalizing delay
    Delivered(Box<AnalysisResult>),
    /// The run entered `Failed`
    Failed { message: String },
}

/// Phase of a run, shared between the worker and observers
#[derive(Debug, Clone, Default)]
pub struct PhaseCell(Arc<Mutex<PipelinePhase>>);

impl PhaseCell {
    pub fn get(&self) -> PipelinePhase {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, phase: PipelinePhase) {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = phase;
    }
}

/// Handle to a running submission
///
/// Dropping the handle cancels the run and joins its worker.
pub struct PipelineRun {
    token: CancellationToken,
    phase: PhaseCell,
    events: Receiver<PipelineEvent>,
    worker: Option<JoinHandle<()>>,
}

/// Start a run for `candidate`
///
/// The candidate is owned by the run from here on.
pub fn start(
    candidate: UploadCandidate,
    analyzer: Arc<dyn Analyzer>,
    timing: PipelineTiming,
) -> Result<PipelineRun> {
    let token = CancellationToken::new();
    let phase = PhaseCell::default();
    let (tx, rx) = unbounded();

    info!(
        "Starting analysis of {} ({:.2} MB, {}) with {}",
        candidate.name,
        candidate.size_mb(),
        candidate.media_type,
        analyzer.name()
    );

    let worker = Worker {
        candidate,
        analyzer,
        timing,
        token: token.clone(),
        phase: phase.clone(),
        tx,
    };

    let handle = thread::Builder::new()
        .name("batcall-pipeline".to_string())
        .spawn(move || worker.run())?;

    Ok(PipelineRun {
        token,
        phase,
        events: rx,
        worker: Some(handle),
    })
}

impl PipelineRun {
    /// Snapshot of the current phase
    ///
    /// After a cancel this stays at the phase the run was aborted in.
    pub fn phase(&self) -> PipelinePhase {
        self.phase.get()
    }

    /// Shared view of the phase, for observers that outlive the handle borrow
    pub fn phase_cell(&self) -> PhaseCell {
        self.phase.clone()
    }

    /// Token that aborts this run when cancelled
    pub fn cancel_handle(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Event stream of the run
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    /// Abort the run and wait for the worker to stop
    pub fn cancel(mut self) {
        self.token.cancel();
        self.join();
    }

    /// Block until the run delivers, fails or is cancelled
    pub fn wait(self) -> Result<AnalysisResult> {
        self.wait_with(|_| {})
    }

    /// Like [`wait`](Self::wait), calling `on_event` for every event received
    pub fn wait_with<F: FnMut(&PipelineEvent)>(mut self, mut on_event: F) -> Result<AnalysisResult> {
        let outcome = loop {
            match self.events.recv() {
                Ok(event) => {
                    on_event(&event);
                    match event {
                        PipelineEvent::Delivered(result) => {
                            if self.token.is_cancelled() {
                                break Err(BatcallError::Cancelled);
                            }
                            break Ok(*result);
                        }
                        PipelineEvent::Failed { message } => {
                            break Err(BatcallError::PipelineFailed { message });
                        }
                        PipelineEvent::PhaseEntered(_) | PipelineEvent::Progress { .. } => {}
                    }
                }
                // Worker is gone without delivering
                Err(_) => {
                    let panicked = self.join();
                    break if panicked {
                        Err(BatcallError::pipeline_failed("pipeline worker stopped unexpectedly"))
                    } else {
                        Err(BatcallError::Cancelled)
                    };
                }
            }
        };
        self.join();
        outcome
    }

    /// Join the worker; returns true if it panicked
    fn join(&mut self) -> bool {
        let Some(handle) = self.worker.take() else {
            return false;
        };
        match handle.join() {
            Ok(()) => {
                debug!("Pipeline worker finished");
                false
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!("Pipeline worker panicked: {}", panic_msg);
                true
            }
        }
    }
}

impl Drop for PipelineRun {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.token.cancel();
            self.join();
        }
    }
}

/// State owned by the worker thread
struct Worker {
    candidate: UploadCandidate,
    analyzer: Arc<dyn Analyzer>,
    timing: PipelineTiming,
    token: CancellationToken,
    phase: PhaseCell,
    tx: Sender<PipelineEvent>,
}

impl Worker {
    fn run(self) {
        let run_start = Instant::now();

        match self.drive() {
            Ok(result) => {
                if self.token.is_cancelled() {
                    debug!("Run for {} cancelled before delivery", self.candidate.name);
                    return;
                }
                info!(
                    "Analysis of {} completed in {:.2}s: {} detections",
                    self.candidate.name,
                    run_start.elapsed().as_secs_f64(),
                    result.detections.len()
                );
                self.emit(PipelineEvent::Delivered(Box::new(result)));
            }
            Err(BatcallError::Cancelled) => {
                debug!("Run for {} cancelled", self.candidate.name);
            }
            Err(e) => {
                let message = e.to_string();
                match self.phase.get().fail(message.clone()) {
                    Ok(failed) => self.phase.set(failed),
                    Err(transition) => warn!("Could not record failure: {}", transition),
                }
                error!("Analysis of {} failed: {}", self.candidate.name, message);
                self.emit(PipelineEvent::Failed { message });
            }
        }
    }

    fn drive(&self) -> Result<AnalysisResult> {
        // Phase 1: Upload
        let mut phase = self.enter(PipelinePhase::Idle.begin_upload()?);
        let upload_start = Instant::now();
        for percent in (0..=100).step_by(UPLOAD_INCREMENT) {
            phase = self.report(phase.with_upload_progress(percent as f64)?);
            self.pause(self.timing.upload_step)?;
            self.check_ceiling(PhaseKind::Uploading, upload_start)?;
        }

        // Phase 2: Processing
        phase = self.enter(phase.begin_processing()?);
        let processing_start = Instant::now();
        for (index, label) in PROCESSING_STEPS.iter().enumerate() {
            phase = self.report(phase.with_processing_step(index)?);
            debug!("Processing step {}: {}", index + 1, label);
            self.pause(self.timing.processing_step)?;
            self.check_ceiling(PhaseKind::Processing, processing_start)?;
        }

        let result = self.analyze(processing_start)?;
        result.validate()?;
        if self.token.is_cancelled() {
            return Err(BatcallError::Cancelled);
        }

        // Phase 3: Complete, then the finalizing beat before delivery
        self.enter(phase.complete()?);
        self.pause(self.timing.finalize_delay)?;

        Ok(result)
    }

    /// Call the analyzer, bounded by cancellation and the Processing ceiling
    ///
    /// The helper thread is never joined. If the wait ends first, whatever
    /// the analyzer returns later is dropped along with the channel.
    fn analyze(&self, processing_start: Instant) -> Result<AnalysisResult> {
        let (result_tx, result_rx) = bounded(1);
        let analyzer = Arc::clone(&self.analyzer);
        let candidate = self.candidate.clone();
        thread::Builder::new()
            .name("batcall-analyzer".to_string())
            .spawn(move || {
                let _ = result_tx.send(analyzer.analyze(&candidate));
            })?;

        let (deadline, limit) = match self.timing.phase_ceiling {
            Some(limit) => (at(processing_start + limit), limit),
            None => (never(), Duration::ZERO),
        };

        select! {
            recv(result_rx) -> outcome => match outcome {
                Ok(result) => result,
                // Sender dropped without a send: the analyzer panicked
                Err(_) => Err(BatcallError::AnalysisError {
                    reason: format!("{} analyzer stopped without a result", self.analyzer.name()),
                }),
            },
            recv(self.token.signal()) -> _ => Err(BatcallError::Cancelled),
            recv(deadline) -> _ => {
                warn!(
                    "{} analyzer still running after {:?}, giving up",
                    self.analyzer.name(),
                    limit
                );
                Err(BatcallError::PhaseTimeout {
                    phase: PhaseKind::Processing.to_string(),
                    limit,
                })
            },
        }
    }

    fn enter(&self, phase: PipelinePhase) -> PipelinePhase {
        debug!("Entering {} phase", phase.kind());
        self.phase.set(phase.clone());
        self.emit(PipelineEvent::PhaseEntered(phase.kind()));
        phase
    }

    fn report(&self, phase: PipelinePhase) -> PipelinePhase {
        self.phase.set(phase.clone());
        if let Some(percent) = phase.progress() {
            self.emit(PipelineEvent::Progress {
                phase: phase.kind(),
                percent,
                step: phase.step_label(),
            });
        }
        phase
    }

    fn pause(&self, delay: Duration) -> Result<()> {
        if self.token.wait(delay) {
            Err(BatcallError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn check_ceiling(&self, phase: PhaseKind, started: Instant) -> Result<()> {
        match self.timing.phase_ceiling {
            Some(limit) if started.elapsed() > limit => Err(BatcallError::PhaseTimeout {
                phase: phase.to_string(),
                limit,
            }),
            _ => Ok(()),
        }
    }

    fn emit(&self, event: PipelineEvent) {
        // Nobody listening any more is fine; the run just finishes quietly
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DetectionEvent, MediaRef, MediaType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedAnalyzer {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FixedAnalyzer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    impl Analyzer for FixedAnalyzer {
        fn analyze(&self, candidate: &UploadCandidate) -> Result<AnalysisResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            Ok(AnalysisResult {
                bat_detected: true,
                confidence: 0.89,
                detections: vec![
                    DetectionEvent::new(2.3, 0.91, "Big Brown Bat"),
                    DetectionEvent::new(4.7, 0.85, "Little Brown Bat"),
                    DetectionEvent::new(7.1, 0.92, "Big Brown Bat"),
                ],
                primary_species: Some("Big Brown Bat".to_string()),
                audio: MediaRef::audio_for(candidate),
                file_name: candidate.name.clone(),
                duration: 12.5,
                visualization: MediaRef::visualization_for(candidate),
                analyzer: self.name().to_string(),
                analyzed_at: chrono::Utc::now(),
            })
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct BrokenAnalyzer;

    impl Analyzer for BrokenAnalyzer {
        fn analyze(&self, _candidate: &UploadCandidate) -> Result<AnalysisResult> {
            Err(BatcallError::AnalysisError {
                reason: "model unavailable".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    /// Signals when called, then blocks for `delay` and fails
    struct StallingAnalyzer {
        entered: Sender<()>,
        delay: Duration,
    }

    impl Analyzer for StallingAnalyzer {
        fn analyze(&self, _candidate: &UploadCandidate) -> Result<AnalysisResult> {
            let _ = self.entered.send(());
            thread::sleep(self.delay);
            Err(BatcallError::AnalysisError {
                reason: "late".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "stalling"
        }
    }

    fn stalling(delay: Duration) -> (Arc<StallingAnalyzer>, Receiver<()>) {
        let (entered, rx) = unbounded();
        (Arc::new(StallingAnalyzer { entered, delay }), rx)
    }

    fn candidate() -> UploadCandidate {
        UploadCandidate {
            name: "colony.wav".to_string(),
            size_bytes: 10 * 1024 * 1024,
            media_type: MediaType::Wav,
            source: None,
        }
    }

    #[test]
    fn test_phases_and_progress_in_order() {
        let run = start(candidate(), Arc::new(FixedAnalyzer::new()), PipelineTiming::immediate())
            .unwrap();

        let mut events = Vec::new();
        let result = run.wait_with(|e| events.push(e.clone())).unwrap();
        assert_eq!(result.file_name, "colony.wav");

        let entered: Vec<PhaseKind> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::PhaseEntered(kind) => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            entered,
            vec![PhaseKind::Uploading, PhaseKind::Processing, PhaseKind::Complete]
        );

        let upload: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Progress {
                    phase: PhaseKind::Uploading,
                    percent,
                    ..
                } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(upload.len(), 11);
        assert!(upload.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(upload.last().copied(), Some(100.0));

        let steps: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Progress {
                    phase: PhaseKind::Processing,
                    step,
                    ..
                } => *step,
                _ => None,
            })
            .collect();
        assert_eq!(steps, PROCESSING_STEPS.to_vec());

        let delivered = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::Delivered(_)))
            .count();
        assert_eq!(delivered, 1);
        assert!(matches!(events.last(), Some(PipelineEvent::Delivered(_))));
    }

    #[test]
    fn test_analyzer_error_fails_run() {
        let run = start(candidate(), Arc::new(BrokenAnalyzer), PipelineTiming::immediate()).unwrap();
        let cell = run.phase_cell();

        let err = run.wait().unwrap_err();
        match err {
            BatcallError::PipelineFailed { message } => assert!(message.contains("model unavailable")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(cell.get().kind(), PhaseKind::Failed);
    }

    #[test]
    fn test_cancel_during_upload_never_delivers() {
        let timing = PipelineTiming {
            upload_step: Duration::from_millis(50),
            ..PipelineTiming::immediate()
        };
        let analyzer = Arc::new(FixedAnalyzer::new());
        let run = start(candidate(), analyzer.clone(), timing).unwrap();

        // First event is entering the upload phase
        let first = run.events().recv().unwrap();
        assert!(matches!(first, PipelineEvent::PhaseEntered(PhaseKind::Uploading)));
        run.cancel_handle().cancel();

        let mut delivered = false;
        let err = run
            .wait_with(|e| delivered |= matches!(e, PipelineEvent::Delivered(_)))
            .unwrap_err();
        assert!(matches!(err, BatcallError::Cancelled));
        assert!(!delivered);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_joins_worker_promptly() {
        let timing = PipelineTiming {
            upload_step: Duration::from_secs(30),
            ..PipelineTiming::default()
        };
        let run = start(candidate(), Arc::new(FixedAnalyzer::new()), timing).unwrap();
        let started = Instant::now();
        run.cancel();
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_slow_analyzer_hits_ceiling() {
        let timing = PipelineTiming {
            phase_ceiling: Some(Duration::from_millis(30)),
            ..PipelineTiming::immediate()
        };
        let analyzer = FixedAnalyzer {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(200),
        };
        let run = start(candidate(), Arc::new(analyzer), timing).unwrap();

        match run.wait().unwrap_err() {
            BatcallError::PipelineFailed { message } => assert!(message.contains("Processing")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stuck_analyzer_times_out_at_ceiling() {
        let timing = PipelineTiming {
            phase_ceiling: Some(Duration::from_millis(100)),
            ..PipelineTiming::immediate()
        };
        let (analyzer, _entered) = stalling(Duration::from_secs(3));
        let started = Instant::now();
        let run = start(candidate(), analyzer, timing).unwrap();

        match run.wait().unwrap_err() {
            BatcallError::PipelineFailed { message } => {
                assert!(message.contains("Processing"), "{message}");
                assert!(!message.contains("late"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_cancel_does_not_wait_for_analyzer() {
        let timing = PipelineTiming {
            phase_ceiling: None,
            ..PipelineTiming::immediate()
        };
        let (analyzer, entered) = stalling(Duration::from_secs(3));
        let run = start(candidate(), analyzer, timing).unwrap();
        entered.recv_timeout(Duration::from_secs(10)).unwrap();

        let started = Instant::now();
        run.cancel();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_drop_does_not_wait_for_analyzer() {
        let (analyzer, entered) = stalling(Duration::from_secs(3));
        let run = start(candidate(), analyzer, PipelineTiming::immediate()).unwrap();
        entered.recv_timeout(Duration::from_secs(10)).unwrap();

        let started = Instant::now();
        let token = run.cancel_handle();
        drop(run);
        assert!(token.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_cancel_during_analyzer_call_reports_cancelled() {
        let (analyzer, entered) = stalling(Duration::from_secs(3));
        let run = start(candidate(), analyzer, PipelineTiming::immediate()).unwrap();
        entered.recv_timeout(Duration::from_secs(10)).unwrap();
        run.cancel_handle().cancel();

        let started = Instant::now();
        let mut failed = false;
        let err = run
            .wait_with(|e| failed |= matches!(e, PipelineEvent::Failed { .. }))
            .unwrap_err();
        assert!(matches!(err, BatcallError::Cancelled));
        assert!(!failed);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_cancel_during_processing_never_delivers() {
        let timing = PipelineTiming {
            processing_step: Duration::from_millis(50),
            ..PipelineTiming::immediate()
        };
        let analyzer = Arc::new(FixedAnalyzer::new());
        let run = start(candidate(), analyzer.clone(), timing).unwrap();

        loop {
            let event = run.events().recv().unwrap();
            if matches!(
                event,
                PipelineEvent::Progress {
                    phase: PhaseKind::Processing,
                    ..
                }
            ) {
                break;
            }
        }
        run.cancel_handle().cancel();

        let mut delivered = false;
        let err = run
            .wait_with(|e| delivered |= matches!(e, PipelineEvent::Delivered(_)))
            .unwrap_err();
        assert!(matches!(err, BatcallError::Cancelled));
        assert!(!delivered);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_during_finalize_never_delivers() {
        let timing = PipelineTiming {
            finalize_delay: Duration::from_secs(30),
            ..PipelineTiming::immediate()
        };
        let analyzer = Arc::new(FixedAnalyzer::new());
        let run = start(candidate(), analyzer.clone(), timing).unwrap();
        let cell = run.phase_cell();

        loop {
            let event = run.events().recv().unwrap();
            assert!(!matches!(event, PipelineEvent::Delivered(_)));
            if matches!(event, PipelineEvent::PhaseEntered(PhaseKind::Complete)) {
                break;
            }
        }
        run.cancel_handle().cancel();

        let started = Instant::now();
        let mut delivered = false;
        let err = run
            .wait_with(|e| delivered |= matches!(e, PipelineEvent::Delivered(_)))
            .unwrap_err();
        assert!(matches!(err, BatcallError::Cancelled));
        assert!(!delivered);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cell.get().kind(), PhaseKind::Complete);
    }

    #[test]
    fn test_scaled_timing() {
        let timing = PipelineTiming::default().scaled(0.1);
        assert_eq!(timing.upload_step, Duration::from_millis(20));
        assert_eq!(timing.processing_step, Duration::from_millis(100));
        assert_eq!(timing.phase_ceiling, Some(Duration::from_secs(60)));
        assert_eq!(PipelineTiming::immediate().finalize_delay, Duration::ZERO);
    }
}
