use crate::collaborators::{SpeechGenerator, TextExtractor};
use crate::config::SessionConfig;
use crate::messages::{ControlMsg, DisplayCommand, GenerateRequest, GenerationChunk, GenerationEvent};
use parking_lot::RwLock;
use readalong_audio::{OutputSink, PlaybackController, PlaybackEvent};
use readalong_foundation::{PlaybackState, ReadalongError, SessionError};
use readalong_foundation::StateTracker;
use readalong_scheduler::{HighlightEvent, HighlightScheduler, SchedulerConfig, SharedTimings};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Channels the host uses to talk to a running orchestrator.
pub struct SessionHandle {
    pub control: mpsc::Sender<ControlMsg>,
    pub display: mpsc::UnboundedReceiver<DisplayCommand>,
}

#[derive(Debug, Default)]
struct SessionStats {
    chunks: u64,
    degraded_chunks: u64,
    highlights: u64,
}

struct SetupOutcome<X, G> {
    generation_id: u64,
    extractor: X,
    generator: G,
    result: Result<mpsc::Receiver<GenerationEvent>, SessionError>,
}

/// The session state machine.
///
/// Owns the playback controller and the highlight scheduler exclusively
/// for the lifetime of one session; collaborators are injected, never
/// looked up. At most one non-stopped session exists: a play request
/// while loading or playing is a no-op. All terminal conditions funnel
/// through one teardown path that stops audio, cancels the scheduler,
/// resets highlighting, and lands in `Stopped`.
pub struct PlaybackOrchestrator<S: OutputSink, X: TextExtractor, G: SpeechGenerator> {
    config: SessionConfig,
    state: StateTracker,
    controller: PlaybackController<S>,
    playback_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
    scheduler: HighlightScheduler,
    highlight_rx: mpsc::UnboundedReceiver<HighlightEvent>,
    timings: SharedTimings,
    generation_id: Arc<AtomicU64>,
    stream_complete: Arc<AtomicBool>,
    extractor: Option<X>,
    generator: Option<G>,
    control_rx: mpsc::Receiver<ControlMsg>,
    display_tx: mpsc::UnboundedSender<DisplayCommand>,
    setup_tx: mpsc::Sender<SetupOutcome<X, G>>,
    setup_rx: mpsc::Receiver<SetupOutcome<X, G>>,
    generation_rx: Option<mpsc::Receiver<GenerationEvent>>,
    /// Index of the last highlight emitted, preserved across pause.
    current_word_index: Option<usize>,
    /// Where the next chunk's words continue numbering.
    next_word_index: usize,
    /// Where the next chunk lands on the session timeline.
    next_time_offset_ms: u64,
    /// A play request that arrived while a superseded session's setup
    /// task still held the collaborators; honored on their return.
    pending_play: bool,
    stats: SessionStats,
}

impl<S, X, G> PlaybackOrchestrator<S, X, G>
where
    S: OutputSink + 'static,
    X: TextExtractor + 'static,
    G: SpeechGenerator + 'static,
{
    pub fn new(
        controller: PlaybackController<S>,
        extractor: X,
        generator: G,
        config: SessionConfig,
    ) -> (Self, SessionHandle) {
        let (control_tx, control_rx) = mpsc::channel(16);
        let (display_tx, display_rx) = mpsc::unbounded_channel();
        let (setup_tx, setup_rx) = mpsc::channel(1);

        let mut controller = controller.with_position_update_interval(config.position_update_ms);
        let playback_rx = controller
            .take_events()
            .unwrap_or_else(|| mpsc::unbounded_channel().1);

        let timings: SharedTimings = Arc::new(RwLock::new(Vec::new()));
        let generation_id = Arc::new(AtomicU64::new(0));
        let stream_complete = Arc::new(AtomicBool::new(false));

        let scheduler_config = SchedulerConfig {
            lead_ms: config.lead_ms,
            scroll_every: config.scroll_every,
            scroll_debounce: Duration::from_millis(config.scroll_debounce_ms),
            ..SchedulerConfig::default()
        };
        let (scheduler, highlight_rx) = HighlightScheduler::new(
            controller.clock(),
            timings.clone(),
            generation_id.clone(),
            stream_complete.clone(),
            scheduler_config,
        );

        (
            Self {
                config,
                state: StateTracker::new(),
                controller,
                playback_rx,
                scheduler,
                highlight_rx,
                timings,
                generation_id,
                stream_complete,
                extractor: Some(extractor),
                generator: Some(generator),
                control_rx,
                display_tx,
                setup_tx,
                setup_rx,
                generation_rx: None,
                current_word_index: None,
                next_word_index: 0,
                next_time_offset_ms: 0,
                pending_play: false,
                stats: SessionStats::default(),
            },
            SessionHandle {
                control: control_tx,
                display: display_rx,
            },
        )
    }

    pub async fn run(mut self) {
        tracing::info!(target: "session", "Orchestrator running");
        loop {
            let generation_open = self.generation_rx.is_some();
            tokio::select! {
                maybe_ctrl = self.control_rx.recv() => {
                    match maybe_ctrl {
                        Some(ControlMsg::Play) => self.handle_play(),
                        Some(ControlMsg::Pause) => self.handle_pause(),
                        Some(ControlMsg::Stop) => self.handle_stop(),
                        Some(ControlMsg::UserScrolled) => self.scheduler.note_user_scroll(),
                        None => {
                            tracing::info!(target: "session", "Control channel closed; shutting down");
                            break;
                        }
                    }
                }
                Some(outcome) = self.setup_rx.recv() => {
                    self.on_setup_outcome(outcome);
                }
                event = next_generation_event(&mut self.generation_rx), if generation_open => {
                    match event {
                        Some(event) => self.on_generation_event(event),
                        None => self.on_generation_stream_closed(),
                    }
                }
                Some(event) = self.highlight_rx.recv() => {
                    self.on_highlight(event);
                }
                Some(event) = self.playback_rx.recv() => {
                    self.on_playback_event(event);
                }
            }
        }
        if self.state.current() != PlaybackState::Stopped {
            self.teardown("shutdown");
        }
    }

    // ── control ──

    fn handle_play(&mut self) {
        match self.state.current() {
            PlaybackState::Stopped => self.start_session(),
            PlaybackState::Paused => self.resume_session(),
            PlaybackState::Loading | PlaybackState::Playing => {
                // Single-session rule: no second GENERATE, nothing changes.
                tracing::debug!(target: "session", "Play ignored; session already active");
            }
        }
    }

    fn start_session(&mut self) {
        let (extractor, generator) = match (self.extractor.take(), self.generator.take()) {
            (Some(extractor), Some(generator)) => (extractor, generator),
            (extractor, generator) => {
                self.extractor = extractor;
                self.generator = generator;
                tracing::info!(
                    target: "session",
                    "Previous setup still in flight; play queued until it resolves"
                );
                self.pending_play = true;
                return;
            }
        };
        self.pending_play = false;

        let generation = self.generation_id.fetch_add(1, Ordering::AcqRel) + 1;
        self.timings.write().clear();
        self.current_word_index = None;
        self.next_word_index = 0;
        self.next_time_offset_ms = 0;
        self.stream_complete.store(false, Ordering::Release);
        self.stats = SessionStats::default();

        if let Err(e) = self.state.transition(PlaybackState::Loading) {
            tracing::error!(target: "session", "Refusing to start session: {}", e);
            self.extractor = Some(extractor);
            self.generator = Some(generator);
            return;
        }
        self.send_state();
        tracing::info!(target: "session", "Session {} loading", generation);

        let voice_id = self.config.voice_id.clone();
        let speed = self.config.speed;
        let setup_tx = self.setup_tx.clone();
        tokio::spawn(async move {
            let (extractor, generator, result) =
                run_setup(extractor, generator, voice_id, speed).await;
            let _ = setup_tx
                .send(SetupOutcome {
                    generation_id: generation,
                    extractor,
                    generator,
                    result,
                })
                .await;
        });
    }

    fn resume_session(&mut self) {
        if let Err(e) = self.controller.play() {
            self.abort_session(e.into());
            return;
        }
        if let Err(e) = self.state.transition(PlaybackState::Playing) {
            tracing::error!(target: "session", "Resume rejected: {}", e);
            return;
        }
        self.send_state();
        // Recompute the whole remaining schedule against the live clock;
        // stale timers from before the pause are worthless after any
        // wall-clock drift (system sleep included).
        let from = self.current_word_index.map(|i| i + 1).unwrap_or(0);
        self.scheduler
            .start(from, self.generation_id.load(Ordering::Acquire));
    }

    fn handle_pause(&mut self) {
        if self.state.current() != PlaybackState::Playing {
            tracing::debug!(target: "session", "Pause ignored in state {}", self.state.current());
            return;
        }
        self.scheduler.cancel();
        self.controller.pause();
        if let Err(e) = self.state.transition(PlaybackState::Paused) {
            tracing::error!(target: "session", "Pause transition rejected: {}", e);
            return;
        }
        self.send_state();
    }

    fn handle_stop(&mut self) {
        // A stop also cancels any play still waiting on collaborators.
        self.pending_play = false;
        if self.state.current() == PlaybackState::Stopped {
            tracing::debug!(target: "session", "Stop ignored; already stopped");
            return;
        }
        self.teardown("user stop");
    }

    // ── setup / generation ──

    fn on_setup_outcome(&mut self, outcome: SetupOutcome<X, G>) {
        self.extractor = Some(outcome.extractor);
        self.generator = Some(outcome.generator);

        let current = self.generation_id.load(Ordering::Acquire);
        if outcome.generation_id != current || self.state.current() != PlaybackState::Loading {
            tracing::debug!(
                target: "session",
                "Discarding stale setup outcome for generation {}",
                outcome.generation_id
            );
            if self.pending_play && self.state.current() == PlaybackState::Stopped {
                tracing::debug!(target: "session", "Starting queued play request");
                self.pending_play = false;
                self.start_session();
            }
            return;
        }

        match outcome.result {
            Ok(rx) => {
                if let Some(generator) = self.generator.as_ref() {
                    tracing::debug!(
                        target: "session",
                        "Generation stream open (backend: {})",
                        generator.backend_name()
                    );
                }
                self.generation_rx = Some(rx);
            }
            Err(e) => self.abort_session(e.into()),
        }
    }

    fn on_generation_event(&mut self, event: GenerationEvent) {
        match event {
            GenerationEvent::Chunk(chunk) => self.on_chunk(chunk),
            GenerationEvent::Complete => {
                tracing::info!(
                    target: "session",
                    "Generation complete after {} chunks",
                    self.stats.chunks
                );
                self.stream_complete.store(true, Ordering::Release);
                self.controller.mark_end_of_input();
                self.generation_rx = None;
            }
            GenerationEvent::Error { code, message } => {
                let err = if code == "model_unavailable" {
                    SessionError::ModelUnavailable { message }
                } else {
                    SessionError::Generation { code, message }
                };
                self.abort_session(err.into());
            }
        }
    }

    fn on_chunk(&mut self, chunk: GenerationChunk) {
        if self.state.current() == PlaybackState::Stopped {
            tracing::debug!(target: "session", "Chunk after stop discarded");
            return;
        }
        self.stats.chunks += 1;
        self.controller.enqueue(&chunk.samples);

        // First chunk bounds time-to-first-audio: start output and the
        // scheduler now, without waiting for the stream to finish.
        let was_loading = self.state.current() == PlaybackState::Loading;
        if was_loading {
            if let Err(e) = self.controller.play() {
                self.abort_session(e.into());
                return;
            }
            if let Err(e) = self.state.transition(PlaybackState::Playing) {
                tracing::error!(target: "session", "Transition to playing rejected: {}", e);
                return;
            }
            self.send_state();
        }

        let duration = readalong_timing::chunk_duration_ms(
            chunk.samples.len(),
            self.controller.sample_rate(),
        );
        let report = readalong_timing::estimate(
            &chunk.source_text,
            &chunk.phonemes,
            duration,
            self.next_word_index,
            self.next_time_offset_ms,
        );
        if report.degraded {
            self.stats.degraded_chunks += 1;
        }
        tracing::debug!(
            target: "session",
            "Chunk {}: {} words over {} ms at offset {} ms",
            self.stats.chunks,
            report.timings.len(),
            duration,
            self.next_time_offset_ms
        );
        self.next_word_index += report.timings.len();
        self.next_time_offset_ms += duration;
        self.timings.write().extend(report.timings);

        if was_loading {
            self.scheduler
                .start(0, self.generation_id.load(Ordering::Acquire));
        }
    }

    fn on_generation_stream_closed(&mut self) {
        self.generation_rx = None;
        if self.stream_complete.load(Ordering::Acquire)
            || self.state.current() == PlaybackState::Stopped
        {
            return;
        }
        self.abort_session(
            SessionError::Generation {
                code: "stream_closed".to_string(),
                message: "generation stream closed before completion".to_string(),
            }
            .into(),
        );
    }

    // ── highlight / playback observers ──

    fn on_highlight(&mut self, event: HighlightEvent) {
        // A fire already delivered to the channel when the schedule was
        // torn down would otherwise trail the reset.
        if self.state.current() == PlaybackState::Stopped {
            tracing::debug!(target: "session", "Stale highlight event discarded");
            return;
        }
        match event {
            HighlightEvent::Word { index } => {
                self.current_word_index = Some(index);
                self.stats.highlights += 1;
                let _ = self.display_tx.send(DisplayCommand::HighlightWord { index });
            }
            HighlightEvent::Scroll { index } => {
                let _ = self
                    .display_tx
                    .send(DisplayCommand::HighlightScroll { index });
            }
            HighlightEvent::Complete => {
                tracing::info!(target: "session", "All words spoken; session complete");
                self.teardown("complete");
            }
        }
    }

    fn on_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Position(ms) => {
                tracing::trace!(target: "session", "Position {} ms", ms);
            }
            PlaybackEvent::Ended => {
                // The scheduler's completion report is authoritative; the
                // drained queue is only worth a note.
                tracing::debug!(target: "session", "Audio queue drained");
            }
        }
    }

    // ── teardown funnel ──

    fn abort_session(&mut self, err: ReadalongError) {
        tracing::error!(
            target: "session",
            "Session aborted [{}/{}]: {}",
            err.subsystem(),
            err.code(),
            err
        );
        let _ = self.display_tx.send(DisplayCommand::SessionError {
            code: err.code().to_string(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
        });
        self.teardown("error");
    }

    /// The single funnel for user stop, natural completion, and terminal
    /// errors. Unconditionally stops audio, cancels scheduling, resets
    /// highlighting, and lands in `Stopped` — no partial state survives.
    fn teardown(&mut self, reason: &str) {
        self.scheduler.cancel();
        self.controller.stop();
        self.generation_rx = None;
        self.stream_complete.store(false, Ordering::Release);
        self.timings.write().clear();
        let _ = self.display_tx.send(DisplayCommand::HighlightReset);
        if self.state.current() != PlaybackState::Stopped {
            let _ = self.state.transition(PlaybackState::Stopped);
        }
        tracing::info!(
            target: "session",
            "Session ended ({}): {} chunks ({} degraded), {} highlights",
            reason,
            self.stats.chunks,
            self.stats.degraded_chunks,
            self.stats.highlights
        );
        self.current_word_index = None;
        self.next_word_index = 0;
        self.next_time_offset_ms = 0;
        self.send_state();
    }

    fn send_state(&self) {
        let _ = self.display_tx.send(DisplayCommand::StateChanged {
            state: self.state.current(),
            word_index: self.current_word_index,
        });
    }
}

async fn next_generation_event(
    rx: &mut Option<mpsc::Receiver<GenerationEvent>>,
) -> Option<GenerationEvent> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Extraction then generation, each with a single reacquire-and-retry on
/// a lost collaborator context. Runs off the orchestrator loop so control
/// messages keep interleaving while collaborators work.
async fn run_setup<X: TextExtractor, G: SpeechGenerator>(
    mut extractor: X,
    mut generator: G,
    voice_id: String,
    speed: f32,
) -> (X, G, Result<mpsc::Receiver<GenerationEvent>, SessionError>) {
    let extraction = match extractor.extract().await {
        Err(SessionError::ContextLost { collaborator }) => {
            tracing::warn!(
                target: "session",
                "Extraction context lost ({}); reacquiring once",
                collaborator
            );
            extractor.extract().await
        }
        other => other,
    };
    let extraction = match extraction {
        Ok(extraction) => extraction,
        Err(e) => return (extractor, generator, Err(e)),
    };
    tracing::info!(
        target: "session",
        "Extracted {} words",
        extraction.word_count
    );

    let request = GenerateRequest {
        text: extraction.text,
        voice_id,
        speed,
    };
    let stream = match generator.generate(request.clone()).await {
        Err(SessionError::ContextLost { collaborator }) => {
            tracing::warn!(
                target: "session",
                "Generator context lost ({}); recreating once",
                collaborator
            );
            generator.generate(request).await
        }
        other => other,
    };
    (extractor, generator, stream)
}
