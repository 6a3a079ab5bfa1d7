// Session context: owns the aggregate tables, the cached pool and the pulse
// sink for one loaded history, plus the async loader that builds it.

use crate::analyzer::{self, AnalysisError, AnalysisResult, RecommendationTally};
use crate::checker::{self, CheckResult};
use crate::config::Config;
use crate::draw::DrawRecord;
use crate::explorer::{self, DrawFilter};
use crate::generator::{self, GenerateError, GenerationOutcome, GenerationRequest, GeneratorContext};
use crate::ingest::{self, IngestError};
use crate::pool::WeightedPool;
use crate::pulse::{self, PulseClient, PulseSink};
use crate::stats::{Distributions, Stats};
use crate::temperature::{self, NumberTemperature};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("draw {0} not found")]
    DrawNotFound(String),

    #[error("session failed to load: {0}")]
    LoadFailed(String),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    stats: Stats,
    pool: WeightedPool,
    config: Config,
    pulse: Arc<dyn PulseSink>,
    pending_pulses: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Build every table from `history` and cache the weighted pool.
    pub fn from_history(history: Vec<DrawRecord>, config: Config, pulse: Arc<dyn PulseSink>) -> Self {
        let stats = Stats::build(history, &config.analysis);
        let pool = WeightedPool::build(
            &stats.frequency,
            &stats.recent_frequency,
            config.analysis.pool_recent_weight,
        );
        info!(pool_size = pool.len(), "weighted pool ready");
        Session {
            stats,
            pool,
            config,
            pulse,
            pending_pulses: Mutex::new(Vec::new()),
        }
    }

    /// Load the history CSV named by the config (relative to `base_dir`) and
    /// build a session around it. The pulse sink comes from the config.
    pub fn load(base_dir: &Path, config: Config) -> Result<Self, SessionError> {
        let path = base_dir.join(&config.data.draws_csv);
        let history = ingest::load_history(&path)?;
        let pulse: Arc<dyn PulseSink> = Arc::new(PulseClient::from_config(&config.pulse));
        Ok(Session::from_history(history, config, pulse))
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn pool(&self) -> &WeightedPool {
        &self.pool
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn distributions(&self) -> &Distributions {
        &self.stats.distributions
    }

    pub fn analyze(&self, combination: &[u8]) -> Result<AnalysisResult, AnalysisError> {
        analyzer::analyze(
            combination,
            &self.stats.distributions,
            &self.config.analysis.scoring,
        )
    }

    pub fn analyze_ticket(&self, numbers: &[u8]) -> Result<RecommendationTally, AnalysisError> {
        analyzer::analyze_ticket(numbers, &self.stats.distributions, &self.config.analysis.scoring)
    }

    fn generator_context(&self) -> GeneratorContext<'_> {
        GeneratorContext {
            pool: &self.pool,
            distributions: &self.stats.distributions,
            generator: &self.config.generator,
            scoring: &self.config.analysis.scoring,
        }
    }

    /// Run one generation on the current thread and pulse the result.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        request: &GenerationRequest,
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> Result<GenerationOutcome, GenerateError> {
        let outcome = generator::generate(request, self.generator_context(), rng, cancel)?;
        info!(
            attempts = outcome.attempts,
            size = outcome.numbers.len(),
            "combination generated"
        );
        if let Some(task) = pulse::fire(Arc::clone(&self.pulse), outcome.numbers.clone()) {
            let mut pending = self.pending_pulses.lock().unwrap_or_else(|e| e.into_inner());
            pending.retain(|task| !task.is_finished());
            pending.push(task);
        }
        Ok(outcome)
    }

    /// Wait up to `timeout` for pulses still in flight. Returns how many
    /// finished; the rest are aborted.
    pub async fn flush_pulses(&self, timeout: Duration) -> usize {
        let tasks: Vec<JoinHandle<()>> = {
            let mut pending = self.pending_pulses.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain(..).collect()
        };
        if tasks.is_empty() {
            return 0;
        }
        let total = tasks.len();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut finished = 0;
        for mut task in tasks {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(_) => finished += 1,
                Err(_) => task.abort(),
            }
        }
        if finished < total {
            warn!(finished, total, "pulses still pending at shutdown");
        } else {
            debug!(finished, "pulses flushed");
        }
        finished
    }

    /// Every recorded draw where a freshly generated six-number combination
    /// would have matched something. Larger tickets have no single play to
    /// check and yield `None`.
    pub fn generation_hits(
        &self,
        outcome: &GenerationOutcome,
    ) -> Result<Option<Vec<CheckResult>>, AnalysisError> {
        if outcome.numbers.len() != crate::draw::NUMBERS_PER_DRAW {
            return Ok(None);
        }
        self.historical_hits(&outcome.numbers).map(Some)
    }

    /// Start a generation on the blocking pool. A `seed` makes it
    /// reproducible.
    pub fn spawn_generate(
        self: &Arc<Self>,
        request: GenerationRequest,
        seed: Option<u64>,
    ) -> GenerationHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let session = Arc::clone(self);
        let flag = Arc::clone(&cancel);
        let task = tokio::task::spawn_blocking(move || {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            session.generate_with(&request, &mut rng, &flag)
        });
        GenerationHandle { cancel, task }
    }

    pub fn find_draw(&self, draw_id: &str) -> Option<&DrawRecord> {
        self.stats.find_draw(draw_id.trim())
    }

    /// Check a play against the draw with `draw_id`.
    pub fn check_play(&self, play: &[u8], draw_id: &str) -> Result<CheckResult, SessionError> {
        let draw = self
            .find_draw(draw_id)
            .ok_or_else(|| SessionError::DrawNotFound(draw_id.trim().to_string()))?;
        Ok(checker::check_play(play, draw)?)
    }

    pub fn historical_hits(&self, play: &[u8]) -> Result<Vec<CheckResult>, AnalysisError> {
        checker::historical_hits(play, &self.stats.history)
    }

    pub fn explore(&self, filter: &DrawFilter) -> Vec<&DrawRecord> {
        explorer::filter(&self.stats.history, filter)
    }

    pub fn temperatures(&self) -> Vec<NumberTemperature> {
        temperature::classify(&self.stats.predictive_index)
    }
}

// ---------------------------------------------------------------------------
// GenerationHandle
// ---------------------------------------------------------------------------

/// A running generation. Dropping the handle does not stop the worker; call
/// [`GenerationHandle::cancel`].
pub struct GenerationHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Result<GenerationOutcome, GenerateError>>,
}

/// Cancels a running generation from anywhere, even after its handle has
/// been consumed by [`GenerationHandle::join`].
#[derive(Debug, Clone)]
pub struct GenerationCanceller(Arc<AtomicBool>);

impl GenerationCanceller {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl GenerationHandle {
    /// Ask the worker to stop at its next cancellation check.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn canceller(&self) -> GenerationCanceller {
        GenerationCanceller(Arc::clone(&self.cancel))
    }

    pub async fn join(self) -> Result<GenerationOutcome, GenerateError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(GenerateError::Worker(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionLoader
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum LoadState {
    Loading,
    Ready(Arc<Session>),
    Failed(String),
}

/// Loads a session in the background and lets any number of callers await
/// the result.
#[derive(Clone)]
pub struct SessionLoader {
    rx: watch::Receiver<LoadState>,
}

impl SessionLoader {
    /// Start loading `config.data.draws_csv` relative to `base_dir`.
    pub fn spawn(base_dir: impl AsRef<Path>, config: Config) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        Self::spawn_with(move || Session::load(&base_dir, config))
    }

    /// Start loading with a custom build step.
    pub fn spawn_with<F>(build: F) -> Self
    where
        F: FnOnce() -> Result<Session, SessionError> + Send + 'static,
    {
        let (tx, rx) = watch::channel(LoadState::Loading);
        tokio::spawn(async move {
            let state = match tokio::task::spawn_blocking(build).await {
                Ok(Ok(session)) => {
                    info!(draws = session.stats.history.len(), "session ready");
                    LoadState::Ready(Arc::new(session))
                }
                Ok(Err(e)) => {
                    error!("session load failed: {e}");
                    LoadState::Failed(e.to_string())
                }
                Err(e) => {
                    error!("session loader panicked: {e}");
                    LoadState::Failed(e.to_string())
                }
            };
            let _ = tx.send(state);
        });
        SessionLoader { rx }
    }

    pub fn state(&self) -> LoadState {
        self.rx.borrow().clone()
    }

    /// Wait until loading finishes.
    pub async fn wait_ready(&mut self) -> Result<Arc<Session>, SessionError> {
        let state = self
            .rx
            .wait_for(|s| !matches!(s, LoadState::Loading))
            .await
            .map_err(|_| SessionError::LoadFailed("loader stopped before finishing".into()))?;
        match &*state {
            LoadState::Ready(session) => Ok(Arc::clone(session)),
            LoadState::Failed(message) => Err(SessionError::LoadFailed(message.clone())),
            LoadState::Loading => Err(SessionError::LoadFailed("still loading".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::is_valid_number;
    use crate::generator::TicketReport;
    use crate::pulse::tests::RecordingSink;

    fn history() -> Vec<DrawRecord> {
        [
            [3, 11, 19, 27, 38, 52],
            [5, 14, 22, 31, 44, 56],
            [2, 9, 23, 30, 41, 49],
            [7, 16, 25, 33, 40, 51],
        ]
        .iter()
        .enumerate()
        .map(|(i, main)| DrawRecord {
            draw_id: (200 - i).to_string(),
            date: None,
            main_numbers: main.to_vec(),
            bonus_number: Some(1),
            secondary_numbers: None,
            tertiary_numbers: None,
        })
        .collect()
    }

    fn session_with(sink: Arc<RecordingSink>) -> Arc<Session> {
        Arc::new(Session::from_history(history(), Config::default(), sink))
    }

    #[tokio::test]
    async fn spawned_generation_pulses_result() {
        let sink = Arc::new(RecordingSink::default());
        let session = session_with(sink.clone());
        let outcome = session
            .spawn_generate(GenerationRequest::new(6), Some(11))
            .join()
            .await
            .unwrap();
        assert_eq!(outcome.numbers.len(), 6);
        assert!(outcome.numbers.iter().all(|&n| is_valid_number(n)));
        assert!(matches!(outcome.report, TicketReport::Single(_)));

        // let the background pulse task run
        for _ in 0..50 {
            if !sink.pulses.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let pulses = sink.pulses.lock().unwrap();
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].numbers, outcome.numbers);
    }

    /// Sink that takes a while before recording, like a slow endpoint.
    struct SlowSink {
        inner: RecordingSink,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl PulseSink for SlowSink {
        async fn record(&self, pulse: &pulse::Pulse) -> anyhow::Result<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.record(pulse).await
        }
    }

    fn slow_session(delay: Duration) -> (Arc<SlowSink>, Arc<Session>) {
        let sink = Arc::new(SlowSink {
            inner: RecordingSink::default(),
            delay,
        });
        let session = Arc::new(Session::from_history(history(), Config::default(), sink.clone()));
        (sink, session)
    }

    #[test]
    fn flushed_pulse_survives_runtime_shutdown() {
        let (sink, session) = slow_session(Duration::from_millis(20));
        let rt = tokio::runtime::Runtime::new().unwrap();
        let flushed = rt.block_on(async {
            session
                .spawn_generate(GenerationRequest::new(6), Some(3))
                .join()
                .await
                .unwrap();
            session.flush_pulses(Duration::from_secs(2)).await
        });
        drop(rt);
        assert_eq!(flushed, 1);
        assert_eq!(sink.inner.pulses.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn flush_gives_up_after_timeout() {
        let (sink, session) = slow_session(Duration::from_secs(30));
        session
            .spawn_generate(GenerationRequest::new(6), Some(3))
            .join()
            .await
            .unwrap();
        assert_eq!(session.flush_pulses(Duration::from_millis(10)).await, 0);
        assert!(sink.inner.pulses.lock().unwrap().is_empty());
        // nothing left to wait for
        assert_eq!(session.flush_pulses(Duration::from_millis(10)).await, 0);
    }

    #[tokio::test]
    async fn six_number_generation_reports_history_hits() {
        let session = session_with(Arc::new(RecordingSink::default()));
        let mut request = GenerationRequest::new(6);
        request.included = vec![3, 5];
        let outcome = session.spawn_generate(request, Some(9)).join().await.unwrap();
        let hits = session.generation_hits(&outcome).unwrap().unwrap();
        assert!(hits.iter().any(|h| h.draw_id == "200"));
        assert!(hits.iter().any(|h| h.draw_id == "199"));

        let eight = session
            .spawn_generate(GenerationRequest::new(8), Some(9))
            .join()
            .await
            .unwrap();
        assert!(session.generation_hits(&eight).unwrap().is_none());
    }

    #[tokio::test]
    async fn seeded_generation_is_reproducible() {
        let session = session_with(Arc::new(RecordingSink::default()));
        let a = session
            .spawn_generate(GenerationRequest::new(8), Some(5))
            .join()
            .await
            .unwrap();
        let b = session
            .spawn_generate(GenerationRequest::new(8), Some(5))
            .join()
            .await
            .unwrap();
        assert_eq!(a.numbers, b.numbers);
    }

    #[tokio::test]
    async fn cancelled_generation_stops() {
        let mut config = Config::default();
        config.generator.cancel_check_interval = 1;
        let session = Arc::new(Session::from_history(
            history(),
            config,
            Arc::new(RecordingSink::default()),
        ));
        let mut request = GenerationRequest::new(6);
        request.criteria.sum_range = Some(crate::generator::SumRange { min: 0, max: 20 });

        let handle = session.spawn_generate(request, Some(1));
        let canceller = handle.canceller();
        let join = handle.join();
        canceller.cancel();
        match join.await {
            Err(GenerateError::Cancelled) => {}
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_generation_does_not_pulse() {
        let sink = Arc::new(RecordingSink::default());
        let session = session_with(sink.clone());
        let mut request = GenerationRequest::new(6);
        request.included = vec![4];
        request.excluded = vec![4];
        assert!(session.spawn_generate(request, None).join().await.is_err());
        tokio::task::yield_now().await;
        assert!(sink.pulses.lock().unwrap().is_empty());
    }

    #[test]
    fn check_play_looks_up_draws() {
        let session = session_with(Arc::new(RecordingSink::default()));
        let result = session.check_play(&[3, 11, 19, 27, 38, 1], " 200 ").unwrap();
        assert_eq!(result.main_display(), "5+1");

        assert!(matches!(
            session.check_play(&[1, 2, 3, 4, 5, 6], "999"),
            Err(SessionError::DrawNotFound(_))
        ));
        assert!(matches!(
            session.check_play(&[1, 2, 3], "200"),
            Err(SessionError::Analysis(_))
        ));
    }

    #[test]
    fn explore_and_temperatures() {
        let session = session_with(Arc::new(RecordingSink::default()));
        let filter = DrawFilter {
            number: Some(22),
            ..DrawFilter::default()
        };
        let found = session.explore(&filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].draw_id, "199");
        assert_eq!(session.temperatures().len(), 56);
        assert_eq!(session.historical_hits(&[3, 5, 2, 7, 50, 53]).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn loader_publishes_ready_session() {
        let mut loader = SessionLoader::spawn_with(|| {
            Ok(Session::from_history(
                history(),
                Config::default(),
                Arc::new(PulseClient::Disabled),
            ))
        });
        let session = loader.wait_ready().await.unwrap();
        assert_eq!(session.stats().complete_draws, 4);
        assert!(matches!(loader.state(), LoadState::Ready(_)));

        // a second waiter sees the same result
        let mut other = loader.clone();
        assert!(other.wait_ready().await.is_ok());
    }

    #[tokio::test]
    async fn loader_reports_failure() {
        let mut loader = SessionLoader::spawn(
            std::env::temp_dir().join("melator_missing_base"),
            Config::default(),
        );
        let err = loader.wait_ready().await.err().expect("load should fail");
        assert!(matches!(err, SessionError::LoadFailed(_)));
        assert!(matches!(loader.state(), LoadState::Failed(_)));
    }
}
