//! Job poller
//!
//! Tracks one submitted job until it reaches a terminal status. A background
//! task ticks the [`PollingSession`], issues one status fetch at a time and
//! sleeps for the session's current interval between fetches.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lumen_core::domain::job::JobStatus;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{Clock, TokioClock};
use crate::config::PollerConfig;
use crate::error::{PollError, PollerError};
use crate::fetcher::StatusFetcher;
use crate::observer::JobObserver;
use crate::session::{
    Notification, PollOutcome, PollSnapshot, PollingSession, SessionState, TickDecision,
};

/// Polls the remote service for the status of one job at a time
///
/// Dropping the poller stops it.
pub struct JobPoller {
    fetcher: Arc<dyn StatusFetcher>,
    clock: Arc<dyn Clock>,
    config: PollerConfig,
    /// Session of the current run; every `start` installs a fresh one
    session: Mutex<Arc<Mutex<PollingSession>>>,
    run: Mutex<Option<Run>>,
}

/// Resources held while the background task is alive
struct Run {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl JobPoller {
    /// Creates a poller with the given fetcher and configuration
    pub fn new(fetcher: Arc<dyn StatusFetcher>, config: PollerConfig) -> Self {
        let session = Arc::new(Mutex::new(PollingSession::new(config.clone())));
        Self {
            fetcher,
            clock: Arc::new(TokioClock),
            config,
            session: Mutex::new(session),
            run: Mutex::new(None),
        }
    }

    /// Replaces the time source used for progress estimation
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts tracking `job_id`
    ///
    /// The first fetch is issued right away; later fetches follow the
    /// session's interval. A job that is already terminal is marked complete
    /// without any fetch. Starting while another job is tracked stops the
    /// previous session first; a fetch of that session still settling is
    /// applied to the old session only, never to the new one.
    ///
    /// Must be called from within a Tokio runtime, with a configuration that
    /// passes [`PollerConfig::validate`].
    pub fn start<O>(
        &self,
        job_id: impl Into<String>,
        initial_status: JobStatus,
        observer: O,
    ) -> Result<(), PollerError>
    where
        O: JobObserver + 'static,
    {
        let job_id = job_id.into();
        if job_id.trim().is_empty() {
            return Err(PollerError::EmptyJobId);
        }
        self.config
            .validate()
            .map_err(|e| PollerError::InvalidConfig(format!("{:#}", e)))?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PollerError::NoRuntime)?;

        self.stop();

        let mut fresh = PollingSession::new(self.config.clone());
        let state = fresh.begin(job_id.clone(), initial_status, self.clock.now());
        let session = Arc::new(Mutex::new(fresh));
        *lock(&self.session) = Arc::clone(&session);

        if state != SessionState::Active {
            info!(job_id = %job_id, status = %initial_status, "Job already terminal, not polling");
            return Ok(());
        }

        info!(job_id = %job_id, status = %initial_status, "Starting job polling");

        let cancel = CancellationToken::new();
        let driver = Driver {
            job_id,
            fetcher: Arc::clone(&self.fetcher),
            clock: Arc::clone(&self.clock),
            session,
            observer: Box::new(observer),
            cancel: cancel.clone(),
        };
        let task = runtime.spawn(driver.run());

        *lock(&self.run) = Some(Run {
            cancel,
            task: Some(task),
        });

        Ok(())
    }

    /// Stops tracking the current job
    ///
    /// Cancels the pending sleep and the in-flight fetch. No callback fires
    /// afterwards. Calling it again, or on an idle poller, does nothing.
    pub fn stop(&self) {
        if let Some(mut run) = lock(&self.run).take() {
            run.cancel.cancel();
            if let Some(task) = run.task.take() {
                task.abort();
            }
        }

        let session = self.current_session();
        let mut session = lock(&session);
        if session.stop() {
            debug!(job_id = %session.job().job_id, "Job polling stopped");
        }
    }

    /// Copy of the caller-visible state
    pub fn snapshot(&self) -> PollSnapshot {
        lock(&self.current_session()).snapshot()
    }

    /// Waits for the current session to end and returns how it ended
    ///
    /// Returns `None` if no job was ever started.
    pub async fn wait(&self) -> Option<PollOutcome> {
        let task = lock(&self.run).as_mut().and_then(|run| run.task.take());

        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("Job poller task panicked: {}", e);
                    lock(&self.current_session()).stop();
                }
            }
        }

        self.snapshot().outcome
    }

    fn current_session(&self) -> Arc<Mutex<PollingSession>> {
        lock(&self.session).clone()
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller")
            .field("session", &*lock(&self.current_session()))
            .finish_non_exhaustive()
    }
}

/// Background task of one session
struct Driver {
    job_id: String,
    fetcher: Arc<dyn StatusFetcher>,
    clock: Arc<dyn Clock>,
    session: Arc<Mutex<PollingSession>>,
    observer: Box<dyn JobObserver>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(self) {
        loop {
            let decision = lock(&self.session).tick(self.clock.now());
            let sequence = match decision {
                TickDecision::Fetch { sequence } => sequence,
                TickDecision::Finished(notifications) => {
                    self.dispatch(notifications);
                    break;
                }
                TickDecision::Skip => break,
            };

            debug!(job_id = %self.job_id, sequence, "Polling job status");

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.fetcher.fetch_status(&self.job_id) => result,
            };

            let notifications = {
                let mut session = lock(&self.session);
                match result {
                    Ok(report) => session.fetch_succeeded(sequence, report),
                    Err(e) => {
                        let message = format!("{:#}", e);
                        let notifications = session.fetch_failed(sequence, message.clone());
                        warn!(
                            job_id = %self.job_id,
                            sequence,
                            consecutive_errors = session.consecutive_error_count(),
                            "Job polling error: {}",
                            message
                        );
                        notifications
                    }
                }
            };
            self.dispatch(notifications);

            let Some(delay) = lock(&self.session).next_delay() else {
                break;
            };

            debug!(job_id = %self.job_id, delay_ms = delay.as_millis() as u64, "Next poll scheduled");

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let snapshot = lock(&self.session).snapshot();
        if let Some(outcome) = snapshot.outcome {
            info!(
                job_id = %self.job_id,
                %outcome,
                attempts = snapshot.attempt_count,
                "Job polling finished"
            );
        }
    }

    fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if self.cancel.is_cancelled() {
                return;
            }

            match notification {
                Notification::StatusChanged(status) => {
                    info!(job_id = %self.job_id, %status, "Job status changed");
                    self.observer.on_status_change(status);
                }
                Notification::Completed(job) => {
                    info!(job_id = %self.job_id, results = job.result_locations.len(), "Job completed");
                    self.observer.on_complete(&job);
                }
                Notification::Error(error) => {
                    log_error(&self.job_id, &error);
                    self.observer.on_error(&error);
                }
            }
        }
    }
}

fn log_error(job_id: &str, error: &PollError) {
    if error.is_terminal() {
        warn!(job_id, kind = %error.kind(), "{}", error);
    } else {
        debug!(job_id, kind = %error.kind(), "{}", error);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use lumen_core::domain::job::Job;
    use lumen_core::dto::job::JobStatusReport;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted response of one fetch
    enum Step {
        Report(JobStatusReport),
        Fail(&'static str),
        Hang,
    }

    /// Fetcher replaying a script; once exhausted it keeps answering `fallback`
    struct ScriptedFetcher {
        steps: Mutex<VecDeque<Step>>,
        fallback: fn() -> Step,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(steps: Vec<Step>, fallback: fn() -> Step) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                fallback,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusFetcher for ScriptedFetcher {
        async fn fetch_status(&self, _job_id: &str) -> anyhow::Result<JobStatusReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(self.fallback);

            match step {
                Step::Report(report) => Ok(report),
                Step::Fail(message) => Err(anyhow!(message)),
                Step::Hang => std::future::pending().await,
            }
        }
    }

    /// Fetcher holding back the answer for `job-a` on a blocking channel
    struct GatedFetcher {
        gate: Mutex<std::sync::mpsc::Receiver<JobStatusReport>>,
        calls: AtomicUsize,
    }

    impl GatedFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusFetcher for GatedFetcher {
        async fn fetch_status(&self, job_id: &str) -> anyhow::Result<JobStatusReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if job_id == "job-a" {
                let report = self.gate.lock().unwrap().recv()?;
                return Ok(report);
            }
            std::future::pending().await
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Status(JobStatus),
        Error(PollError),
        Complete(Job),
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn errors(&self) -> Vec<PollError> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Error(err) => Some(err),
                    _ => None,
                })
                .collect()
        }
    }

    impl JobObserver for Recorder {
        fn on_status_change(&self, status: JobStatus) {
            self.events.lock().unwrap().push(Event::Status(status));
        }

        fn on_error(&self, error: &PollError) {
            self.events.lock().unwrap().push(Event::Error(error.clone()));
        }

        fn on_complete(&self, job: &Job) {
            self.events.lock().unwrap().push(Event::Complete(job.clone()));
        }
    }

    fn running() -> Step {
        Step::Report(JobStatusReport::new(JobStatus::Running))
    }

    fn failing() -> Step {
        Step::Fail("connection refused")
    }

    fn hanging() -> Step {
        Step::Hang
    }

    fn poller(fetcher: &Arc<ScriptedFetcher>) -> JobPoller {
        JobPoller::new(fetcher.clone(), PollerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_initial_status_issues_no_fetch() {
        for status in [JobStatus::Succeeded, JobStatus::Failed] {
            let fetcher = ScriptedFetcher::new(vec![], running);
            let recorder = Arc::new(Recorder::default());
            let poller = poller(&fetcher);

            poller.start("job-0", status, recorder.clone()).unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;

            let snapshot = poller.snapshot();
            assert_eq!(fetcher.calls(), 0);
            assert_eq!(snapshot.progress_percent, 100);
            assert_eq!(snapshot.estimated_seconds_remaining, 0);
            assert!(!snapshot.is_polling);
            assert!(recorder.events().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_completes_once() {
        let fetcher = ScriptedFetcher::new(
            vec![Step::Report(
                JobStatusReport::new(JobStatus::Succeeded).with_result("https://x/a.png"),
            )],
            running,
        );
        let recorder = Arc::new(Recorder::default());
        let poller = poller(&fetcher);

        poller.start("job-1", JobStatus::Pending, recorder.clone()).unwrap();
        let outcome = poller.wait().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(outcome, Some(PollOutcome::Succeeded));
        assert_eq!(fetcher.calls(), 1);

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Event::Status(JobStatus::Succeeded));
        match &events[1] {
            Event::Complete(job) => {
                assert_eq!(job.job_id, "job-1");
                assert_eq!(job.result_locations[0].url, "https://x/a.png");
            }
            other => panic!("expected completion, got {:?}", other),
        }

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.progress_percent, 100);
        assert_eq!(snapshot.estimated_seconds_remaining, 0);
        assert_eq!(snapshot.status, JobStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate() {
        let fetcher = ScriptedFetcher::new(vec![], hanging);
        let poller = poller(&fetcher);

        poller.start("job-1", JobStatus::Pending, ()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(fetcher.calls(), 1);
        assert!(poller.snapshot().is_polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_failures_report_transient_and_keep_polling() {
        let fetcher = ScriptedFetcher::new(
            vec![failing(), failing(), failing()],
            hanging,
        );
        let recorder = Arc::new(Recorder::default());
        let poller = poller(&fetcher);

        poller.start("job-2", JobStatus::Running, recorder.clone()).unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            PollError::Transient { consecutive_errors: 3, .. }
        ));

        let snapshot = poller.snapshot();
        assert!(snapshot.is_polling);
        assert_eq!(snapshot.consecutive_error_count, 3);

        let config = PollerConfig::default();
        let expected = (0..3).fold(config.initial_interval, |d, _| config.next_interval(d));
        assert_eq!(snapshot.current_interval, expected);
        assert!(snapshot.current_interval <= config.max_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_stay_silent() {
        let fetcher = ScriptedFetcher::new(vec![failing(), failing()], hanging);
        let recorder = Arc::new(Recorder::default());
        let poller = poller(&fetcher);

        poller.start("job-2", JobStatus::Running, recorder.clone()).unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(recorder.events().is_empty());
        assert_eq!(poller.snapshot().last_error, None);
        assert_eq!(poller.snapshot().consecutive_error_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_errors_abandon_polling() {
        let fetcher = ScriptedFetcher::new(vec![], failing);
        let recorder = Arc::new(Recorder::default());
        let poller = poller(&fetcher);

        poller.start("job-3", JobStatus::Pending, recorder.clone()).unwrap();
        let outcome = poller.wait().await;
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(outcome, Some(PollOutcome::Abandoned));
        assert_eq!(fetcher.calls(), 10);

        let errors = recorder.errors();
        assert_eq!(errors.len(), 8);
        assert!(errors[..7].iter().all(|e| !e.is_terminal()));
        assert!(matches!(
            errors[7],
            PollError::Abandoned { consecutive_errors: 10, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_budget_ends_in_timeout() {
        let fetcher = ScriptedFetcher::new(vec![], running);
        let recorder = Arc::new(Recorder::default());
        let poller = poller(&fetcher);

        poller.start("job-4", JobStatus::Pending, recorder.clone()).unwrap();
        let outcome = poller.wait().await;

        assert_eq!(outcome, Some(PollOutcome::TimedOut));
        assert_eq!(fetcher.calls(), PollerConfig::default().max_attempts as usize);
        assert_eq!(
            recorder.errors(),
            vec![PollError::Timeout { attempts: 180 }]
        );
        assert!(poller.snapshot().progress_percent <= 95);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_ends_session() {
        let fetcher = ScriptedFetcher::new(
            vec![running(), Step::Report(JobStatusReport::new(JobStatus::Failed))],
            running,
        );
        let recorder = Arc::new(Recorder::default());
        let poller = poller(&fetcher);

        poller.start("job-5", JobStatus::Pending, recorder.clone()).unwrap();
        let outcome = poller.wait().await;

        assert_eq!(outcome, Some(PollOutcome::Failed));
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(
            recorder.events(),
            vec![
                Event::Status(JobStatus::Running),
                Event::Status(JobStatus::Failed),
                Event::Error(PollError::JobFailed {
                    job_id: "job-5".to_string()
                }),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_in_flight_fetch() {
        let fetcher = ScriptedFetcher::new(vec![], hanging);
        let recorder = Arc::new(Recorder::default());
        let poller = poller(&fetcher);

        poller.start("job-6", JobStatus::Pending, recorder.clone()).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetcher.calls(), 1);

        poller.stop();
        poller.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(fetcher.calls(), 1);
        assert!(recorder.events().is_empty());

        let snapshot = poller.snapshot();
        assert!(!snapshot.is_polling);
        assert_eq!(snapshot.outcome, Some(PollOutcome::Stopped));
        assert_eq!(snapshot.status, JobStatus::Pending);
        assert_eq!(poller.wait().await, Some(PollOutcome::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_between_fetches_prevents_next_fetch() {
        let fetcher = ScriptedFetcher::new(vec![], running);
        let recorder = Arc::new(Recorder::default());
        let poller = poller(&fetcher);

        poller.start("job-7", JobStatus::Pending, recorder.clone()).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        poller.stop();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(recorder.events(), vec![Event::Status(JobStatus::Running)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let fetcher = ScriptedFetcher::new(vec![], running);
        let recorder = Arc::new(Recorder::default());

        {
            let poller = poller(&fetcher);
            poller.start("job-8", JobStatus::Pending, recorder.clone()).unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_tracks_new_job_from_scratch() {
        let fetcher = ScriptedFetcher::new(vec![failing(), failing()], hanging);
        let poller = poller(&fetcher);

        poller.start("job-a", JobStatus::Pending, ()).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(poller.snapshot().consecutive_error_count, 2);

        poller.start("job-b", JobStatus::Running, ()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.job_id, "job-b");
        assert_eq!(snapshot.attempt_count, 1);
        assert_eq!(snapshot.consecutive_error_count, 0);
        assert!(snapshot.is_polling);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_restart_ignores_late_answer_for_previous_job() {
        let (release, gate) = std::sync::mpsc::channel();
        let fetcher = Arc::new(GatedFetcher {
            gate: Mutex::new(gate),
            calls: AtomicUsize::new(0),
        });
        let recorder = Arc::new(Recorder::default());
        let poller = JobPoller::new(fetcher.clone(), PollerConfig::default());

        poller.start("job-a", JobStatus::Pending, ()).unwrap();
        while fetcher.calls() < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        poller.start("job-b", JobStatus::Running, recorder.clone()).unwrap();
        while fetcher.calls() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        release
            .send(JobStatusReport::new(JobStatus::Succeeded).with_result("https://x/old-job-a.png"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.job_id, "job-b");
        assert_eq!(snapshot.status, JobStatus::Running);
        assert!(snapshot.result_locations.is_empty());
        assert!(snapshot.is_polling);
        assert_eq!(snapshot.outcome, None);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_polling() {
        let fetcher = ScriptedFetcher::new(vec![], failing);
        let config = PollerConfig {
            backoff_multiplier: -1.0,
            ..Default::default()
        };
        let poller = JobPoller::new(fetcher.clone(), config);

        let err = poller.start("job-c", JobStatus::Pending, ()).unwrap_err();
        assert!(matches!(err, PollerError::InvalidConfig(_)));

        tokio::task::yield_now().await;
        assert_eq!(fetcher.calls(), 0);
        assert!(!poller.snapshot().is_polling);
    }

    #[tokio::test]
    async fn test_empty_job_id_is_rejected() {
        let fetcher = ScriptedFetcher::new(vec![], running);
        let poller = poller(&fetcher);

        let err = poller.start("  ", JobStatus::Pending, ()).unwrap_err();
        assert!(matches!(err, PollerError::EmptyJobId));
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_start_outside_runtime_is_rejected() {
        let fetcher = ScriptedFetcher::new(vec![], running);
        let poller = poller(&fetcher);

        let err = poller.start("job-9", JobStatus::Pending, ()).unwrap_err();
        assert!(matches!(err, PollerError::NoRuntime));
    }
}
