//! Lifecycle callbacks of a tracked job

use lumen_core::domain::job::{Job, JobStatus};
use std::sync::Arc;

use crate::error::PollError;

/// Receives lifecycle events of a tracked job
///
/// All methods default to doing nothing. They are called from the poller's
/// task and must not block.
pub trait JobObserver: Send + Sync {
    /// The fetched status differs from the previously observed one
    fn on_status_change(&self, _status: JobStatus) {}

    /// Repeated transient failures, or the session ended unsuccessfully
    fn on_error(&self, _error: &PollError) {}

    /// The job succeeded; `job` carries its result locations
    fn on_complete(&self, _job: &Job) {}
}

/// No callbacks
impl JobObserver for () {}

impl<T: JobObserver + ?Sized> JobObserver for Arc<T> {
    fn on_status_change(&self, status: JobStatus) {
        (**self).on_status_change(status)
    }

    fn on_error(&self, error: &PollError) {
        (**self).on_error(error)
    }

    fn on_complete(&self, job: &Job) {
        (**self).on_complete(job)
    }
}

type StatusFn = Box<dyn Fn(JobStatus) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&PollError) + Send + Sync>;
type CompleteFn = Box<dyn Fn(&Job) + Send + Sync>;

/// Closure-based observer
///
/// ```
/// use lumen_poller::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .with_status_change(|status| println!("now {status}"))
///     .with_complete(|job| println!("done: {:?}", job.primary_result()));
/// ```
#[derive(Default)]
pub struct Callbacks {
    status_change: Option<StatusFn>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_change(mut self, f: impl Fn(JobStatus) + Send + Sync + 'static) -> Self {
        self.status_change = Some(Box::new(f));
        self
    }

    pub fn with_error(mut self, f: impl Fn(&PollError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn with_complete(mut self, f: impl Fn(&Job) + Send + Sync + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

impl JobObserver for Callbacks {
    fn on_status_change(&self, status: JobStatus) {
        if let Some(f) = &self.status_change {
            f(status);
        }
    }

    fn on_error(&self, error: &PollError) {
        if let Some(f) = &self.error {
            f(error);
        }
    }

    fn on_complete(&self, job: &Job) {
        if let Some(f) = &self.complete {
            f(job);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("status_change", &self.status_change.is_some())
            .field("error", &self.error.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_callbacks_route_to_closures() {
        let changes = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&changes);
        let callbacks = Callbacks::new().with_status_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        callbacks.on_status_change(JobStatus::Running);
        callbacks.on_complete(&Job::new("job-1", JobStatus::Succeeded));

        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_and_observer_methods_coexist() {
        let errors = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&errors);
        let callbacks = Callbacks::new()
            .with_error(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .with_complete(|_| {});
        let observer: &dyn JobObserver = &callbacks;

        observer.on_error(&PollError::Timeout { attempts: 180 });
        JobObserver::on_error(&callbacks, &PollError::Timeout { attempts: 180 });

        assert_eq!(errors.load(Ordering::SeqCst), 2);
        assert!(format!("{:?}", callbacks).contains("complete: true"));
    }
}
