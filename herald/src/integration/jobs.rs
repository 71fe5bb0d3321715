use crate::{Event, Notifier, Submission};
use herald_core::ErrorFault;
use std::error::Error;

/// Tag of reports about failed background jobs.
pub const JOB_TAG: &str = "job";

/// Context key holding the job's name.
pub const JOB_CONTEXT_KEY: &str = "job";

/// Runs the job to completion and reports its error, if it fails. The job's
/// outcome is handed back untouched.
///
/// Nothing is reported unless the notifier declared the
/// [`jobs`](crate::integration::Capabilities::jobs) capability.
pub async fn watch<F, T, E>(notifier: &Notifier, job_name: &str, job: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Error + 'static,
{
    let outcome = job.await;

    if let Err(error) = &outcome {
        report_failure(notifier, job_name, error);
    }

    outcome
}

/// Reports a job failure directly, for runners that observe errors
/// themselves.
pub fn report_failure<E>(notifier: &Notifier, job_name: &str, error: &E) -> Option<Submission>
where
    E: Error + 'static,
{
    if !notifier.capabilities().jobs() {
        tracing::debug!(
            job = job_name,
            "Jobs capability not declared; job failure not reported",
        );
        return None;
    }

    let fault = ErrorFault::new(error);
    let event = Event::new(&fault)
        .with_tag(JOB_TAG)
        .with_context_entry(JOB_CONTEXT_KEY, job_name);

    Some(notifier.ingest(event))
}
