//! Background jobs with an observable status. No cancellation, no retries.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

pub type JobId = u64;

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
}

#[derive(Default)]
struct Jobs {
    next_id: JobId,
    records: HashMap<JobId, JobRecord>,
}

#[derive(Clone, Default)]
pub struct JobTracker {
    inner: Arc<Mutex<Jobs>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` on its own thread. The job is registered as pending before
    /// this returns. A panic inside `work` marks the job failed.
    pub fn spawn<F>(&self, name: impl Into<String>, work: F) -> (JobId, JoinHandle<()>)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let name = name.into();
        let id = {
            let mut jobs = self.lock();
            let id = jobs.next_id;
            jobs.next_id += 1;
            jobs.records.insert(
                id,
                JobRecord {
                    id,
                    name: name.clone(),
                    status: JobStatus::Pending,
                },
            );
            id
        };

        let tracker = self.clone();
        let handle = thread::spawn(move || {
            tracker.set(id, JobStatus::Running);
            tracing::info!(job = id, name = %name, "job started");
            let status = match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(Ok(())) => JobStatus::Done,
                Ok(Err(err)) => {
                    tracing::warn!(job = id, name = %name, error = %format!("{err:#}"), "job failed");
                    JobStatus::Failed(format!("{err:#}"))
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(job = id, name = %name, error = %message, "job panicked");
                    JobStatus::Failed(message)
                }
            };
            tracker.set(id, status);
        });
        (id, handle)
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.lock().records.get(&id).map(|r| r.status.clone())
    }

    /// Every job, ordered by id.
    pub fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.lock().records.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }

    fn set(&self, id: JobId, status: JobStatus) {
        if let Some(record) = self.lock().records.get_mut(&id) {
            record.status = status;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Jobs> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;

    #[test]
    fn status_moves_from_pending_to_done() {
        let tracker = JobTracker::new();
        let (release, gate) = mpsc::channel::<()>();
        let (started_tx, started) = mpsc::channel::<()>();
        let (id, handle) = tracker.spawn("render", move || {
            started_tx.send(())?;
            gate.recv()?;
            Ok(())
        });

        started.recv().unwrap();
        assert_eq!(tracker.status(id), Some(JobStatus::Running));
        release.send(()).unwrap();
        handle.join().unwrap();
        assert_eq!(tracker.status(id), Some(JobStatus::Done));
    }

    #[test]
    fn failure_is_recorded_with_message() {
        let tracker = JobTracker::new();
        let (id, handle) = tracker.spawn("benchmark", || anyhow::bail!("converter crashed"));
        handle.join().unwrap();
        assert_eq!(
            tracker.status(id),
            Some(JobStatus::Failed("converter crashed".to_string()))
        );
        assert!(tracker.status(id).unwrap().is_finished());
    }

    #[test]
    fn new_job_is_listed_before_it_finishes() {
        let tracker = JobTracker::new();
        let (release, gate) = mpsc::channel::<()>();
        let (id, handle) = tracker.spawn("slow", move || {
            gate.recv()?;
            Ok(())
        });
        assert!(matches!(
            tracker.status(id),
            Some(JobStatus::Pending) | Some(JobStatus::Running)
        ));
        assert_eq!(tracker.list()[0].name, "slow");

        release.send(()).unwrap();
        handle.join().unwrap();
        assert_eq!(tracker.list()[0].status, JobStatus::Done);
    }

    #[test]
    fn panicking_job_is_marked_failed() {
        let tracker = JobTracker::new();
        let (id, handle) = tracker.spawn("export", || -> anyhow::Result<()> {
            panic!("overlay canvas missing")
        });
        assert!(handle.join().is_ok());
        assert_eq!(
            tracker.status(id),
            Some(JobStatus::Failed("panicked: overlay canvas missing".to_string()))
        );
    }

    #[test]
    fn unknown_job_has_no_status() {
        assert_eq!(JobTracker::new().status(42), None);
    }
}
