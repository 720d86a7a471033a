//! Bounded-concurrency fan-out.
//!
//! Runs one task per input item, at most `limit` at a time, waits for all
//! of them and reports every outcome in input order. Failures never cancel
//! sibling tasks: the caller sees all successes and all failures together.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a single fan-out task did not produce a value.
#[derive(Debug)]
pub enum TaskError<E> {
    /// The operation itself returned an error.
    Failed(E),
    /// The per-task deadline expired before the operation finished.
    TimedOut(Duration),
    /// The task panicked or was cancelled by the runtime.
    Aborted(String),
}

impl<E> TaskError<E> {
    pub fn failed(&self) -> Option<&E> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for TaskError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Failed(e) => write!(f, "{e}"),
            TaskError::TimedOut(after) => write!(f, "timed out after {after:?}"),
            TaskError::Aborted(reason) => write!(f, "task aborted: {reason}"),
        }
    }
}

impl<E: Error + 'static> Error for TaskError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Several independent failures reported as one error.
///
/// Never empty: construct it through [`CompositeError::from_errors`].
#[derive(Debug)]
pub struct CompositeError<E> {
    errors: Vec<E>,
}

impl<E> CompositeError<E> {
    /// `None` when there is nothing to report.
    pub fn from_errors(errors: Vec<E>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }
}

impl<E: fmt::Display> fmt::Display for CompositeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.errors.as_slice() {
            return write!(f, "{only}");
        }
        write!(f, "{} failures: ", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl<E: Error + 'static> Error for CompositeError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.errors.first().map(|e| e as &(dyn Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of one fan-out pass. Slot `i` belongs to input item `i`.
#[derive(Debug)]
pub struct FanOutReport<R, E> {
    slots: Vec<Result<R, TaskError<E>>>,
}

impl<R, E> FanOutReport<R, E> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_err()).count()
    }

    pub fn slots(&self) -> &[Result<R, TaskError<E>>] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<Result<R, TaskError<E>>> {
        self.slots
    }

    /// Split into per-slot values (`None` where the task failed) and a
    /// single composite error covering every failure.
    pub fn into_parts(self) -> (Vec<Option<R>>, Result<(), CompositeError<TaskError<E>>>) {
        let mut values = Vec::with_capacity(self.slots.len());
        let mut errors = Vec::new();
        for slot in self.slots {
            match slot {
                Ok(value) => values.push(Some(value)),
                Err(e) => {
                    values.push(None);
                    errors.push(e);
                }
            }
        }
        match CompositeError::from_errors(errors) {
            Some(composite) => (values, Err(composite)),
            None => (values, Ok(())),
        }
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Admission-limited runner for independent async operations.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    limit: usize,
    deadline: Option<Duration>,
}

impl FanOut {
    /// A limit of zero is raised to one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            deadline: None,
        }
    }

    /// Fail any task that runs longer than `deadline` once admitted.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Apply `op` to every item, spawning one task per item and letting at
    /// most `limit` of them run at once. Returns after every task finished.
    pub async fn run<T, R, E, F, Fut>(&self, items: Vec<T>, op: F) -> FanOutReport<R, E>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let gate = Arc::new(Semaphore::new(self.limit));
        let deadline = self.deadline;

        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let gate = Arc::clone(&gate);
                let work = op(item);
                tokio::spawn(async move {
                    // The gate is never closed, so acquiring cannot fail.
                    let _permit = gate.acquire_owned().await.ok();
                    match deadline {
                        Some(limit) => match tokio::time::timeout(limit, work).await {
                            Ok(outcome) => outcome.map_err(TaskError::Failed),
                            Err(_) => Err(TaskError::TimedOut(limit)),
                        },
                        None => work.await.map_err(TaskError::Failed),
                    }
                })
            })
            .collect();

        // Awaiting handles in input order writes each slot from its own
        // task, whatever order the tasks complete in.
        let mut slots = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let slot = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    warn!(index, error = %join_err, "Fan-out task did not complete");
                    Err(TaskError::Aborted(join_err.to_string()))
                }
            };
            slots.push(slot);
        }

        FanOutReport { slots }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
