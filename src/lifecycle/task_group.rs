//! Structured concurrency for long-running tasks.
//!
//! Every task in a group shares one [`Shutdown`]. The first task to end,
//! for whatever reason, triggers it; `join` then waits for the rest to drain
//! and reports the first failure.

use std::collections::HashMap;
use std::future::Future;

use thiserror::Error;
use tokio::task::{Id, JoinSet};

use super::shutdown::{Shutdown, ShutdownSignal};

/// Why a group ended unsuccessfully.
#[derive(Debug, Error)]
pub enum TaskError<E>
where
    E: std::error::Error + 'static,
{
    #[error("{name} failed: {source}")]
    Failed {
        name: &'static str,
        #[source]
        source: E,
    },

    #[error("{name} panicked or was cancelled")]
    Panicked { name: &'static str },
}

pub struct TaskGroup<E> {
    tasks: JoinSet<Result<(), E>>,
    names: HashMap<Id, &'static str>,
    shutdown: Shutdown,
}

impl<E> TaskGroup<E>
where
    E: std::error::Error + Send + 'static,
{
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            tasks: JoinSet::new(),
            names: HashMap::new(),
            shutdown,
        }
    }

    /// A fresh receiver for the group's shutdown signal.
    pub fn signal(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let handle = self.tasks.spawn(task);
        self.names.insert(handle.id(), name);
        tracing::debug!(task = name, "Task spawned");
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task, stopping the others as soon as one ends.
    pub async fn join(mut self) -> Result<(), TaskError<E>> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, Ok(()))) => {
                    tracing::debug!(task = self.name(id), "Task finished");
                    None
                }
                Ok((id, Err(source))) => {
                    let name = self.name(id);
                    tracing::error!(task = name, error = %source, "Task failed");
                    Some(TaskError::Failed { name, source })
                }
                Err(err) => {
                    let name = self.name(err.id());
                    tracing::error!(task = name, error = %err, "Task panicked");
                    Some(TaskError::Panicked { name })
                }
            };

            if !self.shutdown.is_triggered() {
                tracing::info!(remaining = self.tasks.len(), "Stopping remaining tasks");
                self.shutdown.trigger();
            }
            if first_error.is_none() {
                first_error = outcome;
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn name(&self, id: Id) -> &'static str {
        self.names.get(&id).copied().unwrap_or("task")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[tokio::test]
    async fn failure_stops_siblings_and_is_reported() {
        let shutdown = Shutdown::new();
        let mut group: TaskGroup<Boom> = TaskGroup::new(shutdown.clone());

        let mut signal = group.signal();
        group.spawn("patient", async move {
            signal.recv().await;
            Ok(())
        });
        group.spawn("failing", async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(Boom)
        });
        assert_eq!(group.len(), 2);

        let result = tokio::time::timeout(Duration::from_secs(5), group.join())
            .await
            .expect("group should drain");
        assert!(matches!(result, Err(TaskError::Failed { name: "failing", .. })));
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn external_trigger_drains_cleanly() {
        let shutdown = Shutdown::new();
        let mut group: TaskGroup<Boom> = TaskGroup::new(shutdown.clone());
        for name in ["a", "b"] {
            let mut signal = group.signal();
            group.spawn(name, async move {
                signal.recv().await;
                Ok(())
            });
        }

        shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), group.join())
            .await
            .expect("group should drain");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn panics_are_reported_by_name() {
        let mut group: TaskGroup<Boom> = TaskGroup::new(Shutdown::new());
        group.spawn("exploding", async {
            if true {
                panic!("listener bug");
            }
            Ok(())
        });

        let result = group.join().await;
        assert!(matches!(result, Err(TaskError::Panicked { name: "exploding" })));
    }
}
