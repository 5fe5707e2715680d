use crate::utils::error::{OmsError, Result};
use futures_util::future::join_all;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const DEFAULT_POOL_SIZE: usize = 100;
pub const DEFAULT_POOL_NAME: &str = "harvest-oms-section-reading";

/// 固定大小的任務池
///
/// 沒有等待隊列：有空閒名額時直接交給 tokio 執行，名額用盡時由提交方在當前任務中直接執行
/// （caller runs），負載過高時退化為同步執行而不是拒絕任務。
#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    size: usize,
    permits: Arc<Semaphore>,
}

/// 已提交任務的句柄，`join` 等待其完成
#[derive(Debug)]
pub enum PooledTask<T> {
    Spawned {
        task: String,
        handle: JoinHandle<T>,
    },
    Inline {
        task: String,
        outcome: std::result::Result<T, String>,
    },
}

impl<T> PooledTask<T> {
    pub fn ran_inline(&self) -> bool {
        matches!(self, PooledTask::Inline { .. })
    }

    pub async fn join(self) -> Result<T> {
        match self {
            PooledTask::Spawned { task, handle } => match handle.await {
                Ok(value) => Ok(value),
                Err(e) if e.is_panic() => Err(OmsError::TaskFailed {
                    task,
                    reason: panic_message(e.into_panic()),
                }),
                Err(e) => Err(OmsError::TaskFailed {
                    task,
                    reason: e.to_string(),
                }),
            },
            PooledTask::Inline { task, outcome } => {
                outcome.map_err(|reason| OmsError::TaskFailed { task, reason })
            }
        }
    }
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    /// 進程內共用的任務池
    pub fn shared() -> Arc<WorkerPool> {
        static SHARED: OnceLock<Arc<WorkerPool>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(WorkerPool::new(DEFAULT_POOL_NAME, DEFAULT_POOL_SIZE)))
            .clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn submit<F, T>(&self, task: impl Into<String>, future: F) -> PooledTask<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let task = task.into();
        match self.permits.clone().try_acquire_owned() {
            Ok(permit) => {
                tracing::trace!(pool = %self.name, task = %task, "spawning pooled task");
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    future.await
                });
                PooledTask::Spawned { task, handle }
            }
            Err(_) => {
                tracing::debug!(
                    pool = %self.name,
                    task = %task,
                    "worker pool saturated, running task on caller"
                );
                let outcome = AssertUnwindSafe(future)
                    .catch_unwind()
                    .await
                    .map_err(panic_message);
                PooledTask::Inline { task, outcome }
            }
        }
    }

    /// 提交全部任務並等待全部完成，結果順序與提交順序一致
    pub async fn execute_all<F, T>(&self, tasks: Vec<(String, F)>) -> Vec<Result<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut submitted = Vec::with_capacity(tasks.len());
        for (name, future) in tasks {
            submitted.push(self.submit(name, future).await);
        }
        join_all(submitted.into_iter().map(PooledTask::join)).await
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_spawns_while_permits_available() {
        let pool = WorkerPool::new("test", 2);
        let task = pool.submit("one", async { 1 }).await;
        assert!(!task.ran_inline());
        assert_eq!(task.join().await.unwrap(), 1);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_saturated_pool_runs_on_caller() {
        let pool = WorkerPool::new("empty", 0);
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        let task = pool
            .submit("inline", async move {
                c.fetch_add(1, Ordering::SeqCst);
                "done"
            })
            .await;

        // inline task already finished before submit returned
        assert!(task.ran_inline());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(task.join().await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_partial_saturation_mixes_spawn_and_inline() {
        let pool = WorkerPool::new("one", 1);
        let release = Arc::new(Barrier::new(2));

        let r = release.clone();
        let first = pool
            .submit("held", async move {
                r.wait().await;
                1
            })
            .await;
        let second = pool.submit("overflow", async { 2 }).await;

        assert!(!first.ran_inline());
        assert!(second.ran_inline());

        release.wait().await;
        assert_eq!(first.join().await.unwrap(), 1);
        assert_eq!(second.join().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_panics_become_task_failures() {
        let pool = WorkerPool::new("panic", 1);
        let spawned = pool
            .submit("spawned", async {
                panic!("boom");
            })
            .await;
        let err = spawned.join().await.map(|_: ()| ()).unwrap_err();
        assert!(matches!(err, OmsError::TaskFailed { ref reason, .. } if reason == "boom"));

        let inline_pool = WorkerPool::new("panic-inline", 0);
        let inline = inline_pool
            .submit("inline", async {
                panic!("inline boom");
            })
            .await;
        let err = inline.join().await.map(|_: ()| ()).unwrap_err();
        assert!(matches!(err, OmsError::TaskFailed { ref task, .. } if task == "inline"));
    }

    #[tokio::test]
    async fn test_execute_all_keeps_submission_order() {
        let pool = WorkerPool::new("order", 4);
        let tasks: Vec<(String, _)> = (0..6u64)
            .map(|i| {
                (format!("task-{}", i), async move {
                    tokio::time::sleep(std::time::Duration::from_millis(6 - i)).await;
                    i
                })
            })
            .collect();

        let results: Vec<u64> = pool
            .execute_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(results, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_shared_pool_is_reused() {
        let a = WorkerPool::shared();
        let b = WorkerPool::shared();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.size(), DEFAULT_POOL_SIZE);
        assert_eq!(a.name(), DEFAULT_POOL_NAME);
    }
}
