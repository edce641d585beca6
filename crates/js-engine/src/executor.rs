//! A pool of engine worker threads.
//!
//! QuickJS runtimes are not thread-safe, so each worker thread builds and
//! owns exactly one engine. Requests are queued on a bounded channel and
//! answered over a oneshot reply.

use crate::engine::{EngineFactory, JsEngine};
use crate::error::{EngineError, EngineResult};
use crate::protocol::{JsRequest, JsResponse};
use parking_lot::Mutex;
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Anything that can answer guest service requests.
pub trait ServiceExecutor: Send + Sync {
    /// Run a request to completion. Blocks the calling thread.
    fn execute(&self, request: JsRequest) -> EngineResult<JsResponse>;
}

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct JsExecutorOptions {
    /// Number of engine threads.
    pub workers: usize,
    /// Pending requests allowed before callers wait.
    pub queue_capacity: usize,
}

impl Default for JsExecutorOptions {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .max(1);
        Self {
            workers,
            queue_capacity: workers * 4,
        }
    }
}

type Reply = oneshot::Receiver<EngineResult<JsResponse>>;

struct Job {
    request: JsRequest,
    reply: oneshot::Sender<EngineResult<JsResponse>>,
}

/// Serves requests from a fixed set of engine threads.
pub struct JsExecutor {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    live: usize,
}

impl JsExecutor {
    /// Start the workers and wait until each has built its engine.
    ///
    /// Fails if every worker fails, or if any failure is fatal. Otherwise the
    /// pool continues with the workers that came up.
    pub fn new(factory: Arc<dyn EngineFactory>, options: JsExecutorOptions) -> EngineResult<Self> {
        let started = Instant::now();
        let count = options.workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(options.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let (ready_tx, ready_rx) = std_mpsc::channel::<EngineResult<()>>();

        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let factory = Arc::clone(&factory);
            let receiver = Arc::clone(&receiver);
            let ready = ready_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("js-engine-{index}"))
                .spawn(move || {
                    let engine = match factory.create() {
                        Ok(engine) => {
                            let _ = ready.send(Ok(()));
                            engine
                        }
                        Err(err) => {
                            let _ = ready.send(Err(err));
                            return;
                        }
                    };
                    drop(ready);
                    run_worker(engine, &receiver);
                })
                .map_err(|e| EngineError::Init(format!("failed to spawn worker: {e}")))?;
            workers.push(handle);
        }
        drop(ready_tx);

        let mut ready = 0;
        let mut first_error = None;
        for result in ready_rx.iter().take(count) {
            match result {
                Ok(()) => ready += 1,
                Err(err) if err.is_fatal() => {
                    first_error = Some(err);
                    break;
                }
                Err(err) => {
                    warn!("engine worker failed to start: {}", err);
                    first_error.get_or_insert(err);
                }
            }
        }

        let fatal = first_error.as_ref().is_some_and(EngineError::is_fatal);
        if ready == 0 || fatal {
            let mut executor = Self {
                sender: Some(sender),
                workers,
                live: ready,
            };
            executor.shutdown();
            return Err(first_error.unwrap_or(EngineError::Closed));
        }

        info!(
            workers = ready,
            requested = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "js executor ready"
        );
        Ok(Self {
            sender: Some(sender),
            workers,
            live: ready,
        })
    }

    fn job(&self, request: JsRequest) -> EngineResult<(mpsc::Sender<Job>, Job, Reply)> {
        let sender = self.sender.clone().ok_or(EngineError::Closed)?;
        let (reply, receiver) = oneshot::channel();
        Ok((sender, Job { request, reply }, receiver))
    }

    /// Run a request from synchronous code.
    ///
    /// Must not be called from within an async runtime; use
    /// [`JsExecutor::execute_async`] there.
    pub fn execute(&self, request: JsRequest) -> EngineResult<JsResponse> {
        let (sender, job, reply) = self.job(request)?;
        sender.blocking_send(job).map_err(|_| EngineError::Closed)?;
        reply.blocking_recv().map_err(|_| EngineError::Closed)?
    }

    /// Run a request from async code.
    pub async fn execute_async(&self, request: JsRequest) -> EngineResult<JsResponse> {
        let (sender, job, reply) = self.job(request)?;
        sender.send(job).await.map_err(|_| EngineError::Closed)?;
        reply.await.map_err(|_| EngineError::Closed)?
    }

    /// Number of workers that built an engine.
    pub fn workers(&self) -> usize {
        self.live
    }

    /// Stop accepting requests and wait for the workers to drain.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        self.live = 0;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        debug!("js executor stopped");
    }
}

impl Drop for JsExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ServiceExecutor for JsExecutor {
    fn execute(&self, request: JsRequest) -> EngineResult<JsResponse> {
        JsExecutor::execute(self, request)
    }
}

fn run_worker(mut engine: Box<dyn JsEngine>, receiver: &Mutex<mpsc::Receiver<Job>>) {
    loop {
        let job = receiver.lock().blocking_recv();
        let Some(Job { request, reply }) = job else {
            break;
        };
        let started = Instant::now();
        let result = engine.execute(&request);
        debug!(
            id = %request.id,
            service = %request.service,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "served request"
        );
        let _ = reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CompilerCache;
    use crate::engine::QuickJsFactory;
    use crate::protocol::services;
    use crate::testing::FAKE_COMPILER;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor(workers: usize) -> JsExecutor {
        let cache = Arc::new(CompilerCache::new("compiler.js", FAKE_COMPILER));
        JsExecutor::new(
            Arc::new(QuickJsFactory::new(cache)),
            JsExecutorOptions {
                workers,
                queue_capacity: 8,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_execute_echo() {
        let executor = executor(1);
        let response = executor
            .execute(JsRequest::new("sfc.echo", vec![json!("a")]))
            .unwrap();
        assert_eq!(response.result, json!(["a"]));
    }

    #[test]
    fn test_exception_is_reported() {
        let executor = executor(1);
        let err = executor
            .execute(JsRequest::new(
                services::COMPILE_SFC,
                vec![json!("id"), json!("a.vue"), json!("<broken"), json!({})],
            ))
            .unwrap_err();
        assert_eq!(err.to_string(), "Element is missing end tag.");

        // The engine survives a guest exception.
        assert!(executor
            .execute(JsRequest::new("sfc.echo", vec![]))
            .is_ok());
    }

    #[test]
    fn test_sass_imports_through_bridge() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vars.scss"), "$primary: red;\n").unwrap();
        let location = dir.path().to_string_lossy().replace('\\', "/");

        let executor = executor(1);
        let response = executor
            .execute(JsRequest::new(
                services::SASS_RENDER_SYNC,
                vec![json!({
                    "data": "@import 'vars.scss';\na { color: red; }",
                    "sasslocation": location,
                })],
            ))
            .unwrap();
        assert_eq!(response.result["css"], json!("a { color: red; }"));

        let err = executor
            .execute(JsRequest::new(
                services::SASS_RENDER_SYNC,
                vec![json!({ "data": "@import 'missing.scss';", "sasslocation": location })],
            ))
            .unwrap_err();
        assert!(err.to_string().contains("Can't find stylesheet to import"));
    }

    #[test]
    fn test_concurrent_requests() {
        let executor = Arc::new(executor(3));
        let handles: Vec<_> = (0..12)
            .map(|i| {
                let executor = Arc::clone(&executor);
                thread::spawn(move || {
                    executor
                        .execute(JsRequest::new("sfc.echo", vec![json!(i)]))
                        .unwrap()
                        .result
                })
            })
            .collect();
        let mut results: Vec<i64> = handles
            .into_iter()
            .map(|h| h.join().unwrap()[0].as_i64().unwrap())
            .collect();
        results.sort();
        assert_eq!(results, (0..12).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_async() {
        let executor = tokio::task::spawn_blocking(|| executor(2)).await.unwrap();
        let response = executor
            .execute_async(JsRequest::new("sfc.later", vec![json!(7)]))
            .await
            .unwrap();
        assert_eq!(response.result, json!(7));
    }

    #[test]
    fn test_fatal_compile_error_fails_construction() {
        let cache = Arc::new(CompilerCache::new("broken.js", "function ("));
        let result = JsExecutor::new(
            Arc::new(QuickJsFactory::new(cache)),
            JsExecutorOptions {
                workers: 2,
                queue_capacity: 2,
            },
        );
        assert!(result.err().unwrap().is_fatal());
    }

    struct Flaky {
        calls: AtomicUsize,
        inner: QuickJsFactory,
    }

    impl EngineFactory for Flaky {
        fn create(&self) -> EngineResult<Box<dyn JsEngine>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(EngineError::Init("out of memory".to_string()));
            }
            self.inner.create()
        }
    }

    #[test]
    fn test_partial_start_keeps_healthy_workers() {
        let cache = Arc::new(CompilerCache::new("compiler.js", FAKE_COMPILER));
        let factory = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            inner: QuickJsFactory::new(cache),
        });
        let executor = JsExecutor::new(
            factory,
            JsExecutorOptions {
                workers: 2,
                queue_capacity: 2,
            },
        )
        .unwrap();
        assert_eq!(executor.workers(), 1);
        assert!(executor.execute(JsRequest::new("sfc.echo", vec![])).is_ok());
    }

    #[test]
    fn test_closed_after_shutdown() {
        let mut executor = executor(1);
        executor.shutdown();
        assert!(matches!(
            executor.execute(JsRequest::new("sfc.echo", vec![])),
            Err(EngineError::Closed)
        ));
    }
}
