//! Execution workers.
//!
//! A worker is a dedicated thread that owns a [`RuleRunner`] and serves one
//! request at a time. The caller sends a [`Request`] over a channel and
//! blocks on the shared [`SignalCell`] until the worker bumps it; the reply
//! is then already waiting in the reply channel.
//!
//! Nothing but the request and reply crosses the thread boundary, so every
//! module and rule a worker loads stays private to it. Dropping the request
//! sender ends the worker loop.

use crate::config::PoolConfig;
use crate::modules::{ModuleHost, ModuleRegistry};
use crate::protocol::{CallArgs, Reply, Request, WorkerError};
use crate::runner::RuleRunner;
use crate::signal::{SignalCell, WaitStatus};
use rulecheck_common::NormalizedResult;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Loader configuration of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flavor {
    /// Plain JavaScript only.
    Native,
    /// TypeScript sources are loaded as well.
    Transpiled,
}

impl Flavor {
    /// `Transpiled` for `.ts`, `.mts` and `.cts` addresses.
    pub fn for_address(address: &str) -> Flavor {
        let typescript = [".ts", ".mts", ".cts"]
            .iter()
            .any(|suffix| address.ends_with(suffix));
        if typescript {
            Flavor::Transpiled
        } else {
            Flavor::Native
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flavor::Native => "native",
            Flavor::Transpiled => "transpiled",
        }
    }

    pub fn allows_typescript(self) -> bool {
        self == Flavor::Transpiled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The rule run failed inside the worker.
    #[error("{0}")]
    Worker(WorkerError),
    #[error("worker {worker} did not reply within {}ms", timeout.as_millis())]
    TimedOut { worker: WorkerId, timeout: Duration },
    #[error("worker {0} has been terminated")]
    Terminated(WorkerId),
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
    /// The request/reply protocol was violated. Not recoverable.
    #[error("Internal error: {0}")]
    Protocol(String),
}

struct Inbox {
    replies: Receiver<Reply>,
    next_id: u64,
}

/// Calling side of a worker thread.
pub struct WorkerHandle {
    id: WorkerId,
    flavor: Flavor,
    root: PathBuf,
    requests: Mutex<Option<Sender<Request>>>,
    /// Held for the whole call, so requests never overlap.
    inbox: Mutex<Inbox>,
    signal: Arc<SignalCell>,
}

impl WorkerHandle {
    /// Start a worker serving the package at `root`.
    pub fn spawn(
        id: WorkerId,
        flavor: Flavor,
        root: PathBuf,
        registry: Arc<ModuleRegistry>,
        config: &PoolConfig,
    ) -> Result<WorkerHandle, ServiceError> {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();
        let signal = Arc::new(SignalCell::new());

        let mut builder =
            thread::Builder::new().name(format!("rulecheck-worker-{}-{}", id.0, flavor.as_str()));
        if let Some(size) = config.worker_stack_size {
            builder = builder.stack_size(size);
        }
        let worker_signal = Arc::clone(&signal);
        let worker_root = root.clone();
        let default_filename = config.default_filename.clone();
        // The join handle is dropped: a worker that never replies must not
        // keep the caller alive.
        builder.spawn(move || {
            let host = ModuleHost::new(registry, worker_root, flavor);
            let mut runner = RuleRunner::new(host, default_filename);
            serve(id, &mut runner, &request_rx, &reply_tx, &worker_signal);
        })?;
        debug!(worker = %id, flavor = flavor.as_str(), root = %root.display(), "worker started");

        Ok(WorkerHandle {
            id,
            flavor,
            root,
            requests: Mutex::new(Some(request_tx)),
            inbox: Mutex::new(Inbox {
                replies: reply_rx,
                next_id: 0,
            }),
            signal,
        })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_terminated(&self) -> bool {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Stop accepting requests. A worker in the middle of a call finishes it
    /// and exits; its reply is discarded.
    pub fn terminate(&self) {
        let sender = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            debug!(worker = %self.id, "worker terminated");
        }
    }

    /// Run one request and block until the reply or `timeout`.
    pub fn call(&self, args: CallArgs, timeout: Option<Duration>) -> Result<NormalizedResult, ServiceError> {
        let mut inbox = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inbox.next_id;
        inbox.next_id += 1;
        {
            let requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
            let sender = requests.as_ref().ok_or(ServiceError::Terminated(self.id))?;
            sender
                .send(Request { id, args })
                .map_err(|_| ServiceError::Terminated(self.id))?;
        }
        trace!(worker = %self.id, id, "request sent");

        let status = self.signal.wait(0, timeout);
        self.signal.store(0);
        if status == WaitStatus::TimedOut
            && let Some(timeout) = timeout
        {
            warn!(worker = %self.id, id, ms = timeout.as_millis() as u64, "worker timed out");
            self.terminate();
            return Err(ServiceError::TimedOut {
                worker: self.id,
                timeout,
            });
        }

        let reply = inbox
            .replies
            .try_recv()
            .map_err(|err| ServiceError::Protocol(format!("no reply after wake-up ({err})")))?;
        if reply.id != id {
            return Err(ServiceError::Protocol(format!(
                "Expected id {id} but got id {}",
                reply.id
            )));
        }
        match (reply.result, reply.error) {
            (_, Some(error)) => Err(ServiceError::Worker(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ServiceError::Protocol(format!(
                "reply {id} carries neither a result nor an error"
            ))),
        }
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("flavor", &self.flavor)
            .field("root", &self.root)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

// =============================================================================
// Worker side
// =============================================================================

fn serve(
    id: WorkerId,
    runner: &mut RuleRunner,
    requests: &Receiver<Request>,
    replies: &Sender<Reply>,
    signal: &SignalCell,
) {
    for Request { id: request_id, args } in requests.iter() {
        trace!(worker = %id, id = request_id, rule = %args.rule_name, "request received");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| runner.run(&args)))
            .unwrap_or_else(|payload| Err(WorkerError::new(panic_message(payload))));
        if replies.send(Reply::from_outcome(request_id, outcome)).is_err() {
            break;
        }
        signal.add(1);
    }
    debug!(worker = %id, "worker stopped");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
#[path = "tests/worker_tests.rs"]
mod tests;
