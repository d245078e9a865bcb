//! The worker pool.
//!
//! Workers are keyed by `(package root, flavor)`: every analyzed file of the
//! same package, loaded with the same flavor, shares one worker and so one
//! module cache. A cache is never invalidated in place. When the same file
//! is analyzed again shortly after (the editor saved it, most likely), every
//! worker is discarded and the next request starts from a fresh one.

use crate::config::{PoolConfig, RestartMode};
use crate::modules::ModuleRegistry;
use crate::protocol::{CallArgs, TestCaseConfig};
use crate::worker::{Flavor, ServiceError, WorkerHandle, WorkerId};
use rulecheck_common::NormalizedResult;
use rulecheck_eval::find_package_root;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// =============================================================================
// Restart policy
// =============================================================================

/// Decides when a repeated analysis of the same file restarts the workers.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    mode: RestartMode,
    window: Duration,
    requested: FxHashMap<String, Instant>,
}

impl RestartPolicy {
    pub fn new(mode: RestartMode, window: Duration) -> RestartPolicy {
        RestartPolicy {
            mode,
            window,
            requested: FxHashMap::default(),
        }
    }

    /// Record a request for `address` at `now`; `true` when all workers must
    /// be restarted first.
    pub fn observe(&mut self, address: &str, now: Instant) -> bool {
        let window = self.window;
        let elapsed = |at: &Instant| now.saturating_duration_since(*at);
        match self.mode {
            RestartMode::WithinWindow => {
                let restart = self.requested.get(address).is_some_and(|at| elapsed(at) < window);
                if restart {
                    self.requested.clear();
                } else {
                    self.requested.retain(|_, at| elapsed(at) < window);
                }
                self.requested.insert(address.to_string(), now);
                restart
            }
            RestartMode::AfterWindow => {
                let restart = self.requested.get(address).is_some_and(|at| elapsed(at) >= window);
                if restart {
                    self.requested.clear();
                }
                // The first request of a series arms the window.
                self.requested.entry(address.to_string()).or_insert(now);
                restart
            }
        }
    }

    pub fn reset(&mut self) {
        self.requested.clear();
    }
}

// =============================================================================
// Pool
// =============================================================================

type WorkerKey = (PathBuf, Flavor);

#[derive(Debug)]
struct PoolState {
    workers: FxHashMap<WorkerKey, Arc<WorkerHandle>>,
    policy: RestartPolicy,
    next_worker: u64,
    restarts: u64,
}

#[derive(Debug)]
pub struct WorkerPool {
    config: PoolConfig,
    registry: Arc<ModuleRegistry>,
    state: Mutex<PoolState>,
}

impl WorkerPool {
    pub fn new(registry: ModuleRegistry, config: PoolConfig) -> WorkerPool {
        let policy = RestartPolicy::new(config.restart_mode, config.restart_window());
        WorkerPool {
            config,
            registry: Arc::new(registry),
            state: Mutex::new(PoolState {
                workers: FxHashMap::default(),
                policy,
                next_worker: 0,
                restarts: 0,
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The worker for `analysis_address`, with the flavor its extension asks for.
    pub fn service(&self, analysis_address: &str) -> Result<WorkerService, ServiceError> {
        self.get_service(Flavor::for_address(analysis_address), analysis_address)
    }

    /// The worker for the package containing `analysis_address`.
    ///
    /// Applies the restart policy first, then reuses the live worker of the
    /// package or spawns one.
    pub fn get_service(&self, flavor: Flavor, analysis_address: &str) -> Result<WorkerService, ServiceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.policy.observe(analysis_address, Instant::now()) {
            info!(address = analysis_address, workers = state.workers.len(), "restarting workers");
            terminate_all(&mut state.workers);
            state.restarts += 1;
        }

        let root = find_package_root(Path::new(analysis_address));
        let key = (root, flavor);
        if let Some(handle) = state.workers.get(&key)
            && !handle.is_terminated()
        {
            return Ok(self.wrap(Arc::clone(handle)));
        }

        let id = WorkerId(state.next_worker);
        state.next_worker += 1;
        let handle = Arc::new(WorkerHandle::spawn(
            id,
            flavor,
            key.0.clone(),
            Arc::clone(&self.registry),
            &self.config,
        )?);
        state.workers.insert(key, Arc::clone(&handle));
        Ok(self.wrap(handle))
    }

    fn wrap(&self, handle: Arc<WorkerHandle>) -> WorkerService {
        WorkerService {
            handle,
            timeout: self.config.call_timeout(),
        }
    }

    /// A linter bound to one rule and its analyzed file.
    pub fn linter_service(&self, rule_name: impl Into<String>, rule_address: impl Into<String>) -> LinterService {
        let rule_name = rule_name.into();
        let rule_address = rule_address.into();
        let service = match self.service(&rule_address) {
            Ok(service) => Some(service),
            Err(err) => {
                warn!(rule = %rule_name, address = %rule_address, %err, "no worker for rule");
                None
            }
        };
        LinterService {
            service,
            rule_name,
            rule_address,
        }
    }

    /// Number of live workers.
    pub fn worker_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .workers
            .values()
            .filter(|handle| !handle.is_terminated())
            .count()
    }

    pub fn restart_count(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .restarts
    }

    /// Terminate every worker and forget recent requests.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        terminate_all(&mut state.workers);
        state.policy.reset();
        debug!("worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn terminate_all(workers: &mut FxHashMap<WorkerKey, Arc<WorkerHandle>>) {
    for (_, handle) in workers.drain() {
        handle.terminate();
    }
}

// =============================================================================
// Services
// =============================================================================

/// A synchronous handle on one worker.
#[derive(Debug, Clone)]
pub struct WorkerService {
    handle: Arc<WorkerHandle>,
    timeout: Option<Duration>,
}

impl WorkerService {
    pub fn worker_id(&self) -> WorkerId {
        self.handle.id()
    }

    pub fn flavor(&self) -> Flavor {
        self.handle.flavor()
    }

    pub fn root(&self) -> &Path {
        self.handle.root()
    }

    /// Run `rule_name` over the test case described by `config`.
    pub fn call(
        &self,
        rule_name: &str,
        rule_address: &str,
        config: TestCaseConfig,
    ) -> Result<NormalizedResult, ServiceError> {
        let args = CallArgs {
            rule_name: rule_name.to_string(),
            rule_address: rule_address.to_string(),
            config,
        };
        self.handle.call(args, self.timeout)
    }
}

/// Lints test cases of one rule, swallowing worker failures.
#[derive(Debug, Clone)]
pub struct LinterService {
    service: Option<WorkerService>,
    rule_name: String,
    rule_address: String,
}

impl LinterService {
    pub fn worker_id(&self) -> Option<WorkerId> {
        self.service.as_ref().map(WorkerService::worker_id)
    }

    /// The normalized result, or `None` when the worker failed or timed out.
    ///
    /// # Panics
    ///
    /// Panics on a protocol violation between caller and worker.
    pub fn linter_result(&self, config: TestCaseConfig) -> Option<NormalizedResult> {
        let service = self.service.as_ref()?;
        match service.call(&self.rule_name, &self.rule_address, config) {
            Ok(result) => Some(result),
            Err(ServiceError::Protocol(message)) => panic!("Internal error: {message}"),
            Err(err) => {
                warn!(rule = %self.rule_name, address = %self.rule_address, %err, "linting failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/pool_unit_tests.rs"]
mod tests;
