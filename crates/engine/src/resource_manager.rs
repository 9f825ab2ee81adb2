// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Bounded-concurrency admission control in front of expensive per-folder
//! operations (C4): an active set capped at `maxConcurrentOperations`, a
//! bounded priority queue behind it, and an adaptive throttle derived from
//! periodic memory/CPU samples.

use fmcp_core::ResourceLimits;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

pub type OperationFuture = Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send>>;
pub type Thunk = Box<dyn FnOnce(CancellationToken) -> OperationFuture + Send>;

/// One unit of admission-controlled work (spec.md §4.4:
/// `{id, folderPath, thunk, priority, estimatedMemoryMB}`).
pub struct Submission {
    pub id: String,
    pub folder_path: PathBuf,
    pub priority: u8,
    pub estimated_memory_mb: u64,
    pub thunk: Thunk,
}

/// Per-tick telemetry, matching spec.md §4.4's `stats` event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceStats {
    pub memory_used_mb: u64,
    pub cpu_percent: f32,
    pub throttle_factor: f32,
    pub active_operations: usize,
    pub queued_operations: usize,
    pub is_throttled: bool,
}

impl Default for ResourceStats {
    fn default() -> Self {
        Self {
            memory_used_mb: 0,
            cpu_percent: 0.0,
            throttle_factor: 1.0,
            active_operations: 0,
            queued_operations: 0,
            is_throttled: false,
        }
    }
}

/// Reads process memory/CPU for the adaptive throttle. A single narrow
/// seam in place of the `process` global the source reached for
/// directly (spec.md §9).
pub trait ResourceSampler: Send + Sync {
    /// Returns `(resident_memory_mb, cpu_percent)`.
    fn sample(&self) -> (u64, f32);
}

/// Reads resident memory from `/proc/self/status`. CPU is always
/// reported as 0% — a meaningful per-process CPU reading needs two
/// samples to diff against, which this minimal sampler doesn't keep.
pub struct ProcStatusSampler;

impl ResourceSampler for ProcStatusSampler {
    fn sample(&self) -> (u64, f32) {
        let memory_mb = std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|contents| {
                contents.lines().find_map(|line| {
                    line.strip_prefix("VmRSS:")
                        .and_then(|rest| rest.split_whitespace().next())
                        .and_then(|kb| kb.parse::<u64>().ok())
                })
            })
            .map(|kb| kb / 1024)
            .unwrap_or(0);
        (memory_mb, 0.0)
    }
}

/// Constant zero reading, used where `/proc` isn't available.
pub struct ZeroSampler;

impl ResourceSampler for ZeroSampler {
    fn sample(&self) -> (u64, f32) {
        (0, 0.0)
    }
}

pub fn default_sampler() -> Box<dyn ResourceSampler> {
    if cfg!(target_os = "linux") {
        Box::new(ProcStatusSampler)
    } else {
        Box::new(ZeroSampler)
    }
}

struct QueuedOp {
    submission: Submission,
}

enum Command {
    Submit { submission: Submission, resp: oneshot::Sender<Result<(), EngineError>> },
    Cancel { id: String },
    Shutdown,
}

/// Handle to a running resource manager. Cloning shares the same
/// background task; dropping every handle does not stop it — call
/// [`ResourceManager::shutdown`] explicitly.
#[derive(Clone)]
pub struct ResourceManager {
    cmd_tx: mpsc::Sender<Command>,
    stats_rx: watch::Receiver<ResourceStats>,
}

impl ResourceManager {
    pub fn start(limits: ResourceLimits, sampler: Box<dyn ResourceSampler>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (stats_tx, stats_rx) = watch::channel(ResourceStats::default());
        tokio::spawn(run(limits, sampler, cmd_rx, stats_tx));
        Self { cmd_tx, stats_rx }
    }

    /// Submit an operation for admission. Resolves once the admission
    /// decision is known (admitted-to-active, admitted-to-queue, or
    /// rejected) — does not wait for the operation to finish running.
    pub async fn submit(&self, submission: Submission) -> Result<(), EngineError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Submit { submission, resp: resp_tx })
            .await
            .map_err(|_| EngineError::AdmissionRejected("resource manager has shut down".into()))?;
        resp_rx
            .await
            .map_err(|_| EngineError::AdmissionRejected("resource manager dropped the response".into()))?
    }

    /// Remove a pending operation, or cooperatively cancel a running one.
    pub async fn cancel_operation(&self, id: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::Cancel { id: id.into() }).await;
    }

    /// Stop accepting new submissions and drain gracefully.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
    }

    pub fn stats(&self) -> ResourceStats {
        *self.stats_rx.borrow()
    }

    pub fn watch_stats(&self) -> watch::Receiver<ResourceStats> {
        self.stats_rx.clone()
    }
}

async fn run(
    limits: ResourceLimits,
    sampler: Box<dyn ResourceSampler>,
    mut cmd_rx: mpsc::Receiver<Command>,
    stats_tx: watch::Sender<ResourceStats>,
) {
    let mut queue: VecDeque<QueuedOp> = VecDeque::new();
    let mut running: JoinSet<String> = JoinSet::new();
    let mut active_cancels: HashMap<String, CancellationToken> = HashMap::new();
    let mut throttle_factor: f32 = 1.0;
    let mut shutting_down = false;
    let mut tick = tokio::time::interval(std::time::Duration::from_millis(limits.check_interval_ms.max(1)));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    None => break,
                    Some(Command::Shutdown) => {
                        shutting_down = true;
                        queue.clear();
                    }
                    Some(Command::Cancel { id }) => {
                        if let Some(cancel) = active_cancels.get(&id) {
                            cancel.cancel();
                        } else {
                            queue.retain(|op| op.submission.id != id);
                        }
                    }
                    Some(Command::Submit { submission, resp }) => {
                        if shutting_down {
                            let _ = resp.send(Err(EngineError::AdmissionRejected(
                                "resource manager is shutting down".into(),
                            )));
                            continue;
                        }
                        let effective_cap = effective_concurrency(&limits, throttle_factor);
                        if running.len() < effective_cap {
                            let cancel = CancellationToken::new();
                            active_cancels.insert(submission.id.clone(), cancel.clone());
                            spawn_operation(&mut running, submission, cancel);
                            let _ = resp.send(Ok(()));
                        } else if queue.len() < limits.max_queue_size {
                            queue.push_back(QueuedOp { submission });
                            let _ = resp.send(Ok(()));
                        } else {
                            let _ = resp.send(Err(EngineError::AdmissionRejected(format!(
                                "queue full ({} operations pending)",
                                limits.max_queue_size
                            ))));
                        }
                    }
                }
            }
            Some(finished) = running.join_next(), if !running.is_empty() => {
                if let Ok(id) = finished {
                    active_cancels.remove(&id);
                }
                dispatch_queued(&limits, throttle_factor, &mut queue, &mut running, &mut active_cancels);
            }
            _ = tick.tick() => {
                let (memory_mb, cpu_percent) = sampler.sample();
                throttle_factor = derive_throttle(&limits, memory_mb, cpu_percent);
                let is_throttled = throttle_factor < 1.0;
                if is_throttled {
                    tracing::warn!(memory_mb, cpu_percent, throttle_factor, "resource manager throttling admission");
                }
                let _ = stats_tx.send(ResourceStats {
                    memory_used_mb: memory_mb,
                    cpu_percent,
                    throttle_factor,
                    active_operations: running.len(),
                    queued_operations: queue.len(),
                    is_throttled,
                });
                dispatch_queued(&limits, throttle_factor, &mut queue, &mut running, &mut active_cancels);
            }
        }

        if shutting_down && running.is_empty() && queue.is_empty() {
            break;
        }
    }
}

fn pop_best(queue: &mut VecDeque<QueuedOp>) -> Option<QueuedOp> {
    let mut best_idx = None;
    let mut best_priority = u8::MAX;
    for (i, op) in queue.iter().enumerate() {
        if op.submission.priority < best_priority {
            best_priority = op.submission.priority;
            best_idx = Some(i);
        }
    }
    best_idx.and_then(|i| queue.remove(i))
}

fn dispatch_queued(
    limits: &ResourceLimits,
    throttle_factor: f32,
    queue: &mut VecDeque<QueuedOp>,
    running: &mut JoinSet<String>,
    active_cancels: &mut HashMap<String, CancellationToken>,
) {
    let effective_cap = effective_concurrency(limits, throttle_factor);
    while running.len() < effective_cap {
        let Some(op) = pop_best(queue) else { break };
        let cancel = CancellationToken::new();
        active_cancels.insert(op.submission.id.clone(), cancel.clone());
        spawn_operation(running, op.submission, cancel);
    }
}

fn spawn_operation(running: &mut JoinSet<String>, submission: Submission, cancel: CancellationToken) {
    let Submission { id, thunk, .. } = submission;
    let fut = thunk(cancel);
    running.spawn(async move {
        if let Err(error) = fut.await {
            tracing::warn!(%id, %error, "resource-managed operation failed");
        }
        id
    });
}

fn effective_concurrency(limits: &ResourceLimits, throttle_factor: f32) -> usize {
    if !limits.adaptive_throttling {
        return limits.max_concurrent_operations.max(1);
    }
    ((limits.max_concurrent_operations as f32) * throttle_factor).floor().max(1.0) as usize
}

fn derive_throttle(limits: &ResourceLimits, memory_mb: u64, cpu_percent: f32) -> f32 {
    if !limits.adaptive_throttling {
        return 1.0;
    }
    let memory_breach = memory_mb as f32 / limits.max_memory_mb.max(1) as f32;
    let cpu_breach = cpu_percent / limits.max_cpu_percent.max(1.0);
    let worst = memory_breach.max(cpu_breach);
    if worst <= 1.0 {
        1.0
    } else {
        (1.0 / worst).clamp(0.1, 1.0)
    }
}
