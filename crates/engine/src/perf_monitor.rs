// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Optional memory/performance telemetry: establishes a rolling baseline
//! over the first `baseline_samples` readings and warns when a later
//! reading drifts more than `drift_threshold_percent` away from it.
//! Gated entirely behind the `daemon.memoryMonitor.enabled` flag — the
//! resource manager's admission control never depends on this
//! component, it only ever informs an operator via `tracing`.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Tuning for [`PerfMonitor`]. Disabled by default — the resource
/// manager's own sampler already drives admission; this is purely
/// diagnostic on top of it.
#[derive(Debug, Clone, Copy)]
pub struct PerfMonitorConfig {
    pub enabled: bool,
    pub baseline_samples: usize,
    pub drift_threshold_percent: f32,
}

impl Default for PerfMonitorConfig {
    fn default() -> Self {
        Self { enabled: false, baseline_samples: 10, drift_threshold_percent: 50.0 }
    }
}

/// What one `record()` call observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfSnapshot {
    pub memory_mb: u64,
    pub baseline_mb: Option<u64>,
    pub drift_percent: Option<f32>,
}

/// Accumulates memory samples into a baseline, then flags drift.
///
/// Takes raw samples (typically the resource manager's `memory_used_mb`
/// reading) rather than sampling `/proc` itself — there is exactly one
/// `ResourceSampler` in this workspace, and every consumer of memory
/// readings goes through it.
pub struct PerfMonitor {
    config: PerfMonitorConfig,
    samples: Mutex<VecDeque<u64>>,
    baseline_mb: Mutex<Option<u64>>,
}

impl PerfMonitor {
    pub fn new(config: PerfMonitorConfig) -> Self {
        Self {
            config,
            samples: Mutex::new(VecDeque::with_capacity(config.baseline_samples.max(1))),
            baseline_mb: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Record a new memory reading. Returns `None` while disabled.
    pub fn record(&self, memory_mb: u64) -> Option<PerfSnapshot> {
        if !self.config.enabled {
            return None;
        }

        let mut baseline = self.baseline_mb.lock();
        let Some(base) = *baseline else {
            let mut samples = self.samples.lock();
            samples.push_back(memory_mb);
            if samples.len() >= self.config.baseline_samples.max(1) {
                let sum: u64 = samples.iter().sum();
                *baseline = Some(sum / samples.len() as u64);
            }
            return Some(PerfSnapshot { memory_mb, baseline_mb: *baseline, drift_percent: None });
        };

        let drift_percent = if base == 0 {
            0.0
        } else {
            ((memory_mb as f32 - base as f32) / base as f32) * 100.0
        };

        if drift_percent.abs() > self.config.drift_threshold_percent {
            tracing::warn!(
                memory_mb,
                baseline_mb = base,
                drift_percent,
                "memory usage drifted from established baseline"
            );
        }

        Some(PerfSnapshot { memory_mb, baseline_mb: Some(base), drift_percent: Some(drift_percent) })
    }
}
