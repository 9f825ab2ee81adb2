// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fmcp-engine: orchestration logic for the folder-mcp daemon.
//!
//! Owns everything with a runtime shape — background tasks, channels,
//! state machines — built on the narrow traits from `fmcp-adapters` and
//! `fmcp-storage` and the inert types from `fmcp-core`. Nothing outside
//! this crate constructs a `FolderRecord` by hand or mutates one in
//! place; every change routes through [`FmdmService`].

mod activity_ring;
mod error;
mod feed;
mod fmdm_service;
mod indexing_queue;
mod lifecycle_manager;
mod orchestrator;
mod perf_monitor;
mod resource_manager;

pub use activity_ring::{ActivityEvent, ActivityRing};
pub use error::EngineError;
pub use feed::FolderMcpFeed;
pub use fmdm_service::FmdmService;
pub use indexing_queue::{QueueEvent, QueueItem, SequentialIndexingQueue};
pub use lifecycle_manager::{FolderLifecycleManager, LifecycleEvent, LifecycleState, ScanScope};
pub use orchestrator::{MonitoredFoldersOrchestrator, OrchestratorConfig};
pub use perf_monitor::{PerfMonitor, PerfMonitorConfig, PerfSnapshot};
pub use resource_manager::{
    default_sampler, OperationFuture, ProcStatusSampler, ResourceManager, ResourceSampler, ResourceStats, Submission,
    Thunk, ZeroSampler,
};
