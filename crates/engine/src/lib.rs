// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-engine: the executor backends that take a resolved [`oj_core::Job`]
//! and run it — in-process, on a local worker pool, or on a remote
//! cluster — and report completion back through callbacks.

pub mod cluster;
pub mod cpu;
pub mod dryrun;
pub mod executor;
pub mod run_wrapper;
pub mod touch;

pub use cluster::drmaa::{DrmaaExecutor, DrmaaSession};
pub use cluster::generic::GenericClusterExecutor;
pub use cluster::synchronous::SynchronousClusterExecutor;
pub use cluster::ClusterConfig;
pub use cpu::CpuExecutor;
pub use dryrun::DryRunExecutor;
pub use executor::{Callback, ErrCallback, Executor};
pub use touch::TouchExecutor;

#[cfg(any(test, feature = "test-support"))]
pub use cluster::drmaa::FakeDrmaaSession;
