// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! devhost-adapters: the Process Adapter (SPEC_FULL.md §4.3) — native and
//! container backends behind one trait.

pub mod process;
pub mod subprocess;

pub use process::{
    CapturedLine, ContainerAdapter, ExitStatus, NativeAdapter, ProcessAdapter, ProcessHandle,
    SpawnSpec, Stream,
};

#[cfg(any(test, feature = "test-support"))]
pub use process::FakeProcessAdapter;
