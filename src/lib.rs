//! mpbundle - build orchestration for mini-program applications
//!
//! This crate provides the core library functionality for mpbundle:
//! discovering every page and component reachable from `app.json`,
//! planning how shared code is split into runtime, vendor and commons
//! bundles, and assembling the host bundler's output into a bundle set the
//! mini-program runtime can load without dynamic chunk fetching.

pub mod assembler;
pub mod core;
pub mod ops;
pub mod partition;
pub mod resolver;
pub mod util;

/// Test utilities for mpbundle unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides an in-memory descriptor reader and on-disk app fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    entry::EntryId, entry::EntryRef, entry_set::EntrySet, manifest::AppManifest,
    workspace::AppWorkspace,
};

pub use assembler::AssembleOptions;
pub use partition::PartitionPlan;
pub use resolver::Resolution;
pub use util::context::GlobalContext;
