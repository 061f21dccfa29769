//! High-level operations.
//!
//! This module contains the implementation of mpbundle commands.

pub mod assemble;
pub mod assets;
pub mod plan;
pub mod resolve;
pub mod session;

pub use assemble::{assemble_app, read_generated, BuildOutcome, PipelineOptions};
pub use assets::{asset_patterns, collect_assets, emit_assets, Asset, AssetPatterns, EmitReport};
pub use plan::{export_app_rules, plan_app, plan_facts, split_options};
pub use resolve::{load_workspace, resolve_app, resolve_app_with, resolve_in_session, ResolvedApp};
pub use session::{BuildSession, Ticket};
