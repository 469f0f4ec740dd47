//! stackflow reconciliation core
//!
//! This crate turns desired-state records into the minimal set of
//! CloudStack mutations, on top of the [`stackflow_api::Gateway`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              stackflow CLI (apply)               │
//! └─────────────────┬───────────────────────────────┘
//!                   │ ManagedResource + ScopeContext
//! ┌─────────────────▼───────────────────────────────┐
//! │                stackflow-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Reconciler: present / absent / revert    │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌────────┐ ┌────────┐ ┌────────┐  │
//! │  │ Resolver │ │  Diff  │ │ Poller │ │Project │  │
//! │  └──────────┘ └────────┘ └────────┘ └────────┘  │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │ stackflow-api │
//! │   (Gateway)   │
//! └───────────────┘
//! ```

pub mod diff;
pub mod error;
pub mod poller;
pub mod projector;
pub mod reconciler;
pub mod resolver;
pub mod scope;
pub mod tags;

// Re-exports
pub use diff::Diff;
pub use error::{ReconcileError, Result};
pub use poller::{JobHandle, JobPoller, PollConfig};
pub use projector::{COMMON_RETURNS, OutputRecord};
pub use reconciler::{ApiCall, ManagedResource, Reconciler, Run, RunOptions, TargetState};
pub use resolver::Resolver;
pub use scope::{Requirement, ResourceKind, ScopeContext};
pub use tags::{Tag, TagSpec};
