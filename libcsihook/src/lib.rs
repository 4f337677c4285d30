//! # libcsihook — per-allocation CSI volume attachment for RK8s nodes
//!
//! `libcsihook` implements the node-agent lifecycle hook that, before an
//! allocation's tasks start, claims externally attached CSI volumes from the
//! control plane, mounts them through local plugin mounters, and publishes
//! the resulting mount paths for later task-setup hooks — then releases the
//! claims when the allocation stops.  It follows the RK8s architecture
//! conventions (Tokio async runtime, `tracing` for observability,
//! `thiserror` for structured errors, QUIC via [`quinn`] for the
//! control-plane transport).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: allocations, volume requests, claims, mounts. |
//! | [`error`] | [`HookError`] enum covering all failure modes. |
//! | [`capability`] | Task driver capability validation, before any RPC. |
//! | [`client`] | [`ControlPlaneClient`] trait — claim and unpublish seam. |
//! | [`transport`] | QUIC client and [`VolumeRpc`] envelope built on `quinn`. |
//! | [`mounter`] | Mounter traits and the plugin-keyed registry. |
//! | [`resources`] | Allocation-scoped hook resource state. |
//! | [`config`] | Environment-derived hook settings. |
//! | [`hook`] | [`CsiHook`] — the pre-start / teardown orchestration. |

pub mod capability;
pub mod client;
pub mod config;
pub mod error;
pub mod hook;
pub mod mounter;
pub mod resources;
pub mod transport;
pub mod types;

// Re-export the most commonly used items at crate root for convenience.
pub use capability::TaskCapabilities;
pub use client::ControlPlaneClient;
pub use error::HookError;
pub use hook::CsiHook;
pub use mounter::{MounterRegistry, MounterSource, UsageOptions, VolumeMounter};
pub use resources::{AllocHookResources, HookResourceSetter, SharedHookResources};
pub use transport::message::VolumeRpc;
pub use types::*;
