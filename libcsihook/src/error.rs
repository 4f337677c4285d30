//! Hook error types.
//!
//! All failures in `libcsihook` are represented by the [`HookError`] enum,
//! which derives [`thiserror::Error`] and implements [`Serialize`]/
//! [`Deserialize`] so errors can travel back across the QUIC transport.
//!
//! Teardown is the one place where multiple failures can accumulate:
//! [`UnpublishErrors`] collects every per-alias release failure and is
//! surfaced as a single [`HookError::Unpublish`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error type for hook operations.
///
/// `Display` and [`std::error::Error`] are implemented by hand rather than via
/// `thiserror` because the `MissingVolume` variant carries a field named
/// `source` that is plain data, not a source error — `derive(Error)` would
/// unconditionally treat it as the error source.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum HookError {
    /// A task's driver does not support mounting volumes.  Raised before any
    /// RPC is issued.
    CapabilityUnsupported {
        /// Offending task name.
        task: String,
        /// The task's driver.
        driver: String,
    },

    /// The driver capability lookup itself failed.
    CapabilityLookup {
        /// Task whose capabilities could not be resolved.
        task: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A claim request failed in transport or was rejected by the server.
    Claim {
        /// Effective volume ID the claim was issued for.
        volume_id: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// The server acknowledged a claim but returned no volume.  This is a
    /// protocol violation and fatal to the pre-start phase.
    MissingVolume {
        /// Declared source name of the request.
        source: String,
    },

    /// No mounter is registered for the resolved volume's plugin.
    UnknownPlugin(String),

    /// A local plugin mount failed.
    Mount {
        /// Alias of the volume that failed to mount.
        alias: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// One or more claims could not be released during teardown.
    Unpublish(UnpublishErrors),

    /// A QUIC / transport-level error.
    Transport(String),

    /// An unclassified internal error.
    Internal(String),
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapabilityUnsupported { task, driver } => write!(
                f,
                "task driver {driver:?} for {task:?} does not support CSI volumes"
            ),
            Self::CapabilityLookup { task, reason } => write!(
                f,
                "could not validate task driver capabilities for {task:?}: {reason}"
            ),
            Self::Claim { volume_id, reason } => {
                write!(f, "could not claim volume {volume_id}: {reason}")
            }
            Self::MissingVolume { source } => {
                write!(f, "unexpected empty volume returned for source {source}")
            }
            Self::UnknownPlugin(plugin) => write!(f, "no mounter found for plugin {plugin}"),
            Self::Mount { alias, reason } => {
                write!(f, "mounting volume {alias} failed: {reason}")
            }
            Self::Unpublish(errs) => write!(f, "{errs}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for HookError {}

impl HookError {
    /// Create a [`HookError::Transport`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }

    /// Create a [`HookError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

/// One failed unpublish attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpublishFailure {
    /// Alias of the volume whose release failed.
    pub alias: String,
    /// Message of the underlying error.
    pub message: String,
}

/// Ordered collection of per-alias unpublish failures.
///
/// The teardown loop attempts every alias regardless of earlier failures and
/// records them here in attempt order; each entry preserves the alias and the
/// underlying message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnpublishErrors {
    failures: Vec<UnpublishFailure>,
}

impl UnpublishErrors {
    /// Record a failure for `alias`.
    pub fn push(&mut self, alias: &str, err: HookError) {
        self.failures.push(UnpublishFailure {
            alias: alias.to_owned(),
            message: err.to_string(),
        });
    }

    /// Whether any failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Iterate the recorded failures in attempt order.
    pub fn iter(&self) -> impl Iterator<Item = &UnpublishFailure> {
        self.failures.iter()
    }

    /// `Ok(())` when no failure was recorded, otherwise the aggregate error.
    pub fn into_result(self) -> Result<(), HookError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(HookError::Unpublish(self))
        }
    }
}

impl fmt::Display for UnpublishErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} volume unpublish failure(s):", self.failures.len())?;
        for failure in &self.failures {
            write!(f, " [{}: {}]", failure.alias, failure.message)?;
        }
        Ok(())
    }
}
