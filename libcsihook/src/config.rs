//! Hook configuration.
//!
//! Environment variables:
//! - `CSIHOOK_RPC_TIMEOUT_SECS`: deadline in seconds applied to each
//!   individual claim/unpublish RPC by the QUIC client.  Defaults to `30`.
//!
//! The connection lifetime is managed by the transport endpoint; this
//! setting only bounds individual calls.

use std::sync::LazyLock;
use std::time::Duration;

/// Global hook settings, read from environment variables at first access.
pub struct HookSettings {
    /// Per-call deadline for control-plane RPCs.
    pub rpc_timeout: Duration,
}

/// Globally initialized hook settings.
pub static HOOK_SETTINGS: LazyLock<HookSettings> = LazyLock::new(|| HookSettings {
    rpc_timeout: Duration::from_secs(
        std::env::var("CSIHOOK_RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
    ),
});
