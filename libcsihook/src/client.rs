//! Control-plane client seam.
//!
//! The hook never talks to a concrete transport directly; it depends on
//! [`ControlPlaneClient`], which the node agent wires to the QUIC client in
//! [`crate::transport`] in production and to recording fakes in tests.

use async_trait::async_trait;

use crate::error::HookError;
use crate::types::{ClaimVolumeRequest, ClaimVolumeResponse, UnpublishVolumeRequest};

/// The two control-plane operations the hook issues.
///
/// Calls are blocking from the hook's perspective: one claim or unpublish at
/// a time per alias, no internal parallelism.  Deadlines and retry policy
/// belong to the implementation, not to this seam.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Claim a volume for an allocation, returning the resolved volume and
    /// its publish context.
    async fn claim_volume(
        &self,
        req: ClaimVolumeRequest,
    ) -> Result<ClaimVolumeResponse, HookError>;

    /// Release a claim during teardown.
    async fn unpublish_volume(&self, req: UnpublishVolumeRequest) -> Result<(), HookError>;
}
