//! Allocation lifecycle hook for CSI volumes.
//!
//! [`CsiHook`] waits for remote CSI volumes to be claimed and mounted on the
//! host before any task of the allocation starts, and releases the claims
//! once the allocation stops.  It is a no-op for allocations that do not
//! declare CSI volumes.
//!
//! The pre-start phase runs claim -> mount -> publish in strict order: every
//! alias is claimed before any alias is mounted, and the mount map is
//! published to the allocation's hook resources only after every mount has
//! succeeded.  A failure at any step aborts the phase without compensating
//! rollback; already-held claims are released on the next teardown, and a
//! claim the teardown fails to release is reconciled by server-side garbage
//! collection.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::capability::{self, TaskCapabilities};
use crate::client::ControlPlaneClient;
use crate::error::{HookError, UnpublishErrors};
use crate::mounter::{MounterSource, UsageOptions};
use crate::resources::HookResourceSetter;
use crate::types::{
    Allocation, ClaimState, ClaimVolumeRequest, CsiVolume, PublishContext, RequestContext,
    TaskGroup, UnpublishVolumeRequest, VolumeClaim, VolumeRequest, VolumeType,
};

/// One volume alias being worked on by the hook: the declared request, the
/// resolved volume once the claim succeeds, and the claim's publish context.
///
/// Owned exclusively by one hook invocation; built during the pre-start
/// phase and read again (never recomputed) by teardown.
#[derive(Debug, Clone)]
pub struct VolumeAndRequest {
    /// The declared request.
    pub request: VolumeRequest,
    /// Resolved volume, populated once the server confirms the claim.
    pub volume: Option<CsiVolume>,
    /// Publish context returned with the claim.
    pub publish_context: PublishContext,
}

impl VolumeAndRequest {
    fn new(request: VolumeRequest) -> Self {
        Self {
            request,
            volume: None,
            publish_context: PublishContext::new(),
        }
    }
}

/// Per-allocation volume attachment hook.
///
/// One instance exists per allocation.  `prerun` and `postrun` never run
/// concurrently for the same allocation, so the pair map needs no
/// synchronization between the two phases.
pub struct CsiHook {
    alloc: Allocation,
    task_group: TaskGroup,
    manager: Arc<dyn MounterSource>,
    rpc: Arc<dyn ControlPlaneClient>,
    capabilities: Arc<dyn TaskCapabilities>,
    updater: Arc<dyn HookResourceSetter>,
    node_secret: String,

    volume_requests: HashMap<String, VolumeAndRequest>,
}

impl CsiHook {
    /// Create a hook for one allocation.  All collaborators are injected;
    /// the hook owns no transport or plugin state of its own.
    pub fn new(
        alloc: Allocation,
        task_group: TaskGroup,
        manager: Arc<dyn MounterSource>,
        rpc: Arc<dyn ControlPlaneClient>,
        capabilities: Arc<dyn TaskCapabilities>,
        updater: Arc<dyn HookResourceSetter>,
        node_secret: String,
    ) -> Self {
        Self {
            alloc,
            task_group,
            manager,
            rpc,
            capabilities,
            updater,
            node_secret,
            volume_requests: HashMap::new(),
        }
    }

    /// Hook name, used by the allocation runner for logging.
    pub fn name(&self) -> &'static str {
        "csi_hook"
    }

    /// The pair map built by the last `prerun`, keyed by alias.
    pub fn volume_requests(&self) -> &HashMap<String, VolumeAndRequest> {
        &self.volume_requests
    }

    fn should_run(&self) -> bool {
        self.task_group.has_csi_volumes()
    }

    fn request_context(&self) -> RequestContext {
        RequestContext {
            region: self.alloc.region.clone(),
            namespace: self.alloc.namespace.clone(),
            auth_token: self.node_secret.clone(),
        }
    }

    /// Pre-start phase: claim every declared CSI volume, mount each one, and
    /// publish the complete mount map to the allocation's hook resources.
    ///
    /// Fatal on the first failure; the caller treats the error as a failed
    /// start attempt and applies its own retry policy.
    #[instrument(skip(self), fields(alloc_id = %self.alloc.id))]
    pub async fn prerun(&mut self) -> Result<(), HookError> {
        if !self.should_run() {
            return Ok(());
        }

        let volumes = self.claim_volumes().await?;
        self.volume_requests = volumes;

        let mut mounts = HashMap::with_capacity(self.volume_requests.len());
        for (alias, pair) in &self.volume_requests {
            // Invariant: every pair was resolved by claim_volumes above.
            let volume = pair
                .volume
                .as_ref()
                .ok_or_else(|| HookError::internal(format!("unresolved pair for {alias}")))?;

            let mounter = self.manager.mounter_for_plugin(&volume.plugin_id)?;
            let usage = UsageOptions::from(&pair.request);

            let mount_info = mounter
                .mount_volume(volume, &self.alloc, &usage, &pair.publish_context)
                .await
                .map_err(|e| HookError::Mount {
                    alias: alias.clone(),
                    reason: e.to_string(),
                })?;

            info!(%alias, volume_id = %volume.id, path = %mount_info.source, "volume mounted");
            mounts.insert(alias.clone(), mount_info);
        }

        let mut res = self.updater.get_alloc_hook_resources();
        res.csi_mounts = mounts;
        self.updater.set_alloc_hook_resources(res);

        Ok(())
    }

    /// Teardown phase: release every claim made during `prerun`.
    ///
    /// Best-effort across aliases: a failed unpublish does not stop the
    /// loop, and all failures are aggregated into one error.  The claims may
    /// be forwarded by the server to node or controller plugins depending on
    /// whether other allocations on this node still hold the volume.
    #[instrument(skip(self), fields(alloc_id = %self.alloc.id))]
    pub async fn postrun(&mut self) -> Result<(), HookError> {
        if !self.should_run() {
            return Ok(());
        }

        let mut errs = UnpublishErrors::default();

        for (alias, pair) in &self.volume_requests {
            let source = pair.request.effective_source(&self.alloc);

            let req = UnpublishVolumeRequest {
                volume_id: source.into(),
                claim: VolumeClaim {
                    allocation_id: self.alloc.id.clone(),
                    node_id: self.alloc.node_id.clone(),
                    mode: pair.request.claim_mode(),
                    state: ClaimState::Unpublishing,
                },
                context: self.request_context(),
            };

            if let Err(e) = self.rpc.unpublish_volume(req).await {
                warn!(%alias, error = %e, "volume unpublish failed");
                errs.push(alias, e);
            } else {
                info!(%alias, "volume unpublished");
            }
        }

        errs.into_result()
    }

    /// Build the alias -> pair map and claim every volume from the control
    /// plane, storing the resolved volume and publish context into each pair.
    ///
    /// Capability validation runs first, before any RPC.  Claims are issued
    /// one alias at a time and the whole phase aborts on the first failure;
    /// aliases already claimed in this invocation stay held for teardown to
    /// release.
    async fn claim_volumes(&self) -> Result<HashMap<String, VolumeAndRequest>, HookError> {
        capability::validate_group(&self.task_group, self.capabilities.as_ref())?;

        let mut result = HashMap::new();
        for (alias, request) in &self.task_group.volumes {
            if request.volume_type == VolumeType::Csi {
                result.insert(alias.clone(), VolumeAndRequest::new(request.clone()));
            }
        }

        for (alias, pair) in result.iter_mut() {
            let source = pair.request.effective_source(&self.alloc);

            let req = ClaimVolumeRequest {
                volume_id: source.clone().into(),
                allocation_id: self.alloc.id.clone(),
                node_id: self.alloc.node_id.clone(),
                mode: pair.request.claim_mode(),
                access_mode: pair.request.access_mode,
                attachment_mode: pair.request.attachment_mode,
                context: self.request_context(),
            };

            let resp = self
                .rpc
                .claim_volume(req)
                .await
                .map_err(|e| HookError::Claim {
                    volume_id: source.clone(),
                    reason: e.to_string(),
                })?;

            let volume = resp.volume.ok_or_else(|| HookError::MissingVolume {
                source: pair.request.source.clone(),
            })?;

            info!(%alias, volume_id = %volume.id, "volume claimed");
            pair.volume = Some(volume);
            pair.publish_context = resp.publish_context;
        }

        Ok(result)
    }
}
