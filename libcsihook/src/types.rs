//! Core data model for the volume attachment hook: allocations, volume
//! requests, resolved volumes, claims, and the claim/unpublish RPC bodies.
//!
//! These types are shared by the hook, the collaborator traits, and the QUIC
//! transport.  Everything that crosses the wire is [`Serialize`]/
//! [`Deserialize`] so it can be transmitted as JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Volume identity
// ---------------------------------------------------------------------------

/// Opaque, unique identifier for a volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VolumeId(pub String);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque key-value data returned by a claim and forwarded to the mounter.
/// Some plugins need it to complete a mount (connection secrets, lease ids).
pub type PublishContext = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Allocation identity
// ---------------------------------------------------------------------------

/// Identifies one running workload instance on a node.
///
/// Immutable for the lifetime of a hook invocation.  The `region` and
/// `namespace` fields are the routing context inherited from the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique allocation identifier.
    pub id: String,
    /// Identifier of the node this allocation runs on.
    pub node_id: String,
    /// Identifier of the owning job.
    pub job_id: String,
    /// Name of the task group within the job.
    pub task_group: String,
    /// Human-readable instance name, e.g. `"cache-0"`.
    pub name: String,
    /// Instance ordinal within the group (replica index).
    pub index: u64,
    /// Region routing context for control-plane requests.
    pub region: String,
    /// Namespace routing context for control-plane requests.
    pub namespace: String,
}

impl Allocation {
    /// Deterministic suffix appended to a per-instance volume source so that
    /// distinct replicas of the same group never resolve to the same volume.
    pub fn per_alloc_suffix(&self) -> String {
        format!("-{}", self.index)
    }
}

// ---------------------------------------------------------------------------
// Volume requests (workload specification input)
// ---------------------------------------------------------------------------

/// The kind of volume a task group asked for.  Only [`VolumeType::Csi`]
/// requests are handled by this hook; host volumes are mounted by the task
/// runtime directly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VolumeType {
    /// Externally attached volume managed by a CSI plugin.
    Csi,
    /// Node-local host path.
    Host,
}

/// Describes how a volume may be accessed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessMode {
    /// Single-node read-write.
    ReadWriteOnce,
    /// Multi-node read-only.
    ReadOnlyMany,
    /// Multi-node read-write.
    ReadWriteMany,
}

/// How the volume is attached to the node before mounting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttachmentMode {
    /// Mounted as a filesystem.
    FileSystem,
    /// Exposed as a raw block device.
    BlockDevice,
}

/// Filesystem-level mount options forwarded to the plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountOptions {
    /// Filesystem type, e.g. `"ext4"`.
    #[serde(default)]
    pub fs_type: Option<String>,
    /// Additional mount flags (e.g. `"noatime"`).
    #[serde(default)]
    pub mount_flags: Vec<String>,
}

/// One volume declared by a task group, keyed by alias in
/// [`TaskGroup::volumes`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRequest {
    /// Kind of volume requested.
    pub volume_type: VolumeType,
    /// Logical source name of the volume.
    pub source: String,
    /// Whether the tasks only need read access.
    #[serde(default)]
    pub read_only: bool,
    /// Whether the source name must be made unique per allocation instance.
    #[serde(default)]
    pub per_alloc: bool,
    /// Requested access mode.
    pub access_mode: AccessMode,
    /// Requested attachment mode.
    pub attachment_mode: AttachmentMode,
    /// Optional mount options.
    #[serde(default)]
    pub mount_options: Option<MountOptions>,
}

impl VolumeRequest {
    /// The claim mode implied by this request: write unless explicitly
    /// read-only.  Unpublish must use the same mode the claim was made with.
    pub fn claim_mode(&self) -> ClaimMode {
        if self.read_only {
            ClaimMode::Read
        } else {
            ClaimMode::Write
        }
    }

    /// The effective source name used as the volume ID on the wire.
    /// Per-instance volumes get the allocation's deterministic suffix.
    pub fn effective_source(&self, alloc: &Allocation) -> String {
        if self.per_alloc {
            format!("{}{}", self.source, alloc.per_alloc_suffix())
        } else {
            self.source.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved volumes (server-authoritative)
// ---------------------------------------------------------------------------

/// Capability descriptor attached to a resolved volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeCapability {
    /// Access mode granted for this capability.
    pub access_mode: AccessMode,
    /// Attachment mode granted for this capability.
    pub attachment_mode: AttachmentMode,
}

/// Server-authoritative volume metadata returned by a successful claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsiVolume {
    /// Unique volume identifier.
    pub id: VolumeId,
    /// Identifier of the plugin that owns this volume; selects the local
    /// mounter.
    pub plugin_id: String,
    /// Capabilities the server granted.
    #[serde(default)]
    pub capabilities: Vec<VolumeCapability>,
    /// Opaque context carried from provisioning to node operations.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Whether a claim grants read or write access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimMode {
    /// Read-only claim.
    Read,
    /// Read-write claim.
    Write,
}

/// Server-side lifecycle state of a claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimState {
    /// Claim requested, not yet confirmed.
    Claiming,
    /// Claim confirmed and held.
    Claimed,
    /// Claim is being released.
    Unpublishing,
}

/// The server-side record granting one allocation access to one volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeClaim {
    /// Allocation holding the claim.
    pub allocation_id: String,
    /// Node the allocation runs on.
    pub node_id: String,
    /// Read or write access.
    pub mode: ClaimMode,
    /// Current claim state.
    pub state: ClaimState,
}

// ---------------------------------------------------------------------------
// Control-plane RPC bodies
// ---------------------------------------------------------------------------

/// Routing and authentication context attached to every control-plane
/// request.  The auth token is the node secret supplied by configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Target region.
    pub region: String,
    /// Target namespace.
    pub namespace: String,
    /// Node authentication token.
    pub auth_token: String,
}

/// Request to claim a volume for an allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVolumeRequest {
    /// Effective volume ID (per-instance suffix already applied).
    pub volume_id: VolumeId,
    /// Allocation requesting the claim.
    pub allocation_id: String,
    /// Node the allocation runs on.
    pub node_id: String,
    /// Read or write claim.
    pub mode: ClaimMode,
    /// Requested access mode.
    pub access_mode: AccessMode,
    /// Requested attachment mode.
    pub attachment_mode: AttachmentMode,
    /// Routing and authentication context.
    pub context: RequestContext,
}

/// Response to a claim request.  A missing `volume` is a protocol violation
/// and is treated as a claim failure by the hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVolumeResponse {
    /// The resolved volume, authoritative for mounting.
    pub volume: Option<CsiVolume>,
    /// Plugin-specific data needed to complete the mount.
    #[serde(default)]
    pub publish_context: PublishContext,
}

/// Request to release a claim during allocation teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpublishVolumeRequest {
    /// Effective volume ID (same derivation as the claim).
    pub volume_id: VolumeId,
    /// The claim being released; `state` must be
    /// [`ClaimState::Unpublishing`].
    pub claim: VolumeClaim,
    /// Routing and authentication context.
    pub context: RequestContext,
}

// ---------------------------------------------------------------------------
// Mount results
// ---------------------------------------------------------------------------

/// The local result of successfully mounting one claimed volume.  Consumed
/// by later task-setup hooks via the allocation's hook resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountInfo {
    /// Local path where the volume is available.
    pub source: String,
    /// Whether the mount is a raw block device rather than a filesystem.
    #[serde(default)]
    pub is_device: bool,
}

// ---------------------------------------------------------------------------
// Task group inputs
// ---------------------------------------------------------------------------

/// One task within a group; only the fields the hook needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task name, used for capability lookup.
    pub name: String,
    /// Driver the task runs under, named in validation errors.
    pub driver: String,
}

/// The slice of the workload specification this hook consumes: the group's
/// tasks and its declared volumes, keyed by alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGroup {
    /// Group name.
    pub name: String,
    /// Tasks in the group.
    pub tasks: Vec<Task>,
    /// Declared volumes, alias -> request.
    pub volumes: HashMap<String, VolumeRequest>,
}

impl TaskGroup {
    /// Whether any declared volume is CSI-managed.
    pub fn has_csi_volumes(&self) -> bool {
        self.volumes
            .values()
            .any(|v| v.volume_type == VolumeType::Csi)
    }
}

/// Capabilities advertised by a task's driver.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DriverCapabilities {
    /// Whether the driver can mount volumes into the task filesystem.
    pub mount_volumes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(index: u64) -> Allocation {
        Allocation {
            id: format!("alloc-{index}"),
            node_id: "node-01".into(),
            job_id: "cache".into(),
            task_group: "cache".into(),
            name: format!("cache-{index}"),
            index,
            region: "global".into(),
            namespace: "default".into(),
        }
    }

    fn request(per_alloc: bool, read_only: bool) -> VolumeRequest {
        VolumeRequest {
            volume_type: VolumeType::Csi,
            source: "ebs-1".into(),
            read_only,
            per_alloc,
            access_mode: AccessMode::ReadWriteOnce,
            attachment_mode: AttachmentMode::FileSystem,
            mount_options: None,
        }
    }

    #[test]
    fn per_alloc_suffix_from_ordinal() {
        assert_eq!(alloc(0).per_alloc_suffix(), "-0");
        assert_eq!(alloc(3).per_alloc_suffix(), "-3");
    }

    #[test]
    fn effective_source_per_alloc() {
        let req = request(true, false);
        assert_eq!(req.effective_source(&alloc(0)), "ebs-1-0");
        assert_eq!(req.effective_source(&alloc(1)), "ebs-1-1");
    }

    #[test]
    fn effective_source_shared() {
        let req = request(false, false);
        assert_eq!(req.effective_source(&alloc(0)), "ebs-1");
        assert_eq!(req.effective_source(&alloc(1)), "ebs-1");
    }

    #[test]
    fn distinct_instances_never_collide() {
        let req = request(true, false);
        let a = req.effective_source(&alloc(0));
        let b = req.effective_source(&alloc(1));
        assert_ne!(a, b);
    }

    #[test]
    fn claim_mode_from_read_only() {
        assert_eq!(request(false, true).claim_mode(), ClaimMode::Read);
        assert_eq!(request(false, false).claim_mode(), ClaimMode::Write);
    }

    #[test]
    fn claim_request_serde_roundtrip() {
        let req = ClaimVolumeRequest {
            volume_id: "ebs-1-0".into(),
            allocation_id: "alloc-0".into(),
            node_id: "node-01".into(),
            mode: ClaimMode::Write,
            access_mode: AccessMode::ReadWriteOnce,
            attachment_mode: AttachmentMode::FileSystem,
            context: RequestContext {
                region: "global".into(),
                namespace: "default".into(),
                auth_token: "secret".into(),
            },
        };
        let json = serde_json::to_string(&req).expect("serialize");
        let de: ClaimVolumeRequest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(de.volume_id, req.volume_id);
        assert_eq!(de.mode, ClaimMode::Write);
    }

    #[test]
    fn volume_id_display() {
        let id = VolumeId("ebs-1".into());
        assert_eq!(id.to_string(), "ebs-1");
    }
}
