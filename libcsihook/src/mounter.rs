//! Local mounter seams and the plugin registry.
//!
//! The hook resolves a [`VolumeMounter`] for each resolved volume by plugin
//! ID and invokes it with the volume, the allocation identity, the usage
//! options derived from the request, and the claim's publish context.  The
//! mounters themselves are injected; implementing them is plugin-driver work
//! outside this crate.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::HookError;
use crate::types::{
    AccessMode, Allocation, AttachmentMode, CsiVolume, MountInfo, MountOptions, PublishContext,
    VolumeRequest,
};

/// How a volume will be used by the allocation, derived from its request.
#[derive(Debug, Clone)]
pub struct UsageOptions {
    /// Whether the mount must be read-only.
    pub read_only: bool,
    /// Access mode the claim was made with.
    pub access_mode: AccessMode,
    /// Attachment mode the claim was made with.
    pub attachment_mode: AttachmentMode,
    /// Optional filesystem mount options.
    pub mount_options: Option<MountOptions>,
}

impl From<&VolumeRequest> for UsageOptions {
    fn from(request: &VolumeRequest) -> Self {
        Self {
            read_only: request.read_only,
            access_mode: request.access_mode,
            attachment_mode: request.attachment_mode,
            mount_options: request.mount_options.clone(),
        }
    }
}

/// Plugin-specific mount operation for one volume.
#[async_trait]
pub trait VolumeMounter: Send + Sync {
    /// Mount `volume` for `alloc` and return the local mount descriptor.
    async fn mount_volume(
        &self,
        volume: &CsiVolume,
        alloc: &Allocation,
        usage: &UsageOptions,
        publish_context: &PublishContext,
    ) -> Result<MountInfo, HookError>;
}

/// Resolves the mounter responsible for a plugin ID.
pub trait MounterSource: Send + Sync {
    /// Look up the mounter for `plugin_id`.
    fn mounter_for_plugin(&self, plugin_id: &str) -> Result<Arc<dyn VolumeMounter>, HookError>;
}

/// Concurrent registry of mounters keyed by plugin ID.
///
/// Registration happens when the node agent fingerprints its plugins;
/// lookups happen from each allocation's hook, so the map must tolerate
/// concurrent access.
#[derive(Default)]
pub struct MounterRegistry {
    mounters: DashMap<String, Arc<dyn VolumeMounter>>,
}

impl MounterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the mounter for `plugin_id`.
    pub fn register(&self, plugin_id: &str, mounter: Arc<dyn VolumeMounter>) {
        self.mounters.insert(plugin_id.to_owned(), mounter);
    }

    /// Remove the mounter for `plugin_id`, if any.
    pub fn deregister(&self, plugin_id: &str) {
        self.mounters.remove(plugin_id);
    }
}

impl MounterSource for MounterRegistry {
    fn mounter_for_plugin(&self, plugin_id: &str) -> Result<Arc<dyn VolumeMounter>, HookError> {
        self.mounters
            .get(plugin_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| HookError::UnknownPlugin(plugin_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopMounter;

    #[async_trait]
    impl VolumeMounter for NoopMounter {
        async fn mount_volume(
            &self,
            volume: &CsiVolume,
            alloc: &Allocation,
            _usage: &UsageOptions,
            _publish_context: &PublishContext,
        ) -> Result<MountInfo, HookError> {
            Ok(MountInfo {
                source: format!("/var/lib/rkl/allocs/{}/{}", alloc.id, volume.id),
                is_device: false,
            })
        }
    }

    #[test]
    fn register_and_resolve() {
        let registry = MounterRegistry::new();
        registry.register("plugin-a", Arc::new(NoopMounter));
        assert!(registry.mounter_for_plugin("plugin-a").is_ok());
    }

    #[test]
    fn unknown_plugin_is_an_error() {
        let registry = MounterRegistry::new();
        let err = registry
            .mounter_for_plugin("plugin-b")
            .err()
            .expect("expected an error");
        assert!(matches!(err, HookError::UnknownPlugin(id) if id == "plugin-b"));
    }

    #[test]
    fn deregister_removes_mounter() {
        let registry = MounterRegistry::new();
        registry.register("plugin-a", Arc::new(NoopMounter));
        registry.deregister("plugin-a");
        assert!(registry.mounter_for_plugin("plugin-a").is_err());
    }

    #[test]
    fn usage_options_from_request() {
        let request = VolumeRequest {
            volume_type: crate::types::VolumeType::Csi,
            source: "ebs-1".into(),
            read_only: true,
            per_alloc: false,
            access_mode: AccessMode::ReadOnlyMany,
            attachment_mode: AttachmentMode::FileSystem,
            mount_options: Some(MountOptions {
                fs_type: Some("ext4".into()),
                mount_flags: vec!["noatime".into()],
            }),
        };
        let usage = UsageOptions::from(&request);
        assert!(usage.read_only);
        assert_eq!(usage.access_mode, AccessMode::ReadOnlyMany);
        assert_eq!(usage.mount_options.unwrap().fs_type.as_deref(), Some("ext4"));
    }
}
