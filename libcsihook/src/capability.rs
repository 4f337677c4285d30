//! Task driver capability validation.
//!
//! Before any claim RPC is issued, every task in a group that declares CSI
//! volumes must run under a driver that can mount them.  Validation is
//! synchronous and fail-fast: the first unsupported task aborts the whole
//! pre-start phase with an error naming the task and its driver.

use crate::error::HookError;
use crate::types::{DriverCapabilities, TaskGroup};

/// Lookup of a task's driver capabilities, implemented by the allocation
/// runner.  The hook depends only on this seam, never on the driver plumbing.
pub trait TaskCapabilities: Send + Sync {
    /// Resolve the capabilities of the driver that will run `task_name`.
    fn driver_capabilities(&self, task_name: &str) -> Result<DriverCapabilities, HookError>;
}

/// Validate that every task in `tg` can mount volumes.
///
/// A no-op for groups without CSI volume requests.  Returns the first
/// offending task as [`HookError::CapabilityUnsupported`].
pub fn validate_group(tg: &TaskGroup, caps: &dyn TaskCapabilities) -> Result<(), HookError> {
    if !tg.has_csi_volumes() {
        return Ok(());
    }

    for task in &tg.tasks {
        let driver_caps =
            caps.driver_capabilities(&task.name)
                .map_err(|e| HookError::CapabilityLookup {
                    task: task.name.clone(),
                    reason: e.to_string(),
                })?;

        if !driver_caps.mount_volumes {
            return Err(HookError::CapabilityUnsupported {
                task: task.name.clone(),
                driver: task.driver.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessMode, AttachmentMode, Task, VolumeRequest, VolumeType};
    use std::collections::HashMap;

    struct StaticCaps(HashMap<String, DriverCapabilities>);

    impl TaskCapabilities for StaticCaps {
        fn driver_capabilities(&self, task_name: &str) -> Result<DriverCapabilities, HookError> {
            self.0
                .get(task_name)
                .copied()
                .ok_or_else(|| HookError::Internal(format!("unknown task {task_name}")))
        }
    }

    fn group(volume_type: VolumeType) -> TaskGroup {
        TaskGroup {
            name: "cache".into(),
            tasks: vec![
                Task {
                    name: "redis".into(),
                    driver: "container".into(),
                },
                Task {
                    name: "sidecar".into(),
                    driver: "exec".into(),
                },
            ],
            volumes: HashMap::from([(
                "data".to_owned(),
                VolumeRequest {
                    volume_type,
                    source: "ebs-1".into(),
                    read_only: false,
                    per_alloc: false,
                    access_mode: AccessMode::ReadWriteOnce,
                    attachment_mode: AttachmentMode::FileSystem,
                    mount_options: None,
                },
            )]),
        }
    }

    #[test]
    fn all_drivers_support_mounts() {
        let caps = StaticCaps(HashMap::from([
            ("redis".to_owned(), DriverCapabilities { mount_volumes: true }),
            ("sidecar".to_owned(), DriverCapabilities { mount_volumes: true }),
        ]));
        assert!(validate_group(&group(VolumeType::Csi), &caps).is_ok());
    }

    #[test]
    fn unsupported_driver_names_task() {
        let caps = StaticCaps(HashMap::from([
            ("redis".to_owned(), DriverCapabilities { mount_volumes: true }),
            ("sidecar".to_owned(), DriverCapabilities { mount_volumes: false }),
        ]));
        let err = validate_group(&group(VolumeType::Csi), &caps).unwrap_err();
        match err {
            HookError::CapabilityUnsupported { task, driver } => {
                assert_eq!(task, "sidecar");
                assert_eq!(driver, "exec");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn lookup_failure_is_surfaced() {
        let caps = StaticCaps(HashMap::new());
        let err = validate_group(&group(VolumeType::Csi), &caps).unwrap_err();
        assert!(matches!(err, HookError::CapabilityLookup { .. }));
    }

    #[test]
    fn host_volumes_skip_validation() {
        // No capability entries at all: must still pass because the group has
        // no CSI volumes.
        let caps = StaticCaps(HashMap::new());
        assert!(validate_group(&group(VolumeType::Host), &caps).is_ok());
    }
}
