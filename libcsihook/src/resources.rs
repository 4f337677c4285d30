//! Allocation-scoped hook resources.
//!
//! [`AllocHookResources`] is shared across all lifecycle hooks of one
//! allocation; this hook publishes the alias -> [`MountInfo`] map into it
//! once, after every mount has succeeded, and later hooks (task environment
//! setup) read it.  Updates are read-modify-write of the whole mounts field,
//! never a partial patch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::types::MountInfo;

/// Resources produced by an allocation's hooks for consumption by later
/// hooks of the same allocation.
#[derive(Debug, Clone, Default)]
pub struct AllocHookResources {
    /// CSI mount descriptors, keyed by volume alias.  A complete snapshot:
    /// replaced wholesale by the volume hook, never partially patched.
    pub csi_mounts: HashMap<String, MountInfo>,
}

/// Accessor for an allocation's hook resources, implemented by the
/// allocation runner's resource store.
pub trait HookResourceSetter: Send + Sync {
    /// Snapshot the current resources.
    fn get_alloc_hook_resources(&self) -> AllocHookResources;

    /// Replace the current resources.
    fn set_alloc_hook_resources(&self, res: AllocHookResources);
}

/// Shared in-memory resource store for one allocation.  Clones share the
/// same underlying state, which is how sibling hooks observe the publish.
#[derive(Clone, Default)]
pub struct SharedHookResources {
    inner: Arc<Mutex<AllocHookResources>>,
}

impl SharedHookResources {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HookResourceSetter for SharedHookResources {
    fn get_alloc_hook_resources(&self) -> AllocHookResources {
        self.inner
            .lock()
            .expect("hook resources mutex poisoned")
            .clone()
    }

    fn set_alloc_hook_resources(&self, res: AllocHookResources) {
        *self.inner.lock().expect("hook resources mutex poisoned") = res;
    }
}
