//! Output buffer ownership.
//!
//! Every merged output lives in an [`OutputRegistry`] for as long as its
//! [`OutputHandle`] is alive. Dropping the handle revokes the entry, so
//! repeated merges never accumulate buffers.

use crate::merge::MergeOutput;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Shared table of live outputs.
#[derive(Debug, Clone, Default)]
pub struct OutputRegistry {
    outputs: Arc<Mutex<HashMap<Uuid, MergeOutput>>>,
}

impl OutputRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, MergeOutput>> {
        match self.outputs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store `output` and return the handle that owns it.
    pub fn register(&self, output: MergeOutput) -> OutputHandle {
        let id = Uuid::new_v4();
        debug!(output = %id, file = %output.file_name, bytes = output.size, "Registered output");
        self.lock().insert(id, output);
        OutputHandle {
            id,
            registry: self.clone(),
        }
    }

    /// A copy of a live output.
    pub fn get(&self, id: Uuid) -> Option<MergeOutput> {
        self.lock().get(&id).cloned()
    }

    /// Whether `id` is still live.
    pub fn contains(&self, id: Uuid) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of live outputs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is live.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop one output. Returns whether it was live.
    pub fn revoke(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(output = %id, "Revoked output");
        }
        removed
    }

    /// Drop every output, returning how many were live.
    pub fn revoke_all(&self) -> usize {
        let mut outputs = self.lock();
        let count = outputs.len();
        outputs.clear();
        count
    }
}

/// Owner of one registered output. Revokes it on drop.
#[derive(Debug)]
pub struct OutputHandle {
    id: Uuid,
    registry: OutputRegistry,
}

impl OutputHandle {
    /// Registry key.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The output, unless it was revoked through the registry.
    pub fn output(&self) -> Option<MergeOutput> {
        self.registry.get(self.id)
    }

    /// The output bytes.
    pub fn data(&self) -> Option<Bytes> {
        self.output().map(|output| output.data)
    }

    /// Whether the output is still live.
    pub fn is_live(&self) -> bool {
        self.registry.contains(self.id)
    }

    /// Revoke now.
    pub fn release(self) {}
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::LogicalFormat;

    fn output(name: &str) -> MergeOutput {
        MergeOutput {
            data: Bytes::from_static(b"data"),
            size: 4,
            media_type: "text/plain".to_string(),
            file_name: name.to_string(),
            format: LogicalFormat::Txt,
            requested_format: LogicalFormat::Txt,
            degraded: false,
        }
    }

    #[test]
    fn test_handle_drop_revokes() {
        let registry = OutputRegistry::new();
        let handle = registry.register(output("a.txt"));
        let id = handle.id();

        assert!(registry.contains(id));
        assert_eq!(handle.data().unwrap(), Bytes::from_static(b"data"));

        drop(handle);
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_and_revoke_all() {
        let registry = OutputRegistry::new();
        let first = registry.register(output("a.txt"));
        let second = registry.register(output("b.txt"));
        assert_eq!(registry.len(), 2);

        first.release();
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.revoke_all(), 1);
        assert!(!second.is_live());
        assert!(second.output().is_none());
    }
}
