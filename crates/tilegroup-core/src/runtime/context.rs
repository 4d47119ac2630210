use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    exec::ChunkData,
    graph::ChunkKey,
    runtime::SizeRecorderHandle,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

///
/// ExecutionContext
///
/// Key-addressed chunk store plus the named size recorders used by auto
/// planning. Implementations are shared across executing chunks.
///

pub trait ExecutionContext: Send + Sync {
    fn get(&self, key: &ChunkKey) -> Option<Arc<ChunkData>>;

    fn set(&self, key: ChunkKey, data: ChunkData);

    fn create_size_recorder(&self, name: &str) -> Result<SizeRecorderHandle, InternalError>;

    fn size_recorder(&self, name: &str) -> Option<SizeRecorderHandle>;

    /// Returns whether a recorder was registered under `name`.
    fn destroy_size_recorder(&self, name: &str) -> bool;

    fn contains(&self, key: &ChunkKey) -> bool {
        self.get(key).is_some()
    }

    fn fetch(&self, key: &ChunkKey) -> Result<Arc<ChunkData>, InternalError> {
        self.get(key).ok_or_else(|| InternalError::chunk_not_found(key))
    }
}

///
/// MemoryContext
///
/// In-process context backed by hash maps.
///

#[derive(Debug, Default)]
pub struct MemoryContext {
    chunks: RwLock<HashMap<ChunkKey, Arc<ChunkData>>>,
    recorders: Mutex<HashMap<String, SizeRecorderHandle>>,
}

impl MemoryContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn recorder_count(&self) -> usize {
        self.recorders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ExecutionContext for MemoryContext {
    fn get(&self, key: &ChunkKey) -> Option<Arc<ChunkData>> {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: ChunkKey, data: ChunkData) {
        self.chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(data));
    }

    fn create_size_recorder(&self, name: &str) -> Result<SizeRecorderHandle, InternalError> {
        let mut recorders = self
            .recorders
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if recorders.contains_key(name) {
            return Err(InternalError::new(
                ErrorClass::InvalidInput,
                ErrorOrigin::Runtime,
                format!("size recorder '{name}' already exists"),
            ));
        }

        let handle = SizeRecorderHandle::new(name);
        recorders.insert(name.to_string(), handle.clone());

        Ok(handle)
    }

    fn size_recorder(&self, name: &str) -> Option<SizeRecorderHandle> {
        self.recorders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn destroy_size_recorder(&self, name: &str) -> bool {
        self.recorders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }
}
