//! Process-wide allocator registry
//!
//! The registry is the explicit context object behind locator resolution: it
//! maps allocator ids to live allocators and designates the default
//! allocator used when construction does not name one. The process-wide
//! instance is created once before first use via [`global_registry`] and is
//! never reinitialized; [`AllocatorRegistry::clear`] is the single teardown.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock, RwLock},
};

use crate::error::{Result, ShmPtrError};

use super::traits::{AllocatorId, SegmentAllocator};

/// Registry of live allocators, keyed by id
#[derive(Debug, Default)]
pub struct AllocatorRegistry {
    /// Map of allocator ids to allocators
    allocators: RwLock<HashMap<AllocatorId, Arc<dyn SegmentAllocator>>>,
    /// Id of the default allocator, if one has been designated
    default_id: RwLock<Option<AllocatorId>>,
}

impl AllocatorRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an allocator under its own id
    pub fn register(&self, allocator: Arc<dyn SegmentAllocator>) -> Result<()> {
        let id = allocator.id();

        let mut allocators = self.allocators.write().unwrap();
        if allocators.contains_key(&id) {
            return Err(ShmPtrError::allocator_exists(id.0));
        }

        tracing::debug!(id = id.0, "registered allocator");
        allocators.insert(id, allocator);
        Ok(())
    }

    /// Register an allocator and make it the default
    pub fn register_default(&self, allocator: Arc<dyn SegmentAllocator>) -> Result<()> {
        let id = allocator.id();
        self.register(allocator)?;
        self.set_default(id)
    }

    /// Remove an allocator from the registry
    pub fn unregister(&self, id: AllocatorId) -> Result<()> {
        {
            let mut allocators = self.allocators.write().unwrap();
            allocators
                .remove(&id)
                .ok_or_else(|| ShmPtrError::allocator_not_found(id.0))?;
        }

        let mut default_id = self.default_id.write().unwrap();
        if *default_id == Some(id) {
            *default_id = None;
        }

        tracing::debug!(id = id.0, "unregistered allocator");
        Ok(())
    }

    /// Get an allocator by id
    pub fn get(&self, id: AllocatorId) -> Result<Arc<dyn SegmentAllocator>> {
        let allocators = self.allocators.read().unwrap();
        allocators
            .get(&id)
            .cloned()
            .ok_or_else(|| ShmPtrError::allocator_not_found(id.0))
    }

    /// Designate a registered allocator as the default
    pub fn set_default(&self, id: AllocatorId) -> Result<()> {
        {
            let allocators = self.allocators.read().unwrap();
            if !allocators.contains_key(&id) {
                return Err(ShmPtrError::allocator_not_found(id.0));
            }
        }

        tracing::debug!(id = id.0, "set default allocator");
        *self.default_id.write().unwrap() = Some(id);
        Ok(())
    }

    /// Get the default allocator
    pub fn default_allocator(&self) -> Result<Arc<dyn SegmentAllocator>> {
        let id = (*self.default_id.read().unwrap()).ok_or(ShmPtrError::NoDefaultAllocator)?;
        self.get(id)
    }

    /// Check if an allocator is registered
    pub fn contains(&self, id: AllocatorId) -> bool {
        self.allocators.read().unwrap().contains_key(&id)
    }

    /// Number of registered allocators
    pub fn len(&self) -> usize {
        self.allocators.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every allocator and the default designation.
    ///
    /// This is the registry teardown; no wrapper may resolve or allocate
    /// through the registry afterwards.
    pub fn clear(&self) {
        tracing::debug!("clearing allocator registry");
        self.allocators.write().unwrap().clear();
        *self.default_id.write().unwrap() = None;
    }
}

/// The process-wide registry, initialized on first use
pub fn global_registry() -> &'static AllocatorRegistry {
    static GLOBAL: OnceLock<AllocatorRegistry> = OnceLock::new();
    GLOBAL.get_or_init(AllocatorRegistry::new)
}
