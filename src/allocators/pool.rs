//! Pool allocator - manages fixed-size blocks with a lock-free free list

use std::{
    ptr::NonNull,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use crate::{
    error::{Result, ShmPtrError},
    memory::SharedSegment,
};

use super::{
    bump::BumpAllocator,
    traits::{AllocatorId, AllocatorStats, SegmentAllocator},
};

/// Fixed-block pool allocator.
///
/// Blocks are linked through an index-based free list stored in the blocks
/// themselves, so the list survives remapping at a different base address.
#[derive(Debug)]
pub struct PoolAllocator {
    /// Allocator identity carried by every locator it produces
    id: AllocatorId,
    /// Base pointer of the span
    base_ptr: NonNull<u8>,
    /// Total size of the span
    total_size: usize,
    /// Size of each block
    block_size: usize,
    /// Total number of blocks
    total_blocks: usize,
    /// Free list head (block index, usize::MAX when exhausted)
    free_head: AtomicUsize,
    /// Number of live allocations
    allocated_count: AtomicUsize,
    /// Total successful allocations
    alloc_count: AtomicU64,
    /// Total successful frees
    free_count: AtomicU64,
    /// Keeps the backing segment mapped for the allocator's lifetime
    _segment: Option<Arc<SharedSegment>>,
}

impl PoolAllocator {
    /// Create a new pool allocator over caller-provided memory.
    ///
    /// The memory must outlive the allocator.
    pub fn new(id: AllocatorId, memory: &mut [u8], block_size: usize) -> Result<Self> {
        if memory.is_empty() {
            return Err(ShmPtrError::invalid_parameter(
                "memory",
                "Memory region cannot be empty",
            ));
        }

        let base_ptr = NonNull::new(memory.as_mut_ptr())
            .ok_or_else(|| ShmPtrError::memory("Invalid memory pointer"))?;

        Self::build(id, base_ptr, memory.len(), block_size, None)
    }

    /// Create a pool allocator spanning a whole shared segment, co-owning
    /// the mapping.
    pub fn for_segment(
        id: AllocatorId,
        segment: Arc<SharedSegment>,
        block_size: usize,
    ) -> Result<Self> {
        let base_ptr = NonNull::new(unsafe { segment.as_base_ptr() })
            .ok_or_else(|| ShmPtrError::memory("Invalid segment base pointer"))?;
        let size = segment.size();

        Self::build(id, base_ptr, size, block_size, Some(segment))
    }

    fn build(
        id: AllocatorId,
        base_ptr: NonNull<u8>,
        size: usize,
        block_size: usize,
        segment: Option<Arc<SharedSegment>>,
    ) -> Result<Self> {
        if block_size < std::mem::size_of::<usize>() {
            return Err(ShmPtrError::invalid_parameter(
                "block_size",
                "Block size must be at least pointer size",
            ));
        }

        let aligned_block_size = BumpAllocator::align_up(block_size, std::mem::align_of::<usize>());
        let total_blocks = size / aligned_block_size;

        if total_blocks == 0 {
            return Err(ShmPtrError::invalid_parameter(
                "block_size",
                "Block size too large for memory region",
            ));
        }

        let allocator = Self {
            id,
            base_ptr,
            total_size: size,
            block_size: aligned_block_size,
            total_blocks,
            free_head: AtomicUsize::new(0),
            allocated_count: AtomicUsize::new(0),
            alloc_count: AtomicU64::new(0),
            free_count: AtomicU64::new(0),
            _segment: segment,
        };

        allocator.initialize_free_list();

        Ok(allocator)
    }

    /// Initialize the free list by linking all blocks
    fn initialize_free_list(&self) {
        let base_addr = self.base_ptr.as_ptr() as usize;

        for i in 0..self.total_blocks {
            let block_addr = base_addr + i * self.block_size;
            let next_index = if i + 1 < self.total_blocks {
                i + 1
            } else {
                usize::MAX
            };

            unsafe {
                *(block_addr as *mut usize) = next_index;
            }
        }
    }

    /// Convert block index to memory address
    fn index_to_addr(&self, index: usize) -> usize {
        self.base_ptr.as_ptr() as usize + index * self.block_size
    }

    /// Convert memory address to block index
    fn addr_to_index(&self, addr: usize) -> usize {
        (addr - self.base_ptr.as_ptr() as usize) / self.block_size
    }

    /// Size of each block after alignment
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl SegmentAllocator for PoolAllocator {
    fn id(&self) -> AllocatorId {
        self.id
    }

    fn allocate(&self, size: usize, _align: usize) -> Result<NonNull<u8>> {
        if size == 0 {
            return Err(ShmPtrError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        if size > self.block_size {
            return Err(ShmPtrError::invalid_parameter(
                "size",
                "Size exceeds block size",
            ));
        }

        loop {
            let current_head = self.free_head.load(Ordering::Acquire);

            if current_head == usize::MAX {
                return Err(ShmPtrError::insufficient_space(size, 0));
            }

            let current_addr = self.index_to_addr(current_head);
            let next_index = unsafe { *(current_addr as *const usize) };

            match self.free_head.compare_exchange_weak(
                current_head,
                next_index,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.allocated_count.fetch_add(1, Ordering::Relaxed);
                    self.alloc_count.fetch_add(1, Ordering::Relaxed);
                    let ptr = NonNull::new(current_addr as *mut u8)
                        .ok_or_else(|| ShmPtrError::memory("Failed to create pointer"))?;
                    return Ok(ptr);
                }
                Err(_) => {
                    // Retry with updated head
                    continue;
                }
            }
        }
    }

    fn deallocate(&self, ptr: NonNull<u8>, _size: usize, _align: usize) -> Result<()> {
        if !self.owns(ptr) {
            return Err(ShmPtrError::invalid_parameter(
                "ptr",
                "Pointer not owned by this allocator",
            ));
        }

        let addr = ptr.as_ptr() as usize;
        let index = self.addr_to_index(addr);

        loop {
            let current_head = self.free_head.load(Ordering::Acquire);

            // Link this block ahead of the current head
            unsafe {
                *(addr as *mut usize) = current_head;
            }

            match self.free_head.compare_exchange_weak(
                current_head,
                index,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.allocated_count.fetch_sub(1, Ordering::Relaxed);
                    self.free_count.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                Err(_) => {
                    // Retry with updated head
                    continue;
                }
            }
        }
    }

    fn total_size(&self) -> usize {
        self.total_size
    }

    fn used_size(&self) -> usize {
        self.allocated_count.load(Ordering::Acquire) * self.block_size
    }

    fn owns(&self, ptr: NonNull<u8>) -> bool {
        let ptr_addr = ptr.as_ptr() as usize;
        let base_addr = self.base_ptr.as_ptr() as usize;

        if ptr_addr < base_addr || ptr_addr >= base_addr + self.total_size {
            return false;
        }

        // Must sit on a block boundary
        (ptr_addr - base_addr) % self.block_size == 0
    }

    fn offset_of(&self, ptr: NonNull<u8>) -> u64 {
        debug_assert!(self.owns(ptr), "pointer not owned by this allocator");
        (ptr.as_ptr() as usize - self.base_ptr.as_ptr() as usize) as u64
    }

    fn resolve_offset(&self, off: u64) -> NonNull<u8> {
        debug_assert!((off as usize) < self.total_size, "offset out of range");
        unsafe { NonNull::new_unchecked(self.base_ptr.as_ptr().add(off as usize)) }
    }

    fn reset(&self) -> Result<()> {
        self.initialize_free_list();
        self.free_head.store(0, Ordering::Release);
        self.allocated_count.store(0, Ordering::Release);
        Ok(())
    }

    fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            total_size: self.total_size,
            used_size: self.used_size(),
            available_size: self.available_size(),
            allocation_count: self.alloc_count.load(Ordering::Relaxed),
            free_count: self.free_count.load(Ordering::Relaxed),
        }
    }
}

unsafe impl Send for PoolAllocator {}
unsafe impl Sync for PoolAllocator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_allocate_free_reuse() {
        let mut memory = vec![0u8; 1024];
        let allocator = PoolAllocator::new(AllocatorId(1), &mut memory, 64).unwrap();

        assert_eq!(allocator.total_size(), 1024);
        assert_eq!(allocator.used_size(), 0);

        let ptr1 = allocator.allocate(32, 8).unwrap();
        assert!(allocator.owns(ptr1));
        assert_eq!(allocator.used_size(), 64);

        let ptr2 = allocator.allocate(64, 8).unwrap();
        assert!(allocator.owns(ptr2));
        assert_eq!(allocator.used_size(), 128);

        allocator.deallocate(ptr1, 32, 8).unwrap();
        assert_eq!(allocator.used_size(), 64);

        // Freed block is reused
        let ptr3 = allocator.allocate(48, 8).unwrap();
        assert!(allocator.owns(ptr3));
        assert_eq!(allocator.used_size(), 128);
    }

    #[test]
    fn test_pool_counters() {
        let mut memory = vec![0u8; 512];
        let allocator = PoolAllocator::new(AllocatorId(2), &mut memory, 64).unwrap();

        let ptr = allocator.allocate(8, 8).unwrap();
        allocator.deallocate(ptr, 8, 8).unwrap();

        let stats = allocator.stats();
        assert_eq!(stats.allocation_count, 1);
        assert_eq!(stats.free_count, 1);
        assert_eq!(stats.used_size, 0);
    }

    #[test]
    fn test_pool_offset_round_trip() {
        let mut memory = vec![0u8; 512];
        let allocator = PoolAllocator::new(AllocatorId(3), &mut memory, 64).unwrap();

        let ptr = allocator.allocate(16, 8).unwrap();
        let off = allocator.offset_of(ptr);
        assert_eq!(allocator.resolve_offset(off), ptr);
    }

    #[test]
    fn test_pool_rejects_oversized() {
        let mut memory = vec![0u8; 512];
        let allocator = PoolAllocator::new(AllocatorId(4), &mut memory, 64).unwrap();
        assert!(allocator.allocate(128, 8).is_err());
    }
}
