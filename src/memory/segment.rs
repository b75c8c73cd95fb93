//! Shared memory segment implementation
//!
//! A segment is one mapping of shared memory that cooperating processes may
//! map at different virtual base addresses. Allocators hand out storage from
//! a segment; locators address that storage by segment-relative offset.

use std::{
    ffi::CString,
    fs::{File, OpenOptions},
    os::fd::{AsRawFd, OwnedFd, RawFd},
    os::unix::fs::OpenOptionsExt,
};

use memmap2::{MmapMut, MmapOptions};
use nix::{
    sys::memfd::{memfd_create, MemFdCreateFlag},
    unistd::ftruncate,
};

use crate::error::{Result, ShmPtrError};

use super::config::{BackingType, SegmentConfig};

/// A shared memory segment with its configuration
#[derive(Debug)]
pub struct SharedSegment {
    /// Configuration used to create the segment
    config: SegmentConfig,
    /// Memory-mapped region
    mmap: MmapMut,
    /// Optional file handle for file-backed segments
    _file: Option<File>,
    /// Owned file descriptor for memfd segments
    _owned_fd: Option<OwnedFd>,
    /// Raw file descriptor (for sharing with other processes)
    fd: RawFd,
}

impl SharedSegment {
    /// Create or open a shared memory segment
    pub fn new(config: SegmentConfig) -> Result<Self> {
        config.validate()?;

        let (file, owned_fd, fd) = Self::create_backing(&config)?;
        let mmap = Self::create_mapping(&file, &owned_fd, config.size)?;

        tracing::debug!(
            name = %config.name,
            size = config.size,
            backing = config.backing_type.name(),
            "mapped shared segment"
        );

        Ok(Self {
            config,
            mmap,
            _file: file,
            _owned_fd: owned_fd,
            fd,
        })
    }

    /// Create the backing storage for the segment
    fn create_backing(config: &SegmentConfig) -> Result<(Option<File>, Option<OwnedFd>, RawFd)> {
        match config.backing_type {
            BackingType::FileBacked => Self::create_file_backing(config),
            #[cfg(target_os = "linux")]
            BackingType::MemFd => Self::create_memfd_backing(config),
        }
    }

    /// Create file-backed storage
    fn create_file_backing(
        config: &SegmentConfig,
    ) -> Result<(Option<File>, Option<OwnedFd>, RawFd)> {
        let path = config.default_file_path();

        let file = if config.create {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .mode(config.permissions)
                .open(&path)
                .map_err(|e| ShmPtrError::from_io(e, "Failed to create/open file"))?
        } else {
            OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| ShmPtrError::from_io(e, "Failed to open existing file"))?
        };

        if config.create {
            file.set_len(config.size as u64)
                .map_err(|e| ShmPtrError::from_io(e, "Failed to set file size"))?;
        }

        let fd = file.as_raw_fd();
        Ok((Some(file), None, fd))
    }

    /// Create memfd-backed storage
    #[cfg(target_os = "linux")]
    fn create_memfd_backing(
        config: &SegmentConfig,
    ) -> Result<(Option<File>, Option<OwnedFd>, RawFd)> {
        let name_cstr = CString::new(config.name.clone())
            .map_err(|_| ShmPtrError::invalid_parameter("name", "Name contains null bytes"))?;

        let owned_fd = memfd_create(&name_cstr, MemFdCreateFlag::MFD_CLOEXEC)
            .map_err(|e| ShmPtrError::platform(format!("Failed to create memfd: {}", e)))?;

        let raw_fd = owned_fd.as_raw_fd();

        ftruncate(&owned_fd, config.size as i64)
            .map_err(|e| ShmPtrError::platform(format!("Failed to set memfd size: {}", e)))?;

        Ok((None, Some(owned_fd), raw_fd))
    }

    /// Create memory mapping for the backing storage
    fn create_mapping(
        file: &Option<File>,
        owned_fd: &Option<OwnedFd>,
        size: usize,
    ) -> Result<MmapMut> {
        match (file, owned_fd) {
            (Some(f), _) => unsafe {
                MmapOptions::new()
                    .len(size)
                    .map_mut(f)
                    .map_err(|e| ShmPtrError::from_io(e, "Failed to create memory mapping"))
            },
            (None, Some(fd)) => unsafe {
                MmapOptions::new()
                    .len(size)
                    .map_mut(fd)
                    .map_err(|e| ShmPtrError::from_io(e, "Failed to create memory mapping"))
            },
            (None, None) => Err(ShmPtrError::platform(
                "No file or owned fd available for mapping",
            )),
        }
    }

    /// Get the raw memory slice (read-only)
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Get the raw memory slice (mutable)
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// Get a pointer to the start of the segment
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    /// Get a mutable pointer to the start of the segment through a shared
    /// reference (for use in `Arc` contexts)
    ///
    /// # Safety
    /// Caller must ensure access to the underlying memory is externally
    /// synchronized.
    pub unsafe fn as_base_ptr(&self) -> *mut u8 {
        self.mmap.as_ptr() as *mut u8
    }

    /// Get the size of the segment
    pub fn size(&self) -> usize {
        self.config.size
    }

    /// Get the name of the segment
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Flush changes to persistent storage (for file-backed segments)
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| ShmPtrError::from_io(e, "Failed to flush memory mapping"))
    }

    /// Get the file descriptor backing this segment
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Check if the segment is file-backed
    pub fn is_file_backed(&self) -> bool {
        matches!(self.config.backing_type, BackingType::FileBacked)
    }

    /// Check if the segment is memfd-backed
    #[cfg(target_os = "linux")]
    pub fn is_memfd_backed(&self) -> bool {
        matches!(self.config.backing_type, BackingType::MemFd)
    }

    /// Get memory statistics for this segment
    pub fn memory_stats(&self) -> SegmentMemoryStats {
        SegmentMemoryStats {
            name: self.name().to_string(),
            size: self.size(),
            backing_type: self.config.backing_type,
            fd: self.fd,
        }
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        tracing::debug!(name = %self.config.name, "unmapping shared segment");
        // File and OwnedFd close themselves; only a bare fd needs manual close
        if self._file.is_none() && self._owned_fd.is_none() && self.fd != -1 {
            unsafe {
                libc::close(self.fd);
            }
        }
    }
}

unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}

/// Memory statistics for a segment
#[derive(Debug, Clone)]
pub struct SegmentMemoryStats {
    pub name: String,
    pub size: usize,
    pub backing_type: BackingType,
    pub fd: RawFd,
}
