//! Configuration types for shared memory segments

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Types of shared memory backing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackingType {
    /// File-backed shared memory
    FileBacked,
    /// Anonymous memory file descriptor (Linux-specific)
    #[cfg(target_os = "linux")]
    MemFd,
}

impl Default for BackingType {
    fn default() -> Self {
        Self::FileBacked
    }
}

impl BackingType {
    /// Check if this backing type is supported on the current platform
    pub fn is_supported(&self) -> bool {
        match self {
            BackingType::FileBacked => true,
            #[cfg(target_os = "linux")]
            BackingType::MemFd => true,
        }
    }

    /// Get a human-readable name for the backing type
    pub fn name(&self) -> &'static str {
        match self {
            BackingType::FileBacked => "file-backed",
            #[cfg(target_os = "linux")]
            BackingType::MemFd => "memfd",
        }
    }
}

/// Configuration for creating shared memory segments
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Name of the segment
    pub name: String,
    /// Total size of the segment in bytes
    pub size: usize,
    /// Backing type for the shared memory
    pub backing_type: BackingType,
    /// Optional file path for file-backed segments
    pub file_path: Option<PathBuf>,
    /// Whether to create the segment if it doesn't exist
    pub create: bool,
    /// Permissions for the segment (Unix permissions)
    pub permissions: u32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 0,
            backing_type: BackingType::default(),
            file_path: None,
            create: true,
            permissions: 0o644,
        }
    }
}

impl SegmentConfig {
    /// Create a new segment configuration
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            ..Default::default()
        }
    }

    /// Set the backing type
    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    /// Set the file path for file-backed segments
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set whether to create the segment if it doesn't exist
    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Set the permissions for the segment
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        use crate::error::ShmPtrError;

        if self.name.is_empty() {
            return Err(ShmPtrError::invalid_parameter(
                "name",
                "Segment name cannot be empty",
            ));
        }

        if self.size == 0 {
            return Err(ShmPtrError::invalid_parameter(
                "size",
                "Segment size must be greater than 0",
            ));
        }

        if !self.backing_type.is_supported() {
            return Err(ShmPtrError::invalid_parameter(
                "backing_type",
                format!(
                    "Backing type {} is not supported on this platform",
                    self.backing_type.name()
                ),
            ));
        }

        // For file-backed segments, ensure we have a path if not creating
        if self.backing_type == BackingType::FileBacked && !self.create && self.file_path.is_none()
        {
            return Err(ShmPtrError::invalid_parameter(
                "file_path",
                "File path must be specified for existing file-backed segments",
            ));
        }

        Ok(())
    }

    /// Get the default file path for this segment
    pub fn default_file_path(&self) -> PathBuf {
        self.file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/tmp/shmptr_{}", self.name)))
    }
}
