//! Error types and handling for shmptr

/// Result type alias for shmptr operations
pub type Result<T> = std::result::Result<T, ShmPtrError>;

/// Error types for the shared-memory pointer layer and its collaborators
#[derive(Debug, thiserror::Error)]
pub enum ShmPtrError {
    /// I/O related errors (file operations, mmap, etc.)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Memory allocation or mapping failures
    #[error("Memory error: {message}")]
    Memory { message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// No allocator registered under the given id
    #[error("Allocator not found: {id}")]
    AllocatorNotFound { id: u32 },

    /// An allocator with the given id is already registered
    #[error("Allocator already registered: {id}")]
    AllocatorExists { id: u32 },

    /// The registry has no default allocator configured
    #[error("No default allocator configured")]
    NoDefaultAllocator,

    /// Insufficient space for allocation
    #[error("Insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// Alignment requirements not met
    #[error("Alignment error: address {address:#x} not aligned to {alignment}")]
    Alignment { address: usize, alignment: usize },

    /// Attempt to resolve a null locator
    #[error("Null locator: allocator id {id}")]
    NullLocator { id: u32 },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Platform-specific errors
    #[error("Platform error: {message}")]
    Platform { message: String },
}

impl ShmPtrError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an allocator not found error
    pub fn allocator_not_found(id: u32) -> Self {
        Self::AllocatorNotFound { id }
    }

    /// Create an allocator exists error
    pub fn allocator_exists(id: u32) -> Self {
        Self::AllocatorExists { id }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }

    /// Create an alignment error
    pub fn alignment(address: usize, alignment: usize) -> Self {
        Self::Alignment { address, alignment }
    }

    /// Create a null locator error
    pub fn null_locator(id: u32) -> Self {
        Self::NullLocator { id }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for ShmPtrError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<bincode::Error> for ShmPtrError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization(format!("Bincode error: {}", err))
    }
}
