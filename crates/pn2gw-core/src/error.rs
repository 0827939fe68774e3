use thiserror::Error;

/// pn2gw 统一错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Guest module is not ready")]
    NotReady,

    #[error("Invalid loader state: {0}")]
    InvalidState(String),

    #[error("Failed to load guest module: {0}")]
    Load(String),

    #[error("Guest module must export '{0}'")]
    MissingExport(String),

    #[error("Guest allocation of {requested} bytes failed")]
    Allocation { requested: u32 },

    #[error("Guest memory access out of bounds: ptr={ptr}, len={len}, memory_size={memory_size}")]
    OutOfBounds {
        ptr: u32,
        len: u32,
        memory_size: usize,
    },

    #[error("Guest trapped: {0}")]
    Guest(String),

    /// The guest rejected the input; the message comes from the guest.
    #[error("{message}")]
    Conversion { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Conversion failures are reported by the guest and leave the loader
    /// usable; everything else is a host-side fault.
    pub fn is_conversion_failure(&self) -> bool {
        matches!(self, BridgeError::Conversion { .. })
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Internal(format!("{:#}", err))
    }
}
