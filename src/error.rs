//! Error types for document-structure extraction.
//!
//! Every fallible step in the crate returns [`Result`]. Structural failures
//! raised through a [`FaultContext`](crate::fault::FaultContext) surface as
//! [`Error::Fault`]; the two fatal variants ([`Error::FaultStackOverflow`] and
//! [`Error::Uncaught`]) must never be swallowed by a recovery scope.

/// Result type alias for structure extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading a document package.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A named part does not exist in the package
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// A part could not be parsed as XML
    #[error("XML error in part '{part}': {reason}")]
    Xml {
        /// Name of the offending part
        part: String,
        /// Reason reported by the XML reader
        reason: String,
    },

    /// The package layout is not usable (missing sequence, bad root element)
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container error
    #[cfg(feature = "zip")]
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Recoverable fault raised inside a recovery scope
    #[error("{message}")]
    Fault {
        /// Recorded fault message
        message: String,
        /// Depth of the frame that receives the fault
        depth: usize,
    },

    /// Recovery stack is full; no valid unwind target exists
    #[error("exception stack overflow: {0}")]
    FaultStackOverflow(usize),

    /// Fault raised with no recovery scope on the stack
    #[error("uncaught exception: {0}")]
    Uncaught(String),

    /// The document handle has been closed
    #[error("Document is closed")]
    DocumentClosed,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error terminates the current operation outright.
    ///
    /// Fatal errors bypass every recovery scope; callers that degrade on
    /// failure must re-raise them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::FaultStackOverflow(_) | Error::Uncaught(_))
    }
}
